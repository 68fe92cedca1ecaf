//! Destination for built requests.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use datamanager_common::protocol::{IngestAudienceMembersRequest, IngestEventsRequest};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to write request: {0}")]
    Io(#[from] io::Error),

    #[error("failed to serialise request: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Receives ingestion requests, one call per request.
#[cfg_attr(test, mockall::automock)]
pub trait IngestionSink {
    fn ingest_audience_members(
        &mut self,
        request: &IngestAudienceMembersRequest,
    ) -> Result<(), SinkError>;

    fn ingest_events(&mut self, request: &IngestEventsRequest) -> Result<(), SinkError>;
}

/// Writes each request as one JSON document per line.
pub struct JsonLinesSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_line<T: Serialize>(&mut self, value: &T) -> Result<(), SinkError> {
        serde_json::to_writer(&mut self.writer, value)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

impl<W: Write> IngestionSink for JsonLinesSink<W> {
    fn ingest_audience_members(
        &mut self,
        request: &IngestAudienceMembersRequest,
    ) -> Result<(), SinkError> {
        self.write_line(request)
    }

    fn ingest_events(&mut self, request: &IngestEventsRequest) -> Result<(), SinkError> {
        self.write_line(request)
    }
}

/// Open the sink for `output_path`, or stdout when `None`.
///
/// # Errors
///
/// Returns [`SinkError::Io`] if the file cannot be created.
pub fn open(output_path: Option<&Path>) -> Result<JsonLinesSink<Box<dyn Write>>, SinkError> {
    let writer: Box<dyn Write> = match output_path {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(io::stdout().lock()),
    };
    Ok(JsonLinesSink::new(writer))
}

#[cfg(test)]
mod tests {
    use datamanager_common::protocol::{
        AccountType, Consent, Destination, ProductAccount, WireEncoding,
    };

    use super::*;

    fn events_request(id: &str) -> IngestEventsRequest {
        IngestEventsRequest {
            destinations: vec![Destination {
                operating_account: ProductAccount {
                    account_type: AccountType::GoogleAds,
                    account_id: "1".into(),
                },
                login_account: None,
                linked_account: None,
                product_destination_id: id.into(),
            }],
            events: vec![],
            consent: Consent::granted(),
            encoding: WireEncoding::Hex,
            encryption_info: None,
            validate_only: true,
        }
    }

    #[test]
    fn writes_one_line_per_request() {
        let mut sink = JsonLinesSink::new(Vec::new());
        sink.ingest_events(&events_request("a")).unwrap();
        sink.ingest_events(&events_request("b")).unwrap();

        let out = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["destinations"][0]["productDestinationId"], "b");
    }

    #[test]
    fn file_sink_writes_to_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("requests.jsonl");
        {
            let mut sink = open(Some(&path)).unwrap();
            sink.ingest_events(&events_request("a")).unwrap();
        }
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written.lines().count(), 1);
    }
}
