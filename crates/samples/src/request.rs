//! Batches records into requests and hands them to a sink.

use datamanager_common::protocol::{
    AudienceMember, Consent, Destination, EncryptionInfo, Event, IngestAudienceMembersRequest,
    IngestEventsRequest, TermsOfService, TermsOfServiceStatus, WireEncoding,
};
use tracing::info;

use crate::sink::{IngestionSink, SinkError};

/// Request fields shared by every batch of one run.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub destination: Destination,
    pub encoding: WireEncoding,
    pub encryption_info: Option<EncryptionInfo>,
    pub validate_only: bool,
}

/// Split `items` into consecutive batches of at most `size` items.
pub fn into_batches<T>(items: Vec<T>, size: usize) -> impl Iterator<Item = Vec<T>> {
    let size = size.max(1);
    let mut items = items.into_iter().peekable();
    std::iter::from_fn(move || {
        items.peek()?;
        Some(items.by_ref().take(size).collect())
    })
}

/// Send `members` in batches of `batch_size`, returning the number of requests.
///
/// # Errors
///
/// Returns the first [`SinkError`]; later batches are not sent.
pub fn send_audience_members<S: IngestionSink>(
    sink: &mut S,
    ctx: &RequestContext,
    members: Vec<AudienceMember>,
    batch_size: usize,
) -> Result<usize, SinkError> {
    let mut count = 0;
    for batch in into_batches(members, batch_size) {
        count += 1;
        let size = batch.len();
        let request = IngestAudienceMembersRequest {
            destinations: vec![ctx.destination.clone()],
            audience_members: batch,
            consent: Consent::granted(),
            terms_of_service: TermsOfService {
                customer_match_terms_of_service_status: TermsOfServiceStatus::Accepted,
            },
            encoding: ctx.encoding,
            encryption_info: ctx.encryption_info.clone(),
            validate_only: ctx.validate_only,
        };
        sink.ingest_audience_members(&request)?;
        info!(request = count, members = size, "audience members request sent");
    }
    info!(requests = count, "all requests sent");
    Ok(count)
}

/// Send `events` in batches of `batch_size`, returning the number of requests.
///
/// # Errors
///
/// Returns the first [`SinkError`]; later batches are not sent.
pub fn send_events<S: IngestionSink>(
    sink: &mut S,
    ctx: &RequestContext,
    events: Vec<Event>,
    batch_size: usize,
) -> Result<usize, SinkError> {
    let mut count = 0;
    for batch in into_batches(events, batch_size) {
        count += 1;
        let size = batch.len();
        let request = IngestEventsRequest {
            destinations: vec![ctx.destination.clone()],
            events: batch,
            consent: Consent::granted(),
            encoding: ctx.encoding,
            encryption_info: ctx.encryption_info.clone(),
            validate_only: ctx.validate_only,
        };
        sink.ingest_events(&request)?;
        info!(request = count, events = size, "events request sent");
    }
    info!(requests = count, "all requests sent");
    Ok(count)
}
