//! Conversion events from a JSON file.
//!
//! The file holds an array of objects:
//!
//! ```json
//! [{"timestamp": "2025-06-10T20:07:01Z", "transactionId": "T1",
//!   "eventSource": "WEB", "gclid": "...", "currency": "USD", "value": 5.0,
//!   "emails": ["..."], "phoneNumbers": ["..."]}]
//! ```

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use datamanager_common::protocol::{AdIdentifiers, Event, UserData, UserIdentifier};
use datamanager_common::Result;
use serde::Deserialize;
use tracing::warn;

use crate::identifiers::{skip_invalid, IdentifierProcessor};
use crate::input::InputError;

/// One event as it appears in the input file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    pub timestamp: Option<String>,
    pub transaction_id: Option<String>,
    pub event_source: Option<String>,
    pub gclid: Option<String>,
    pub currency: Option<String>,
    pub value: Option<f64>,
    #[serde(default)]
    pub emails: Vec<String>,
    #[serde(default)]
    pub phone_numbers: Vec<String>,
}

/// # Errors
///
/// Returns [`InputError`] if the file cannot be opened or is not a JSON array
/// of events.
pub fn read_events_file(path: &Path) -> Result<Vec<EventRecord>, InputError> {
    read_events(BufReader::new(File::open(path)?))
}

/// # Errors
///
/// Returns [`InputError::Json`] on malformed input.
pub fn read_events<R: Read>(reader: R) -> Result<Vec<EventRecord>, InputError> {
    Ok(serde_json::from_reader(reader)?)
}

/// Normalise an RFC 3339 timestamp to UTC.
fn parse_timestamp(raw: &str) -> Option<String> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|t| t.with_timezone(&Utc).to_rfc3339_opts(SecondsFormat::AutoSi, true))
}

/// Build events, skipping those without a valid timestamp or transaction ID
/// and dropping invalid identifiers.
///
/// # Errors
///
/// Propagates non-recoverable errors such as encryption failures.
pub fn build_events(
    records: &[EventRecord],
    processor: &IdentifierProcessor<'_>,
) -> Result<Vec<Event>> {
    let mut events = Vec::with_capacity(records.len());
    for (index, record) in records.iter().enumerate() {
        let row = index + 1;

        let Some(event_timestamp) = record.timestamp.as_deref().and_then(parse_timestamp) else {
            warn!(row, "skipping event with missing or invalid timestamp");
            continue;
        };
        let Some(transaction_id) = record.transaction_id.clone() else {
            warn!(row, "skipping event with no transaction ID");
            continue;
        };

        let mut user_data = UserData::default();
        for email in &record.emails {
            if let Some(hashed) = skip_invalid(processor.email_address(email), row, "email")? {
                user_data.user_identifiers.push(UserIdentifier::EmailAddress(hashed));
            }
        }
        for phone in &record.phone_numbers {
            if let Some(hashed) = skip_invalid(processor.phone_number(phone), row, "phone")? {
                user_data.user_identifiers.push(UserIdentifier::PhoneNumber(hashed));
            }
        }

        events.push(Event {
            event_timestamp,
            transaction_id,
            event_source: record.event_source.clone(),
            ad_identifiers: record.gclid.clone().map(|gclid| AdIdentifiers { gclid }),
            currency: record.currency.clone(),
            conversion_value: record.value,
            user_data: (!user_data.is_empty()).then_some(user_data),
        });
    }
    Ok(events)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use datamanager_util::Encoding;

    use super::*;

    const JSON: &str = r#"[
        {"timestamp": "2025-06-10T22:07:01+02:00", "transactionId": "T1",
         "eventSource": "WEB", "gclid": "abc", "currency": "USD", "value": 12.5,
         "emails": ["alexz@example.com", "not-an-email"], "phoneNumbers": ["+1 800-555-0100"]},
        {"timestamp": "yesterday", "transactionId": "T2"},
        {"timestamp": "2025-06-10T20:07:01Z"},
        {"timestamp": "2025-06-10T20:07:01.250Z", "transactionId": "T4"}
    ]"#;

    fn build(json: &str) -> Vec<Event> {
        let records = read_events(json.as_bytes()).unwrap();
        build_events(&records, &IdentifierProcessor::new(Encoding::Hex, None)).unwrap()
    }

    #[test]
    fn timestamps_are_normalised_to_utc() {
        assert_eq!(
            parse_timestamp("2025-06-10T22:07:01+02:00").as_deref(),
            Some("2025-06-10T20:07:01Z")
        );
        assert_eq!(
            parse_timestamp("2025-06-10T20:07:01.250Z").as_deref(),
            Some("2025-06-10T20:07:01.250Z")
        );
        assert!(parse_timestamp("2025-06-10").is_none());
    }

    #[test]
    fn invalid_events_are_skipped() {
        let events = build(JSON);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].transaction_id, "T1");
        assert_eq!(events[1].transaction_id, "T4");
    }

    #[test]
    fn event_fields_are_carried_over() {
        let event = &build(JSON)[0];
        assert_eq!(event.event_timestamp, "2025-06-10T20:07:01Z");
        assert_eq!(event.event_source.as_deref(), Some("WEB"));
        assert_eq!(event.ad_identifiers.as_ref().unwrap().gclid, "abc");
        assert_eq!(event.currency.as_deref(), Some("USD"));
        assert_eq!(event.conversion_value, Some(12.5));

        let ids = &event.user_data.as_ref().unwrap().user_identifiers;
        assert_eq!(ids.len(), 2, "invalid email is dropped");
    }

    #[test]
    fn event_without_identifiers_has_no_user_data() {
        let events = build(JSON);
        assert!(events[1].user_data.is_none());
    }

    #[test]
    fn reads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(JSON.as_bytes()).unwrap();
        assert_eq!(read_events_file(file.path()).unwrap().len(), 4);
    }

    #[test]
    fn non_array_input_rejected() {
        assert!(matches!(
            read_events(r#"{"timestamp": "x"}"#.as_bytes()),
            Err(InputError::Json(_))
        ));
    }
}
