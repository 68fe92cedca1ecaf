//! Audience members from a CSV file.
//!
//! The header row names the columns. Columns prefixed `email_` or `phone_`
//! hold one identifier each; `given_name`, `family_name`, `region_code` and
//! `postal_code` together form an address. Blank cells are ignored.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use datamanager_common::protocol::{AudienceMember, UserData, UserIdentifier};
use datamanager_common::Result;
use tracing::warn;

use crate::identifiers::{skip_invalid, IdentifierProcessor};
use crate::input::InputError;

/// Raw values of one CSV row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemberRecord {
    /// 1-based data row number (the header is row 0).
    pub row: usize,
    pub emails: Vec<String>,
    pub phone_numbers: Vec<String>,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub region_code: Option<String>,
    pub postal_code: Option<String>,
}

impl MemberRecord {
    fn has_data(&self) -> bool {
        !self.emails.is_empty()
            || !self.phone_numbers.is_empty()
            || self.given_name.is_some()
            || self.family_name.is_some()
            || self.region_code.is_some()
            || self.postal_code.is_some()
    }
}

enum Column {
    Email,
    Phone,
    GivenName,
    FamilyName,
    RegionCode,
    PostalCode,
    Ignored,
}

impl Column {
    fn from_header(header: &str) -> Self {
        match header {
            h if h.starts_with("email_") => Column::Email,
            h if h.starts_with("phone_") => Column::Phone,
            "given_name" => Column::GivenName,
            "family_name" => Column::FamilyName,
            "region_code" => Column::RegionCode,
            "postal_code" => Column::PostalCode,
            _ => Column::Ignored,
        }
    }
}

/// Read member rows from `path`.
///
/// # Errors
///
/// Returns [`InputError`] if the file cannot be opened or is not valid CSV.
pub fn read_members_file(path: &Path) -> Result<Vec<MemberRecord>, InputError> {
    read_members(File::open(path)?)
}

/// Read member rows from CSV text. Rows without any data are skipped.
///
/// # Errors
///
/// Returns [`InputError::Csv`] on malformed CSV.
pub fn read_members<R: Read>(reader: R) -> Result<Vec<MemberRecord>, InputError> {
    let mut csv = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv.headers()?.clone();
    let columns: Vec<Column> = headers.iter().map(Column::from_header).collect();

    let unknown: BTreeSet<&str> = headers
        .iter()
        .zip(&columns)
        .filter(|(h, c)| !h.is_empty() && matches!(c, Column::Ignored))
        .map(|(h, _)| h)
        .collect();
    for header in unknown {
        warn!(header, "ignoring unrecognized column");
    }

    let mut members = Vec::new();
    for (index, record) in csv.records().enumerate() {
        let record = record?;
        let mut member = MemberRecord {
            row: index + 1,
            ..MemberRecord::default()
        };
        // Cells beyond the header row have no column and are dropped by the zip.
        for (column, value) in columns.iter().zip(record.iter()) {
            if value.is_empty() {
                continue;
            }
            let value = value.to_owned();
            match column {
                Column::Email => member.emails.push(value),
                Column::Phone => member.phone_numbers.push(value),
                Column::GivenName => member.given_name = Some(value),
                Column::FamilyName => member.family_name = Some(value),
                Column::RegionCode => member.region_code = Some(value),
                Column::PostalCode => member.postal_code = Some(value),
                Column::Ignored => {}
            }
        }
        if member.has_data() {
            members.push(member);
        } else {
            warn!(row = member.row, "ignoring row with no data");
        }
    }
    Ok(members)
}

/// Build audience members, skipping invalid identifiers and members left
/// without any.
///
/// # Errors
///
/// Propagates non-recoverable errors such as encryption failures.
pub fn build_members(
    records: &[MemberRecord],
    processor: &IdentifierProcessor<'_>,
) -> Result<Vec<AudienceMember>> {
    let mut members = Vec::with_capacity(records.len());
    for record in records {
        let mut user_data = UserData::default();

        for email in &record.emails {
            if let Some(hashed) = skip_invalid(processor.email_address(email), record.row, "email")? {
                user_data.user_identifiers.push(UserIdentifier::EmailAddress(hashed));
            }
        }
        for phone in &record.phone_numbers {
            if let Some(hashed) = skip_invalid(processor.phone_number(phone), record.row, "phone")? {
                user_data.user_identifiers.push(UserIdentifier::PhoneNumber(hashed));
            }
        }
        match (
            &record.given_name,
            &record.family_name,
            &record.region_code,
            &record.postal_code,
        ) {
            (Some(given), Some(family), Some(region), Some(postal)) => {
                let address = processor.address(given, family, region, postal);
                if let Some(address) = skip_invalid(address, record.row, "address")? {
                    user_data.user_identifiers.push(UserIdentifier::Address(address));
                }
            }
            (None, None, None, None) => {}
            _ => warn!(row = record.row, "skipping incomplete address"),
        }

        if user_data.is_empty() {
            warn!(row = record.row, "skipping member with no valid identifiers");
        } else {
            members.push(AudienceMember { user_data });
        }
    }
    Ok(members)
}
