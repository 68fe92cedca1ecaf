//! Turns raw identifier values into request-ready strings.

use datamanager_common::protocol::{AddressInfo, WireEncoding};
use datamanager_common::{DataManagerError, Result};
use datamanager_util::{Encoding, Encrypter, Formatter};
use tracing::warn;

/// Formats, hashes, encodes and (when an encrypter is set) encrypts identifiers.
#[derive(Debug, Clone, Copy)]
pub struct IdentifierProcessor<'a> {
    formatter: Formatter,
    encoding: Encoding,
    encrypter: Option<&'a Encrypter>,
}

impl<'a> IdentifierProcessor<'a> {
    pub fn new(encoding: Encoding, encrypter: Option<&'a Encrypter>) -> Self {
        Self {
            formatter: Formatter::new(),
            encoding,
            encrypter,
        }
    }

    /// Encoding to declare on the request.
    pub fn wire_encoding(&self) -> WireEncoding {
        match self.encoding {
            Encoding::Hex => WireEncoding::Hex,
            Encoding::Base64 => WireEncoding::Base64,
        }
    }

    pub fn email_address(&self, raw: &str) -> Result<String> {
        match self.encrypter {
            Some(e) => self.formatter.process_email_address_encrypted(raw, self.encoding, e),
            None => self.formatter.process_email_address(raw, self.encoding),
        }
    }

    pub fn phone_number(&self, raw: &str) -> Result<String> {
        match self.encrypter {
            Some(e) => self.formatter.process_phone_number_encrypted(raw, self.encoding, e),
            None => self.formatter.process_phone_number(raw, self.encoding),
        }
    }

    /// Hashed names plus formatted region and postal codes.
    pub fn address(
        &self,
        given_name: &str,
        family_name: &str,
        region_code: &str,
        postal_code: &str,
    ) -> Result<AddressInfo> {
        let (given_name, family_name) = match self.encrypter {
            Some(e) => (
                self.formatter.process_given_name_encrypted(given_name, self.encoding, e)?,
                self.formatter.process_family_name_encrypted(family_name, self.encoding, e)?,
            ),
            None => (
                self.formatter.process_given_name(given_name, self.encoding)?,
                self.formatter.process_family_name(family_name, self.encoding)?,
            ),
        };
        Ok(AddressInfo {
            given_name,
            family_name,
            region_code: self.formatter.process_region_code(region_code)?,
            postal_code: self.formatter.process_postal_code(postal_code)?,
        })
    }
}

/// Keep a valid value, log and drop an invalid one, and propagate anything
/// that is not recoverable.
pub fn skip_invalid<T>(result: Result<T>, row: usize, field: &'static str) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err @ DataManagerError::InvalidInput(_)) => {
            warn!(row, field, error = %err, "skipping invalid identifier");
            Ok(None)
        }
        Err(err) => Err(err),
    }
}
