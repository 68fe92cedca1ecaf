//! Normalization, hashing, and encoding of user identifiers.
//!
//! Each identifier goes through up to three steps:
//!
//! 1. `format_*` normalizes the raw value (trim, case-fold, Gmail dot removal, ...).
//! 2. [`Formatter::hash_string`] computes the SHA-256 digest of the normalized
//!    value with all whitespace removed.
//! 3. [`Formatter::hex_encode`] or [`Formatter::base64_encode`] renders the digest.
//!
//! The `process_*` methods run all three steps in one call. The `*_encrypted`
//! variants additionally encrypt the Base64 form of the hash with a
//! [`HashEncrypter`] and encode the ciphertext with the requested scheme.
//!
//! Error messages never contain the value being processed.

mod encoding;

pub use encoding::Encoding;

use std::sync::OnceLock;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use datamanager_common::{DataManagerError, Result};
use regex::Regex;
use sha2::{Digest, Sha256};

/// Unicode whitespace plus the ASCII information separators U+001C..U+001F.
fn is_space(c: char) -> bool {
    c.is_whitespace() || ('\u{1c}'..='\u{1f}').contains(&c)
}

fn trim_space(s: &str) -> &str {
    s.trim_matches(is_space)
}

fn remove_space(s: &str) -> String {
    s.chars().filter(|&c| !is_space(c)).collect()
}

/// Matches anything that is not a Unicode decimal digit.
fn non_digit() -> Result<&'static Regex> {
    static NON_DIGIT: OnceLock<std::result::Result<Regex, regex::Error>> = OnceLock::new();
    NON_DIGIT
        .get_or_init(|| Regex::new(r"\D"))
        .as_ref()
        .map_err(|_| DataManagerError::InvalidInput("phone number could not be normalized"))
}

/// Capability that encrypts an encoded hash before transmission.
///
/// Implemented by [`crate::Encrypter`]. Implementations must be usable from
/// many threads at once through `&self`.
pub trait HashEncrypter {
    /// Encrypt `plaintext`, returning raw ciphertext bytes.
    fn encrypt(&self, plaintext: &str) -> Result<Vec<u8>>;
}

/// Stateless normalizer, hasher, and encoder for user identifiers.
#[derive(Debug, Default, Clone, Copy)]
pub struct Formatter;

impl Formatter {
    pub fn new() -> Self {
        Self
    }

    /// Normalize an email address.
    ///
    /// Surrounding whitespace is trimmed and the address lowercased. For
    /// `gmail.com` and `googlemail.com` every `.` is removed from the user part.
    ///
    /// # Errors
    ///
    /// Returns [`DataManagerError::InvalidInput`] if the address is blank,
    /// contains intermediate whitespace, is not of the form `user@domain`, or
    /// has an empty user part after normalization.
    pub fn format_email_address(&self, email: &str) -> Result<String> {
        let email = trim_space(email);
        if email.is_empty() {
            return Err(DataManagerError::InvalidInput("email address is blank or empty"));
        }
        if email.chars().any(is_space) {
            return Err(DataManagerError::InvalidInput(
                "email address contains intermediate whitespace",
            ));
        }
        let email = email.to_lowercase();
        let mut parts = email.split('@');
        let (user, domain) = match (parts.next(), parts.next(), parts.next()) {
            (Some(user), Some(domain), None) => (user, domain),
            _ => {
                return Err(DataManagerError::InvalidInput(
                    "email address is not of the form user@domain",
                ))
            }
        };
        if user.is_empty() {
            return Err(DataManagerError::InvalidInput(
                "email address without the domain is empty",
            ));
        }
        if domain.is_empty() {
            return Err(DataManagerError::InvalidInput("domain of email address is empty"));
        }
        if domain == "gmail.com" || domain == "googlemail.com" {
            let user = user.replace('.', "");
            if user.is_empty() {
                return Err(DataManagerError::InvalidInput(
                    "email address without the domain is empty after normalization",
                ));
            }
            Ok(format!("{user}@{domain}"))
        } else {
            Ok(format!("{user}@{domain}"))
        }
    }

    /// Normalize a phone number to `+` followed by its digits.
    ///
    /// Every Unicode decimal digit is kept, so `"+١ ٨٠٠-555-0100"` becomes
    /// `"+١٨٠٠5550100"`.
    ///
    /// # Errors
    ///
    /// Returns [`DataManagerError::InvalidInput`] if the number is blank or
    /// contains no digits.
    pub fn format_phone_number(&self, phone: &str) -> Result<String> {
        let compact = remove_space(phone);
        if compact.is_empty() {
            return Err(DataManagerError::InvalidInput("phone number is blank or empty"));
        }
        let digits = non_digit()?.replace_all(&compact, "");
        if digits.is_empty() {
            return Err(DataManagerError::InvalidInput("phone number contains no digits"));
        }
        Ok(format!("+{digits}"))
    }

    /// # Errors
    ///
    /// Returns [`DataManagerError::InvalidInput`] if the name is blank.
    pub fn format_given_name(&self, given_name: &str) -> Result<String> {
        let name = trim_space(given_name).to_lowercase();
        if name.is_empty() {
            return Err(DataManagerError::InvalidInput("given name is blank or empty"));
        }
        Ok(name)
    }

    /// # Errors
    ///
    /// Returns [`DataManagerError::InvalidInput`] if the name is blank.
    pub fn format_family_name(&self, family_name: &str) -> Result<String> {
        let name = trim_space(family_name).to_lowercase();
        if name.is_empty() {
            return Err(DataManagerError::InvalidInput("family name is blank or empty"));
        }
        Ok(name)
    }

    /// Trim a postal code. Case and inner characters are preserved.
    ///
    /// # Errors
    ///
    /// Returns [`DataManagerError::InvalidInput`] if the code is blank.
    pub fn format_postal_code(&self, postal_code: &str) -> Result<String> {
        let code = trim_space(postal_code);
        if code.is_empty() {
            return Err(DataManagerError::InvalidInput("postal code is blank or empty"));
        }
        Ok(code.to_owned())
    }

    /// Trim and uppercase a region code.
    ///
    /// Any two characters are accepted; the code is not checked against ISO-3166.
    ///
    /// # Errors
    ///
    /// Returns [`DataManagerError::InvalidInput`] if the code is blank or not
    /// exactly two characters long.
    pub fn format_region_code(&self, region_code: &str) -> Result<String> {
        let code = trim_space(region_code).to_uppercase();
        if code.is_empty() {
            return Err(DataManagerError::InvalidInput("region code is blank or empty"));
        }
        if code.chars().count() != 2 {
            return Err(DataManagerError::InvalidInput("region code must be two characters"));
        }
        Ok(code)
    }

    /// SHA-256 of `s` after removing all whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`DataManagerError::InvalidInput`] if nothing is left after
    /// whitespace removal.
    pub fn hash_string(&self, s: &str) -> Result<[u8; 32]> {
        let compact = remove_space(s);
        if compact.is_empty() {
            return Err(DataManagerError::InvalidInput("string to hash is blank or empty"));
        }
        Ok(Sha256::digest(compact.as_bytes()).into())
    }

    /// # Errors
    ///
    /// Returns [`DataManagerError::InvalidInput`] if `bytes` is empty.
    pub fn hex_encode(&self, bytes: &[u8]) -> Result<String> {
        Encoding::Hex.encode(bytes)
    }

    /// # Errors
    ///
    /// Returns [`DataManagerError::InvalidInput`] if `bytes` is empty.
    pub fn base64_encode(&self, bytes: &[u8]) -> Result<String> {
        Encoding::Base64.encode(bytes)
    }

    pub fn process_email_address(&self, email: &str, encoding: Encoding) -> Result<String> {
        self.hash_and_encode(&self.format_email_address(email)?, encoding)
    }

    pub fn process_email_address_encrypted(
        &self,
        email: &str,
        encoding: Encoding,
        encrypter: &impl HashEncrypter,
    ) -> Result<String> {
        self.hash_encode_and_encrypt(&self.format_email_address(email)?, encoding, encrypter)
    }

    pub fn process_phone_number(&self, phone: &str, encoding: Encoding) -> Result<String> {
        self.hash_and_encode(&self.format_phone_number(phone)?, encoding)
    }

    pub fn process_phone_number_encrypted(
        &self,
        phone: &str,
        encoding: Encoding,
        encrypter: &impl HashEncrypter,
    ) -> Result<String> {
        self.hash_encode_and_encrypt(&self.format_phone_number(phone)?, encoding, encrypter)
    }

    pub fn process_given_name(&self, given_name: &str, encoding: Encoding) -> Result<String> {
        self.hash_and_encode(&self.format_given_name(given_name)?, encoding)
    }

    pub fn process_given_name_encrypted(
        &self,
        given_name: &str,
        encoding: Encoding,
        encrypter: &impl HashEncrypter,
    ) -> Result<String> {
        self.hash_encode_and_encrypt(&self.format_given_name(given_name)?, encoding, encrypter)
    }

    pub fn process_family_name(&self, family_name: &str, encoding: Encoding) -> Result<String> {
        self.hash_and_encode(&self.format_family_name(family_name)?, encoding)
    }

    pub fn process_family_name_encrypted(
        &self,
        family_name: &str,
        encoding: Encoding,
        encrypter: &impl HashEncrypter,
    ) -> Result<String> {
        self.hash_encode_and_encrypt(&self.format_family_name(family_name)?, encoding, encrypter)
    }

    /// Same as [`Formatter::format_postal_code`]; postal codes are not hashed.
    pub fn process_postal_code(&self, postal_code: &str) -> Result<String> {
        self.format_postal_code(postal_code)
    }

    /// Same as [`Formatter::format_region_code`]; region codes are not hashed.
    pub fn process_region_code(&self, region_code: &str) -> Result<String> {
        self.format_region_code(region_code)
    }

    fn hash_and_encode(&self, normalized: &str, encoding: Encoding) -> Result<String> {
        encoding.encode(&self.hash_string(normalized)?)
    }

    // The encrypted payload is always the Base64 form of the hash.
    fn hash_encode_and_encrypt(
        &self,
        normalized: &str,
        encoding: Encoding,
        encrypter: &impl HashEncrypter,
    ) -> Result<String> {
        let hash_base64 = STANDARD.encode(self.hash_string(normalized)?);
        let ciphertext = encrypter.encrypt(&hash_base64)?;
        encoding.encode(&ciphertext)
    }
}
