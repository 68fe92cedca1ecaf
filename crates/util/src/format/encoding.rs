use std::fmt;
use std::str::FromStr;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use datamanager_common::DataManagerError;

/// Text encoding applied to hashes and ciphertext.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Encoding {
    /// Lowercase hexadecimal.
    Hex,
    /// Standard Base64 alphabet with padding.
    Base64,
}

impl Encoding {
    pub fn as_str(self) -> &'static str {
        match self {
            Encoding::Hex => "HEX",
            Encoding::Base64 => "BASE64",
        }
    }

    /// Encode `bytes` with this scheme.
    ///
    /// # Errors
    ///
    /// Returns [`DataManagerError::InvalidInput`] if `bytes` is empty.
    pub fn encode(self, bytes: &[u8]) -> Result<String, DataManagerError> {
        if bytes.is_empty() {
            return Err(DataManagerError::InvalidInput("bytes to encode are empty"));
        }
        Ok(match self {
            Encoding::Hex => hex::encode(bytes),
            Encoding::Base64 => STANDARD.encode(bytes),
        })
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Encoding {
    type Err = DataManagerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("HEX") {
            Ok(Encoding::Hex)
        } else if s.eq_ignore_ascii_case("BASE64") {
            Ok(Encoding::Base64)
        } else {
            Err(DataManagerError::InvalidInput("unsupported encoding"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("HEX".parse::<Encoding>().unwrap(), Encoding::Hex);
        assert_eq!("hex".parse::<Encoding>().unwrap(), Encoding::Hex);
        assert_eq!("Base64".parse::<Encoding>().unwrap(), Encoding::Base64);
    }

    #[test]
    fn unsupported_scheme_is_invalid_input() {
        let err = "base32".parse::<Encoding>().unwrap_err();
        assert_eq!(err, DataManagerError::InvalidInput("unsupported encoding"));
        assert!(!err.to_string().contains("base32"));
    }

    #[test]
    fn display_matches_parse() {
        for encoding in [Encoding::Hex, Encoding::Base64] {
            assert_eq!(encoding.to_string().parse::<Encoding>().unwrap(), encoding);
        }
    }

    #[test]
    fn empty_bytes_rejected() {
        assert!(Encoding::Hex.encode(b"").is_err());
        assert!(Encoding::Base64.encode(b"").is_err());
    }

    #[test]
    fn encodings_decode_back() {
        let bytes = [0u8, 1, 2, 0xFE, 0xFF, 0x7F];
        assert_eq!(hex::decode(Encoding::Hex.encode(&bytes).unwrap()).unwrap(), bytes);
        assert_eq!(
            STANDARD.decode(Encoding::Base64.encode(&bytes).unwrap()).unwrap(),
            bytes
        );
    }
}
