//! Common error types shared across crates.

use thiserror::Error;

/// Top-level error type for formatting, hashing, encoding and encryption.
///
/// Variants map to the action a caller is expected to take:
/// - [`DataManagerError::InvalidInput`] → skip the record and continue
/// - [`DataManagerError::EncryptionUnavailable`] → abort construction
/// - [`DataManagerError::EncryptionFailure`] → abort the call
///
/// Messages never contain the value that was rejected. `InvalidInput` only
/// accepts a `&'static str` so a formatted user value cannot end up in it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataManagerError {
    /// A normalization, hashing or encoding precondition was violated.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),

    /// The KMS or the key-encryption key could not be used to set up encryption.
    #[error("encryption unavailable: {0}")]
    EncryptionUnavailable(String),

    /// Encrypting a value failed after the encrypter was constructed.
    #[error("encryption failure: {0}")]
    EncryptionFailure(String),
}

impl DataManagerError {
    /// Returns `true` if the caller can skip the offending record and carry on.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, DataManagerError::InvalidInput(_))
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T, E = DataManagerError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_invalid_input_is_recoverable() {
        assert!(DataManagerError::InvalidInput("x").is_recoverable());
        assert!(!DataManagerError::EncryptionUnavailable("x".into()).is_recoverable());
        assert!(!DataManagerError::EncryptionFailure("x".into()).is_recoverable());
    }

    #[test]
    fn display_includes_rule() {
        let e = DataManagerError::InvalidInput("email address is blank or empty");
        assert_eq!(
            e.to_string(),
            "invalid input: email address is blank or empty"
        );
    }
}
