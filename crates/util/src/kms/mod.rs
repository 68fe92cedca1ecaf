//! Key-management capability used to wrap and unwrap the DEK under a KEK.
//!
//! A [`KmsClient`] recognises a family of key URIs and hands out a
//! [`KekAead`] for one of them. The KEK never leaves the KMS; only
//! encrypt/decrypt round-trips are performed against it.
//!
//! Supported URI schemes:
//!
//! | Scheme | Client |
//! |---|---|
//! | `gcp-kms://projects/<p>/locations/<l>/keyRings/<r>/cryptoKeys/<k>` | [`GcpKmsClient`] |
//! | `aws-kms://<key ARN>` | [`AwsKmsClient`] |
//! | `local-kms://<base64url key>` | [`LocalKmsClient`] (testing and offline runs) |

pub mod aws;
pub mod gcp;
pub mod local;

pub use aws::{AwsKmsAead, AwsKmsClient, AWS_KMS_PREFIX};
pub use gcp::{GcpKmsAead, GcpKmsClient, GCP_KMS_PREFIX};
pub use local::{LocalKmsAead, LocalKmsClient, LOCAL_KMS_PREFIX};

use std::future::Future;

use datamanager_common::DataManagerError;
use thiserror::Error;

use crate::crypto::CipherError;

/// Errors produced by the KMS layer.
#[derive(Debug, Error)]
pub enum KmsError {
    /// No client recognises the key URI.
    #[error("unsupported key URI")]
    UnsupportedKeyUri,

    /// The key URI has a known scheme but a malformed body.
    #[error("invalid key URI: {0}")]
    InvalidKeyUri(&'static str),

    /// The remote KMS call failed (unreachable, access denied, throttled, ...).
    #[error("KMS request failed: {0}")]
    Request(String),

    /// The KMS responded without the expected field.
    #[error("KMS response contained no {0}")]
    EmptyResponse(&'static str),

    /// A local key-encryption operation failed.
    #[error("key encryption failed: {0}")]
    Crypto(#[from] CipherError),
}

impl From<KmsError> for DataManagerError {
    fn from(err: KmsError) -> Self {
        DataManagerError::EncryptionUnavailable(err.to_string())
    }
}

/// Authenticated encryption under a key-encryption key held by a KMS.
///
/// Calls are asynchronous because every operation may be a network round-trip.
pub trait KekAead: Send + Sync {
    /// Encrypt `plaintext`, binding it to `associated_data`.
    fn encrypt(
        &self,
        plaintext: &[u8],
        associated_data: &[u8],
    ) -> impl Future<Output = Result<Vec<u8>, KmsError>> + Send;

    /// Decrypt bytes produced by [`KekAead::encrypt`] with the same associated data.
    fn decrypt(
        &self,
        ciphertext: &[u8],
        associated_data: &[u8],
    ) -> impl Future<Output = Result<Vec<u8>, KmsError>> + Send;
}

/// A KMS client able to produce a [`KekAead`] for the key URIs it supports.
pub trait KmsClient {
    type Aead: KekAead;

    /// Returns `true` if this client can serve `key_uri`.
    fn supports(&self, key_uri: &str) -> bool;

    /// Obtain the AEAD primitive for the KEK named by `key_uri`.
    ///
    /// # Errors
    ///
    /// Returns [`KmsError::UnsupportedKeyUri`] if [`KmsClient::supports`] is
    /// false for `key_uri`, or [`KmsError::InvalidKeyUri`] if it is malformed.
    fn get_aead(&self, key_uri: &str) -> Result<Self::Aead, KmsError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kms_errors_map_to_encryption_unavailable() {
        let err: DataManagerError = KmsError::Request("access denied".into()).into();
        assert!(matches!(err, DataManagerError::EncryptionUnavailable(ref m) if m.contains("access denied")));
        assert!(!err.is_recoverable());
    }
}
