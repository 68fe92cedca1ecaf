//! In-process KMS whose KEK material is carried in the key URI.
//!
//! `local-kms://<base64url-no-pad(32-byte key)>`
//!
//! Anyone holding the URI holds the KEK, so this client is only suitable for
//! tests and offline runs of the samples.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chacha20poly1305::XChaCha20Poly1305;
use zeroize::Zeroizing;

use super::{KekAead, KmsClient, KmsError};
use crate::crypto::cipher::{self, KEY_LEN};

/// URI prefix recognised by [`LocalKmsClient`].
pub const LOCAL_KMS_PREFIX: &str = "local-kms://";

/// KMS client for `local-kms://` key URIs.
///
/// When bound to a key URI, only that URI is supported.
#[derive(Debug, Clone, Default)]
pub struct LocalKmsClient {
    key_uri: Option<String>,
}

impl LocalKmsClient {
    /// Create a client that supports any `local-kms://` URI.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a client bound to a single key URI.
    pub fn bound(key_uri: impl Into<String>) -> Self {
        Self {
            key_uri: Some(key_uri.into()),
        }
    }

    /// Mint a key URI for a fresh random KEK.
    pub fn generate_key_uri() -> String {
        let key = cipher::random_key();
        format!("{LOCAL_KMS_PREFIX}{}", URL_SAFE_NO_PAD.encode(&key[..]))
    }
}

impl KmsClient for LocalKmsClient {
    type Aead = LocalKmsAead;

    fn supports(&self, key_uri: &str) -> bool {
        match &self.key_uri {
            Some(bound) => bound == key_uri,
            None => key_uri.starts_with(LOCAL_KMS_PREFIX),
        }
    }

    fn get_aead(&self, key_uri: &str) -> Result<Self::Aead, KmsError> {
        if !self.supports(key_uri) {
            return Err(KmsError::UnsupportedKeyUri);
        }
        let encoded = key_uri
            .strip_prefix(LOCAL_KMS_PREFIX)
            .ok_or(KmsError::UnsupportedKeyUri)?;
        let key = Zeroizing::new(
            URL_SAFE_NO_PAD
                .decode(encoded)
                .map_err(|_| KmsError::InvalidKeyUri("key material is not base64url"))?,
        );
        if key.len() != KEY_LEN {
            return Err(KmsError::InvalidKeyUri("key material must be 32 bytes"));
        }
        Ok(LocalKmsAead {
            cipher: cipher::build_cipher(&key)?,
        })
    }
}

/// KEK primitive backed by an in-memory XChaCha20-Poly1305 key.
pub struct LocalKmsAead {
    cipher: XChaCha20Poly1305,
}

impl std::fmt::Debug for LocalKmsAead {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("LocalKmsAead([REDACTED])")
    }
}

impl KekAead for LocalKmsAead {
    async fn encrypt(&self, plaintext: &[u8], associated_data: &[u8]) -> Result<Vec<u8>, KmsError> {
        Ok(cipher::seal(&self.cipher, plaintext, associated_data)?)
    }

    async fn decrypt(&self, ciphertext: &[u8], associated_data: &[u8]) -> Result<Vec<u8>, KmsError> {
        Ok(cipher::open(&self.cipher, ciphertext, associated_data)?)
    }
}
