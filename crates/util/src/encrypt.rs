//! Envelope encryption of hashed identifiers.
//!
//! An [`Encrypter`] owns one DEK for its whole lifetime. Every call to
//! [`Encrypter::encrypt`] seals under that DEK; the KEK-wrapped DEK returned
//! by [`Encrypter::encrypted_dek_bytes`] is attached once per request so the
//! receiving side can unwrap it with the same KEK.

use std::path::Path;

use datamanager_common::{DataManagerError, Result};
use tracing::debug;

use crate::dek::{DataKey, DekKeyset};
use crate::format::HashEncrypter;
use crate::kms::{AwsKmsClient, GcpKmsClient, KmsClient, KmsError};

/// Holds the DEK primitive and the KEK-wrapped DEK bytes.
///
/// Immutable after construction. `encrypt` takes `&self` and may be called
/// from any number of threads at once.
#[derive(Debug)]
pub struct Encrypter {
    dek: DataKey,
    encrypted_dek: Vec<u8>,
}

impl Encrypter {
    /// Create an encrypter for the Google Cloud KMS key at `kek_uri`
    /// (`gcp-kms://projects/<p>/locations/<l>/keyRings/<r>/cryptoKeys/<k>`).
    ///
    /// `credentials_path` names a service-account JSON file; Application
    /// Default Credentials are used when it is `None`.
    ///
    /// # Errors
    ///
    /// Returns [`DataManagerError::EncryptionUnavailable`] if the URI is not a
    /// valid Cloud KMS key URI, credentials cannot be loaded, or the KMS call
    /// fails.
    pub async fn create_for_gcp_kms(kek_uri: &str, credentials_path: Option<&Path>) -> Result<Self> {
        let client = GcpKmsClient::new(kek_uri, credentials_path).await?;
        Self::create(&client, kek_uri).await
    }

    /// Create an encrypter for the AWS KMS key at `kek_uri`
    /// (`aws-kms://arn:aws:kms:<region>:<account>:key/<id>`).
    ///
    /// `credentials_path` names an AWS credentials file; the ambient credential
    /// chain is used when it is `None`.
    ///
    /// # Errors
    ///
    /// Returns [`DataManagerError::EncryptionUnavailable`] if the URI is not a
    /// valid AWS KMS key URI or the KMS call fails.
    pub async fn create_for_aws_kms(kek_uri: &str, credentials_path: Option<&Path>) -> Result<Self> {
        let client = AwsKmsClient::new(kek_uri, credentials_path).await?;
        Self::create(&client, kek_uri).await
    }

    /// Create an encrypter with a freshly generated DEK wrapped by the KEK at
    /// `kek_uri`.
    ///
    /// # Errors
    ///
    /// Returns [`DataManagerError::EncryptionUnavailable`] if `kms` does not
    /// support `kek_uri` or wrapping the DEK fails.
    pub async fn create<K: KmsClient>(kms: &K, kek_uri: &str) -> Result<Self> {
        Self::with_keyset(kms, kek_uri, DekKeyset::generate()).await
    }

    /// Create an encrypter around a caller-supplied DEK.
    ///
    /// # Errors
    ///
    /// Same as [`Encrypter::create`].
    pub async fn with_keyset<K: KmsClient>(kms: &K, kek_uri: &str, keyset: DekKeyset) -> Result<Self> {
        if !kms.supports(kek_uri) {
            return Err(KmsError::UnsupportedKeyUri.into());
        }
        let kek = kms.get_aead(kek_uri)?;
        let dek = keyset.primitive()?;
        let encrypted_dek = keyset.encrypt(&kek, b"").await?;

        debug!(
            key_id = keyset.key_id(),
            kek_scheme = kek_uri.split("://").next().unwrap_or_default(),
            "encrypter created"
        );
        Ok(Self { dek, encrypted_dek })
    }

    /// Encrypt the UTF-8 bytes of `plaintext` with empty associated data.
    ///
    /// Each call uses a fresh random nonce, so equal inputs yield distinct
    /// ciphertexts.
    ///
    /// # Errors
    ///
    /// Returns [`DataManagerError::EncryptionFailure`] if the AEAD fails.
    pub fn encrypt(&self, plaintext: &str) -> Result<Vec<u8>> {
        self.dek
            .encrypt(plaintext.as_bytes(), b"")
            .map_err(|e| DataManagerError::EncryptionFailure(e.to_string()))
    }

    /// The DEK as a Tink `EncryptedKeyset`, wrapped under the KEK.
    pub fn encrypted_dek_bytes(&self) -> &[u8] {
        &self.encrypted_dek
    }

    pub fn key_id(&self) -> u32 {
        self.dek.key_id()
    }
}

impl HashEncrypter for Encrypter {
    fn encrypt(&self, plaintext: &str) -> Result<Vec<u8>> {
        Encrypter::encrypt(self, plaintext)
    }
}
