//! AWS KMS client for `aws-kms://<key ARN>` key URIs.

use std::path::Path;

use aws_config::{BehaviorVersion, Region};
use aws_sdk_kms::error::DisplayErrorContext;
use aws_runtime::env_config::file::{EnvConfigFileKind, EnvConfigFiles};
use aws_sdk_kms::primitives::Blob;
use tracing::debug;

use super::{KekAead, KmsClient, KmsError};

/// URI prefix recognised by [`AwsKmsClient`].
pub const AWS_KMS_PREFIX: &str = "aws-kms://";

/// Encryption-context key under which non-empty associated data is sent.
const ASSOCIATED_DATA_CONTEXT_KEY: &str = "associatedData";

/// KMS client for `aws-kms://` key URIs.
///
/// When bound to a key URI, only that URI is supported; otherwise every
/// `aws-kms://` URI is accepted and served through the same SDK client.
#[derive(Clone)]
pub struct AwsKmsClient {
    client: aws_sdk_kms::Client,
    key_uri: Option<String>,
}

impl AwsKmsClient {
    /// Build a client bound to `key_uri`.
    ///
    /// The region is taken from the key ARN. Credentials come from the
    /// credentials file at `credentials_path` when given; otherwise the
    /// standard AWS credential chain is used (environment, shared files,
    /// web identity, instance metadata).
    ///
    /// # Errors
    ///
    /// Returns [`KmsError::UnsupportedKeyUri`] or [`KmsError::InvalidKeyUri`]
    /// if `key_uri` is not a well-formed `aws-kms://` ARN URI.
    pub async fn new(key_uri: &str, credentials_path: Option<&Path>) -> Result<Self, KmsError> {
        let region = region_from_arn(key_arn(key_uri)?)?;

        let mut loader =
            aws_config::defaults(BehaviorVersion::latest()).region(Region::new(region.to_owned()));
        if let Some(path) = credentials_path {
            let files = EnvConfigFiles::builder()
                .include_default_config_file(true)
                .with_file(EnvConfigFileKind::Credentials, path)
                .build();
            loader = loader.profile_files(files);
        }
        let config = loader.load().await;

        debug!(region, custom_credentials = credentials_path.is_some(), "AWS KMS client configured");
        Ok(Self::from_client(
            aws_sdk_kms::Client::new(&config),
            Some(key_uri.to_owned()),
        ))
    }

    /// Wrap an existing SDK client, optionally bound to one key URI.
    pub fn from_client(client: aws_sdk_kms::Client, key_uri: Option<String>) -> Self {
        Self { client, key_uri }
    }
}

impl std::fmt::Debug for AwsKmsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsKmsClient")
            .field("key_uri", &self.key_uri)
            .finish_non_exhaustive()
    }
}

impl KmsClient for AwsKmsClient {
    type Aead = AwsKmsAead;

    fn supports(&self, key_uri: &str) -> bool {
        match &self.key_uri {
            Some(bound) => bound == key_uri,
            None => key_uri.starts_with(AWS_KMS_PREFIX),
        }
    }

    fn get_aead(&self, key_uri: &str) -> Result<Self::Aead, KmsError> {
        if !self.supports(key_uri) {
            return Err(KmsError::UnsupportedKeyUri);
        }
        let key_arn = key_arn(key_uri)?;
        region_from_arn(key_arn)?;
        Ok(AwsKmsAead {
            client: self.client.clone(),
            key_arn: key_arn.to_owned(),
        })
    }
}

/// KEK primitive that performs `Encrypt` / `Decrypt` calls against AWS KMS.
#[derive(Clone)]
pub struct AwsKmsAead {
    client: aws_sdk_kms::Client,
    key_arn: String,
}

impl std::fmt::Debug for AwsKmsAead {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsKmsAead")
            .field("key_arn", &self.key_arn)
            .finish_non_exhaustive()
    }
}

impl KekAead for AwsKmsAead {
    async fn encrypt(&self, plaintext: &[u8], associated_data: &[u8]) -> Result<Vec<u8>, KmsError> {
        let mut request = self
            .client
            .encrypt()
            .key_id(&self.key_arn)
            .plaintext(Blob::new(plaintext.to_vec()));
        if !associated_data.is_empty() {
            request = request
                .encryption_context(ASSOCIATED_DATA_CONTEXT_KEY, hex::encode(associated_data));
        }

        let resp = request
            .send()
            .await
            .map_err(|e| KmsError::Request(DisplayErrorContext(&e).to_string()))?;

        resp.ciphertext_blob()
            .map(|blob| blob.as_ref().to_vec())
            .ok_or(KmsError::EmptyResponse("ciphertext"))
    }

    async fn decrypt(&self, ciphertext: &[u8], associated_data: &[u8]) -> Result<Vec<u8>, KmsError> {
        let mut request = self
            .client
            .decrypt()
            .key_id(&self.key_arn)
            .ciphertext_blob(Blob::new(ciphertext.to_vec()));
        if !associated_data.is_empty() {
            request = request
                .encryption_context(ASSOCIATED_DATA_CONTEXT_KEY, hex::encode(associated_data));
        }

        let resp = request
            .send()
            .await
            .map_err(|e| KmsError::Request(DisplayErrorContext(&e).to_string()))?;

        resp.plaintext()
            .map(|blob| blob.as_ref().to_vec())
            .ok_or(KmsError::EmptyResponse("plaintext"))
    }
}

/// Strip the `aws-kms://` scheme, returning the key ARN.
fn key_arn(key_uri: &str) -> Result<&str, KmsError> {
    let arn = key_uri
        .strip_prefix(AWS_KMS_PREFIX)
        .ok_or(KmsError::UnsupportedKeyUri)?;
    if !arn.starts_with("arn:") {
        return Err(KmsError::InvalidKeyUri("key must be given as an ARN"));
    }
    Ok(arn)
}

/// Extract the region from `arn:<partition>:kms:<region>:<account>:<resource>`.
fn region_from_arn(arn: &str) -> Result<&str, KmsError> {
    let parts: Vec<&str> = arn.splitn(6, ':').collect();
    if parts.len() != 6 || parts[2] != "kms" {
        return Err(KmsError::InvalidKeyUri("ARN is not a KMS key ARN"));
    }
    if parts[3].is_empty() {
        return Err(KmsError::InvalidKeyUri("ARN has no region"));
    }
    Ok(parts[3])
}
