//! Google Cloud KMS client for `gcp-kms://projects/.../cryptoKeys/<key>` key URIs.

use std::path::Path;
use std::sync::Arc;

use google_cloud_kms::client::google_cloud_auth::credentials::CredentialsFile;
use google_cloud_kms::client::{Client, ClientConfig};
use google_cloud_kms::grpc::kms::v1::{DecryptRequest, EncryptRequest};
use tracing::debug;

use super::{KekAead, KmsClient, KmsError};

/// URI prefix recognised by [`GcpKmsClient`].
pub const GCP_KMS_PREFIX: &str = "gcp-kms://";

/// KMS client for `gcp-kms://` key URIs.
///
/// When bound to a key URI, only that URI is supported; otherwise every
/// `gcp-kms://` URI is accepted and served through the same gRPC client.
#[derive(Clone)]
pub struct GcpKmsClient {
    client: Arc<Client>,
    key_uri: Option<String>,
}

impl GcpKmsClient {
    /// Build a client bound to `key_uri`.
    ///
    /// Credentials come from the service-account JSON file at
    /// `credentials_path` when given; otherwise Application Default
    /// Credentials are used.
    ///
    /// # Errors
    ///
    /// Returns [`KmsError::UnsupportedKeyUri`] or [`KmsError::InvalidKeyUri`]
    /// if `key_uri` does not name a crypto key, and [`KmsError::Request`] if
    /// credentials cannot be loaded or the client cannot be built.
    pub async fn new(key_uri: &str, credentials_path: Option<&Path>) -> Result<Self, KmsError> {
        key_name(key_uri)?;

        let config = match credentials_path {
            Some(path) => {
                let credentials = CredentialsFile::new_from_file(path.display().to_string())
                    .await
                    .map_err(|e| KmsError::Request(format!("loading credentials: {e}")))?;
                ClientConfig::default().with_credentials(credentials).await
            }
            None => ClientConfig::default().with_auth().await,
        }
        .map_err(|e| KmsError::Request(format!("authenticating: {e}")))?;

        let client = Client::new(config)
            .await
            .map_err(|e| KmsError::Request(format!("connecting: {e}")))?;

        debug!(custom_credentials = credentials_path.is_some(), "GCP KMS client configured");
        Ok(Self::from_client(client, Some(key_uri.to_owned())))
    }

    /// Wrap an existing gRPC client, optionally bound to one key URI.
    pub fn from_client(client: Client, key_uri: Option<String>) -> Self {
        Self {
            client: Arc::new(client),
            key_uri,
        }
    }
}

impl std::fmt::Debug for GcpKmsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GcpKmsClient")
            .field("key_uri", &self.key_uri)
            .finish_non_exhaustive()
    }
}

impl KmsClient for GcpKmsClient {
    type Aead = GcpKmsAead;

    fn supports(&self, key_uri: &str) -> bool {
        supports_uri(self.key_uri.as_deref(), key_uri)
    }

    fn get_aead(&self, key_uri: &str) -> Result<Self::Aead, KmsError> {
        if !self.supports(key_uri) {
            return Err(KmsError::UnsupportedKeyUri);
        }
        Ok(GcpKmsAead {
            client: Arc::clone(&self.client),
            key_name: key_name(key_uri)?.to_owned(),
        })
    }
}

/// KEK primitive that performs `Encrypt` / `Decrypt` calls against Cloud KMS.
#[derive(Clone)]
pub struct GcpKmsAead {
    client: Arc<Client>,
    key_name: String,
}

impl std::fmt::Debug for GcpKmsAead {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GcpKmsAead")
            .field("key_name", &self.key_name)
            .finish_non_exhaustive()
    }
}

impl KekAead for GcpKmsAead {
    async fn encrypt(&self, plaintext: &[u8], associated_data: &[u8]) -> Result<Vec<u8>, KmsError> {
        let request = EncryptRequest {
            name: self.key_name.clone(),
            plaintext: plaintext.to_vec(),
            additional_authenticated_data: associated_data.to_vec(),
            ..Default::default()
        };
        let resp = self
            .client
            .encrypt(request, None)
            .await
            .map_err(|e| KmsError::Request(e.to_string()))?;

        if resp.ciphertext.is_empty() {
            return Err(KmsError::EmptyResponse("ciphertext"));
        }
        Ok(resp.ciphertext)
    }

    async fn decrypt(&self, ciphertext: &[u8], associated_data: &[u8]) -> Result<Vec<u8>, KmsError> {
        let request = DecryptRequest {
            name: self.key_name.clone(),
            ciphertext: ciphertext.to_vec(),
            additional_authenticated_data: associated_data.to_vec(),
            ..Default::default()
        };
        let resp = self
            .client
            .decrypt(request, None)
            .await
            .map_err(|e| KmsError::Request(e.to_string()))?;

        if resp.plaintext.is_empty() {
            return Err(KmsError::EmptyResponse("plaintext"));
        }
        Ok(resp.plaintext)
    }
}

fn supports_uri(bound: Option<&str>, key_uri: &str) -> bool {
    match bound {
        Some(bound) => bound == key_uri,
        None => key_uri.starts_with(GCP_KMS_PREFIX),
    }
}

/// Strip the `gcp-kms://` scheme, returning the crypto key resource name
/// `projects/<p>/locations/<l>/keyRings/<r>/cryptoKeys/<k>`.
fn key_name(key_uri: &str) -> Result<&str, KmsError> {
    let name = key_uri
        .strip_prefix(GCP_KMS_PREFIX)
        .ok_or(KmsError::UnsupportedKeyUri)?;
    let parts: Vec<&str> = name.split('/').collect();
    let labels_ok = parts.len() == 8
        && parts[0] == "projects"
        && parts[2] == "locations"
        && parts[4] == "keyRings"
        && parts[6] == "cryptoKeys";
    if !labels_ok {
        return Err(KmsError::InvalidKeyUri(
            "key must be projects/*/locations/*/keyRings/*/cryptoKeys/*",
        ));
    }
    if parts.iter().any(|p| p.is_empty()) {
        return Err(KmsError::InvalidKeyUri("key name has an empty segment"));
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    const URI: &str = "gcp-kms://projects/my-project/locations/us-central1/keyRings/ring/cryptoKeys/kek";

    #[test]
    fn key_name_is_the_resource_path() {
        assert_eq!(
            key_name(URI).unwrap(),
            "projects/my-project/locations/us-central1/keyRings/ring/cryptoKeys/kek"
        );
    }

    #[test]
    fn malformed_key_names_rejected() {
        assert!(matches!(key_name("aws-kms://arn:aws:kms:us-east-1:1:key/k"), Err(KmsError::UnsupportedKeyUri)));
        for uri in [
            "gcp-kms://projects/p",
            "gcp-kms://projects/p/locations/l/keyRings/r",
            "gcp-kms://projects/p/locations/l/keyRings/r/cryptoKeys/",
            "gcp-kms://projects//locations/l/keyRings/r/cryptoKeys/k",
            "gcp-kms://projects/p/locations/l/keyRings/r/cryptoKeys/k/cryptoKeyVersions/1",
            "gcp-kms://folders/p/locations/l/keyRings/r/cryptoKeys/k",
        ] {
            assert!(matches!(key_name(uri), Err(KmsError::InvalidKeyUri(_))), "uri {uri}");
        }
    }

    #[test]
    fn unbound_client_supports_any_gcp_uri() {
        assert!(supports_uri(None, URI));
        assert!(supports_uri(None, "gcp-kms://projects/other/locations/l/keyRings/r/cryptoKeys/k"));
        assert!(!supports_uri(None, "local-kms://AAAA"));
    }

    #[test]
    fn bound_client_supports_only_its_uri() {
        assert!(supports_uri(Some(URI), URI));
        assert!(!supports_uri(
            Some(URI),
            "gcp-kms://projects/my-project/locations/us-central1/keyRings/ring/cryptoKeys/other"
        ));
    }

    #[tokio::test]
    async fn malformed_uri_fails_before_authenticating() {
        let err = GcpKmsClient::new("gcp-kms://projects/p", None).await.unwrap_err();
        assert!(matches!(err, KmsError::InvalidKeyUri(_)));
    }
}
