//! [`DekKeyset`]: DEK material with its Tink keyset encoding, and
//! [`DataKey`]: the AEAD primitive derived from it.

use chacha20poly1305::{
    aead::{rand_core::RngCore, OsRng},
    XChaCha20Poly1305,
};
use datamanager_common::DataManagerError;
use prost::Message;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use super::proto::{
    self, KeyMaterialType, KeyStatusType, OutputPrefixType, XCHACHA20_POLY1305_TYPE_URL,
};
use crate::crypto::cipher::{self, CipherError, KEY_LEN};
use crate::kms::{KekAead, KmsError};

/// First byte of every ciphertext produced under a `TINK` output prefix.
pub const TINK_START_BYTE: u8 = 0x01;

/// Length of the `TINK` output prefix: start byte plus big-endian key id.
pub const PREFIX_LEN: usize = 5;

/// Errors produced by the DEK layer.
#[derive(Debug, Error)]
pub enum KeysetError {
    /// The serialized keyset is not valid protobuf.
    #[error("keyset could not be parsed: {0}")]
    Decode(#[from] prost::DecodeError),

    /// The keyset has no enabled XChaCha20-Poly1305 primary key with a TINK prefix.
    #[error("keyset has no supported primary key")]
    UnsupportedKeyset,

    /// The key material has an unexpected length.
    #[error("DEK has invalid length: expected {KEY_LEN} bytes, got {0}")]
    InvalidLength(usize),

    /// The ciphertext was not produced by this key.
    #[error("ciphertext does not carry this key's prefix")]
    PrefixMismatch,

    /// Wrapping or unwrapping the keyset under the KEK failed.
    #[error(transparent)]
    Kms(#[from] KmsError),

    /// Encryption or decryption under the DEK failed.
    #[error(transparent)]
    Cipher(#[from] CipherError),
}

impl From<KeysetError> for DataManagerError {
    fn from(err: KeysetError) -> Self {
        DataManagerError::EncryptionUnavailable(err.to_string())
    }
}

/// Fixed-size key buffer that holds exactly [`KEY_LEN`] bytes.
///
/// The memory is overwritten with zeroes on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
struct DekBytes([u8; KEY_LEN]);

impl std::fmt::Debug for DekBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material.
        f.write_str("DekBytes([REDACTED])")
    }
}

/// A single-key XChaCha20-Poly1305 keyset.
#[derive(Clone, Debug)]
pub struct DekKeyset {
    key_id: u32,
    key: DekBytes,
}

impl DekKeyset {
    /// Generate a fresh DEK with a random non-zero key id.
    pub fn generate() -> Self {
        let key_id = loop {
            let id = OsRng.next_u32();
            if id != 0 {
                break id;
            }
        };
        let key = cipher::random_key();
        Self {
            key_id,
            key: DekBytes(*key),
        }
    }

    /// Build a keyset from existing key material.
    ///
    /// # Errors
    ///
    /// Returns [`KeysetError::InvalidLength`] if `key` is not [`KEY_LEN`] bytes.
    pub fn from_key(key_id: u32, key: &[u8]) -> Result<Self, KeysetError> {
        let bytes: [u8; KEY_LEN] = key
            .try_into()
            .map_err(|_| KeysetError::InvalidLength(key.len()))?;
        Ok(Self {
            key_id,
            key: DekBytes(bytes),
        })
    }

    pub fn key_id(&self) -> u32 {
        self.key_id
    }

    /// Derive the data-encryption primitive.
    pub fn primitive(&self) -> Result<DataKey, KeysetError> {
        Ok(DataKey {
            key_id: self.key_id,
            cipher: cipher::build_cipher(&self.key.0)?,
        })
    }

    /// Key metadata without key material.
    pub fn keyset_info(&self) -> proto::KeysetInfo {
        proto::KeysetInfo {
            primary_key_id: self.key_id,
            key_info: vec![proto::KeyInfo {
                type_url: XCHACHA20_POLY1305_TYPE_URL.to_owned(),
                status: KeyStatusType::Enabled as i32,
                key_id: self.key_id,
                output_prefix_type: OutputPrefixType::Tink as i32,
            }],
        }
    }

    /// Serialize to the binary Tink `Keyset` form.
    pub fn to_proto_bytes(&self) -> Zeroizing<Vec<u8>> {
        let mut key_proto = proto::XChaCha20Poly1305Key {
            version: 0,
            key_value: self.key.0.to_vec(),
        };
        let mut keyset = proto::Keyset {
            primary_key_id: self.key_id,
            key: vec![proto::Key {
                key_data: Some(proto::KeyData {
                    type_url: XCHACHA20_POLY1305_TYPE_URL.to_owned(),
                    value: key_proto.encode_to_vec(),
                    key_material_type: KeyMaterialType::Symmetric as i32,
                }),
                status: KeyStatusType::Enabled as i32,
                key_id: self.key_id,
                output_prefix_type: OutputPrefixType::Tink as i32,
            }],
        };
        let encoded = Zeroizing::new(keyset.encode_to_vec());

        key_proto.key_value.zeroize();
        for key in &mut keyset.key {
            if let Some(data) = key.key_data.as_mut() {
                data.value.zeroize();
            }
        }
        encoded
    }

    /// Parse a binary Tink `Keyset` holding an XChaCha20-Poly1305 primary key.
    ///
    /// # Errors
    ///
    /// Returns [`KeysetError::Decode`] for malformed protobuf and
    /// [`KeysetError::UnsupportedKeyset`] if the primary key is missing,
    /// disabled, of another type, or not TINK-prefixed.
    pub fn from_proto_bytes(bytes: &[u8]) -> Result<Self, KeysetError> {
        let mut keyset = proto::Keyset::decode(bytes)?;
        let primary_key_id = keyset.primary_key_id;

        let result = keyset
            .key
            .iter()
            .find(|k| k.key_id == primary_key_id)
            .filter(|k| {
                k.status == KeyStatusType::Enabled as i32
                    && k.output_prefix_type == OutputPrefixType::Tink as i32
            })
            .and_then(|k| k.key_data.as_ref())
            .filter(|d| d.type_url == XCHACHA20_POLY1305_TYPE_URL)
            .ok_or(KeysetError::UnsupportedKeyset)
            .and_then(|data| {
                let mut key_proto = proto::XChaCha20Poly1305Key::decode(data.value.as_slice())?;
                let parsed = if key_proto.version != 0 {
                    Err(KeysetError::UnsupportedKeyset)
                } else {
                    Self::from_key(primary_key_id, &key_proto.key_value)
                };
                key_proto.key_value.zeroize();
                parsed
            });

        for key in &mut keyset.key {
            if let Some(data) = key.key_data.as_mut() {
                data.value.zeroize();
            }
        }
        result
    }

    /// Encrypt the serialized keyset under `kek`, producing the binary Tink
    /// `EncryptedKeyset` form that travels alongside the ciphertext.
    ///
    /// # Errors
    ///
    /// Returns [`KeysetError::Kms`] if the KEK encryption call fails.
    pub async fn encrypt<A: KekAead>(
        &self,
        kek: &A,
        associated_data: &[u8],
    ) -> Result<Vec<u8>, KeysetError> {
        let keyset_bytes = self.to_proto_bytes();
        let encrypted_keyset = kek.encrypt(&keyset_bytes, associated_data).await?;
        Ok(proto::EncryptedKeyset {
            encrypted_keyset,
            keyset_info: Some(self.keyset_info()),
        }
        .encode_to_vec())
    }

    /// Inverse of [`DekKeyset::encrypt`]: unwrap an `EncryptedKeyset` with `kek`.
    ///
    /// # Errors
    ///
    /// Returns [`KeysetError::Decode`] for malformed input, [`KeysetError::Kms`]
    /// if the KEK cannot decrypt it, or any error of [`DekKeyset::from_proto_bytes`].
    pub async fn decrypt<A: KekAead>(
        encrypted: &[u8],
        kek: &A,
        associated_data: &[u8],
    ) -> Result<Self, KeysetError> {
        let envelope = proto::EncryptedKeyset::decode(encrypted)?;
        let keyset_bytes = Zeroizing::new(
            kek.decrypt(&envelope.encrypted_keyset, associated_data)
                .await?,
        );
        Self::from_proto_bytes(&keyset_bytes)
    }
}

/// The AEAD primitive for one DEK.
///
/// Ciphertext layout:
///
/// ```text
/// [ 0x01 ][ key id (4 bytes, big-endian) ][ nonce (24) ][ ciphertext ][ tag (16) ]
/// ```
///
/// `XChaCha20Poly1305` is `Send + Sync` and encrypts through `&self`, so one
/// `DataKey` can be shared by any number of threads.
pub struct DataKey {
    key_id: u32,
    cipher: XChaCha20Poly1305,
}

impl DataKey {
    pub fn key_id(&self) -> u32 {
        self.key_id
    }

    fn prefix(&self) -> [u8; PREFIX_LEN] {
        let id = self.key_id.to_be_bytes();
        [TINK_START_BYTE, id[0], id[1], id[2], id[3]]
    }

    /// Encrypt `plaintext` with a fresh random nonce.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::AeadFailure`] on an internal AEAD error.
    pub fn encrypt(&self, plaintext: &[u8], associated_data: &[u8]) -> Result<Vec<u8>, CipherError> {
        let sealed = cipher::seal(&self.cipher, plaintext, associated_data)?;
        let mut out = Vec::with_capacity(PREFIX_LEN + sealed.len());
        out.extend_from_slice(&self.prefix());
        out.extend_from_slice(&sealed);
        Ok(out)
    }

    /// Decrypt bytes produced by [`DataKey::encrypt`].
    ///
    /// # Errors
    ///
    /// Returns [`KeysetError::PrefixMismatch`] if the ciphertext was produced by
    /// another key, or [`KeysetError::Cipher`] if authentication fails.
    pub fn decrypt(&self, ciphertext: &[u8], associated_data: &[u8]) -> Result<Vec<u8>, KeysetError> {
        let sealed = ciphertext
            .strip_prefix(&self.prefix())
            .ok_or(KeysetError::PrefixMismatch)?;
        Ok(cipher::open(&self.cipher, sealed, associated_data)?)
    }
}

impl std::fmt::Debug for DataKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataKey")
            .field("key_id", &self.key_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{NONCE_LEN, TAG_LEN};
    use crate::kms::{KmsClient, LocalKmsClient};

    #[test]
    fn generated_key_id_is_non_zero() {
        for _ in 0..16 {
            assert_ne!(DekKeyset::generate().key_id(), 0);
        }
    }

    #[test]
    fn from_key_rejects_wrong_length() {
        assert!(matches!(
            DekKeyset::from_key(7, &[0u8; 16]),
            Err(KeysetError::InvalidLength(16))
        ));
    }

    #[test]
    fn keyset_proto_round_trip_preserves_key() {
        let keyset = DekKeyset::generate();
        let parsed = DekKeyset::from_proto_bytes(&keyset.to_proto_bytes()).unwrap();
        assert_eq!(parsed.key_id(), keyset.key_id());

        let ct = keyset.primitive().unwrap().encrypt(b"payload", b"").unwrap();
        assert_eq!(parsed.primitive().unwrap().decrypt(&ct, b"").unwrap(), b"payload");
    }

    #[test]
    fn keyset_proto_has_tink_shape() {
        let keyset = DekKeyset::from_key(42, &[0x11; KEY_LEN]).unwrap();
        let decoded = proto::Keyset::decode(keyset.to_proto_bytes().as_slice()).unwrap();
        assert_eq!(decoded.primary_key_id, 42);
        assert_eq!(decoded.key.len(), 1);
        let key = &decoded.key[0];
        assert_eq!(key.key_id, 42);
        assert_eq!(key.status, KeyStatusType::Enabled as i32);
        assert_eq!(key.output_prefix_type, OutputPrefixType::Tink as i32);
        let data = key.key_data.as_ref().unwrap();
        assert_eq!(data.type_url, XCHACHA20_POLY1305_TYPE_URL);
        assert_eq!(data.key_material_type, KeyMaterialType::Symmetric as i32);
        let inner = proto::XChaCha20Poly1305Key::decode(data.value.as_slice()).unwrap();
        assert_eq!(inner.version, 0);
        assert_eq!(inner.key_value, vec![0x11; KEY_LEN]);
    }

    #[test]
    fn keyset_without_enabled_primary_is_rejected() {
        let mut keyset = proto::Keyset::decode(
            DekKeyset::from_key(9, &[0x22; KEY_LEN])
                .unwrap()
                .to_proto_bytes()
                .as_slice(),
        )
        .unwrap();
        keyset.key[0].status = KeyStatusType::Disabled as i32;
        assert!(matches!(
            DekKeyset::from_proto_bytes(&keyset.encode_to_vec()),
            Err(KeysetError::UnsupportedKeyset)
        ));

        keyset.key[0].status = KeyStatusType::Enabled as i32;
        keyset.primary_key_id = 10;
        assert!(matches!(
            DekKeyset::from_proto_bytes(&keyset.encode_to_vec()),
            Err(KeysetError::UnsupportedKeyset)
        ));
    }

    #[test]
    fn garbage_keyset_bytes_rejected() {
        assert!(DekKeyset::from_proto_bytes(&[0xFF, 0xFF, 0xFF]).is_err());
    }

    #[test]
    fn ciphertext_carries_tink_prefix() {
        let keyset = DekKeyset::from_key(0x0102_0304, &[0x33; KEY_LEN]).unwrap();
        let ct = keyset.primitive().unwrap().encrypt(b"abc", b"").unwrap();
        assert_eq!(&ct[..PREFIX_LEN], &[0x01, 0x01, 0x02, 0x03, 0x04]);
        assert_eq!(ct.len(), PREFIX_LEN + NONCE_LEN + 3 + TAG_LEN);
    }

    #[test]
    fn ciphertext_from_other_key_id_rejected() {
        let a = DekKeyset::from_key(1, &[0x44; KEY_LEN]).unwrap();
        let b = DekKeyset::from_key(2, &[0x44; KEY_LEN]).unwrap();
        let ct = a.primitive().unwrap().encrypt(b"abc", b"").unwrap();
        assert!(matches!(
            b.primitive().unwrap().decrypt(&ct, b""),
            Err(KeysetError::PrefixMismatch)
        ));
    }

    #[test]
    fn debug_output_is_redacted() {
        let keyset = DekKeyset::from_key(5, &[0xAB; KEY_LEN]).unwrap();
        let printed = format!("{keyset:?}");
        assert!(printed.contains("REDACTED"));
        assert!(!printed.contains("171"));
    }

    #[tokio::test]
    async fn encrypted_keyset_unwraps_with_same_kek() {
        let uri = LocalKmsClient::generate_key_uri();
        let kek = LocalKmsClient::new().get_aead(&uri).unwrap();
        let keyset = DekKeyset::generate();

        let encrypted = keyset.encrypt(&kek, b"").await.unwrap();
        let envelope = proto::EncryptedKeyset::decode(encrypted.as_slice()).unwrap();
        assert_eq!(envelope.keyset_info.unwrap().primary_key_id, keyset.key_id());

        let unwrapped = DekKeyset::decrypt(&encrypted, &kek, b"").await.unwrap();
        assert_eq!(unwrapped.key_id(), keyset.key_id());
    }

    #[tokio::test]
    async fn encrypted_keyset_rejects_other_kek() {
        let kek = LocalKmsClient::new()
            .get_aead(&LocalKmsClient::generate_key_uri())
            .unwrap();
        let other = LocalKmsClient::new()
            .get_aead(&LocalKmsClient::generate_key_uri())
            .unwrap();
        let encrypted = DekKeyset::generate().encrypt(&kek, b"").await.unwrap();
        assert!(matches!(
            DekKeyset::decrypt(&encrypted, &other, b"").await,
            Err(KeysetError::Kms(_))
        ));
    }
}
