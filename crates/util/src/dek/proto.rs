//! Protobuf messages of the Tink keyset format.
//!
//! Field numbers follow `tink.proto` and `xchacha20_poly1305.proto` so that
//! the serialized keyset can be read by any Tink implementation on the
//! receiving side.

/// Type URL of an XChaCha20-Poly1305 AEAD key.
pub const XCHACHA20_POLY1305_TYPE_URL: &str =
    "type.googleapis.com/google.crypto.tink.XChaCha20Poly1305Key";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum KeyMaterialType {
    UnknownKeymaterial = 0,
    Symmetric = 1,
    AsymmetricPrivate = 2,
    AsymmetricPublic = 3,
    Remote = 4,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum KeyStatusType {
    UnknownStatus = 0,
    Enabled = 1,
    Disabled = 2,
    Destroyed = 3,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum OutputPrefixType {
    UnknownPrefix = 0,
    Tink = 1,
    Legacy = 2,
    Raw = 3,
    Crunchy = 4,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct XChaCha20Poly1305Key {
    #[prost(uint32, tag = "1")]
    pub version: u32,
    #[prost(bytes = "vec", tag = "3")]
    pub key_value: Vec<u8>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct KeyData {
    #[prost(string, tag = "1")]
    pub type_url: String,
    #[prost(bytes = "vec", tag = "2")]
    pub value: Vec<u8>,
    #[prost(enumeration = "KeyMaterialType", tag = "3")]
    pub key_material_type: i32,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Key {
    #[prost(message, optional, tag = "1")]
    pub key_data: Option<KeyData>,
    #[prost(enumeration = "KeyStatusType", tag = "2")]
    pub status: i32,
    #[prost(uint32, tag = "3")]
    pub key_id: u32,
    #[prost(enumeration = "OutputPrefixType", tag = "4")]
    pub output_prefix_type: i32,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Keyset {
    #[prost(uint32, tag = "1")]
    pub primary_key_id: u32,
    #[prost(message, repeated, tag = "2")]
    pub key: Vec<Key>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct KeyInfo {
    #[prost(string, tag = "1")]
    pub type_url: String,
    #[prost(enumeration = "KeyStatusType", tag = "2")]
    pub status: i32,
    #[prost(uint32, tag = "3")]
    pub key_id: u32,
    #[prost(enumeration = "OutputPrefixType", tag = "4")]
    pub output_prefix_type: i32,
}

/// Metadata about a keyset that is safe to store in the clear.
#[derive(Clone, PartialEq, prost::Message)]
pub struct KeysetInfo {
    #[prost(uint32, tag = "1")]
    pub primary_key_id: u32,
    #[prost(message, repeated, tag = "2")]
    pub key_info: Vec<KeyInfo>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct EncryptedKeyset {
    #[prost(bytes = "vec", tag = "2")]
    pub encrypted_keyset: Vec<u8>,
    #[prost(message, optional, tag = "3")]
    pub keyset_info: Option<KeysetInfo>,
}
