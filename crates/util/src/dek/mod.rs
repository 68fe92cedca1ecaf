//! Data-encryption key (DEK) handling.
//!
//! # Lifecycle
//!
//! 1. [`DekKeyset::generate`] creates a fresh XChaCha20-Poly1305 key with a
//!    random non-zero key id.
//! 2. [`DekKeyset::encrypt`] serializes it as a Tink `Keyset` and wraps it
//!    under a KEK, producing the `EncryptedKeyset` bytes sent with requests.
//! 3. [`DekKeyset::primitive`] yields the [`DataKey`] that encrypts each
//!    hashed identifier.
//!
//! # Security invariants
//!
//! - The plaintext DEK is **never** logged or written out unwrapped.
//! - Key buffers are zeroed on drop; intermediate protobuf buffers are
//!   zeroed as soon as they are no longer needed.

pub mod keyset;
pub mod proto;

pub use keyset::{DataKey, DekKeyset, KeysetError, PREFIX_LEN, TINK_START_BYTE};
