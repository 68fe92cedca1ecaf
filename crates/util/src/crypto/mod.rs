//! XChaCha20-Poly1305 primitives used for both DEK-encrypted data and the
//! in-process KEK of [`crate::kms::LocalKmsClient`].
//!
//! No KMS or formatting dependencies.
//!
//! # Sealed format
//!
//! ```text
//! <nonce (24 bytes)><ciphertext><tag (16 bytes)>
//! ```
//!
//! Key-id prefixing for DEK ciphertext is added by [`crate::dek`], not here.

pub mod cipher;

pub use cipher::{CipherError, KEY_LEN, NONCE_LEN, TAG_LEN};
