//! XChaCha20-Poly1305 sealing and opening of byte strings.
//!
//! **Algorithm choice:** XChaCha20-Poly1305 has a 192-bit nonce, so a fresh
//! random nonce per call is safe for any realistic number of messages under
//! one key. No counter or nonce bookkeeping is needed across threads.
//!
//! **Do NOT substitute a 96-bit-nonce AEAD here.** Random 96-bit nonces collide
//! after roughly 2^32 messages, and a collision breaks both confidentiality
//! and authentication.

use chacha20poly1305::{
    aead::{rand_core::RngCore, Aead, KeyInit, OsRng, Payload},
    XChaCha20Poly1305, XNonce,
};
use thiserror::Error;
use zeroize::Zeroizing;

/// Byte length of an XChaCha20-Poly1305 key (32 bytes = 256 bits).
pub const KEY_LEN: usize = 32;

/// Byte length of an XChaCha20-Poly1305 nonce (24 bytes = 192 bits).
pub const NONCE_LEN: usize = 24;

/// Byte length of the Poly1305 authentication tag.
pub const TAG_LEN: usize = 16;

/// Errors produced by the cipher layer.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CipherError {
    /// The key is the wrong length (must be [`KEY_LEN`] bytes).
    #[error("invalid key length: expected {KEY_LEN} bytes")]
    InvalidKeyLength,

    /// AEAD encryption or decryption failed.
    #[error("aead operation failed")]
    AeadFailure,

    /// The sealed bytes are too short to hold a nonce and tag.
    #[error("ciphertext is too short")]
    Truncated,
}

/// Build a cipher instance from raw key bytes.
///
/// # Errors
///
/// Returns [`CipherError::InvalidKeyLength`] if `key` is not [`KEY_LEN`] bytes.
pub fn build_cipher(key: &[u8]) -> Result<XChaCha20Poly1305, CipherError> {
    if key.len() != KEY_LEN {
        return Err(CipherError::InvalidKeyLength);
    }
    XChaCha20Poly1305::new_from_slice(key).map_err(|_| CipherError::InvalidKeyLength)
}

/// Generate a fresh random key from the OS CSPRNG.
pub fn random_key() -> Zeroizing<[u8; KEY_LEN]> {
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    OsRng.fill_bytes(&mut key[..]);
    key
}

/// Encrypt `plaintext` bound to `associated_data`.
///
/// A random 192-bit nonce is generated per call. The output layout is:
///
/// ```text
/// [ nonce (24 bytes) ][ ciphertext ][ tag (16 bytes) ]
/// ```
///
/// # Errors
///
/// Returns [`CipherError::AeadFailure`] on an internal AEAD error (unreachable
/// with a valid key short of absurd plaintext lengths).
pub fn seal(
    cipher: &XChaCha20Poly1305,
    plaintext: &[u8],
    associated_data: &[u8],
) -> Result<Vec<u8>, CipherError> {
    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = XNonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(
            nonce,
            Payload {
                msg: plaintext,
                aad: associated_data,
            },
        )
        .map_err(|_| CipherError::AeadFailure)?;

    let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Decrypt bytes produced by [`seal`].
///
/// # Errors
///
/// Returns [`CipherError::Truncated`] if `sealed` cannot hold a nonce and tag.
/// Returns [`CipherError::AeadFailure`] if authentication fails (wrong key,
/// wrong associated data, or tampered bytes).
pub fn open(
    cipher: &XChaCha20Poly1305,
    sealed: &[u8],
    associated_data: &[u8],
) -> Result<Vec<u8>, CipherError> {
    if sealed.len() < NONCE_LEN + TAG_LEN {
        return Err(CipherError::Truncated);
    }
    let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LEN);
    cipher
        .decrypt(
            XNonce::from_slice(nonce_bytes),
            Payload {
                msg: ciphertext,
                aad: associated_data,
            },
        )
        .map_err(|_| CipherError::AeadFailure)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn random_cipher() -> XChaCha20Poly1305 {
        build_cipher(&random_key()[..]).unwrap()
    }

    #[test]
    fn seal_open_round_trip() {
        let cipher = random_cipher();
        let sealed = seal(&cipher, b"hashed value", b"").unwrap();
        assert_eq!(sealed.len(), NONCE_LEN + 12 + TAG_LEN);
        assert_eq!(open(&cipher, &sealed, b"").unwrap(), b"hashed value");
    }

    #[test]
    fn nonce_is_fresh_per_call() {
        let cipher = random_cipher();
        let a = seal(&cipher, b"same", b"").unwrap();
        let b = seal(&cipher, b"same", b"").unwrap();
        assert_ne!(a[..NONCE_LEN], b[..NONCE_LEN]);
        assert_ne!(a, b);
    }

    #[test]
    fn wrong_key_fails() {
        let sealed = seal(&random_cipher(), b"secret", b"").unwrap();
        assert_eq!(
            open(&random_cipher(), &sealed, b""),
            Err(CipherError::AeadFailure)
        );
    }

    #[test]
    fn associated_data_is_authenticated() {
        let cipher = random_cipher();
        let sealed = seal(&cipher, b"secret", b"context-a").unwrap();
        assert!(open(&cipher, &sealed, b"context-b").is_err());
        assert!(open(&cipher, &sealed, b"context-a").is_ok());
    }

    #[test]
    fn invalid_key_length_rejected() {
        assert_eq!(
            build_cipher(&[0u8; 16]).err(),
            Some(CipherError::InvalidKeyLength)
        );
    }

    #[test]
    fn truncated_input_rejected() {
        let cipher = random_cipher();
        assert_eq!(
            open(&cipher, &[0u8; NONCE_LEN + TAG_LEN - 1], b""),
            Err(CipherError::Truncated)
        );
    }

    #[test]
    fn tampered_ciphertext_fails_auth() {
        let cipher = random_cipher();
        let mut sealed = seal(&cipher, b"tamper me", b"").unwrap();
        // Flip a byte past the nonce to simulate tampering.
        sealed[NONCE_LEN] ^= 0xFF;
        assert!(open(&cipher, &sealed, b"").is_err());
    }
}
