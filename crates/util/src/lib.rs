//! Formatting, hashing, encoding, and envelope encryption of user data for
//! the Data Manager ingestion API.
//!
//! ```no_run
//! use datamanager_util::{Encoding, Encrypter, Formatter};
//!
//! # async fn run() -> Result<(), datamanager_common::DataManagerError> {
//! let formatter = Formatter::new();
//! let hashed = formatter.process_email_address("alexz@example.com", Encoding::Hex)?;
//!
//! let encrypter = Encrypter::create_for_gcp_kms(
//!     "gcp-kms://projects/my-project/locations/us-central1/keyRings/ring/cryptoKeys/kek",
//!     None,
//! )
//! .await?;
//! let encrypted = formatter.process_email_address_encrypted(
//!     "alexz@example.com",
//!     Encoding::Hex,
//!     &encrypter,
//! )?;
//! # let _ = (hashed, encrypted);
//! # Ok(())
//! # }
//! ```

pub mod crypto;
pub mod dek;
pub mod encrypt;
pub mod format;
pub mod kms;

pub use dek::{DataKey, DekKeyset, KeysetError};
pub use encrypt::Encrypter;
pub use format::{Encoding, Formatter, HashEncrypter};
pub use kms::{
    AwsKmsAead, AwsKmsClient, GcpKmsAead, GcpKmsClient, KekAead, KmsClient, KmsError,
    LocalKmsAead, LocalKmsClient,
};
