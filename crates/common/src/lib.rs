//! Common types, request envelopes, and errors shared across `datamanager-util` crates.

pub mod error;
pub mod protocol;

pub use error::{DataManagerError, Result};
