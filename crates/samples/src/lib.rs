//! Building blocks of the `ingest-audience-members` and `ingest-events`
//! sample programs: read records, format them, and write batched requests.

pub mod cli;
pub mod config;
pub mod encryption;
pub mod events;
pub mod identifiers;
pub mod input;
pub mod members;
pub mod request;
pub mod sink;
pub mod telemetry;
