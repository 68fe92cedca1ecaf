//! Errors reading sample input files.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum InputError {
    #[error("failed to open input file: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed CSV input: {0}")]
    Csv(#[from] csv::Error),

    #[error("malformed JSON input: {0}")]
    Json(#[from] serde_json::Error),
}
