//! Runtime settings for the sample programs.
//!
//! Values are read from `DATAMANAGER_*` environment variables. Per-run
//! arguments such as account IDs and input files are command-line flags
//! (see [`crate::cli`]).

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Maximum number of audience members or events the API accepts per request.
pub const MAX_RECORDS_PER_REQUEST: usize = 10_000;

const ENV_PREFIX: &str = "DATAMANAGER";

/// Validated sample configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    /// Records per request. `DATAMANAGER_BATCH_SIZE`.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Tracing log level. `DATAMANAGER_LOG_LEVEL`.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// File that receives the requests; stdout when unset. `DATAMANAGER_OUTPUT_PATH`.
    #[serde(default)]
    pub output_path: Option<PathBuf>,
}

fn default_batch_size() -> usize {
    MAX_RECORDS_PER_REQUEST
}
fn default_log_level() -> String {
    "info".into()
}

impl RunConfig {
    /// Load and validate configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable cannot be parsed or fails validation.
    pub fn from_env() -> Result<Self> {
        Self::load(config::Environment::with_prefix(ENV_PREFIX))
    }

    fn load(source: config::Environment) -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(source.try_parsing(true))
            .build()
            .context("failed to build sample configuration")?;

        let c: RunConfig = cfg
            .try_deserialize()
            .context("failed to deserialise sample configuration")?;

        c.validate()?;
        Ok(c)
    }

    fn validate(&self) -> Result<()> {
        if self.batch_size == 0 || self.batch_size > MAX_RECORDS_PER_REQUEST {
            anyhow::bail!(
                "DATAMANAGER_BATCH_SIZE must be between 1 and {MAX_RECORDS_PER_REQUEST}"
            );
        }
        if self.log_level.trim().is_empty() {
            anyhow::bail!("DATAMANAGER_LOG_LEVEL must not be empty");
        }
        Ok(())
    }
}
