//! `ingest-audience-members`: sends audience members from a CSV file.
//!
//! 1. Parse flags and load [`RunConfig`] from the environment.
//! 2. Initialise structured JSON logging.
//! 3. Create the encrypter when a key URI is given.
//! 4. Read, format and hash the members.
//! 5. Write batched requests to the sink.

use anyhow::{Context, Result};
use clap::Parser;
use datamanager_samples::cli::AudienceCli;
use datamanager_samples::config::RunConfig;
use datamanager_samples::identifiers::IdentifierProcessor;
use datamanager_samples::request::{self, RequestContext};
use datamanager_samples::{encryption, members, sink, telemetry};
use datamanager_util::Encoding;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = AudienceCli::parse();
    let cfg = RunConfig::from_env().map_err(|e| {
        // Telemetry is not yet up; write to stderr directly.
        eprintln!("ERROR: configuration invalid: {e}");
        e
    })?;

    telemetry::init(&cfg.log_level)?;

    let session = encryption::setup(&cli.encryption).await?;
    let processor = IdentifierProcessor::new(Encoding::Hex, session.as_ref().map(|s| &s.encrypter));

    let records = members::read_members_file(&cli.csv_file)
        .with_context(|| format!("failed to read {}", cli.csv_file.display()))?;
    let audience_members = members::build_members(&records, &processor)?;

    let ctx = RequestContext {
        destination: cli.accounts.destination(cli.audience_id.clone()),
        encoding: processor.wire_encoding(),
        encryption_info: session.as_ref().map(|s| s.info.clone()),
        validate_only: cli.accounts.validate_only,
    };
    let mut sink = sink::open(cfg.output_path.as_deref()).context("failed to open output")?;
    request::send_audience_members(&mut sink, &ctx, audience_members, cfg.batch_size)?;
    Ok(())
}
