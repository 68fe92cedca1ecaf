//! `ingest-events`: sends conversion events from a JSON file.

use anyhow::{Context, Result};
use clap::Parser;
use datamanager_samples::cli::EventsCli;
use datamanager_samples::config::RunConfig;
use datamanager_samples::identifiers::IdentifierProcessor;
use datamanager_samples::request::{self, RequestContext};
use datamanager_samples::{encryption, events, sink, telemetry};
use datamanager_util::Encoding;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = EventsCli::parse();
    let cfg = RunConfig::from_env().map_err(|e| {
        eprintln!("ERROR: configuration invalid: {e}");
        e
    })?;

    telemetry::init(&cfg.log_level)?;

    let session = encryption::setup(&cli.encryption).await?;
    let processor = IdentifierProcessor::new(Encoding::Hex, session.as_ref().map(|s| &s.encrypter));

    let records = events::read_events_file(&cli.json_file)
        .with_context(|| format!("failed to read {}", cli.json_file.display()))?;
    let events = events::build_events(&records, &processor)?;

    let ctx = RequestContext {
        destination: cli.accounts.destination(cli.conversion_action_id.to_string()),
        encoding: processor.wire_encoding(),
        encryption_info: session.as_ref().map(|s| s.info.clone()),
        validate_only: cli.accounts.validate_only,
    };
    let mut sink = sink::open(cfg.output_path.as_deref()).context("failed to open output")?;
    request::send_events(&mut sink, &ctx, events, cfg.batch_size)?;
    Ok(())
}
