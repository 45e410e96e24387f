//! Poll audit events and print them as JSON lines
//!
//! This example demonstrates the whole pipeline of o365-audit-dl:
//! - Loading a JSON configuration file
//! - Building the orchestrator (certificate, token cache, feed client)
//! - Consuming records from a channel
//! - Running until the run mode completes or Ctrl+C
//!
//! ```bash
//! RUST_LOG=o365_audit_dl=debug cargo run --example poll_to_stdout -- o365.json
//! ```
//!
//! Records go to stdout, logs to stderr.

use o365_audit_dl::{Config, LogRecord, PollOrchestrator, run_with_shutdown};
use std::io::Write;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "o365.json".to_string());
    let config = Config::from_file(&config_path)?;
    tracing::info!(
        config = %config_path,
        content_type = %config.content_type,
        mode = ?config.run_mode(),
        "Loaded configuration"
    );

    let orchestrator = PollOrchestrator::from_config(&config)?;

    let (tx, mut rx) = mpsc::channel::<LogRecord>(1024);
    let printer = tokio::spawn(async move {
        let mut out = std::io::stdout();
        let mut printed = 0u64;
        while let Some(record) = rx.recv().await {
            if writeln!(out, "{}", record.as_value()).is_err() {
                break;
            }
            printed += 1;
        }
        printed
    });

    run_with_shutdown(&orchestrator, &tx).await?;
    drop(tx);

    let printed = printer.await?;
    tracing::info!(records = printed, "Done");
    Ok(())
}
