//! # o365-audit-dl
//!
//! Poller for the Office 365 Management Activity API: pulls audit events for one content
//! type and hands them, one record at a time, to a consumer of your choice.
//!
//! ## How a run works
//!
//! 1. A bearer token is acquired with a certificate-signed client assertion and cached
//!    until it comes within a safety margin of expiry.
//! 2. The content subscription is started if it is not listed yet.
//! 3. For every time window the content listing is walked page by page; each page's blobs
//!    are downloaded in parallel (bounded) and their records emitted in order.
//!
//! Windows come from the run mode: the last few minutes on every cron tick, a series of
//! whole days for a historical import, or a single window at the current time.
//!
//! Failures inside a cycle (network errors, error statuses, malformed bodies) are logged
//! and shrink that cycle's output; the next cycle picks up where coverage was lost, since
//! recurring windows overlap. Records can therefore be delivered more than once, and
//! consumers should deduplicate on [`LogRecord::id`].
//!
//! ## Quick Start
//!
//! ```no_run
//! use o365_audit_dl::{Config, LogRecord, PollOrchestrator, run_with_shutdown};
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_file("o365.json")?;
//!     let orchestrator = PollOrchestrator::from_config(&config)?;
//!
//!     let (tx, mut rx) = mpsc::channel::<LogRecord>(1024);
//!     tokio::spawn(async move {
//!         while let Some(record) = rx.recv().await {
//!             println!("{}", record.as_value());
//!         }
//!     });
//!
//!     run_with_shutdown(&orchestrator, &tx).await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Token acquisition and caching
pub mod auth;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Management Activity API client
pub mod feed;
/// Polling orchestration
pub mod poller;
/// Polling triggers
pub mod trigger;
/// Core types
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;

// Re-export commonly used types
pub use auth::{AccessToken, CertificateCredential, ClientCertificate, TokenManager, TokenProvider};
pub use config::{CertificateConfig, Config, HttpConfig, RunMode};
pub use error::{Error, Result};
pub use feed::{BlobFetcher, ContentDiscovery, ContentPages, FeedClient, SubscriptionManager};
pub use poller::{CycleReport, PollOrchestrator, RecordSink};
pub use trigger::{CronTrigger, ImmediateTicks, Trigger};
pub use types::{ContentPointer, ContentType, LogRecord, Subscription, TimeWindow};

use tokio_util::sync::CancellationToken;

/// Run an orchestrator until it finishes or a termination signal arrives
///
/// In recurring mode a [`CronTrigger`] drives the cycles. A signal stops the trigger; a
/// cycle already in progress completes before this returns. Backfill and single-shot runs
/// finish on their own, and are abandoned mid-window if a signal arrives first.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Errors
/// Returns an error if the schedule does not parse or the sink closes.
pub async fn run_with_shutdown<S>(orchestrator: &PollOrchestrator, sink: &S) -> Result<()>
where
    S: RecordSink + ?Sized,
{
    match orchestrator.mode() {
        RunMode::Recurring { schedule } => {
            let shutdown = CancellationToken::new();
            let mut trigger = CronTrigger::new(schedule, shutdown.clone())?;
            let run = orchestrator.run(&mut trigger, sink);
            tokio::pin!(run);

            tokio::select! {
                result = &mut run => result,
                _ = wait_for_signal() => {
                    shutdown.cancel();
                    tracing::info!("Shutdown requested, waiting for the current cycle to finish");
                    run.await
                }
            }
        }
        RunMode::Backfill { .. } | RunMode::SingleShot => {
            let mut no_ticks = ImmediateTicks::new(0);
            tokio::select! {
                result = orchestrator.run(&mut no_ticks, sink) => result,
                _ = wait_for_signal() => {
                    tracing::info!("Run abandoned on shutdown signal");
                    Ok(())
                }
            }
        }
    }
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Registration may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), Ok(mut sigint)) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            sigint.recv().await;
            tracing::info!("Received SIGINT signal (Ctrl+C)");
        }
        (Ok(mut sigterm), Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            sigterm.recv().await;
            tracing::info!("Received SIGTERM signal");
        }
        (Err(e), Err(_)) => {
            tracing::error!(error = %e, "Could not register any signal handlers, using ctrl_c fallback");
            tokio::signal::ctrl_c().await.ok();
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
