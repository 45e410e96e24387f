//! Polling orchestration
//!
//! [`PollOrchestrator`] ties the feed components together for one content type. A run
//! makes sure the subscription exists, then covers windows according to its [`RunMode`]:
//! one recurring window per trigger tick, a fixed series of backfill days, or a single
//! window at the current time. Within a window, content pages are walked one at a time
//! and every page's blobs are downloaded before the next page is requested.

pub mod sink;

pub use sink::RecordSink;

use crate::auth::{CertificateCredential, TokenManager};
use crate::config::{Config, RunMode};
use crate::error::Result;
use crate::feed::{BlobFetcher, ContentDiscovery, FeedClient, SubscriptionManager};
use crate::trigger::Trigger;
use crate::types::{ContentType, TimeWindow};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, warn};

/// Outcome of polling one window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// Window that was polled
    pub window: TimeWindow,
    /// Content pages fetched
    pub pages: usize,
    /// Content pointers discovered
    pub pointers: usize,
    /// Records handed to the sink
    pub records: usize,
}

/// Drives subscription checks, discovery and blob download for one content type
pub struct PollOrchestrator {
    content_type: ContentType,
    mode: RunMode,
    timerange_minutes: u32,
    subscriptions: SubscriptionManager,
    discovery: ContentDiscovery,
    blobs: BlobFetcher,
}

impl PollOrchestrator {
    /// Assemble an orchestrator from an existing feed client
    pub fn new(
        client: FeedClient,
        content_type: ContentType,
        mode: RunMode,
        timerange_minutes: u32,
        max_concurrent_fetches: usize,
    ) -> Self {
        Self {
            content_type,
            mode,
            timerange_minutes,
            subscriptions: SubscriptionManager::new(client.clone()),
            discovery: ContentDiscovery::new(client.clone()),
            blobs: BlobFetcher::new(client, max_concurrent_fetches),
        }
    }

    /// Build the whole stack from configuration
    ///
    /// # Errors
    /// Fails if the configuration is invalid or the client certificate cannot be loaded.
    /// No network call is made here; token acquisition happens on first use.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;

        let http = FeedClient::http_client(config)?;
        let credential = CertificateCredential::from_config(config, http.clone())?;
        let tokens = Arc::new(TokenManager::new(
            Arc::new(credential),
            config.token_safety_margin,
        ));
        let client = FeedClient::new(
            http,
            tokens,
            &config.http.api_base_url,
            &config.tenant_id,
            config.publisher_id(),
        )?;

        if config.schedule.is_some() && config.import_date.is_some() {
            warn!("Both schedule and import_date are set, ignoring the backfill parameters");
        }

        Ok(Self::new(
            client,
            config.content_type,
            config.run_mode(),
            config.timerange_minutes,
            config.http.max_concurrent_fetches,
        ))
    }

    /// Content type this orchestrator polls
    pub fn content_type(&self) -> ContentType {
        self.content_type
    }

    /// Resolved run mode
    pub fn mode(&self) -> &RunMode {
        &self.mode
    }

    /// Subscription manager, for callers that need to stop the subscription
    pub fn subscriptions(&self) -> &SubscriptionManager {
        &self.subscriptions
    }

    /// Start the subscription unless it is already listed
    ///
    /// Returns whether the subscription is active afterwards. A failed start is logged
    /// and the run carries on; discovery will then come back empty or fail per page.
    pub async fn ensure_subscription(&self) -> bool {
        if self.subscriptions.is_subscribed(self.content_type).await {
            info!(content_type = %self.content_type, "Subscription already active");
            return true;
        }

        info!(content_type = %self.content_type, "Not subscribed, starting subscription");
        let started = self.subscriptions.start(self.content_type).await;
        if !started {
            warn!(content_type = %self.content_type, "Could not start subscription");
        }
        started
    }

    /// Poll one window and emit its records in order
    ///
    /// # Errors
    /// Only a failing sink is an error. Discovery and download failures are logged and
    /// shrink the result instead.
    pub async fn poll_window<S>(&self, window: TimeWindow, sink: &S) -> Result<CycleReport>
    where
        S: RecordSink + ?Sized,
    {
        info!(content_type = %self.content_type, window = %window, "Polling window");

        let mut report = CycleReport {
            window,
            pages: 0,
            pointers: 0,
            records: 0,
        };
        let mut pages = self.discovery.pages(window, self.content_type);
        while let Some(pointers) = pages.next_page().await {
            report.pointers += pointers.len();
            let records = self.blobs.fetch_all(&pointers).await;
            for record in records {
                sink.emit(record).await?;
                report.records += 1;
            }
        }
        report.pages = pages.pages_fetched();

        info!(
            content_type = %self.content_type,
            window = %window,
            pages = report.pages,
            pointers = report.pointers,
            records = report.records,
            "Window complete"
        );
        Ok(report)
    }

    /// Poll the recurring window ending at `now`
    pub async fn run_cycle_at<S>(&self, now: DateTime<Utc>, sink: &S) -> Result<CycleReport>
    where
        S: RecordSink + ?Sized,
    {
        self.poll_window(TimeWindow::recurring(now, self.timerange_minutes), sink)
            .await
    }

    /// Run to completion according to the run mode
    ///
    /// The subscription is checked once up front. In recurring mode a cycle runs per
    /// trigger tick until the trigger stops; the other modes ignore the trigger.
    ///
    /// # Errors
    /// Returns [`Error::SinkClosed`](crate::Error::SinkClosed) if the sink goes away
    pub async fn run<T, S>(&self, trigger: &mut T, sink: &S) -> Result<()>
    where
        T: Trigger + ?Sized,
        S: RecordSink + ?Sized,
    {
        self.ensure_subscription().await;

        match &self.mode {
            RunMode::Recurring { schedule } => {
                info!(
                    content_type = %self.content_type,
                    schedule = %schedule,
                    timerange_minutes = self.timerange_minutes,
                    "Starting recurring polling"
                );
                let mut cycles = 0u64;
                while trigger.next_tick().await {
                    self.run_cycle_at(Utc::now(), sink).await?;
                    cycles += 1;
                }
                info!(content_type = %self.content_type, cycles, "Recurring polling stopped");
            }
            RunMode::Backfill { import_date, days } => {
                info!(
                    content_type = %self.content_type,
                    import_date = %import_date,
                    days,
                    "Starting backfill"
                );
                let mut records = 0;
                for window in TimeWindow::backfill(*import_date, *days) {
                    records += self.poll_window(window, sink).await?.records;
                }
                info!(content_type = %self.content_type, records, "Backfill complete");
            }
            RunMode::SingleShot => {
                self.run_cycle_at(Utc::now(), sink).await?;
            }
        }
        Ok(())
    }
}
