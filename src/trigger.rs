//! Periodic triggers for recurring polls
//!
//! The poller does not own a clock loop. It asks a [`Trigger`] for the next tick, runs
//! one cycle, and asks again, so a tick can never start while a previous cycle is still
//! running. [`CronTrigger`] is the production implementation: it sleeps until the next
//! occurrence of a cron expression and stops when its cancellation token fires.

use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::Utc;
use croner::Cron;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Source of polling ticks
#[async_trait]
pub trait Trigger: Send {
    /// Wait for the next tick. Returns `false` when no further ticks will come.
    async fn next_tick(&mut self) -> bool;
}

/// Parse a 5-field (or 6-field, with seconds) cron expression
pub fn parse_schedule(schedule: &str) -> Result<Cron> {
    Cron::new(schedule)
        .with_seconds_optional()
        .parse()
        .map_err(|e| Error::Schedule(format!("invalid cron expression '{schedule}': {e}")))
}

/// Cron-driven trigger, evaluated in UTC
pub struct CronTrigger {
    cron: Cron,
    schedule: String,
    shutdown: CancellationToken,
}

impl CronTrigger {
    /// Create a trigger for `schedule` that stops once `shutdown` is cancelled
    ///
    /// # Errors
    /// Returns [`Error::Schedule`] if the expression does not parse
    pub fn new(schedule: &str, shutdown: CancellationToken) -> Result<Self> {
        Ok(Self {
            cron: parse_schedule(schedule)?,
            schedule: schedule.to_string(),
            shutdown,
        })
    }
}

#[async_trait]
impl Trigger for CronTrigger {
    async fn next_tick(&mut self) -> bool {
        if self.shutdown.is_cancelled() {
            return false;
        }

        // Computed after the previous cycle returned: occurrences that fell inside it are skipped.
        let now = Utc::now();
        let next = match self.cron.find_next_occurrence(&now, false) {
            Ok(next) => next,
            Err(e) => {
                warn!(schedule = %self.schedule, error = %e, "No next occurrence for schedule, stopping");
                return false;
            }
        };
        let wait = (next - now).to_std().unwrap_or_default();
        debug!(schedule = %self.schedule, next = %next, "Waiting for next poll");

        tokio::select! {
            _ = tokio::time::sleep(wait) => true,
            _ = self.shutdown.cancelled() => {
                info!(schedule = %self.schedule, "Trigger cancelled");
                false
            }
        }
    }
}

/// Trigger that fires a fixed number of times without waiting
#[derive(Debug, Clone, Copy)]
pub struct ImmediateTicks {
    remaining: usize,
}

impl ImmediateTicks {
    /// Fire `count` ticks, then stop
    pub fn new(count: usize) -> Self {
        Self { remaining: count }
    }

    /// Ticks not yet delivered
    pub fn remaining(&self) -> usize {
        self.remaining
    }
}

#[async_trait]
impl Trigger for ImmediateTicks {
    async fn next_tick(&mut self) -> bool {
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        true
    }
}
