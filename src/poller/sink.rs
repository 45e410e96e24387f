//! Record consumers.

use crate::error::{Error, Result};
use crate::types::LogRecord;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Downstream consumer of polled records
///
/// Records arrive one at a time, in the order they were produced. The same record may be
/// delivered again by a later cycle; consumers deduplicate on [`LogRecord::id`].
#[async_trait]
pub trait RecordSink: Send + Sync {
    /// Hand over one record. An error stops the run.
    async fn emit(&self, record: LogRecord) -> Result<()>;
}

#[async_trait]
impl RecordSink for mpsc::Sender<LogRecord> {
    async fn emit(&self, record: LogRecord) -> Result<()> {
        self.send(record).await.map_err(|_| Error::SinkClosed)
    }
}

#[async_trait]
impl RecordSink for mpsc::UnboundedSender<LogRecord> {
    async fn emit(&self, record: LogRecord) -> Result<()> {
        self.send(record).map_err(|_| Error::SinkClosed)
    }
}
