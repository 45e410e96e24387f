//! Content blob download and flattening.

use super::FeedClient;
use crate::error::Result;
use crate::types::{ContentPointer, LogRecord};
use futures::stream::{self, StreamExt};
use reqwest::Method;
use tracing::{debug, error};

/// Downloads content blobs with bounded parallelism
#[derive(Clone)]
pub struct BlobFetcher {
    client: FeedClient,
    max_concurrent: usize,
}

impl BlobFetcher {
    /// Create a fetcher running at most `max_concurrent` downloads at once
    pub fn new(client: FeedClient, max_concurrent: usize) -> Self {
        Self {
            client,
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Download every pointer and return all records, in pointer order
    ///
    /// Returns once every download has finished. A blob that fails (transport error,
    /// non-success status, body that is not a JSON array) contributes no records and
    /// does not affect the others.
    pub async fn fetch_all(&self, pointers: &[ContentPointer]) -> Vec<LogRecord> {
        let per_blob: Vec<Vec<LogRecord>> = stream::iter(pointers)
            .map(|pointer| self.fetch_blob(pointer))
            .buffered(self.max_concurrent)
            .collect()
            .await;

        let records: Vec<LogRecord> = per_blob.into_iter().flatten().collect();
        debug!(
            blobs = pointers.len(),
            records = records.len(),
            "Fetched content blobs"
        );
        records
    }

    async fn fetch_blob(&self, pointer: &ContentPointer) -> Vec<LogRecord> {
        match self.try_fetch_blob(&pointer.content_uri).await {
            Ok(records) => records,
            Err(e) => {
                error!(
                    uri = %pointer.content_uri,
                    error = %e,
                    error_code = e.error_code(),
                    "Error retrieving blob content"
                );
                Vec::new()
            }
        }
    }

    async fn try_fetch_blob(&self, uri: &str) -> Result<Vec<LogRecord>> {
        let url = self.client.with_publisher(uri)?;
        let response = self
            .client
            .authorized(Method::GET, url)
            .await?
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            debug!(uri, status = status.as_u16(), "Skipping blob");
            return Ok(Vec::new());
        }

        let body = response.bytes().await?;
        let records: Vec<LogRecord> = serde_json::from_slice(&body)?;
        Ok(records)
    }
}
