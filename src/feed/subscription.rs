//! Content subscription management.

use super::{FeedClient, PUBLISHER_PARAM, ensure_success};
use crate::error::{Error, Result};
use crate::types::{ContentType, Subscription};
use reqwest::Method;
use reqwest::header::CONTENT_LENGTH;
use tracing::{debug, error, info, warn};

/// Checks and toggles the per-content-type subscription
///
/// State is always read live from the API; nothing is cached between calls.
#[derive(Clone)]
pub struct SubscriptionManager {
    client: FeedClient,
}

impl SubscriptionManager {
    /// Create a manager on top of `client`
    pub fn new(client: FeedClient) -> Self {
        Self { client }
    }

    /// List every subscription of the tenant
    ///
    /// # Errors
    /// Returns an error on transport failure, non-success status or an unparseable body
    pub async fn list(&self) -> Result<Vec<Subscription>> {
        let url = self.client.endpoint("list");
        let response = self
            .client
            .authorized(Method::GET, &url)
            .await?
            .send()
            .await?;
        let subscriptions: Vec<Subscription> = ensure_success(response)?.json().await?;
        Ok(subscriptions)
    }

    /// Whether the listing contains `content_type`
    ///
    /// Returns false for an empty or non-matching listing, and when the listing cannot
    /// be fetched (logged).
    pub async fn is_subscribed(&self, content_type: ContentType) -> bool {
        match self.list().await {
            Ok(subscriptions) => {
                debug!(
                    content_type = %content_type,
                    subscriptions = ?subscriptions
                        .iter()
                        .map(|s| s.content_type.as_str())
                        .collect::<Vec<_>>(),
                    "Subscription list"
                );
                subscriptions
                    .iter()
                    .any(|s| s.content_type == content_type.as_str())
            }
            Err(e) => {
                error!(
                    content_type = %content_type,
                    error = %e,
                    error_code = e.error_code(),
                    "Failed to list subscriptions"
                );
                false
            }
        }
    }

    /// Start the subscription; true iff the API answered with a success status
    pub async fn start(&self, content_type: ContentType) -> bool {
        self.change("start", content_type).await
    }

    /// Stop the subscription; true iff the API answered with a success status
    pub async fn stop(&self, content_type: ContentType) -> bool {
        self.change("stop", content_type).await
    }

    async fn change(&self, operation: &str, content_type: ContentType) -> bool {
        match self.send_change(operation, content_type).await {
            Ok(()) => {
                info!(content_type = %content_type, operation, "Subscription updated");
                true
            }
            Err(e @ Error::Api { .. }) => {
                warn!(
                    content_type = %content_type,
                    operation,
                    error = %e,
                    "Subscription request rejected"
                );
                false
            }
            Err(e) => {
                error!(
                    content_type = %content_type,
                    operation,
                    error = %e,
                    error_code = e.error_code(),
                    "Subscription request failed"
                );
                false
            }
        }
    }

    async fn send_change(&self, operation: &str, content_type: ContentType) -> Result<()> {
        let url = self.client.endpoint(operation);
        let response = self
            .client
            .authorized(Method::POST, &url)
            .await?
            .query(&[
                ("contentType", content_type.as_str()),
                (PUBLISHER_PARAM, self.client.publisher_id()),
            ])
            .header(CONTENT_LENGTH, "0")
            .send()
            .await?;
        ensure_success(response)?;
        Ok(())
    }
}
