//! Management Activity API client
//!
//! The API is split by concern, mirroring how a poll uses it:
//! - [`subscription`] - check, start and stop the content subscription
//! - [`discovery`] - list content pointers for a window, page by page
//! - [`blobs`] - download content blobs and flatten them into records
//!
//! All three share one [`FeedClient`], which owns the HTTP client, the token cache and
//! the tenant-scoped endpoint layout. Every request gets a freshly checked bearer token.

pub mod blobs;
pub mod discovery;
pub mod subscription;

pub use blobs::BlobFetcher;
pub use discovery::{ContentDiscovery, ContentPages};
pub use subscription::SubscriptionManager;

use crate::auth::TokenManager;
use crate::config::Config;
use crate::error::{Error, Result};
use reqwest::{IntoUrl, Method, RequestBuilder, Response};
use std::sync::Arc;
use url::Url;

/// Query parameter carrying the publisher identifier
pub const PUBLISHER_PARAM: &str = "PublisherIdentifier";

/// Response header holding the continuation URI of a content listing
pub const NEXT_PAGE_HEADER: &str = "nextpageuri";

/// Shared, cheaply cloneable handle on the activity feed of one tenant
#[derive(Clone)]
pub struct FeedClient {
    http: reqwest::Client,
    tokens: Arc<TokenManager>,
    api_base_url: String,
    tenant_id: String,
    publisher_id: String,
}

impl FeedClient {
    /// Create a client for `tenant_id` on the API at `api_base_url`
    ///
    /// # Errors
    /// Returns [`Error::Url`] if `api_base_url` is not an absolute URL
    pub fn new(
        http: reqwest::Client,
        tokens: Arc<TokenManager>,
        api_base_url: &str,
        tenant_id: &str,
        publisher_id: impl Into<String>,
    ) -> Result<Self> {
        Url::parse(api_base_url)?;
        Ok(Self {
            http,
            tokens,
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            tenant_id: tenant_id.to_string(),
            publisher_id: publisher_id.into(),
        })
    }

    /// Build the HTTP client every request goes through
    ///
    /// The configured timeout applies to each request as a whole; a timeout surfaces as an
    /// ordinary network error.
    pub fn http_client(config: &Config) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(config.http.request_timeout)
            .user_agent(concat!("o365-audit-dl/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Config {
                message: format!("failed to create HTTP client: {e}"),
                key: None,
            })
    }

    /// Publisher identifier attached to content calls
    pub fn publisher_id(&self) -> &str {
        &self.publisher_id
    }

    /// Token cache shared by every request of this client
    pub fn tokens(&self) -> &Arc<TokenManager> {
        &self.tokens
    }

    /// `{api}/api/v1.0/{tenant}/activity/feed/subscriptions/{operation}`
    pub(crate) fn endpoint(&self, operation: &str) -> String {
        format!(
            "{}/api/v1.0/{}/activity/feed/subscriptions/{}",
            self.api_base_url, self.tenant_id, operation
        )
    }

    /// Parse `raw` and set its publisher parameter, replacing any existing value
    pub(crate) fn with_publisher(&self, raw: &str) -> Result<Url> {
        let mut url = Url::parse(raw)?;
        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(k, _)| k != PUBLISHER_PARAM)
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        url.query_pairs_mut()
            .clear()
            .extend_pairs(kept)
            .append_pair(PUBLISHER_PARAM, &self.publisher_id);
        Ok(url)
    }

    /// Start a request carrying a bearer token that passed the freshness check
    pub(crate) async fn authorized(&self, method: Method, url: impl IntoUrl) -> Result<RequestBuilder> {
        let token = self.tokens.ensure_fresh().await?;
        Ok(self.http.request(method, url).bearer_auth(token.secret()))
    }
}

/// Turn a non-success status into [`Error::Api`]
pub(crate) fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let mut url = response.url().clone();
    url.set_query(None);
    Err(Error::Api {
        status: status.as_u16(),
        url: url.to_string(),
    })
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
