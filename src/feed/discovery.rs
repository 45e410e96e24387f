//! Paginated content discovery.
//!
//! A listing answers with one page of pointers and, while more exist, a `NextPageUri`
//! header. [`ContentPages`] walks that chain one page at a time so the caller can
//! download a page before asking for the next one. Any failure ends the walk: what was
//! collected so far stands, and the next polling cycle covers the rest.

use super::{FeedClient, NEXT_PAGE_HEADER, PUBLISHER_PARAM, ensure_success};
use crate::error::Result;
use crate::types::{ContentPointer, ContentType, TimeWindow};
use reqwest::Method;
use tracing::{debug, error, warn};
use url::Url;

/// Lists available content for a time window
#[derive(Clone)]
pub struct ContentDiscovery {
    client: FeedClient,
}

impl ContentDiscovery {
    /// Create a discovery client on top of `client`
    pub fn new(client: FeedClient) -> Self {
        Self { client }
    }

    /// Page cursor over the listing of `content_type` in `window`
    pub fn pages(&self, window: TimeWindow, content_type: ContentType) -> ContentPages {
        let first = Url::parse_with_params(
            &self.client.endpoint("content"),
            &[
                ("contentType", content_type.as_str()),
                ("startTime", window.start_param().as_str()),
                ("endTime", window.end_param().as_str()),
                (PUBLISHER_PARAM, self.client.publisher_id()),
            ],
        );
        let next = match first {
            Ok(url) => Some(url),
            Err(e) => {
                error!(content_type = %content_type, error = %e, "Cannot build content listing URL");
                None
            }
        };

        ContentPages {
            client: self.client.clone(),
            content_type,
            window,
            next,
            pages_fetched: 0,
        }
    }

    /// Every pointer of every page, in page order
    ///
    /// Never fails: an error on any page is logged and the pointers collected up to that
    /// point are returned.
    pub async fn list_content(
        &self,
        window: TimeWindow,
        content_type: ContentType,
    ) -> Vec<ContentPointer> {
        let mut pages = self.pages(window, content_type);
        let mut pointers = Vec::new();
        while let Some(page) = pages.next_page().await {
            pointers.extend(page);
        }
        pointers
    }
}

/// Cursor over the pages of one content listing
pub struct ContentPages {
    client: FeedClient,
    content_type: ContentType,
    window: TimeWindow,
    next: Option<Url>,
    pages_fetched: usize,
}

impl ContentPages {
    /// Fetch the next page, or `None` once the chain ended or a request failed
    pub async fn next_page(&mut self) -> Option<Vec<ContentPointer>> {
        let url = self.next.take()?;
        match self.fetch(&url).await {
            Ok(pointers) => {
                self.pages_fetched += 1;
                debug!(
                    content_type = %self.content_type,
                    window = %self.window,
                    page = self.pages_fetched,
                    pointers = pointers.len(),
                    more = self.next.is_some(),
                    "Fetched content page"
                );
                Some(pointers)
            }
            Err(e) => {
                let mut shown = url;
                shown.set_query(None);
                error!(
                    content_type = %self.content_type,
                    window = %self.window,
                    page = self.pages_fetched + 1,
                    url = %shown,
                    error = %e,
                    error_code = e.error_code(),
                    auth_failure = e.is_auth_failure(),
                    "Error getting content page"
                );
                None
            }
        }
    }

    /// Pages successfully fetched so far
    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    async fn fetch(&mut self, url: &Url) -> Result<Vec<ContentPointer>> {
        let response = self
            .client
            .authorized(Method::GET, url.clone())
            .await?
            .send()
            .await?;
        let response = ensure_success(response)?;

        let continuation = response
            .headers()
            .get(NEXT_PAGE_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_owned);

        let pointers: Vec<ContentPointer> = response.json().await?;

        self.next = match continuation {
            Some(raw) => match self.client.with_publisher(&raw) {
                Ok(next) => Some(next),
                Err(e) => {
                    warn!(next_page = %raw, error = %e, "Ignoring malformed next page reference");
                    None
                }
            },
            None => None,
        };
        Ok(pointers)
    }
}
