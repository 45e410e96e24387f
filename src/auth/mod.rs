//! Bearer token lifecycle
//!
//! [`TokenManager`] caches one access token and refreshes it through a
//! [`TokenProvider`] once it is within the safety margin of expiry. A failed refresh is
//! logged and the previous token is handed out again: the next API call then most likely
//! fails authorization, and the following cycle retries the refresh. There is no retry
//! loop here.
//!
//! [`CertificateCredential`] is the provider used in production. It implements the
//! client-credentials grant with a certificate-signed client assertion.

mod certificate;

pub use certificate::{CLIENT_ASSERTION_TYPE, CertificateCredential, ClientCertificate};

use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Access token together with its absolute expiry
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    secret: String,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    /// Create a token that expires at `expires_at`
    pub fn new(secret: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            secret: secret.into(),
            expires_at,
        }
    }

    /// Raw bearer value
    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// Absolute expiry (UTC)
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Time left until expiry, negative once expired
    pub fn expires_in(&self, now: DateTime<Utc>) -> Duration {
        self.expires_at - now
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("secret", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Something that can mint a new access token
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Request a fresh token from the identity platform
    async fn acquire(&self) -> Result<AccessToken>;
}

/// Whether a token must be (re)acquired at `now`
///
/// A missing token always needs acquiring. A cached one is valid only while
/// `now < expires_at - safety_margin`.
pub fn needs_refresh(
    token: Option<&AccessToken>,
    now: DateTime<Utc>,
    safety_margin: Duration,
) -> bool {
    match token {
        None => true,
        Some(token) => token
            .expires_at
            .checked_sub_signed(safety_margin)
            .is_none_or(|refresh_at| now >= refresh_at),
    }
}

/// Shared token cache with proactive refresh
///
/// The lock is held across check, acquisition and store, so concurrent callers during a
/// refresh wait for it instead of acquiring their own token.
pub struct TokenManager {
    provider: Arc<dyn TokenProvider>,
    safety_margin: Duration,
    cached: Mutex<Option<AccessToken>>,
}

impl TokenManager {
    /// Create a manager with an empty cache
    pub fn new(provider: Arc<dyn TokenProvider>, safety_margin: std::time::Duration) -> Self {
        Self {
            provider,
            safety_margin: Duration::from_std(safety_margin).unwrap_or(Duration::MAX),
            cached: Mutex::new(None),
        }
    }

    /// Return a token valid for at least the safety margin, refreshing if needed
    ///
    /// # Errors
    /// Returns [`Error::Token`] only when acquisition fails and no token was ever cached.
    /// If a token was cached it is returned even when stale.
    pub async fn ensure_fresh(&self) -> Result<AccessToken> {
        self.ensure_fresh_at(Utc::now()).await
    }

    /// [`ensure_fresh`](Self::ensure_fresh) with an explicit clock
    pub async fn ensure_fresh_at(&self, now: DateTime<Utc>) -> Result<AccessToken> {
        let mut cached = self.cached.lock().await;

        if let Some(token) = cached.as_ref()
            && !needs_refresh(Some(token), now, self.safety_margin)
        {
            debug!(
                expires_in_secs = token.expires_in(now).num_seconds(),
                "Using cached access token"
            );
            return Ok(token.clone());
        }

        match cached.as_ref() {
            Some(token) if token.expires_at <= now => info!("Token expired, acquiring new token"),
            Some(_) => info!("Token will expire soon, refreshing it"),
            None => info!("Acquiring access token"),
        }

        match self.provider.acquire().await {
            Ok(token) => {
                info!(
                    expires_in_secs = token.expires_in(now).num_seconds(),
                    "Successfully acquired access token"
                );
                *cached = Some(token.clone());
                Ok(token)
            }
            Err(e) => {
                error!(error = %e, error_code = e.error_code(), "Failed to acquire access token");
                match cached.as_ref() {
                    Some(stale) => {
                        warn!(
                            expires_in_secs = stale.expires_in(now).num_seconds(),
                            "Keeping previous access token until the next refresh succeeds"
                        );
                        Ok(stale.clone())
                    }
                    None => Err(Error::Token(e.to_string())),
                }
            }
        }
    }

    /// Currently cached token, without refreshing
    pub async fn cached(&self) -> Option<AccessToken> {
        self.cached.lock().await.clone()
    }
}
