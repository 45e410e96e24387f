//! Shared test helpers: throwaway certificates, scripted token providers, and feed
//! clients pointed at a mock server.

use crate::auth::{AccessToken, TokenManager, TokenProvider};
use crate::error::{Error, Result};
use crate::feed::FeedClient;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use openssl::asn1::Asn1Time;
use openssl::hash::MessageDigest;
use openssl::pkcs12::Pkcs12;
use openssl::pkey::PKey;
use openssl::rsa::Rsa;
use openssl::x509::{X509, X509NameBuilder};
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration as StdDuration;

pub(crate) const TEST_TENANT: &str = "tenant-guid";
pub(crate) const TEST_PUBLISHER: &str = "publisher-guid";
pub(crate) const TEST_TOKEN: &str = "test-access-token";

/// Self-signed RSA certificate bundled as PKCS#12 DER, plus the certificate itself
pub(crate) fn test_pfx(passphrase: &str) -> (Vec<u8>, X509) {
    let key = PKey::from_rsa(Rsa::generate(2048).unwrap()).unwrap();

    let mut name = X509NameBuilder::new().unwrap();
    name.append_entry_by_text("CN", "o365-audit-dl test").unwrap();
    let name = name.build();

    let mut builder = X509::builder().unwrap();
    builder.set_version(2).unwrap();
    builder.set_subject_name(&name).unwrap();
    builder.set_issuer_name(&name).unwrap();
    builder.set_pubkey(&key).unwrap();
    builder
        .set_not_before(&Asn1Time::days_from_now(0).unwrap())
        .unwrap();
    builder
        .set_not_after(&Asn1Time::days_from_now(1).unwrap())
        .unwrap();
    builder.sign(&key, MessageDigest::sha256()).unwrap();
    let cert = builder.build();

    let mut pkcs12 = Pkcs12::builder();
    pkcs12.name("o365-audit-dl").pkey(&key).cert(&cert);
    let der = pkcs12.build2(passphrase).unwrap().to_der().unwrap();
    (der, cert)
}

/// Provider that replays scripted results and counts acquisitions
pub(crate) struct ScriptedProvider {
    responses: std::sync::Mutex<VecDeque<Result<AccessToken>>>,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    pub(crate) fn new(responses: Vec<Result<AccessToken>>) -> Self {
        Self {
            responses: std::sync::Mutex::new(responses.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenProvider for ScriptedProvider {
    async fn acquire(&self) -> Result<AccessToken> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Error::Token("no scripted response left".into())))
    }
}

/// Provider that always hands out the same long-lived token
pub(crate) struct StaticProvider;

#[async_trait]
impl TokenProvider for StaticProvider {
    async fn acquire(&self) -> Result<AccessToken> {
        Ok(AccessToken::new(TEST_TOKEN, Utc::now() + Duration::hours(1)))
    }
}

/// Token manager backed by [`StaticProvider`]
pub(crate) fn static_tokens() -> Arc<TokenManager> {
    Arc::new(TokenManager::new(
        Arc::new(StaticProvider),
        StdDuration::from_secs(600),
    ))
}

/// Feed client for [`TEST_TENANT`] against `base_url`
pub(crate) fn test_feed_client(base_url: &str) -> FeedClient {
    test_feed_client_with_timeout(base_url, StdDuration::from_secs(5))
}

/// Feed client whose requests give up after `timeout`
pub(crate) fn test_feed_client_with_timeout(base_url: &str, timeout: StdDuration) -> FeedClient {
    let http = reqwest::Client::builder().timeout(timeout).build().unwrap();
    FeedClient::new(http, static_tokens(), base_url, TEST_TENANT, TEST_PUBLISHER).unwrap()
}

/// Base path of the activity feed for [`TEST_TENANT`]
pub(crate) fn feed_path(operation: &str) -> String {
    format!("/api/v1.0/{TEST_TENANT}/activity/feed/subscriptions/{operation}")
}
