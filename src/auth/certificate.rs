//! Client-credentials grant with a certificate-signed client assertion.

use super::{AccessToken, TokenProvider};
use crate::config::Config;
use crate::error::{Error, Result};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{Duration, Utc};
use openssl::hash::MessageDigest;
use openssl::pkcs12::Pkcs12;
use openssl::pkey::{Id, PKey, Private};
use openssl::sign::Signer;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;
use tracing::debug;

/// `client_assertion_type` for a JWT bearer assertion (RFC 7523)
pub const CLIENT_ASSERTION_TYPE: &str = "urn:ietf:params:oauth:client-assertion-type:jwt-bearer";

/// Lifetime of the signed assertion itself, not of the token it buys
const ASSERTION_LIFETIME_MINUTES: i64 = 10;

/// RSA private key and certificate thumbprint loaded from a PKCS#12 bundle
pub struct ClientCertificate {
    key: PKey<Private>,
    thumbprint: String,
}

impl ClientCertificate {
    /// Decode a DER-encoded PKCS#12 bundle
    ///
    /// # Errors
    /// Returns [`Error::Credential`] if the bundle is malformed, the passphrase is wrong,
    /// or it lacks an RSA key or a certificate
    pub fn from_pkcs12(der: &[u8], passphrase: &str) -> Result<Self> {
        let parsed = Pkcs12::from_der(der)
            .and_then(|pkcs12| pkcs12.parse2(passphrase))
            .map_err(|e| Error::Credential(format!("cannot decrypt PKCS#12 bundle: {e}")))?;

        let key = parsed
            .pkey
            .ok_or_else(|| Error::Credential("PKCS#12 bundle has no private key".into()))?;
        if key.id() != Id::RSA {
            return Err(Error::Credential(
                "client assertion requires an RSA private key".into(),
            ));
        }
        let cert = parsed
            .cert
            .ok_or_else(|| Error::Credential("PKCS#12 bundle has no certificate".into()))?;
        let digest = cert
            .digest(MessageDigest::sha1())
            .map_err(|e| Error::Credential(format!("cannot hash certificate: {e}")))?;

        Ok(Self {
            key,
            thumbprint: URL_SAFE_NO_PAD.encode(&*digest),
        })
    }

    /// Read and decode a .pfx file
    pub fn from_file(path: &Path, passphrase: &str) -> Result<Self> {
        let der = std::fs::read(path).map_err(|e| {
            Error::Credential(format!("cannot read certificate {}: {e}", path.display()))
        })?;
        Self::from_pkcs12(&der, passphrase)
    }

    /// Base64url SHA-1 thumbprint, sent as the `x5t` header
    pub fn thumbprint(&self) -> &str {
        &self.thumbprint
    }

    /// Sign `claims` as a compact RS256 JWT
    fn sign<T: Serialize>(&self, claims: &T) -> Result<String> {
        let header = AssertionHeader {
            alg: "RS256",
            typ: "JWT",
            x5t: &self.thumbprint,
        };
        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header)?),
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims)?)
        );

        let signature = Signer::new(MessageDigest::sha256(), &self.key)
            .and_then(|mut signer| {
                signer.update(signing_input.as_bytes())?;
                signer.sign_to_vec()
            })
            .map_err(|e| Error::Credential(format!("cannot sign client assertion: {e}")))?;

        Ok(format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(signature)))
    }
}

#[derive(Serialize)]
struct AssertionHeader<'a> {
    alg: &'static str,
    typ: &'static str,
    x5t: &'a str,
}

#[derive(Serialize)]
struct AssertionClaims<'a> {
    aud: &'a str,
    iss: &'a str,
    sub: &'a str,
    jti: String,
    nbf: i64,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(deserialize_with = "seconds_from_number_or_string")]
    expires_in: i64,
}

#[derive(Deserialize, Default)]
struct TokenErrorResponse {
    #[serde(default)]
    error: String,
    #[serde(default)]
    error_description: String,
}

// The v1 endpoint sends expires_in as a string, v2 as a number.
fn seconds_from_number_or_string<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Seconds {
        Number(i64),
        Text(String),
    }

    match Seconds::deserialize(deserializer)? {
        Seconds::Number(n) => Ok(n),
        Seconds::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// Token provider for the certificate client-assertion grant
pub struct CertificateCredential {
    http: reqwest::Client,
    token_url: String,
    client_id: String,
    scope: String,
    certificate: ClientCertificate,
}

impl CertificateCredential {
    /// Create a provider for `client_id` in `tenant`
    ///
    /// `tenant` may be a tenant id or a verified domain. `resource` is the API the token
    /// is for; the `.default` scope of it is requested.
    pub fn new(
        http: reqwest::Client,
        login_base_url: &str,
        tenant: &str,
        client_id: impl Into<String>,
        resource: &str,
        certificate: ClientCertificate,
    ) -> Self {
        Self {
            http,
            token_url: format!(
                "{}/{}/oauth2/v2.0/token",
                login_base_url.trim_end_matches('/'),
                tenant
            ),
            client_id: client_id.into(),
            scope: format!("{}/.default", resource.trim_end_matches('/')),
            certificate,
        }
    }

    /// Load the configured certificate and build the provider
    ///
    /// # Errors
    /// Returns [`Error::Credential`] if the certificate cannot be loaded
    pub fn from_config(config: &Config, http: reqwest::Client) -> Result<Self> {
        let certificate = ClientCertificate::from_file(
            &config.certificate.pfx_path,
            &config.certificate.pfx_password,
        )?;
        Ok(Self::new(
            http,
            &config.http.login_base_url,
            config.authority_tenant(),
            config.client_id.clone(),
            &config.http.resource,
            certificate,
        ))
    }

    /// Token endpoint this provider posts to
    pub fn token_url(&self) -> &str {
        &self.token_url
    }

    fn client_assertion(&self) -> Result<String> {
        let now = Utc::now();
        self.certificate.sign(&AssertionClaims {
            aud: &self.token_url,
            iss: &self.client_id,
            sub: &self.client_id,
            jti: uuid::Uuid::new_v4().to_string(),
            nbf: now.timestamp(),
            iat: now.timestamp(),
            exp: (now + Duration::minutes(ASSERTION_LIFETIME_MINUTES)).timestamp(),
        })
    }
}

#[async_trait]
impl TokenProvider for CertificateCredential {
    async fn acquire(&self) -> Result<AccessToken> {
        let requested_at = Utc::now();
        let assertion = self.client_assertion()?;
        let form = [
            ("client_id", self.client_id.as_str()),
            ("scope", self.scope.as_str()),
            ("grant_type", "client_credentials"),
            ("client_assertion_type", CLIENT_ASSERTION_TYPE),
            ("client_assertion", assertion.as_str()),
        ];

        debug!(url = %self.token_url, client_id = %self.client_id, "Requesting access token");
        let response = self.http.post(&self.token_url).form(&form).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body: TokenErrorResponse = response.json().await.unwrap_or_default();
            return Err(Error::Token(format!(
                "token endpoint returned HTTP {}: {} {}",
                status.as_u16(),
                body.error,
                body.error_description
            )));
        }

        let token: TokenResponse = response.json().await?;
        let expires_at = Duration::try_seconds(token.expires_in)
            .and_then(|lifetime| requested_at.checked_add_signed(lifetime))
            .ok_or_else(|| {
                Error::Token(format!("expires_in out of range: {}", token.expires_in))
            })?;
        Ok(AccessToken::new(token.access_token, expires_at))
    }
}
