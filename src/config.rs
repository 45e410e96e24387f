//! Configuration types for o365-audit-dl

use crate::error::{Error, Result};
use crate::types::ContentType;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Longest backfill accepted, in days
pub const MAX_DAYS_TO_IMPORT: u32 = 3650;

/// Client certificate used for the client-assertion grant
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CertificateConfig {
    /// Path to the PKCS#12 (.pfx) file holding the private key and certificate
    pub pfx_path: PathBuf,

    /// Passphrase protecting the PKCS#12 file
    pub pfx_password: String,
}

/// HTTP endpoints and transport limits
///
/// The defaults target the worldwide commercial cloud. Sovereign clouds and tests
/// override the base URLs.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Management API base URL (default: "https://manage.office.com")
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Identity platform base URL (default: "https://login.microsoftonline.com")
    #[serde(default = "default_login_base_url")]
    pub login_base_url: String,

    /// Resource the token is requested for (default: "https://manage.office.com")
    #[serde(default = "default_resource")]
    pub resource: String,

    /// Per-request timeout, applied to every HTTP call (default: 30 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,

    /// Maximum blob downloads in flight for one page (default: 10)
    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            login_base_url: default_login_base_url(),
            resource: default_resource(),
            request_timeout: default_request_timeout(),
            max_concurrent_fetches: default_max_concurrent_fetches(),
        }
    }
}

/// Main configuration for the audit log poller
///
/// Exactly one run mode applies, see [`Config::run_mode`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Azure application (client) id
    pub client_id: String,

    /// Azure tenant id
    pub tenant_id: String,

    /// Tenant used as token authority, e.g. "contoso.onmicrosoft.com" (default: tenant_id)
    #[serde(default)]
    pub tenant: Option<String>,

    /// Publisher identifier sent on content calls (default: tenant_id)
    #[serde(default)]
    pub publisher_id: Option<String>,

    /// Client certificate
    pub certificate: CertificateConfig,

    /// Content type to subscribe to and download
    pub content_type: ContentType,

    /// Length of the recurring polling window in minutes (default: 10)
    ///
    /// Should exceed the schedule interval so consecutive windows overlap.
    #[serde(default = "default_timerange_minutes")]
    pub timerange_minutes: u32,

    /// Cron expression driving recurring polls (none = run once)
    #[serde(default)]
    pub schedule: Option<String>,

    /// Last day of a one-time historical import (ignored when a schedule is set)
    #[serde(default)]
    pub import_date: Option<NaiveDate>,

    /// Number of days to import, ending at `import_date` (default: 1)
    #[serde(default = "default_days_to_import")]
    pub days_to_import: u32,

    /// Refresh the token this long before it expires (default: 600 seconds)
    #[serde(default = "default_token_safety_margin", with = "duration_serde")]
    pub token_safety_margin: Duration,

    /// HTTP endpoints and limits
    #[serde(default)]
    pub http: HttpConfig,
}

/// How a run proceeds once the subscription is active
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunMode {
    /// Poll the last `timerange_minutes` on every cron tick
    Recurring {
        /// Cron expression
        schedule: String,
    },
    /// Import whole days ending at `import_date`, oldest first, then stop
    Backfill {
        /// Last imported day
        import_date: NaiveDate,
        /// Number of days
        days: u32,
    },
    /// Poll the last `timerange_minutes` once, then stop
    SingleShot,
}

impl Config {
    /// Load a JSON configuration file and validate it
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, does not parse, or fails validation
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: Config = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Check invariants serde cannot express
    pub fn validate(&self) -> Result<()> {
        if self.client_id.trim().is_empty() {
            return Err(Error::config("client_id must not be empty", "client_id"));
        }
        if self.tenant_id.trim().is_empty() {
            return Err(Error::config("tenant_id must not be empty", "tenant_id"));
        }
        if self.timerange_minutes == 0 {
            return Err(Error::config(
                "timerange_minutes must be greater than zero",
                "timerange_minutes",
            ));
        }
        if !(1..=MAX_DAYS_TO_IMPORT).contains(&self.days_to_import) {
            return Err(Error::config(
                format!("days_to_import must be between 1 and {MAX_DAYS_TO_IMPORT}"),
                "days_to_import",
            ));
        }
        if self.http.max_concurrent_fetches == 0 {
            return Err(Error::config(
                "max_concurrent_fetches must be at least 1",
                "http.max_concurrent_fetches",
            ));
        }
        if self.http.request_timeout.is_zero() {
            return Err(Error::config(
                "request_timeout must be greater than zero",
                "http.request_timeout",
            ));
        }
        for (key, value) in [
            ("http.api_base_url", &self.http.api_base_url),
            ("http.login_base_url", &self.http.login_base_url),
        ] {
            url::Url::parse(value)
                .map_err(|e| Error::config(format!("{key} is not a valid URL: {e}"), key))?;
        }
        if let Some(schedule) = &self.schedule {
            crate::trigger::parse_schedule(schedule)
                .map_err(|e| Error::config(e.to_string(), "schedule"))?;
        }
        Ok(())
    }

    /// Publisher identifier, falling back to the tenant id
    pub fn publisher_id(&self) -> &str {
        self.publisher_id.as_deref().unwrap_or(&self.tenant_id)
    }

    /// Token authority tenant, falling back to the tenant id
    pub fn authority_tenant(&self) -> &str {
        self.tenant.as_deref().unwrap_or(&self.tenant_id)
    }

    /// Resolve the run mode: a schedule wins over backfill parameters
    pub fn run_mode(&self) -> RunMode {
        match (&self.schedule, self.import_date) {
            (Some(schedule), _) => RunMode::Recurring {
                schedule: schedule.clone(),
            },
            (None, Some(import_date)) => RunMode::Backfill {
                import_date,
                days: self.days_to_import,
            },
            (None, None) => RunMode::SingleShot,
        }
    }
}

fn default_api_base_url() -> String {
    "https://manage.office.com".to_string()
}

fn default_login_base_url() -> String {
    "https://login.microsoftonline.com".to_string()
}

fn default_resource() -> String {
    "https://manage.office.com".to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_max_concurrent_fetches() -> usize {
    10
}

fn default_timerange_minutes() -> u32 {
    10
}

fn default_days_to_import() -> u32 {
    1
}

fn default_token_safety_margin() -> Duration {
    Duration::from_secs(600)
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
