//! Core types for o365-audit-dl

use chrono::{DateTime, Duration, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Wire format for `startTime`/`endTime` query parameters (minute granularity, UTC)
pub const WINDOW_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// Activity feed content type
///
/// The Management Activity API only accepts this fixed set of values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContentType {
    /// Azure Active Directory audit events
    #[serde(rename = "Audit.AzureActiveDirectory")]
    AzureActiveDirectory,
    /// Exchange audit events
    #[serde(rename = "Audit.Exchange")]
    Exchange,
    /// SharePoint and OneDrive audit events
    #[serde(rename = "Audit.SharePoint")]
    SharePoint,
    /// Events from all other workloads
    #[serde(rename = "Audit.General")]
    General,
    /// Data loss prevention events
    #[serde(rename = "DLP.All")]
    DlpAll,
}

impl ContentType {
    /// Every supported content type
    pub const ALL: [ContentType; 5] = [
        ContentType::AzureActiveDirectory,
        ContentType::Exchange,
        ContentType::SharePoint,
        ContentType::General,
        ContentType::DlpAll,
    ];

    /// The value the API expects in `contentType`
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::AzureActiveDirectory => "Audit.AzureActiveDirectory",
            ContentType::Exchange => "Audit.Exchange",
            ContentType::SharePoint => "Audit.SharePoint",
            ContentType::General => "Audit.General",
            ContentType::DlpAll => "DLP.All",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ContentType::ALL
            .into_iter()
            .find(|ct| ct.as_str() == s)
            .ok_or_else(|| format!("unknown content type: {s}"))
    }
}

/// Half-open polling window `[start, end)`, truncated to the minute
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeWindow {
    /// Inclusive start
    pub start: DateTime<Utc>,
    /// Exclusive end
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Create a window from two instants, truncating both to the minute
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start: truncate_to_minute(start),
            end: truncate_to_minute(end),
        }
    }

    /// The last `minutes` minutes ending at `now`
    ///
    /// ```
    /// use chrono::{TimeZone, Utc};
    /// use o365_audit_dl::TimeWindow;
    ///
    /// let now = Utc.with_ymd_and_hms(2023, 1, 1, 10, 0, 0).unwrap();
    /// let window = TimeWindow::recurring(now, 12);
    /// assert_eq!(window.start_param(), "2023-01-01T09:48");
    /// assert_eq!(window.end_param(), "2023-01-01T10:00");
    /// ```
    pub fn recurring(now: DateTime<Utc>, minutes: u32) -> Self {
        let end = truncate_to_minute(now);
        Self {
            start: end - Duration::minutes(i64::from(minutes)),
            end,
        }
    }

    /// Day windows for a one-time historical import, oldest first
    ///
    /// For `i` from `days - 1` down to `0` the window ends at `date 23:59 - i days` and
    /// spans the 24 hours before it. Windows are contiguous and never overlap. Days that
    /// would start before the earliest representable time are dropped.
    pub fn backfill(date: NaiveDate, days: u32) -> Vec<Self> {
        let Some(day_end) = date.and_hms_opt(23, 59, 0) else {
            return Vec::new();
        };
        let day_end = day_end.and_utc();

        let mut windows: Vec<Self> = (0..days)
            .map_while(|i| {
                let end = day_end.checked_sub_signed(Duration::days(i64::from(i)))?;
                let start = end.checked_sub_signed(Duration::days(1))?;
                Some(Self { start, end })
            })
            .collect();
        windows.reverse();
        windows
    }

    /// `startTime` query value
    pub fn start_param(&self) -> String {
        self.start.format(WINDOW_TIME_FORMAT).to_string()
    }

    /// `endTime` query value
    pub fn end_param(&self) -> String {
        self.end.format(WINDOW_TIME_FORMAT).to_string()
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start_param(), self.end_param())
    }
}

fn truncate_to_minute(t: DateTime<Utc>) -> DateTime<Utc> {
    t.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(t)
}

/// Reference to one downloadable content blob
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentPointer {
    /// Content type the blob belongs to
    pub content_type: String,

    /// Opaque content identifier
    #[serde(default)]
    pub content_id: Option<String>,

    /// URI to GET the blob from
    pub content_uri: String,

    /// When the blob became available
    pub content_created: DateTime<Utc>,

    /// When the blob stops being retrievable
    #[serde(default)]
    pub content_expiration: Option<DateTime<Utc>>,
}

/// One audit event, passed through untouched
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogRecord(pub serde_json::Value);

impl LogRecord {
    /// Provider-assigned unique identifier, the consumer's deduplication key
    pub fn id(&self) -> Option<&str> {
        self.0.get("Id").and_then(|v| v.as_str())
    }

    /// Borrow the raw JSON value
    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }

    /// Unwrap into the raw JSON value
    pub fn into_value(self) -> serde_json::Value {
        self.0
    }
}

impl From<serde_json::Value> for LogRecord {
    fn from(value: serde_json::Value) -> Self {
        Self(value)
    }
}

/// One entry of the subscriptions listing
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    /// Subscribed content type
    pub content_type: String,

    /// "enabled" or "disabled"
    #[serde(default)]
    pub status: Option<String>,

    /// Webhook registration, when one exists
    #[serde(default)]
    pub webhook: Option<serde_json::Value>,
}
