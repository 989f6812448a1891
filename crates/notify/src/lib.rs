//! # transcripts-notify
//!
//! Client for the key-value store that holds alert thresholds and receives
//! low-average alerts.
//!
//! The store speaks a plain REST dialect: every path maps to a JSON value at
//! `<base>/<path>.json`, read with GET and replaced with PUT.

use reqwest::Client;
use serde_json::{Map, Value as JsonValue};
use std::time::Duration;
use thiserror::Error;
use transcripts_core::{Alert, Thresholds};

/// Collection alerts are written under by default.
pub const DEFAULT_COLLECTION: &str = "alerts";

/// Result type for notifier operations.
pub type NotifyResult<T> = Result<T, NotifyError>;

#[derive(Debug, Error)]
pub enum NotifyError {
    /// Transport failure or client construction error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The store answered with a non-success status.
    #[error("HTTP {status} from {url}: {body}")]
    Status {
        status: u16,
        url: String,
        body: String,
    },

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Turn a file name into a store key: `.` and spaces become `_`.
pub fn sanitize_key(name: &str) -> String {
    name.replace(['.', ' '], "_")
}

/// Request body for a batch of alerts: `{"alert_1": {...}, "alert_2": {...}}`.
pub fn alerts_body(alerts: &[Alert]) -> NotifyResult<JsonValue> {
    let mut body = Map::with_capacity(alerts.len());
    for (i, alert) in alerts.iter().enumerate() {
        body.insert(format!("alert_{}", i + 1), serde_json::to_value(alert)?);
    }
    Ok(JsonValue::Object(body))
}

/// Read thresholds from a settings document, defaulting each missing key.
fn thresholds_from(settings: &JsonValue, defaults: Thresholds) -> Thresholds {
    let read = |key: &str, default: f64| settings.get(key).and_then(JsonValue::as_f64).unwrap_or(default);
    Thresholds {
        min_grade: read("min_grade", defaults.min_grade),
        min_attendance: read("min_attendance", defaults.min_attendance),
    }
}

/// HTTP client for thresholds and alerts.
pub struct AlertNotifier {
    client: Client,
    base_url: String,
    collection: String,
    fallback: Thresholds,
}

impl AlertNotifier {
    /// Creates a notifier for the store at `base_url` with a 30-second timeout.
    ///
    /// # Errors
    ///
    /// Returns `NotifyError::Http` if building the underlying HTTP client fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use transcripts_notify::AlertNotifier;
    /// let notifier = AlertNotifier::new("https://example.invalid").unwrap();
    /// assert_eq!(notifier.base_url(), "https://example.invalid");
    /// ```
    pub fn new(base_url: &str) -> NotifyResult<Self> {
        Self::with_timeout(base_url, 30)
    }

    /// Creates a notifier with a custom per-request timeout in seconds.
    ///
    /// # Errors
    ///
    /// Returns `NotifyError::Http` if building the underlying HTTP client fails.
    pub fn with_timeout(base_url: &str, timeout_secs: u64) -> NotifyResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            // Disable system proxy lookup to avoid macOS system-configuration issues
            .no_proxy()
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            collection: DEFAULT_COLLECTION.to_string(),
            fallback: Thresholds::default(),
        })
    }

    /// Write alerts under another collection.
    #[must_use]
    pub fn with_collection(mut self, collection: &str) -> Self {
        self.collection = collection.trim_matches('/').to_string();
        self
    }

    /// Thresholds used when the store has none, per key or entirely.
    #[must_use]
    pub fn with_fallback(mut self, fallback: Thresholds) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Fetch thresholds, failing on transport errors, non-success status
    /// or a malformed body. Missing keys take the fallback values.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the body is not JSON.
    pub async fn try_fetch_thresholds(&self) -> NotifyResult<Thresholds> {
        let url = format!("{}/settings.json", self.base_url);
        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Status {
                status: status.as_u16(),
                url,
                body,
            });
        }

        let text = response.text().await?;
        let settings: JsonValue = serde_json::from_str(&text)?;
        Ok(thresholds_from(&settings, self.fallback))
    }

    /// Fetch thresholds, using the fallback (grade 40, attendance 60 unless
    /// set with [`with_fallback`](Self::with_fallback)) on any failure.
    pub async fn fetch_thresholds(&self) -> Thresholds {
        match self.try_fetch_thresholds().await {
            Ok(thresholds) => {
                tracing::info!(
                    min_grade = thresholds.min_grade,
                    min_attendance = thresholds.min_attendance,
                    "fetched thresholds"
                );
                thresholds
            }
            Err(e) => {
                tracing::warn!("failed to fetch thresholds, using fallback: {e}");
                self.fallback
            }
        }
    }

    /// Replace the alerts stored for `file_name` with `alerts`.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the store rejects it.
    pub async fn push_alerts(&self, file_name: &str, alerts: &[Alert]) -> NotifyResult<()> {
        let url = format!(
            "{}/{}/{}.json",
            self.base_url,
            self.collection,
            sanitize_key(file_name)
        );
        let body = alerts_body(alerts)?;

        let response = self.client.put(&url).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Status {
                status: status.as_u16(),
                url,
                body,
            });
        }

        tracing::info!(count = alerts.len(), url = %url, "pushed alerts");
        Ok(())
    }
}
