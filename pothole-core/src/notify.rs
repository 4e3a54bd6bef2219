//! Alerts for newly recorded detections.
//!
//! Notification is fire-and-forget: [`spawn_notification`] runs the notifier
//! on a background task and only logs failures, so a broken alert channel
//! never fails the request that created the record.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::DateTime;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::record::PotholeRecord;

/// A formatted alert for one record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    pub subject: String,
    pub body: String,
    pub maps_link: String,
    pub record: PotholeRecord,
}

/// Google Maps link for a coordinate pair.
pub fn maps_link(latitude: f64, longitude: f64) -> String {
    format!("https://www.google.com/maps?q={latitude},{longitude}")
}

/// RFC 3339 timestamps are shown as `YYYY-MM-DD HH:MM:SS`; anything else is
/// shown verbatim.
fn display_time(timestamp: &str) -> String {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|_| timestamp.to_string())
}

/// Build the alert text for a record.
pub fn format_alert(record: &PotholeRecord) -> Alert {
    let confidence_pct = record.confidence.unwrap_or(0.0) * 100.0;
    let link = maps_link(record.latitude, record.longitude);

    let mut body = format!(
        "Pothole #{id} detected\n\
         Time: {time}\n\
         Confidence: {confidence_pct:.1}%\n\
         Location: {lat}, {lon}\n\
         Map: {link}\n",
        id = record.id,
        time = display_time(&record.timestamp),
        lat = record.latitude,
        lon = record.longitude,
    );
    if let Some(image) = &record.image_path {
        body.push_str(&format!("Image: {image}\n"));
    }

    Alert {
        subject: format!("POTHOLE ALERT: Detected with {confidence_pct:.1}% Confidence"),
        body,
        maps_link: link,
        record: record.clone(),
    }
}

/// Alert delivery channel.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, alert: &Alert) -> Result<()>;

    /// Short name for logs
    fn name(&self) -> &'static str;
}

/// Writes alerts to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, alert: &Alert) -> Result<()> {
        info!(
            pothole_id = alert.record.id,
            maps_link = %alert.maps_link,
            "{}",
            alert.subject
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

/// Send an alert for `record` in the background.
///
/// Returns `None` when the record carries no detection confidence, since
/// manually reported potholes are not alerted.
pub fn spawn_notification(
    notifier: Arc<dyn Notifier>,
    record: &PotholeRecord,
) -> Option<JoinHandle<()>> {
    if record.confidence.is_none() {
        return None;
    }
    let alert = format_alert(record);

    Some(tokio::spawn(async move {
        match notifier.notify(&alert).await {
            Ok(()) => debug!(
                pothole_id = alert.record.id,
                notifier = notifier.name(),
                "Alert sent"
            ),
            Err(e) => warn!(
                pothole_id = alert.record.id,
                notifier = notifier.name(),
                error = %e,
                "Failed to send alert"
            ),
        }
    }))
}

#[cfg(feature = "remote")]
pub use webhook::{WebhookConfig, WebhookNotifier};

#[cfg(feature = "remote")]
mod webhook {
    use std::time::{Duration, Instant};

    use async_trait::async_trait;
    use backoff::{future::retry_notify, ExponentialBackoff};
    use reqwest::{Client, StatusCode};
    use tracing::{debug, warn};

    use super::{Alert, Notifier};
    use crate::error::{PotholeError, Result};

    /// Configuration for [`WebhookNotifier`].
    #[derive(Debug, Clone)]
    pub struct WebhookConfig {
        pub url: String,
        /// Per-request timeout
        pub timeout: Duration,
        /// Total time allowed across retries
        pub max_elapsed: Duration,
    }

    impl WebhookConfig {
        pub fn new(url: impl Into<String>) -> Self {
            Self {
                url: url.into(),
                timeout: Duration::from_secs(10),
                max_elapsed: Duration::from_secs(60),
            }
        }
    }

    /// Posts alerts as JSON to a webhook, retrying transient failures.
    pub struct WebhookNotifier {
        client: Client,
        config: WebhookConfig,
    }

    impl WebhookNotifier {
        pub fn new(config: WebhookConfig) -> Result<Self> {
            let client = Client::builder()
                .timeout(config.timeout)
                .build()
                .map_err(|e| {
                    PotholeError::NotificationFailure(format!("Failed to create HTTP client: {e}"))
                })?;
            Ok(Self { client, config })
        }

        async fn post_once(
            &self,
            alert: &Alert,
        ) -> std::result::Result<(), backoff::Error<PotholeError>> {
            let start = Instant::now();

            let response = self
                .client
                .post(&self.config.url)
                .json(alert)
                .send()
                .await
                .map_err(|e| {
                    let err = PotholeError::NotificationFailure(format!("webhook request failed: {e}"));
                    if e.is_timeout() || e.is_connect() || e.is_request() {
                        backoff::Error::transient(err)
                    } else {
                        backoff::Error::permanent(err)
                    }
                })?;

            let status = response.status();
            if !status.is_success() {
                let err = PotholeError::NotificationFailure(format!(
                    "webhook returned status: {status}"
                ));
                return if is_transient_status(status) {
                    Err(backoff::Error::transient(err))
                } else {
                    Err(backoff::Error::permanent(err))
                };
            }

            debug!(
                latency_ms = start.elapsed().as_millis() as u64,
                "Webhook delivered"
            );
            Ok(())
        }
    }

    #[async_trait]
    impl Notifier for WebhookNotifier {
        async fn notify(&self, alert: &Alert) -> Result<()> {
            let backoff = ExponentialBackoff {
                initial_interval: Duration::from_millis(500),
                max_interval: Duration::from_secs(10),
                max_elapsed_time: Some(self.config.max_elapsed),
                ..Default::default()
            };

            retry_notify(
                backoff,
                || self.post_once(alert),
                |err: PotholeError, duration: Duration| {
                    warn!(
                        error = %err,
                        retry_after_ms = duration.as_millis() as u64,
                        "Webhook retry scheduled"
                    );
                },
            )
            .await
        }

        fn name(&self) -> &'static str {
            "webhook"
        }
    }

    pub(super) fn is_transient_status(status: StatusCode) -> bool {
        status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
    }
}
