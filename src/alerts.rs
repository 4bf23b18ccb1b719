use std::time::Duration;

use chrono::Utc;
use reqwest::Client;
use serde_json::json;
use tracing::{error, info, instrument, warn};

use crate::MetricsSnapshot;
use crate::config::{AlertThresholds, Webhook};
use crate::error::{MonitorError, MonitorResult};

/// Raises the operator-visible alert notice
///
/// The notice always goes to the log. If a webhook is configured the same
/// message is posted there from a background task, so a slow webhook never
/// holds up the sampling loop.
#[derive(Debug, Clone)]
pub struct AlertManager {
    webhook: Option<WebhookClient>,
    host: String,
}

#[derive(Debug, Clone)]
struct WebhookClient {
    client: Client,
    url: String,
}

impl AlertManager {
    /// Alerts that only go to the log
    pub fn log_only() -> Self {
        Self {
            webhook: None,
            host: sysinfo::System::host_name().unwrap_or_else(|| String::from("unknown")),
        }
    }

    /// Every webhook request is bounded by `timeout`.
    pub fn new(webhook: Option<Webhook>, timeout: Duration) -> MonitorResult<Self> {
        let webhook = match webhook {
            Some(webhook) => {
                let client = Client::builder().timeout(timeout).build().map_err(|e| {
                    MonitorError::InvalidConfig(format!("failed to build webhook client: {e}"))
                })?;
                Some(WebhookClient {
                    client,
                    url: webhook.url,
                })
            }
            None => None,
        };

        Ok(Self {
            webhook,
            ..Self::log_only()
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn notify(&self, snapshot: &MetricsSnapshot, thresholds: &AlertThresholds) {
        let message = format_alert_message(snapshot, thresholds);
        warn!("ALERT: {message}");

        if self.webhook.is_some() {
            let manager = self.clone();
            tokio::spawn(async move {
                manager.send_webhook_alert(&message).await;
            });
        }
    }

    #[instrument(skip(self))]
    pub async fn send_webhook_alert(&self, message: &str) {
        let Some(webhook) = &self.webhook else {
            return;
        };

        let payload = json!({
            "message": message,
            "host": self.host,
            "timestamp": Utc::now().to_rfc3339()
        });

        match webhook.client.post(&webhook.url).json(&payload).send().await {
            Ok(response) => {
                if response.status().is_success() {
                    info!("Successfully sent webhook alert");
                } else {
                    error!("Webhook alert failed with status: {}", response.status());
                }
            }
            Err(e) => {
                error!("Failed to send webhook alert: {}", e);
            }
        }
    }
}

/// Human readable notice naming every metric over its limit.
pub fn format_alert_message(snapshot: &MetricsSnapshot, thresholds: &AlertThresholds) -> String {
    let mut breaches = vec![];

    if snapshot.cpu_percent > thresholds.cpu_threshold {
        breaches.push(format!(
            "CPU usage {:.1}% (limit: {}%)",
            snapshot.cpu_percent, thresholds.cpu_threshold
        ));
    }

    if snapshot.memory_percent > thresholds.memory_threshold {
        breaches.push(format!(
            "memory usage {:.1}% (limit: {}%)",
            snapshot.memory_percent, thresholds.memory_threshold
        ));
    }

    if breaches.is_empty() {
        return String::from("High resource usage");
    }

    format!("High resource usage: {}", breaches.join(", "))
}
