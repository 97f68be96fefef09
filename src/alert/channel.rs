//! Notification channel configuration and dispatch
//!
//! Each channel delivery is an independent unit of work: failures are logged
//! per channel and never propagate, so one broken endpoint cannot block the
//! rest of the fan-out.

use crate::alert::{Alert, AlertSeverity};

use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Channel-specific delivery configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ChannelConfig {
    /// Synchronous severity-prefixed log line
    Console,
    /// POST to an email gateway endpoint
    Email {
        endpoint: String,
        to: String,
        from: String,
    },
    /// POST to a Slack incoming-webhook URL
    Slack { webhook_url: String },
    /// POST to an arbitrary webhook URL
    Webhook { url: String },
}

/// A configured delivery target for alerts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationChannel {
    pub id: String,
    pub enabled: bool,
    pub config: ChannelConfig,
}

impl NotificationChannel {
    pub fn console(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            enabled: true,
            config: ChannelConfig::Console,
        }
    }
}

/// Deliver one alert through one channel. Best effort: all failures are
/// reduced to a log line.
pub(crate) async fn dispatch(
    channel: &NotificationChannel,
    alert: &Alert,
    client: &reqwest::Client,
) {
    match &channel.config {
        ChannelConfig::Console => {
            let line = format!(
                "{} [{}] {} (value: {:.2}, threshold: {:.2})",
                alert.severity.glyph(),
                alert.severity,
                alert.message,
                alert.value,
                alert.threshold
            );
            match alert.severity {
                AlertSeverity::Critical => error!("{}", line),
                AlertSeverity::Warning => warn!("{}", line),
                AlertSeverity::Info => info!("{}", line),
            }
        }
        ChannelConfig::Email { endpoint, to, from } => {
            let payload = json!({
                "to": to,
                "from": from,
                "subject": format!("[{}] Performance alert: {}", alert.severity, alert.metric),
                "body": alert.message,
                "alert": alert,
            });
            post(client, endpoint, &payload, &channel.id).await;
        }
        ChannelConfig::Slack { webhook_url } => {
            let color = match alert.severity {
                AlertSeverity::Critical => "danger",
                AlertSeverity::Warning => "warning",
                AlertSeverity::Info => "good",
            };
            let payload = json!({
                "attachments": [{
                    "color": color,
                    "title": format!("Performance alert: {}", alert.metric),
                    "text": alert.message,
                    "fields": [
                        { "title": "Metric", "value": alert.metric, "short": true },
                        { "title": "Current Value", "value": format!("{:.2}", alert.value), "short": true },
                        { "title": "Threshold", "value": format!("{:.2}", alert.threshold), "short": true },
                        { "title": "Timestamp", "value": alert.timestamp.to_rfc3339(), "short": true },
                    ],
                }],
            });
            post(client, webhook_url, &payload, &channel.id).await;
        }
        ChannelConfig::Webhook { url } => {
            let payload = json!({
                "alert": alert,
                "timestamp": chrono::Utc::now().to_rfc3339(),
            });
            post(client, url, &payload, &channel.id).await;
        }
    }
}

async fn post(client: &reqwest::Client, url: &str, payload: &serde_json::Value, channel_id: &str) {
    match client.post(url).json(payload).send().await {
        Ok(response) if response.status().is_success() => {
            debug!("Notification delivered via channel {}", channel_id);
        }
        Ok(response) => {
            warn!(
                "Notification via channel {} rejected: HTTP {}",
                channel_id,
                response.status()
            );
        }
        Err(e) => {
            warn!("Notification via channel {} failed: {}", channel_id, e);
        }
    }
}
