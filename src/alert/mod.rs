//! Alert rule engine
//!
//! Evaluates classified metrics against a mutable per-metric rule table,
//! suppresses repeat alerts inside each rule's cooldown window, and fans
//! qualifying alerts out to every enabled notification channel.
//!
//! The per-metric state machine is deliberately small: idle → alert fired
//! (cooldown window open) → idle once the cooldown elapses. Suppressed
//! breaches are dropped, not accumulated.

pub mod channel;

pub use channel::{ChannelConfig, NotificationChannel};

use crate::store::PerformanceStore;
use crate::threshold::{Metric, ThresholdRegistry};

use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Alert severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Critical,
    Warning,
    Info,
}

impl std::fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertSeverity::Critical => write!(f, "CRITICAL"),
            AlertSeverity::Warning => write!(f, "WARNING"),
            AlertSeverity::Info => write!(f, "INFO"),
        }
    }
}

impl AlertSeverity {
    pub fn glyph(&self) -> &'static str {
        match self {
            AlertSeverity::Critical => "🚨",
            AlertSeverity::Warning => "⚠️",
            AlertSeverity::Info => "ℹ️",
        }
    }
}

/// Rule condition against the incoming metric value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertCondition {
    Exceeds,
    Below,
    Equals,
}

impl AlertCondition {
    pub fn holds(&self, value: f64, threshold: f64) -> bool {
        match self {
            AlertCondition::Exceeds => value > threshold,
            AlertCondition::Below => value < threshold,
            AlertCondition::Equals => (value - threshold).abs() < f64::EPSILON,
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            AlertCondition::Exceeds => "exceeded",
            AlertCondition::Below => "fell below",
            AlertCondition::Equals => "matched",
        }
    }
}

/// Per-metric alerting rule. One rule per metric name; re-adding a rule for
/// the same metric replaces the previous one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRule {
    pub metric: String,
    pub condition: AlertCondition,
    pub threshold: f64,
    pub severity: AlertSeverity,
    pub cooldown: Duration,
}

/// A fired alert
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: Uuid,
    pub severity: AlertSeverity,
    pub metric: String,
    pub message: String,
    pub value: f64,
    pub threshold: f64,
    pub timestamp: DateTime<Utc>,
    pub acknowledged: bool,
}

/// Optional filters for alert queries
#[derive(Debug, Clone, Default)]
pub struct AlertFilter {
    pub severity: Option<AlertSeverity>,
    pub acknowledged: Option<bool>,
    pub limit: Option<usize>,
}

/// Summary counts over the in-memory alert log
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlertStats {
    pub total: usize,
    pub critical: usize,
    pub warning: usize,
    pub info: usize,
    pub acknowledged: usize,
    pub unacknowledged: usize,
}

/// Alert engine configuration
#[derive(Debug, Clone)]
pub struct AlertEngineConfig {
    /// Maximum retained alerts; the oldest is evicted past this count.
    pub max_alerts: usize,
    /// Seed the default rule table and console channel at construction.
    pub seed_defaults: bool,
}

impl Default for AlertEngineConfig {
    fn default() -> Self {
        Self {
            max_alerts: 1000,
            seed_defaults: true,
        }
    }
}

/// Alert rule engine with cooldown-based deduplication and multi-channel
/// dispatch
pub struct AlertEngine {
    config: AlertEngineConfig,
    registry: Arc<ThresholdRegistry>,
    rules: RwLock<HashMap<String, AlertRule>>,
    channels: RwLock<HashMap<String, NotificationChannel>>,
    // Newest-first, bounded by max_alerts.
    alerts: RwLock<VecDeque<Alert>>,
    last_fired: RwLock<HashMap<String, DateTime<Utc>>>,
    store: Option<Arc<PerformanceStore>>,
    client: reqwest::Client,
}

impl AlertEngine {
    /// Create a new engine. With `seed_defaults` set, the standard rule
    /// table and a console channel are registered immediately.
    pub fn new(config: AlertEngineConfig, registry: Arc<ThresholdRegistry>) -> Self {
        let mut rules = HashMap::new();
        let mut channels = HashMap::new();

        if config.seed_defaults {
            for rule in default_rules() {
                rules.insert(rule.metric.clone(), rule);
            }
            channels.insert(
                "console".to_string(),
                NotificationChannel::console("console"),
            );
        }

        Self {
            config,
            registry,
            rules: RwLock::new(rules),
            channels: RwLock::new(channels),
            alerts: RwLock::new(VecDeque::new()),
            last_fired: RwLock::new(HashMap::new()),
            store: None,
            client: reqwest::Client::new(),
        }
    }

    /// Wire a data store; every fired alert is also retained there
    pub fn with_store(mut self, store: Arc<PerformanceStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Register or replace the rule for a metric (last write wins)
    pub async fn add_rule(&self, rule: AlertRule) {
        let mut rules = self.rules.write().await;
        info!("Registered alert rule for metric: {}", rule.metric);
        rules.insert(rule.metric.clone(), rule);
    }

    /// Remove the rule for a metric
    pub async fn remove_rule(&self, metric: &str) -> bool {
        let mut rules = self.rules.write().await;
        if rules.remove(metric).is_some() {
            info!("Removed alert rule for metric: {}", metric);
            true
        } else {
            false
        }
    }

    /// Register or replace a notification channel
    pub async fn add_channel(&self, channel: NotificationChannel) {
        let mut channels = self.channels.write().await;
        info!("Registered notification channel: {}", channel.id);
        channels.insert(channel.id.clone(), channel);
    }

    /// Remove a notification channel by id
    pub async fn remove_channel(&self, id: &str) -> bool {
        let mut channels = self.channels.write().await;
        channels.remove(id).is_some()
    }

    /// Evaluate a classified metric against its rule and fire an alert on a
    /// non-suppressed breach.
    ///
    /// Cooldown arithmetic uses the metric's own timestamp, and both the
    /// alert log and the last-fired table are updated before any channel
    /// dispatch is scheduled, so a slow channel never delays the next
    /// eligibility check.
    pub async fn check_metric(&self, metric: &Metric) {
        let rule = {
            let rules = self.rules.read().await;
            match rules.get(&metric.name) {
                Some(rule) => rule.clone(),
                // Untracked metrics are not alertable.
                None => return,
            }
        };

        if !rule.condition.holds(metric.value, rule.threshold) {
            return;
        }

        // Check-and-set under one guard so two concurrent breaches of the
        // same metric cannot both pass the cooldown comparison.
        {
            let mut last_fired = self.last_fired.write().await;
            if let Some(previous) = last_fired.get(&metric.name) {
                let elapsed = metric.timestamp.signed_duration_since(*previous);
                if elapsed.num_milliseconds() < rule.cooldown.as_millis() as i64 {
                    debug!(
                        "Alert for {} suppressed: {}ms into a {}ms cooldown",
                        metric.name,
                        elapsed.num_milliseconds(),
                        rule.cooldown.as_millis()
                    );
                    return;
                }
            }
            last_fired.insert(metric.name.clone(), metric.timestamp);
        }

        let description = self
            .registry
            .get(&metric.name)
            .map(|t| t.description.clone())
            .unwrap_or_else(|| metric.name.clone());

        let alert = Alert {
            id: Uuid::new_v4(),
            severity: rule.severity,
            metric: metric.name.clone(),
            message: format!(
                "{} {} the threshold of {:.2}{} (current: {:.2}{})",
                description,
                rule.condition.describe(),
                rule.threshold,
                metric.unit,
                metric.value,
                metric.unit
            ),
            value: metric.value,
            threshold: rule.threshold,
            timestamp: metric.timestamp,
            acknowledged: false,
        };

        {
            let mut alerts = self.alerts.write().await;
            alerts.push_front(alert.clone());
            while alerts.len() > self.config.max_alerts {
                alerts.pop_back();
            }
        }

        info!("Alert fired for {}: {}", alert.metric, alert.message);

        if let Some(store) = &self.store {
            store.store_alert(alert.clone()).await;
        }
        self.dispatch_all(alert).await;
    }

    /// Fan an alert out to every enabled channel as independent tasks
    async fn dispatch_all(&self, alert: Alert) {
        let channels = self.channels.read().await;
        for channel in channels.values().filter(|c| c.enabled) {
            let channel = channel.clone();
            let alert = alert.clone();
            let client = self.client.clone();
            tokio::task::spawn(async move {
                channel::dispatch(&channel, &alert, &client).await;
            });
        }
    }

    /// Mark an alert acknowledged. Idempotent; returns whether the id was
    /// found.
    pub async fn acknowledge_alert(&self, id: Uuid) -> bool {
        let mut alerts = self.alerts.write().await;
        match alerts.iter_mut().find(|a| a.id == id) {
            Some(alert) => {
                alert.acknowledged = true;
                true
            }
            None => false,
        }
    }

    /// Query the alert log, newest first
    pub async fn get_alerts(&self, filter: &AlertFilter) -> Vec<Alert> {
        let alerts = self.alerts.read().await;
        alerts
            .iter()
            .filter(|a| filter.severity.is_none_or(|s| a.severity == s))
            .filter(|a| filter.acknowledged.is_none_or(|ack| a.acknowledged == ack))
            .take(filter.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect()
    }

    /// Summary counts over the alert log
    pub async fn alert_stats(&self) -> AlertStats {
        let alerts = self.alerts.read().await;
        let mut stats = AlertStats {
            total: alerts.len(),
            ..Default::default()
        };
        for alert in alerts.iter() {
            match alert.severity {
                AlertSeverity::Critical => stats.critical += 1,
                AlertSeverity::Warning => stats.warning += 1,
                AlertSeverity::Info => stats.info += 1,
            }
            if alert.acknowledged {
                stats.acknowledged += 1;
            } else {
                stats.unacknowledged += 1;
            }
        }
        stats
    }
}

/// Default rule table covering the standard thresholds
fn default_rules() -> Vec<AlertRule> {
    vec![
        AlertRule {
            metric: "pageLoadTime".to_string(),
            condition: AlertCondition::Exceeds,
            threshold: 3000.0,
            severity: AlertSeverity::Warning,
            cooldown: Duration::from_secs(60),
        },
        AlertRule {
            metric: "largestContentfulPaint".to_string(),
            condition: AlertCondition::Exceeds,
            threshold: 2500.0,
            severity: AlertSeverity::Warning,
            cooldown: Duration::from_secs(60),
        },
        AlertRule {
            metric: "firstInputDelay".to_string(),
            condition: AlertCondition::Exceeds,
            threshold: 100.0,
            severity: AlertSeverity::Warning,
            cooldown: Duration::from_secs(60),
        },
        AlertRule {
            metric: "apiResponseTime".to_string(),
            condition: AlertCondition::Exceeds,
            threshold: 200.0,
            severity: AlertSeverity::Warning,
            cooldown: Duration::from_secs(30),
        },
        AlertRule {
            metric: "memoryUsage".to_string(),
            condition: AlertCondition::Exceeds,
            threshold: 100.0,
            severity: AlertSeverity::Critical,
            cooldown: Duration::from_secs(120),
        },
        AlertRule {
            metric: "cacheHitRate".to_string(),
            condition: AlertCondition::Below,
            threshold: 72.0,
            severity: AlertSeverity::Info,
            cooldown: Duration::from_secs(300),
        },
    ]
}
