//! Metric collection and reporting façade
//!
//! Bridges instrumentation sources into the classifier, retains the latest
//! classified value per metric name, and produces point-in-time reports.
//! The alert engine and data store are wired in explicitly at construction;
//! there is no shared global instance.

use crate::alert::AlertEngine;
use crate::config::MonitorConfig;
use crate::error::MonitorResult;
use crate::store::{PerformanceStore, SnapshotContext};
use crate::threshold::{Metric, MetricStatus, ThresholdRegistry};

use chrono::Utc;
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Point-in-time report over the currently retained metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceReport {
    pub generated_at: chrono::DateTime<Utc>,
    pub overall_score: u32,
    pub metrics: Vec<Metric>,
    pub recommendations: Vec<String>,
}

/// Collects raw measurements, classifies them, and fans them out to the
/// wired alert engine and data store
pub struct PerformanceCollector {
    registry: Arc<ThresholdRegistry>,
    config: MonitorConfig,
    session_id: String,
    latest: RwLock<HashMap<String, Metric>>,
    alert_engine: Option<Arc<AlertEngine>>,
    store: Option<Arc<PerformanceStore>>,
    client: reqwest::Client,
}

impl PerformanceCollector {
    pub fn new(registry: Arc<ThresholdRegistry>, config: MonitorConfig) -> Self {
        Self {
            registry,
            config,
            session_id: Uuid::new_v4().to_string(),
            latest: RwLock::new(HashMap::new()),
            alert_engine: None,
            store: None,
            client: reqwest::Client::new(),
        }
    }

    /// Wire an alert engine; every recorded metric is checked against it
    pub fn with_alert_engine(mut self, engine: Arc<AlertEngine>) -> Self {
        self.alert_engine = Some(engine);
        self
    }

    /// Wire a data store; every recorded metric is retained as a snapshot
    pub fn with_store(mut self, store: Arc<PerformanceStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Session id stamped onto stored snapshots
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Classify and record one raw sample.
    ///
    /// An unregistered name fails loudly; it is an integration mistake, not
    /// a runtime condition. Alerting and storage side effects run after the
    /// local map is updated.
    pub async fn record_metric(&self, name: &str, value: f64) -> MonitorResult<Metric> {
        let metric = self.registry.evaluate(name, value)?;

        if self.config.console_log {
            info!(
                "{} {}: {:.2}{} (threshold: {:.2}{})",
                metric.status.glyph(),
                metric.name,
                metric.value,
                metric.unit,
                metric.threshold,
                metric.unit
            );
        }

        {
            let mut latest = self.latest.write().await;
            latest.insert(metric.name.clone(), metric.clone());
        }

        if let Some(engine) = &self.alert_engine {
            engine.check_metric(&metric).await;
        }

        if let Some(store) = &self.store {
            store
                .store_snapshot(
                    vec![metric.clone()],
                    SnapshotContext {
                        session_id: Some(self.session_id.clone()),
                        ..Default::default()
                    },
                )
                .await;
        }

        Ok(metric)
    }

    /// Time a synchronous operation and record its duration in milliseconds
    /// under `label`.
    ///
    /// The duration is recorded only when the operation succeeds; on failure
    /// the timing is discarded and the error propagates unchanged.
    pub async fn measure_operation<T, E>(
        &self,
        label: &str,
        op: impl FnOnce() -> Result<T, E>,
    ) -> Result<T, E> {
        let start = Instant::now();
        let result = op();
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

        match result {
            Ok(value) => {
                if let Err(e) = self.record_metric(label, elapsed_ms).await {
                    error!("Failed to record timing for {}: {}", label, e);
                }
                Ok(value)
            }
            Err(e) => {
                debug!("Operation {} failed after {:.2}ms; timing discarded", label, elapsed_ms);
                Err(e)
            }
        }
    }

    /// Async counterpart of [`measure_operation`](Self::measure_operation)
    pub async fn measure_async_operation<T, E, Fut>(&self, label: &str, fut: Fut) -> Result<T, E>
    where
        Fut: Future<Output = Result<T, E>>,
    {
        let start = Instant::now();
        let result = fut.await;
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

        match result {
            Ok(value) => {
                if let Err(e) = self.record_metric(label, elapsed_ms).await {
                    error!("Failed to record timing for {}: {}", label, e);
                }
                Ok(value)
            }
            Err(e) => {
                debug!("Operation {} failed after {:.2}ms; timing discarded", label, elapsed_ms);
                Err(e)
            }
        }
    }

    /// Snapshot of the latest classified value per metric name
    pub async fn latest_metrics(&self) -> HashMap<String, Metric> {
        self.latest.read().await.clone()
    }

    /// Drop all retained metric state
    pub async fn clear(&self) {
        self.latest.write().await.clear();
    }

    /// Derive a report from the current metric map. Pure with respect to
    /// collector state.
    pub async fn generate_report(&self) -> PerformanceReport {
        let latest = self.latest.read().await;
        let mut metrics: Vec<Metric> = latest.values().cloned().collect();
        metrics.sort_by(|a, b| a.name.cmp(&b.name));

        let total = metrics.len();
        let passing = metrics
            .iter()
            .filter(|m| m.status == MetricStatus::Pass)
            .count();
        let overall_score = if total == 0 {
            100
        } else {
            (100.0 * passing as f64 / total as f64).round() as u32
        };

        let recommendations = metrics
            .iter()
            .filter_map(|m| match m.status {
                MetricStatus::Fail => Some(format!(
                    "{} is failing: {:.2}{} against a threshold of {:.2}{}",
                    m.name, m.value, m.unit, m.threshold, m.unit
                )),
                MetricStatus::Warning => Some(format!(
                    "{} is degraded: {:.2}{}, target {:.2}{}",
                    m.name, m.value, m.unit, m.threshold, m.unit
                )),
                MetricStatus::Pass => None,
            })
            .collect();

        PerformanceReport {
            generated_at: Utc::now(),
            overall_score,
            metrics,
            recommendations,
        }
    }

    /// Upload the current report with probability `sample_rate`.
    ///
    /// Best effort: returns whether an upload was attempted and accepted.
    /// Transport failures are logged, never propagated.
    pub async fn send_report(&self) -> bool {
        let Some(url) = self.config.report_url.as_deref() else {
            return false;
        };
        if rand::random::<f64>() >= self.config.effective_sample_rate() {
            debug!("Report upload skipped by sampling");
            return false;
        }

        let report = self.generate_report().await;
        match self.client.post(url).json(&report).send().await {
            Ok(response) if response.status().is_success() => {
                debug!("Report uploaded to {}", url);
                true
            }
            Ok(response) => {
                warn!("Report upload rejected: HTTP {}", response.status());
                false
            }
            Err(e) => {
                warn!("Report upload failed: {}", e);
                false
            }
        }
    }
}
