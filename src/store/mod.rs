//! Time-bucketed performance data store
//!
//! Retains bounded, newest-first logs of metric snapshots and alerts,
//! answers ad hoc queries, and computes percentile aggregates and trend
//! series over rolling windows. Persistence runs through a pluggable
//! [`StorageBackend`]; the in-memory state is always authoritative.

pub mod backend;

pub use backend::{ALERTS_KEY, FileBackend, MemoryBackend, SNAPSHOTS_KEY, StorageBackend};

use crate::alert::Alert;
use crate::error::MonitorResult;
use crate::threshold::Metric;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Device class inferred from viewport width
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    Mobile,
    Tablet,
    Desktop,
}

impl DeviceType {
    pub fn from_viewport_width(width: u32) -> Self {
        if width < 768 {
            DeviceType::Mobile
        } else if width < 1024 {
            DeviceType::Tablet
        } else {
            DeviceType::Desktop
        }
    }
}

impl std::fmt::Display for DeviceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceType::Mobile => write!(f, "mobile"),
            DeviceType::Tablet => write!(f, "tablet"),
            DeviceType::Desktop => write!(f, "desktop"),
        }
    }
}

/// Viewport dimensions at capture time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

/// One stored batch of metrics plus capture context
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredSnapshot {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub url: Option<String>,
    pub user_id: Option<String>,
    pub session_id: String,
    pub metrics: Vec<Metric>,
    pub user_agent: Option<String>,
    pub device_type: DeviceType,
    pub viewport: Viewport,
}

/// Capture context supplied by the caller; missing fields are generated or
/// defaulted
#[derive(Debug, Clone, Default)]
pub struct SnapshotContext {
    pub url: Option<String>,
    pub user_id: Option<String>,
    pub session_id: Option<String>,
    pub user_agent: Option<String>,
    pub viewport: Option<Viewport>,
}

/// Query over the snapshot log. All filters are optional and combined with
/// AND semantics.
#[derive(Debug, Clone, Default)]
pub struct SnapshotQuery {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub url_contains: Option<String>,
    pub user_id: Option<String>,
    pub session_id: Option<String>,
    pub metric_name: Option<String>,
    pub limit: Option<usize>,
}

/// Aggregation lookback periods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Hour,
    Day,
    Week,
    Month,
}

impl Period {
    pub fn lookback(&self) -> ChronoDuration {
        match self {
            Period::Hour => ChronoDuration::hours(1),
            Period::Day => ChronoDuration::days(1),
            Period::Week => ChronoDuration::weeks(1),
            Period::Month => ChronoDuration::days(30),
        }
    }

    /// Number of trend buckets the lookback window divides into
    pub fn bucket_count(&self) -> usize {
        match self {
            Period::Hour => 12,
            Period::Day => 24,
            Period::Week => 7,
            Period::Month => 30,
        }
    }

    pub fn bucket_interval(&self) -> ChronoDuration {
        match self {
            Period::Hour => ChronoDuration::minutes(5),
            Period::Day => ChronoDuration::hours(1),
            Period::Week => ChronoDuration::days(1),
            Period::Month => ChronoDuration::days(1),
        }
    }
}

/// Order-statistic aggregation over one metric in a time window
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Aggregation {
    pub metric_name: String,
    pub period: Period,
    pub avg: f64,
    pub min: f64,
    pub max: f64,
    pub p50: f64,
    pub p95: f64,
    pub p99: f64,
    pub count: usize,
}

impl Aggregation {
    fn empty(metric_name: &str, period: Period) -> Self {
        Self {
            metric_name: metric_name.to_string(),
            period,
            avg: 0.0,
            min: 0.0,
            max: 0.0,
            p50: 0.0,
            p95: 0.0,
            p99: 0.0,
            count: 0,
        }
    }
}

/// One point in a trend series
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendPoint {
    pub bucket_start: DateTime<Utc>,
    pub value: f64,
}

/// Export serialization formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

#[derive(Debug, Serialize, Deserialize)]
struct ExportEnvelope {
    data: Vec<StoredSnapshot>,
    alerts: Vec<Alert>,
    #[serde(rename = "exportedAt")]
    exported_at: DateTime<Utc>,
}

/// Store configuration
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Maximum retained snapshots; oldest evicted past this count.
    pub max_snapshots: usize,
    /// Maximum retained alerts.
    pub max_alerts: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_snapshots: 10_000,
            max_alerts: 1_000,
        }
    }
}

/// Bounded, queryable store for performance snapshots and alerts
pub struct PerformanceStore {
    config: StoreConfig,
    backend: Box<dyn StorageBackend>,
    // Newest-first; insertion order doubles as eviction order.
    snapshots: RwLock<VecDeque<StoredSnapshot>>,
    alerts: RwLock<VecDeque<Alert>>,
    client: reqwest::Client,
}

impl PerformanceStore {
    /// Create a store over the given backend, reloading any previously
    /// persisted state. Corrupt persisted data is logged and discarded.
    pub fn new(config: StoreConfig, backend: Box<dyn StorageBackend>) -> Self {
        let snapshots = Self::reload::<StoredSnapshot>(backend.as_ref(), SNAPSHOTS_KEY);
        let alerts = Self::reload::<Alert>(backend.as_ref(), ALERTS_KEY);

        Self {
            config,
            backend,
            snapshots: RwLock::new(snapshots),
            alerts: RwLock::new(alerts),
            client: reqwest::Client::new(),
        }
    }

    /// In-memory store with no persistence
    pub fn in_memory() -> Self {
        Self::new(StoreConfig::default(), Box::new(MemoryBackend))
    }

    fn reload<T: for<'de> Deserialize<'de>>(
        backend: &dyn StorageBackend,
        key: &str,
    ) -> VecDeque<T> {
        match backend.load(key) {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(items) => items,
                Err(e) => {
                    warn!("Discarding corrupt persisted state under {}: {}", key, e);
                    VecDeque::new()
                }
            },
            Ok(None) => VecDeque::new(),
            Err(e) => {
                warn!("Failed to reload persisted state under {}: {}", key, e);
                VecDeque::new()
            }
        }
    }

    /// Serialize and persist a list; failures leave the in-memory copy
    /// authoritative.
    fn persist<T: Serialize>(&self, key: &str, items: &VecDeque<T>) {
        let serialized = match serde_json::to_string(items) {
            Ok(s) => s,
            Err(e) => {
                warn!("Failed to serialize state for {}: {}", key, e);
                return;
            }
        };
        if let Err(e) = self.backend.save(key, &serialized) {
            warn!("Failed to persist state under {}: {}", key, e);
        }
    }

    /// Store one batch of metrics as a snapshot, generating missing context
    pub async fn store_snapshot(
        &self,
        metrics: Vec<Metric>,
        ctx: SnapshotContext,
    ) -> StoredSnapshot {
        let viewport = ctx.viewport.unwrap_or_default();
        let snapshot = StoredSnapshot {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            url: ctx.url,
            user_id: ctx.user_id,
            session_id: ctx
                .session_id
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            metrics,
            user_agent: ctx.user_agent,
            device_type: DeviceType::from_viewport_width(viewport.width),
            viewport,
        };

        {
            let mut snapshots = self.snapshots.write().await;
            snapshots.push_front(snapshot.clone());
            while snapshots.len() > self.config.max_snapshots {
                snapshots.pop_back();
            }
            self.persist(SNAPSHOTS_KEY, &snapshots);
        }

        debug!("Stored snapshot {} ({} metrics)", snapshot.id, snapshot.metrics.len());
        snapshot
    }

    /// Retain an alert, same prepend/bound/evict discipline as snapshots
    pub async fn store_alert(&self, alert: Alert) {
        let mut alerts = self.alerts.write().await;
        alerts.push_front(alert);
        while alerts.len() > self.config.max_alerts {
            alerts.pop_back();
        }
        self.persist(ALERTS_KEY, &alerts);
    }

    /// Linear filter over the snapshot log, newest-first order preserved
    pub async fn query(&self, query: &SnapshotQuery) -> Vec<StoredSnapshot> {
        let snapshots = self.snapshots.read().await;
        snapshots
            .iter()
            .filter(|s| query.start.is_none_or(|start| s.timestamp >= start))
            .filter(|s| query.end.is_none_or(|end| s.timestamp <= end))
            .filter(|s| {
                query.url_contains.as_deref().is_none_or(|needle| {
                    s.url.as_deref().is_some_and(|url| url.contains(needle))
                })
            })
            .filter(|s| {
                query
                    .user_id
                    .as_deref()
                    .is_none_or(|id| s.user_id.as_deref() == Some(id))
            })
            .filter(|s| {
                query
                    .session_id
                    .as_deref()
                    .is_none_or(|id| s.session_id == id)
            })
            .filter(|s| {
                query
                    .metric_name
                    .as_deref()
                    .is_none_or(|name| s.metrics.iter().any(|m| m.name == name))
            })
            .take(query.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect()
    }

    /// Current number of retained snapshots
    pub async fn snapshot_count(&self) -> usize {
        self.snapshots.read().await.len()
    }

    /// Current number of retained alerts
    pub async fn alert_count(&self) -> usize {
        self.alerts.read().await.len()
    }

    /// Order-statistic aggregation of one metric over the period's lookback
    /// window. Returns a zeroed aggregation with `count == 0` when no samples
    /// match.
    pub async fn aggregate(
        &self,
        metric_name: &str,
        period: Period,
        query: Option<SnapshotQuery>,
    ) -> Aggregation {
        let mut query = query.unwrap_or_default();
        if query.start.is_none() {
            query.start = Some(Utc::now() - period.lookback());
        }

        let snapshots = self.query(&query).await;
        let mut values: Vec<f64> = snapshots
            .iter()
            .flat_map(|s| s.metrics.iter())
            .filter(|m| m.name == metric_name)
            .map(|m| m.value)
            .collect();

        if values.is_empty() {
            return Aggregation::empty(metric_name, period);
        }

        values.sort_by(|a, b| a.total_cmp(b));
        let count = values.len();
        let percentile = |k: f64| values[((k / 100.0) * count as f64).floor() as usize];

        Aggregation {
            metric_name: metric_name.to_string(),
            period,
            avg: values.iter().sum::<f64>() / count as f64,
            min: values[0],
            max: values[count - 1],
            p50: percentile(50.0),
            p95: percentile(95.0),
            p99: percentile(99.0),
            count,
        }
    }

    /// Time-bucketed trend series for one metric. The series always has the
    /// period's full bucket count; empty buckets report zero.
    pub async fn trends(
        &self,
        metric_name: &str,
        period: Period,
        query: Option<SnapshotQuery>,
    ) -> Vec<TrendPoint> {
        let window_start = Utc::now() - period.lookback();
        let mut query = query.unwrap_or_default();
        if query.start.is_none() {
            query.start = Some(window_start);
        }

        let snapshots = self.query(&query).await;
        let interval = period.bucket_interval();

        (0..period.bucket_count())
            .map(|i| {
                let bucket_start = window_start + interval * i as i32;
                let bucket_end = bucket_start + interval;
                let values: Vec<f64> = snapshots
                    .iter()
                    .filter(|s| s.timestamp >= bucket_start && s.timestamp < bucket_end)
                    .flat_map(|s| s.metrics.iter())
                    .filter(|m| m.name == metric_name)
                    .map(|m| m.value)
                    .collect();

                let value = if values.is_empty() {
                    0.0
                } else {
                    values.iter().sum::<f64>() / values.len() as f64
                };

                TrendPoint {
                    bucket_start,
                    value,
                }
            })
            .collect()
    }

    /// Remove snapshots and alerts older than `max_age`. Returns the number
    /// of (snapshots, alerts) removed.
    pub async fn clear_old_data(&self, max_age: Duration) -> (usize, usize) {
        let cutoff = Utc::now() - ChronoDuration::milliseconds(max_age.as_millis() as i64);

        let removed_snapshots = {
            let mut snapshots = self.snapshots.write().await;
            let before = snapshots.len();
            snapshots.retain(|s| s.timestamp >= cutoff);
            let removed = before - snapshots.len();
            if removed > 0 {
                self.persist(SNAPSHOTS_KEY, &snapshots);
            }
            removed
        };

        let removed_alerts = {
            let mut alerts = self.alerts.write().await;
            let before = alerts.len();
            alerts.retain(|a| a.timestamp >= cutoff);
            let removed = before - alerts.len();
            if removed > 0 {
                self.persist(ALERTS_KEY, &alerts);
            }
            removed
        };

        if removed_snapshots > 0 || removed_alerts > 0 {
            debug!(
                "Retention pass removed {} snapshots, {} alerts",
                removed_snapshots, removed_alerts
            );
        }
        (removed_snapshots, removed_alerts)
    }

    /// Drop all retained state and remove the backing keys
    pub async fn clear_all(&self) {
        {
            let mut snapshots = self.snapshots.write().await;
            snapshots.clear();
        }
        {
            let mut alerts = self.alerts.write().await;
            alerts.clear();
        }
        if let Err(e) = self.backend.remove(SNAPSHOTS_KEY) {
            warn!("Failed to remove persisted snapshots: {}", e);
        }
        if let Err(e) = self.backend.remove(ALERTS_KEY) {
            warn!("Failed to remove persisted alerts: {}", e);
        }
    }

    /// Serialize the full retained state
    pub async fn export(&self, format: ExportFormat) -> MonitorResult<String> {
        let snapshots = self.snapshots.read().await;
        let alerts = self.alerts.read().await;

        match format {
            ExportFormat::Json => {
                let envelope = ExportEnvelope {
                    data: snapshots.iter().cloned().collect(),
                    alerts: alerts.iter().cloned().collect(),
                    exported_at: Utc::now(),
                };
                Ok(serde_json::to_string_pretty(&envelope)?)
            }
            ExportFormat::Csv => {
                let mut out = String::from("id,timestamp,url,userId,sessionId,deviceType,metrics\n");
                for s in snapshots.iter() {
                    let metrics_json = serde_json::to_string(&s.metrics)?;
                    out.push_str(&format!(
                        "{},{},{},{},{},{},{}\n",
                        s.id,
                        s.timestamp.to_rfc3339(),
                        csv_escape(s.url.as_deref().unwrap_or("")),
                        csv_escape(s.user_id.as_deref().unwrap_or("")),
                        csv_escape(&s.session_id),
                        s.device_type,
                        csv_escape(&metrics_json),
                    ));
                }
                Ok(out)
            }
        }
    }

    /// Re-ingest a JSON export, appending behind any current state. Returns
    /// the number of (snapshots, alerts) actually retained; anything past
    /// the configured bounds is discarded with a warning.
    pub async fn import(&self, raw: &str) -> MonitorResult<(usize, usize)> {
        let envelope: ExportEnvelope = serde_json::from_str(raw)?;
        let snapshot_count = envelope.data.len();
        let alert_count = envelope.alerts.len();

        let snapshots_kept = {
            let mut snapshots = self.snapshots.write().await;
            let before = snapshots.len();
            snapshots.extend(envelope.data);
            snapshots.truncate(self.config.max_snapshots);
            self.persist(SNAPSHOTS_KEY, &snapshots);
            snapshots.len() - before
        };
        let alerts_kept = {
            let mut alerts = self.alerts.write().await;
            let before = alerts.len();
            alerts.extend(envelope.alerts);
            alerts.truncate(self.config.max_alerts);
            self.persist(ALERTS_KEY, &alerts);
            alerts.len() - before
        };

        if snapshots_kept < snapshot_count || alerts_kept < alert_count {
            warn!(
                "Import exceeded retention bounds: kept {}/{} snapshots, {}/{} alerts",
                snapshots_kept, snapshot_count, alerts_kept, alert_count
            );
        }
        Ok((snapshots_kept, alerts_kept))
    }

    /// Best-effort POST of the full current state to a remote endpoint.
    /// Transport and non-2xx failures are logged and reduced to `false`.
    pub async fn sync_to_server(&self, url: &str, api_key: Option<&str>) -> bool {
        let payload = {
            let snapshots = self.snapshots.read().await;
            let alerts = self.alerts.read().await;
            json!({
                "data": snapshots.iter().collect::<Vec<_>>(),
                "alerts": alerts.iter().collect::<Vec<_>>(),
            })
        };

        let mut request = self.client.post(url).json(&payload);
        if let Some(key) = api_key {
            request = request.bearer_auth(key);
        }

        match request.send().await {
            Ok(response) if response.status().is_success() => {
                debug!("Synced store state to {}", url);
                true
            }
            Ok(response) => {
                warn!("Sync to {} rejected: HTTP {}", url, response.status());
                false
            }
            Err(e) => {
                warn!("Sync to {} failed: {}", url, e);
                false
            }
        }
    }
}

/// Quote a CSV cell, doubling any embedded quotes
fn csv_escape(cell: &str) -> String {
    if cell.contains(',') || cell.contains('"') || cell.contains('\n') {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}
