//! # perfwatch
//!
//! Perfwatch instruments a running client application: it classifies raw
//! runtime measurements against configurable thresholds, raises deduplicated
//! alerts when metrics degrade, and persists historical snapshots for
//! querying and trend analysis.
//!
//! ## Components
//!
//! - [`threshold`]: the static threshold registry and the pure metric
//!   classifier. Critical thresholds are binary (lower is better); soft
//!   thresholds carry a warning band (higher is better).
//! - [`collector`]: wraps instrumentation call sites, retains the latest
//!   classified value per metric, and produces point-in-time reports with an
//!   aggregate score and recommendations.
//! - [`alert`]: the rule engine with per-metric conditions, cooldown-based
//!   deduplication, and fire-and-forget fan-out to console, email, Slack,
//!   and webhook channels.
//! - [`store`]: bounded, newest-first retention of snapshots and alerts
//!   with querying, order-statistic percentiles, time-bucketed trends,
//!   export, and best-effort remote sync.
//!
//! ## Basic Usage
//!
//! ```rust
//! use perfwatch::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let registry = Arc::new(ThresholdRegistry::with_defaults());
//!     let engine = Arc::new(AlertEngine::new(
//!         AlertEngineConfig::default(),
//!         registry.clone(),
//!     ));
//!     let store = Arc::new(PerformanceStore::in_memory());
//!
//!     let collector = PerformanceCollector::new(registry, MonitorConfig::default())
//!         .with_alert_engine(engine.clone())
//!         .with_store(store.clone());
//!
//!     collector.record_metric("apiResponseTime", 120.0).await.unwrap();
//!
//!     let report = collector.generate_report().await;
//!     assert_eq!(report.overall_score, 100);
//! }
//! ```
//!
//! Instances are wired together explicitly; nothing in the crate is a
//! process-wide singleton, so lifecycle and test isolation stay under the
//! caller's control.
//!
//! ## Error model
//!
//! Evaluating an unregistered metric name is the one loud failure
//! ([`MonitorError::UnknownMetric`]); it marks an integration mistake.
//! Every transport or persistence failure is caught, logged, and reduced to
//! a benign return value so a downed channel or storage quota never
//! interrupts collection or alerting.

pub mod alert;
pub mod collector;
pub mod config;
pub mod error;
pub mod store;
pub mod threshold;

pub use alert::{Alert, AlertEngine, AlertRule};
pub use collector::PerformanceCollector;
pub use config::MonitorConfig;
pub use error::{MonitorError, MonitorResult};
pub use store::PerformanceStore;
pub use threshold::{Metric, MetricStatus, Threshold, ThresholdRegistry};

pub mod prelude {
    pub use crate::alert::{
        Alert, AlertCondition, AlertEngine, AlertEngineConfig, AlertFilter, AlertRule,
        AlertSeverity, ChannelConfig, NotificationChannel,
    };
    pub use crate::collector::{PerformanceCollector, PerformanceReport};
    pub use crate::config::MonitorConfig;
    pub use crate::error::{MonitorError, MonitorResult};
    pub use crate::store::{
        Aggregation, DeviceType, ExportFormat, FileBackend, MemoryBackend, PerformanceStore,
        Period, SnapshotContext, SnapshotQuery, StoreConfig, StoredSnapshot, TrendPoint, Viewport,
    };
    pub use crate::threshold::{Metric, MetricStatus, Threshold, ThresholdRegistry};
}
