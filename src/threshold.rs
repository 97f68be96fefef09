//! Threshold registry and metric classification
//!
//! Holds the static table of named thresholds and classifies raw
//! `(name, value)` samples into pass/warning/fail metrics. Classification is
//! a pure function of the sample and its threshold; no hidden state.

use crate::error::{MonitorError, MonitorResult};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Soft thresholds start warning at this fraction of the target.
const WARNING_BAND: f64 = 0.8;

/// Classification outcome for a single sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricStatus {
    Pass,
    Warning,
    Fail,
}

impl std::fmt::Display for MetricStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetricStatus::Pass => write!(f, "pass"),
            MetricStatus::Warning => write!(f, "warning"),
            MetricStatus::Fail => write!(f, "fail"),
        }
    }
}

impl MetricStatus {
    /// Glyph used in verbose log lines.
    pub fn glyph(&self) -> &'static str {
        match self {
            MetricStatus::Pass => "✅",
            MetricStatus::Warning => "⚠️",
            MetricStatus::Fail => "❌",
        }
    }
}

/// Static threshold configuration for one named metric
///
/// `critical` thresholds are binary: the system is healthy at or below the
/// limit and failing above it. Non-critical thresholds model "higher is
/// better" metrics (e.g. a cache hit rate) and carry a warning band.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Threshold {
    pub name: String,
    pub description: String,
    pub limit: f64,
    pub unit: String,
    pub critical: bool,
}

/// A classified sample
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metric {
    pub name: String,
    pub value: f64,
    pub threshold: f64,
    pub unit: String,
    pub status: MetricStatus,
    pub timestamp: DateTime<Utc>,
}

/// Registry of named thresholds, loaded at construction and immutable during
/// normal operation
#[derive(Debug, Clone)]
pub struct ThresholdRegistry {
    thresholds: HashMap<String, Threshold>,
}

impl Default for ThresholdRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl ThresholdRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            thresholds: HashMap::new(),
        }
    }

    /// Create a registry from an explicit threshold table
    pub fn from_thresholds(thresholds: impl IntoIterator<Item = Threshold>) -> Self {
        Self {
            thresholds: thresholds
                .into_iter()
                .map(|t| (t.name.clone(), t))
                .collect(),
        }
    }

    /// Create a registry seeded with the standard client-side performance
    /// thresholds
    pub fn with_defaults() -> Self {
        Self::from_thresholds(default_thresholds())
    }

    /// Register or replace a threshold
    pub fn insert(&mut self, threshold: Threshold) {
        self.thresholds.insert(threshold.name.clone(), threshold);
    }

    /// Look up a threshold by metric name
    pub fn get(&self, name: &str) -> Option<&Threshold> {
        self.thresholds.get(name)
    }

    /// Whether a metric name is registered
    pub fn contains(&self, name: &str) -> bool {
        self.thresholds.contains_key(name)
    }

    /// All registered metric names
    pub fn names(&self) -> Vec<String> {
        self.thresholds.keys().cloned().collect()
    }

    /// Classify a raw sample against its registered threshold.
    ///
    /// An unregistered name is a configuration bug at the call site, so it
    /// fails loudly instead of being absorbed.
    pub fn evaluate(&self, name: &str, value: f64) -> MonitorResult<Metric> {
        let threshold = self
            .thresholds
            .get(name)
            .ok_or_else(|| MonitorError::UnknownMetric(name.to_string()))?;

        let status = if threshold.critical {
            if value <= threshold.limit {
                MetricStatus::Pass
            } else {
                MetricStatus::Fail
            }
        } else if value >= threshold.limit {
            MetricStatus::Pass
        } else if value >= WARNING_BAND * threshold.limit {
            MetricStatus::Warning
        } else {
            MetricStatus::Fail
        };

        Ok(Metric {
            name: threshold.name.clone(),
            value,
            threshold: threshold.limit,
            unit: threshold.unit.clone(),
            status,
            timestamp: Utc::now(),
        })
    }
}

/// Standard thresholds for browser performance instrumentation
fn default_thresholds() -> Vec<Threshold> {
    vec![
        Threshold {
            name: "pageLoadTime".to_string(),
            description: "Total page load time".to_string(),
            limit: 3000.0,
            unit: "ms".to_string(),
            critical: true,
        },
        Threshold {
            name: "firstContentfulPaint".to_string(),
            description: "First contentful paint".to_string(),
            limit: 1800.0,
            unit: "ms".to_string(),
            critical: true,
        },
        Threshold {
            name: "largestContentfulPaint".to_string(),
            description: "Largest contentful paint".to_string(),
            limit: 2500.0,
            unit: "ms".to_string(),
            critical: true,
        },
        Threshold {
            name: "firstInputDelay".to_string(),
            description: "First input delay".to_string(),
            limit: 100.0,
            unit: "ms".to_string(),
            critical: true,
        },
        Threshold {
            name: "cumulativeLayoutShift".to_string(),
            description: "Cumulative layout shift".to_string(),
            limit: 0.1,
            unit: "score".to_string(),
            critical: true,
        },
        Threshold {
            name: "timeToFirstByte".to_string(),
            description: "Time to first byte".to_string(),
            limit: 800.0,
            unit: "ms".to_string(),
            critical: true,
        },
        Threshold {
            name: "apiResponseTime".to_string(),
            description: "API response time".to_string(),
            limit: 200.0,
            unit: "ms".to_string(),
            critical: true,
        },
        Threshold {
            name: "memoryUsage".to_string(),
            description: "JS heap memory usage".to_string(),
            limit: 50.0,
            unit: "MB".to_string(),
            critical: true,
        },
        Threshold {
            name: "cacheHitRate".to_string(),
            description: "Cache hit rate".to_string(),
            limit: 90.0,
            unit: "%".to_string(),
            critical: false,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_with(limit: f64, critical: bool) -> ThresholdRegistry {
        ThresholdRegistry::from_thresholds(vec![Threshold {
            name: "testMetric".to_string(),
            description: "Test metric".to_string(),
            limit,
            unit: "ms".to_string(),
            critical,
        }])
    }

    #[test]
    fn test_critical_threshold_is_binary() {
        let registry = registry_with(200.0, true);

        assert_eq!(
            registry.evaluate("testMetric", 150.0).unwrap().status,
            MetricStatus::Pass
        );
        assert_eq!(
            registry.evaluate("testMetric", 200.0).unwrap().status,
            MetricStatus::Pass
        );
        assert_eq!(
            registry.evaluate("testMetric", 201.0).unwrap().status,
            MetricStatus::Fail
        );
    }

    #[test]
    fn test_soft_threshold_warning_band() {
        let registry = registry_with(90.0, false);

        assert_eq!(
            registry.evaluate("testMetric", 95.0).unwrap().status,
            MetricStatus::Pass
        );
        // 85 >= 0.8 * 90 = 72, inside the warning band
        assert_eq!(
            registry.evaluate("testMetric", 85.0).unwrap().status,
            MetricStatus::Warning
        );
        assert_eq!(
            registry.evaluate("testMetric", 50.0).unwrap().status,
            MetricStatus::Fail
        );
    }

    #[test]
    fn test_soft_threshold_band_edges() {
        let registry = registry_with(90.0, false);

        assert_eq!(
            registry.evaluate("testMetric", 90.0).unwrap().status,
            MetricStatus::Pass
        );
        assert_eq!(
            registry.evaluate("testMetric", 72.0).unwrap().status,
            MetricStatus::Warning
        );
        assert_eq!(
            registry.evaluate("testMetric", 71.9).unwrap().status,
            MetricStatus::Fail
        );
    }

    #[test]
    fn test_unknown_metric_fails() {
        let registry = ThresholdRegistry::with_defaults();
        let result = registry.evaluate("noSuchMetric", 1.0);
        assert!(matches!(result, Err(MonitorError::UnknownMetric(name)) if name == "noSuchMetric"));
    }

    #[test]
    fn test_metric_carries_threshold_fields() {
        let registry = ThresholdRegistry::with_defaults();
        let metric = registry.evaluate("apiResponseTime", 120.0).unwrap();

        assert_eq!(metric.name, "apiResponseTime");
        assert_eq!(metric.threshold, 200.0);
        assert_eq!(metric.unit, "ms");
        assert_eq!(metric.status, MetricStatus::Pass);
    }

    #[test]
    fn test_registry_mutation() {
        let mut registry = ThresholdRegistry::new();
        assert!(!registry.contains("custom"));

        registry.insert(Threshold {
            name: "custom".to_string(),
            description: "Custom metric".to_string(),
            limit: 10.0,
            unit: "ms".to_string(),
            critical: true,
        });

        assert!(registry.contains("custom"));
        assert_eq!(registry.get("custom").unwrap().limit, 10.0);
        assert_eq!(registry.names(), vec!["custom".to_string()]);
    }
}
