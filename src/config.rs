//! Monitor configuration
//!
//! Every recognized option is enumerated here with an explicit default so
//! callers can rely on plain struct update syntax instead of option bags.

/// Collector configuration
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Remote endpoint performance reports are uploaded to. `None` disables
    /// outbound reporting entirely.
    pub report_url: Option<String>,
    /// Emit a human-readable log line for every recorded metric.
    pub console_log: bool,
    /// Probability in `[0, 1]` that a given `send_report` call actually
    /// performs the upload. Values outside the range are clamped.
    pub sample_rate: f64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            report_url: None,
            console_log: false,
            sample_rate: 0.1,
        }
    }
}

impl MonitorConfig {
    /// Effective sample rate, clamped into `[0, 1]`.
    pub fn effective_sample_rate(&self) -> f64 {
        self.sample_rate.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MonitorConfig::default();
        assert!(config.report_url.is_none());
        assert!(!config.console_log);
        assert!((config.sample_rate - 0.1).abs() < f64::EPSILON);
    }

    #[test]
    fn test_sample_rate_clamped() {
        let config = MonitorConfig {
            sample_rate: 1.5,
            ..Default::default()
        };
        assert_eq!(config.effective_sample_rate(), 1.0);

        let config = MonitorConfig {
            sample_rate: -0.2,
            ..Default::default()
        };
        assert_eq!(config.effective_sample_rate(), 0.0);
    }
}
