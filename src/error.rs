use thiserror::Error;

/// Monitoring-related errors
#[derive(Error, Debug, Clone)]
pub enum MonitorError {
    #[error("Unknown metric: {0}")]
    UnknownMetric(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

pub type MonitorResult<T> = Result<T, MonitorError>;

impl From<std::io::Error> for MonitorError {
    fn from(error: std::io::Error) -> Self {
        MonitorError::Io(error.to_string())
    }
}

impl From<serde_json::Error> for MonitorError {
    fn from(error: serde_json::Error) -> Self {
        MonitorError::Serialization(error.to_string())
    }
}

impl From<reqwest::Error> for MonitorError {
    fn from(error: reqwest::Error) -> Self {
        MonitorError::Transport(error.to_string())
    }
}
