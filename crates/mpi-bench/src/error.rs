//! Error types for cluster control, benchmark runs and result storage

use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, BenchError>;

#[derive(Error, Debug)]
pub enum BenchError {
    #[error("Container runtime unavailable: {0}")]
    RuntimeUnavailable(String),

    #[error("Container runtime error: {0}")]
    Runtime(String),

    #[error("Node {0} not found")]
    NodeNotFound(String),

    #[error("Node {node} not ready after {waited:?}")]
    ReadinessTimeout { node: String, waited: Duration },

    #[error("Invalid benchmark request: {0}")]
    InvalidRequest(String),

    #[error("Result file {0} not found")]
    ResultNotFound(String),

    #[error("Invalid result name: {0}")]
    InvalidResultName(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Config write error: {0}")]
    ConfigWrite(#[from] toml::ser::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl BenchError {
    /// Short machine-readable code, used by the dashboard API
    pub fn code(&self) -> &'static str {
        match self {
            Self::RuntimeUnavailable(_) => "RUNTIME_UNAVAILABLE",
            Self::Runtime(_) => "RUNTIME_ERROR",
            Self::NodeNotFound(_) => "NODE_NOT_FOUND",
            Self::ReadinessTimeout { .. } => "READINESS_TIMEOUT",
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::ResultNotFound(_) => "NOT_FOUND",
            Self::InvalidResultName(_) => "INVALID_NAME",
            Self::ConfigParse(_) | Self::ConfigWrite(_) => "CONFIG_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Csv(_) => "CSV_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BenchError::NodeNotFound("node02".to_string());
        assert_eq!(format!("{}", err), "Node node02 not found");

        let err = BenchError::ReadinessTimeout {
            node: "hpchead".to_string(),
            waited: Duration::from_secs(30),
        };
        assert_eq!(format!("{}", err), "Node hpchead not ready after 30s");
    }

    #[test]
    fn test_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: BenchError = io_err.into();
        assert!(matches!(err, BenchError::Io(_)));

        let json_err = serde_json::from_str::<String>("invalid json").unwrap_err();
        let err: BenchError = json_err.into();
        assert!(matches!(err, BenchError::Serialization(_)));
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            BenchError::InvalidRequest("size".to_string()).code(),
            "INVALID_REQUEST"
        );
        assert_eq!(BenchError::ResultNotFound("x.json".to_string()).code(), "NOT_FOUND");
        assert_eq!(
            BenchError::RuntimeUnavailable("ping".to_string()).code(),
            "RUNTIME_UNAVAILABLE"
        );
    }
}
