//! Error types for pipeline operations

use thiserror::Error;

/// Pipeline specific errors
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Upstream request failed or returned a non-success status
    #[error("Network error: {0}")]
    Network(String),

    /// Upstream quota exhausted and no reset time was advertised
    #[error("Rate limit exceeded for {provider}")]
    RateLimitExceeded {
        provider: String,
    },

    /// Malformed or missing fields in upstream or stored data
    #[error("Parse error: {0}")]
    Parse(String),

    /// Required columns absent or invalid identifiers
    #[error("Validation error: {0}")]
    Validation(String),

    /// Directory or file IO failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Unknown category or unsupported derivation
    #[error("Query error: {0}")]
    Query(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON encoding or decoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV encoding or decoding error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Filesystem error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// Whether the error reflects a misconfiguration rather than a transient fault
    pub fn is_configuration_defect(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::Config(_) | Self::Query(_))
    }
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PipelineError::Validation("Missing required columns: val".to_string());
        assert_eq!(err.to_string(), "Validation error: Missing required columns: val");

        let err = PipelineError::RateLimitExceeded {
            provider: "SEC EDGAR".to_string(),
        };
        assert_eq!(err.to_string(), "Rate limit exceeded for SEC EDGAR");
    }

    #[test]
    fn test_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: PipelineError = io.into();
        assert!(matches!(err, PipelineError::Io(_)));
        assert!(!err.is_configuration_defect());

        assert!(PipelineError::Query("x".into()).is_configuration_defect());
    }
}
