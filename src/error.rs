//! Error types for the sentiment rebalancer

use thiserror::Error;

/// Result type alias for rebalancer operations
pub type Result<T> = std::result::Result<T, AgentError>;

#[derive(Error, Debug)]
pub enum AgentError {

    // =============================
    // Pipeline Errors
    // =============================

    /// The completion service errored, timed out or answered with an unexpected shape.
    #[error("Upstream completion error: {0}")]
    UpstreamFailure(String),

    /// No candidate in the completion text produced a valid verdict.
    #[error("Extraction error: {0}")]
    ExtractionFailure(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid allocation: {0}")]
    InvalidAllocation(String),

    /// Internal consistency fault. Never routed to the fallback path.
    #[error("Invariant violated: {0}")]
    InvariantViolation(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("UUID parse error: {0}")]
    UuidError(#[from] uuid::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl AgentError {
    /// Whether the pipeline recovers from this error by running the keyword fallback.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AgentError::UpstreamFailure(_)
                | AgentError::ExtractionFailure(_)
                | AgentError::HttpError(_)
                | AgentError::SerializationError(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_kinds() {
        assert!(AgentError::UpstreamFailure("timeout".into()).is_recoverable());
        assert!(AgentError::ExtractionFailure("no json".into()).is_recoverable());
        assert!(!AgentError::InvariantViolation("sum".into()).is_recoverable());
        assert!(!AgentError::ConfigError("port".into()).is_recoverable());
    }
}
