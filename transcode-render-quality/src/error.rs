//! Error types for render quality tracking.
//!
//! The event path of the tracker never fails. Errors only come out of the
//! surrounding plumbing: configuration validation and loading, and parsing of
//! recorded event traces.

use thiserror::Error;

/// Render quality error types.
#[derive(Error, Debug)]
pub enum RenderQualityError {
    /// Configuration values are inconsistent or out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A recorded trace line could not be understood.
    #[error("Invalid trace at line {line}: {message}")]
    InvalidTrace {
        /// One-based line number in the trace.
        line: usize,
        /// What was wrong with the line.
        message: String,
    },

    /// I/O error while reading configuration or traces.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for render quality operations.
pub type Result<T> = std::result::Result<T, RenderQualityError>;

impl RenderQualityError {
    /// Create an invalid configuration error.
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create an invalid trace error for the given one-based line.
    pub fn invalid_trace(line: usize, msg: impl Into<String>) -> Self {
        Self::InvalidTrace {
            line,
            message: msg.into(),
        }
    }

    /// Check if this error is recoverable.
    ///
    /// A bad trace line can be skipped; a bad configuration or a failing
    /// reader cannot.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::InvalidTrace { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RenderQualityError::invalid_config("judder tolerance is negative");
        assert_eq!(
            err.to_string(),
            "Invalid configuration: judder tolerance is negative"
        );
    }

    #[test]
    fn test_invalid_trace_display() {
        let err = RenderQualityError::invalid_trace(12, "unknown event");
        assert!(err.to_string().contains("line 12"));
        assert!(err.to_string().contains("unknown event"));
    }

    #[test]
    fn test_is_recoverable() {
        assert!(RenderQualityError::invalid_trace(1, "x").is_recoverable());
        assert!(!RenderQualityError::invalid_config("x").is_recoverable());

        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        assert!(!RenderQualityError::from(io).is_recoverable());
    }
}
