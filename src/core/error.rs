use thiserror::Error;

/// Errors produced while building, starting, or running the processor.
#[derive(Error, Debug)]
pub enum MetricsError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to find metrics exporter: '{name}'; please configure metrics_exporter from one of: {available:?}")]
    ExporterNotFound {
        name: String,
        available: Vec<String>,
    },

    #[error("the exporter '{0}' isn't a metrics exporter")]
    NotAMetricsExporter(String),

    #[error("processor not started: no metrics exporter has been resolved")]
    NotStarted,

    #[error("metric cache invariant violated: {0}")]
    CacheInvariant(String),

    #[error("invalid span data: {0}")]
    InvalidSpan(String),

    #[error("downstream consumer error: {0}")]
    Downstream(String),
}

/// Result type alias for processor operations
pub type Result<T> = std::result::Result<T, MetricsError>;

impl MetricsError {
    /// Creates a new configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a new cache invariant error
    pub fn cache_invariant<S: Into<String>>(msg: S) -> Self {
        Self::CacheInvariant(msg.into())
    }

    /// Creates a new invalid span data error
    pub fn invalid_span<S: Into<String>>(msg: S) -> Self {
        Self::InvalidSpan(msg.into())
    }

    /// Creates a new downstream consumer error
    pub fn downstream<S: Into<String>>(msg: S) -> Self {
        Self::Downstream(msg.into())
    }

    /// Returns true if retrying the batch could succeed
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Downstream(_))
    }

    /// Returns the error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::ExporterNotFound { .. } | Self::NotAMetricsExporter(_) => "exporter",
            Self::NotStarted => "lifecycle",
            Self::CacheInvariant(_) => "internal",
            Self::InvalidSpan(_) => "validation",
            Self::Downstream(_) => "downstream",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = MetricsError::config("bad cache size");
        assert_eq!(err.to_string(), "configuration error: bad cache size");
        assert_eq!(err.category(), "config");
    }

    #[test]
    fn test_exporter_not_found_message() {
        let err = MetricsError::ExporterNotFound {
            name: "prometheus".to_string(),
            available: vec!["otlp".to_string(), "logging".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("'prometheus'"));
        assert!(msg.contains("otlp"));
        assert!(msg.contains("logging"));
        assert_eq!(err.category(), "exporter");
    }

    #[test]
    fn test_invalid_span_error() {
        let err = MetricsError::invalid_span("end before start");
        assert_eq!(err.to_string(), "invalid span data: end before start");
        assert_eq!(err.category(), "validation");
    }

    #[test]
    fn test_error_recoverability() {
        assert!(MetricsError::downstream("sink unavailable").is_recoverable());
        assert!(!MetricsError::config("invalid config").is_recoverable());
        assert!(!MetricsError::invalid_span("bad span").is_recoverable());
        assert!(!MetricsError::NotStarted.is_recoverable());
    }
}
