//! Error types for the health aggregator

use std::fmt;

pub type Result<T> = std::result::Result<T, HealthError>;

#[derive(Debug)]
pub enum HealthError {
    /// IO operation failed
    Io(std::io::Error),

    /// HTTP request failed
    Http(reqwest::Error),

    /// JSON serialization/deserialization failed
    Json(serde_json::Error),

    /// Configuration error, raised while assembling probes
    Config(String),

    /// Failure reported by a dependency probe
    Probe(String),

    /// Generic error with message
    Other(String),
}

impl fmt::Display for HealthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthError::Io(err) => write!(f, "IO error: {}", err),
            HealthError::Http(err) => write!(f, "HTTP error: {}", err),
            HealthError::Json(err) => write!(f, "JSON error: {}", err),
            HealthError::Config(msg) => write!(f, "Configuration error: {}", msg),
            HealthError::Probe(msg) => write!(f, "Probe failed: {}", msg),
            HealthError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for HealthError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            HealthError::Io(err) => Some(err),
            HealthError::Http(err) => Some(err),
            HealthError::Json(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for HealthError {
    fn from(err: std::io::Error) -> Self {
        HealthError::Io(err)
    }
}

impl From<reqwest::Error> for HealthError {
    fn from(err: reqwest::Error) -> Self {
        HealthError::Http(err)
    }
}

impl From<serde_json::Error> for HealthError {
    fn from(err: serde_json::Error) -> Self {
        HealthError::Json(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = HealthError::Config("duplicate probe name: awsS3".to_string());
        assert_eq!(err.to_string(), "Configuration error: duplicate probe name: awsS3");

        let err = HealthError::Probe("connection refused".to_string());
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let err: HealthError = io.into();
        assert!(matches!(err, HealthError::Io(_)));
        assert!(std::error::Error::source(&err).is_some());
    }
}
