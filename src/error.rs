use thiserror::Error;

/// Type alias for Result with GfmError
pub type Result<T> = std::result::Result<T, GfmError>;

/// Error types for the filter manager
#[derive(Error, Debug)]
pub enum GfmError {
    /// Malformed XML or YAML input
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Well-formed input missing an expected namespace, element or key
    #[error("Schema error: {0}")]
    SchemaError(String),

    /// Label name or ID did not resolve to exactly one label
    #[error("Label lookup failed: {0}")]
    LookupError(String),

    /// Subcommand token not in the command set
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    AuthError(String),

    /// Gmail API returned an error
    #[error("Gmail API error: {0}")]
    ApiError(String),

    /// Network-related error (connection issues, timeouts, etc.)
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// IO error (file operations, etc.)
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl GfmError {
    /// IO error carrying the path it happened on
    pub fn io_at(path: &std::path::Path, error: std::io::Error) -> Self {
        GfmError::IoError(std::io::Error::new(
            error.kind(),
            format!("{}: {}", path.display(), error),
        ))
    }
}

impl From<google_gmail1::Error> for GfmError {
    fn from(error: google_gmail1::Error) -> Self {
        match error {
            google_gmail1::Error::Failure(ref response) => {
                let status = response.status();
                GfmError::ApiError(format!(
                    "HTTP {}: {}",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or("Unknown")
                ))
            }
            google_gmail1::Error::BadRequest(ref err) => {
                GfmError::ApiError(format!("Bad request: {}", err))
            }
            google_gmail1::Error::HttpError(ref err) => {
                GfmError::NetworkError(format!("Connection error: {}", err))
            }
            google_gmail1::Error::Io(err) => GfmError::NetworkError(err.to_string()),
            _ => GfmError::ApiError(error.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = GfmError::LookupError("no label with id 'Label_9'".to_string());
        let display = format!("{}", error);
        assert!(display.contains("Label lookup failed"));
        assert!(display.contains("Label_9"));

        let error = GfmError::UnknownCommand("frobnicate".to_string());
        assert_eq!(error.to_string(), "Unknown command: frobnicate");
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "mailFilters.xml");
        let error: GfmError = io.into();
        assert!(matches!(error, GfmError::IoError(_)));
        assert!(error.to_string().contains("mailFilters.xml"));
    }

    #[test]
    fn test_io_at_names_path() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "No such file");
        let error = GfmError::io_at(std::path::Path::new("filters.yaml"), io);
        match error {
            GfmError::IoError(inner) => {
                assert_eq!(inner.kind(), std::io::ErrorKind::NotFound);
                assert_eq!(inner.to_string(), "filters.yaml: No such file");
            }
            other => panic!("expected IoError, got {:?}", other),
        }
    }
}
