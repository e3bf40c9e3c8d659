//! Error types for Chatkeep
//!
//! This module defines all error types used throughout the crate,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for Chatkeep operations
///
/// Covers configuration loading, the key-value substrate, the remote
/// chat API, and the serialization layers between them.
#[derive(Error, Debug)]
pub enum ChatkeepError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Key-value substrate or conversation store errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// The chat backend answered with a non-success status
    #[error("Server error {status}: {body}")]
    Api {
        /// HTTP status code returned by the backend
        status: u16,
        /// Response body, as text
        body: String,
    },

    /// Chat client errors that are not HTTP status failures
    #[error("Client error: {0}")]
    Client(String),

    /// Backend URL could not be parsed or uses an unsupported scheme
    #[error("Invalid backend URL: {0}")]
    InvalidUrl(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for Chatkeep operations
///
/// Uses `anyhow::Error` so callers can attach context; the concrete
/// `ChatkeepError` is recoverable with `downcast_ref`.
pub type Result<T> = anyhow::Result<T>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let error = ChatkeepError::Config("invalid format".to_string());
        assert_eq!(error.to_string(), "Configuration error: invalid format");
    }

    #[test]
    fn test_storage_error_display() {
        let error = ChatkeepError::Storage("database connection failed".to_string());
        assert_eq!(
            error.to_string(),
            "Storage error: database connection failed"
        );
    }

    #[test]
    fn test_api_error_display_matches_client_format() {
        let error = ChatkeepError::Api {
            status: 502,
            body: "bad gateway".to_string(),
        };
        assert_eq!(error.to_string(), "Server error 502: bad gateway");
    }

    #[test]
    fn test_invalid_url_error_display() {
        let error = ChatkeepError::InvalidUrl("ftp://example.com".to_string());
        assert_eq!(error.to_string(), "Invalid backend URL: ftp://example.com");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error: ChatkeepError = io_error.into();
        assert!(matches!(error, ChatkeepError::Io(_)));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_error = serde_json::from_str::<serde_json::Value>("{invalid json}").unwrap_err();
        let error: ChatkeepError = json_error.into();
        assert!(matches!(error, ChatkeepError::Serialization(_)));
    }

    #[test]
    fn test_yaml_error_conversion() {
        let yaml_error = serde_yaml::from_str::<serde_yaml::Value>("invalid: : yaml").unwrap_err();
        let error: ChatkeepError = yaml_error.into();
        assert!(matches!(error, ChatkeepError::Yaml(_)));
    }

    #[test]
    fn test_error_downcasts_through_anyhow() {
        let result: Result<()> = Err(ChatkeepError::Storage("boom".to_string()).into());
        let err = result.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ChatkeepError>(),
            Some(ChatkeepError::Storage(_))
        ));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ChatkeepError>();
    }
}
