//! Error types for chatrelay-core

use thiserror::Error;

/// Result type alias using chatrelay-core Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when talking to the chat backend
#[derive(Error, Debug)]
pub enum Error {
    /// Startup cannot proceed (bad credential file or failed first refresh)
    #[error("Initialization failed: {0}")]
    Initialization(String),

    /// Session refresh was rejected or returned no usable token
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend answered with a non-success status
    #[error("API error: status {status}: {body}")]
    Api { status: u16, body: String },

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Response body does not have the expected event-stream shape
    #[error("Unexpected response format: {0}")]
    Format(String),

    /// A secret or setting cannot be carried in an HTTP header
    #[error("Invalid header value: {0}")]
    InvalidHeader(String),

    /// Credential file could not be read or written
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create an API error from a status code and response body
    pub fn api(status: u16, body: impl Into<String>) -> Self {
        Self::Api {
            status,
            body: body.into(),
        }
    }

    /// Whether this error came from the network layer rather than the payload
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Http(_) | Error::Api { .. })
    }

    /// Whether the response body could not be understood
    pub fn is_format(&self) -> bool {
        matches!(self, Error::Format(_) | Error::Json(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_is_transport() {
        let e = Error::api(502, "Bad Gateway");
        assert!(e.is_transport());
        assert!(!e.is_format());
        assert_eq!(e.to_string(), "API error: status 502: Bad Gateway");
    }

    #[test]
    fn test_format_errors() {
        assert!(Error::Format("too few blocks".into()).is_format());
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(Error::from(json_err).is_format());
    }

    #[test]
    fn test_invalid_header_is_neither() {
        let e = Error::InvalidHeader("control character in value".into());
        assert!(!e.is_transport());
        assert!(!e.is_format());
        assert_eq!(e.to_string(), "Invalid header value: control character in value");
    }

    #[test]
    fn test_initialization_is_neither() {
        let e = Error::Initialization("missing sessionToken".into());
        assert!(!e.is_transport());
        assert!(!e.is_format());
    }
}
