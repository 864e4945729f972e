//! Error types for pocket-core

use thiserror::Error;

/// Result type alias using pocket-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in pocket-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// The local store could not be opened or reached
    #[error("Could not connect to local cache: {0}")]
    Connection(String),

    /// A lookup found nothing (no user, empty save table)
    #[error("Not found: {0}")]
    NotFound(String),

    /// The remote API answered with a non-success status, or the request
    /// never completed (transport failure, timeout)
    #[error("{}", format_remote(.status, .message))]
    Remote {
        status: Option<u16>,
        message: String,
    },

    /// The remote response did not have the expected shape
    #[error("Could not decode remote response: {0}")]
    Decode(String),

    /// A store write failed and was rolled back
    #[error("Could not apply sync batch: {0}")]
    Transaction(String),

    /// libSQL error
    #[error("Database error: {0}")]
    Database(#[from] libsql::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Authentication flow failed
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Missing or malformed configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Build a remote error from a status code and response body.
    pub fn remote(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Remote {
            status,
            message: message.into(),
        }
    }

    /// Whether this error only signals absence and should select a code path
    /// instead of being shown to the user.
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<reqwest::Error> for Error {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            return Self::Decode(error.to_string());
        }
        Self::Remote {
            status: error.status().map(|status| status.as_u16()),
            message: error.to_string(),
        }
    }
}

#[allow(clippy::ref_option)]
fn format_remote(status: &Option<u16>, message: &str) -> String {
    let message = message.trim();
    match (*status, message.is_empty()) {
        (Some(code), true) => format!("Remote request failed: HTTP {code}"),
        (Some(code), false) => format!("Remote request failed: {message} (HTTP {code})"),
        (None, _) => format!("Remote request failed: {message}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_error_renders_status() {
        let error = Error::remote(Some(401), "");
        assert_eq!(error.to_string(), "Remote request failed: HTTP 401");

        let error = Error::remote(Some(503), " maintenance ");
        assert_eq!(
            error.to_string(),
            "Remote request failed: maintenance (HTTP 503)"
        );
    }

    #[test]
    fn remote_error_without_status_keeps_message() {
        let error = Error::remote(None, "operation timed out");
        assert_eq!(error.to_string(), "Remote request failed: operation timed out");
    }

    #[test]
    fn not_found_is_a_signal() {
        assert!(Error::NotFound("saves".into()).is_not_found());
        assert!(!Error::Decode("bad".into()).is_not_found());
    }
}
