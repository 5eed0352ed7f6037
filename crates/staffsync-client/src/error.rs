//! Error types for the client library.
//!
//! [`ClientError`] describes failures below the gateway boundary: building a
//! transport, sending bytes, logging in. The gateway itself never returns it;
//! it folds every failure into a [`FailureKind`].

use std::fmt;

use thiserror::Error;

/// Errors that can occur while talking to the HR backend.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ClientError {
    /// Network or HTTP request failure.
    ///
    /// Indicates issues like DNS resolution, connection failures, or socket errors.
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// Middleware layer error.
    ///
    /// Errors raised by middleware the caller installed on the transport.
    #[error("Middleware error: {0}")]
    MiddlewareError(#[from] reqwest_middleware::Error),

    /// The request URL could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// A caller-supplied header name or value is not valid HTTP.
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// JSON serialization or deserialization error.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Client configuration issue.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// The backend rejected the supplied credentials.
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// The backend answered with an unexpected status.
    #[error("Request failed with status {status}: {message}")]
    RequestError {
        /// HTTP status code.
        status: u16,
        /// Error text returned by the backend.
        message: String,
    },

    /// The credential store refused to persist a session.
    #[error("Credential store error: {0}")]
    CredentialStoreError(String),

    /// A local file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// Check if this error happened before any response was received.
    pub const fn is_transport_error(&self) -> bool {
        matches!(
            self,
            Self::NetworkError(_) | Self::MiddlewareError(_) | Self::InvalidUrl(_)
        )
    }

    /// Check if this is an authentication error.
    pub const fn is_authentication_error(&self) -> bool {
        matches!(self, Self::AuthenticationError(_))
    }
}

/// The four ways a gateway call can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// No response: connection, DNS or URL failure. Token and role are cleared.
    Transport,
    /// Any failing status other than 500. The token is cleared.
    AuthOrClient {
        /// HTTP status code.
        status: u16,
    },
    /// Status 500. Nothing is cleared so the caller can retry.
    Server,
    /// Success status with an unusable body under strict decoding.
    Malformed,
}

impl FailureKind {
    /// Whether this failure removed the bearer token from storage.
    pub const fn clears_token(self) -> bool {
        matches!(self, Self::Transport | Self::AuthOrClient { .. })
    }

    /// Whether this failure also removed the stored role.
    pub const fn clears_role(self) -> bool {
        matches!(self, Self::Transport)
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport => write!(f, "transport failure"),
            Self::AuthOrClient { status } => write!(f, "rejected with status {status}"),
            Self::Server => write!(f, "server failure"),
            Self::Malformed => write!(f, "malformed response"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_kind_clearing_rules() {
        assert!(FailureKind::Transport.clears_token());
        assert!(FailureKind::Transport.clears_role());

        let rejected = FailureKind::AuthOrClient { status: 401 };
        assert!(rejected.clears_token());
        assert!(!rejected.clears_role());

        assert!(!FailureKind::Server.clears_token());
        assert!(!FailureKind::Malformed.clears_token());
    }

    #[test]
    fn test_client_error_predicates() {
        assert!(ClientError::InvalidUrl("x".to_string()).is_transport_error());
        assert!(!ClientError::AuthenticationError("x".to_string()).is_transport_error());
        assert!(ClientError::AuthenticationError("bad".to_string()).is_authentication_error());
    }

    #[test]
    fn test_display() {
        assert_eq!(
            FailureKind::AuthOrClient { status: 403 }.to_string(),
            "rejected with status 403"
        );
        let err = ClientError::RequestError {
            status: 418,
            message: "teapot".to_string(),
        };
        assert_eq!(err.to_string(), "Request failed with status 418: teapot");
    }
}
