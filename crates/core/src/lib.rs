//! Shared primitives for all Rust crates of the SPPG console.

#![forbid(unsafe_code)]

/// Authentication primitives shared across crates.
pub mod auth;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use auth::BearerToken;

/// Result type used across SPPG crates.
pub type AppResult<T> = Result<T, AppError>;

/// A validated non-empty UTF-8 string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NonEmptyString(String);

impl NonEmptyString {
    /// Creates a validated non-empty string.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(AppError::Validation(
                "value must not be empty or whitespace".to_owned(),
            ));
        }

        Ok(Self(value))
    }

    /// Returns the underlying string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<NonEmptyString> for String {
    fn from(value: NonEmptyString) -> Self {
        value.0
    }
}

impl std::fmt::Display for NonEmptyString {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

/// Common application error categories.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppError {
    /// Malformed or unknown local request parameters. Never reaches the network.
    #[error("validation error: {0}")]
    Validation(String),

    /// Missing or rejected credential, detected locally or via 401/403.
    #[error("unauthorized: {}", auth_detail(*status, message.as_deref()))]
    Unauthorized {
        /// HTTP status, absent when no credential was available locally.
        status: Option<u16>,
        /// Server-supplied message, surfaced verbatim.
        message: Option<String>,
    },

    /// Transport failure or undecodable response.
    #[error("network error: {0}")]
    Network(String),

    /// Transport gave up after the configured timeout.
    #[error("timeout: {0}")]
    Timeout(String),

    /// Non-2xx status or `success: false` envelope.
    #[error("server error (status {status:?}): {}", message.as_deref().unwrap_or("no message"))]
    Server {
        /// HTTP status when the failure came from a response.
        status: Option<u16>,
        /// Server-supplied message, surfaced verbatim.
        message: Option<String>,
    },

    /// Malformed schema registration or startup configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

const GENERIC_SERVER_MESSAGE: &str = "The server could not complete the request.";
const GENERIC_NETWORK_MESSAGE: &str = "Unable to reach the server. Check your connection.";
const GENERIC_TIMEOUT_MESSAGE: &str = "The server took too long to respond.";
const GENERIC_AUTH_MESSAGE: &str = "Your session has expired. Please sign in again.";

impl AppError {
    /// Returns the single human-readable message shown at the UI boundary.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(message) | Self::Config(message) => message.clone(),
            Self::Unauthorized { message, .. } => {
                server_message(message.as_deref(), GENERIC_AUTH_MESSAGE)
            }
            Self::Network(_) => GENERIC_NETWORK_MESSAGE.to_owned(),
            Self::Timeout(_) => GENERIC_TIMEOUT_MESSAGE.to_owned(),
            Self::Server { message, .. } => {
                server_message(message.as_deref(), GENERIC_SERVER_MESSAGE)
            }
        }
    }

    /// Builds the error raised when no credential is available locally.
    #[must_use]
    pub fn missing_token() -> Self {
        Self::Unauthorized {
            status: None,
            message: None,
        }
    }

    /// Returns whether the failure requires re-authentication.
    #[must_use]
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }

    /// Returns whether the failure is a transport failure, timeouts included.
    #[must_use]
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Timeout(_))
    }
}

fn server_message(message: Option<&str>, fallback: &str) -> String {
    message
        .map(str::trim)
        .filter(|message| !message.is_empty())
        .unwrap_or(fallback)
        .to_owned()
}

fn auth_detail(status: Option<u16>, message: Option<&str>) -> String {
    match (status, message) {
        (_, Some(message)) => message.to_owned(),
        (Some(status), None) => format!("credential rejected ({status})"),
        (None, None) => "no access token available".to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::{AppError, NonEmptyString};

    #[test]
    fn non_empty_string_rejects_whitespace() {
        let result = NonEmptyString::new("   ");
        assert!(result.is_err());
    }

    #[test]
    fn server_message_is_surfaced_verbatim() {
        let error = AppError::Server {
            status: Some(409),
            message: Some("SPPG masih memiliki sekolah aktif".to_owned()),
        };
        assert_eq!(error.user_message(), "SPPG masih memiliki sekolah aktif");
    }

    #[test]
    fn server_without_message_uses_generic_fallback() {
        let error = AppError::Server {
            status: Some(500),
            message: Some("  ".to_owned()),
        };
        assert_eq!(
            error.user_message(),
            "The server could not complete the request."
        );
    }

    #[test]
    fn transport_details_never_reach_the_user() {
        let error = AppError::Network("error sending request: connection refused".to_owned());
        assert!(!error.user_message().contains("connection refused"));
        assert!(error.is_network());
        assert!(AppError::Timeout("15s".to_owned()).is_network());
        assert!(AppError::missing_token().is_auth());
    }

    #[test]
    fn auth_failures_surface_the_server_message_when_present() {
        let rejected = AppError::Unauthorized {
            status: Some(403),
            message: Some("Akses ditolak".to_owned()),
        };
        assert_eq!(rejected.user_message(), "Akses ditolak");

        let silent = AppError::Unauthorized {
            status: Some(401),
            message: None,
        };
        assert_eq!(
            silent.user_message(),
            "Your session has expired. Please sign in again."
        );
        assert_eq!(
            AppError::missing_token().to_string(),
            "unauthorized: no access token available"
        );
    }
}
