//! Error types and result aliases for kongctl.
//!
//! Authentication failures keep their own [`AuthError`] type and are wrapped
//! transparently, so their messages reach the user unchanged. Everything else
//! (configuration, API calls, local IO) lives in [`KongctlError`].

use thiserror::Error;

use crate::auth::AuthError;

/// Main error type for kongctl operations.
///
/// Use [`requires_reauth`](Self::requires_reauth) and [`is_retriable`](Self::is_retriable)
/// to determine appropriate error handling strategies.
#[derive(Error, Debug)]
pub enum KongctlError {
    /// Authentication subsystem error.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// API returned a non-success status code.
    #[error("API request failed ({status}): {message}")]
    ApiError {
        /// HTTP status code.
        status: u16,
        /// Error message from the API.
        message: String,
    },

    /// API returned 401 Unauthorized.
    #[error("Konnect returned unauthorized (401). Your session may have expired. Run 'kongctl login' to re-authenticate.")]
    Unauthorized,

    /// API server is unreachable (503 or connection failed).
    #[error("Konnect API is unavailable. Check your network connection or try again later.")]
    ApiUnavailable,

    /// Request timed out.
    #[error("Request timed out. The server may be slow or unreachable. Try again later.")]
    Timeout,

    /// Network error during HTTP request.
    #[error("Network error: {0}. Check your internet connection.")]
    Network(String),

    /// General configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Failed to read configuration file.
    #[error("Failed to read configuration file: {0}. Check file permissions and format.")]
    ConfigRead(String),

    /// IO operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed.
    #[error("Data serialization error: {0}. This may indicate corrupted data.")]
    Serialization(String),

    /// URL parsing failed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl KongctlError {
    /// Checks if this error can be resolved by running `kongctl login`.
    #[must_use]
    pub const fn requires_reauth(&self) -> bool {
        match self {
            Self::Auth(err) => err.requires_login(),
            Self::Unauthorized => true,
            _ => false,
        }
    }

    /// Checks if this error is transient and the operation might succeed on retry.
    #[must_use]
    pub const fn is_retriable(&self) -> bool {
        matches!(
            self,
            Self::Network(_)
                | Self::Timeout
                | Self::ApiUnavailable
                | Self::Auth(AuthError::Transport { .. })
        )
    }

    /// Follow-up advice printed under the error, if the message lacks it.
    #[must_use]
    pub fn hint(&self) -> Option<&'static str> {
        let message = self.to_string().to_lowercase();
        if self.requires_reauth() && !message.contains("kongctl login") {
            return Some("Run 'kongctl login' to re-authenticate.");
        }
        if self.is_retriable() && !message.contains("try again") {
            return Some("This may be a temporary problem. Try again shortly.");
        }
        None
    }
}

/// Result type alias using [`KongctlError`].
pub type Result<T> = std::result::Result<T, KongctlError>;

impl From<serde_json::Error> for KongctlError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(format!("JSON error: {err}"))
    }
}

impl From<toml::de::Error> for KongctlError {
    fn from(err: toml::de::Error) -> Self {
        Self::ConfigRead(format!("TOML parse error: {err}"))
    }
}

impl From<reqwest::Error> for KongctlError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::ApiUnavailable
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<reqwest_middleware::Error> for KongctlError {
    fn from(err: reqwest_middleware::Error) -> Self {
        match err {
            reqwest_middleware::Error::Reqwest(err) => err.into(),
            reqwest_middleware::Error::Middleware(err) => Self::Network(format!("{err:#}")),
        }
    }
}
