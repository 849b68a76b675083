//! Authentication error types.
//!
//! [`AuthError`] covers every outcome of the device flow, token refresh and
//! credential storage. Expected conditions (`AuthorizationPending`,
//! `NotFound`) are variants too, so callers match on them instead of
//! inspecting messages.

use std::path::PathBuf;

use thiserror::Error;

use crate::config::pat_env_var;

/// Errors raised by the authentication subsystem.
#[derive(Error, Debug)]
pub enum AuthError {
    /// Network, DNS or TLS failure. Never retried automatically.
    #[error("Network error contacting {endpoint}: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a shape we do not understand.
    #[error("Unexpected response from {endpoint}: {message}")]
    Protocol { endpoint: String, message: String },

    /// The user has not approved the device code yet. Drives the poll loop.
    #[error("Authorization pending")]
    AuthorizationPending,

    /// The user rejected the authorization request.
    #[error("Authorization was denied. Run 'kongctl login' to try again.")]
    AuthorizationDenied,

    /// The device code expired before the user approved it.
    #[error("Device authorization expired. Run 'kongctl login' again and complete authorization within the time limit.")]
    AuthorizationExpired,

    /// Any other device-flow error code. Fatal.
    #[error("Device authorization failed ({code}){}", .description.as_deref().map(|d| format!(": {d}")).unwrap_or_default())]
    DeviceFlowRejected {
        code: String,
        description: Option<String>,
    },

    /// The refresh endpoint answered with something other than 200.
    #[error("Token refresh failed with HTTP status {status}")]
    RefreshFailed { status: u16 },

    /// The stored credential has no refresh token to exchange.
    #[error("Stored credential has no refresh token")]
    MissingRefreshToken,

    /// The refresh endpoint answered 200 without an access token cookie.
    #[error("Token refresh response did not include an access token cookie")]
    MissingAccessCookie,

    /// No credential stored for the profile. Expected on first run.
    #[error("No stored credential for profile '{profile}'")]
    NotFound { profile: String },

    /// The credential file exists but cannot be decoded.
    #[error("Stored credential at {} is corrupted ({reason}). Run 'kongctl logout' then 'kongctl login'.", .path.display())]
    CorruptCredential { path: PathBuf, reason: String },

    /// The profile name cannot be used to build a credential file name.
    #[error("Invalid profile name '{profile}': {reason}")]
    InvalidProfile { profile: String, reason: String },

    /// Reading or writing the credential file failed.
    #[error("Failed to access credential file {}: {source}", .path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No usable token: the user must log in or supply a static token.
    #[error(
        "Authentication token not available for profile '{profile}'. Use one of the following:\n  \
         - 'kongctl login' to authenticate via the web\n  \
         - provide a token via the --pat flag\n  \
         - set the {} environment variable",
        pat_env_var(.profile)
    )]
    AuthRequired {
        profile: String,
        #[source]
        source: Option<Box<AuthError>>,
    },

    /// The user interrupted the login.
    #[error("Login cancelled")]
    Cancelled,
}

impl AuthError {
    pub(crate) fn transport(endpoint: &url::Url, source: reqwest::Error) -> Self {
        Self::Transport {
            endpoint: endpoint.to_string(),
            source,
        }
    }

    pub(crate) fn protocol(endpoint: &url::Url, message: impl Into<String>) -> Self {
        Self::Protocol {
            endpoint: endpoint.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn auth_required(profile: &str, source: Option<Self>) -> Self {
        Self::AuthRequired {
            profile: profile.to_string(),
            source: source.map(Box::new),
        }
    }

    /// Checks if this error ends the device flow or session for good.
    ///
    /// Only `AuthorizationPending` is non-terminal.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::AuthorizationPending)
    }

    /// Checks if the user must run `kongctl login` to recover.
    #[must_use]
    pub const fn requires_login(&self) -> bool {
        matches!(
            self,
            Self::AuthRequired { .. }
                | Self::NotFound { .. }
                | Self::CorruptCredential { .. }
                | Self::AuthorizationDenied
                | Self::AuthorizationExpired
                | Self::RefreshFailed { .. }
        )
    }
}

/// Result type alias using [`AuthError`].
pub type AuthResult<T> = std::result::Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_required_names_all_login_options() {
        let err = AuthError::auth_required("dev-eu", None);
        let msg = err.to_string();

        assert!(msg.contains("kongctl login"));
        assert!(msg.contains("--pat"));
        assert!(msg.contains("KONGCTL_DEV_EU_KONNECT_PAT"));
    }

    #[test]
    fn auth_required_keeps_refresh_cause() {
        use std::error::Error as _;

        let err = AuthError::auth_required("default", Some(AuthError::RefreshFailed { status: 500 }));
        let source = err.source().expect("source");
        assert!(source.to_string().contains("500"));
    }

    #[test]
    fn device_flow_rejection_includes_description() {
        let err = AuthError::DeviceFlowRejected {
            code: "slow_down".to_string(),
            description: Some("polling too fast".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "Device authorization failed (slow_down): polling too fast"
        );

        let bare = AuthError::DeviceFlowRejected {
            code: "invalid_client".to_string(),
            description: None,
        };
        assert_eq!(bare.to_string(), "Device authorization failed (invalid_client)");
    }

    #[test]
    fn only_pending_is_non_terminal() {
        assert!(!AuthError::AuthorizationPending.is_terminal());
        assert!(AuthError::AuthorizationDenied.is_terminal());
        assert!(AuthError::AuthorizationExpired.is_terminal());
        assert!(AuthError::Cancelled.is_terminal());
    }

    #[test]
    fn requires_login_identifies_session_failures() {
        assert!(AuthError::RefreshFailed { status: 401 }.requires_login());
        assert!(AuthError::auth_required("default", None).requires_login());
        assert!(!AuthError::Cancelled.requires_login());
        assert!(!AuthError::AuthorizationPending.requires_login());
    }
}
