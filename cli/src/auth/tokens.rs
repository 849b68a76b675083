//! Token types for authentication.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Polling interval used when the device authorization response omits one.
const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

/// Token set as returned by the Konnect token endpoint.
///
/// Field names on the wire follow the OAuth token response
/// (`access_token`, `expires_in`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSet {
    /// The bearer credential, opaque or a signed JWT.
    #[serde(rename = "access_token")]
    pub auth_token: String,
    /// Refresh token; empty when the flow does not support refresh.
    #[serde(default)]
    pub refresh_token: String,
    /// Token type (usually "Bearer").
    #[serde(default)]
    pub token_type: String,
    /// Lifetime declared by the server at issuance, in seconds.
    #[serde(rename = "expires_in", default)]
    pub expires_after: i64,
    /// Granted scope. Informational only.
    #[serde(default)]
    pub scope: String,
}

/// A token set together with the time it was received.
///
/// This is the unit persisted per profile. Values are never edited in
/// place: a refresh produces a new `AccessToken`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    pub token: TokenSet,
    /// Wall-clock time of issuance or refresh; the expiry baseline.
    pub received_at: DateTime<Utc>,
}

impl AccessToken {
    /// Wraps a freshly received token set, stamped with the current time.
    #[must_use]
    pub fn received_now(token: TokenSet) -> Self {
        Self {
            token,
            received_at: Utc::now(),
        }
    }

    /// The bearer credential.
    #[must_use]
    pub fn auth_token(&self) -> &str {
        &self.token.auth_token
    }

    /// The refresh token, possibly empty.
    #[must_use]
    pub fn refresh_token(&self) -> &str {
        &self.token.refresh_token
    }

    /// A token is usable only if it carries a non-empty access token.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        !self.token.auth_token.is_empty()
    }

    /// Check whether the declared lifetime has elapsed.
    ///
    /// This only consults `expires_after`; use
    /// [`resolve_expiry`](crate::auth::expiry::resolve_expiry) for the
    /// authoritative answer on self-describing tokens.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.declared_expires_at().map_or(true, |at| Utc::now() > at)
    }

    /// `received_at + expires_after`, or `None` when that is not a
    /// representable instant. Callers treat `None` as expired.
    #[must_use]
    pub fn declared_expires_at(&self) -> Option<DateTime<Utc>> {
        TimeDelta::try_seconds(self.token.expires_after)
            .and_then(|lifetime| self.received_at.checked_add_signed(lifetime))
    }
}

/// Response from the device authorization endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceCodeResponse {
    pub device_code: String,
    /// Code the user enters on the verification page.
    pub user_code: String,
    pub verification_uri: String,
    /// Verification URL with the user code already embedded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_uri_complete: Option<String>,
    /// Seconds the device code itself stays valid.
    pub expires_in: u64,
    /// Minimum seconds between token polls.
    #[serde(default = "default_interval")]
    pub interval: u64,
}

const fn default_interval() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

impl DeviceCodeResponse {
    /// The URL to show or open for the user, preferring the complete form.
    #[must_use]
    pub fn browser_url(&self) -> &str {
        self.verification_uri_complete
            .as_deref()
            .filter(|u| !u.is_empty())
            .unwrap_or(&self.verification_uri)
    }

    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.interval)
    }

    #[must_use]
    pub const fn lifetime(&self) -> Duration {
        Duration::from_secs(self.expires_in)
    }
}
