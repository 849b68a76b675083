//! Access token renewal through the Konnect refresh endpoint.
//!
//! The endpoint speaks cookies, not JSON: the refresh token goes out as the
//! `konnectrefreshtoken` cookie on an empty POST, and the new pair comes back
//! as `Set-Cookie` headers.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::cookie::{Cookie, Jar};
use reqwest::{Client, StatusCode};
use url::Url;

use crate::auth::error::{AuthError, AuthResult};
use crate::auth::expiry::jwt_expires_in;
use crate::auth::tokens::{AccessToken, TokenSet};

/// Cookie carrying the refresh token, in both directions.
pub const REFRESH_COOKIE: &str = "konnectrefreshtoken";
/// Cookie carrying the new access token in the response.
pub const ACCESS_COOKIE: &str = "konnectaccesstoken";

/// Lifetime assumed when the access cookie carries no expiry.
const DEFAULT_EXPIRES_AFTER_SECS: i64 = 3600;

/// Exchanges a refresh token for a new [`AccessToken`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    /// Refreshes the session.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::RefreshFailed`] for any non-200 answer and
    /// [`AuthError::Transport`] on network failure.
    async fn refresh(&self, refresh_url: &Url, refresh_token: &str) -> AuthResult<AccessToken>;
}

/// Cookie-based refresh client.
///
/// Each call uses a fresh cookie jar so nothing leaks between profiles.
#[derive(Debug, Clone)]
pub struct RefreshClient {
    timeout: Duration,
}

impl RefreshClient {
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn build_client(&self, refresh_url: &Url, refresh_token: &str) -> AuthResult<Client> {
        let jar = Jar::default();
        jar.add_cookie_str(&format!("{REFRESH_COOKIE}={refresh_token}; Path=/"), refresh_url);

        Client::builder()
            .user_agent(format!("kongctl/{}", env!("CARGO_PKG_VERSION")))
            .timeout(self.timeout)
            .cookie_provider(Arc::new(jar))
            .build()
            .map_err(|e| AuthError::transport(refresh_url, e))
    }
}

#[async_trait]
impl TokenRefresher for RefreshClient {
    async fn refresh(&self, refresh_url: &Url, refresh_token: &str) -> AuthResult<AccessToken> {
        tracing::info!(refresh_url = %refresh_url, "refreshing access token");

        let client = self.build_client(refresh_url, refresh_token)?;
        let response = client
            .post(refresh_url.clone())
            .header(http::header::CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(|e| AuthError::transport(refresh_url, e))?;

        let status = response.status();
        if status != StatusCode::OK {
            tracing::warn!(status = status.as_u16(), "token refresh rejected");
            return Err(AuthError::RefreshFailed {
                status: status.as_u16(),
            });
        }

        let now = Utc::now();
        let token = token_from_cookies(response.cookies(), refresh_url.path(), now);

        if token.auth_token.is_empty() {
            tracing::warn!("refresh response carried no {ACCESS_COOKIE} cookie");
        } else {
            match jwt_expires_in(&token.auth_token) {
                Ok(secs) => tracing::info!(expires_after = secs, "token refreshed, expiry derived from JWT exp claim"),
                Err(err) => tracing::info!(
                    expires_after = token.expires_after,
                    error = %err,
                    "token refreshed, using cookie expiry"
                ),
            }
        }

        Ok(AccessToken {
            token,
            received_at: now,
        })
    }
}

fn token_from_cookies<'a>(
    cookies: impl Iterator<Item = Cookie<'a>>,
    refresh_path: &str,
    now: DateTime<Utc>,
) -> TokenSet {
    let mut token = TokenSet {
        auth_token: String::new(),
        refresh_token: String::new(),
        token_type: "Bearer".to_string(),
        expires_after: DEFAULT_EXPIRES_AFTER_SECS,
        scope: String::new(),
    };

    for cookie in cookies {
        if cookie.value().is_empty() {
            continue;
        }
        match cookie.name() {
            REFRESH_COOKIE if cookie.path().map_or(true, |p| p == refresh_path) => {
                token.refresh_token = cookie.value().to_string();
            },
            ACCESS_COOKIE => {
                token.auth_token = cookie.value().to_string();
                if let Some(secs) = cookie_lifetime(cookie.max_age(), cookie.expires(), now) {
                    token.expires_after = secs;
                }
            },
            _ => {},
        }
    }

    token
}

/// Seconds until a cookie expires, preferring `Max-Age` over `Expires`.
fn cookie_lifetime(
    max_age: Option<Duration>,
    expires: Option<SystemTime>,
    now: DateTime<Utc>,
) -> Option<i64> {
    if let Some(max_age) = max_age {
        return Some(i64::try_from(max_age.as_secs()).unwrap_or(i64::MAX));
    }
    expires.map(|at| (DateTime::<Utc>::from(at) - now).num_seconds().max(0))
}
