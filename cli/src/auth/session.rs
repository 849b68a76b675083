//! Session management: the single entry point commands use for tokens.
//!
//! [`SessionManager::resolve`] turns a profile into a bearer token, loading
//! the stored credential and refreshing it when expired.
//! [`SessionManager::login`] runs the device flow and persists the result.
//!
//! The credential file is not locked. Two invocations refreshing the same
//! profile at once race, and the last writer wins.

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::auth::credentials::CredentialStore;
use crate::auth::device_flow::DeviceGrantClient;
use crate::auth::error::{AuthError, AuthResult};
use crate::auth::expiry::resolve_expiry;
use crate::auth::refresh::{RefreshClient, TokenRefresher};
use crate::auth::tokens::{AccessToken, DeviceCodeResponse};

/// Endpoints and client identity for one Konnect environment.
#[derive(Debug, Clone)]
pub struct AuthEndpoints {
    pub device_authorization: Url,
    pub token: Url,
    pub refresh: Url,
    pub client_id: String,
}

/// Everything a [`SessionManager`] needs besides its collaborators.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub endpoints: AuthEndpoints,
    /// A personal access token that overrides any stored session.
    pub static_token: Option<String>,
}

/// Resolves, refreshes and discards per-profile sessions.
pub struct SessionManager<R = RefreshClient> {
    config: SessionConfig,
    store: CredentialStore,
    refresher: R,
}

impl<R: TokenRefresher> SessionManager<R> {
    pub const fn new(config: SessionConfig, store: CredentialStore, refresher: R) -> Self {
        Self {
            config,
            store,
            refresher,
        }
    }

    #[must_use]
    pub const fn store(&self) -> &CredentialStore {
        &self.store
    }

    /// The static token, if one is configured and non-empty.
    #[must_use]
    pub fn static_token(&self) -> Option<&str> {
        self.config.static_token.as_deref().filter(|t| !t.is_empty())
    }

    /// Returns a valid bearer token for `profile`.
    ///
    /// A configured static token wins without touching disk or network.
    /// Otherwise the stored credential is returned if still valid, or
    /// refreshed and saved if expired. A failed refresh leaves the stored
    /// credential untouched.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::AuthRequired`] when there is no usable session,
    /// and [`AuthError::CorruptCredential`] when the stored file is damaged.
    pub async fn resolve(&self, profile: &str) -> AuthResult<String> {
        if let Some(token) = self.static_token() {
            tracing::debug!(profile, "using static access token");
            return Ok(token.to_string());
        }

        let stored = match self.store.load(profile) {
            Ok(token) => token,
            Err(err @ AuthError::NotFound { .. }) => {
                tracing::debug!(profile, "no stored credential");
                return Err(AuthError::auth_required(profile, Some(err)));
            },
            Err(err @ AuthError::CorruptCredential { .. }) => {
                tracing::warn!(profile, error = %err, "stored credential is corrupted");
                return Err(err);
            },
            Err(err) => return Err(err),
        };

        let remaining = resolve_expiry(&stored);
        if stored.is_usable() && remaining > 0 {
            tracing::info!(
                profile,
                expires_after = remaining,
                received_at = %stored.received_at,
                "token loaded from disk"
            );
            return Ok(stored.token.auth_token);
        }

        let refreshed = self
            .refresh(&stored)
            .await
            .map_err(|err| AuthError::auth_required(profile, Some(err)))?;

        self.store.save(profile, &refreshed)?;
        tracing::info!(
            profile,
            received_at = %refreshed.received_at,
            expires_after = resolve_expiry(&refreshed),
            "token refreshed and saved"
        );
        Ok(refreshed.token.auth_token)
    }

    async fn refresh(&self, stored: &AccessToken) -> AuthResult<AccessToken> {
        if stored.refresh_token().is_empty() {
            return Err(AuthError::MissingRefreshToken);
        }

        let refresh_url = &self.config.endpoints.refresh;
        tracing::info!(
            refresh_url = %refresh_url,
            declared_lifetime_elapsed = stored.is_expired(),
            "token expired, refreshing"
        );
        let refreshed = self
            .refresher
            .refresh(refresh_url, stored.refresh_token())
            .await?;

        if !refreshed.is_usable() {
            return Err(AuthError::MissingAccessCookie);
        }
        Ok(refreshed)
    }

    /// Removes the stored credential for `profile`.
    ///
    /// Returns `false` if there was nothing to remove.
    pub fn logout(&self, profile: &str) -> AuthResult<bool> {
        let removed = self.store.delete(profile)?;
        tracing::info!(profile, removed, "logout");
        Ok(removed)
    }

    /// Runs the device authorization flow and stores the resulting token.
    ///
    /// `on_code` is called once with the device code so the caller can show
    /// the user code and verification URL. Polling honours the server's
    /// interval, stops at the device code's expiry, and stops immediately
    /// when `cancel` fires.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::AuthorizationDenied`],
    /// [`AuthError::AuthorizationExpired`], [`AuthError::Cancelled`] or any
    /// transport/protocol failure. Nothing is stored on failure.
    pub async fn login<F>(
        &self,
        profile: &str,
        client: &DeviceGrantClient,
        cancel: &CancellationToken,
        on_code: F,
    ) -> AuthResult<AccessToken>
    where
        F: FnOnce(&DeviceCodeResponse),
    {
        let endpoints = &self.config.endpoints;

        let device_code = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(AuthError::Cancelled),
            resp = client.request_device_code(&endpoints.device_authorization, &endpoints.client_id) => resp?,
        };

        on_code(&device_code);

        let token = poll_until_authorized(client, endpoints, &device_code, cancel).await?;
        self.store.save(profile, &token)?;
        tracing::info!(profile, "user successfully authorized");
        Ok(token)
    }
}

/// Polls the token endpoint until a terminal outcome.
///
/// Waits `interval` before every attempt and never runs past the device
/// code's own lifetime.
async fn poll_until_authorized(
    client: &DeviceGrantClient,
    endpoints: &AuthEndpoints,
    device_code: &DeviceCodeResponse,
    cancel: &CancellationToken,
) -> AuthResult<AccessToken> {
    let deadline = Instant::now() + device_code.lifetime();
    let interval = device_code.poll_interval();
    let mut attempts: u32 = 0;

    loop {
        let wake = (Instant::now() + interval).min(deadline);
        tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(AuthError::Cancelled),
            () = tokio::time::sleep_until(wake) => {},
        }

        if Instant::now() >= deadline {
            tracing::warn!(attempts, "device code expired before authorization");
            return Err(AuthError::AuthorizationExpired);
        }

        attempts += 1;
        let poll = client.poll_for_token(&endpoints.token, &endpoints.client_id, &device_code.device_code);
        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(AuthError::Cancelled),
            outcome = tokio::time::timeout_at(deadline, poll) => outcome,
        };

        match outcome {
            Err(_elapsed) => return Err(AuthError::AuthorizationExpired),
            Ok(Err(err)) if !err.is_terminal() => {
                tracing::debug!(attempts, "authorization pending");
            },
            Ok(result) => return result,
        }
    }
}
