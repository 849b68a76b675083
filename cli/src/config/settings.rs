//! Application configuration settings.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::auth::{AuthEndpoints, SessionConfig};
use crate::error::{KongctlError, Result};

/// Profile used when none is selected.
pub const DEFAULT_PROFILE: &str = "default";

pub const GLOBAL_BASE_URL: &str = "https://global.api.konghq.com";
pub const DEFAULT_BASE_URL: &str = "https://us.api.konghq.com";

pub const DEFAULT_AUTH_PATH: &str = "/v3/internal/oauth/device/authorize";
pub const DEFAULT_TOKEN_PATH: &str = "/v3/internal/oauth/device/token";
pub const DEFAULT_REFRESH_PATH: &str = "/kauth/api/v1/refresh";
pub const DEFAULT_MACHINE_CLIENT_ID: &str = "344f59db-f401-4ce7-9407-00a0823fbacf";

/// Main configuration for kongctl: a set of named profiles.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KongctlConfig {
    pub profiles: BTreeMap<String, ProfileConfig>,
}

/// Settings for one profile.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileConfig {
    pub konnect: KonnectConfig,
}

/// Konnect connection and authentication settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KonnectConfig {
    /// Explicit API base URL. Wins over `region`.
    pub base_url: Option<String>,
    /// Region identifier such as `us`, `eu` or `global`.
    pub region: Option<String>,
    /// Host serving the device authorization endpoints.
    #[serde(with = "url_serde")]
    pub auth_base_url: Url,
    pub auth_path: String,
    pub token_path: String,
    pub refresh_path: String,
    pub machine_client_id: String,
    /// Personal access token. Overrides any stored login.
    pub pat: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Maximum number of retries for failed API requests.
    pub max_retries: u32,
}

impl Default for KonnectConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            region: None,
            auth_base_url: Url::parse(GLOBAL_BASE_URL).expect("valid default URL"),
            auth_path: DEFAULT_AUTH_PATH.to_string(),
            token_path: DEFAULT_TOKEN_PATH.to_string(),
            refresh_path: DEFAULT_REFRESH_PATH.to_string(),
            machine_client_id: DEFAULT_MACHINE_CLIENT_ID.to_string(),
            pat: None,
            timeout_secs: 15,
            max_retries: 3,
        }
    }
}

/// Custom serde module for URL serialization.
mod url_serde {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use url::Url;

    pub fn serialize<S>(url: &Url, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(url.as_str())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Url, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Url::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Environment variables that can override configuration.
pub mod env {
    pub const PROFILE: &str = "KONGCTL_PROFILE";
    pub const CONFIG_FILE: &str = "KONGCTL_CONFIG_FILE";
    pub const LOG_LEVEL: &str = "KONGCTL_LOG";
}

/// Prefix of the per-profile environment variables, e.g. `KONGCTL_DEV_EU`.
pub fn env_prefix(profile: &str) -> String {
    format!("KONGCTL_{}", profile.to_uppercase().replace('-', "_"))
}

/// Environment variable holding the personal access token for `profile`.
pub fn pat_env_var(profile: &str) -> String {
    format!("{}_KONNECT_PAT", env_prefix(profile))
}

/// Converts a region identifier into the corresponding Konnect API host.
pub fn build_base_url_from_region(region: &str) -> Result<Url> {
    let trimmed = region.trim().to_lowercase();
    if trimmed.is_empty() {
        return Err(KongctlError::Config("Konnect region cannot be empty".to_string()));
    }
    if trimmed == "global" {
        return Ok(Url::parse(GLOBAL_BASE_URL)?);
    }
    if !trimmed
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(KongctlError::Config(format!(
            "Invalid Konnect region '{region}' (expected lowercase letters, numbers, or hyphens)"
        )));
    }
    Ok(Url::parse(&format!("https://{trimmed}.api.konghq.com"))?)
}

/// Appends a path to a base URL, keeping any path prefix the base carries.
fn join_path(base: &Url, path: &str) -> Result<Url> {
    let joined = format!(
        "{}/{}",
        base.as_str().trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    Ok(Url::parse(&joined)?)
}

impl KonnectConfig {
    /// Apply per-profile environment variable overrides.
    #[must_use]
    pub fn with_env_overrides(mut self, profile: &str) -> Self {
        let prefix = env_prefix(profile);

        if let Ok(pat) = std::env::var(pat_env_var(profile)) {
            self.pat = Some(pat);
        }
        if let Ok(url) = std::env::var(format!("{prefix}_KONNECT_BASE_URL")) {
            self.base_url = Some(url);
        }
        if let Ok(region) = std::env::var(format!("{prefix}_KONNECT_REGION")) {
            self.region = Some(region);
        }

        self
    }

    /// Determines the effective API base URL.
    ///
    /// Precedence: explicit `base_url`, then `region`, then the US default.
    pub fn resolve_base_url(&self) -> Result<Url> {
        if let Some(url) = self.base_url.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
            return Ok(Url::parse(url)?);
        }
        match self.region.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
            Some(region) => build_base_url_from_region(region),
            None => Ok(Url::parse(DEFAULT_BASE_URL)?),
        }
    }

    /// Builds the device-flow and refresh endpoints.
    pub fn auth_endpoints(&self) -> Result<AuthEndpoints> {
        let base_url = self.resolve_base_url()?;
        Ok(AuthEndpoints {
            device_authorization: join_path(&self.auth_base_url, &self.auth_path)?,
            token: join_path(&self.auth_base_url, &self.token_path)?,
            refresh: join_path(&base_url, &self.refresh_path)?,
            client_id: self.machine_client_id.clone(),
        })
    }

    /// Builds the value a [`SessionManager`](crate::auth::SessionManager) is constructed with.
    pub fn session_config(&self) -> Result<SessionConfig> {
        Ok(SessionConfig {
            endpoints: self.auth_endpoints()?,
            static_token: self.pat.clone().filter(|t| !t.is_empty()),
        })
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
