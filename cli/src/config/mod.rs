//! Configuration management for kongctl.

pub mod paths;
pub mod settings;

pub use settings::{pat_env_var, KonnectConfig, DEFAULT_PROFILE};

use std::path::{Path, PathBuf};

use self::settings::KongctlConfig;
use crate::auth::{CredentialStore, RefreshClient, SessionManager};
use crate::error::{KongctlError, Result};

/// Values given on the command line. They win over env and file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub pat: Option<String>,
    pub base_url: Option<String>,
    pub region: Option<String>,
}

/// A resolved profile: its name, where its config lives and its settings.
#[derive(Debug, Clone)]
pub struct Profile {
    pub name: String,
    pub config_path: PathBuf,
    pub konnect: KonnectConfig,
}

impl Profile {
    /// Credential store for files next to the config file.
    #[must_use]
    pub fn credential_store(&self) -> CredentialStore {
        CredentialStore::beside(&self.config_path)
    }

    /// Session manager wired to this profile's endpoints and store.
    pub fn session_manager(&self) -> Result<SessionManager> {
        Ok(SessionManager::new(
            self.konnect.session_config()?,
            self.credential_store(),
            RefreshClient::new(self.konnect.timeout()),
        ))
    }
}

/// Load configuration from a specific path.
///
/// If the file doesn't exist, returns default configuration.
pub fn load_config_from(path: &Path) -> Result<KongctlConfig> {
    if !path.exists() {
        return Ok(KongctlConfig::default());
    }

    let contents = std::fs::read_to_string(path)?;
    toml::from_str(&contents).map_err(|e| KongctlError::ConfigRead(e.to_string()))
}

/// Resolve the named profile.
///
/// `config_file` defaults to the platform config path. Settings are layered
/// file, then `KONGCTL_<PROFILE>_*` environment variables, then `overrides`.
pub fn load_profile(
    config_file: Option<&Path>,
    profile: &str,
    overrides: &Overrides,
) -> Result<Profile> {
    let config_path = match config_file {
        Some(path) => path.to_path_buf(),
        None => paths::config_file()?,
    };

    let mut konnect = load_config_from(&config_path)?
        .profiles
        .remove(profile)
        .map(|p| p.konnect)
        .unwrap_or_default()
        .with_env_overrides(profile);

    if let Some(pat) = &overrides.pat {
        konnect.pat = Some(pat.clone());
    }
    if let Some(url) = &overrides.base_url {
        konnect.base_url = Some(url.clone());
    }
    if let Some(region) = &overrides.region {
        konnect.region = Some(region.clone());
    }

    tracing::debug!(profile, config = %config_path.display(), "loaded profile");

    Ok(Profile {
        name: profile.to_string(),
        config_path,
        konnect,
    })
}
