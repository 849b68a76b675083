//! Per-profile credential files.
//!
//! Each profile's [`AccessToken`] is stored as JSON in
//! `.<profile>-konnect-token.json`, next to the configuration file. Files are
//! written owner-only and replaced atomically, so a failed write never leaves
//! a partial credential behind.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::auth::error::{AuthError, AuthResult};
use crate::auth::tokens::AccessToken;

/// File-based credential storage rooted at the configuration directory.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    dir: PathBuf,
}

impl CredentialStore {
    /// Creates a store that keeps credentials beside `config_file`.
    pub fn beside(config_file: &Path) -> Self {
        let dir = config_file
            .parent()
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        Self::with_dir(dir)
    }

    /// Creates a store rooted at `dir`.
    pub fn with_dir(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Gets the credential file path for a profile.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidProfile`] if the profile name is empty or
    /// would escape the configuration directory.
    pub fn path_for(&self, profile: &str) -> AuthResult<PathBuf> {
        validate_profile(profile)?;
        Ok(self.dir.join(format!(".{profile}-konnect-token.json")))
    }

    /// Loads the credential for a profile.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::NotFound`] if no file exists and
    /// [`AuthError::CorruptCredential`] if it cannot be decoded.
    pub fn load(&self, profile: &str) -> AuthResult<AccessToken> {
        let path = self.path_for(profile)?;

        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(AuthError::NotFound {
                    profile: profile.to_string(),
                })
            },
            Err(e) if e.kind() == ErrorKind::InvalidData => {
                return Err(AuthError::CorruptCredential {
                    path,
                    reason: e.to_string(),
                })
            },
            Err(source) => return Err(AuthError::Storage { path, source }),
        };

        serde_json::from_str(&contents).map_err(|e| AuthError::CorruptCredential {
            path,
            reason: e.to_string(),
        })
    }

    /// Saves the credential for a profile, replacing any previous one.
    ///
    /// The file is readable and writable by the owner only.
    pub fn save(&self, profile: &str, token: &AccessToken) -> AuthResult<()> {
        let path = self.path_for(profile)?;
        let storage = |source| AuthError::Storage {
            path: path.clone(),
            source,
        };

        let json = serde_json::to_vec_pretty(token)
            .map_err(|e| storage(std::io::Error::new(ErrorKind::InvalidData, e)))?;

        fs::create_dir_all(&self.dir).map_err(storage)?;

        // NamedTempFile is created 0600 on Unix.
        let mut file = NamedTempFile::new_in(&self.dir).map_err(storage)?;
        file.write_all(&json).map_err(storage)?;
        file.as_file().sync_all().map_err(storage)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(file.path(), fs::Permissions::from_mode(0o600))
                .map_err(storage)?;
        }

        file.persist(&path).map_err(|e| storage(e.error))?;
        tracing::debug!(path = %path.display(), "credential saved");
        Ok(())
    }

    /// Deletes the credential for a profile.
    ///
    /// Returns `true` if a file was removed and `false` if none existed.
    pub fn delete(&self, profile: &str) -> AuthResult<bool> {
        let path = self.path_for(profile)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(source) => Err(AuthError::Storage { path, source }),
        }
    }

    /// Checks if a credential file exists for a profile.
    pub fn exists(&self, profile: &str) -> AuthResult<bool> {
        Ok(self.path_for(profile)?.is_file())
    }
}

fn validate_profile(profile: &str) -> AuthResult<()> {
    let invalid = |reason: &str| AuthError::InvalidProfile {
        profile: profile.to_string(),
        reason: reason.to_string(),
    };

    if profile.is_empty() {
        return Err(invalid("name cannot be empty"));
    }
    if profile.contains('/') || profile.contains('\\') || profile.contains("..") {
        return Err(invalid("name cannot contain path separators"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::tokens::TokenSet;
    use chrono::Utc;
    use tempfile::TempDir;

    fn sample_token() -> AccessToken {
        AccessToken {
            token: TokenSet {
                auth_token: "access-value".to_string(),
                refresh_token: "refresh-value".to_string(),
                token_type: "Bearer".to_string(),
                expires_after: 900,
                scope: "openid".to_string(),
            },
            received_at: Utc::now(),
        }
    }

    #[test]
    fn save_and_load_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let store = CredentialStore::with_dir(temp_dir.path().to_path_buf());

        let token = sample_token();
        store.save("default", &token).unwrap();

        assert_eq!(store.load("default").unwrap(), token);
    }

    #[test]
    fn file_lives_beside_config_file() {
        let temp_dir = TempDir::new().unwrap();
        let store = CredentialStore::beside(&temp_dir.path().join("config.toml"));

        store.save("default", &sample_token()).unwrap();

        assert!(temp_dir.path().join(".default-konnect-token.json").is_file());
    }

    #[cfg(unix)]
    #[test]
    fn saved_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let store = CredentialStore::with_dir(temp_dir.path().to_path_buf());
        store.save("default", &sample_token()).unwrap();

        let path = store.path_for("default").unwrap();
        let mode = fs::metadata(path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn load_missing_is_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let store = CredentialStore::with_dir(temp_dir.path().to_path_buf());

        let err = store.load("default").unwrap_err();
        assert!(matches!(err, AuthError::NotFound { profile } if profile == "default"));
    }

    #[test]
    fn load_malformed_is_corrupt() {
        let temp_dir = TempDir::new().unwrap();
        let store = CredentialStore::with_dir(temp_dir.path().to_path_buf());
        fs::write(store.path_for("default").unwrap(), r#"{"token":"value"}"#).unwrap();

        let err = store.load("default").unwrap_err();
        assert!(matches!(err, AuthError::CorruptCredential { .. }));
    }

    #[test]
    fn delete_existing_file() {
        let temp_dir = TempDir::new().unwrap();
        let store = CredentialStore::with_dir(temp_dir.path().to_path_buf());
        store.save("default", &sample_token()).unwrap();

        assert!(store.delete("default").unwrap());
        assert!(!store.path_for("default").unwrap().exists());
    }

    #[test]
    fn delete_without_file_reports_false() {
        let temp_dir = TempDir::new().unwrap();
        let store = CredentialStore::with_dir(temp_dir.path().to_path_buf());

        assert!(!store.delete("default").unwrap());
    }

    #[test]
    fn profiles_are_isolated() {
        let temp_dir = TempDir::new().unwrap();
        let store = CredentialStore::with_dir(temp_dir.path().to_path_buf());
        store.save("prod", &sample_token()).unwrap();

        assert!(store.exists("prod").unwrap());
        assert!(!store.exists("dev").unwrap());
    }

    #[test]
    fn reject_path_traversal_in_profile() {
        let store = CredentialStore::with_dir(PathBuf::from("/tmp"));

        assert!(matches!(
            store.path_for("../etc").unwrap_err(),
            AuthError::InvalidProfile { .. }
        ));
        assert!(matches!(
            store.path_for("").unwrap_err(),
            AuthError::InvalidProfile { .. }
        ));
    }
}
