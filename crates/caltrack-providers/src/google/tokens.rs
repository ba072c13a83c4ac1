//! Persisted OAuth tokens.
//!
//! Tokens live in one JSON file per account, written atomically and, on
//! Unix, readable only by the owner.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ProviderError, ProviderResult};

/// Access tokens are treated as expired this long before Google says so.
const EXPIRY_MARGIN_SECS: i64 = 60;

fn expiry_from(expires_in_secs: Option<i64>) -> Option<DateTime<Utc>> {
    expires_in_secs
        .map(|secs| Utc::now() + Duration::seconds(secs) - Duration::seconds(EXPIRY_MARGIN_SECS))
}

/// A token set returned by the token endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub access_token: String,
    /// Missing when Google did not issue one; the user must then log in again
    /// once the access token expires.
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    /// Scopes granted with this token set.
    pub scopes: Vec<String>,
    pub last_refresh: DateTime<Utc>,
}

impl TokenInfo {
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_in_secs: Option<i64>,
        scopes: Vec<String>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
            expires_at: expiry_from(expires_in_secs),
            scopes,
            last_refresh: Utc::now(),
        }
    }

    /// A token without an expiry never expires.
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Utc::now() >= at)
    }

    pub fn has_scopes(&self, required: &[String]) -> bool {
        required.iter().all(|scope| self.scopes.contains(scope))
    }

    /// Replaces the access token after a refresh.
    pub fn update_access_token(&mut self, access_token: impl Into<String>, expires_in_secs: Option<i64>) {
        self.access_token = access_token.into();
        self.expires_at = expiry_from(expires_in_secs);
        self.last_refresh = Utc::now();
    }
}

/// File-backed token store with an in-memory copy.
#[derive(Debug)]
pub struct TokenStorage {
    path: PathBuf,
    tokens: RwLock<Option<TokenInfo>>,
}

impl TokenStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            tokens: RwLock::new(None),
        }
    }

    /// Loads the token file into memory. Returns `Ok(false)` when there is no
    /// file yet.
    pub fn load(&self) -> ProviderResult<bool> {
        if !self.path.exists() {
            debug!("no token file at {:?}", self.path);
            return Ok(false);
        }

        let content = fs::read_to_string(&self.path).map_err(|e| {
            ProviderError::configuration(format!("failed to read token file: {}", e))
        })?;
        let tokens: TokenInfo = serde_json::from_str(&content).map_err(|e| {
            ProviderError::configuration(format!("failed to parse token file: {}", e))
        })?;

        info!("loaded tokens from {:?}", self.path);
        *self.tokens.write().unwrap_or_else(PoisonError::into_inner) = Some(tokens);
        Ok(true)
    }

    fn save(&self, tokens: &TokenInfo) -> ProviderResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                ProviderError::configuration(format!("failed to create token directory: {}", e))
            })?;
        }

        let content = serde_json::to_string_pretty(tokens)
            .map_err(|e| ProviderError::internal(format!("failed to serialize tokens: {}", e)))?;

        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, content).map_err(|e| {
            ProviderError::configuration(format!("failed to write token file: {}", e))
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&temp_path, fs::Permissions::from_mode(0o600)).map_err(|e| {
                ProviderError::configuration(format!("failed to restrict token file: {}", e))
            })?;
        }

        fs::rename(&temp_path, &self.path).map_err(|e| {
            ProviderError::configuration(format!("failed to rename token file: {}", e))
        })?;

        debug!("saved tokens to {:?}", self.path);
        Ok(())
    }

    pub fn get(&self) -> Option<TokenInfo> {
        self.tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Stores a new token set and writes it to disk.
    pub fn set(&self, tokens: TokenInfo) -> ProviderResult<()> {
        self.save(&tokens)?;
        *self.tokens.write().unwrap_or_else(PoisonError::into_inner) = Some(tokens);
        Ok(())
    }

    /// Replaces the access token of the loaded set and writes it to disk.
    pub fn update_access_token(
        &self,
        access_token: impl Into<String>,
        expires_in_secs: Option<i64>,
    ) -> ProviderResult<()> {
        let mut guard = self.tokens.write().unwrap_or_else(PoisonError::into_inner);
        let tokens = guard
            .as_mut()
            .ok_or_else(|| ProviderError::internal("no tokens to update"))?;
        tokens.update_access_token(access_token, expires_in_secs);
        self.save(tokens)
    }

    /// Forgets the tokens and deletes the file.
    pub fn clear(&self) -> ProviderResult<()> {
        *self.tokens.write().unwrap_or_else(PoisonError::into_inner) = None;
        if self.path.exists() {
            fs::remove_file(&self.path).map_err(|e| {
                ProviderError::configuration(format!("failed to remove token file: {}", e))
            })?;
            info!("cleared tokens from {:?}", self.path);
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn has_valid_tokens(&self) -> bool {
        self.with_tokens(|t| !t.is_expired())
    }

    pub fn has_refresh_token(&self) -> bool {
        self.with_tokens(|t| t.refresh_token.is_some())
    }

    /// True when no tokens are loaded or they lack a required scope.
    pub fn needs_reauth(&self, required_scopes: &[String]) -> bool {
        !self.with_tokens(|t| t.has_scopes(required_scopes))
    }

    fn with_tokens(&self, check: impl FnOnce(&TokenInfo) -> bool) -> bool {
        self.tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(check)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCOPE: &str = "https://www.googleapis.com/auth/calendar.readonly";

    fn token() -> TokenInfo {
        TokenInfo::new(
            "access",
            Some("refresh".to_string()),
            Some(3600),
            vec![SCOPE.to_string()],
        )
    }

    mod token_info {
        use super::*;

        #[test]
        fn fresh_token_is_valid() {
            let t = token();
            assert!(!t.is_expired());
            assert!(t.expires_at.unwrap() < Utc::now() + Duration::seconds(3600));
        }

        #[test]
        fn past_expiry() {
            let mut t = token();
            t.expires_at = Some(Utc::now() - Duration::minutes(5));
            assert!(t.is_expired());
        }

        #[test]
        fn no_expiry_never_expires() {
            let t = TokenInfo::new("access", None, None, vec![]);
            assert!(!t.is_expired());
        }

        #[test]
        fn scopes() {
            let t = token();
            assert!(t.has_scopes(&[SCOPE.to_string()]));
            assert!(!t.has_scopes(&["other".to_string()]));
        }
    }

    mod storage {
        use super::*;

        #[test]
        fn set_then_load_from_new_instance() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("nested").join("tokens.json");

            TokenStorage::new(&path).set(token()).unwrap();
            assert!(path.exists());
            assert!(!path.with_extension("json.tmp").exists());

            let storage = TokenStorage::new(&path);
            assert!(storage.load().unwrap());
            assert_eq!(storage.get().unwrap().access_token, "access");
            assert!(storage.has_valid_tokens());
            assert!(storage.has_refresh_token());
        }

        #[cfg(unix)]
        #[test]
        fn file_is_owner_only() {
            use std::os::unix::fs::PermissionsExt;
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("tokens.json");
            TokenStorage::new(&path).set(token()).unwrap();
            let mode = fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }

        #[test]
        fn missing_file() {
            let dir = tempfile::tempdir().unwrap();
            let storage = TokenStorage::new(dir.path().join("none.json"));
            assert!(!storage.load().unwrap());
            assert!(storage.get().is_none());
            assert!(storage.needs_reauth(&[SCOPE.to_string()]));
        }

        #[test]
        fn corrupt_file() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("tokens.json");
            fs::write(&path, "{").unwrap();
            assert!(TokenStorage::new(&path).load().is_err());
        }

        #[test]
        fn update_access_token_persists() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("tokens.json");
            let storage = TokenStorage::new(&path);
            storage.set(token()).unwrap();
            storage.update_access_token("new-access", Some(1800)).unwrap();

            let reloaded = TokenStorage::new(&path);
            reloaded.load().unwrap();
            let t = reloaded.get().unwrap();
            assert_eq!(t.access_token, "new-access");
            assert_eq!(t.refresh_token.as_deref(), Some("refresh"));
        }

        #[test]
        fn update_without_tokens_fails() {
            let dir = tempfile::tempdir().unwrap();
            let storage = TokenStorage::new(dir.path().join("tokens.json"));
            assert!(storage.update_access_token("x", None).is_err());
        }

        #[test]
        fn clear_removes_file() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("tokens.json");
            let storage = TokenStorage::new(&path);
            storage.set(token()).unwrap();
            storage.clear().unwrap();
            assert!(!path.exists());
            assert!(storage.get().is_none());
        }

        #[test]
        fn needs_reauth_on_scope_change() {
            let dir = tempfile::tempdir().unwrap();
            let storage = TokenStorage::new(dir.path().join("tokens.json"));
            storage.set(token()).unwrap();
            assert!(!storage.needs_reauth(&[SCOPE.to_string()]));
            assert!(storage.needs_reauth(&["https://www.googleapis.com/auth/calendar".to_string()]));
        }
    }
}
