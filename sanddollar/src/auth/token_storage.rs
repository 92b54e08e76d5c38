use super::{AuthError, StoredToken};
use chrono::{DateTime, Duration, Utc};
use std::fs;
use std::path::{Path, PathBuf};

const EXPIRY_BUFFER: Duration = Duration::minutes(5);

pub struct TokenStore {
    token_path: PathBuf,
}

impl TokenStore {
    /// Store at `<cache dir>/sanddollar/token.json`.
    pub fn new() -> Result<Self, AuthError> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| AuthError::TokenStorage("Could not find cache directory".to_string()))?
            .join("sanddollar");

        Self::with_path(cache_dir.join("token.json"))
    }

    pub fn with_path(token_path: impl Into<PathBuf>) -> Result<Self, AuthError> {
        let token_path = token_path.into();
        if let Some(parent) = token_path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| {
                    AuthError::TokenStorage(format!("Failed to create cache directory: {}", e))
                })?;
            }
        }
        Ok(Self { token_path })
    }

    pub fn path(&self) -> &Path {
        &self.token_path
    }

    pub fn save_token(&self, token: &StoredToken) -> Result<(), AuthError> {
        let json = serde_json::to_string_pretty(token)?;

        fs::write(&self.token_path, json)
            .map_err(|e| AuthError::TokenStorage(format!("Failed to save token: {}", e)))?;

        // Owner read/write only
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = fs::metadata(&self.token_path)
                .map_err(|e| {
                    AuthError::TokenStorage(format!("Failed to get file permissions: {}", e))
                })?
                .permissions();
            perms.set_mode(0o600);
            fs::set_permissions(&self.token_path, perms).map_err(|e| {
                AuthError::TokenStorage(format!("Failed to set file permissions: {}", e))
            })?;
        }

        Ok(())
    }

    pub fn load_token(&self) -> Result<Option<StoredToken>, AuthError> {
        if !self.token_path.exists() {
            return Ok(None);
        }

        let json = fs::read_to_string(&self.token_path)
            .map_err(|e| AuthError::TokenStorage(format!("Failed to read token: {}", e)))?;

        let token: StoredToken = serde_json::from_str(&json)?;
        Ok(Some(token))
    }

    pub fn delete_token(&self) -> Result<(), AuthError> {
        if self.token_path.exists() {
            fs::remove_file(&self.token_path)
                .map_err(|e| AuthError::TokenStorage(format!("Failed to delete token: {}", e)))?;
        }
        Ok(())
    }

    pub fn is_token_expired(&self, token: &StoredToken) -> bool {
        is_expired_at(token, Utc::now())
    }
}

/// Tokens count as expired five minutes early. Tokens without an expiry never do.
pub(crate) fn is_expired_at(token: &StoredToken, now: DateTime<Utc>) -> bool {
    match token.expires_at {
        Some(expires_at) => expires_at <= now + EXPIRY_BUFFER,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn token(expires_at: Option<DateTime<Utc>>) -> StoredToken {
        StoredToken {
            access_token: "abc".to_string(),
            expires_at,
        }
    }

    #[test]
    fn save_load_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::with_path(dir.path().join("nested").join("token.json")).unwrap();

        assert!(store.load_token().unwrap().is_none());

        let saved = token(Some(Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap()));
        store.save_token(&saved).unwrap();
        assert_eq!(store.load_token().unwrap(), Some(saved));

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(store.path()).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }

        store.delete_token().unwrap();
        assert!(store.load_token().unwrap().is_none());
        // Deleting twice is fine
        store.delete_token().unwrap();
    }

    #[test]
    fn expiry_has_a_buffer() {
        let now = Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap();
        assert!(is_expired_at(&token(Some(now + Duration::minutes(4))), now));
        assert!(!is_expired_at(&token(Some(now + Duration::minutes(6))), now));
        assert!(!is_expired_at(&token(None), now));
    }

    #[test]
    fn corrupt_token_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::with_path(dir.path().join("token.json")).unwrap();
        fs::write(store.path(), "not json").unwrap();
        assert!(matches!(store.load_token(), Err(AuthError::Json(_))));
    }
}
