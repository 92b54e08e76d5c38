//! Session tokens for the Sanddollar backend.

mod token_storage;

pub use token_storage::TokenStore;

use crate::errors::BackendError;
use chrono::{DateTime, Duration, Utc};
use sanddollar_api::endpoints::auth::AuthResponse;
use sanddollar_api::{Client, Request};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Token storage error: {0}")]
    TokenStorage(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Login failed: {0}")]
    Login(#[from] BackendError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredToken {
    pub access_token: String,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl StoredToken {
    pub fn from_response(response: &AuthResponse, now: DateTime<Utc>) -> Self {
        Self {
            access_token: response.access_token.clone(),
            expires_at: response
                .expires_in
                .map(|seconds| now + Duration::seconds(seconds)),
        }
    }
}

/// Signs in and stores the returned token.
pub async fn login(
    client: &Client,
    store: &TokenStore,
    email: &str,
    password: &str,
) -> Result<StoredToken, AuthError> {
    let response = client
        .send(Request::auth().login(email, password))
        .await
        .map_err(BackendError::from)?;

    let token = StoredToken::from_response(&response, Utc::now());
    store.save_token(&token)?;
    tracing::info!("Signed in, token saved to {}", store.path().display());
    Ok(token)
}

/// A client carrying the stored token, or an anonymous one when there is no
/// usable token.
pub fn authenticated_client(base_url: &str, store: &TokenStore) -> Client {
    match store.load_token() {
        Ok(Some(token)) if !store.is_token_expired(&token) => {
            Client::with_token(base_url, SecretString::from(token.access_token))
        }
        Ok(Some(_)) => {
            tracing::info!("Stored token expired, continuing without one");
            Client::new(base_url)
        }
        Ok(None) => Client::new(base_url),
        Err(e) => {
            tracing::warn!("Could not read stored token: {}", e);
            Client::new(base_url)
        }
    }
}

pub fn logout(store: &TokenStore) -> Result<(), AuthError> {
    store.delete_token()?;
    tracing::info!("Signed out");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn token_expiry_comes_from_expires_in() {
        let now = Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap();
        let response = AuthResponse {
            access_token: "abc".to_string(),
            token_type: Some("Bearer".to_string()),
            expires_in: Some(3600),
            user_info: None,
        };
        let token = StoredToken::from_response(&response, now);
        assert_eq!(token.access_token, "abc");
        assert_eq!(token.expires_at, Some(now + Duration::hours(1)));
    }

    #[test]
    fn stored_token_selects_client_auth() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::with_path(dir.path().join("token.json")).unwrap();

        let client = authenticated_client("http://localhost:8080/api", &store);
        assert!(client.token().is_none());

        store
            .save_token(&StoredToken {
                access_token: "abc".to_string(),
                expires_at: None,
            })
            .unwrap();
        let client = authenticated_client("http://localhost:8080/api", &store);
        assert!(client.token().is_some());

        store
            .save_token(&StoredToken {
                access_token: "old".to_string(),
                expires_at: Some(Utc::now() - Duration::hours(1)),
            })
            .unwrap();
        let client = authenticated_client("http://localhost:8080/api", &store);
        assert!(client.token().is_none());
    }
}
