pub mod endpoints;
mod error;
mod macros;
pub mod repositories;
pub mod stream;

pub use crate::error::{ErrorBody, SanddollarApiError};
use repositories::*;
use secrecy::{ExposeSecret, SecretString};
use tower_api_client::{Client as ApiClient, Request as ApiRequest};
pub use tower_api_client::StatusCode;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/api";

pub struct Client {
    inner: ApiClient,
    base_url: String,
    token: Option<SecretString>,
}

impl Client {
    /// Client for cookie/anonymous access (login, health checks).
    pub fn new(base_url: &str) -> Self {
        Self {
            inner: ApiClient::new(base_url),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        }
    }

    pub fn with_token(base_url: &str, token: SecretString) -> Self {
        Self {
            inner: ApiClient::new(base_url).bearer_auth(token.expose_secret()),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: Some(token),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn token(&self) -> Option<&SecretString> {
        self.token.as_ref()
    }

    pub async fn send<R>(&self, request: R) -> Result<R::Response, SanddollarApiError>
    where
        R: ApiRequest,
    {
        self.inner.send(request).await.map_err(From::from)
    }
}

pub struct Request;

impl Request {
    pub fn ai_budget() -> AiBudgetRepository {
        AiBudgetRepository::new()
    }

    pub fn budgets() -> BudgetRepository {
        BudgetRepository::new()
    }

    pub fn plaid() -> PlaidRepository {
        PlaidRepository::new()
    }

    pub fn chat() -> ChatRepository {
        ChatRepository::new()
    }

    pub fn auth() -> AuthRepository {
        AuthRepository::new()
    }
}
