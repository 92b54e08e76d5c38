//! Bank linking through the backend's Plaid proxy.

use crate::errors::BackendError;
use crate::settings::Settings;
use sanddollar_api::endpoints::plaid::PlaidStatus;
use sanddollar_api::{Client, Request};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlaidError {
    #[error("Plaid linking is disabled (set plaid_link_enabled to turn it on)")]
    Disabled,

    #[error(transparent)]
    Backend(#[from] BackendError),
}

pub struct PlaidLink<'a> {
    client: &'a Client,
    env: String,
}

impl<'a> PlaidLink<'a> {
    pub fn new(client: &'a Client, settings: &Settings) -> Result<Self, PlaidError> {
        if !settings.plaid_link_enabled {
            return Err(PlaidError::Disabled);
        }
        Ok(Self {
            client,
            env: settings.plaid_env.clone(),
        })
    }

    pub fn env(&self) -> &str {
        &self.env
    }

    pub async fn link_token(&self) -> Result<String, PlaidError> {
        let response = self
            .client
            .send(Request::plaid().create_link_token())
            .await
            .map_err(BackendError::from)?;
        tracing::info!("Created Plaid link token ({})", self.env);
        Ok(response.link_token)
    }

    /// Exchanges the public token from Plaid Link, then runs the first sync.
    pub async fn connect(&self, public_token: &str) -> Result<(), PlaidError> {
        self.client
            .send(Request::plaid().exchange_public_token(public_token))
            .await
            .map_err(BackendError::from)?;
        tracing::info!("Plaid item linked, starting initial sync");
        self.sync().await
    }

    pub async fn status(&self) -> Result<PlaidStatus, PlaidError> {
        let result = self
            .client
            .send(Request::plaid().status())
            .await
            .map_err(BackendError::from);
        Ok(status_or_unlinked(result)?)
    }

    pub async fn sync(&self) -> Result<(), PlaidError> {
        let summary = self
            .client
            .send(Request::plaid().sync())
            .await
            .map_err(BackendError::from)?;
        tracing::debug!("Plaid sync finished: {}", summary);
        Ok(())
    }
}

/// Backends without Plaid configured answer the status call with 404 or 501;
/// both mean no linked item.
pub fn status_or_unlinked(
    result: Result<PlaidStatus, BackendError>,
) -> Result<PlaidStatus, BackendError> {
    match result {
        Err(e) if matches!(e.status(), Some(404) | Some(501)) => Ok(PlaidStatus::default()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::status_error;

    #[test]
    fn missing_plaid_means_unlinked() {
        assert!(!status_or_unlinked(Err(status_error(404))).unwrap().has_item);
        assert!(!status_or_unlinked(Err(status_error(501))).unwrap().has_item);
        assert!(status_or_unlinked(Ok(PlaidStatus { has_item: true })).unwrap().has_item);
        assert!(status_or_unlinked(Err(status_error(500))).is_err());
    }

    #[test]
    fn linking_requires_the_flag() {
        let client = Client::new("http://localhost:8080/api");
        let settings = Settings::default();
        assert!(matches!(PlaidLink::new(&client, &settings), Err(PlaidError::Disabled)));

        let enabled = Settings {
            plaid_link_enabled: true,
            ..Settings::default()
        };
        assert_eq!(PlaidLink::new(&client, &enabled).unwrap().env(), "sandbox");
    }
}
