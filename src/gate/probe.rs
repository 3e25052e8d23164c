//! Remote role check against the backend's `/auth/check-auth` endpoint.

use crate::APP_USER_AGENT;
use crate::api::handlers::auth::cookies::ACCESS_COOKIE_NAME;
use async_trait::async_trait;
use reqwest::{Client, StatusCode, header};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("Role check request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Role check returned status {0}")]
    Status(StatusCode),
}

/// Source of the caller's roles for admin-gated navigations.
#[async_trait]
pub trait RoleProbe: Send + Sync {
    async fn roles(&self) -> Result<Vec<String>, ProbeError>;
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckAuth {
    is_authenticated: bool,
    roles: Vec<String>,
}

/// Role probe that forwards the caller's access-token cookie to the backend.
pub struct HttpRoleProbe {
    client: Client,
    url: String,
    access_token: String,
}

impl HttpRoleProbe {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(backend_base_url: &str, access_token: String) -> Result<Self, ProbeError> {
        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(Duration::from_secs(5))
            .build()?;

        Ok(Self {
            client,
            url: format!("{}/auth/check-auth", backend_base_url.trim_end_matches('/')),
            access_token,
        })
    }
}

#[async_trait]
impl RoleProbe for HttpRoleProbe {
    async fn roles(&self) -> Result<Vec<String>, ProbeError> {
        let response = self
            .client
            .get(&self.url)
            .header(
                header::COOKIE,
                format!("{ACCESS_COOKIE_NAME}={}", self.access_token),
            )
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(ProbeError::Status(status));
        }

        let body: CheckAuth = response.json().await?;
        if !body.is_authenticated {
            return Err(ProbeError::Status(StatusCode::UNAUTHORIZED));
        }

        Ok(body.roles)
    }
}
