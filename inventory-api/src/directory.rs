//! Microsoft Graph directory client.
//!
//! Resolves user ids to display metadata using an app-only token obtained
//! with the client-credentials grant. The token is cached until shortly
//! before it expires.

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use inventory_core::{DirectoryUser, IdentityError, IdentityResolver};
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::config::AzureConfig;
use crate::constants::{
    AZURE_LOGIN_BASE_URL, GRAPH_BASE_URL, GRAPH_DEFAULT_SCOPE, GRAPH_TOKEN_REFRESH_MARGIN_SECS,
};

/// Fields requested from `/users`.
const USER_SELECT: &str = "id,givenName,surname,mail,displayName";

// ============================================================================
// WIRE TYPES
// ============================================================================

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphUser {
    id: String,
    given_name: Option<String>,
    surname: Option<String>,
    mail: Option<String>,
    display_name: Option<String>,
}

impl From<GraphUser> for DirectoryUser {
    fn from(u: GraphUser) -> Self {
        DirectoryUser {
            id: u.id,
            first_name: u.given_name,
            last_name: u.surname,
            email: u.mail,
            display_name: u.display_name,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GraphUserPage {
    #[serde(default)]
    value: Vec<GraphUser>,
    #[serde(rename = "@odata.nextLink")]
    next_link: Option<String>,
}

struct CachedToken {
    value: SecretString,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + ChronoDuration::seconds(GRAPH_TOKEN_REFRESH_MARGIN_SECS) < self.expires_at
    }
}

// ============================================================================
// CLIENT
// ============================================================================

/// Graph-backed [`IdentityResolver`].
pub struct GraphDirectory {
    http: reqwest::Client,
    azure: AzureConfig,
    token_url: String,
    graph_base: String,
    token: RwLock<Option<CachedToken>>,
}

impl GraphDirectory {
    pub fn new(azure: AzureConfig, timeout: Duration) -> Result<Self, IdentityError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| upstream(format!("Failed to create HTTP client: {}", e)))?;
        let token_url = format!(
            "{}/{}/oauth2/v2.0/token",
            AZURE_LOGIN_BASE_URL, azure.tenant_id
        );
        Ok(Self {
            http,
            azure,
            token_url,
            graph_base: GRAPH_BASE_URL.to_string(),
            token: RwLock::new(None),
        })
    }

    /// Point the client at a different Graph host.
    pub fn with_graph_base(mut self, base: impl Into<String>) -> Self {
        self.graph_base = base.into();
        self
    }

    async fn access_token(&self) -> Result<String, IdentityError> {
        let now = Utc::now();
        if let Some(cached) = self.token.read().await.as_ref() {
            if cached.is_fresh(now) {
                return Ok(cached.value.expose_secret().to_string());
            }
        }

        let mut slot = self.token.write().await;
        if let Some(cached) = slot.as_ref() {
            if cached.is_fresh(now) {
                return Ok(cached.value.expose_secret().to_string());
            }
        }

        let form = [
            ("client_id", self.azure.client_id.as_str()),
            ("client_secret", self.azure.client_secret.expose_secret()),
            ("scope", GRAPH_DEFAULT_SCOPE),
            ("grant_type", "client_credentials"),
        ];
        let response = self
            .http
            .post(&self.token_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| upstream(format!("Token request failed: {}", e)))?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(upstream(format!("Token endpoint returned {}: {}", status, body)));
        }
        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| upstream(format!("Invalid token response: {}", e)))?;

        tracing::debug!(expires_in = token.expires_in, "Fetched Graph access token");
        let value = token.access_token.clone();
        *slot = Some(CachedToken {
            value: SecretString::from(token.access_token),
            expires_at: now + ChronoDuration::seconds(token.expires_in),
        });
        Ok(value)
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, IdentityError> {
        let token = self.access_token().await?;
        self.http
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| upstream(format!("Graph request failed: {}", e)))
    }
}

fn upstream(reason: impl Into<String>) -> IdentityError {
    IdentityError::Upstream {
        reason: reason.into(),
    }
}

async fn error_for_status(
    response: reqwest::Response,
    user_id: Option<&str>,
) -> Result<reqwest::Response, IdentityError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::NOT_FOUND {
        if let Some(id) = user_id {
            return Err(IdentityError::UserNotFound {
                user_id: id.to_string(),
            });
        }
    }
    let body = response.text().await.unwrap_or_default();
    Err(upstream(format!("Graph returned {}: {}", status, body)))
}

#[async_trait]
impl IdentityResolver for GraphDirectory {
    #[tracing::instrument(skip(self))]
    async fn resolve_user(&self, user_id: &str) -> Result<DirectoryUser, IdentityError> {
        let url = format!("{}/users/{}?$select={}", self.graph_base, user_id, USER_SELECT);
        let response = error_for_status(self.get(&url).await?, Some(user_id)).await?;
        let user: GraphUser = response
            .json()
            .await
            .map_err(|e| upstream(format!("Invalid user payload: {}", e)))?;
        Ok(user.into())
    }

    #[tracing::instrument(skip(self))]
    async fn list_users(&self) -> Result<Vec<DirectoryUser>, IdentityError> {
        let mut users = Vec::new();
        let mut next = Some(format!("{}/users?$select={}", self.graph_base, USER_SELECT));
        while let Some(url) = next {
            let response = error_for_status(self.get(&url).await?, None).await?;
            let page: GraphUserPage = response
                .json()
                .await
                .map_err(|e| upstream(format!("Invalid users payload: {}", e)))?;
            users.extend(page.value.into_iter().map(DirectoryUser::from));
            next = page.next_link;
        }
        tracing::debug!(count = users.len(), "Listed directory users");
        Ok(users)
    }

    #[tracing::instrument(skip(self))]
    async fn user_photo(&self, user_id: &str) -> Result<Option<Vec<u8>>, IdentityError> {
        let url = format!("{}/users/{}/photo/$value", self.graph_base, user_id);
        let response = self.get(&url).await?;
        // Graph answers 404 both for unknown users and for users without a photo.
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = error_for_status(response, Some(user_id)).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| upstream(format!("Failed to read photo: {}", e)))?;
        Ok(Some(bytes.to_vec()))
    }
}
