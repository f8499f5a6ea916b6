use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthClientError {
    #[error("auth service request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("auth service returned an unexpected response: {0}")]
    BadResponse(String),
}

/// Resolves an opaque bearer credential to the current user's id.
/// `Ok(None)` means the credential was rejected; errors mean the auth
/// service itself could not be consulted.
#[async_trait]
pub trait CurrentUserResolver: Send + Sync {
    async fn resolve(&self, bearer: &str) -> Result<Option<String>, AuthClientError>;
}

#[derive(Deserialize)]
struct MeResponse {
    success: bool,
    user: Option<MeUser>,
}

#[derive(Deserialize)]
struct MeUser {
    #[serde(alias = "_id")]
    id: String,
}

/// Client for the marketplace auth service's current-user endpoint.
pub struct HttpAuthClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpAuthClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl CurrentUserResolver for HttpAuthClient {
    async fn resolve(&self, bearer: &str) -> Result<Option<String>, AuthClientError> {
        let response = self
            .http
            .get(format!("{}/api/v1/auth/me", self.base_url))
            .bearer_auth(bearer)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => {
                let body: MeResponse = response.json().await?;
                if !body.success {
                    return Ok(None);
                }
                Ok(body.user.map(|user| user.id))
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(None),
            status => Err(AuthClientError::BadResponse(format!(
                "unexpected status {}",
                status
            ))),
        }
    }
}
