//! Konnect API client implementation.

use reqwest::{Client, StatusCode};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::policies::ExponentialBackoff;
use reqwest_retry::RetryTransientMiddleware;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::client::middleware::{AuthMiddleware, LoggingMiddleware};
use crate::config::KonnectConfig;
use crate::error::{KongctlError, Result};

/// The authenticated Konnect user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    /// Remaining fields, passed through untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// API client for Konnect, authenticated with a resolved bearer token.
pub struct KonnectClient {
    client: ClientWithMiddleware,
    base_url: Url,
}

impl KonnectClient {
    /// Create a new API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built or the token
    /// is not a valid header value.
    pub fn new(base_url: Url, token: &str, config: &KonnectConfig) -> Result<Self> {
        let inner_client = Client::builder()
            .user_agent(format!("kongctl/{}", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout())
            .build()?;

        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(config.max_retries);

        let client = ClientBuilder::new(inner_client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .with(AuthMiddleware::new(token)?)
            .with(LoggingMiddleware)
            .build();

        Ok(Self { client, base_url })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        let joined = format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        Ok(Url::parse(&joined)?)
    }

    /// Fetch the user the token belongs to.
    ///
    /// # Errors
    ///
    /// Returns [`KongctlError::Unauthorized`] on 401 and
    /// [`KongctlError::ApiError`] for other non-success statuses.
    pub async fn current_user(&self) -> Result<User> {
        let url = self.endpoint("/v3/users/me")?;

        let response = self
            .client
            .get(url)
            .header(http::header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(KongctlError::Unauthorized);
        }
        if status == StatusCode::SERVICE_UNAVAILABLE {
            return Err(KongctlError::ApiUnavailable);
        }
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(KongctlError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| KongctlError::Serialization(e.to_string()))
    }
}
