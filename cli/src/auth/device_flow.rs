//! OAuth device authorization grant (RFC 8628) exchanges.
//!
//! [`DeviceGrantClient`] performs single, stateless calls: one device code
//! request and one token poll. The wait loop between polls belongs to the
//! caller (see [`SessionManager::login`](crate::auth::SessionManager::login)).

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use url::Url;

use crate::auth::error::{AuthError, AuthResult};
use crate::auth::tokens::{AccessToken, DeviceCodeResponse, TokenSet};

/// Grant type sent when polling the token endpoint.
pub const DEVICE_CODE_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:device_code";

/// Error codes the token endpoint may return while polling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceErrorCode {
    AuthorizationPending,
    SlowDown,
    AccessDenied,
    ExpiredToken,
    /// Anything else. Treated as fatal.
    Unrecognized(String),
}

impl From<String> for DeviceErrorCode {
    fn from(code: String) -> Self {
        match code.as_str() {
            "authorization_pending" => Self::AuthorizationPending,
            "slow_down" => Self::SlowDown,
            "access_denied" => Self::AccessDenied,
            "expired_token" => Self::ExpiredToken,
            _ => Self::Unrecognized(code),
        }
    }
}

impl DeviceErrorCode {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::AuthorizationPending => "authorization_pending",
            Self::SlowDown => "slow_down",
            Self::AccessDenied => "access_denied",
            Self::ExpiredToken => "expired_token",
            Self::Unrecognized(code) => code,
        }
    }
}

/// OAuth error body returned by the device endpoints.
#[derive(Debug, Deserialize)]
struct DeviceErrorResponse {
    #[serde(rename = "error")]
    code: String,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    error_uri: Option<String>,
}

impl DeviceErrorResponse {
    fn into_error(self) -> AuthError {
        match DeviceErrorCode::from(self.code) {
            DeviceErrorCode::AuthorizationPending => AuthError::AuthorizationPending,
            DeviceErrorCode::AccessDenied => AuthError::AuthorizationDenied,
            DeviceErrorCode::ExpiredToken => AuthError::AuthorizationExpired,
            code @ (DeviceErrorCode::SlowDown | DeviceErrorCode::Unrecognized(_)) => {
                AuthError::DeviceFlowRejected {
                    code: code.as_str().to_string(),
                    description: self.error_description,
                }
            },
        }
    }
}

/// Client for the device authorization and token endpoints.
#[derive(Debug, Clone)]
pub struct DeviceGrantClient {
    http: Client,
}

impl DeviceGrantClient {
    #[must_use]
    pub const fn new(http: Client) -> Self {
        Self { http }
    }

    /// Requests a device code for `client_id`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Transport`] on network failure and
    /// [`AuthError::Protocol`] if the response is not a usable device code.
    pub async fn request_device_code(
        &self,
        endpoint: &Url,
        client_id: &str,
    ) -> AuthResult<DeviceCodeResponse> {
        tracing::info!(url = %endpoint, client_id, "requesting device code");

        let response = self
            .http
            .post(endpoint.clone())
            .form(&[("client_id", client_id)])
            .send()
            .await
            .map_err(|e| AuthError::transport(endpoint, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AuthError::transport(endpoint, e))?;

        if !status.is_success() {
            return Err(match serde_json::from_str::<DeviceErrorResponse>(&body) {
                Ok(err) => err.into_error(),
                Err(_) => AuthError::protocol(endpoint, format!("HTTP {status}: {body}")),
            });
        }

        let device_code: DeviceCodeResponse = serde_json::from_str(&body)
            .map_err(|e| AuthError::protocol(endpoint, format!("invalid device code response: {e}")))?;

        if device_code.device_code.is_empty()
            || device_code.user_code.is_empty()
            || device_code.verification_uri.is_empty()
            || device_code.expires_in == 0
        {
            return Err(AuthError::protocol(
                endpoint,
                "device code response is missing required fields",
            ));
        }

        tracing::info!(
            expires_in = device_code.expires_in,
            interval = device_code.interval,
            "device code request successful"
        );
        Ok(device_code)
    }

    /// Polls the token endpoint once.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::AuthorizationPending`] while the user has not yet
    /// approved; every other error is terminal.
    pub async fn poll_for_token(
        &self,
        endpoint: &Url,
        client_id: &str,
        device_code: &str,
    ) -> AuthResult<AccessToken> {
        tracing::debug!(url = %endpoint, client_id, "polling for token");

        let response = self
            .http
            .post(endpoint.clone())
            .form(&[
                ("grant_type", DEVICE_CODE_GRANT_TYPE),
                ("device_code", device_code),
                ("client_id", client_id),
            ])
            .send()
            .await
            .map_err(|e| AuthError::transport(endpoint, e))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| AuthError::transport(endpoint, e))?;

        if status != StatusCode::OK {
            let err: DeviceErrorResponse = serde_json::from_slice(&body).map_err(|e| {
                AuthError::protocol(endpoint, format!("HTTP {status} with undecodable error body: {e}"))
            })?;
            if err.code != "authorization_pending" {
                tracing::warn!(
                    error = %err.code,
                    description = err.error_description.as_deref().unwrap_or_default(),
                    uri = err.error_uri.as_deref().unwrap_or_default(),
                    "device authorization failed"
                );
            }
            return Err(err.into_error());
        }

        let token: TokenSet = serde_json::from_slice(&body)
            .map_err(|e| AuthError::protocol(endpoint, format!("invalid token response: {e}")))?;
        if token.auth_token.is_empty() {
            return Err(AuthError::protocol(endpoint, "token response has an empty access_token"));
        }

        tracing::info!(expires_after = token.expires_after, "token received");
        Ok(AccessToken::received_now(token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const CLIENT_ID: &str = "344f59db-f401-4ce7-9407-00a0823fbacf";

    fn endpoint(server: &MockServer, p: &str) -> Url {
        Url::parse(&format!("{}{p}", server.uri())).unwrap()
    }

    #[test]
    fn error_codes_map_to_known_variants() {
        assert_eq!(
            DeviceErrorCode::from("authorization_pending".to_string()),
            DeviceErrorCode::AuthorizationPending
        );
        assert_eq!(
            DeviceErrorCode::from("access_denied".to_string()),
            DeviceErrorCode::AccessDenied
        );
        assert_eq!(
            DeviceErrorCode::from("something_new".to_string()),
            DeviceErrorCode::Unrecognized("something_new".to_string())
        );
    }

    #[tokio::test]
    async fn request_device_code_posts_client_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/device/authorize"))
            .and(body_string_contains(format!("client_id={CLIENT_ID}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "device_code": "dev-code",
                "user_code": "ABCD-EFGH",
                "verification_uri": "https://cloud.konghq.com/activate",
                "verification_uri_complete": "https://cloud.konghq.com/activate?code=ABCD-EFGH",
                "expires_in": 900,
                "interval": 5
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = DeviceGrantClient::new(Client::new());
        let resp = client
            .request_device_code(&endpoint(&server, "/device/authorize"), CLIENT_ID)
            .await
            .unwrap();

        assert_eq!(resp.device_code, "dev-code");
        assert_eq!(resp.user_code, "ABCD-EFGH");
        assert_eq!(resp.expires_in, 900);
        assert_eq!(resp.interval, 5);
    }

    #[tokio::test]
    async fn request_device_code_rejects_undecodable_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let client = DeviceGrantClient::new(Client::new());
        let err = client
            .request_device_code(&endpoint(&server, "/device/authorize"), CLIENT_ID)
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::Protocol { .. }));
    }

    #[tokio::test]
    async fn request_device_code_rejects_missing_fields() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "device_code": "dev-code",
                "user_code": "",
                "verification_uri": "https://cloud.konghq.com/activate",
                "expires_in": 900
            })))
            .mount(&server)
            .await;

        let client = DeviceGrantClient::new(Client::new());
        let err = client
            .request_device_code(&endpoint(&server, "/device/authorize"), CLIENT_ID)
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::Protocol { .. }));
    }

    #[tokio::test]
    async fn request_device_code_oauth_error_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/device/authorize"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "invalid_client",
                "error_description": "unknown client id",
            })))
            .mount(&server)
            .await;

        let client = DeviceGrantClient::new(Client::new());
        let err = client
            .request_device_code(&endpoint(&server, "/device/authorize"), CLIENT_ID)
            .await
            .unwrap_err();

        match err {
            AuthError::DeviceFlowRejected { code, description } => {
                assert_eq!(code, "invalid_client");
                assert_eq!(description.as_deref(), Some("unknown client id"));
            },
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn request_device_code_error_without_oauth_body_is_protocol_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let client = DeviceGrantClient::new(Client::new());
        let err = client
            .request_device_code(&endpoint(&server, "/device/authorize"), CLIENT_ID)
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::Protocol { ref message, .. } if message.contains("maintenance")));
    }

    #[tokio::test]
    async fn request_device_code_reports_transport_failure() {
        // Nothing listens on port 1.
        let url = Url::parse("http://127.0.0.1:1/device/authorize").unwrap();
        let client = DeviceGrantClient::new(Client::new());

        let err = client.request_device_code(&url, CLIENT_ID).await.unwrap_err();
        assert!(matches!(err, AuthError::Transport { .. }));
    }

    #[tokio::test]
    async fn poll_returns_token_on_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/device/token"))
            .and(body_string_contains("grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Adevice_code"))
            .and(body_string_contains("device_code=dev-code"))
            .and(body_string_contains(format!("client_id={CLIENT_ID}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "access-value",
                "refresh_token": "refresh-value",
                "token_type": "Bearer",
                "expires_in": 3600,
                "scope": ""
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = DeviceGrantClient::new(Client::new());
        let token = client
            .poll_for_token(&endpoint(&server, "/device/token"), CLIENT_ID, "dev-code")
            .await
            .unwrap();

        assert_eq!(token.auth_token(), "access-value");
        assert_eq!(token.refresh_token(), "refresh-value");
        assert_eq!(token.token.expires_after, 3600);
    }

    #[tokio::test]
    async fn poll_rejects_empty_access_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "",
                "refresh_token": "refresh-value",
                "token_type": "Bearer",
                "expires_in": 3600
            })))
            .mount(&server)
            .await;

        let client = DeviceGrantClient::new(Client::new());
        let err = client
            .poll_for_token(&endpoint(&server, "/device/token"), CLIENT_ID, "dev-code")
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::Protocol { .. }));
    }

    #[tokio::test]
    async fn poll_maps_pending_and_fatal_errors() {
        let cases = [
            ("authorization_pending", "pending"),
            ("access_denied", "denied"),
            ("expired_token", "expired"),
            ("invalid_grant", "rejected"),
        ];

        for (code, expected) in cases {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                    "error": code,
                    "error_description": "details",
                })))
                .mount(&server)
                .await;

            let client = DeviceGrantClient::new(Client::new());
            let err = client
                .poll_for_token(&endpoint(&server, "/device/token"), CLIENT_ID, "dev-code")
                .await
                .unwrap_err();

            let actual = match err {
                AuthError::AuthorizationPending => "pending",
                AuthError::AuthorizationDenied => "denied",
                AuthError::AuthorizationExpired => "expired",
                AuthError::DeviceFlowRejected { code: ref rejected, .. } if rejected == "invalid_grant" => {
                    "rejected"
                },
                other => panic!("unexpected error for {code}: {other:?}"),
            };
            assert_eq!(actual, expected, "error code {code}");
        }
    }

    #[tokio::test]
    async fn poll_with_undecodable_error_is_protocol_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let client = DeviceGrantClient::new(Client::new());
        let err = client
            .poll_for_token(&endpoint(&server, "/device/token"), CLIENT_ID, "dev-code")
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::Protocol { .. }));
    }
}
