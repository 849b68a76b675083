//! Authentication middleware for injecting Bearer tokens.

use async_trait::async_trait;
use http::{Extensions, HeaderValue};
use reqwest::{Request, Response};
use reqwest_middleware::{Middleware, Next, Result};

use crate::error::KongctlError;

/// Middleware that injects the Bearer token into requests.
///
/// The token is resolved once per command by the session manager, so it is
/// held by value here.
pub struct AuthMiddleware {
    header: HeaderValue,
}

impl AuthMiddleware {
    /// Create a new authentication middleware.
    ///
    /// # Errors
    ///
    /// Returns [`KongctlError::Config`] if the token cannot be sent as a
    /// header value, e.g. it contains a newline.
    pub fn new(token: &str) -> std::result::Result<Self, KongctlError> {
        let mut header = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| {
            KongctlError::Config(
                "invalid access token: it contains characters not allowed in an HTTP header".to_string(),
            )
        })?;
        header.set_sensitive(true);
        Ok(Self { header })
    }
}

#[async_trait]
impl Middleware for AuthMiddleware {
    async fn handle(
        &self,
        mut req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> Result<Response> {
        req.headers_mut()
            .insert(http::header::AUTHORIZATION, self.header.clone());

        next.run(req, extensions).await
    }
}
