//! Request/response tracing with credential redaction.

use std::time::Instant;

use async_trait::async_trait;
use http::header::{HeaderMap, HeaderName, AUTHORIZATION, COOKIE, SET_COOKIE};
use http::Extensions;
use reqwest::{Request, Response};
use reqwest_middleware::{Middleware, Next, Result};

const REDACTED: &str = "[REDACTED]";

/// Logs each request at debug level and headers at trace level.
///
/// `Authorization`, `Cookie` and `Set-Cookie` values are never written.
#[derive(Debug, Default)]
pub struct LoggingMiddleware;

fn is_sensitive(name: &HeaderName) -> bool {
    name == AUTHORIZATION || name == COOKIE || name == SET_COOKIE
}

/// Renders headers as `name: value` lines with credentials masked.
pub(crate) fn redact_headers(headers: &HeaderMap) -> String {
    headers
        .iter()
        .map(|(name, value)| {
            let shown = if is_sensitive(name) {
                REDACTED
            } else {
                value.to_str().unwrap_or("<binary>")
            };
            format!("{name}: {shown}")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait]
impl Middleware for LoggingMiddleware {
    async fn handle(
        &self,
        req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> Result<Response> {
        let method = req.method().clone();
        let url = req.url().clone();
        tracing::debug!(%method, %url, "sending request");
        tracing::trace!(headers = %redact_headers(req.headers()), "request headers");

        let started = Instant::now();
        let result = next.run(req, extensions).await;
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        match &result {
            Ok(response) => {
                tracing::debug!(%method, %url, status = response.status().as_u16(), elapsed_ms, "received response");
                tracing::trace!(headers = %redact_headers(response.headers()), "response headers");
            },
            Err(err) => tracing::debug!(%method, %url, elapsed_ms, error = %err, "request failed"),
        }

        result
    }
}
