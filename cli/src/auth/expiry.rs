//! Token expiry resolution.
//!
//! Konnect has been seen to declare an `expires_in` that disagrees with the
//! `exp` claim inside the JWT it issues. The API enforces the claim, so a
//! self-describing token's own `exp` wins; the declared lifetime is only a
//! fallback for opaque tokens.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

use crate::auth::tokens::AccessToken;

/// Why a token could not be read as a self-describing JWT.
#[derive(Error, Debug)]
pub enum ExpiryError {
    #[error("not a JWT: expected 3 parts, got {0}")]
    NotAJwt(usize),

    #[error("failed to decode JWT payload: {0}")]
    Payload(#[from] base64::DecodeError),

    #[error("failed to parse JWT claims: {0}")]
    Claims(#[from] serde_json::Error),

    #[error("JWT does not contain an exp claim")]
    MissingExp,
}

#[derive(Deserialize)]
struct Claims {
    #[serde(default)]
    exp: Option<i64>,
}

/// Seconds until the JWT's `exp` claim, clamped at zero.
pub fn jwt_expires_in(token: &str) -> Result<i64, ExpiryError> {
    jwt_expires_in_at(token, Utc::now())
}

fn jwt_expires_in_at(token: &str, now: DateTime<Utc>) -> Result<i64, ExpiryError> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err(ExpiryError::NotAJwt(parts.len()));
    }

    let payload = URL_SAFE_NO_PAD.decode(parts[1].trim_end_matches('='))?;
    let claims: Claims = serde_json::from_slice(&payload)?;

    match claims.exp {
        Some(exp) if exp != 0 => Ok(exp.saturating_sub(now.timestamp()).max(0)),
        _ => Err(ExpiryError::MissingExp),
    }
}

/// Remaining lifetime of `token` in seconds, never negative.
///
/// Uses the JWT `exp` claim when the access token carries one. Otherwise
/// falls back to the declared `expires_in`, measured from `received_at`.
/// Zero means expired.
pub fn resolve_expiry(token: &AccessToken) -> i64 {
    resolve_expiry_at(token, Utc::now())
}

pub(crate) fn resolve_expiry_at(token: &AccessToken, now: DateTime<Utc>) -> i64 {
    match jwt_expires_in_at(token.auth_token(), now) {
        Ok(secs) => secs,
        Err(err) => {
            tracing::debug!(error = %err, "token is not self-describing, using declared expires_in");
            declared_remaining(token, now)
        }
    }
}

fn declared_remaining(token: &AccessToken, now: DateTime<Utc>) -> i64 {
    match token.declared_expires_at() {
        Some(expires_at) => (expires_at - now).num_seconds().max(0),
        None => {
            tracing::warn!(
                expires_after = token.token.expires_after,
                "declared lifetime out of range, treating token as expired"
            );
            0
        },
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::auth::tokens::TokenSet;

    /// Builds an unsigned JWT carrying the given `exp` claim.
    pub(crate) fn build_test_jwt(exp: i64) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
        let payload = serde_json::json!({ "exp": exp, "iat": exp.saturating_sub(900) });
        let payload = URL_SAFE_NO_PAD.encode(payload.to_string());
        format!("{header}.{payload}.signature")
    }

    fn access_token(auth_token: String, expires_after: i64, received_at: DateTime<Utc>) -> AccessToken {
        AccessToken {
            token: TokenSet {
                auth_token,
                refresh_token: "refresh".to_string(),
                token_type: "Bearer".to_string(),
                expires_after,
                scope: String::new(),
            },
            received_at,
        }
    }

    #[test]
    fn future_expiry() {
        let exp = Utc::now().timestamp() + 900;
        let secs = jwt_expires_in(&build_test_jwt(exp)).unwrap();
        assert!((895..=900).contains(&secs), "got {secs}");
    }

    #[test]
    fn already_expired_clamps_to_zero() {
        let exp = Utc::now().timestamp() - 60;
        assert_eq!(jwt_expires_in(&build_test_jwt(exp)).unwrap(), 0);
    }

    #[test]
    fn not_a_jwt() {
        let err = jwt_expires_in("not-a-jwt").unwrap_err();
        assert!(matches!(err, ExpiryError::NotAJwt(1)));
        assert!(err.to_string().contains("not a JWT"));
    }

    #[test]
    fn invalid_base64_payload() {
        let err = jwt_expires_in("header.!!!invalid!!!.signature").unwrap_err();
        assert!(err.to_string().contains("failed to decode JWT payload"));
    }

    #[test]
    fn invalid_json_payload() {
        let payload = URL_SAFE_NO_PAD.encode("not json");
        let err = jwt_expires_in(&format!("h.{payload}.s")).unwrap_err();
        assert!(err.to_string().contains("failed to parse JWT claims"));
    }

    #[test]
    fn missing_exp_claim() {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256"}"#);
        let payload = URL_SAFE_NO_PAD.encode(br#"{"sub":"user123"}"#);
        let err = jwt_expires_in(&format!("{header}.{payload}.sig")).unwrap_err();
        assert!(err.to_string().contains("exp claim"));
    }

    #[test]
    fn jwt_exp_takes_precedence_over_declared_lifetime() {
        // Server declares an hour but the token itself expires in 15 minutes.
        let now = Utc::now();
        let token = access_token(build_test_jwt(now.timestamp() + 900), 3600, now);

        assert_eq!(resolve_expiry_at(&token, now), 900);
    }

    #[test]
    fn jwt_exp_in_the_past_resolves_to_zero_despite_declared_lifetime() {
        let now = Utc::now();
        let token = access_token(build_test_jwt(now.timestamp() - 10), 3600, now);

        assert_eq!(resolve_expiry_at(&token, now), 0);
    }

    #[test]
    fn opaque_token_falls_back_to_declared_lifetime() {
        let now = Utc::now();
        let token = access_token("opaque-token".to_string(), 3600, now - chrono::Duration::seconds(600));

        assert_eq!(resolve_expiry_at(&token, now), 3000);
    }

    #[test]
    fn out_of_range_declared_lifetime_is_expired() {
        let now = Utc::now();
        let huge = access_token("opaque-token".to_string(), 10_000_000_000_000_000, now);
        let negative = access_token("opaque-token".to_string(), i64::MIN, now);

        assert_eq!(resolve_expiry_at(&huge, now), 0);
        assert!(huge.is_expired());
        assert_eq!(resolve_expiry_at(&negative, now), 0);
        assert!(negative.is_expired());
    }

    #[test]
    fn extreme_exp_claims_do_not_overflow() {
        let now = Utc::now();
        assert_eq!(jwt_expires_in_at(&build_test_jwt(i64::MIN + 1), now).unwrap(), 0);
        assert_eq!(jwt_expires_in_at(&build_test_jwt(i64::MAX), now).unwrap(), i64::MAX - now.timestamp());
    }

    #[test]
    fn opaque_token_past_declared_lifetime_resolves_to_zero() {
        let now = Utc::now();
        let token = access_token("opaque-token".to_string(), 3600, now - chrono::Duration::hours(2));

        assert_eq!(resolve_expiry_at(&token, now), 0);
    }
}
