//! HMAC bearer-token authentication for the thin HTTP surface.
//! Generalizes the teacher's fixed GROK/CLAUDE key pair to the
//! configurable `api_auth.keys` list (spec.md §6).

use axum::{extract::Request, http::StatusCode, middleware::Next, response::Response};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::collections::HashMap;

use super::types::AuthenticatedKey;
use super::AppState;

type HmacSha256 = Hmac<Sha256>;

/// Known keys, each identified by a `key_id` and holding a decoded
/// base64 secret.
#[derive(Clone, Default)]
pub struct ApiKeys {
    secrets: HashMap<String, Vec<u8>>,
}

impl ApiKeys {
    #[must_use]
    pub fn from_base64(keys: &[(String, String)]) -> Self {
        let secrets = keys.iter().filter_map(|(id, b64)| BASE64.decode(b64).ok().map(|secret| (id.clone(), secret))).collect();
        Self { secrets }
    }

    /// Token format: `<key_id>:<base64 hmac signature of key_id>`.
    #[must_use]
    pub fn validate(&self, token: &str) -> Option<AuthenticatedKey> {
        let (key_id, signature) = token.split_once(':')?;
        let secret = self.secrets.get(key_id)?;
        let provided = BASE64.decode(signature).ok()?;
        let mut mac = HmacSha256::new_from_slice(secret).ok()?;
        mac.update(key_id.as_bytes());
        mac.verify_slice(&provided).ok()?;
        Some(AuthenticatedKey { key_id: key_id.to_string() })
    }

    #[must_use]
    pub fn sign(key_id: &str, secret: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(secret).expect("hmac accepts any key size");
        mac.update(key_id.as_bytes());
        format!("{key_id}:{}", BASE64.encode(mac.finalize().into_bytes()))
    }
}

fn extract_bearer_token(req: &Request) -> Option<&str> {
    req.headers().get(axum::http::header::AUTHORIZATION)?.to_str().ok()?.strip_prefix("Bearer ")
}

pub async fn require_auth(axum::extract::State(state): axum::extract::State<AppState>, req: Request, next: Next) -> Result<Response, StatusCode> {
    if !state.auth_enabled {
        return Ok(next.run(req).await);
    }
    let token = extract_bearer_token(&req).ok_or(StatusCode::UNAUTHORIZED)?;
    let authenticated = state.api_keys.validate(token).ok_or(StatusCode::UNAUTHORIZED)?;
    if matches!(
        state.rate_limiter.check(&authenticated.key_id, &super::rate_limit::RateLimitConfig::default()),
        super::rate_limit::RateLimitResult::Exceeded { .. }
    ) {
        return Err(StatusCode::TOO_MANY_REQUESTS);
    }
    let mut req = req;
    req.extensions_mut().insert(authenticated);
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_token_validates() {
        let secret = b"a_32_byte_test_secret_padded!!!!";
        let token = ApiKeys::sign("node-a", secret);
        let keys = ApiKeys::from_base64(&[("node-a".to_string(), BASE64.encode(secret))]);
        let result = keys.validate(&token);
        assert_eq!(result.unwrap().key_id, "node-a");
    }

    #[test]
    fn tampered_signature_is_rejected() {
        let keys = ApiKeys::from_base64(&[("node-a".to_string(), BASE64.encode(b"secret"))]);
        assert!(keys.validate("node-a:not_a_real_signature").is_none());
    }

    #[test]
    fn unknown_key_id_is_rejected() {
        let keys = ApiKeys::default();
        assert!(keys.validate("ghost:anything").is_none());
    }
}
