/// Bearer authentication for the edge functions
///
/// Access tokens are platform-issued HS256 JWTs; verification needs only
/// the shared secret, no callback to the auth service.
use crate::error::{PartnerError, PartnerResult};
use axum::http::HeaderMap;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use uuid::Uuid;

/// The authenticated caller
#[derive(Debug, Clone, Copy)]
pub struct AuthedUser {
    pub id: Uuid,
}

#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
    #[allow(dead_code)]
    exp: usize,
}

/// Extract bearer token from the Authorization header
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer ").map(str::to_string))
}

/// Verify the bearer token and return the calling user
pub fn verify_bearer(headers: &HeaderMap, secret: &str) -> PartnerResult<AuthedUser> {
    let token = extract_bearer_token(headers)
        .ok_or_else(|| PartnerError::AuthRejected("No authorization header".to_string()))?;

    let mut validation = Validation::new(Algorithm::HS256);
    // Platform tokens carry an audience claim we don't enforce
    validation.validate_aud = false;

    let data = decode::<Claims>(
        &token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| {
        tracing::debug!("bearer verification failed: {}", e);
        PartnerError::AuthRejected("Unauthorized".to_string())
    })?;

    let id = Uuid::parse_str(&data.claims.sub)
        .map_err(|_| PartnerError::AuthRejected("Unauthorized".to_string()))?;

    Ok(AuthedUser { id })
}
