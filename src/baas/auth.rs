/// Platform auth endpoints
///
/// Thin wrappers over the hosted auth service: password grant, one-time
/// codes, sign-out and current-user lookup. Raw rejection messages are
/// preserved so the auth layer can categorize them.
use crate::baas::{extract_error_message, BaasClient};
use crate::error::{PartnerError, PartnerResult};
use crate::session::SessionData;
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::json;

/// Platform user as returned by the auth service
#[derive(Debug, Clone, Deserialize)]
pub struct BaasUser {
    pub id: String,
    pub email: Option<String>,
}

/// Token grant response from the auth service
#[derive(Debug, Deserialize)]
struct TokenGrant {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
    user: BaasUser,
}

impl TokenGrant {
    fn into_session(self) -> SessionData {
        SessionData {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at: self.expires_in.map(|secs| Utc::now() + Duration::seconds(secs)),
            user_id: self.user.id,
        }
    }
}

impl BaasClient {
    /// Exchange credentials for a session (password grant)
    pub async fn password_grant(&self, email: &str, password: &str) -> PartnerResult<SessionData> {
        let url = format!("{}/auth/v1/token?grant_type=password", self.base_url());

        let response = self
            .http()
            .post(&url)
            .header("apikey", self.anon_key())
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(auth_rejection(status, &body));
        }

        let grant: TokenGrant = response
            .json()
            .await
            .map_err(|e| PartnerError::Server(format!("Invalid token response: {}", e)))?;

        Ok(grant.into_session())
    }

    /// Request a one-time sign-in code for an existing account
    pub async fn send_otp(&self, email: &str) -> PartnerResult<()> {
        let url = format!("{}/auth/v1/otp", self.base_url());

        let response = self
            .http()
            .post(&url)
            .header("apikey", self.anon_key())
            .json(&json!({ "email": email, "create_user": false }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(auth_rejection(status, &body));
        }

        Ok(())
    }

    /// Verify a one-time code and establish a session
    pub async fn verify_otp(&self, email: &str, code: &str) -> PartnerResult<SessionData> {
        let url = format!("{}/auth/v1/verify", self.base_url());

        let response = self
            .http()
            .post(&url)
            .header("apikey", self.anon_key())
            .json(&json!({ "type": "email", "email": email, "token": code }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(auth_rejection(status, &body));
        }

        let grant: TokenGrant = response
            .json()
            .await
            .map_err(|e| PartnerError::Server(format!("Invalid token response: {}", e)))?;

        Ok(grant.into_session())
    }

    /// Revoke the current session server-side
    pub async fn sign_out(&self) -> PartnerResult<()> {
        let url = format!("{}/auth/v1/logout", self.base_url());

        let response = self
            .http()
            .post(&url)
            .header("apikey", self.anon_key())
            .bearer_auth(self.bearer())
            .send()
            .await?;

        // An already-expired token still counts as signed out
        let status = response.status();
        if !status.is_success() && status != reqwest::StatusCode::UNAUTHORIZED {
            let body = response.text().await.unwrap_or_default();
            return Err(auth_rejection(status, &body));
        }

        Ok(())
    }

    /// Fetch the user behind the current session, if any
    pub async fn fetch_user(&self) -> PartnerResult<Option<BaasUser>> {
        if self.session().current().is_none() {
            return Ok(None);
        }

        let url = format!("{}/auth/v1/user", self.base_url());

        let response = self
            .http()
            .get(&url)
            .header("apikey", self.anon_key())
            .bearer_auth(self.bearer())
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(auth_rejection(status, &body));
        }

        let user: BaasUser = response
            .json()
            .await
            .map_err(|e| PartnerError::Server(format!("Invalid user response: {}", e)))?;

        Ok(Some(user))
    }
}

/// Map a non-success auth response to the error taxonomy, keeping the raw
/// platform message for downstream categorization
fn auth_rejection(status: reqwest::StatusCode, body: &str) -> PartnerError {
    let message = extract_error_message(body);
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return PartnerError::RateLimited {
            retry_after: std::time::Duration::from_secs(60),
        };
    }
    if status.is_server_error() {
        return PartnerError::Server(message);
    }
    PartnerError::AuthRejected(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_keeps_raw_platform_message() {
        let err = auth_rejection(
            reqwest::StatusCode::BAD_REQUEST,
            r#"{"msg":"Invalid login credentials"}"#,
        );
        match err {
            PartnerError::AuthRejected(message) => {
                assert_eq!(message, "Invalid login credentials");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn too_many_requests_maps_to_rate_limited() {
        let err = auth_rejection(reqwest::StatusCode::TOO_MANY_REQUESTS, "");
        assert!(matches!(err, PartnerError::RateLimited { .. }));
    }

    #[test]
    fn server_errors_stay_server_errors() {
        let err = auth_rejection(reqwest::StatusCode::INTERNAL_SERVER_ERROR, "oops");
        assert!(matches!(err, PartnerError::Server(_)));
    }

    #[test]
    fn grant_converts_to_session_with_expiry() {
        let grant = TokenGrant {
            access_token: "jwt".to_string(),
            refresh_token: Some("refresh".to_string()),
            expires_in: Some(3600),
            user: BaasUser {
                id: "user-1".to_string(),
                email: Some("user@example.com".to_string()),
            },
        };

        let session = grant.into_session();
        assert_eq!(session.access_token, "jwt");
        assert_eq!(session.user_id, "user-1");
        assert!(session.expires_at.is_some());
    }
}
