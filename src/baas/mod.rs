/// Platform (BaaS) contract client
///
/// The narrow surface of the hosted platform the client core depends on:
/// auth (password grant, OTP, sign-out, current user), minimal-projection
/// database reads, and signed-URL storage operations. Everything behind
/// these calls (token issuance, row-level security, object storage) is the
/// platform's own machinery and out of scope.
pub mod auth;
pub mod db;
pub mod storage;

pub use db::ProviderProfile;
pub use storage::StorageAdmin;

use crate::config::ClientConfig;
use crate::error::{PartnerError, PartnerResult};
use crate::session::SessionHolder;
use std::sync::Arc;

/// User agent sent with every platform request
const USER_AGENT: &str = "lumera-partner/0.1";

/// Request timeout for platform calls
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Platform client carrying the publishable key and the injected session
#[derive(Clone)]
pub struct BaasClient {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
    session: Arc<SessionHolder>,
}

impl BaasClient {
    /// Create a new platform client
    pub fn new(config: &ClientConfig, session: Arc<SessionHolder>) -> PartnerResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| PartnerError::Server(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.platform.base_url.trim_end_matches('/').to_string(),
            anon_key: config.platform.anon_key.clone(),
            session,
        })
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub(crate) fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn anon_key(&self) -> &str {
        &self.anon_key
    }

    pub(crate) fn session(&self) -> &SessionHolder {
        &self.session
    }

    /// Bearer token for authenticated calls: the session's access token,
    /// falling back to the publishable key the way the platform SDK does
    pub(crate) fn bearer(&self) -> String {
        self.session
            .access_token()
            .unwrap_or_else(|| self.anon_key.clone())
    }
}

/// Extract a human-readable message from a platform error body.
///
/// The platform is inconsistent about the field name across services, so
/// probe the known spellings in order before falling back to the raw body.
pub(crate) fn extract_error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for field in ["msg", "error_description", "message", "error"] {
            if let Some(text) = value.get(field).and_then(|v| v.as_str()) {
                return text.to_string();
            }
        }
    }
    if body.trim().is_empty() {
        "Unknown platform error".to_string()
    } else {
        body.trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_known_error_fields_in_order() {
        assert_eq!(
            extract_error_message(r#"{"msg":"Invalid login credentials"}"#),
            "Invalid login credentials"
        );
        assert_eq!(
            extract_error_message(r#"{"error_description":"Token has expired"}"#),
            "Token has expired"
        );
        assert_eq!(
            extract_error_message(r#"{"error":"invalid_grant","error_description":"bad"}"#),
            "bad"
        );
        assert_eq!(extract_error_message(r#"{"error":"not json field"}"#), "not json field");
    }

    #[test]
    fn falls_back_to_raw_body() {
        assert_eq!(extract_error_message("plain text failure"), "plain text failure");
        assert_eq!(extract_error_message(""), "Unknown platform error");
        assert_eq!(extract_error_message(r#"{"unrelated":1}"#), r#"{"unrelated":1}"#);
    }
}
