/// Edge-function client
///
/// Calls the three server endpoints fronting the platform database and
/// storage: `get-upload-url`, `remove-tmp` and `reorder`. Requires a bearer
/// session; non-success responses carry a JSON `{error}` body that is folded
/// into the error taxonomy by status.
use crate::config::ClientConfig;
use crate::error::{PartnerError, PartnerResult};
use crate::media::models::{GetUploadUrlRequest, GetUploadUrlResponse, ReorderItem};
use crate::session::SessionHolder;
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

/// Seam for the three edge functions
#[async_trait]
pub trait EdgeApi: Send + Sync {
    async fn get_upload_url(&self, request: &GetUploadUrlRequest)
        -> PartnerResult<GetUploadUrlResponse>;
    async fn remove_tmp(&self, media_id: Uuid) -> PartnerResult<()>;
    async fn reorder(&self, provider_id: Uuid, items: &[ReorderItem]) -> PartnerResult<()>;
}

/// HTTP client for the edge functions
#[derive(Clone)]
pub struct EdgeClient {
    http: reqwest::Client,
    functions_url: String,
    anon_key: String,
    session: Arc<SessionHolder>,
}

impl EdgeClient {
    pub fn new(config: &ClientConfig, session: Arc<SessionHolder>) -> PartnerResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent("lumera-partner/0.1")
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| PartnerError::Server(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            functions_url: config.platform.functions_url.trim_end_matches('/').to_string(),
            anon_key: config.platform.anon_key.clone(),
            session,
        })
    }

    async fn invoke<T: serde::de::DeserializeOwned>(
        &self,
        name: &str,
        body: serde_json::Value,
    ) -> PartnerResult<T> {
        let token = self
            .session
            .access_token()
            .ok_or_else(|| PartnerError::AuthRejected("No active session".to_string()))?;

        let url = format!("{}/{}", self.functions_url, name);

        let response = self
            .http
            .post(&url)
            .header("apikey", &self.anon_key)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(function_error(status, &body));
        }

        response
            .json()
            .await
            .map_err(|e| PartnerError::Server(format!("Invalid response from {}: {}", name, e)))
    }
}

/// Map a non-success function response to the error taxonomy
fn function_error(status: reqwest::StatusCode, body: &str) -> PartnerError {
    let message = crate::baas::extract_error_message(body);
    match status.as_u16() {
        400 => PartnerError::InvalidInput(message),
        401 => PartnerError::AuthRejected(message),
        403 => PartnerError::Ownership(message),
        404 => PartnerError::NotFound(message),
        409 => PartnerError::QuotaExceeded(message),
        429 => PartnerError::RateLimited {
            retry_after: std::time::Duration::from_secs(1),
        },
        _ => PartnerError::Server(message),
    }
}

#[async_trait]
impl EdgeApi for EdgeClient {
    async fn get_upload_url(
        &self,
        request: &GetUploadUrlRequest,
    ) -> PartnerResult<GetUploadUrlResponse> {
        tracing::debug!(
            provider_id = %request.provider_id,
            kind = request.kind.as_str(),
            has_thumb = request.has_thumb,
            "requesting upload url"
        );

        self.invoke(
            "get-upload-url",
            serde_json::to_value(request)
                .map_err(|e| PartnerError::Server(format!("Failed to encode request: {}", e)))?,
        )
        .await
    }

    async fn remove_tmp(&self, media_id: Uuid) -> PartnerResult<()> {
        #[derive(serde::Deserialize)]
        struct Ack {
            #[allow(dead_code)]
            ok: bool,
        }

        let _: Ack = self
            .invoke("remove-tmp", json!({ "media_id": media_id }))
            .await?;
        Ok(())
    }

    async fn reorder(&self, provider_id: Uuid, items: &[ReorderItem]) -> PartnerResult<()> {
        #[derive(serde::Deserialize)]
        struct Ack {
            #[allow(dead_code)]
            ok: bool,
        }

        let _: Ack = self
            .invoke(
                "reorder",
                json!({ "provider_id": provider_id, "items": items }),
            )
            .await?;
        Ok(())
    }
}
