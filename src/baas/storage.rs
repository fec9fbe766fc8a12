/// Platform object storage operations
///
/// Client-side signing of time-limited download URLs, and the service-key
/// administration surface the edge functions use: signed upload URLs,
/// prefix listing and object removal.
use crate::baas::{extract_error_message, BaasClient};
use crate::error::{PartnerError, PartnerResult};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
struct SignedDownload {
    #[serde(rename = "signedURL")]
    signed_url: String,
}

#[derive(Debug, Deserialize)]
struct SignedUpload {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ListedObject {
    name: String,
}

/// Percent-encode an object key, keeping `/` as the path separator
fn encode_key(key: &str) -> String {
    key.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

fn storage_error(status: reqwest::StatusCode, body: &str) -> PartnerError {
    let message = extract_error_message(body);
    match status.as_u16() {
        401 => PartnerError::AuthRejected(message),
        403 => PartnerError::Ownership(message),
        404 => PartnerError::NotFound(message),
        _ if status.is_server_error() => PartnerError::Server(message),
        _ => PartnerError::InvalidInput(message),
    }
}

impl BaasClient {
    /// Mint a time-limited download URL for one object
    pub async fn sign_download_url(
        &self,
        bucket: &str,
        key: &str,
        expires_secs: u32,
    ) -> PartnerResult<String> {
        let url = format!(
            "{}/storage/v1/object/sign/{}/{}",
            self.base_url(),
            bucket,
            encode_key(key)
        );

        let response = self
            .http()
            .post(&url)
            .header("apikey", self.anon_key())
            .bearer_auth(self.bearer())
            .json(&json!({ "expiresIn": expires_secs }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(storage_error(status, &body));
        }

        let signed: SignedDownload = response
            .json()
            .await
            .map_err(|e| PartnerError::Server(format!("Invalid signing response: {}", e)))?;

        Ok(format!(
            "{}/storage/v1{}",
            self.base_url(),
            signed.signed_url
        ))
    }
}

/// Service-key storage administration used by the edge functions
#[derive(Clone)]
pub struct StorageAdmin {
    http: reqwest::Client,
    base_url: String,
    service_key: String,
}

impl StorageAdmin {
    /// Create a new storage administration client
    pub fn new(platform_url: &str, service_key: &str) -> PartnerResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(super::USER_AGENT)
            .timeout(std::time::Duration::from_secs(super::REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| PartnerError::Server(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: platform_url.trim_end_matches('/').to_string(),
            service_key: service_key.to_string(),
        })
    }

    /// Mint a one-time signed upload URL for one object
    pub async fn sign_upload_url(&self, bucket: &str, key: &str) -> PartnerResult<String> {
        let url = format!(
            "{}/storage/v1/object/upload/sign/{}/{}",
            self.base_url,
            bucket,
            encode_key(key)
        );

        let response = self
            .http
            .post(&url)
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(storage_error(status, &body));
        }

        let signed: SignedUpload = response
            .json()
            .await
            .map_err(|e| PartnerError::Server(format!("Invalid signing response: {}", e)))?;

        // The platform returns a path relative to the storage root
        Ok(format!("{}/storage/v1{}", self.base_url, signed.url))
    }

    /// List object names directly under a prefix
    pub async fn list_objects(&self, bucket: &str, prefix: &str) -> PartnerResult<Vec<String>> {
        let url = format!("{}/storage/v1/object/list/{}", self.base_url, bucket);

        let response = self
            .http
            .post(&url)
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .json(&json!({ "prefix": prefix, "limit": 100 }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(storage_error(status, &body));
        }

        let objects: Vec<ListedObject> = response
            .json()
            .await
            .map_err(|e| PartnerError::Server(format!("Invalid listing response: {}", e)))?;

        Ok(objects.into_iter().map(|o| o.name).collect())
    }

    /// Remove a set of objects from a bucket
    pub async fn remove_objects(&self, bucket: &str, keys: &[String]) -> PartnerResult<()> {
        if keys.is_empty() {
            return Ok(());
        }

        let url = format!("{}/storage/v1/object/{}", self.base_url, bucket);

        let response = self
            .http
            .delete(&url)
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .json(&json!({ "prefixes": keys }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(storage_error(status, &body));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_encoding_keeps_path_separators() {
        assert_eq!(encode_key("user-1/abcd/main.jpg"), "user-1/abcd/main.jpg");
        assert_eq!(encode_key("user 1/a b.jpg"), "user%201/a%20b.jpg");
    }

    #[test]
    fn storage_errors_map_to_taxonomy() {
        assert!(matches!(
            storage_error(reqwest::StatusCode::NOT_FOUND, r#"{"message":"Object not found"}"#),
            PartnerError::NotFound(_)
        ));
        assert!(matches!(
            storage_error(reqwest::StatusCode::FORBIDDEN, ""),
            PartnerError::Ownership(_)
        ));
    }
}
