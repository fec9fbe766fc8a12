/// Platform database reads
///
/// Minimal-projection queries over the platform's REST query surface. The
/// authorization path reads only the columns it needs; the media listing
/// carries the canonical display order.
use crate::baas::{extract_error_message, BaasClient};
use crate::error::{PartnerError, PartnerResult};
use crate::media::models::MediaRecord;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

/// Service-provider profile linked one-to-one with an account
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderProfile {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub username: String,
    pub name: String,
    pub is_blocked: bool,
}

#[derive(Debug, Deserialize)]
struct BanFlagRow {
    is_banned: bool,
}

impl BaasClient {
    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url(), table)
    }

    /// Look up the provider profile linked to an account, if any
    pub async fn provider_profile_for(&self, user_id: &str) -> PartnerResult<Option<ProviderProfile>> {
        let user_filter = format!("eq.{}", user_id);
        let response = self
            .http()
            .get(self.rest_url("provider_profiles"))
            .header("apikey", self.anon_key())
            .bearer_auth(self.bearer())
            .query(&[
                ("select", "id,user_id,username,name,is_blocked"),
                ("user_id", user_filter.as_str()),
                ("limit", "1"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(rest_error(status, &body));
        }

        let rows: Vec<ProviderProfile> = response
            .json()
            .await
            .map_err(|e| PartnerError::Server(format!("Invalid profile response: {}", e)))?;

        Ok(rows.into_iter().next())
    }

    /// Read the account ban flag, defaulting to not-banned when the row is absent
    pub async fn account_ban_flag(&self, user_id: &str) -> PartnerResult<bool> {
        let user_filter = format!("eq.{}", user_id);
        let response = self
            .http()
            .get(self.rest_url("user_profiles"))
            .header("apikey", self.anon_key())
            .bearer_auth(self.bearer())
            .query(&[
                ("select", "is_banned"),
                ("id", user_filter.as_str()),
                ("limit", "1"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(rest_error(status, &body));
        }

        let rows: Vec<BanFlagRow> = response
            .json()
            .await
            .map_err(|e| PartnerError::Server(format!("Invalid ban flag response: {}", e)))?;

        Ok(rows.first().map(|r| r.is_banned).unwrap_or(false))
    }

    /// List a profile's media in display order: sort_order ascending, ties
    /// broken by newest creation first
    pub async fn list_media(&self, provider_id: Uuid) -> PartnerResult<Vec<MediaRecord>> {
        let provider_filter = format!("eq.{}", provider_id);
        let response = self
            .http()
            .get(self.rest_url("provider_media"))
            .header("apikey", self.anon_key())
            .bearer_auth(self.bearer())
            .query(&[
                ("select", "*"),
                ("provider_id", provider_filter.as_str()),
                ("order", "sort_order.asc,created_at.desc"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(rest_error(status, &body));
        }

        response
            .json()
            .await
            .map_err(|e| PartnerError::Server(format!("Invalid media listing: {}", e)))
    }

    /// Count the items charged against the quota: pending and approved only
    pub async fn count_quota_media(&self, provider_id: Uuid) -> PartnerResult<u32> {
        let provider_filter = format!("eq.{}", provider_id);
        let response = self
            .http()
            .head(self.rest_url("provider_media"))
            .header("apikey", self.anon_key())
            .bearer_auth(self.bearer())
            .header("Prefer", "count=exact")
            .query(&[
                ("select", "id"),
                ("provider_id", provider_filter.as_str()),
                ("status", "in.(pending,approved)"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(rest_error(status, ""));
        }

        let content_range = response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        parse_content_range_total(&content_range)
            .ok_or_else(|| PartnerError::Server(format!("Invalid count response: {:?}", content_range)))
    }

    /// Record login telemetry on the account row. Callers treat this as
    /// best-effort; failures surface as errors here and are dropped by the
    /// telemetry queue.
    pub async fn record_login_telemetry(
        &self,
        user_id: &str,
        device_id: &str,
        at: chrono::DateTime<chrono::Utc>,
    ) -> PartnerResult<()> {
        let user_filter = format!("eq.{}", user_id);
        let response = self
            .http()
            .patch(self.rest_url("user_profiles"))
            .header("apikey", self.anon_key())
            .bearer_auth(self.bearer())
            .header("Prefer", "return=minimal")
            .query(&[("id", user_filter.as_str())])
            .json(&json!({
                "last_device_id": device_id,
                "last_login_at": at.to_rfc3339(),
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(rest_error(status, &body));
        }

        Ok(())
    }
}

/// Parse the total from a `Content-Range` header, e.g. `0-9/25` or `*/0`
pub(crate) fn parse_content_range_total(value: &str) -> Option<u32> {
    value.rsplit_once('/').and_then(|(_, total)| total.trim().parse().ok())
}

fn rest_error(status: reqwest::StatusCode, body: &str) -> PartnerError {
    let message = extract_error_message(body);
    match status.as_u16() {
        401 => PartnerError::AuthRejected(message),
        403 => PartnerError::Ownership(message),
        404 => PartnerError::NotFound(message),
        _ if status.is_server_error() => PartnerError::Server(message),
        _ => PartnerError::InvalidInput(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_content_range_totals() {
        assert_eq!(parse_content_range_total("0-9/25"), Some(25));
        assert_eq!(parse_content_range_total("*/0"), Some(0));
        assert_eq!(parse_content_range_total("0-29/30"), Some(30));
    }

    #[test]
    fn rejects_malformed_content_range() {
        assert_eq!(parse_content_range_total(""), None);
        assert_eq!(parse_content_range_total("0-9"), None);
        assert_eq!(parse_content_range_total("0-9/*"), None);
    }

    #[test]
    fn rest_errors_map_to_taxonomy() {
        assert!(matches!(
            rest_error(reqwest::StatusCode::UNAUTHORIZED, ""),
            PartnerError::AuthRejected(_)
        ));
        assert!(matches!(
            rest_error(reqwest::StatusCode::FORBIDDEN, ""),
            PartnerError::Ownership(_)
        ));
        assert!(matches!(
            rest_error(reqwest::StatusCode::NOT_FOUND, ""),
            PartnerError::NotFound(_)
        ));
        assert!(matches!(
            rest_error(reqwest::StatusCode::BAD_GATEWAY, ""),
            PartnerError::Server(_)
        ));
    }
}
