/// get-upload-url
///
/// Allocates storage paths, mints one-time signed upload URLs and inserts
/// the pending draft record, enforcing ownership and the media quota. The
/// draft exists before any byte is transferred.
use crate::error::{PartnerError, PartnerResult};
use crate::functions::{auth, db, FunctionsContext};
use crate::media::constants::MAX_MEDIA_PER_PROFILE;
use crate::media::models::{GetUploadUrlResponse, MediaKind, MediaMeta};
use crate::metrics;
use axum::{extract::State, http::HeaderMap, Json};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct GetUploadUrlPayload {
    pub provider_id: Uuid,
    pub kind: MediaKind,
    #[validate(length(min = 1, max = 8))]
    pub ext: String,
    #[serde(rename = "hasThumb", default)]
    pub has_thumb: bool,
    pub meta: Option<MediaMeta>,
}

pub async fn get_upload_url(
    State(ctx): State<FunctionsContext>,
    headers: HeaderMap,
    Json(payload): Json<GetUploadUrlPayload>,
) -> PartnerResult<Json<GetUploadUrlResponse>> {
    let user = auth::verify_bearer(&headers, &ctx.config.jwt_secret)?;

    payload
        .validate()
        .map_err(|e| PartnerError::InvalidInput(e.to_string()))?;
    if !payload.ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(PartnerError::InvalidInput(
            "Extension must be alphanumeric".to_string(),
        ));
    }

    if !db::provider_owned_by(&ctx.db, payload.provider_id, user.id).await? {
        return Err(PartnerError::Ownership(
            "Not your provider profile".to_string(),
        ));
    }

    // Authoritative quota boundary: pending + approved at draft creation
    let count = db::quota_count(&ctx.db, payload.provider_id).await?;
    if count >= MAX_MEDIA_PER_PROFILE as i64 {
        return Err(PartnerError::QuotaExceeded(format!(
            "Maximum {} media items allowed",
            MAX_MEDIA_PER_PROFILE
        )));
    }

    let asset_id = Uuid::new_v4();
    let tmp_key_main = format!("{}/{}/main.{}", user.id, asset_id, payload.ext);
    let tmp_key_thumb = payload
        .has_thumb
        .then(|| format!("{}/{}/thumb.jpg", user.id, asset_id));

    let tmp_bucket = &ctx.config.buckets.tmp_bucket;

    let put_url_main = ctx.storage.sign_upload_url(tmp_bucket, &tmp_key_main).await?;

    let put_url_thumb = match &tmp_key_thumb {
        Some(key) => Some(ctx.storage.sign_upload_url(tmp_bucket, key).await?),
        None => None,
    };

    let record_draft = db::insert_draft(
        &ctx.db,
        payload.provider_id,
        payload.kind,
        &tmp_key_main,
        tmp_key_thumb.as_deref(),
        &payload.meta.unwrap_or_default(),
        user.id,
        count as i32,
    )
    .await?;

    metrics::UPLOAD_URLS_ISSUED.inc();
    tracing::info!(
        provider_id = %payload.provider_id,
        media_id = %record_draft.id,
        kind = payload.kind.as_str(),
        "upload grant issued"
    );

    Ok(Json(GetUploadUrlResponse {
        put_url_main,
        put_url_thumb,
        tmp_key_main,
        tmp_key_thumb,
        record_draft,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_decodes_wire_names() {
        let payload: GetUploadUrlPayload = serde_json::from_str(
            r#"{
                "provider_id": "6f6b2d5e-94e9-4f6b-9a3f-6a7f1e0f2b3c",
                "kind": "video",
                "ext": "mp4",
                "hasThumb": true,
                "meta": {"mime": "video/mp4", "duration": 12}
            }"#,
        )
        .unwrap();

        assert_eq!(payload.kind, MediaKind::Video);
        assert!(payload.has_thumb);
        assert_eq!(payload.meta.unwrap().duration, Some(12));
    }

    #[test]
    fn has_thumb_defaults_to_false() {
        let payload: GetUploadUrlPayload = serde_json::from_str(
            r#"{
                "provider_id": "6f6b2d5e-94e9-4f6b-9a3f-6a7f1e0f2b3c",
                "kind": "image",
                "ext": "jpg"
            }"#,
        )
        .unwrap();

        assert!(!payload.has_thumb);
        assert!(payload.validate().is_ok());
    }

    #[test]
    fn overlong_extension_fails_validation() {
        let payload: GetUploadUrlPayload = serde_json::from_str(
            r#"{
                "provider_id": "6f6b2d5e-94e9-4f6b-9a3f-6a7f1e0f2b3c",
                "kind": "image",
                "ext": "waytoolongext"
            }"#,
        )
        .unwrap();

        assert!(payload.validate().is_err());
    }
}
