/// remove-tmp
///
/// Owner-initiated deletion of a pending or rejected media item, as one
/// unit of work: ownership check, status eligibility, storage sweep of the
/// asset's directory (objects discovered by listing, not assumed names),
/// then the record delete. The record delete is the authoritative signal.
use crate::error::{PartnerError, PartnerResult};
use crate::functions::{auth, db, FunctionsContext};
use crate::metrics;
use axum::{extract::State, http::HeaderMap, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct RemoveTmpPayload {
    pub media_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct RemoveTmpAck {
    pub ok: bool,
}

pub async fn remove_tmp(
    State(ctx): State<FunctionsContext>,
    headers: HeaderMap,
    Json(payload): Json<RemoveTmpPayload>,
) -> PartnerResult<Json<RemoveTmpAck>> {
    let user = auth::verify_bearer(&headers, &ctx.config.jwt_secret)?;

    let (media, owner) = db::media_with_owner(&ctx.db, payload.media_id)
        .await?
        .ok_or_else(|| PartnerError::NotFound("Media not found".to_string()))?;

    if owner != Some(user.id) {
        return Err(PartnerError::Ownership("Forbidden".to_string()));
    }

    if !media.status.owner_deletable() {
        return Err(PartnerError::InvalidInput(
            "Can only delete pending or rejected media".to_string(),
        ));
    }

    sweep_storage_prefix(&ctx, &media.storage_key).await;

    db::delete_media(&ctx.db, payload.media_id).await?;

    metrics::MEDIA_REMOVED.inc();
    tracing::info!(media_id = %payload.media_id, "media removed by owner");

    Ok(Json(RemoveTmpAck { ok: true }))
}

/// Delete every object under the asset's directory prefix. Storage cleanup
/// is ordered before the record delete but is not the correctness signal;
/// failures are logged and the deletion proceeds.
pub(crate) async fn sweep_storage_prefix(ctx: &FunctionsContext, storage_key: &str) {
    let Some(prefix) = db::storage_key_prefix(storage_key) else {
        tracing::warn!(storage_key, "unexpected storage key shape, skipping sweep");
        return;
    };

    let tmp_bucket = &ctx.config.buckets.tmp_bucket;

    match ctx.storage.list_objects(tmp_bucket, &prefix).await {
        Ok(names) if !names.is_empty() => {
            let keys: Vec<String> = names
                .iter()
                .map(|name| format!("{}/{}", prefix, name))
                .collect();
            if let Err(e) = ctx.storage.remove_objects(tmp_bucket, &keys).await {
                tracing::warn!(prefix, "failed to remove storage objects: {}", e);
            }
        }
        Ok(_) => {}
        Err(e) => tracing::warn!(prefix, "failed to list storage objects: {}", e),
    }
}
