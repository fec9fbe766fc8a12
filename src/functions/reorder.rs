/// reorder
///
/// Applies a batch of `{id, sort_order}` pairs for one provider profile.
/// Concurrent reorders from different devices resolve last-write-wins;
/// clients reconcile by refetching.
use crate::error::{PartnerError, PartnerResult};
use crate::functions::{auth, db, FunctionsContext};
use crate::media::models::ReorderItem;
use crate::metrics;
use axum::{extract::State, http::HeaderMap, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct ReorderPayload {
    pub provider_id: Uuid,
    #[validate(length(min = 1))]
    pub items: Vec<ReorderItem>,
}

#[derive(Debug, Serialize)]
pub struct ReorderAck {
    pub ok: bool,
}

pub async fn reorder(
    State(ctx): State<FunctionsContext>,
    headers: HeaderMap,
    Json(payload): Json<ReorderPayload>,
) -> PartnerResult<Json<ReorderAck>> {
    let user = auth::verify_bearer(&headers, &ctx.config.jwt_secret)?;

    payload
        .validate()
        .map_err(|e| PartnerError::InvalidInput(e.to_string()))?;

    if !db::provider_owned_by(&ctx.db, payload.provider_id, user.id).await? {
        return Err(PartnerError::Ownership(
            "Not your provider profile".to_string(),
        ));
    }

    db::update_sort_orders(&ctx.db, payload.provider_id, &payload.items).await?;

    metrics::MEDIA_REORDERED.inc();
    tracing::info!(
        provider_id = %payload.provider_id,
        items = payload.items.len(),
        "sort order batch applied"
    );

    Ok(Json(ReorderAck { ok: true }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_batches_fail_validation() {
        let payload = ReorderPayload {
            provider_id: Uuid::new_v4(),
            items: Vec::new(),
        };
        assert!(payload.validate().is_err());
    }

    #[test]
    fn payload_decodes_items() {
        let payload: ReorderPayload = serde_json::from_str(
            r#"{
                "provider_id": "6f6b2d5e-94e9-4f6b-9a3f-6a7f1e0f2b3c",
                "items": [
                    {"id": "a2d1f9e8-1111-4222-8333-444455556666", "sort_order": 0},
                    {"id": "b2d1f9e8-1111-4222-8333-444455556666", "sort_order": 1}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(payload.items.len(), 2);
        assert_eq!(payload.items[1].sort_order, 1);
        assert!(payload.validate().is_ok());
    }
}
