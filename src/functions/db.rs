/// Database access for the edge functions
///
/// Runtime queries against the platform's hosted Postgres. Rows are mapped
/// by hand; `meta` is a JSONB column.
use crate::error::{PartnerError, PartnerResult};
use crate::media::models::{MediaKind, MediaMeta, MediaRecord, MediaStatus, ReorderItem};
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;
use uuid::Uuid;

const MEDIA_COLUMNS: &str = "id, provider_id, kind, storage_key, thumb_key, meta, \
     min_user_level, status, reviewed_by, reviewed_at, reject_reason, \
     sort_order, created_by, created_at, updated_at";

/// Map one `provider_media` row
fn media_from_row(row: &PgRow) -> PartnerResult<MediaRecord> {
    let kind_raw: String = row.try_get("kind")?;
    let kind = MediaKind::from_str(&kind_raw)
        .ok_or_else(|| PartnerError::Server(format!("Unknown media kind '{}'", kind_raw)))?;

    let status_raw: String = row.try_get("status")?;
    let status = MediaStatus::from_str(&status_raw)
        .ok_or_else(|| PartnerError::Server(format!("Unknown media status '{}'", status_raw)))?;

    let meta_raw: serde_json::Value = row.try_get("meta")?;
    let meta: MediaMeta = serde_json::from_value(meta_raw)
        .map_err(|e| PartnerError::Server(format!("Invalid media meta: {}", e)))?;

    Ok(MediaRecord {
        id: row.try_get("id")?,
        provider_id: row.try_get("provider_id")?,
        kind,
        storage_key: row.try_get("storage_key")?,
        thumb_key: row.try_get("thumb_key")?,
        meta,
        min_user_level: row.try_get("min_user_level")?,
        status,
        reviewed_by: row.try_get("reviewed_by")?,
        reviewed_at: row.try_get("reviewed_at")?,
        reject_reason: row.try_get("reject_reason")?,
        sort_order: row.try_get("sort_order")?,
        created_by: row.try_get("created_by")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Does this provider profile belong to this user?
pub async fn provider_owned_by(
    pool: &PgPool,
    provider_id: Uuid,
    user_id: Uuid,
) -> PartnerResult<bool> {
    let row = sqlx::query("SELECT id FROM provider_profiles WHERE id = $1 AND user_id = $2")
        .bind(provider_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(PartnerError::Database)?;

    Ok(row.is_some())
}

/// Items charged against the quota: pending and approved only
pub async fn quota_count(pool: &PgPool, provider_id: Uuid) -> PartnerResult<i64> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM provider_media
         WHERE provider_id = $1 AND status IN ('pending', 'approved')",
    )
    .bind(provider_id)
    .fetch_one(pool)
    .await
    .map_err(PartnerError::Database)?;

    Ok(count)
}

/// Insert the pending draft row; the bytes follow afterwards
#[allow(clippy::too_many_arguments)]
pub async fn insert_draft(
    pool: &PgPool,
    provider_id: Uuid,
    kind: MediaKind,
    storage_key: &str,
    thumb_key: Option<&str>,
    meta: &MediaMeta,
    created_by: Uuid,
    sort_order: i32,
) -> PartnerResult<MediaRecord> {
    let meta_json = serde_json::to_value(meta)
        .map_err(|e| PartnerError::Server(format!("Failed to encode meta: {}", e)))?;

    let row = sqlx::query(&format!(
        "INSERT INTO provider_media
             (provider_id, kind, storage_key, thumb_key, meta, status, created_by, sort_order)
         VALUES ($1, $2, $3, $4, $5, 'pending', $6, $7)
         RETURNING {}",
        MEDIA_COLUMNS
    ))
    .bind(provider_id)
    .bind(kind.as_str())
    .bind(storage_key)
    .bind(thumb_key)
    .bind(&meta_json)
    .bind(created_by)
    .bind(sort_order)
    .fetch_one(pool)
    .await
    .map_err(PartnerError::Database)?;

    media_from_row(&row)
}

/// Fetch a media row together with its owner's account id
pub async fn media_with_owner(
    pool: &PgPool,
    media_id: Uuid,
) -> PartnerResult<Option<(MediaRecord, Option<Uuid>)>> {
    let row = sqlx::query(
        "SELECT m.*, p.user_id AS owner_user_id
         FROM provider_media m
         INNER JOIN provider_profiles p ON p.id = m.provider_id
         WHERE m.id = $1",
    )
    .bind(media_id)
    .fetch_optional(pool)
    .await
    .map_err(PartnerError::Database)?;

    match row {
        Some(row) => {
            let owner: Option<Uuid> = row.try_get("owner_user_id")?;
            Ok(Some((media_from_row(&row)?, owner)))
        }
        None => Ok(None),
    }
}

/// Delete a media row
pub async fn delete_media(pool: &PgPool, media_id: Uuid) -> PartnerResult<()> {
    sqlx::query("DELETE FROM provider_media WHERE id = $1")
        .bind(media_id)
        .execute(pool)
        .await
        .map_err(PartnerError::Database)?;

    Ok(())
}

/// Apply a reorder batch for one provider in a single transaction.
/// Rows outside the caller's profile are never touched.
pub async fn update_sort_orders(
    pool: &PgPool,
    provider_id: Uuid,
    items: &[ReorderItem],
) -> PartnerResult<()> {
    let mut tx = pool.begin().await.map_err(PartnerError::Database)?;

    for item in items {
        sqlx::query(
            "UPDATE provider_media SET sort_order = $1, updated_at = NOW()
             WHERE id = $2 AND provider_id = $3",
        )
        .bind(item.sort_order)
        .bind(item.id)
        .bind(provider_id)
        .execute(&mut *tx)
        .await
        .map_err(PartnerError::Database)?;
    }

    tx.commit().await.map_err(PartnerError::Database)?;
    Ok(())
}

/// Pending drafts older than the cutoff, candidates for the sweep
pub async fn stale_pending_drafts(
    pool: &PgPool,
    cutoff: DateTime<Utc>,
) -> PartnerResult<Vec<MediaRecord>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM provider_media
         WHERE status = 'pending' AND created_at < $1
         ORDER BY created_at ASC",
        MEDIA_COLUMNS
    ))
    .bind(cutoff)
    .fetch_all(pool)
    .await
    .map_err(PartnerError::Database)?;

    rows.iter().map(media_from_row).collect()
}

/// The storage directory prefix of an asset, from its generated key
/// (`{user_id}/{uuid}/main.{ext}` -> `{user_id}/{uuid}`)
pub fn storage_key_prefix(storage_key: &str) -> Option<String> {
    let parts: Vec<&str> = storage_key.split('/').collect();
    if parts.len() >= 2 {
        Some(format!("{}/{}", parts[0], parts[1]))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_is_the_first_two_segments() {
        assert_eq!(
            storage_key_prefix("user-1/abcd-ef/main.jpg"),
            Some("user-1/abcd-ef".to_string())
        );
        assert_eq!(
            storage_key_prefix("user-1/abcd-ef/thumb.jpg"),
            Some("user-1/abcd-ef".to_string())
        );
    }

    #[test]
    fn short_keys_have_no_prefix() {
        assert_eq!(storage_key_prefix("loose-object.jpg"), None);
        assert_eq!(storage_key_prefix(""), None);
    }
}
