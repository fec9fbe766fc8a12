/// Gallery store
///
/// Client-side view of a profile's media: the authoritative listing and
/// quota count fetched from the platform, owner-side deletion eligibility,
/// and reorder with optimistic local mutation rolled back on failure.
use crate::error::{PartnerError, PartnerResult};
use crate::media::constants::MAX_MEDIA_PER_PROFILE;
use crate::media::edge::EdgeApi;
use crate::media::models::{MediaRecord, ReorderItem};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Seam for the platform's media reads
#[async_trait]
pub trait MediaDb: Send + Sync {
    async fn list_media(&self, provider_id: Uuid) -> PartnerResult<Vec<MediaRecord>>;
    async fn count_quota_media(&self, provider_id: Uuid) -> PartnerResult<u32>;
}

#[async_trait]
impl MediaDb for crate::baas::BaasClient {
    async fn list_media(&self, provider_id: Uuid) -> PartnerResult<Vec<MediaRecord>> {
        crate::baas::BaasClient::list_media(self, provider_id).await
    }

    async fn count_quota_media(&self, provider_id: Uuid) -> PartnerResult<u32> {
        crate::baas::BaasClient::count_quota_media(self, provider_id).await
    }
}

/// Quota usage as the server counts it
#[derive(Debug, Clone, Copy)]
pub struct QuotaUsage {
    pub used: u32,
    pub max: u32,
}

impl QuotaUsage {
    pub fn is_full(&self) -> bool {
        self.used >= self.max
    }
}

/// Contiguous sort orders starting at 0 over the new display order
pub fn compute_reorder_items(ordered_ids: &[Uuid]) -> Vec<ReorderItem> {
    ordered_ids
        .iter()
        .enumerate()
        .map(|(index, id)| ReorderItem {
            id: *id,
            sort_order: index as i32,
        })
        .collect()
}

/// Sort into display order: sort_order ascending, newest first on ties
fn display_sort(items: &mut [MediaRecord]) {
    items.sort_by(|a, b| {
        a.sort_order
            .cmp(&b.sort_order)
            .then(b.created_at.cmp(&a.created_at))
    });
}

/// The gallery store itself
pub struct GalleryStore {
    db: Arc<dyn MediaDb>,
    edge: Arc<dyn EdgeApi>,
    provider_id: Uuid,
    items: RwLock<Vec<MediaRecord>>,
    quota: RwLock<Option<QuotaUsage>>,
}

impl GalleryStore {
    pub fn new(db: Arc<dyn MediaDb>, edge: Arc<dyn EdgeApi>, provider_id: Uuid) -> Self {
        Self {
            db,
            edge,
            provider_id,
            items: RwLock::new(Vec::new()),
            quota: RwLock::new(None),
        }
    }

    pub fn provider_id(&self) -> Uuid {
        self.provider_id
    }

    /// Refetch the listing and quota from the server
    pub async fn refresh(&self) -> PartnerResult<()> {
        let listing = self.db.list_media(self.provider_id).await?;
        let used = self.db.count_quota_media(self.provider_id).await?;

        *self.items.write().await = listing;
        *self.quota.write().await = Some(QuotaUsage {
            used,
            max: MAX_MEDIA_PER_PROFILE,
        });
        Ok(())
    }

    /// Refetch, logging instead of propagating failures. Used after writes,
    /// where the server state is authoritative but the UI keeps working.
    pub async fn invalidate(&self) {
        if let Err(e) = self.refresh().await {
            tracing::warn!("gallery refetch failed: {}", e);
        }
    }

    /// Snapshot of the current listing in display order
    pub async fn items(&self) -> Vec<MediaRecord> {
        self.items.read().await.clone()
    }

    /// Current quota usage, fetched on first use
    pub async fn quota(&self) -> PartnerResult<QuotaUsage> {
        if let Some(quota) = *self.quota.read().await {
            return Ok(quota);
        }

        let used = self.db.count_quota_media(self.provider_id).await?;
        let quota = QuotaUsage {
            used,
            max: MAX_MEDIA_PER_PROFILE,
        };
        *self.quota.write().await = Some(quota);
        Ok(quota)
    }

    /// Delete an owned item. Only pending and rejected items are eligible;
    /// anything else is rejected locally before any network call.
    pub async fn delete(&self, media_id: Uuid) -> PartnerResult<()> {
        let status = {
            let items = self.items.read().await;
            items
                .iter()
                .find(|m| m.id == media_id)
                .map(|m| m.status)
                .ok_or_else(|| PartnerError::NotFound("Media not found".to_string()))?
        };

        if !status.owner_deletable() {
            return Err(PartnerError::InvalidInput(
                "Only pending or rejected media can be deleted".to_string(),
            ));
        }

        self.edge.remove_tmp(media_id).await?;

        // The record deletion is the authoritative signal; refetch
        self.invalidate().await;
        Ok(())
    }

    /// Persist a new display order. The local view is mutated optimistically
    /// and restored to the exact pre-reorder snapshot if the server call
    /// fails; either way a refetch reconciles any drift.
    pub async fn reorder(&self, ordered_ids: &[Uuid]) -> PartnerResult<()> {
        let payload = compute_reorder_items(ordered_ids);
        let snapshot = self.items.read().await.clone();

        {
            let mut items = self.items.write().await;
            for entry in &payload {
                if let Some(item) = items.iter_mut().find(|m| m.id == entry.id) {
                    item.sort_order = entry.sort_order;
                }
            }
            display_sort(&mut items);
        }

        match self.edge.reorder(self.provider_id, &payload).await {
            Ok(()) => {
                self.invalidate().await;
                Ok(())
            }
            Err(e) => {
                tracing::warn!("reorder failed, rolling back: {}", e);
                *self.items.write().await = snapshot;
                self.invalidate().await;
                Err(e)
            }
        }
    }
}
