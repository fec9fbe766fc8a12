/// Signed display-URL resolution
///
/// Storage keys are opaque until exchanged for a time-limited URL. The
/// bucket is derived purely from the item's current moderation status, and
/// resolved URLs are cached since minting them is relatively expensive and
/// they stay valid for an hour anyway.
use crate::error::PartnerResult;
use crate::media::constants::{SIGNED_URL_TTL_SECS, URL_CACHE_FRESH_SECS, URL_CACHE_RETAIN_SECS};
use crate::media::models::{MediaRecord, MediaStatus, MediaWithUrls};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use uuid::Uuid;

/// Seam for minting signed download URLs
#[async_trait]
pub trait StorageSigner: Send + Sync {
    async fn sign_download(
        &self,
        bucket: &str,
        key: &str,
        expires_secs: u32,
    ) -> PartnerResult<String>;
}

#[async_trait]
impl StorageSigner for crate::baas::BaasClient {
    async fn sign_download(
        &self,
        bucket: &str,
        key: &str,
        expires_secs: u32,
    ) -> PartnerResult<String> {
        self.sign_download_url(bucket, key, expires_secs).await
    }
}

/// Bucket names split by moderation outcome
#[derive(Debug, Clone)]
pub struct Buckets {
    pub tmp: String,
    pub media: String,
}

impl From<&crate::config::BucketConfig> for Buckets {
    fn from(config: &crate::config::BucketConfig) -> Self {
        Self {
            tmp: config.tmp_bucket.clone(),
            media: config.media_bucket.clone(),
        }
    }
}

/// Pick the bucket from the item's *current* status. Approved items live in
/// the permanent bucket; everything else is still in the temporary one.
pub fn bucket_for_status(status: MediaStatus, buckets: &Buckets) -> &str {
    match status {
        MediaStatus::Approved => &buckets.media,
        MediaStatus::Pending | MediaStatus::Rejected => &buckets.tmp,
    }
}

#[derive(Clone)]
struct CachedUrls {
    url: String,
    thumb_url: Option<String>,
    resolved_at: Instant,
}

/// Resolver with a keyed TTL cache
pub struct SignedUrlResolver {
    signer: Arc<dyn StorageSigner>,
    buckets: Buckets,
    cache: Mutex<HashMap<(Uuid, String), CachedUrls>>,
    fresh: Duration,
    retain: Duration,
}

impl SignedUrlResolver {
    pub fn new(signer: Arc<dyn StorageSigner>, buckets: Buckets) -> Self {
        Self::with_windows(
            signer,
            buckets,
            Duration::from_secs(URL_CACHE_FRESH_SECS),
            Duration::from_secs(URL_CACHE_RETAIN_SECS),
        )
    }

    /// Custom freshness windows, used by tests
    pub fn with_windows(
        signer: Arc<dyn StorageSigner>,
        buckets: Buckets,
        fresh: Duration,
        retain: Duration,
    ) -> Self {
        Self {
            signer,
            buckets,
            cache: Mutex::new(HashMap::new()),
            fresh,
            retain,
        }
    }

    /// Resolve display URLs for one record
    pub async fn resolve(&self, record: &MediaRecord) -> PartnerResult<MediaWithUrls> {
        let key = (record.id, record.storage_key.clone());

        {
            let mut cache = self.cache.lock().await;
            cache.retain(|_, entry| entry.resolved_at.elapsed() < self.retain);

            if let Some(entry) = cache.get(&key) {
                if entry.resolved_at.elapsed() < self.fresh {
                    return Ok(MediaWithUrls {
                        record: record.clone(),
                        url: entry.url.clone(),
                        thumb_url: entry.thumb_url.clone(),
                    });
                }
            }
        }

        let bucket = bucket_for_status(record.status, &self.buckets);

        let url = self
            .signer
            .sign_download(bucket, &record.storage_key, SIGNED_URL_TTL_SECS)
            .await?;

        let thumb_url = match &record.thumb_key {
            Some(thumb_key) => Some(
                self.signer
                    .sign_download(bucket, thumb_key, SIGNED_URL_TTL_SECS)
                    .await?,
            ),
            None => None,
        };

        let mut cache = self.cache.lock().await;
        cache.insert(
            key,
            CachedUrls {
                url: url.clone(),
                thumb_url: thumb_url.clone(),
                resolved_at: Instant::now(),
            },
        );

        Ok(MediaWithUrls {
            record: record.clone(),
            url,
            thumb_url,
        })
    }

    /// Resolve a whole listing in display order
    pub async fn resolve_many(&self, records: &[MediaRecord]) -> PartnerResult<Vec<MediaWithUrls>> {
        let mut resolved = Vec::with_capacity(records.len());
        for record in records {
            resolved.push(self.resolve(record).await?);
        }
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSigner {
        mints: AtomicUsize,
    }

    #[async_trait]
    impl StorageSigner for CountingSigner {
        async fn sign_download(
            &self,
            bucket: &str,
            key: &str,
            _expires_secs: u32,
        ) -> PartnerResult<String> {
            self.mints.fetch_add(1, Ordering::SeqCst);
            Ok(format!("https://cdn.test/{}/{}?sig=abc", bucket, key))
        }
    }

    fn buckets() -> Buckets {
        Buckets {
            tmp: "tmp-uploads".to_string(),
            media: "provider-media".to_string(),
        }
    }

    fn record(status: MediaStatus, thumb: bool) -> MediaRecord {
        MediaRecord {
            id: Uuid::new_v4(),
            provider_id: Uuid::new_v4(),
            kind: crate::media::models::MediaKind::Image,
            storage_key: "user/abcd/main.jpg".to_string(),
            thumb_key: thumb.then(|| "user/abcd/thumb.jpg".to_string()),
            meta: Default::default(),
            min_user_level: 0,
            status,
            reviewed_by: None,
            reviewed_at: None,
            reject_reason: None,
            sort_order: 0,
            created_by: Uuid::new_v4(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn bucket_follows_current_status() {
        let buckets = buckets();
        assert_eq!(
            bucket_for_status(MediaStatus::Approved, &buckets),
            "provider-media"
        );
        assert_eq!(
            bucket_for_status(MediaStatus::Pending, &buckets),
            "tmp-uploads"
        );
        assert_eq!(
            bucket_for_status(MediaStatus::Rejected, &buckets),
            "tmp-uploads"
        );
    }

    #[tokio::test]
    async fn approved_items_resolve_against_the_permanent_bucket() {
        let signer = Arc::new(CountingSigner {
            mints: AtomicUsize::new(0),
        });
        let resolver = SignedUrlResolver::new(Arc::clone(&signer) as Arc<dyn StorageSigner>, buckets());

        let resolved = resolver.resolve(&record(MediaStatus::Approved, false)).await.unwrap();
        assert!(resolved.url.contains("/provider-media/"));

        let resolved = resolver.resolve(&record(MediaStatus::Pending, false)).await.unwrap();
        assert!(resolved.url.contains("/tmp-uploads/"));

        let resolved = resolver.resolve(&record(MediaStatus::Rejected, false)).await.unwrap();
        assert!(resolved.url.contains("/tmp-uploads/"));
    }

    #[tokio::test]
    async fn fresh_entries_are_served_from_cache() {
        let signer = Arc::new(CountingSigner {
            mints: AtomicUsize::new(0),
        });
        let resolver = SignedUrlResolver::new(Arc::clone(&signer) as Arc<dyn StorageSigner>, buckets());

        let item = record(MediaStatus::Approved, true);
        resolver.resolve(&item).await.unwrap();
        // main + thumb
        assert_eq!(signer.mints.load(Ordering::SeqCst), 2);

        resolver.resolve(&item).await.unwrap();
        assert_eq!(signer.mints.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn stale_entries_are_reminted() {
        let signer = Arc::new(CountingSigner {
            mints: AtomicUsize::new(0),
        });
        let resolver = SignedUrlResolver::with_windows(
            Arc::clone(&signer) as Arc<dyn StorageSigner>,
            buckets(),
            Duration::from_millis(0),
            Duration::from_secs(3600),
        );

        let item = record(MediaStatus::Approved, false);
        resolver.resolve(&item).await.unwrap();
        resolver.resolve(&item).await.unwrap();
        assert_eq!(signer.mints.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn cache_is_keyed_by_id_and_storage_key() {
        let signer = Arc::new(CountingSigner {
            mints: AtomicUsize::new(0),
        });
        let resolver = SignedUrlResolver::new(Arc::clone(&signer) as Arc<dyn StorageSigner>, buckets());

        let mut item = record(MediaStatus::Pending, false);
        resolver.resolve(&item).await.unwrap();
        assert_eq!(signer.mints.load(Ordering::SeqCst), 1);

        // Same id, different storage key: the cached URL no longer applies
        item.storage_key = "user/abcd/other.jpg".to_string();
        resolver.resolve(&item).await.unwrap();
        assert_eq!(signer.mints.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn resolve_many_preserves_order() {
        let signer = Arc::new(CountingSigner {
            mints: AtomicUsize::new(0),
        });
        let resolver = SignedUrlResolver::new(signer as Arc<dyn StorageSigner>, buckets());

        let first = record(MediaStatus::Pending, false);
        let second = record(MediaStatus::Approved, false);
        let resolved = resolver
            .resolve_many(&[first.clone(), second.clone()])
            .await
            .unwrap();

        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved[0].record.id, first.id);
        assert_eq!(resolved[1].record.id, second.id);
    }
}
