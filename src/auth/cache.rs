/// Authorization cache
///
/// Device-local record of the last authorization verdict, trusted only
/// within its TTL. Written on every successful check; deleted the moment a
/// check finds the account unauthorized or errors out.
use crate::device::DeviceStore;
use crate::error::{PartnerError, PartnerResult};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Device-store key holding the single cache entry
const AUTH_CACHE_KEY: &str = "auth:authorization_cache";

/// How long a cached verdict stays valid: 2 hours.
pub const AUTH_CACHE_TTL_HOURS: i64 = 2;

/// TTL as a chrono duration
pub fn auth_cache_ttl() -> Duration {
    Duration::hours(AUTH_CACHE_TTL_HOURS)
}

/// One cached authorization verdict
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthCacheEntry {
    pub account_id: String,
    pub profile_id: Uuid,
    pub is_authorized: bool,
    pub is_blocked: bool,
    pub checked_at: DateTime<Utc>,
}

impl AuthCacheEntry {
    /// Valid only while `now - checked_at < TTL`
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now - self.checked_at < auth_cache_ttl()
    }
}

/// Cache store over the device store
#[derive(Clone)]
pub struct AuthCacheStore {
    store: DeviceStore,
}

impl AuthCacheStore {
    pub fn new(store: DeviceStore) -> Self {
        Self { store }
    }

    /// Read the entry if present and still fresh; expired entries are
    /// deleted on the way out
    pub async fn read(&self) -> PartnerResult<Option<AuthCacheEntry>> {
        let Some(raw) = self.store.get(AUTH_CACHE_KEY).await? else {
            return Ok(None);
        };

        let entry: AuthCacheEntry = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("dropping corrupt authorization cache entry: {}", e);
                self.clear().await?;
                return Ok(None);
            }
        };

        if entry.is_fresh(Utc::now()) {
            Ok(Some(entry))
        } else {
            tracing::debug!(
                "authorization cache entry older than {} hours, discarding",
                AUTH_CACHE_TTL_HOURS
            );
            self.clear().await?;
            Ok(None)
        }
    }

    /// Write a fresh entry
    pub async fn write(&self, entry: &AuthCacheEntry) -> PartnerResult<()> {
        let json = serde_json::to_string(entry)
            .map_err(|e| PartnerError::Server(format!("Failed to serialize cache entry: {}", e)))?;
        self.store.set(AUTH_CACHE_KEY, &json).await
    }

    /// Delete the entry
    pub async fn clear(&self) -> PartnerResult<()> {
        self.store.remove(AUTH_CACHE_KEY).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn cache() -> AuthCacheStore {
        AuthCacheStore::new(DeviceStore::in_memory().await.unwrap())
    }

    fn entry(checked_at: DateTime<Utc>) -> AuthCacheEntry {
        AuthCacheEntry {
            account_id: "user-1".to_string(),
            profile_id: Uuid::new_v4(),
            is_authorized: true,
            is_blocked: false,
            checked_at,
        }
    }

    #[tokio::test]
    async fn fresh_entry_roundtrips() {
        let cache = cache().await;
        let written = entry(Utc::now());
        cache.write(&written).await.unwrap();

        let read = cache.read().await.unwrap().unwrap();
        assert_eq!(read.account_id, written.account_id);
        assert_eq!(read.profile_id, written.profile_id);
        assert!(read.is_authorized);
    }

    #[tokio::test]
    async fn entry_past_ttl_is_discarded_and_deleted() {
        let cache = cache().await;
        // One millisecond past the TTL boundary
        let stale = entry(Utc::now() - auth_cache_ttl() - Duration::milliseconds(1));
        cache.write(&stale).await.unwrap();

        assert!(cache.read().await.unwrap().is_none());
        // The expired entry was deleted, not retained
        assert!(cache.store.get(AUTH_CACHE_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn entry_just_inside_ttl_is_trusted() {
        let cache = cache().await;
        let nearly_stale = entry(Utc::now() - auth_cache_ttl() + Duration::seconds(5));
        cache.write(&nearly_stale).await.unwrap();

        assert!(cache.read().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn corrupt_entry_is_dropped() {
        let cache = cache().await;
        cache.store.set(AUTH_CACHE_KEY, "not json").await.unwrap();

        assert!(cache.read().await.unwrap().is_none());
        assert!(cache.store.get(AUTH_CACHE_KEY).await.unwrap().is_none());
    }

    #[test]
    fn ttl_is_two_hours() {
        assert_eq!(AUTH_CACHE_TTL_HOURS, 2);
        assert_eq!(auth_cache_ttl(), Duration::hours(2));
    }
}
