/// Device-local login throttle
///
/// Counts failed sign-in attempts and enforces a cooldown after too many,
/// persisted across launches in the device store.
use crate::device::DeviceStore;
use crate::error::PartnerResult;
use chrono::{DateTime, Duration, Utc};

/// Device-store key for the failed-attempt counter
const FAILED_ATTEMPTS_KEY: &str = "auth:failed_attempts";

/// Device-store key for the cooldown deadline
const COOLDOWN_UNTIL_KEY: &str = "auth:cooldown_until";

/// Failures allowed before the cooldown starts
pub const MAX_FAILED_ATTEMPTS: u32 = 5;

/// Cooldown length once the limit is hit
pub const COOLDOWN_MINUTES: i64 = 10;

/// Current throttle state
#[derive(Debug, Clone)]
pub struct ThrottleStatus {
    pub failed_attempts: u32,
    pub cooldown_until: Option<DateTime<Utc>>,
}

impl ThrottleStatus {
    pub fn in_cooldown(&self) -> bool {
        self.cooldown_until.map(|t| Utc::now() < t).unwrap_or(false)
    }

    /// Whole minutes remaining in the cooldown, rounded up, at least 1
    pub fn minutes_left(&self) -> i64 {
        self.cooldown_until
            .map(|t| {
                let secs = (t - Utc::now()).num_seconds().max(0);
                (secs + 59) / 60
            })
            .unwrap_or(0)
            .max(1)
    }
}

/// Login throttle over the device store
#[derive(Clone)]
pub struct LoginThrottle {
    store: DeviceStore,
}

impl LoginThrottle {
    pub fn new(store: DeviceStore) -> Self {
        Self { store }
    }

    /// Load the current state, clearing an expired cooldown as a side effect
    pub async fn status(&self) -> PartnerResult<ThrottleStatus> {
        let attempts = self
            .store
            .get(FAILED_ATTEMPTS_KEY)
            .await?
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(0);

        let cooldown_until = self
            .store
            .get(COOLDOWN_UNTIL_KEY)
            .await?
            .and_then(|v| DateTime::parse_from_rfc3339(&v).ok())
            .map(|t| t.with_timezone(&Utc));

        if let Some(deadline) = cooldown_until {
            if Utc::now() >= deadline {
                self.clear().await?;
                return Ok(ThrottleStatus {
                    failed_attempts: 0,
                    cooldown_until: None,
                });
            }
        }

        Ok(ThrottleStatus {
            failed_attempts: attempts,
            cooldown_until,
        })
    }

    /// Record one failure; starts the cooldown on the limit
    pub async fn record_failure(&self) -> PartnerResult<ThrottleStatus> {
        let current = self.status().await?;
        let attempts = current.failed_attempts + 1;

        self.store
            .set(FAILED_ATTEMPTS_KEY, &attempts.to_string())
            .await?;

        let mut cooldown_until = current.cooldown_until;
        if attempts >= MAX_FAILED_ATTEMPTS && cooldown_until.is_none() {
            let deadline = Utc::now() + Duration::minutes(COOLDOWN_MINUTES);
            self.store
                .set(COOLDOWN_UNTIL_KEY, &deadline.to_rfc3339())
                .await?;
            cooldown_until = Some(deadline);
            tracing::warn!(
                attempts,
                "login throttle engaged for {} minutes",
                COOLDOWN_MINUTES
            );
        }

        Ok(ThrottleStatus {
            failed_attempts: attempts,
            cooldown_until,
        })
    }

    /// Reset both keys (called on successful sign-in)
    pub async fn clear(&self) -> PartnerResult<()> {
        self.store.remove(FAILED_ATTEMPTS_KEY).await?;
        self.store.remove(COOLDOWN_UNTIL_KEY).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn throttle() -> LoginThrottle {
        LoginThrottle::new(DeviceStore::in_memory().await.unwrap())
    }

    #[tokio::test]
    async fn starts_clean() {
        let throttle = throttle().await;
        let status = throttle.status().await.unwrap();
        assert_eq!(status.failed_attempts, 0);
        assert!(!status.in_cooldown());
    }

    #[tokio::test]
    async fn cooldown_starts_on_fifth_failure() {
        let throttle = throttle().await;

        for expected in 1..MAX_FAILED_ATTEMPTS {
            let status = throttle.record_failure().await.unwrap();
            assert_eq!(status.failed_attempts, expected);
            assert!(!status.in_cooldown());
        }

        let status = throttle.record_failure().await.unwrap();
        assert_eq!(status.failed_attempts, MAX_FAILED_ATTEMPTS);
        assert!(status.in_cooldown());
        assert!(status.minutes_left() >= 1 && status.minutes_left() <= COOLDOWN_MINUTES);
    }

    #[tokio::test]
    async fn clear_resets_counter_and_cooldown() {
        let throttle = throttle().await;
        for _ in 0..MAX_FAILED_ATTEMPTS {
            throttle.record_failure().await.unwrap();
        }

        throttle.clear().await.unwrap();

        let status = throttle.status().await.unwrap();
        assert_eq!(status.failed_attempts, 0);
        assert!(!status.in_cooldown());
    }

    #[tokio::test]
    async fn expired_cooldown_is_cleared_on_read() {
        let throttle = throttle().await;
        let past = (Utc::now() - Duration::minutes(1)).to_rfc3339();
        throttle.store.set(FAILED_ATTEMPTS_KEY, "5").await.unwrap();
        throttle.store.set(COOLDOWN_UNTIL_KEY, &past).await.unwrap();

        let status = throttle.status().await.unwrap();
        assert_eq!(status.failed_attempts, 0);
        assert!(!status.in_cooldown());
        assert!(throttle.store.get(COOLDOWN_UNTIL_KEY).await.unwrap().is_none());
    }
}
