/// Best-effort telemetry side channel
///
/// Login/device events ride a queue decoupled from the primary result path.
/// Enqueueing never blocks and never fails the caller; delivery failures are
/// logged and dropped.
use crate::baas::BaasClient;
use crate::error::PartnerResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::mpsc;

/// One recorded login
#[derive(Debug, Clone)]
pub struct LoginEvent {
    pub user_id: String,
    pub device_id: String,
    pub at: DateTime<Utc>,
}

/// Delivery seam for telemetry events
#[async_trait]
pub trait TelemetrySink: Send + Sync {
    async fn record_login(&self, event: &LoginEvent) -> PartnerResult<()>;
}

#[async_trait]
impl TelemetrySink for BaasClient {
    async fn record_login(&self, event: &LoginEvent) -> PartnerResult<()> {
        self.record_login_telemetry(&event.user_id, &event.device_id, event.at)
            .await
    }
}

/// Handle for enqueueing telemetry events
#[derive(Clone)]
pub struct TelemetryQueue {
    tx: Option<mpsc::UnboundedSender<LoginEvent>>,
}

impl TelemetryQueue {
    /// Start the delivery worker and return the enqueue handle
    pub fn start(sink: Arc<dyn TelemetrySink>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<LoginEvent>();

        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                if let Err(e) = sink.record_login(&event).await {
                    tracing::warn!("login telemetry dropped: {}", e);
                }
            }
        });

        Self { tx: Some(tx) }
    }

    /// A queue that silently discards everything (tests, headless tooling)
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Enqueue a login event; never blocks, never fails the caller
    pub fn enqueue_login(&self, event: LoginEvent) {
        if let Some(tx) = &self.tx {
            if tx.send(event).is_err() {
                tracing::debug!("telemetry worker gone, event dropped");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PartnerError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSink {
        delivered: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl TelemetrySink for CountingSink {
        async fn record_login(&self, _event: &LoginEvent) -> PartnerResult<()> {
            if self.fail {
                return Err(PartnerError::Network("offline".to_string()));
            }
            self.delivered.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn event() -> LoginEvent {
        LoginEvent {
            user_id: "user-1".to_string(),
            device_id: "device-1".to_string(),
            at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn events_reach_the_sink() {
        let sink = Arc::new(CountingSink {
            delivered: AtomicUsize::new(0),
            fail: false,
        });
        let queue = TelemetryQueue::start(Arc::clone(&sink) as Arc<dyn TelemetrySink>);

        queue.enqueue_login(event());
        queue.enqueue_login(event());

        // The worker drains asynchronously
        for _ in 0..50 {
            if sink.delivered.load(Ordering::SeqCst) == 2 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(sink.delivered.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn sink_failures_never_surface() {
        let sink = Arc::new(CountingSink {
            delivered: AtomicUsize::new(0),
            fail: true,
        });
        let queue = TelemetryQueue::start(sink as Arc<dyn TelemetrySink>);

        // Enqueue must not panic or error even though delivery fails
        queue.enqueue_login(event());
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }

    #[tokio::test]
    async fn disabled_queue_discards_silently() {
        let queue = TelemetryQueue::disabled();
        queue.enqueue_login(event());
    }
}
