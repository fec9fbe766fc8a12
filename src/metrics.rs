/// Metrics for the media edge functions
///
/// Prometheus-compatible counters exposed at `/metrics`.
use lazy_static::lazy_static;
use prometheus::{register_int_counter, Encoder, IntCounter, TextEncoder};

lazy_static! {
    /// Signed upload URL grants issued (draft records created)
    pub static ref UPLOAD_URLS_ISSUED: IntCounter = register_int_counter!(
        "media_upload_urls_issued_total",
        "Signed upload URL grants issued"
    )
    .unwrap();

    /// Media records deleted through remove-tmp
    pub static ref MEDIA_REMOVED: IntCounter = register_int_counter!(
        "media_removed_total",
        "Media records deleted by their owner"
    )
    .unwrap();

    /// Reorder batches applied
    pub static ref MEDIA_REORDERED: IntCounter = register_int_counter!(
        "media_reorder_batches_total",
        "Reorder batches applied"
    )
    .unwrap();

    /// Requests rejected by the rate limiter
    pub static ref RATE_LIMITED_REQUESTS: IntCounter = register_int_counter!(
        "rate_limited_requests_total",
        "Requests rejected by the rate limiter"
    )
    .unwrap();

    /// Stale pending drafts swept by the maintenance job
    pub static ref DRAFTS_SWEPT: IntCounter = register_int_counter!(
        "media_drafts_swept_total",
        "Stale pending drafts removed by maintenance"
    )
    .unwrap();
}

/// Render all registered metrics in the Prometheus text format
pub fn render() -> String {
    let encoder = TextEncoder::new();
    let families = prometheus::gather();
    let mut buf = Vec::new();
    if let Err(e) = encoder.encode(&families, &mut buf) {
        tracing::error!("failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8(buf).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_register_and_render() {
        UPLOAD_URLS_ISSUED.inc();
        MEDIA_REMOVED.inc();
        let text = render();
        assert!(text.contains("media_upload_urls_issued_total"));
        assert!(text.contains("media_removed_total"));
    }
}
