/// Signed-URL upload transport
///
/// Streams asset bytes to a one-time signed PUT URL, reporting progress as
/// the body is consumed. Every transfer carries a cancellation token;
/// cancelling aborts the in-flight request.
use crate::error::{PartnerError, PartnerResult};
use async_trait::async_trait;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Progress callback, called with values 0-100
pub type ProgressFn = Arc<dyn Fn(u8) + Send + Sync>;

/// Seam for the PUT transfer
#[async_trait]
pub trait UploadTransport: Send + Sync {
    async fn put(
        &self,
        url: &str,
        bytes: Vec<u8>,
        mime: &str,
        progress: ProgressFn,
        cancel: CancellationToken,
    ) -> PartnerResult<()>;
}

/// Bytes handed to the connection per stream chunk
const CHUNK_SIZE: usize = 64 * 1024;

/// Percentage of `total` represented by `done`, capped at 100
fn chunk_progress(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    ((done * 100 / total).min(100)) as u8
}

/// Real transport over HTTP
#[derive(Clone)]
pub struct HttpUploadTransport {
    http: reqwest::Client,
}

impl HttpUploadTransport {
    pub fn new() -> PartnerResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent("lumera-partner/0.1")
            .build()
            .map_err(|e| PartnerError::Server(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { http })
    }
}

#[async_trait]
impl UploadTransport for HttpUploadTransport {
    async fn put(
        &self,
        url: &str,
        bytes: Vec<u8>,
        mime: &str,
        progress: ProgressFn,
        cancel: CancellationToken,
    ) -> PartnerResult<()> {
        let total = bytes.len();
        let sent = Arc::new(AtomicUsize::new(0));

        let chunks: Vec<Vec<u8>> = bytes.chunks(CHUNK_SIZE).map(|c| c.to_vec()).collect();

        let progress_cb = Arc::clone(&progress);
        let counter = Arc::clone(&sent);
        // Progress is reported as the connection pulls chunks off the stream
        let body_stream = futures::stream::iter(chunks.into_iter().map(move |chunk| {
            let done = counter.fetch_add(chunk.len(), Ordering::SeqCst) + chunk.len();
            progress_cb(chunk_progress(done, total));
            Ok::<Vec<u8>, std::io::Error>(chunk)
        }));

        let request = self
            .http
            .put(url)
            .header(CONTENT_TYPE, mime)
            .header(CONTENT_LENGTH, total)
            .body(reqwest::Body::wrap_stream(body_stream))
            .send();

        let response = tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!("upload to signed url cancelled");
                return Err(PartnerError::Cancelled);
            }
            result = request => result?,
        };

        let status = response.status();
        if !status.is_success() {
            return Err(PartnerError::Network(format!(
                "Upload failed with status {}",
                status.as_u16()
            )));
        }

        progress(100);
        Ok(())
    }
}
