/// Upload orchestrator
///
/// Turns user-picked assets into moderation-pending stored objects. Assets
/// in a batch are uploaded strictly sequentially; each asset's failure is
/// isolated and never aborts the rest. Task state transitions
/// `pending -> uploading -> success | error` are observable; successful
/// tasks leave the visible list after a short linger, errored tasks stay
/// until dismissed. Every task owns a cancellation token.
use crate::error::{PartnerError, PartnerResult};
use crate::media::constants::{MAIN_PROGRESS_SHARE, TASK_SUCCESS_LINGER_MS};
use crate::media::gallery::GalleryStore;
use crate::media::models::{GetUploadUrlRequest, UploadTask, UploadTaskStatus};
use crate::media::process::{prepare_asset, LocalAsset, VideoProber};
use crate::media::transport::{ProgressFn, UploadTransport};
use crate::media::EdgeApi;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Outcome of one batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchReport {
    pub succeeded: usize,
    pub failed: usize,
}

/// Scale main-transfer progress into its share of the total
fn weight_main(progress: u8, has_thumb: bool) -> u8 {
    if has_thumb {
        (progress as u16 * MAIN_PROGRESS_SHARE as u16 / 100) as u8
    } else {
        progress
    }
}

/// Scale thumbnail-transfer progress into the remaining share
fn weight_thumb(progress: u8) -> u8 {
    MAIN_PROGRESS_SHARE + (progress as u16 * (100 - MAIN_PROGRESS_SHARE) as u16 / 100) as u8
}

/// Message stored on an errored task
fn task_error_message(err: &PartnerError) -> String {
    match err {
        PartnerError::InvalidInput(m)
        | PartnerError::AuthRejected(m)
        | PartnerError::Network(m)
        | PartnerError::QuotaExceeded(m)
        | PartnerError::Ownership(m)
        | PartnerError::NotFound(m)
        | PartnerError::Server(m) => m.clone(),
        PartnerError::Cancelled => "Upload cancelled".to_string(),
        other => other.to_string(),
    }
}

/// Shared, observable task list
struct TaskBoard {
    tasks: Mutex<Vec<UploadTask>>,
    tx: watch::Sender<Vec<UploadTask>>,
}

impl TaskBoard {
    fn new() -> Self {
        let (tx, _) = watch::channel(Vec::new());
        Self {
            tasks: Mutex::new(Vec::new()),
            tx,
        }
    }

    fn snapshot(&self) -> Vec<UploadTask> {
        self.tasks.lock().expect("task lock poisoned").clone()
    }

    fn publish(&self) {
        self.tx.send_replace(self.snapshot());
    }

    fn push(&self, task: UploadTask) {
        self.tasks.lock().expect("task lock poisoned").push(task);
        self.publish();
    }

    fn update<F: FnOnce(&mut UploadTask)>(&self, id: &str, mutate: F) {
        {
            let mut tasks = self.tasks.lock().expect("task lock poisoned");
            if let Some(task) = tasks.iter_mut().find(|t| t.id == id) {
                mutate(task);
            }
        }
        self.publish();
    }

    fn set_progress(&self, id: &str, progress: u8) {
        self.update(id, |task| task.progress = progress);
    }

    fn remove(&self, id: &str) {
        self.tasks
            .lock()
            .expect("task lock poisoned")
            .retain(|t| t.id != id);
        self.publish();
    }
}

/// The orchestrator itself
pub struct UploadOrchestrator {
    edge: Arc<dyn EdgeApi>,
    transport: Arc<dyn UploadTransport>,
    prober: Arc<dyn VideoProber>,
    gallery: Arc<GalleryStore>,
    board: Arc<TaskBoard>,
    cancels: Mutex<HashMap<String, CancellationToken>>,
    success_linger: Duration,
}

impl UploadOrchestrator {
    pub fn new(
        edge: Arc<dyn EdgeApi>,
        transport: Arc<dyn UploadTransport>,
        prober: Arc<dyn VideoProber>,
        gallery: Arc<GalleryStore>,
    ) -> Self {
        Self::with_linger(
            edge,
            transport,
            prober,
            gallery,
            Duration::from_millis(TASK_SUCCESS_LINGER_MS),
        )
    }

    /// Custom success linger, used by tests
    pub fn with_linger(
        edge: Arc<dyn EdgeApi>,
        transport: Arc<dyn UploadTransport>,
        prober: Arc<dyn VideoProber>,
        gallery: Arc<GalleryStore>,
        success_linger: Duration,
    ) -> Self {
        Self {
            edge,
            transport,
            prober,
            gallery,
            board: Arc::new(TaskBoard::new()),
            cancels: Mutex::new(HashMap::new()),
            success_linger,
        }
    }

    /// Observe the visible task list
    pub fn subscribe(&self) -> watch::Receiver<Vec<UploadTask>> {
        self.board.tx.subscribe()
    }

    /// Snapshot of the visible task list
    pub fn tasks(&self) -> Vec<UploadTask> {
        self.board.snapshot()
    }

    /// Cancel one in-flight task
    pub fn cancel_task(&self, task_id: &str) {
        if let Some(token) = self
            .cancels
            .lock()
            .expect("cancel lock poisoned")
            .get(task_id)
        {
            token.cancel();
        }
    }

    /// Remove an errored task from the visible list
    pub fn dismiss_task(&self, task_id: &str) {
        self.board.remove(task_id);
    }

    /// Upload a batch of assets sequentially.
    ///
    /// The advisory quota check runs before any task is created; the server
    /// remains the authoritative quota boundary at draft creation.
    pub async fn upload_batch(&self, assets: Vec<LocalAsset>) -> PartnerResult<BatchReport> {
        let quota = self.gallery.quota().await?;
        if quota.is_full() {
            return Err(PartnerError::QuotaExceeded(format!(
                "You can only have up to {} media items",
                quota.max
            )));
        }

        let mut queue = Vec::with_capacity(assets.len());
        for asset in assets {
            let task_id = Uuid::new_v4().to_string();
            self.board.push(UploadTask {
                id: task_id.clone(),
                local_path: asset.path.clone(),
                kind: asset.kind,
                progress: 0,
                status: UploadTaskStatus::Pending,
                error: None,
            });
            self.cancels
                .lock()
                .expect("cancel lock poisoned")
                .insert(task_id.clone(), CancellationToken::new());
            queue.push((task_id, asset));
        }

        let mut report = BatchReport {
            succeeded: 0,
            failed: 0,
        };

        for (task_id, asset) in queue {
            self.board.update(&task_id, |task| {
                task.status = UploadTaskStatus::Uploading;
            });

            match self.upload_one(&task_id, &asset).await {
                Ok(()) => {
                    report.succeeded += 1;
                    self.board.update(&task_id, |task| {
                        task.status = UploadTaskStatus::Success;
                        task.progress = 100;
                    });
                    self.schedule_removal(task_id.clone());
                    self.gallery.invalidate().await;
                }
                Err(e) => {
                    // Isolated failure: the rest of the batch continues
                    report.failed += 1;
                    tracing::warn!(task_id = %task_id, "upload failed: {}", e);
                    self.board.update(&task_id, |task| {
                        task.status = UploadTaskStatus::Error;
                        task.error = Some(task_error_message(&e));
                    });
                }
            }

            self.cancels
                .lock()
                .expect("cancel lock poisoned")
                .remove(&task_id);
        }

        self.gallery.invalidate().await;
        Ok(report)
    }

    async fn upload_one(&self, task_id: &str, asset: &LocalAsset) -> PartnerResult<()> {
        let cancel = self
            .cancels
            .lock()
            .expect("cancel lock poisoned")
            .get(task_id)
            .cloned()
            .unwrap_or_default();

        // Process locally; limit violations surface before any network call
        let prepared = prepare_asset(asset, self.prober.as_ref()).await?;

        let request = GetUploadUrlRequest {
            provider_id: self.gallery.provider_id(),
            kind: prepared.kind,
            ext: prepared.ext.to_string(),
            has_thumb: prepared.thumb.is_some(),
            meta: Some(prepared.meta.clone()),
        };

        // The server allocates paths, inserts the pending draft and enforces
        // the quota before returning signed URLs
        let grant = self.edge.get_upload_url(&request).await?;

        let has_thumb = prepared.thumb.is_some() && grant.put_url_thumb.is_some();

        let board = Arc::clone(&self.board);
        let id = task_id.to_string();
        let main_progress: ProgressFn = Arc::new(move |p| {
            board.set_progress(&id, weight_main(p, has_thumb));
        });

        self.transport
            .put(
                &grant.put_url_main,
                prepared.bytes,
                &prepared.mime,
                main_progress,
                cancel.clone(),
            )
            .await?;

        if let (Some(thumb), Some(thumb_url)) = (prepared.thumb, grant.put_url_thumb) {
            let board = Arc::clone(&self.board);
            let id = task_id.to_string();
            let thumb_progress: ProgressFn = Arc::new(move |p| {
                board.set_progress(&id, weight_thumb(p));
            });

            self.transport
                .put(&thumb_url, thumb, "image/jpeg", thumb_progress, cancel)
                .await?;
        }

        Ok(())
    }

    fn schedule_removal(&self, task_id: String) {
        let board = Arc::clone(&self.board);
        let linger = self.success_linger;
        tokio::spawn(async move {
            tokio::time::sleep(linger).await;
            board.remove(&task_id);
        });
    }
}
