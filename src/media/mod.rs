/// Media gallery pipeline
///
/// Everything between a user-picked asset and a moderation-pending stored
/// object: constraints and processing, the edge-function client, the
/// sequential upload orchestrator, signed-URL resolution, and the gallery
/// store with optimistic reorder.
pub mod constants;
pub mod edge;
pub mod gallery;
pub mod models;
pub mod process;
pub mod transport;
pub mod uploader;
pub mod urls;

pub use edge::{EdgeApi, EdgeClient};
pub use gallery::{GalleryStore, MediaDb, QuotaUsage};
pub use models::{MediaKind, MediaMeta, MediaRecord, MediaStatus, UploadTask, UploadTaskStatus};
pub use uploader::UploadOrchestrator;
pub use urls::{bucket_for_status, Buckets, SignedUrlResolver, StorageSigner};
