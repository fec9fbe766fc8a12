/// Media data models and edge-function wire types
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of a media item, matching the database enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
    LivePhoto,
}

impl MediaKind {
    /// Database name value
    pub fn as_str(self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
            MediaKind::LivePhoto => "live_photo",
        }
    }

    /// Parse from the database value
    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "image" => Some(MediaKind::Image),
            "video" => Some(MediaKind::Video),
            "live_photo" => Some(MediaKind::LivePhoto),
            _ => None,
        }
    }
}

/// Moderation status of a media item, matching the database enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaStatus {
    Pending,
    Approved,
    Rejected,
}

impl MediaStatus {
    /// Database name value
    pub fn as_str(self) -> &'static str {
        match self {
            MediaStatus::Pending => "pending",
            MediaStatus::Approved => "approved",
            MediaStatus::Rejected => "rejected",
        }
    }

    /// Parse from the database value
    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(MediaStatus::Pending),
            "approved" => Some(MediaStatus::Approved),
            "rejected" => Some(MediaStatus::Rejected),
            _ => None,
        }
    }

    /// Only pending and rejected items may be deleted by their owner
    pub fn owner_deletable(self) -> bool {
        matches!(self, MediaStatus::Pending | MediaStatus::Rejected)
    }

    /// Pending and approved items count toward the quota
    pub fn counts_toward_quota(self) -> bool {
        matches!(self, MediaStatus::Pending | MediaStatus::Approved)
    }
}

/// Key pair backing a live photo
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LivePair {
    pub image_key: String,
    pub video_key: String,
}

/// Media metadata stored alongside the record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    /// Seconds, for video and live photo
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub live: Option<LivePair>,
}

/// One media row as the platform stores it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaRecord {
    pub id: Uuid,
    pub provider_id: Uuid,
    pub kind: MediaKind,
    pub storage_key: String,
    pub thumb_key: Option<String>,
    #[serde(default)]
    pub meta: MediaMeta,
    #[serde(default)]
    pub min_user_level: i32,
    pub status: MediaStatus,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reject_reason: Option<String>,
    pub sort_order: i32,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A media record with resolved display URLs
#[derive(Debug, Clone, Serialize)]
pub struct MediaWithUrls {
    #[serde(flatten)]
    pub record: MediaRecord,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumb_url: Option<String>,
}

/// Status of one in-flight upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadTaskStatus {
    Pending,
    Uploading,
    Success,
    Error,
}

/// Client-only record of one in-flight transfer. Never persisted.
#[derive(Debug, Clone)]
pub struct UploadTask {
    pub id: String,
    pub local_path: std::path::PathBuf,
    pub kind: MediaKind,
    /// 0-100
    pub progress: u8,
    pub status: UploadTaskStatus,
    pub error: Option<String>,
}

/// Request body for `get-upload-url`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetUploadUrlRequest {
    pub provider_id: Uuid,
    pub kind: MediaKind,
    pub ext: String,
    #[serde(rename = "hasThumb")]
    pub has_thumb: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<MediaMeta>,
}

/// Response body for `get-upload-url`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetUploadUrlResponse {
    #[serde(rename = "putUrlMain")]
    pub put_url_main: String,
    #[serde(rename = "putUrlThumb", skip_serializing_if = "Option::is_none")]
    pub put_url_thumb: Option<String>,
    #[serde(rename = "tmpKeyMain")]
    pub tmp_key_main: String,
    #[serde(rename = "tmpKeyThumb", skip_serializing_if = "Option::is_none")]
    pub tmp_key_thumb: Option<String>,
    #[serde(rename = "recordDraft")]
    pub record_draft: MediaRecord,
}

/// One `{id, sort_order}` pair in a reorder batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReorderItem {
    pub id: Uuid,
    pub sort_order: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_roundtrips_database_names() {
        for kind in [MediaKind::Image, MediaKind::Video, MediaKind::LivePhoto] {
            assert_eq!(MediaKind::from_str(kind.as_str()), Some(kind));
        }
        assert_eq!(MediaKind::from_str("gif"), None);
    }

    #[test]
    fn status_roundtrips_database_names() {
        for status in [
            MediaStatus::Pending,
            MediaStatus::Approved,
            MediaStatus::Rejected,
        ] {
            assert_eq!(MediaStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(MediaStatus::from_str("archived"), None);
    }

    #[test]
    fn only_pending_and_rejected_are_owner_deletable() {
        assert!(MediaStatus::Pending.owner_deletable());
        assert!(MediaStatus::Rejected.owner_deletable());
        assert!(!MediaStatus::Approved.owner_deletable());
    }

    #[test]
    fn rejected_items_do_not_count_toward_quota() {
        assert!(MediaStatus::Pending.counts_toward_quota());
        assert!(MediaStatus::Approved.counts_toward_quota());
        assert!(!MediaStatus::Rejected.counts_toward_quota());
    }

    #[test]
    fn wire_names_match_the_contract() {
        let request = GetUploadUrlRequest {
            provider_id: Uuid::nil(),
            kind: MediaKind::Video,
            ext: "mp4".to_string(),
            has_thumb: true,
            meta: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["kind"], "video");
        assert!(json.get("hasThumb").is_some());
        assert!(json.get("has_thumb").is_none());
    }

    #[test]
    fn meta_omits_absent_fields() {
        let meta = MediaMeta {
            mime: Some("image/jpeg".to_string()),
            size: Some(1024),
            ..Default::default()
        };
        let json = serde_json::to_value(&meta).unwrap();
        assert!(json.get("duration").is_none());
        assert!(json.get("live").is_none());
    }
}
