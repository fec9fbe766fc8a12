/// Client-side asset processing
///
/// Images are downscaled and re-encoded before upload; videos are probed
/// and rejected up front when over the duration or size limits, with a
/// best-effort first-frame thumbnail. All limit checks run before any
/// network call.
use crate::error::{PartnerError, PartnerResult};
use crate::media::constants::{
    PHOTO_JPEG_QUALITY, PHOTO_MAX_BYTES, PHOTO_MAX_DIMENSION, VIDEO_MAX_BYTES,
    VIDEO_MAX_DURATION_SECS,
};
use crate::media::models::{MediaKind, MediaMeta};
use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// A user-picked asset on local storage
#[derive(Debug, Clone)]
pub struct LocalAsset {
    pub path: PathBuf,
    pub kind: MediaKind,
}

/// An asset ready for transfer
#[derive(Debug, Clone)]
pub struct PreparedAsset {
    pub kind: MediaKind,
    pub ext: &'static str,
    pub mime: String,
    pub bytes: Vec<u8>,
    pub thumb: Option<Vec<u8>>,
    pub meta: MediaMeta,
}

/// Probe results for a video file
#[derive(Debug, Clone)]
pub struct VideoInfo {
    pub duration_secs: f64,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Seam for video probing and thumbnail extraction
#[async_trait]
pub trait VideoProber: Send + Sync {
    async fn probe(&self, path: &Path) -> PartnerResult<VideoInfo>;
    /// Extract a first-frame JPEG thumbnail
    async fn thumbnail(&self, path: &Path) -> PartnerResult<Vec<u8>>;
}

/// Target dimensions after capping the larger side at `max`, preserving
/// aspect ratio. Never upscales.
pub fn scaled_dimensions(width: u32, height: u32, max: u32) -> (u32, u32) {
    if width <= max && height <= max {
        return (width, height);
    }
    if width >= height {
        let scaled = (height as u64 * max as u64 / width as u64) as u32;
        (max, scaled.max(1))
    } else {
        let scaled = (width as u64 * max as u64 / height as u64) as u32;
        (scaled.max(1), max)
    }
}

/// Reject a photo that is still over the size limit after compression
pub fn ensure_photo_size(size_bytes: u64) -> PartnerResult<()> {
    if size_bytes > PHOTO_MAX_BYTES {
        return Err(PartnerError::InvalidInput(format!(
            "Image must be under {}MB after compression",
            PHOTO_MAX_BYTES / (1024 * 1024)
        )));
    }
    Ok(())
}

/// Reject a video over the duration or size limit
pub fn ensure_video_limits(duration_secs: f64, size_bytes: u64) -> PartnerResult<()> {
    if duration_secs > VIDEO_MAX_DURATION_SECS as f64 {
        return Err(PartnerError::InvalidInput(format!(
            "Video must be under {}s",
            VIDEO_MAX_DURATION_SECS
        )));
    }
    if size_bytes > VIDEO_MAX_BYTES {
        return Err(PartnerError::InvalidInput(format!(
            "Video must be under {}MB",
            VIDEO_MAX_BYTES / (1024 * 1024)
        )));
    }
    Ok(())
}

/// Downscale so neither dimension exceeds the cap and re-encode as JPEG.
/// Returns the encoded bytes and final dimensions.
pub fn process_image_bytes(data: &[u8]) -> PartnerResult<(Vec<u8>, u32, u32)> {
    let img = image::load_from_memory(data)
        .map_err(|e| PartnerError::InvalidInput(format!("Unreadable image: {}", e)))?;

    let (width, height) = (img.width(), img.height());
    let (target_w, target_h) = scaled_dimensions(width, height, PHOTO_MAX_DIMENSION);

    let img = if (target_w, target_h) != (width, height) {
        img.resize_exact(target_w, target_h, image::imageops::FilterType::Lanczos3)
    } else {
        img
    };

    let mut buf = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buf, PHOTO_JPEG_QUALITY);
    img.to_rgb8()
        .write_with_encoder(encoder)
        .map_err(|e| PartnerError::Server(format!("Failed to encode image: {}", e)))?;

    Ok((buf, target_w, target_h))
}

/// Turn a picked asset into a transfer-ready payload
pub async fn prepare_asset(
    asset: &LocalAsset,
    prober: &dyn VideoProber,
) -> PartnerResult<PreparedAsset> {
    match asset.kind {
        MediaKind::Image => prepare_image(&asset.path).await,
        MediaKind::Video => prepare_video(&asset.path, prober).await,
        MediaKind::LivePhoto => Err(PartnerError::InvalidInput(
            "Live photos are uploaded as an image/video pair by the capture flow".to_string(),
        )),
    }
}

async fn prepare_image(path: &Path) -> PartnerResult<PreparedAsset> {
    let data = tokio::fs::read(path).await?;
    let (bytes, width, height) = process_image_bytes(&data)?;

    ensure_photo_size(bytes.len() as u64)?;

    let meta = MediaMeta {
        mime: Some("image/jpeg".to_string()),
        size: Some(bytes.len() as u64),
        width: Some(width),
        height: Some(height),
        ..Default::default()
    };

    Ok(PreparedAsset {
        kind: MediaKind::Image,
        ext: "jpg",
        mime: "image/jpeg".to_string(),
        bytes,
        thumb: None,
        meta,
    })
}

async fn prepare_video(path: &Path, prober: &dyn VideoProber) -> PartnerResult<PreparedAsset> {
    let size_bytes = tokio::fs::metadata(path).await?.len();
    let info = prober.probe(path).await?;

    ensure_video_limits(info.duration_secs, size_bytes)?;

    // Thumbnail extraction is best-effort; a failure just omits it
    let thumb = match prober.thumbnail(path).await {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            tracing::warn!("failed to generate video thumbnail: {}", e);
            None
        }
    };

    let bytes = tokio::fs::read(path).await?;

    let meta = MediaMeta {
        mime: Some("video/mp4".to_string()),
        size: Some(size_bytes),
        width: info.width,
        height: info.height,
        duration: Some(info.duration_secs.round() as u32),
        ..Default::default()
    };

    Ok(PreparedAsset {
        kind: MediaKind::Video,
        ext: "mp4",
        mime: "video/mp4".to_string(),
        bytes,
        thumb,
        meta,
    })
}

// ---------------------------------------------------------------------------
// ffprobe / ffmpeg subprocess prober
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    streams: Vec<FfprobeStream>,
    format: FfprobeFormat,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

/// Video prober backed by the `ffprobe`/`ffmpeg` binaries
pub struct FfprobeProber;

#[async_trait]
impl VideoProber for FfprobeProber {
    async fn probe(&self, path: &Path) -> PartnerResult<VideoInfo> {
        let output = tokio::process::Command::new("ffprobe")
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(path)
            .output()
            .await
            .map_err(|e| PartnerError::Server(format!("ffprobe not available: {}", e)))?;

        if !output.status.success() {
            return Err(PartnerError::InvalidInput(format!(
                "Unreadable video: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let probe: FfprobeOutput = serde_json::from_str(&stdout)
            .map_err(|e| PartnerError::Server(format!("Failed to parse ffprobe output: {}", e)))?;

        let duration_secs = probe
            .format
            .duration
            .as_deref()
            .and_then(|d| d.parse::<f64>().ok())
            .unwrap_or(0.0);

        let video_stream = probe
            .streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some("video"));

        Ok(VideoInfo {
            duration_secs,
            width: video_stream.and_then(|s| s.width),
            height: video_stream.and_then(|s| s.height),
        })
    }

    async fn thumbnail(&self, path: &Path) -> PartnerResult<Vec<u8>> {
        let out_path = std::env::temp_dir().join(format!("lumera-thumb-{}.jpg", uuid::Uuid::new_v4()));

        let output = tokio::process::Command::new("ffmpeg")
            .args(["-y", "-i"])
            .arg(path)
            .args(["-vframes", "1", "-q:v", "2"])
            .arg(&out_path)
            .output()
            .await
            .map_err(|e| PartnerError::Server(format!("ffmpeg not available: {}", e)))?;

        if !output.status.success() {
            return Err(PartnerError::Server(format!(
                "Thumbnail extraction failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let bytes = tokio::fs::read(&out_path).await?;
        let _ = tokio::fs::remove_file(&out_path).await;
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oversized_width_is_capped_proportionally() {
        assert_eq!(scaled_dimensions(4320, 2160, 2160), (2160, 1080));
        assert_eq!(scaled_dimensions(4000, 3000, 2160), (2160, 1620));
    }

    #[test]
    fn oversized_height_is_capped_proportionally() {
        assert_eq!(scaled_dimensions(3000, 4000, 2160), (1620, 2160));
        assert_eq!(scaled_dimensions(1000, 5000, 2160), (432, 2160));
    }

    #[test]
    fn small_images_are_left_alone() {
        assert_eq!(scaled_dimensions(1920, 1080, 2160), (1920, 1080));
        assert_eq!(scaled_dimensions(2160, 2160, 2160), (2160, 2160));
    }

    #[test]
    fn photo_size_gate_rejects_over_limit() {
        assert!(ensure_photo_size(PHOTO_MAX_BYTES).is_ok());
        let err = ensure_photo_size(PHOTO_MAX_BYTES + 1).unwrap_err();
        assert!(matches!(err, PartnerError::InvalidInput(_)));
        assert!(err.to_string().contains("4MB"));
    }

    #[test]
    fn video_duration_gate_rejects_sixty_one_seconds() {
        assert!(ensure_video_limits(60.0, 1024).is_ok());
        let err = ensure_video_limits(61.0, 1024).unwrap_err();
        assert!(err.to_string().contains("60s"));
    }

    #[test]
    fn video_size_gate_rejects_over_limit() {
        assert!(ensure_video_limits(10.0, VIDEO_MAX_BYTES).is_ok());
        let err = ensure_video_limits(10.0, VIDEO_MAX_BYTES + 1).unwrap_err();
        assert!(err.to_string().contains("120MB"));
    }

    #[test]
    fn image_processing_downscales_and_reencodes() {
        // 3000x1000 test image, well over the dimension cap
        let img = image::RgbImage::from_pixel(3000, 1000, image::Rgb([120, 80, 40]));
        let mut png = Vec::new();
        img.write_to(
            &mut std::io::Cursor::new(&mut png),
            image::ImageFormat::Png,
        )
        .unwrap();

        let (jpeg, width, height) = process_image_bytes(&png).unwrap();

        assert_eq!((width, height), (2160, 720));
        let decoded = image::load_from_memory(&jpeg).unwrap();
        assert_eq!(decoded.width(), 2160);
        assert_eq!(decoded.height(), 720);
    }

    #[test]
    fn small_image_keeps_its_dimensions() {
        let img = image::RgbImage::from_pixel(64, 48, image::Rgb([10, 200, 30]));
        let mut png = Vec::new();
        img.write_to(
            &mut std::io::Cursor::new(&mut png),
            image::ImageFormat::Png,
        )
        .unwrap();

        let (_, width, height) = process_image_bytes(&png).unwrap();
        assert_eq!((width, height), (64, 48));
    }

    #[test]
    fn garbage_bytes_are_rejected() {
        let err = process_image_bytes(b"not an image").unwrap_err();
        assert!(matches!(err, PartnerError::InvalidInput(_)));
    }
}
