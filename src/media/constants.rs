/// Media upload constraints and pipeline constants

/// Maximum accepted photo size after compression
pub const PHOTO_MAX_BYTES: u64 = 4 * 1024 * 1024;

/// Photos are downscaled so neither dimension exceeds this
pub const PHOTO_MAX_DIMENSION: u32 = 2160;

/// JPEG re-encode quality
pub const PHOTO_JPEG_QUALITY: u8 = 82;

/// Maximum accepted video size
pub const VIDEO_MAX_BYTES: u64 = 120 * 1024 * 1024;

/// Maximum accepted video duration
pub const VIDEO_MAX_DURATION_SECS: u32 = 60;

/// Items counted toward quota (pending + approved) allowed per profile
pub const MAX_MEDIA_PER_PROFILE: u32 = 30;

/// Validity of minted display URLs
pub const SIGNED_URL_TTL_SECS: u32 = 3600;

/// Resolved URLs are served from cache for this long
pub const URL_CACHE_FRESH_SECS: u64 = 30 * 60;

/// Resolved URLs are retained at most this long
pub const URL_CACHE_RETAIN_SECS: u64 = 60 * 60;

/// How long a finished upload task stays visible before it is removed
pub const TASK_SUCCESS_LINGER_MS: u64 = 2000;

/// When a thumbnail follows, the main upload spans this share of progress
pub const MAIN_PROGRESS_SHARE: u8 = 80;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limits_match_the_platform_policy() {
        assert_eq!(PHOTO_MAX_BYTES, 4 * 1024 * 1024);
        assert_eq!(PHOTO_MAX_DIMENSION, 2160);
        assert_eq!(PHOTO_JPEG_QUALITY, 82);
        assert_eq!(VIDEO_MAX_BYTES, 120 * 1024 * 1024);
        assert_eq!(VIDEO_MAX_DURATION_SECS, 60);
        assert_eq!(MAX_MEDIA_PER_PROFILE, 30);
    }

    #[test]
    fn url_cache_windows_stay_inside_the_signature_validity() {
        assert!(URL_CACHE_FRESH_SECS < URL_CACHE_RETAIN_SECS);
        assert!(URL_CACHE_RETAIN_SECS <= SIGNED_URL_TTL_SECS as u64);
    }
}
