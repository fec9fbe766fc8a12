/// Configuration management for the Lumera partner client and edge functions
use crate::error::{PartnerError, PartnerResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Default temporary bucket for not-yet-approved media
pub const DEFAULT_TMP_BUCKET: &str = "tmp-uploads";

/// Default permanent bucket for approved media
pub const DEFAULT_MEDIA_BUCKET: &str = "provider-media";

/// Platform (BaaS) endpoints and keys
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformConfig {
    /// Base URL of the hosted platform, e.g. `https://abc.lumera.app`
    pub base_url: String,
    /// Publishable API key sent with every client request
    pub anon_key: String,
    /// Base URL of the edge functions, defaults to `{base_url}/functions/v1`
    pub functions_url: String,
}

/// Bucket names, chosen by moderation status at resolution time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketConfig {
    pub tmp_bucket: String,
    pub media_bucket: String,
}

impl Default for BucketConfig {
    fn default() -> Self {
        Self {
            tmp_bucket: DEFAULT_TMP_BUCKET.to_string(),
            media_bucket: DEFAULT_MEDIA_BUCKET.to_string(),
        }
    }
}

/// Device-local storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub data_directory: PathBuf,
    pub device_db: PathBuf,
}

/// Client-side configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub platform: PlatformConfig,
    pub buckets: BucketConfig,
    pub device: DeviceConfig,
}

impl ClientConfig {
    /// Load client configuration from environment variables
    pub fn from_env() -> PartnerResult<Self> {
        dotenv::dotenv().ok();

        let base_url = env::var("LUMERA_PLATFORM_URL")
            .map_err(|_| PartnerError::InvalidInput("LUMERA_PLATFORM_URL required".to_string()))?;
        let anon_key = env::var("LUMERA_ANON_KEY")
            .map_err(|_| PartnerError::InvalidInput("LUMERA_ANON_KEY required".to_string()))?;
        let functions_url = env::var("LUMERA_FUNCTIONS_URL")
            .unwrap_or_else(|_| format!("{}/functions/v1", base_url.trim_end_matches('/')));

        let data_directory: PathBuf = env::var("LUMERA_DATA_DIRECTORY")
            .unwrap_or_else(|_| "./data".to_string())
            .into();
        let device_db = env::var("LUMERA_DEVICE_DB_LOCATION")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_directory.join("device.sqlite"));

        Ok(Self {
            platform: PlatformConfig {
                base_url,
                anon_key,
                functions_url,
            },
            buckets: bucket_config_from_env(),
            device: DeviceConfig {
                data_directory,
                device_db,
            },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> PartnerResult<()> {
        if self.platform.base_url.is_empty() {
            return Err(PartnerError::InvalidInput(
                "Platform base URL cannot be empty".to_string(),
            ));
        }
        if self.platform.anon_key.is_empty() {
            return Err(PartnerError::InvalidInput(
                "Platform anon key cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Edge-functions server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionsConfig {
    pub hostname: String,
    pub port: u16,
    /// Connection string for the platform's hosted Postgres
    pub database_url: String,
    /// Secret used to verify platform-issued access tokens (HS256)
    pub jwt_secret: String,
    /// Platform base URL for storage administration
    pub platform_url: String,
    /// Service-role key for storage administration
    pub service_key: String,
    pub buckets: BucketConfig,
    /// Validity of minted signed URLs, in seconds
    pub signed_url_ttl_secs: u32,
    pub rate_limit: RateLimitConfig,
    /// Age after which an unfinished pending draft is swept, in hours
    pub draft_sweep_age_hours: i64,
}

/// Rate limiting configuration for the functions server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub requests_per_second: u32,
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests_per_second: 50,
            burst_size: 25,
        }
    }
}

impl FunctionsConfig {
    /// Load functions configuration from environment variables
    pub fn from_env() -> PartnerResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env::var("LUMERA_FN_HOSTNAME").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("LUMERA_FN_PORT")
            .unwrap_or_else(|_| "8787".to_string())
            .parse()
            .map_err(|_| PartnerError::InvalidInput("Invalid port number".to_string()))?;

        let database_url = env::var("LUMERA_DATABASE_URL")
            .map_err(|_| PartnerError::InvalidInput("LUMERA_DATABASE_URL required".to_string()))?;
        let jwt_secret = env::var("LUMERA_JWT_SECRET")
            .map_err(|_| PartnerError::InvalidInput("LUMERA_JWT_SECRET required".to_string()))?;
        let platform_url = env::var("LUMERA_PLATFORM_URL")
            .map_err(|_| PartnerError::InvalidInput("LUMERA_PLATFORM_URL required".to_string()))?;
        let service_key = env::var("LUMERA_SERVICE_KEY")
            .map_err(|_| PartnerError::InvalidInput("LUMERA_SERVICE_KEY required".to_string()))?;

        let signed_url_ttl_secs = env::var("LUMERA_SIGNED_URL_TTL_SECS")
            .unwrap_or_else(|_| "3600".to_string())
            .parse()
            .unwrap_or(3600);

        let rate_limit_enabled = env::var("LUMERA_RATE_LIMITS_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .parse()
            .unwrap_or(true);
        let requests_per_second = env::var("LUMERA_RATE_LIMIT_RPS")
            .unwrap_or_else(|_| "50".to_string())
            .parse()
            .unwrap_or(50);
        let burst_size = env::var("LUMERA_RATE_LIMIT_BURST")
            .unwrap_or_else(|_| "25".to_string())
            .parse()
            .unwrap_or(25);

        let draft_sweep_age_hours = env::var("LUMERA_DRAFT_SWEEP_AGE_HOURS")
            .unwrap_or_else(|_| "24".to_string())
            .parse()
            .unwrap_or(24);

        Ok(Self {
            hostname,
            port,
            database_url,
            jwt_secret,
            platform_url,
            service_key,
            buckets: bucket_config_from_env(),
            signed_url_ttl_secs,
            rate_limit: RateLimitConfig {
                enabled: rate_limit_enabled,
                requests_per_second,
                burst_size,
            },
            draft_sweep_age_hours,
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> PartnerResult<()> {
        if self.jwt_secret.len() < 32 {
            return Err(PartnerError::InvalidInput(
                "JWT secret must be at least 32 characters".to_string(),
            ));
        }
        if self.database_url.is_empty() {
            return Err(PartnerError::InvalidInput(
                "Database URL cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn bucket_config_from_env() -> BucketConfig {
    BucketConfig {
        tmp_bucket: env::var("LUMERA_TMP_BUCKET").unwrap_or_else(|_| DEFAULT_TMP_BUCKET.to_string()),
        media_bucket: env::var("LUMERA_MEDIA_BUCKET")
            .unwrap_or_else(|_| DEFAULT_MEDIA_BUCKET.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_buckets() {
        let buckets = BucketConfig::default();
        assert_eq!(buckets.tmp_bucket, "tmp-uploads");
        assert_eq!(buckets.media_bucket, "provider-media");
    }

    #[test]
    fn functions_config_rejects_short_jwt_secret() {
        let config = FunctionsConfig {
            hostname: "localhost".to_string(),
            port: 8787,
            database_url: "postgres://localhost/lumera".to_string(),
            jwt_secret: "short".to_string(),
            platform_url: "https://example.lumera.app".to_string(),
            service_key: "service".to_string(),
            buckets: BucketConfig::default(),
            signed_url_ttl_secs: 3600,
            rate_limit: RateLimitConfig::default(),
            draft_sweep_age_hours: 24,
        };
        assert!(config.validate().is_err());
    }
}
