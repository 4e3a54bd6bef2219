//! Server configuration module
//!
//! Handles loading configuration from environment variables with sensible defaults.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use pothole_core::detect::{
    DetectorConfig, DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_IMAGES_DIR, DEFAULT_INFERENCE_TIMEOUT,
};

/// Server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port (default: 8000)
    pub port: u16,
    /// Server host (default: 127.0.0.1)
    pub host: [u8; 4],
    /// Record file (default: <DATA_DIR>/potholes.csv)
    pub potholes_csv: PathBuf,
    /// Annotated image directory (default: <DATA_DIR>/detected_potholes)
    pub images_dir: PathBuf,
    /// Minimum confidence for an accepted detection (default: 0.5)
    pub confidence_threshold: f64,
    /// Remote inference endpoint (no default; detection fails when unset)
    pub inference_url: Option<String>,
    /// Model load and inference timeout in seconds (default: 30)
    pub inference_timeout_secs: u64,
    /// Webhook for detection alerts (default: log only)
    pub notify_webhook_url: Option<String>,
    /// Allowed CORS origins, comma-separated (default: allow all in dev)
    pub allowed_origins: Option<Vec<String>>,
    /// Request body limit in MB (default: 50)
    pub body_limit_mb: usize,
    /// Maximum file size per upload in MB (default: 25)
    pub max_file_size_mb: usize,
    /// Request timeout in seconds (default: 60)
    pub timeout_secs: u64,
    /// Enable rate limiting (default: false for tests, true when loaded from env)
    pub rate_limit_enabled: bool,
    /// Rate limit: requests per second (default: 10)
    pub rate_limit_per_sec: u64,
    /// Rate limit: burst size (default: 20)
    pub rate_limit_burst: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8000,
            host: [127, 0, 0, 1],
            potholes_csv: PathBuf::from("potholes.csv"),
            images_dir: PathBuf::from(DEFAULT_IMAGES_DIR),
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            inference_url: None,
            inference_timeout_secs: DEFAULT_INFERENCE_TIMEOUT.as_secs(),
            notify_webhook_url: None,
            allowed_origins: None, // None = allow all (dev mode)
            body_limit_mb: 50,
            max_file_size_mb: 25,
            timeout_secs: 60,
            rate_limit_enabled: false, // Disabled by default (for tests)
            rate_limit_per_sec: 10,
            rate_limit_burst: 20,
        }
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let host = std::env::var("HOST")
            .ok()
            .map(|h| {
                if h == "0.0.0.0" {
                    [0, 0, 0, 0]
                } else {
                    [127, 0, 0, 1]
                }
            })
            .unwrap_or(defaults.host);

        let data_dir = env_non_empty("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        let potholes_csv = env_non_empty("POTHOLES_CSV")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("potholes.csv"));

        let images_dir = env_non_empty("IMAGES_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join(DEFAULT_IMAGES_DIR));

        // Out-of-range thresholds fall back to the default
        let confidence_threshold = env_parse::<f64>("CONFIDENCE_THRESHOLD")
            .filter(|t| (0.0..=1.0).contains(t))
            .unwrap_or(defaults.confidence_threshold);

        let allowed_origins = std::env::var("ALLOWED_ORIGINS").ok().map(|origins| {
            origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        });

        // Rate limiting enabled by default in production, can be disabled with RATE_LIMIT_ENABLED=false
        let rate_limit_enabled = std::env::var("RATE_LIMIT_ENABLED")
            .map(|v| v.to_lowercase() != "false")
            .unwrap_or(true);

        Self {
            port: env_parse("PORT").unwrap_or(defaults.port),
            host,
            potholes_csv,
            images_dir,
            confidence_threshold,
            inference_url: env_non_empty("INFERENCE_URL"),
            inference_timeout_secs: env_parse("INFERENCE_TIMEOUT_SECS")
                .unwrap_or(defaults.inference_timeout_secs),
            notify_webhook_url: env_non_empty("NOTIFY_WEBHOOK_URL"),
            allowed_origins,
            body_limit_mb: env_parse("BODY_LIMIT_MB").unwrap_or(defaults.body_limit_mb),
            max_file_size_mb: env_parse("MAX_FILE_SIZE_MB").unwrap_or(defaults.max_file_size_mb),
            timeout_secs: env_parse("REQUEST_TIMEOUT_SECS").unwrap_or(defaults.timeout_secs),
            rate_limit_enabled,
            rate_limit_per_sec: env_parse("RATE_LIMIT_PER_SEC")
                .unwrap_or(defaults.rate_limit_per_sec),
            rate_limit_burst: env_parse("RATE_LIMIT_BURST").unwrap_or(defaults.rate_limit_burst),
        }
    }

    /// Get socket address from config
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::from((self.host, self.port))
    }

    /// Detection adapter settings derived from this config
    pub fn detector_config(&self) -> DetectorConfig {
        DetectorConfig {
            confidence_threshold: self.confidence_threshold,
            images_dir: self.images_dir.clone(),
            inference_timeout: Duration::from_secs(self.inference_timeout_secs),
        }
    }

    /// Maximum upload size in bytes
    pub fn max_file_size_bytes(&self) -> usize {
        self.max_file_size_mb * 1024 * 1024
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.port, 8000);
        assert_eq!(config.confidence_threshold, 0.5);
        assert!(config.inference_url.is_none());
        assert!(!config.rate_limit_enabled);
    }

    #[test]
    fn test_socket_addr() {
        let config = Config {
            port: 9000,
            ..Default::default()
        };
        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:9000");
    }

    #[test]
    fn test_detector_config() {
        let config = Config {
            confidence_threshold: 0.7,
            images_dir: PathBuf::from("/tmp/images"),
            inference_timeout_secs: 5,
            ..Default::default()
        };
        let detector = config.detector_config();
        assert_eq!(detector.confidence_threshold, 0.7);
        assert_eq!(detector.images_dir, PathBuf::from("/tmp/images"));
        assert_eq!(detector.inference_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_max_file_size_bytes() {
        let config = Config::default();
        assert_eq!(config.max_file_size_bytes(), 25 * 1024 * 1024);
    }
}
