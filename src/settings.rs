use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::analytics::HttpAnalyticsSink;
use crate::resilience::RetryPolicy;

pub const CURRENT_VERSION: u32 = 1;

/// Publish-time and read-time tunables plus store coordinates.
///
/// Stored as YAML; every field carries a default so an empty file (or a file
/// from an older version missing newer fields) still loads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_version")]
    pub version: u32,

    /// Base URL of the asset store's object interface.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_base_url: Option<String>,

    /// Bearer token for store writes, if the store requires one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_token: Option<String>,

    /// Endpoint of the backend data service receiving analytics events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analytics_url: Option<String>,

    /// Top-level collection page assets and manifests are published under.
    #[serde(default = "default_collection")]
    pub collection: String,

    /// Rasterization scale for published page assets.
    #[serde(default = "default_publish_scale")]
    pub publish_scale: f32,

    /// JPEG quality (1-100) for published page assets.
    #[serde(default = "default_publish_quality")]
    pub publish_quality: u8,

    /// Rasterization scale for the direct byte-range read path. Lower than
    /// the publish scale to bound bandwidth.
    #[serde(default = "default_reader_scale")]
    pub reader_scale: f32,

    #[serde(default = "default_reader_quality")]
    pub reader_quality: u8,

    /// Byte-range chunk size for remote document fetches.
    #[serde(default = "default_fetch_chunk_size")]
    pub fetch_chunk_size: usize,

    /// Network timeouts, in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,

    /// Bounded retry for transient store/network failures.
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,
}

fn default_version() -> u32 {
    CURRENT_VERSION
}

fn default_collection() -> String {
    "publications".to_string()
}

fn default_publish_scale() -> f32 {
    2.0
}

fn default_publish_quality() -> u8 {
    90
}

fn default_reader_scale() -> f32 {
    1.2
}

fn default_reader_quality() -> u8 {
    80
}

fn default_fetch_chunk_size() -> usize {
    64 * 1024
}

fn default_connect_timeout_ms() -> u64 {
    5_000
}

fn default_read_timeout_ms() -> u64 {
    30_000
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    250
}

fn default_retry_max_delay_ms() -> u64 {
    4_000
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            store_base_url: None,
            store_token: None,
            analytics_url: None,
            collection: default_collection(),
            publish_scale: default_publish_scale(),
            publish_quality: default_publish_quality(),
            reader_scale: default_reader_scale(),
            reader_quality: default_reader_quality(),
            fetch_chunk_size: default_fetch_chunk_size(),
            connect_timeout_ms: default_connect_timeout_ms(),
            read_timeout_ms: default_read_timeout_ms(),
            retry_attempts: default_retry_attempts(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
        }
    }
}

impl Settings {
    /// Load settings, falling back to defaults if the file is missing or
    /// unreadable. A malformed file is reported but never fatal.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(content) => match serde_yaml::from_str::<Settings>(&content) {
                Ok(settings) => {
                    info!("Loaded settings from {}", path.display());
                    settings
                }
                Err(e) => {
                    warn!("Malformed settings file {}: {e}", path.display());
                    Self::default()
                }
            },
            Err(e) => {
                warn!("Failed to read settings file {}: {e}", path.display());
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let content = serde_yaml::to_string(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry_attempts.max(1),
            base_delay: Duration::from_millis(self.retry_base_delay_ms),
            max_delay: Duration::from_millis(self.retry_max_delay_ms),
        }
    }

    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    #[must_use]
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// HTTP analytics sink for the configured endpoint, if one is set.
    #[must_use]
    pub fn analytics_sink(&self) -> Option<HttpAnalyticsSink> {
        self.analytics_url
            .as_deref()
            .map(|url| HttpAnalyticsSink::new(url, self.read_timeout()))
    }
}
