// Configuration types module
// Defines all configuration-related data structures

use serde::Deserialize;
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
    pub stream: StreamConfig,
    pub source: SourceConfig,
}

/// Server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub access_log: bool,
    /// Access log format (combined, common, json, or custom pattern)
    #[serde(default = "default_access_log_format")]
    pub access_log_format: String,
}

#[allow(clippy::missing_const_for_fn)]
fn default_access_log_format() -> String {
    "combined".to_string()
}

/// Performance configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PerformanceConfig {
    pub keep_alive: bool,
    /// Seconds a client may take to send the request head
    pub header_read_timeout: u64,
    pub max_connections: Option<u64>,
}

/// Streaming configuration
#[derive(Debug, Deserialize, Clone)]
pub struct StreamConfig {
    /// Largest chunk requested from the source at once, in bytes
    pub chunk_size: usize,
    /// Seconds to wait for any single upstream call
    pub upstream_timeout: u64,
    /// Display name for objects the source has no name for
    pub default_name: String,
    /// Content type for objects the source has no type for
    pub default_content_type: String,
    pub cache_control: String,
}

/// Where objects come from
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceConfig {
    /// Files in a directory, addressed by file name
    Directory { root: PathBuf },
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1024 * 1024,
            upstream_timeout: 30,
            default_name: "video.mp4".to_string(),
            default_content_type: "video/mp4".to_string(),
            cache_control: "public, max-age=3600".to_string(),
        }
    }
}
