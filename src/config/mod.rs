// Configuration module entry point
// Loads layered configuration and holds the shared application state

mod state;
mod types;

use std::net::SocketAddr;

// Re-export public types
pub use state::AppState;
pub use types::{
    Config, LoggingConfig, PerformanceConfig, ServerConfig, SourceConfig, StreamConfig,
};

/// Config file used when no path is given on the command line
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

impl Config {
    /// Load configuration from specified file path (extension optional)
    ///
    /// Environment variables prefixed with `STREAM_` override file values, nested
    /// keys are separated by `__` (e.g. `STREAM_SERVER__PORT=9000`).
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let defaults = StreamConfig::default();
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix("STREAM")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("logging.access_log_format", "combined")?
            .set_default("performance.keep_alive", true)?
            .set_default("performance.header_read_timeout", 30)?
            .set_default("stream.chunk_size", u64::try_from(defaults.chunk_size).unwrap_or(u64::MAX))?
            .set_default("stream.upstream_timeout", defaults.upstream_timeout)?
            .set_default("stream.default_name", defaults.default_name)?
            .set_default("stream.default_content_type", defaults.default_content_type)?
            .set_default("stream.cache_control", defaults.cache_control)?
            .set_default("source.type", "directory")?
            .set_default("source.root", "./files")?
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), config::ConfigError> {
        if self.server.workers == Some(0) {
            return Err(config::ConfigError::Message(
                "server.workers must be greater than zero".to_string(),
            ));
        }
        if self.stream.chunk_size == 0 {
            return Err(config::ConfigError::Message(
                "stream.chunk_size must be greater than zero".to_string(),
            ));
        }
        if self.stream.upstream_timeout == 0 {
            return Err(config::ConfigError::Message(
                "stream.upstream_timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }
}

/// In-code configuration for handler tests, access log off
#[cfg(test)]
pub(crate) fn test_config(chunk_size: usize) -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            workers: None,
        },
        logging: LoggingConfig {
            level: "debug".to_string(),
            access_log: false,
            access_log_format: "combined".to_string(),
        },
        performance: PerformanceConfig {
            keep_alive: true,
            header_read_timeout: 30,
            max_connections: None,
        },
        stream: StreamConfig {
            chunk_size,
            ..StreamConfig::default()
        },
        source: SourceConfig::Directory {
            root: std::path::PathBuf::from("."),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn write_config(name: &str, content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "range-stream-proxy-{name}-{}.toml",
            std::process::id()
        ));
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_defaults() {
        let config = Config::load_from("definitely-missing-config-file").unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.stream.chunk_size, 1024 * 1024);
        assert_eq!(config.stream.default_name, "video.mp4");
        assert_eq!(config.stream.default_content_type, "video/mp4");
        assert_eq!(config.logging.access_log_format, "combined");
        assert_eq!(
            config.source,
            SourceConfig::Directory {
                root: PathBuf::from("./files")
            }
        );
        assert_eq!(
            config.get_socket_addr().unwrap(),
            "0.0.0.0:8080".parse().unwrap()
        );
    }

    #[test]
    fn test_file_overrides() {
        let path = write_config(
            "overrides",
            r#"
[server]
port = 9090
workers = 2

[stream]
chunk_size = 131072
upstream_timeout = 5

[source]
type = "directory"
root = "/srv/media"
"#,
        );
        let config = Config::load_from(path.to_str().unwrap()).unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.workers, Some(2));
        assert_eq!(config.stream.chunk_size, 131_072);
        assert_eq!(config.stream.upstream_timeout, 5);
        assert_eq!(config.stream.cache_control, "public, max-age=3600");
        assert_eq!(
            config.source,
            SourceConfig::Directory {
                root: PathBuf::from("/srv/media")
            }
        );
    }

    #[test]
    fn test_env_overrides_file() {
        // Only keys no other test asserts on, tests share the process environment
        let path = write_config(
            "env",
            "[logging]\nlevel = \"debug\"\n\n[performance]\nkeep_alive = true\n",
        );
        std::env::set_var("STREAM_LOGGING__LEVEL", "warn");
        std::env::set_var("STREAM_PERFORMANCE__KEEP_ALIVE", "false");
        std::env::set_var("STREAM_PERFORMANCE__MAX_CONNECTIONS", "64");

        let config = Config::load_from(path.to_str().unwrap());

        std::env::remove_var("STREAM_LOGGING__LEVEL");
        std::env::remove_var("STREAM_PERFORMANCE__KEEP_ALIVE");
        std::env::remove_var("STREAM_PERFORMANCE__MAX_CONNECTIONS");

        let config = config.unwrap();
        assert_eq!(config.logging.level, "warn");
        assert!(!config.performance.keep_alive);
        assert_eq!(config.performance.max_connections, Some(64));
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        let path = write_config("zero-chunk", "[stream]\nchunk_size = 0\n");
        assert!(Config::load_from(path.to_str().unwrap()).is_err());
    }
}
