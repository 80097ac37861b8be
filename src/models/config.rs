//! Configuration data model and validation

use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main application configuration, shared by the `serve` and `run` commands
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the speed test server the client measures against
    #[serde(default = "default_server_url")]
    pub server_url: String,

    /// Wall-clock duration of each transfer phase, in seconds
    #[serde(default = "default_duration_secs")]
    pub duration_secs: u64,

    /// Number of concurrent download workers
    #[serde(default = "default_parallel")]
    pub parallel: usize,

    /// Size of each download request, in MiB
    #[serde(default = "default_chunk_mb")]
    pub chunk_mb: u64,

    /// Size of the upload payload, in MiB
    #[serde(default = "default_upload_mb")]
    pub upload_mb: u64,

    /// Number of latency probes
    #[serde(default = "default_ping_count")]
    pub ping_count: u32,

    /// Pause between latency probes, in milliseconds
    #[serde(default = "default_ping_interval_ms")]
    pub ping_interval_ms: u64,

    /// Timeout for a single latency probe, in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Interface the server binds to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port the server listens on (0 picks an ephemeral port)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory of static assets served next to the API
    #[serde(default)]
    pub static_dir: Option<PathBuf>,

    /// Enable colored terminal output
    #[serde(default = "default_enable_color")]
    pub enable_color: bool,

    /// Enable verbose output
    #[serde(default)]
    pub verbose: bool,

    /// Enable debug output
    #[serde(default)]
    pub debug: bool,

    /// Print the report as JSON
    #[serde(default)]
    pub json_output: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            duration_secs: default_duration_secs(),
            parallel: default_parallel(),
            chunk_mb: default_chunk_mb(),
            upload_mb: default_upload_mb(),
            ping_count: default_ping_count(),
            ping_interval_ms: default_ping_interval_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            host: default_host(),
            port: default_port(),
            static_dir: None,
            enable_color: default_enable_color(),
            verbose: false,
            debug: false,
            json_output: false,
        }
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the probe timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Get the inter-probe delay as Duration
    pub fn ping_interval(&self) -> Duration {
        Duration::from_millis(self.ping_interval_ms)
    }

    /// Server bind address as "host:port"
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Validate the configuration and return the first structural error.
    ///
    /// Measurement sizes are not checked here: out-of-range values are
    /// clamped when the plan is built, and reported as warnings by the
    /// config validator.
    pub fn validate(&self) -> Result<()> {
        if self.server_url.is_empty() {
            return Err(AppError::config("Server URL cannot be empty"));
        }

        match url::Url::parse(&self.server_url) {
            Ok(parsed) => {
                if parsed.scheme() != "http" && parsed.scheme() != "https" {
                    return Err(AppError::config(format!("Server URL must use http or https: {}", self.server_url)));
                }
                if parsed.host_str().is_none() {
                    return Err(AppError::config(format!("Server URL has no host: {}", self.server_url)));
                }
            }
            Err(e) => {
                return Err(AppError::config(format!("Invalid server URL '{}': {}", self.server_url, e)));
            }
        }

        if self.ping_count == 0 {
            return Err(AppError::config("Ping count must be greater than 0"));
        }

        if self.ping_count > 100 {
            return Err(AppError::config("Ping count cannot exceed 100"));
        }

        if self.request_timeout_secs == 0 {
            return Err(AppError::config("Request timeout must be greater than 0"));
        }

        if self.request_timeout_secs > 300 {
            return Err(AppError::config("Request timeout cannot exceed 300 seconds"));
        }

        if self.host.trim().is_empty() {
            return Err(AppError::config("Bind host cannot be empty"));
        }

        Ok(())
    }

    /// Merge environment variables into this configuration
    pub fn merge_from_env(&mut self) -> Result<()> {
        if let Ok(server_url) = std::env::var("SERVER_URL") {
            self.server_url = server_url.trim().to_string();
        }

        if let Ok(duration) = std::env::var("TEST_DURATION") {
            self.duration_secs = duration.trim().parse()
                .map_err(|e| AppError::config(format!("Invalid TEST_DURATION value '{}': {}", duration, e)))?;
        }

        if let Ok(parallel) = std::env::var("PARALLEL") {
            self.parallel = parallel.trim().parse()
                .map_err(|e| AppError::config(format!("Invalid PARALLEL value '{}': {}", parallel, e)))?;
        }

        if let Ok(chunk_mb) = std::env::var("CHUNK_MB") {
            self.chunk_mb = chunk_mb.trim().parse()
                .map_err(|e| AppError::config(format!("Invalid CHUNK_MB value '{}': {}", chunk_mb, e)))?;
        }

        if let Ok(upload_mb) = std::env::var("UPLOAD_MB") {
            self.upload_mb = upload_mb.trim().parse()
                .map_err(|e| AppError::config(format!("Invalid UPLOAD_MB value '{}': {}", upload_mb, e)))?;
        }

        if let Ok(ping_count) = std::env::var("PING_COUNT") {
            self.ping_count = ping_count.trim().parse()
                .map_err(|e| AppError::config(format!("Invalid PING_COUNT value '{}': {}", ping_count, e)))?;
        }

        if let Ok(interval) = std::env::var("PING_INTERVAL_MS") {
            self.ping_interval_ms = interval.trim().parse()
                .map_err(|e| AppError::config(format!("Invalid PING_INTERVAL_MS value '{}': {}", interval, e)))?;
        }

        if let Ok(timeout) = std::env::var("REQUEST_TIMEOUT") {
            self.request_timeout_secs = timeout.trim().parse()
                .map_err(|e| AppError::config(format!("Invalid REQUEST_TIMEOUT value '{}': {}", timeout, e)))?;
        }

        if let Ok(host) = std::env::var("HOST") {
            self.host = host.trim().to_string();
        }

        if let Ok(port) = std::env::var("PORT") {
            self.port = port.trim().parse()
                .map_err(|e| AppError::config(format!("Invalid PORT value '{}': {}", port, e)))?;
        }

        if let Ok(static_dir) = std::env::var("STATIC_DIR") {
            let static_dir = static_dir.trim();
            self.static_dir = if static_dir.is_empty() { None } else { Some(PathBuf::from(static_dir)) };
        }

        if let Ok(enable_color) = std::env::var("ENABLE_COLOR") {
            self.enable_color = enable_color.trim().parse()
                .map_err(|e| AppError::config(format!("Invalid ENABLE_COLOR value '{}': {}", enable_color, e)))?;
        }

        Ok(())
    }
}

// Default value functions for serde
fn default_server_url() -> String {
    crate::defaults::DEFAULT_SERVER_URL.to_string()
}

fn default_duration_secs() -> u64 {
    crate::defaults::DEFAULT_DURATION_SECS
}

fn default_parallel() -> usize {
    crate::defaults::DEFAULT_PARALLEL
}

fn default_chunk_mb() -> u64 {
    crate::defaults::DEFAULT_CHUNK_MB
}

fn default_upload_mb() -> u64 {
    crate::defaults::DEFAULT_UPLOAD_MB
}

fn default_ping_count() -> u32 {
    crate::defaults::DEFAULT_PING_COUNT
}

fn default_ping_interval_ms() -> u64 {
    crate::defaults::DEFAULT_PING_INTERVAL.as_millis() as u64
}

fn default_request_timeout_secs() -> u64 {
    crate::defaults::DEFAULT_REQUEST_TIMEOUT.as_secs()
}

fn default_host() -> String {
    crate::defaults::DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    crate::defaults::DEFAULT_PORT
}

fn default_enable_color() -> bool {
    crate::defaults::DEFAULT_ENABLE_COLOR
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.ping_interval(), Duration::from_millis(100));
        assert_eq!(config.bind_addr(), "0.0.0.0:3000");
    }

    #[test]
    fn test_empty_server_url_invalid() {
        let config = Config { server_url: String::new(), ..Default::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_server_url_format() {
        let config = Config { server_url: "not-a-url".to_string(), ..Default::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_non_http_scheme_invalid() {
        let config = Config { server_url: "ftp://example.com".to_string(), ..Default::default() };
        let error = config.validate().unwrap_err();
        assert!(error.to_string().contains("http or https"));
    }

    #[test]
    fn test_zero_ping_count_invalid() {
        let config = Config { ping_count: 0, ..Default::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_out_of_range_sizes_are_not_errors() {
        let config = Config {
            duration_secs: 1,
            parallel: 0,
            chunk_mb: 0,
            upload_mb: 0,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_serde_defaults_fill_missing_fields() {
        let config: Config = serde_json::from_str(r#"{"parallel": 6}"#).unwrap();
        assert_eq!(config.parallel, 6);
        assert_eq!(config.ping_count, crate::defaults::DEFAULT_PING_COUNT);
        assert_eq!(config.server_url, crate::defaults::DEFAULT_SERVER_URL);
    }
}
