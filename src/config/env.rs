//! Environment variable handling and .env file management

use crate::error::{AppError, Result};
use std::path::Path;

/// Environment variable configuration manager
pub struct EnvManager;

impl EnvManager {
    /// Load .env file if it exists
    pub fn load_env_file(debug: bool) -> Result<()> {
        if Path::new(".env").exists() {
            dotenv::from_filename(".env")
                .map_err(|e| AppError::config(format!("Failed to load .env file: {}", e)))?;

            if debug {
                eprintln!("Loaded configuration from .env file");
            }
        } else if debug {
            eprintln!("No .env file found, using defaults and CLI arguments");
        }

        Ok(())
    }

    /// Example .env file content
    pub fn create_example_env_content() -> String {
        r#"# Network Speed Tester Configuration
#
# Values here are used as defaults and can be overridden by
# command-line arguments.

# Client: server to measure against
# SERVER_URL=http://127.0.0.1:3000

# Length of each transfer phase in seconds (minimum 5)
# TEST_DURATION=10

# Concurrent download workers (1-8); uploads use two thirds, at least 2
# PARALLEL=4

# Size of each download request in MiB (minimum 5)
# CHUNK_MB=20

# Size of the upload payload in MiB (minimum 1)
# UPLOAD_MB=2

# Latency probes and the pause between them
# PING_COUNT=7
# PING_INTERVAL_MS=100

# Latency probe timeout in seconds
# REQUEST_TIMEOUT=10

# Server: bind address and optional static assets
# HOST=0.0.0.0
# PORT=3000
# STATIC_DIR=public

# Enable colored output (true/false)
# ENABLE_COLOR=true
"#
        .to_string()
    }

    /// Save example .env file to disk
    pub fn save_example_env_file(path: &Path) -> Result<()> {
        std::fs::write(path, Self::create_example_env_content())
            .map_err(|e| AppError::config(format!("Failed to write example .env file: {}", e)))
    }

    /// Validate environment variable format before parsing
    pub fn validate_env_var(key: &str, value: &str) -> Result<()> {
        match key {
            "SERVER_URL" => {
                let parsed = url::Url::parse(value)
                    .map_err(|e| AppError::config(format!("Invalid SERVER_URL value '{}': {}", value, e)))?;
                if parsed.scheme() != "http" && parsed.scheme() != "https" {
                    return Err(AppError::config(format!("SERVER_URL must use http or https: {}", value)));
                }
            },
            "TEST_DURATION" | "CHUNK_MB" | "UPLOAD_MB" | "PING_INTERVAL_MS" => {
                value
                    .parse::<u64>()
                    .map_err(|e| AppError::config(format!("Invalid {} value '{}': {}", key, value, e)))?;
            },
            "PARALLEL" => {
                value
                    .parse::<usize>()
                    .map_err(|e| AppError::config(format!("Invalid PARALLEL value '{}': {}", value, e)))?;
            },
            "PING_COUNT" => {
                let count: u32 = value
                    .parse()
                    .map_err(|e| AppError::config(format!("Invalid PING_COUNT value '{}': {}", value, e)))?;
                if count == 0 || count > 100 {
                    return Err(AppError::config(format!("PING_COUNT must be between 1 and 100, got: {}", count)));
                }
            },
            "REQUEST_TIMEOUT" => {
                let timeout: u64 = value
                    .parse()
                    .map_err(|e| AppError::config(format!("Invalid REQUEST_TIMEOUT value '{}': {}", value, e)))?;
                if timeout == 0 || timeout > 300 {
                    return Err(AppError::config(format!(
                        "REQUEST_TIMEOUT must be between 1 and 300, got: {}",
                        timeout
                    )));
                }
            },
            "PORT" => {
                value
                    .parse::<u16>()
                    .map_err(|e| AppError::config(format!("Invalid PORT value '{}': {}", value, e)))?;
            },
            "ENABLE_COLOR" => {
                value
                    .parse::<bool>()
                    .map_err(|e| AppError::config(format!("Invalid ENABLE_COLOR value '{}': {}", value, e)))?;
            },
            _ => {},
        }

        Ok(())
    }

    /// All supported environment variables with descriptions and examples
    pub fn get_supported_env_vars() -> Vec<(&'static str, &'static str, &'static str)> {
        vec![
            ("SERVER_URL", "Base URL of the speed test server", "http://192.168.1.10:3000"),
            ("TEST_DURATION", "Transfer phase length in seconds (min 5)", "10"),
            ("PARALLEL", "Concurrent download workers (1-8)", "4"),
            ("CHUNK_MB", "Download request size in MiB (min 5)", "20"),
            ("UPLOAD_MB", "Upload payload size in MiB (1-1024)", "2"),
            ("PING_COUNT", "Number of latency probes (1-100)", "7"),
            ("PING_INTERVAL_MS", "Pause between latency probes", "100"),
            ("REQUEST_TIMEOUT", "Latency probe timeout in seconds (1-300)", "10"),
            ("HOST", "Interface the server binds to", "0.0.0.0"),
            ("PORT", "Port the server listens on", "3000"),
            ("STATIC_DIR", "Directory of static files to serve", "public"),
            ("ENABLE_COLOR", "Enable colored output", "true"),
        ]
    }

    /// Environment variable help text
    pub fn display_env_help() -> String {
        let mut help = String::new();
        help.push_str("Supported Environment Variables:\n\n");

        for (var, description, example) in Self::get_supported_env_vars() {
            help.push_str(&format!("  {:<18} {}\n", var, description));
            help.push_str(&format!("  {:<18} Example: {}\n\n", "", example));
        }

        help.push_str("Configuration Priority (highest to lowest):\n");
        help.push_str("  1. Command-line arguments\n");
        help.push_str("  2. Environment variables\n");
        help.push_str("  3. .env file values\n");
        help.push_str("  4. Default values\n");

        help
    }

    /// Validate all currently set environment variables
    pub fn validate_current_env() -> Vec<String> {
        Self::validate_env_values(
            Self::get_supported_env_vars()
                .into_iter()
                .filter_map(|(var_name, _, _)| Some((var_name, std::env::var(var_name).ok()?))),
        )
    }

    /// Problems with the given variable values, one message per bad value
    pub fn validate_env_values<'a, I>(values: I) -> Vec<String>
    where
        I: IntoIterator<Item = (&'a str, String)>,
    {
        values
            .into_iter()
            .filter_map(|(var_name, value)| {
                Self::validate_env_var(var_name, value.trim())
                    .err()
                    .map(|e| format!("Warning: {}", e))
            })
            .collect()
    }
}
