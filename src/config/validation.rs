//! Configuration validation utilities and rules

use crate::{
    defaults::{MAX_PARALLEL, MAX_UPLOAD_MB, MIN_CHUNK_MB, MIN_DURATION_SECS, MIN_PARALLEL, MIN_UPLOAD_MB},
    error::{AppError, Result},
    executor::plan,
    models::Config,
};
use colored::Colorize;

/// Configuration validator producing non-fatal warnings on top of
/// [`Config::validate`]
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration and collect warnings
    pub fn validate_comprehensive(config: &Config) -> Result<Vec<ValidationWarning>> {
        config.validate()?;

        let mut warnings = Vec::new();
        warnings.extend(Self::validate_server_url(&config.server_url)?);
        warnings.extend(Self::validate_measurement_settings(config));
        warnings.extend(Self::validate_server_settings(config));

        Ok(warnings)
    }

    fn validate_server_url(server_url: &str) -> Result<Vec<ValidationWarning>> {
        let parsed = url::Url::parse(server_url)
            .map_err(|e| AppError::config(format!("Invalid server URL '{}': {}", server_url, e)))?;
        let mut warnings = Vec::new();

        if parsed.query().is_some() {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                format!("Server URL '{}' has a query string; it is dropped from API requests", server_url),
            ));
        }

        if let Some(url::Host::Domain(host)) = parsed.host() {
            if host != "localhost" && parsed.scheme() == "http" {
                warnings.push(ValidationWarning::new(
                    ValidationLevel::Info,
                    format!("Server '{}' is reached over plain HTTP", host),
                ));
            }
        }

        Ok(warnings)
    }

    /// Report values that will be clamped when the run starts
    fn validate_measurement_settings(config: &Config) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        if config.duration_secs < MIN_DURATION_SECS {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!(
                    "Duration of {}s is below the minimum; using {}s",
                    config.duration_secs,
                    plan::clamp_duration_secs(config.duration_secs)
                ),
            ));
        }

        if !(MIN_PARALLEL..=MAX_PARALLEL).contains(&config.parallel) {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!(
                    "Parallel workers must be between {} and {}; using {}",
                    MIN_PARALLEL,
                    MAX_PARALLEL,
                    plan::clamp_parallel(config.parallel)
                ),
            ));
        }

        if config.chunk_mb < MIN_CHUNK_MB {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!("Chunk size of {} MiB is below the minimum; using {} MiB", config.chunk_mb, MIN_CHUNK_MB),
            ));
        }

        if config.upload_mb < MIN_UPLOAD_MB {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!("Upload size of {} MiB is below the minimum; using {} MiB", config.upload_mb, MIN_UPLOAD_MB),
            ));
        }

        if config.upload_mb > MAX_UPLOAD_MB {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!("Upload size of {} MiB is above the maximum; using {} MiB", config.upload_mb, MAX_UPLOAD_MB),
            ));
        }

        if config.ping_count < 3 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                format!("{} latency probe(s) give a noisy median (recommended: >= 3)", config.ping_count),
            ));
        }

        warnings
    }

    fn validate_server_settings(config: &Config) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        if config.port != 0 && config.port < 1024 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                format!("Port {} is privileged and may need elevated rights", config.port),
            ));
        }

        if let Some(dir) = &config.static_dir {
            if !dir.is_dir() {
                warnings.push(ValidationWarning::new(
                    ValidationLevel::Warning,
                    format!("Static directory '{}' does not exist; every asset will 404", dir.display()),
                ));
            }
        }

        warnings
    }
}

/// Validation warning levels
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationLevel {
    Info,
    Warning,
    Error,
}

impl ValidationLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
        }
    }

    /// Get color for terminal display
    pub fn color(&self) -> &'static str {
        match self {
            Self::Info => "blue",
            Self::Warning => "yellow",
            Self::Error => "red",
        }
    }
}

/// Configuration validation warning
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub level: ValidationLevel,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(level: ValidationLevel, message: String) -> Self {
        Self { level, message }
    }

    /// Format warning for display
    pub fn format(&self, use_color: bool) -> String {
        let tag = format!("[{}]", self.level.as_str());
        if use_color {
            format!("{} {}", tag.color(self.level.color()).bold(), self.message)
        } else {
            format!("{} {}", tag, self.message)
        }
    }
}

/// Convenience function for comprehensive configuration validation
pub fn validate_config(config: &Config) -> Result<Vec<ValidationWarning>> {
    ConfigValidator::validate_comprehensive(config)
}
