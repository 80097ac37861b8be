//! Command-line interface

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Network speed tester: latency, download and upload throughput over HTTP
#[derive(Parser, Debug, Clone)]
#[command(name = "nst")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Force colored output
    #[arg(long, global = true)]
    pub color: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Enable verbose output
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Enable debug output
    #[arg(long, global = true)]
    pub debug: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Serve the probe and traffic endpoints
    Serve(ServeArgs),
    /// Measure latency, download and upload against a server
    Run(RunArgs),
    /// List supported environment variables and check the current values
    Env(EnvArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct EnvArgs {
    /// Write an example .env file to this path
    #[arg(long, value_name = "PATH")]
    pub write_example: Option<PathBuf>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ServeArgs {
    /// Interface to bind
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on (0 picks a free port)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Directory of static files to serve next to the API
    #[arg(long, value_name = "DIR")]
    pub static_dir: Option<PathBuf>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Base URL of the speed test server
    #[arg(long = "url", value_name = "URL")]
    pub server_url: Option<String>,

    /// Length of each transfer phase in seconds (minimum 5)
    #[arg(short, long, value_name = "SECS")]
    pub duration: Option<u64>,

    /// Concurrent download workers (1 to 8)
    #[arg(short, long)]
    pub parallel: Option<usize>,

    /// Size of each download request in MiB (minimum 5)
    #[arg(long, value_name = "MB")]
    pub chunk_mb: Option<u64>,

    /// Size of the upload payload in MiB (1 to 1024)
    #[arg(long, value_name = "MB")]
    pub upload_mb: Option<u64>,

    /// Number of latency probes
    #[arg(long)]
    pub ping_count: Option<u32>,

    /// Latency probe timeout in seconds
    #[arg(short, long, value_parser = parse_timeout, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    /// Validate CLI arguments for conflicts
    pub fn validate(&self) -> Result<(), String> {
        if self.color && self.no_color {
            return Err("Cannot specify both --color and --no-color".to_string());
        }
        Ok(())
    }

    /// Check if colors should be enabled
    pub fn use_colors(&self) -> bool {
        if self.color {
            true
        } else if self.no_color {
            false
        } else {
            supports_color()
        }
    }

    pub fn is_serve(&self) -> bool {
        matches!(self.command, Command::Serve(_))
    }
}

/// Parse a probe timeout in whole seconds
fn parse_timeout(s: &str) -> Result<u64, String> {
    if s.starts_with('+') || s.starts_with("0x") || s.starts_with("0X") {
        return Err(format!("Invalid timeout: {}", s));
    }

    s.parse::<u64>()
        .map_err(|_| format!("Invalid timeout: {}", s))
        .and_then(|secs| {
            if secs == 0 {
                Err("Timeout must be greater than 0".to_string())
            } else if secs > 300 {
                Err("Timeout cannot exceed 300 seconds".to_string())
            } else {
                Ok(secs)
            }
        })
}

/// Check if the terminal supports color output
fn supports_color() -> bool {
    if let Ok(term) = std::env::var("TERM") {
        if term == "dumb" {
            return false;
        }
    }

    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }

    if std::env::var("FORCE_COLOR").is_ok() {
        return true;
    }

    #[cfg(target_os = "windows")]
    {
        if std::env::var("ANSICON").is_ok() || std::env::var("ConEmuANSI").is_ok() {
            return true;
        }
    }

    #[cfg(unix)]
    {
        true
    }
    #[cfg(not(unix))]
    {
        false
    }
}
