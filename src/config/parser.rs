//! Configuration parsing from CLI arguments and environment variables

use crate::{
    cli::{Cli, Command},
    config::env::EnvManager,
    error::Result,
    executor::plan,
    models::Config,
};

/// Configuration parser that layers defaults, `.env`, the environment and
/// CLI arguments, in that order of increasing priority
pub struct ConfigParser {
    cli: Cli,
}

impl ConfigParser {
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Parse and build the complete configuration
    pub fn parse(&self) -> Result<Config> {
        let mut config = Config::default();

        EnvManager::load_env_file(self.cli.debug)?;
        config.merge_from_env()?;
        self.apply_cli_overrides(&mut config);

        config.validate()?;
        Ok(config)
    }

    fn apply_cli_overrides(&self, config: &mut Config) {
        if self.cli.no_color {
            config.enable_color = false;
        } else if self.cli.color {
            config.enable_color = true;
        }

        // CLI-only flags
        config.verbose = self.cli.verbose;
        config.debug = self.cli.debug;

        match &self.cli.command {
            Command::Serve(args) => {
                if let Some(host) = &args.host {
                    config.host = host.clone();
                }
                if let Some(port) = args.port {
                    config.port = port;
                }
                if let Some(dir) = &args.static_dir {
                    config.static_dir = Some(dir.clone());
                }
            },
            Command::Run(args) => {
                if let Some(url) = &args.server_url {
                    config.server_url = url.clone();
                }
                if let Some(duration) = args.duration {
                    config.duration_secs = duration;
                }
                if let Some(parallel) = args.parallel {
                    config.parallel = parallel;
                }
                if let Some(chunk_mb) = args.chunk_mb {
                    config.chunk_mb = chunk_mb;
                }
                if let Some(upload_mb) = args.upload_mb {
                    config.upload_mb = upload_mb;
                }
                if let Some(ping_count) = args.ping_count {
                    config.ping_count = ping_count;
                }
                if let Some(timeout) = args.timeout {
                    config.request_timeout_secs = timeout;
                }
                config.json_output = args.json;
            },
            Command::Env(_) => {},
        }
    }
}

/// Convenience function to load complete configuration from CLI arguments
pub fn load_config(cli: Cli) -> Result<Config> {
    ConfigParser::new(cli).parse()
}

/// Configuration summary for debug output. Measurement sizes are shown as
/// they will actually run.
pub fn display_config_summary(config: &Config) -> String {
    let mut summary = Vec::new();

    summary.push(format!("Server URL: {}", config.server_url));
    summary.push(format!("Duration: {}s", plan::clamp_duration_secs(config.duration_secs)));
    summary.push(format!(
        "Parallel: {} download / {} upload",
        plan::clamp_parallel(config.parallel),
        plan::upload_worker_count(plan::clamp_parallel(config.parallel))
    ));
    summary.push(format!("Chunk: {} MiB", plan::clamp_chunk_mb(config.chunk_mb)));
    summary.push(format!("Upload payload: {} MiB", plan::clamp_upload_mb(config.upload_mb)));
    summary.push(format!("Ping: {} probes, {}ms apart", config.ping_count, config.ping_interval_ms));
    summary.push(format!("Probe timeout: {}s", config.request_timeout_secs));
    summary.push(format!("Bind: {}", config.bind_addr()));
    if let Some(dir) = &config.static_dir {
        summary.push(format!("Static dir: {}", dir.display()));
    }
    summary.push(format!("Color Output: {}", config.enable_color));
    summary.push(format!("Verbose: {}", config.verbose));
    summary.push(format!("Debug: {}", config.debug));

    summary.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::env;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clear_env() {
        for (var_name, _, _) in EnvManager::get_supported_env_vars() {
            env::remove_var(var_name);
        }
    }

    #[test]
    fn test_run_overrides() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();

        let cli = Cli::parse_from([
            "nst", "--verbose", "run", "--url", "http://10.1.2.3:8080", "-d", "20", "-p", "6", "--json",
        ]);
        let config = ConfigParser::new(cli).parse().unwrap();

        assert_eq!(config.server_url, "http://10.1.2.3:8080");
        assert_eq!(config.duration_secs, 20);
        assert_eq!(config.parallel, 6);
        assert!(config.json_output);
        assert!(config.verbose);
        assert!(!config.debug);
    }

    #[test]
    fn test_cli_beats_environment() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        env::set_var("PARALLEL", "2");
        env::set_var("CHUNK_MB", "30");

        let cli = Cli::parse_from(["nst", "run", "--parallel", "5"]);
        let config = ConfigParser::new(cli).parse().unwrap();

        assert_eq!(config.parallel, 5);
        assert_eq!(config.chunk_mb, 30);
        clear_env();
    }

    #[test]
    fn test_serve_overrides() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();

        let cli = Cli::parse_from(["nst", "serve", "--host", "127.0.0.1", "--port", "0", "--static-dir", "public"]);
        let config = ConfigParser::new(cli).parse().unwrap();

        assert_eq!(config.bind_addr(), "127.0.0.1:0");
        assert_eq!(config.static_dir.as_deref(), Some(std::path::Path::new("public")));
    }

    #[test]
    fn test_invalid_url_rejected() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();

        let cli = Cli::parse_from(["nst", "run", "--url", "ftp://example.com"]);
        assert!(ConfigParser::new(cli).parse().is_err());
    }

    #[test]
    fn test_summary_shows_clamped_values() {
        let config = Config {
            duration_secs: 1,
            parallel: 12,
            ..Default::default()
        };
        let summary = display_config_summary(&config);
        assert!(summary.contains("Duration: 5s"));
        assert!(summary.contains("Parallel: 8 download / 5 upload"));
        assert!(summary.contains("Server URL: http://127.0.0.1:3000"));
    }
}
