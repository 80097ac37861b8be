//! Network Speed Tester - Main CLI Application
//!
//! `nst serve` hosts the probe and traffic endpoints; `nst run` measures
//! latency, download and upload against such a server.

use clap::Parser;
use net_speed_tester::{
    cli::{Cli, Command, EnvArgs},
    config::{display_config_summary, load_config, validate_config, EnvManager, ValidationLevel},
    error::{AppError, ErrorReporter, Result},
    executor::{RunOutcome, SpeedTestExecutor},
    log_debug,
    logging::LoggerFactory,
    models::Config,
    output::{ConsoleProgress, OutputFormatterFactory},
    server::SpeedTestServer,
    PKG_NAME, VERSION,
};
use std::process;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panic: {}", panic_info);
        process::exit(1);
    }));

    let cli = Cli::parse();
    if let Err(message) = cli.validate() {
        eprintln!("Error: {}", message);
        process::exit(1);
    }

    let reporter = ErrorReporter::new(cli.use_colors(), cli.verbose);

    if let Err(e) = run_application(cli).await {
        reporter.report_error(&e);
        process::exit(e.exit_code());
    }
}

/// Main application logic
async fn run_application(cli: Cli) -> Result<()> {
    if cli.debug {
        eprintln!("{} v{}", PKG_NAME, VERSION);
        eprintln!("Built {} from {} for {}", env!("BUILD_TIME"), env!("GIT_COMMIT"), env!("TARGET_TRIPLE"));
        eprintln!("Debug mode enabled");
        eprintln!();
    }

    if let Command::Env(args) = &cli.command {
        return show_env(args, cli.debug);
    }

    let is_serve = cli.is_serve();
    let config = load_config(cli)?;

    if config.debug {
        eprintln!("Configuration loaded successfully:");
        for line in display_config_summary(&config).lines() {
            eprintln!("  {}", line);
        }
        eprintln!();
    }

    for warning in validate_config(&config)? {
        if warning.level != ValidationLevel::Info || config.verbose {
            eprintln!("{}", warning.format(config.enable_color));
        }
    }

    if is_serve {
        serve(&config).await
    } else {
        run_speed_test(&config).await
    }
}

/// Describe the supported variables and flag bad values. Runs before
/// config loading so that a bad value is reported rather than fatal.
fn show_env(args: &EnvArgs, debug: bool) -> Result<()> {
    EnvManager::load_env_file(debug)?;
    println!("{}", EnvManager::display_env_help());

    for warning in EnvManager::validate_current_env() {
        eprintln!("{}", warning);
    }

    if let Some(path) = &args.write_example {
        EnvManager::save_example_env_file(path)?;
        println!("Wrote example configuration to {}", path.display());
    }
    Ok(())
}

async fn serve(config: &Config) -> Result<()> {
    SpeedTestServer::new(config).run().await
}

async fn run_speed_test(config: &Config) -> Result<()> {
    let logger = LoggerFactory::new(config.clone()).create_logger(PKG_NAME).await;
    let mut executor = SpeedTestExecutor::new(config, logger.clone())?;
    log_debug!(logger, "Measurement plan: {:?}", executor.plan());
    if !config.json_output {
        executor = executor.with_observer(Arc::new(ConsoleProgress::new(config.enable_color)));
    }

    if config.verbose && !config.json_output {
        eprintln!("Testing against {}", config.server_url);
    }

    let report = match executor.run().await? {
        RunOutcome::Completed(report) => report,
        RunOutcome::AlreadyRunning => {
            return Err(AppError::test_execution("A speed test is already running"));
        },
    };

    logger
        .info("Speed test completed")
        .latency(&report.latency)
        .field("download_mbps", report.download.mbps)
        .field("upload_mbps", report.upload.mbps)
        .field("duration_ms", report.total_duration().num_milliseconds())
        .log()
        .await;

    let formatter = OutputFormatterFactory::create_formatter(config.enable_color, config.verbose, config.json_output);
    println!("{}", formatter.format_report(&report)?);

    Ok(())
}

