//! prlmk - version 0.1.0
//!
//! Proactive low-memory killer daemon with tracing logging.
//! This is the main entry point that starts the daemon and handles subcommands.

mod cli;
mod commands;
mod config;
mod daemon;
mod startup_checks;

use clap::Parser;
use tracing::{error, info, Level};

use cli::{Args, Commands, LogLevel};
use commands::{command_check, command_config, command_snapshot};
use config::{resolve_config, show_config, validate_effective_config, Config};
use daemon::DaemonOptions;

/// Initializes tracing logging subsystem with configured log level.
fn setup_logging(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let log_level = match args.log_level {
        LogLevel::Off => Level::ERROR,
        LogLevel::Error => Level::ERROR,
        LogLevel::Warn => Level::WARN,
        LogLevel::Info => Level::INFO,
        LogLevel::Debug => Level::DEBUG,
        LogLevel::Trace => Level::TRACE,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Logging initialized with level: {:?}", args.log_level);
    Ok(())
}

/// Helper function to load and validate configuration.
/// Exits the process with error code 1 if validation fails.
fn load_validated_config(args: &Args) -> Result<Config, Box<dyn std::error::Error>> {
    let config = resolve_config(args)?;
    if let Err(e) = validate_effective_config(&config) {
        eprintln!("❌ Configuration invalid: {}", e);
        std::process::exit(1);
    }
    Ok(config)
}

/// Main application entry point.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Early config resolution for show/check modes
    if args.show_config || args.check_config {
        let config = resolve_config(&args)?;

        if args.check_config {
            if let Err(e) = validate_effective_config(&config) {
                eprintln!("❌ Configuration invalid: {}", e);
                std::process::exit(1);
            }
            println!("✅ Configuration is valid");
            return Ok(());
        }

        return show_config(&config, args.config_format);
    }

    // Handle subcommands
    if let Some(command) = &args.command {
        if let Commands::Config {
            output,
            format,
            commented,
        } = command
        {
            return command_config(output.clone(), format.clone(), *commented);
        }

        let config = load_validated_config(&args)?;

        return match command {
            Commands::Check { kernel, proc, all } => command_check(*kernel, *proc, *all, &config),
            Commands::Snapshot { verbose, format } => {
                command_snapshot(*verbose, format.clone(), &config)
            }
            Commands::Config { .. } => unreachable!("Config handled above"),
        };
    }

    // Daemon mode
    let config = load_validated_config(&args)?;
    setup_logging(&args)?;

    info!("Starting prlmk");

    let opts = DaemonOptions::from_config(&config);
    if let Err(e) = startup_checks::validate_requirements(&opts.proc_root, &opts.psi_path) {
        error!("❌ Startup validation failed: {}", e);
        return Err(e.into());
    }

    // SIGHUP re-resolves the same sources; CLI overrides keep winning.
    let reload = move || {
        let cfg = resolve_config(&args).map_err(|e| e.to_string())?;
        validate_effective_config(&cfg).map_err(|e| e.to_string())?;
        Ok(cfg.tunables)
    };

    if let Err(e) = daemon::run(opts, config.tunables, reload).await {
        error!("Daemon failed: {:#}", e);
        return Err(e.into());
    }

    info!("prlmk stopped gracefully");
    Ok(())
}
