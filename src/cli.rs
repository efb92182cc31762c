//! CLI arguments and subcommands for prlmk.
//!
//! This module defines the command-line interface structure using the clap library,
//! including all flags, options, and subcommands.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Log level options for CLI parsing
#[derive(Debug, Clone, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Configuration format options for output
#[derive(Debug, Clone, ValueEnum)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

/// Main CLI arguments structure
#[derive(Parser, Debug)]
#[command(
    name = "prlmk",
    about = "Proactive low-memory killer driven by memory pressure",
    long_about = "Proactive low-memory killer driven by memory pressure.\n\n\
                  Watches the kernel's memory pressure signal and, once it crosses a threshold, \
                  either reclaims anonymous memory from the heaviest processes (no low-memory \
                  state) or terminates processes in policy order until pressure is relieved.",
    version = "0.1.0",
    propagate_version = true
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Log level
    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,

    /// Config file (YAML/JSON/TOML)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Disable all config file loading
    #[arg(long)]
    pub no_config: bool,

    /// Print effective merged config and exit
    #[arg(long)]
    pub show_config: bool,

    /// Output format for --show-config
    #[arg(long, value_enum, default_value = "yaml")]
    pub config_format: ConfigFormat,

    /// Validate config and exit (return code 1 on error)
    #[arg(long)]
    pub check_config: bool,

    /// Log reclaim and kill decisions without acting on them
    #[arg(long)]
    pub dry_run: bool,

    /// Root of the proc filesystem
    #[arg(long)]
    pub proc_root: Option<PathBuf>,

    /// Pressure polling interval in milliseconds
    #[arg(long)]
    pub poll_interval_ms: Option<u64>,

    /// Pressure (0-100) at or above which a decision pass runs
    #[arg(long)]
    pub pressure_max: Option<u64>,

    /// Adjustment score below which processes are only killed under critical pressure
    #[arg(long, allow_negative_numbers = true)]
    pub min_adj: Option<i16>,

    /// Active file pages below which file pressure is reported
    #[arg(long)]
    pub free_file_limit: Option<u64>,

    /// Free swap in MiB below which swap pressure is reported (0 disables the swap check)
    #[arg(long)]
    pub free_swap_limit: Option<u64>,

    /// Keep only the heaviest process per supplementary group as kill candidate
    #[arg(long)]
    pub kill_heaviest_gid: Option<bool>,
}

/// Subcommands for additional functionality
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate configuration and system requirements
    Check {
        /// Check the kernel interfaces used for reclaim and termination
        #[arg(long)]
        kernel: bool,

        /// Check /proc filesystem
        #[arg(long)]
        proc: bool,

        /// Check all system requirements
        #[arg(long)]
        all: bool,
    },

    /// Generate configuration files
    Config {
        /// Output file path ("-" for stdout)
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value = "yaml")]
        format: ConfigFormat,

        /// Include comments and examples
        #[arg(long)]
        commented: bool,
    },

    /// Print the current pressure state and candidate set without acting
    Snapshot {
        /// Show every candidate, not just the summary
        #[arg(long)]
        verbose: bool,

        /// Output format
        #[arg(long, value_enum, default_value = "yaml")]
        format: ConfigFormat,
    },
}
