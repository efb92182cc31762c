//! Config command implementation.
//!
//! Generates configuration files in various formats.

use std::fs;
use std::path::PathBuf;

use crate::cli::ConfigFormat;
use crate::config::{render, Config};

/// Generates configuration files.
pub fn command_config(
    output: Option<PathBuf>,
    format: ConfigFormat,
    commented: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::default();
    let output = output.unwrap_or_else(|| PathBuf::from("prlmk.yaml"));

    let mut content = render(&config, &format)?;
    if commented && matches!(format, ConfigFormat::Yaml) {
        content = add_config_comments(content);
    }

    if output.to_string_lossy() == "-" {
        print!("{}", content);
    } else {
        fs::write(&output, content)?;
        println!("✅ Configuration written to: {}", output.display());
    }

    Ok(())
}

/// Adds comments to YAML configuration.
fn add_config_comments(yaml: String) -> String {
    let comments = r#"# prlmk Configuration
# ====================
#
# Host Interfaces
# ---------------
# proc_root: "/proc"                    # Root of the proc filesystem
# meminfo_path: "/proc/meminfo"         # System memory counters
# psi_path: "/proc/pressure/memory"     # Memory pressure stall information
# psi_line: "some"                      # "some" or "full" PSI line
#
# Daemon Behavior
# ---------------
# poll_interval_ms: 250                 # Pressure polling interval
# kill_settle_ms: 20                    # Pause after each kill
# worker_nice: -10                      # Nice value of the decision worker
# dry_run: false                        # Log decisions without acting
#
# Tunables (reloaded on SIGHUP)
# -----------------------------
# tunables:
#   pressure_max: 90                    # Pressure (0-100) that starts a decision pass
#   min_adj: 300                        # Below this score, kill only under critical pressure
#   free_file_limit: 20000              # Active file pages that count as file pressure
#   free_swap_limit: 20                 # Free swap in MiB that counts as swap pressure (0 = off)
#   kill_heaviest_gid: true             # Keep only the heaviest process per group
"#;

    format!("{comments}\n{yaml}")
}
