//! Configuration management for prlmk.
//!
//! This module handles loading, merging, and validating configuration from files
//! and CLI arguments. It supports YAML, JSON, and TOML formats.

use crate::cli::{Args, ConfigFormat};
use prlmk::Tunables;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

// Default configuration constants
pub const DEFAULT_PROC_ROOT: &str = "/proc";
pub const DEFAULT_MEMINFO_PATH: &str = "/proc/meminfo";
pub const DEFAULT_PSI_PATH: &str = "/proc/pressure/memory";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 250;
pub const DEFAULT_KILL_SETTLE_MS: u64 = 20;
pub const DEFAULT_WORKER_NICE: i32 = -10;

/// Default config file locations, searched in order.
const DEFAULT_CONFIG_PATHS: [&str; 6] = [
    "/etc/prlmk/prlmk.yaml",
    "/etc/prlmk/prlmk.yml",
    "/etc/prlmk/prlmk.json",
    "/etc/prlmk/prlmk.toml",
    "./prlmk.yaml",
    "./prlmk.yml",
];

/// Enhanced configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Host interfaces
    pub proc_root: Option<PathBuf>,
    pub meminfo_path: Option<PathBuf>,
    pub psi_path: Option<PathBuf>,
    /// "some" | "full"
    pub psi_line: Option<String>,

    // Daemon behavior
    pub poll_interval_ms: Option<u64>,
    pub kill_settle_ms: Option<u64>,
    pub worker_nice: Option<i32>,
    pub dry_run: Option<bool>,

    // Policy knobs, reloaded on SIGHUP
    #[serde(default)]
    pub tunables: Tunables,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            proc_root: Some(PathBuf::from(DEFAULT_PROC_ROOT)),
            meminfo_path: Some(PathBuf::from(DEFAULT_MEMINFO_PATH)),
            psi_path: Some(PathBuf::from(DEFAULT_PSI_PATH)),
            psi_line: Some("some".into()),
            poll_interval_ms: Some(DEFAULT_POLL_INTERVAL_MS),
            kill_settle_ms: Some(DEFAULT_KILL_SETTLE_MS),
            worker_nice: Some(DEFAULT_WORKER_NICE),
            dry_run: Some(false),
            tunables: Tunables::default(),
        }
    }
}

/// Validate effective config (used by --check-config and at startup)
pub fn validate_effective_config(cfg: &Config) -> Result<(), Box<dyn std::error::Error>> {
    cfg.tunables.validate()?;

    if cfg.poll_interval_ms == Some(0) {
        return Err("poll_interval_ms must be greater than 0".into());
    }

    if let Some(line) = cfg.psi_line.as_deref() {
        if line != "some" && line != "full" {
            return Err(format!("Invalid psi_line '{}', expected 'some' or 'full'", line).into());
        }
    }

    if let Some(nice) = cfg.worker_nice {
        if !(-20..=19).contains(&nice) {
            return Err(format!("worker_nice must be within -20..=19, got {}", nice).into());
        }
    }

    Ok(())
}

/// Resolves configuration from CLI args, config file, and defaults.
/// This enforces precedence: CLI (if provided) > config file > default.
pub fn resolve_config(args: &Args) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = if args.no_config {
        Config::default()
    } else {
        load_config(args.config.as_deref())?
    };

    if let Some(root) = &args.proc_root {
        config.proc_root = Some(root.clone());
    }
    if let Some(ms) = args.poll_interval_ms {
        config.poll_interval_ms = Some(ms);
    }
    if args.dry_run {
        config.dry_run = Some(true);
    }

    // Tunable overrides: CLI wins if provided
    let t = &mut config.tunables;
    if let Some(v) = args.pressure_max {
        t.pressure_max = v;
    }
    if let Some(v) = args.min_adj {
        t.min_adj = v;
    }
    if let Some(v) = args.free_file_limit {
        t.free_file_limit = v;
    }
    if let Some(v) = args.free_swap_limit {
        t.free_swap_limit = v;
    }
    if let Some(v) = args.kill_heaviest_gid {
        t.kill_heaviest_gid = v;
    }

    Ok(config)
}

/// Finds the config file to load: the explicit path if given, else the first
/// existing default location.
pub fn find_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    match explicit {
        Some(p) => Some(p.to_path_buf()),
        None => DEFAULT_CONFIG_PATHS
            .iter()
            .find(|p| Path::new(p).exists())
            .map(PathBuf::from),
    }
}

/// Enhanced configuration loading with multiple format support
pub fn load_config(path: Option<&Path>) -> Result<Config, Box<dyn std::error::Error>> {
    let path = match find_config_path(path) {
        Some(p) if p.exists() => p,
        _ => return Ok(Config::default()),
    };

    let content = fs::read_to_string(&path)?;

    match path.extension().and_then(|s| s.to_str()) {
        Some("json") => {
            let config: Config = serde_json::from_str(&content)?;
            info!("Loaded JSON configuration from: {}", path.display());
            Ok(config)
        }
        Some("toml") => {
            let config: Config = toml::from_str(&content)?;
            info!("Loaded TOML configuration from: {}", path.display());
            Ok(config)
        }
        _ => {
            // Default to YAML
            let config: Config = serde_yaml::from_str(&content)?;
            info!("Loaded YAML configuration from: {}", path.display());
            Ok(config)
        }
    }
}

/// Renders a serializable value in the requested format.
pub fn render<T: Serialize>(
    value: &T,
    format: &ConfigFormat,
) -> Result<String, Box<dyn std::error::Error>> {
    Ok(match format {
        ConfigFormat::Json => serde_json::to_string_pretty(value)?,
        ConfigFormat::Toml => toml::to_string_pretty(value)?,
        ConfigFormat::Yaml => serde_yaml::to_string(value)?,
    })
}

/// Shows configuration in requested format
pub fn show_config(
    config: &Config,
    format: ConfigFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let output = render(config, &format)?;
    println!("{output}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::tempdir;

    #[test]
    fn test_default_config_is_valid() {
        let cfg = Config::default();
        assert!(validate_effective_config(&cfg).is_ok());
        assert_eq!(cfg.tunables, Tunables::default());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut cfg = Config::default();
        cfg.tunables.pressure_max = 101;
        assert!(validate_effective_config(&cfg).is_err());

        let mut cfg = Config::default();
        cfg.psi_line = Some("most".into());
        assert!(validate_effective_config(&cfg).is_err());

        let mut cfg = Config::default();
        cfg.poll_interval_ms = Some(0);
        assert!(validate_effective_config(&cfg).is_err());
    }

    #[test]
    fn test_load_yaml_with_partial_tunables() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("prlmk.yaml");
        fs::write(
            &path,
            "poll_interval_ms: 500\ntunables:\n  min_adj: 200\n  kill_heaviest_gid: false\n",
        )
        .unwrap();

        let cfg = load_config(Some(&path)).unwrap();
        assert_eq!(cfg.poll_interval_ms, Some(500));
        assert_eq!(cfg.tunables.min_adj, 200);
        assert!(!cfg.tunables.kill_heaviest_gid);
        // unspecified knobs keep their defaults
        assert_eq!(cfg.tunables.pressure_max, 90);
        assert_eq!(cfg.tunables.free_file_limit, 20000);
    }

    #[test]
    fn test_load_toml_and_json() {
        let dir = tempdir().unwrap();

        let toml_path = dir.path().join("prlmk.toml");
        fs::write(&toml_path, "dry_run = true\n[tunables]\npressure_max = 70\n").unwrap();
        let cfg = load_config(Some(&toml_path)).unwrap();
        assert_eq!(cfg.dry_run, Some(true));
        assert_eq!(cfg.tunables.pressure_max, 70);

        let json_path = dir.path().join("prlmk.json");
        fs::write(&json_path, r#"{"tunables": {"free_swap_limit": 0}}"#).unwrap();
        let cfg = load_config(Some(&json_path)).unwrap();
        assert_eq!(cfg.tunables.free_swap_limit, 0);
    }

    #[test]
    fn test_cli_overrides_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("prlmk.yaml");
        fs::write(&path, "tunables:\n  min_adj: 200\n  pressure_max: 80\n").unwrap();

        let args = Args::parse_from([
            "prlmk",
            "--config",
            path.to_str().unwrap(),
            "--min-adj",
            "-100",
            "--dry-run",
        ]);
        let cfg = resolve_config(&args).unwrap();
        assert_eq!(cfg.tunables.min_adj, -100);
        assert_eq!(cfg.tunables.pressure_max, 80);
        assert_eq!(cfg.dry_run, Some(true));
    }

    #[test]
    fn test_no_config_uses_defaults() {
        let args = Args::parse_from(["prlmk", "--no-config", "--pressure-max", "60"]);
        let cfg = resolve_config(&args).unwrap();
        assert_eq!(cfg.tunables.pressure_max, 60);
        assert_eq!(cfg.proc_root, Some(PathBuf::from(DEFAULT_PROC_ROOT)));
    }

    #[test]
    fn test_render_formats() {
        let cfg = Config::default();
        assert!(render(&cfg, &ConfigFormat::Yaml).unwrap().contains("pressure_max"));
        assert!(render(&cfg, &ConfigFormat::Json).unwrap().contains("\"tunables\""));
        assert!(render(&cfg, &ConfigFormat::Toml).unwrap().contains("[tunables]"));
    }
}
