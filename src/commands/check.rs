//! Check command implementation.
//!
//! Validates system requirements and configuration.

use std::path::Path;

use prlmk::lmk::host::{MemoryCounters, PressureSource};
use prlmk::process::collect_proc_entries;
use prlmk::system::{ProcMemInfo, PsiLine, PsiSource};

use crate::config::{
    validate_effective_config, Config, DEFAULT_MEMINFO_PATH, DEFAULT_PROC_ROOT, DEFAULT_PSI_PATH,
};
use crate::startup_checks::check_pidfd;

/// Validates system requirements and configuration.
pub fn command_check(
    kernel: bool,
    proc: bool,
    all: bool,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("🔍 prlmk - System Check");
    println!("=======================");

    let mut all_ok = true;

    // Check /proc filesystem
    if proc || all {
        let root = config
            .proc_root
            .as_deref()
            .unwrap_or_else(|| Path::new(DEFAULT_PROC_ROOT));
        println!("\n📁 Checking {} filesystem...", root.display());
        if root.exists() {
            let entries = collect_proc_entries(root);
            if entries.is_empty() {
                println!("   ❌ Cannot read any process entries");
                all_ok = false;
            } else {
                println!("   ✅ Can read {} process entries", entries.len());
            }
        } else {
            println!("   ❌ {} not found", root.display());
            all_ok = false;
        }

        let meminfo = config
            .meminfo_path
            .as_deref()
            .unwrap_or_else(|| Path::new(DEFAULT_MEMINFO_PATH));
        if meminfo.exists() {
            let sample = ProcMemInfo::new(meminfo).sample();
            println!(
                "   ✅ Memory counters: active_file={} pages, free_swap={} kB",
                sample.active_file_pages, sample.free_swap_kb
            );
        } else {
            println!("   ❌ {} not found", meminfo.display());
            all_ok = false;
        }
    }

    // Check kernel interfaces
    if kernel || all {
        println!("\n🐧 Checking kernel interfaces...");
        let psi_path = config
            .psi_path
            .as_deref()
            .unwrap_or_else(|| Path::new(DEFAULT_PSI_PATH));
        let line = match config.psi_line.as_deref() {
            Some("full") => PsiLine::Full,
            _ => PsiLine::Some,
        };
        match PsiSource::new(psi_path, line).read_pressure() {
            Ok(p) => println!("   ✅ Memory pressure readable: {}", p),
            Err(e) => {
                println!("   ❌ Memory pressure unavailable: {}", e);
                all_ok = false;
            }
        }

        if check_pidfd() {
            println!("   ✅ pidfd supported (pinned kills and reclaim)");
        } else {
            println!("   ⚠️  pidfd unsupported: kills fall back to kill(2), reclaim disabled");
        }
    }

    // Check configuration
    println!("\n⚙️  Checking configuration...");
    match validate_effective_config(config) {
        Ok(_) => {
            println!("   ✅ Configuration is valid");
        }
        Err(e) => {
            println!("   ❌ Configuration invalid: {}", e);
            all_ok = false;
        }
    }

    println!("\n📋 Summary:");
    if all_ok {
        println!("   ✅ All checks passed - system is ready");
        Ok(())
    } else {
        println!("   ❌ Some checks failed - please review warnings");
        std::process::exit(1);
    }
}
