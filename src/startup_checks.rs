//! Startup requirement validation for prlmk.
//!
//! This module validates that the daemon has the privileges and kernel
//! interfaces it needs before the pressure listener is registered.

use nix::unistd::geteuid;
use prlmk::process::signal::pidfd_open;
use std::fs;
use std::path::Path;
use tracing::{error, info, warn};

/// Validate all runtime requirements
pub fn validate_requirements(proc_root: &Path, psi_path: &Path) -> Result<(), ValidationError> {
    info!("🔍 Validating runtime requirements...");

    check_user_privileges();
    check_proc_access(proc_root)?;
    check_psi(psi_path)?;
    check_pidfd();

    info!("✅ All runtime requirements validated");
    Ok(())
}

/// Check if running with sufficient privileges
fn check_user_privileges() {
    if !geteuid().is_root() {
        warn!("⚠️  Not running as root - kills and reclaim of foreign processes will fail");
        warn!("   Recommendation: run as root or grant CAP_KILL and CAP_SYS_NICE");
    } else {
        info!("✅ Running as root (uid=0)");
    }
}

/// Check that other users' process attributes are readable
fn check_proc_access(proc_root: &Path) -> Result<(), ValidationError> {
    let test_file = proc_root.join("1").join("status");

    match fs::metadata(&test_file) {
        Ok(_) => {
            info!("✅ {} access: Can read process attributes", proc_root.display());
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            error!("❌ Cannot read {} - insufficient permissions", test_file.display());
            Err(ValidationError::InsufficientPermissions(e.to_string()))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound && !proc_root.exists() => {
            error!("❌ {} not found", proc_root.display());
            Err(ValidationError::ProcNotMounted(proc_root.display().to_string()))
        }
        Err(e) => {
            warn!("⚠️  Could not test {} access: {}", proc_root.display(), e);
            Ok(())
        }
    }
}

/// Check that the pressure source exists
fn check_psi(psi_path: &Path) -> Result<(), ValidationError> {
    if !psi_path.exists() {
        error!("❌ {} not found - PSI support missing", psi_path.display());
        error!("   Solution: boot with psi=1 or enable CONFIG_PSI");
        return Err(ValidationError::PsiUnavailable(psi_path.display().to_string()));
    }
    info!("✅ Pressure source available at {}", psi_path.display());
    Ok(())
}

/// Check pidfd support; without it termination falls back to kill(2)
pub fn check_pidfd() -> bool {
    match pidfd_open(std::process::id() as i32) {
        Ok(_) => {
            info!("✅ pidfd support available");
            true
        }
        Err(e) => {
            warn!("⚠️  pidfd_open failed: {} - falling back to kill(2), reclaim disabled", e);
            false
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Insufficient permissions: {0}")]
    InsufficientPermissions(String),

    #[error("proc filesystem not mounted at {0}")]
    ProcNotMounted(String),

    #[error("Pressure stall information not available at {0}")]
    PsiUnavailable(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_psi_is_error() {
        let err = check_psi(Path::new("/nonexistent/pressure/memory")).unwrap_err();
        assert!(matches!(err, ValidationError::PsiUnavailable(_)));
    }

    #[test]
    fn test_missing_proc_root_is_error() {
        let err = check_proc_access(Path::new("/nonexistent-proc")).unwrap_err();
        assert!(matches!(err, ValidationError::ProcNotMounted(_)));
    }

    #[test]
    fn test_fake_proc_root_passes() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("1")).unwrap();
        fs::write(dir.path().join("1").join("status"), "Name:\tinit\n").unwrap();
        let psi = dir.path().join("memory");
        fs::write(&psi, "some avg10=0.00 avg60=0.00 avg300=0.00 total=0\n").unwrap();

        assert!(validate_requirements(dir.path(), &psi).is_ok());
    }
}
