//! Pinned process handles and forced termination.
//!
//! A pidfd refers to one specific process, so a signal sent through it can
//! never hit an unrelated process that inherited a recycled pid. Kernels
//! without pidfd support fall back to plain `kill(2)`.

use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
use std::ptr;

use crate::error::LmkError;
use crate::lmk::host::ProcessRef;

/// Opens a pidfd for `pid`.
pub fn pidfd_open(pid: i32) -> Result<OwnedFd, Errno> {
    // SAFETY: pidfd_open takes a pid and flags and returns a new descriptor or -1.
    let fd = unsafe { libc::syscall(libc::SYS_pidfd_open, pid, 0) };
    if fd < 0 {
        return Err(Errno::last());
    }
    // SAFETY: the kernel just handed us ownership of this descriptor.
    Ok(unsafe { OwnedFd::from_raw_fd(fd as i32) })
}

/// Pins `pid`, falling back to a pid-only handle when no pidfd can be opened.
pub fn pin(pid: i32) -> ProcessRef {
    match pidfd_open(pid) {
        Ok(fd) => ProcessRef::with_pidfd(pid, fd),
        Err(_) => ProcessRef::new(pid),
    }
}

fn pidfd_send_signal(process: &ProcessRef, sig: Signal) -> Option<Result<(), Errno>> {
    let fd = process.pidfd()?;
    // SAFETY: fd is a live pidfd borrowed from `process`; info may be null.
    let rc = unsafe {
        libc::syscall(
            libc::SYS_pidfd_send_signal,
            fd.as_raw_fd(),
            sig as libc::c_int,
            ptr::null::<libc::siginfo_t>(),
            0,
        )
    };
    Some(if rc < 0 { Err(Errno::last()) } else { Ok(()) })
}

/// Sends SIGKILL. A process that is already gone counts as success.
pub fn terminate(process: &ProcessRef) -> Result<(), LmkError> {
    let result = match pidfd_send_signal(process, Signal::SIGKILL) {
        Some(Err(Errno::ENOSYS)) | None => {
            signal::kill(Pid::from_raw(process.pid()), Signal::SIGKILL)
        }
        Some(result) => result,
    };

    match result {
        Ok(()) | Err(Errno::ESRCH) => Ok(()),
        Err(e) => Err(LmkError::Signal {
            pid: process.pid(),
            source: e.into(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command;

    #[test]
    fn test_terminate_child() {
        let mut child = Command::new("sleep").arg("30").spawn().expect("spawn sleep");
        let process = pin(child.id() as i32);

        terminate(&process).expect("terminate child");
        let status = child.wait().expect("wait child");
        assert!(!status.success());
    }

    #[test]
    fn test_terminate_reaped_child_is_ok() {
        let mut child = Command::new("true").spawn().expect("spawn true");
        let process = pin(child.id() as i32);
        child.wait().expect("wait child");

        assert!(terminate(&process).is_ok());
    }
}
