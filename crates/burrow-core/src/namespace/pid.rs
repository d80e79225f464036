//! PID namespace isolation.
//!
//! Provides the launched command with its own process ID space, where it
//! runs as PID 1.

use burrow_common::error::{BurrowError, Result};

/// Creates a new PID namespace for the children of the calling process.
///
/// The caller itself stays in its original namespace; the next process it
/// spawns becomes PID 1 inside the new one. After this call the caller can
/// no longer create threads, so it must happen after all network work.
///
/// # Errors
///
/// Returns an error if the `unshare(CLONE_NEWPID)` syscall fails.
#[cfg(target_os = "linux")]
pub fn create_pid_namespace() -> Result<()> {
    use nix::sched::{CloneFlags, unshare};

    unshare(CloneFlags::CLONE_NEWPID).map_err(|e| BurrowError::Privilege {
        operation: "unshare(CLONE_NEWPID)",
        message: e.to_string(),
    })?;
    tracing::debug!("PID namespace created");
    Ok(())
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error — PID namespaces require Linux.
#[cfg(not(target_os = "linux"))]
pub fn create_pid_namespace() -> Result<()> {
    Err(BurrowError::Privilege {
        operation: "unshare(CLONE_NEWPID)",
        message: "Linux required for isolated launches".into(),
    })
}
