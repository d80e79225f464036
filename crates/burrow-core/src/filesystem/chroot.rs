//! Root filesystem switching via `chroot(2)`.
//!
//! Unlike `pivot_root(2)` this needs no mount namespace, which keeps the
//! staging root a plain directory. There is no way back once it succeeds.

use std::path::Path;

use burrow_common::error::{BurrowError, Result};

/// Changes the root of the calling process to `new_root` and moves the
/// working directory to the new `/`.
///
/// # Errors
///
/// Returns `BurrowError::Privilege` if `new_root` is not a directory, or if
/// `chroot(2)` or the following `chdir(2)` fails (usually `EPERM` without
/// `CAP_SYS_CHROOT`).
#[cfg(target_os = "linux")]
pub fn swap_root(new_root: &Path) -> Result<()> {
    use nix::unistd::{chdir, chroot};

    if !new_root.is_dir() {
        return Err(BurrowError::Privilege {
            operation: "chroot",
            message: format!("{} is not a directory", new_root.display()),
        });
    }

    chroot(new_root).map_err(|e| BurrowError::Privilege {
        operation: "chroot",
        message: format!("{}: {e}", new_root.display()),
    })?;
    chdir("/").map_err(|e| BurrowError::Privilege {
        operation: "chdir",
        message: format!("entering new root: {e}"),
    })?;

    tracing::debug!(new_root = %new_root.display(), "root swapped");
    Ok(())
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error — the root swap requires Linux.
#[cfg(not(target_os = "linux"))]
pub fn swap_root(_new_root: &Path) -> Result<()> {
    Err(BurrowError::Privilege {
        operation: "chroot",
        message: "Linux required for isolated launches".into(),
    })
}
