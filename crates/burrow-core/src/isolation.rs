//! Capability boundary for the privileged operations of a launch.
//!
//! The launcher never calls `chroot(2)` or `unshare(2)` directly; it goes
//! through an [`Isolation`] implementation. [`HostIsolation`] performs the
//! real syscalls, [`SimulatedIsolation`] records what would have happened.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use burrow_common::error::{BurrowError, Result};

/// Privileged operations needed to confine a child process.
pub trait Isolation: Send + Sync {
    /// Makes `root` the filesystem root of the calling process.
    ///
    /// # Errors
    ///
    /// Returns `BurrowError::Privilege` if the swap is refused.
    fn swap_root(&self, root: &Path) -> Result<()>;

    /// Places the next spawned child into a fresh PID namespace.
    ///
    /// # Errors
    ///
    /// Returns `BurrowError::Privilege` if the namespace cannot be created.
    fn isolate_pids(&self) -> Result<()>;

    /// Returns whether this implementation can work on the current platform.
    fn is_available(&self) -> bool;
}

/// Isolation through the host kernel.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostIsolation;

impl Isolation for HostIsolation {
    fn swap_root(&self, root: &Path) -> Result<()> {
        tracing::info!(root = %root.display(), "swapping process root");
        crate::filesystem::chroot::swap_root(root)
    }

    fn isolate_pids(&self) -> Result<()> {
        crate::namespace::pid::create_pid_namespace()
    }

    fn is_available(&self) -> bool {
        cfg!(target_os = "linux")
    }
}

/// A privileged step recorded by [`SimulatedIsolation`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IsolationStep {
    /// A root swap to the given directory.
    SwapRoot(PathBuf),
    /// A PID namespace request.
    IsolatePids,
}

/// Isolation that performs nothing and records each request.
///
/// Processes spawned under it run on the host filesystem, so the command
/// path must exist there too. Failures can be injected per operation.
#[derive(Debug, Default)]
pub struct SimulatedIsolation {
    steps: Mutex<Vec<IsolationStep>>,
    refuse_swap: bool,
    refuse_pids: bool,
    unavailable: bool,
}

impl SimulatedIsolation {
    /// Creates a simulation where every operation succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a simulation whose root swap fails as if unprivileged.
    #[must_use]
    pub fn refusing_root_swap() -> Self {
        Self {
            refuse_swap: true,
            ..Self::default()
        }
    }

    /// Creates a simulation whose PID namespace request fails.
    #[must_use]
    pub fn refusing_pid_namespace() -> Self {
        Self {
            refuse_pids: true,
            ..Self::default()
        }
    }

    /// Returns the steps recorded so far, in call order.
    /// Reports itself as unusable on this platform.
    #[must_use]
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn steps(&self) -> Vec<IsolationStep> {
        self.steps
            .lock()
            .map(|steps| steps.clone())
            .unwrap_or_default()
    }

    fn record(&self, step: IsolationStep) {
        if let Ok(mut steps) = self.steps.lock() {
            steps.push(step);
        }
    }
}

impl Isolation for SimulatedIsolation {
    fn swap_root(&self, root: &Path) -> Result<()> {
        self.record(IsolationStep::SwapRoot(root.to_path_buf()));
        if self.refuse_swap {
            return Err(BurrowError::Privilege {
                operation: "chroot",
                message: "simulated EPERM".into(),
            });
        }
        Ok(())
    }

    fn isolate_pids(&self) -> Result<()> {
        self.record(IsolationStep::IsolatePids);
        if self.refuse_pids {
            return Err(BurrowError::Privilege {
                operation: "unshare(CLONE_NEWPID)",
                message: "simulated EPERM".into(),
            });
        }
        Ok(())
    }

    fn is_available(&self) -> bool {
        !self.unavailable
    }
}

impl<T: Isolation + ?Sized> Isolation for &T {
    fn swap_root(&self, root: &Path) -> Result<()> {
        (**self).swap_root(root)
    }

    fn isolate_pids(&self) -> Result<()> {
        (**self).isolate_pids()
    }

    fn is_available(&self) -> bool {
        (**self).is_available()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simulated_isolation_records_steps_in_order() {
        let iso = SimulatedIsolation::new();
        iso.swap_root(Path::new("/tmp/burrow-root")).expect("swap failed");
        iso.isolate_pids().expect("isolate failed");
        assert_eq!(
            iso.steps(),
            vec![
                IsolationStep::SwapRoot(PathBuf::from("/tmp/burrow-root")),
                IsolationStep::IsolatePids,
            ]
        );
    }

    #[test]
    fn simulated_refusals_return_privilege_errors() {
        let iso = SimulatedIsolation::refusing_root_swap();
        let err = iso.swap_root(Path::new("/")).expect_err("swap must fail");
        assert!(matches!(err, BurrowError::Privilege { .. }));
        assert_eq!(iso.steps().len(), 1);

        let iso = SimulatedIsolation::refusing_pid_namespace();
        assert!(iso.isolate_pids().is_err());
    }

    #[test]
    fn host_isolation_available_on_linux_only() {
        assert_eq!(HostIsolation.is_available(), cfg!(target_os = "linux"));
    }

    #[test]
    fn simulated_availability() {
        assert!(SimulatedIsolation::new().is_available());
        assert!(!SimulatedIsolation::unavailable().is_available());

        fn available<I: Isolation>(iso: I) -> bool {
            iso.is_available()
        }
        let iso = SimulatedIsolation::unavailable();
        assert!(!available(&iso));
    }

    #[test]
    fn isolation_usable_through_reference() {
        fn swap_via<I: Isolation>(iso: I) -> Result<()> {
            iso.swap_root(Path::new("/srv/root"))
        }
        let iso = SimulatedIsolation::new();
        swap_via(&iso).expect("swap failed");
        assert_eq!(iso.steps().len(), 1);
    }
}
