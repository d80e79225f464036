//! Process spawning inside the isolated root.
//!
//! The child inherits stdout and stderr, reads stdin from `/dev/null`
//! (the staged stub once the root is swapped), and is the first process of
//! a fresh PID namespace.

use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};

use burrow_common::constants::FALLBACK_EXIT_CODE;
use burrow_common::error::{BurrowError, Result};
use burrow_core::isolation::Isolation;

/// How the isolated child terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildOutcome {
    /// The child exited normally with this code.
    Exited(i32),
    /// The child was killed by this signal.
    Signaled(i32),
}

impl ChildOutcome {
    /// Returns the status the launcher itself should exit with.
    ///
    /// Normal exits map to their own code; anything else maps to
    /// [`FALLBACK_EXIT_CODE`].
    #[must_use]
    pub fn exit_code(self) -> u8 {
        match self {
            Self::Exited(code) => u8::try_from(code).unwrap_or(FALLBACK_EXIT_CODE),
            Self::Signaled(_) => FALLBACK_EXIT_CODE,
        }
    }
}

impl From<ExitStatus> for ChildOutcome {
    fn from(status: ExitStatus) -> Self {
        if let Some(code) = status.code() {
            return Self::Exited(code);
        }
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            Self::Signaled(status.signal().unwrap_or_default())
        }
        #[cfg(not(unix))]
        {
            Self::Signaled(0)
        }
    }
}

/// Maps the result of a launch to the process exit status.
///
/// Launch failures that happen before a child ever runs map to
/// [`FALLBACK_EXIT_CODE`].
#[must_use]
pub fn exit_status(result: &Result<ChildOutcome>) -> u8 {
    match result {
        Ok(outcome) => outcome.exit_code(),
        Err(_) => FALLBACK_EXIT_CODE,
    }
}

/// Requests a new PID namespace and spawns `command` into it.
///
/// # Errors
///
/// Returns `BurrowError::Privilege` if the namespace is refused and
/// `BurrowError::Spawn` if the command cannot be started.
pub fn spawn_isolated<I: Isolation>(isolation: &I, command: &Path, args: &[String]) -> Result<Child> {
    isolation.isolate_pids()?;

    let child = Command::new(command)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .map_err(|e| spawn_error(command, e))?;

    tracing::info!(command = %command.display(), pid = child.id(), "isolated child spawned");
    Ok(child)
}

/// Blocks until `child` terminates.
///
/// # Errors
///
/// Returns `BurrowError::Spawn` if waiting fails.
pub fn wait_child(command: &Path, mut child: Child) -> Result<ChildOutcome> {
    let status = child.wait().map_err(|e| spawn_error(command, e))?;
    let outcome = ChildOutcome::from(status);
    tracing::info!(command = %command.display(), ?outcome, "isolated child terminated");
    Ok(outcome)
}

/// Spawns `command` in a new PID namespace and waits for it.
///
/// # Errors
///
/// Returns the errors of [`spawn_isolated`] and [`wait_child`].
pub fn run_isolated<I: Isolation>(
    isolation: &I,
    command: &Path,
    args: &[String],
) -> Result<ChildOutcome> {
    let child = spawn_isolated(isolation, command, args)?;
    wait_child(command, child)
}

fn spawn_error(command: &Path, source: std::io::Error) -> BurrowError {
    BurrowError::Spawn {
        command: command.display().to_string(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use burrow_core::isolation::{IsolationStep, SimulatedIsolation};

    use super::*;

    fn sh(script: &str) -> Vec<String> {
        vec!["-c".into(), script.into()]
    }

    #[test]
    fn exit_codes_round_trip() {
        let iso = SimulatedIsolation::new();
        for code in [0_u8, 1, 7, 42, 255] {
            let outcome = run_isolated(&iso, Path::new("/bin/sh"), &sh(&format!("exit {code}")))
                .expect("run failed");
            assert_eq!(outcome, ChildOutcome::Exited(i32::from(code)));
            assert_eq!(outcome.exit_code(), code);
        }
    }

    #[test]
    fn pid_namespace_requested_before_spawn() {
        let iso = SimulatedIsolation::new();
        let _ = run_isolated(&iso, Path::new("/bin/sh"), &sh("exit 0")).expect("run failed");
        assert_eq!(iso.steps(), vec![IsolationStep::IsolatePids]);
    }

    #[test]
    fn refused_namespace_prevents_spawn() {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let marker = dir.path().join("ran");
        let iso = SimulatedIsolation::refusing_pid_namespace();

        let err = run_isolated(
            &iso,
            Path::new("/bin/sh"),
            &sh(&format!("touch {}", marker.display())),
        )
        .expect_err("must fail");
        assert!(matches!(err, BurrowError::Privilege { .. }));
        assert!(!marker.exists());
    }

    #[test]
    fn signaled_child_maps_to_fallback() {
        let iso = SimulatedIsolation::new();
        let outcome =
            run_isolated(&iso, Path::new("/bin/sh"), &sh("kill -9 $$")).expect("run failed");
        assert_eq!(outcome, ChildOutcome::Signaled(9));
        assert_eq!(outcome.exit_code(), FALLBACK_EXIT_CODE);
    }

    #[test]
    fn missing_command_is_spawn_error() {
        let iso = SimulatedIsolation::new();
        let result = run_isolated(&iso, Path::new("/nonexistent/burrow/cmd"), &[]);
        assert!(matches!(result, Err(BurrowError::Spawn { .. })));
        assert_eq!(exit_status(&result), FALLBACK_EXIT_CODE);
    }

    #[test]
    fn exit_status_mirrors_child() {
        assert_eq!(exit_status(&Ok(ChildOutcome::Exited(3))), 3);
        assert_eq!(exit_status(&Ok(ChildOutcome::Signaled(15))), 1);
        let err = Err(BurrowError::Config {
            message: "bad".into(),
        });
        assert_eq!(exit_status(&err), 1);
    }
}
