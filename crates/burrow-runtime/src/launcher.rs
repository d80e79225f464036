//! The launcher state machine.
//!
//! `Created → RootPrepared → [ImagePopulated] → RootSwapped → ChildRunning → Terminated`
//!
//! Every step either advances the state or ends the launch with an error.
//! Nothing that can fail after `RootSwapped` is allowed to happen before
//! it: the root is fully assembled and swapped in before any untrusted code
//! runs.

use std::path::PathBuf;

use burrow_common::error::{BurrowError, Result};
use burrow_common::types::{ImageReference, LaunchState, RunId};
use burrow_core::isolation::Isolation;
use burrow_image::manifest::Manifest;
use burrow_image::registry::RegistryClient;
use burrow_image::transport::HttpTransport;

use crate::process::{self, ChildOutcome};
use crate::staging::{self, StagingRoot};

/// What to launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchRequest {
    /// Image to populate the root from; `None` stages only the executable.
    pub image: Option<ImageReference>,
    /// Command to run, as given by the caller.
    pub command: String,
    /// Arguments passed verbatim to the command.
    pub args: Vec<String>,
}

/// Result of a launch whose child ran to completion.
#[derive(Debug, Clone)]
pub struct LaunchReport {
    /// Identifier of the run.
    pub run_id: RunId,
    /// The root the child ran in.
    pub root: StagingRoot,
    /// Manifest the root was populated from, if an image was requested.
    pub manifest: Option<Manifest>,
    /// How the child terminated.
    pub outcome: ChildOutcome,
}

/// Drives one launch through its states.
///
/// A launcher is single-use: once it has left `Created` it refuses to start
/// another launch, since the process root may already have been swapped.
pub struct Launcher<I, T> {
    run_id: RunId,
    isolation: I,
    registry: RegistryClient<T>,
    staging_parent: Option<PathBuf>,
    state: LaunchState,
}

impl<I: Isolation, T: HttpTransport> Launcher<I, T> {
    /// Creates a launcher in the `Created` state.
    #[must_use]
    pub fn new(isolation: I, registry: RegistryClient<T>, staging_parent: Option<PathBuf>) -> Self {
        Self {
            run_id: RunId::generate(),
            isolation,
            registry,
            staging_parent,
            state: LaunchState::Created,
        }
    }

    /// Returns the identifier of this run.
    #[must_use]
    pub const fn run_id(&self) -> &RunId {
        &self.run_id
    }

    /// Returns the current state.
    #[must_use]
    pub const fn state(&self) -> LaunchState {
        self.state
    }

    /// Returns the registry client.
    #[must_use]
    pub const fn registry(&self) -> &RegistryClient<T> {
        &self.registry
    }

    /// Runs the whole launch and blocks until the child terminates.
    ///
    /// # Errors
    ///
    /// Returns `BurrowError::Config` if the launcher was already used or
    /// the request is invalid, and otherwise the first error of any stage.
    /// When an error is returned before `ChildRunning`, no child was spawned.
    pub fn launch(&mut self, request: &LaunchRequest) -> Result<LaunchReport> {
        if self.state != LaunchState::Created {
            return Err(BurrowError::Config {
                message: format!("launcher {} already used (state {})", self.run_id, self.state),
            });
        }

        let span = tracing::info_span!("launch", run_id = %self.run_id);
        let _enter = span.enter();

        if !self.isolation.is_available() {
            return Err(BurrowError::Privilege {
                operation: "isolation",
                message: "root swap and PID namespaces are not supported on this platform".into(),
            });
        }

        let command = staging::resolve_command(&request.command)?;
        let root = staging::prepare_root(self.staging_parent.as_deref(), &command)?;
        self.advance(LaunchState::RootPrepared);

        let manifest = match &request.image {
            Some(image) => {
                let manifest = self.registry.pull(root.path(), root.scratch_dir(), image)?;
                self.advance(LaunchState::ImagePopulated);
                Some(manifest)
            }
            None => None,
        };

        self.isolation.swap_root(root.path())?;
        self.advance(LaunchState::RootSwapped);

        let child = process::spawn_isolated(&self.isolation, root.command(), &request.args)?;
        self.advance(LaunchState::ChildRunning);

        let outcome = process::wait_child(root.command(), child)?;
        self.advance(LaunchState::Terminated);

        Ok(LaunchReport {
            run_id: self.run_id.clone(),
            root,
            manifest,
            outcome,
        })
    }

    fn advance(&mut self, next: LaunchState) {
        debug_assert!(next > self.state, "launch state must move forward");
        tracing::debug!(from = %self.state, to = %next, "launch state transition");
        self.state = next;
    }
}
