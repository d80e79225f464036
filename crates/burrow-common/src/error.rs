//! Unified error types for the Burrow workspace.
//!
//! One variant per failure class of a launch. The registry client produces
//! `Auth`, `Manifest`, `Layer` and `Extract`; the launcher produces
//! `Filesystem`, `Privilege` and `Spawn`. Every variant is terminal for the
//! run that raised it.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum BurrowError {
    /// Obtaining a pull token failed.
    #[error("authentication for {repository} failed: {message}")]
    Auth {
        /// Repository the token was requested for.
        repository: String,
        /// Description of the failure.
        message: String,
    },

    /// The image manifest could not be fetched or decoded.
    #[error("manifest fetch for {reference} failed: {message}")]
    Manifest {
        /// Image reference the manifest was requested for.
        reference: String,
        /// Description of the failure.
        message: String,
    },

    /// A layer blob could not be downloaded.
    #[error("layer {digest} fetch failed: {message}")]
    Layer {
        /// Digest of the layer.
        digest: String,
        /// Description of the failure.
        message: String,
    },

    /// A layer blob could not be unpacked into the root directory.
    #[error("layer {digest} extraction into {root} failed: {source}")]
    Extract {
        /// Digest of the layer.
        digest: String,
        /// Directory the layer was unpacked into.
        root: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A filesystem operation while preparing the staging root failed.
    #[error("filesystem error at {path}: {source}")]
    Filesystem {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A privileged operation (root swap, namespace creation) was refused.
    #[error("{operation} failed: {message}")]
    Privilege {
        /// Name of the privileged operation.
        operation: &'static str,
        /// Description of the failure.
        message: String,
    },

    /// The isolated child could not be started or waited on.
    #[error("failed to spawn {command}: {source}")]
    Spawn {
        /// Command that was being spawned.
        command: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Caller input or configuration is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid value.
        message: String,
    },
}

impl BurrowError {
    /// Short name of the failure class, used in diagnostics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Auth { .. } => "auth",
            Self::Manifest { .. } => "manifest",
            Self::Layer { .. } => "layer",
            Self::Extract { .. } => "extract",
            Self::Filesystem { .. } => "filesystem",
            Self::Privilege { .. } => "privilege",
            Self::Spawn { .. } => "spawn",
            Self::Config { .. } => "config",
        }
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, BurrowError>;
