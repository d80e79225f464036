//! Domain primitive types used across the Burrow workspace.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_NAMESPACE, DEFAULT_TAG, MAX_REPOSITORY_LEN};
use crate::error::{BurrowError, Result};

/// Unique identifier for a single launch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(String);

impl RunId {
    /// Generates a random run ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A reference to an image in the public registry.
///
/// The namespace and tag are carried explicitly so request construction
/// never bakes them in; [`ImageReference::parse`] fills in `library` and
/// `latest`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageReference {
    namespace: String,
    repository: String,
    tag: String,
}

impl ImageReference {
    /// Parses a bare repository name such as `alpine` or `library/alpine`.
    ///
    /// # Errors
    ///
    /// Returns `BurrowError::Config` if the name is empty, too long, carries
    /// a tag or digest, or contains characters outside `[a-z0-9._/-]`.
    pub fn parse(name: &str) -> Result<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(invalid(name, "image name is empty"));
        }
        if name.len() > MAX_REPOSITORY_LEN {
            return Err(invalid(name, "image name is too long"));
        }
        if name.contains(':') || name.contains('@') {
            return Err(invalid(name, "only the default tag is supported"));
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || "._/-".contains(c))
        {
            return Err(invalid(name, "image name contains invalid characters"));
        }
        if name.split('/').any(str::is_empty) {
            return Err(invalid(name, "image name has an empty path component"));
        }

        let (namespace, repository) = match name.split_once('/') {
            Some((ns, repo)) => (ns, repo),
            None => (DEFAULT_NAMESPACE, name),
        };
        Ok(Self {
            namespace: namespace.to_string(),
            repository: repository.to_string(),
            tag: DEFAULT_TAG.to_string(),
        })
    }

    /// Returns the registry namespace (`library` for official images).
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Returns the repository name within the namespace.
    #[must_use]
    pub fn repository(&self) -> &str {
        &self.repository
    }

    /// Returns the tag.
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Returns `<namespace>/<repository>`, the path used in URLs and scopes.
    #[must_use]
    pub fn path(&self) -> String {
        format!("{}/{}", self.namespace, self.repository)
    }

    /// Returns the pull scope for token requests.
    #[must_use]
    pub fn pull_scope(&self) -> String {
        format!("repository:{}:pull", self.path())
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}:{}", self.namespace, self.repository, self.tag)
    }
}

fn invalid(name: &str, reason: &str) -> BurrowError {
    BurrowError::Config {
        message: format!("{reason}: {name:?}"),
    }
}

/// Lifecycle state of a single launch.
///
/// Transitions only move forward; there is no retry or rollback edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LaunchState {
    /// Nothing has happened yet.
    Created,
    /// The staging root holds the executable and the device stub.
    RootPrepared,
    /// Image layers have been extracted into the staging root.
    ImagePopulated,
    /// The process root now points at the staging root.
    RootSwapped,
    /// The isolated child has been spawned.
    ChildRunning,
    /// The child has terminated.
    Terminated,
}

impl fmt::Display for LaunchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::RootPrepared => write!(f, "root-prepared"),
            Self::ImagePopulated => write!(f, "image-populated"),
            Self::RootSwapped => write!(f, "root-swapped"),
            Self::ChildRunning => write!(f, "child-running"),
            Self::Terminated => write!(f, "terminated"),
        }
    }
}
