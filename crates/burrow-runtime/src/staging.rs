//! Staging roots.
//!
//! A staging root is a fresh directory that will become the filesystem root
//! of the launched command. It receives the command's executable at the same
//! absolute path it has on the host, and a `dev/null` stub so that standard
//! stream setup still works after the root swap. It is never removed: once
//! swapped in, it is the live root for the rest of the process.

use std::fs::{DirBuilder, OpenOptions};
use std::os::unix::fs::{DirBuilderExt, OpenOptionsExt, PermissionsExt};
use std::path::{Component, Path, PathBuf};

use burrow_common::constants::{DEV_NULL_MODE, DEV_NULL_RELATIVE, STAGING_DIR_MODE, STAGING_PREFIX};
use burrow_common::error::{BurrowError, Result};

/// A prepared root directory, exclusively owned by one launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingRoot {
    path: PathBuf,
    command: PathBuf,
}

impl StagingRoot {
    /// Returns the staging directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the command path as seen from inside the root.
    #[must_use]
    pub fn command(&self) -> &Path {
        &self.command
    }

    /// Returns where the copied executable lives on the host.
    #[must_use]
    pub fn staged_command(&self) -> PathBuf {
        self.path.join(relative(&self.command))
    }

    /// Returns a directory outside the root for transient files.
    #[must_use]
    pub fn scratch_dir(&self) -> &Path {
        self.path.parent().unwrap_or(&self.path)
    }
}

/// Turns a command argument into the absolute path it will run from.
///
/// Bare names are looked up on `PATH`; anything containing a `/` is made
/// absolute against the working directory without following symlinks.
///
/// # Errors
///
/// Returns `BurrowError::Filesystem` if a bare name is not on `PATH`, and
/// `BurrowError::Config` for empty paths or paths with `..` components.
pub fn resolve_command(command: &str) -> Result<PathBuf> {
    if command.is_empty() {
        return Err(BurrowError::Config {
            message: "command is empty".into(),
        });
    }

    if !command.contains('/') {
        return which::which(command).map_err(|e| BurrowError::Filesystem {
            path: PathBuf::from(command),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, e.to_string()),
        });
    }

    let path = Path::new(command);
    if path.components().any(|c| c == Component::ParentDir) {
        return Err(BurrowError::Config {
            message: format!("command path must not contain '..': {command}"),
        });
    }
    std::path::absolute(path).map_err(|e| BurrowError::Filesystem {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Creates a staging root under `parent` (the system temp dir when `None`)
/// holding a copy of `command` and the `dev/null` stub.
///
/// `command` must be absolute; see [`resolve_command`].
///
/// # Errors
///
/// Returns `BurrowError::Filesystem` if the executable does not exist or is
/// not a regular file, or if any directory creation or copy fails.
pub fn prepare_root(parent: Option<&Path>, command: &Path) -> Result<StagingRoot> {
    if !command.is_absolute() {
        return Err(BurrowError::Config {
            message: format!("command path must be absolute: {}", command.display()),
        });
    }

    let metadata = std::fs::metadata(command).map_err(|e| fs_error(command, e))?;
    if !metadata.is_file() {
        return Err(fs_error(
            command,
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a regular file"),
        ));
    }

    let path = create_staging_dir(parent)?;
    tracing::debug!(root = %path.display(), "staging root created");

    let root = StagingRoot {
        path,
        command: command.to_path_buf(),
    };
    copy_executable(command, &root.staged_command())?;
    create_dev_null(root.path())?;

    tracing::info!(
        root = %root.path().display(),
        command = %command.display(),
        "staging root prepared"
    );
    Ok(root)
}

fn create_staging_dir(parent: Option<&Path>) -> Result<PathBuf> {
    let mut builder = tempfile::Builder::new();
    let _ = builder.prefix(STAGING_PREFIX);
    let dir = match parent {
        Some(parent) => builder.tempdir_in(parent),
        None => builder.tempdir(),
    }
    .map_err(|e| fs_error(parent.unwrap_or(&std::env::temp_dir()), e))?;

    let path = dir.keep();
    // tempfile creates the directory 0700; the launched command may drop
    // privileges and still needs to traverse its root.
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(STAGING_DIR_MODE))
        .map_err(|e| fs_error(&path, e))?;
    Ok(path)
}

fn copy_executable(source: &Path, dest: &Path) -> Result<()> {
    if let Some(dir) = dest.parent() {
        DirBuilder::new()
            .recursive(true)
            .mode(STAGING_DIR_MODE)
            .create(dir)
            .map_err(|e| fs_error(dir, e))?;
    }

    // std::fs::copy carries the permission bits over.
    let bytes = std::fs::copy(source, dest).map_err(|e| fs_error(dest, e))?;
    tracing::debug!(
        source = %source.display(),
        dest = %dest.display(),
        bytes,
        "executable copied"
    );
    Ok(())
}

fn create_dev_null(root: &Path) -> Result<()> {
    let dev_null = root.join(DEV_NULL_RELATIVE);
    if let Some(dev) = dev_null.parent() {
        DirBuilder::new()
            .recursive(true)
            .mode(STAGING_DIR_MODE)
            .create(dev)
            .map_err(|e| fs_error(dev, e))?;
    }

    let _ = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(DEV_NULL_MODE)
        .open(&dev_null)
        .map_err(|e| fs_error(&dev_null, e))?;
    // Undo the umask.
    std::fs::set_permissions(&dev_null, std::fs::Permissions::from_mode(DEV_NULL_MODE))
        .map_err(|e| fs_error(&dev_null, e))
}

fn relative(path: &Path) -> &Path {
    path.strip_prefix("/").unwrap_or(path)
}

fn fs_error(path: &Path, source: std::io::Error) -> BurrowError {
    BurrowError::Filesystem {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_executable(dir: &Path) -> PathBuf {
        let bin = dir.join("usr/local/bin");
        std::fs::create_dir_all(&bin).expect("mkdir failed");
        let exe = bin.join("explorer");
        std::fs::write(&exe, b"#!/bin/sh\necho explorer\n").expect("write failed");
        std::fs::set_permissions(&exe, std::fs::Permissions::from_mode(0o751))
            .expect("chmod failed");
        exe
    }

    #[test]
    fn prepare_root_copies_executable_to_same_path() {
        let host = tempfile::tempdir().expect("failed to create tempdir");
        let parent = tempfile::tempdir().expect("failed to create tempdir");
        let exe = fake_executable(host.path());

        let root = prepare_root(Some(parent.path()), &exe).expect("prepare failed");
        assert!(root.path().starts_with(parent.path()));
        assert_eq!(root.command(), exe.as_path());

        let staged = root.path().join(exe.strip_prefix("/").expect("absolute"));
        assert_eq!(root.staged_command(), staged);
        assert_eq!(
            std::fs::read(&staged).expect("read staged"),
            std::fs::read(&exe).expect("read source")
        );
    }

    #[test]
    fn prepare_root_preserves_permission_bits() {
        let host = tempfile::tempdir().expect("failed to create tempdir");
        let parent = tempfile::tempdir().expect("failed to create tempdir");
        let exe = fake_executable(host.path());

        let root = prepare_root(Some(parent.path()), &exe).expect("prepare failed");
        let mode = std::fs::metadata(root.staged_command())
            .expect("stat failed")
            .permissions()
            .mode();
        assert_eq!(mode & 0o7777, 0o751);
    }

    #[test]
    fn prepare_root_creates_dev_null_stub() {
        let host = tempfile::tempdir().expect("failed to create tempdir");
        let parent = tempfile::tempdir().expect("failed to create tempdir");
        let exe = fake_executable(host.path());

        let root = prepare_root(Some(parent.path()), &exe).expect("prepare failed");
        let stub = root.path().join("dev/null");
        let meta = std::fs::metadata(&stub).expect("stub missing");
        assert!(meta.is_file());
        assert_eq!(meta.len(), 0);
        assert_eq!(meta.permissions().mode() & 0o777, DEV_NULL_MODE);
    }

    #[test]
    fn prepare_root_twice_yields_identical_copies() {
        let host = tempfile::tempdir().expect("failed to create tempdir");
        let parent = tempfile::tempdir().expect("failed to create tempdir");
        let exe = fake_executable(host.path());

        let first = prepare_root(Some(parent.path()), &exe).expect("first prepare failed");
        let second = prepare_root(Some(parent.path()), &exe).expect("second prepare failed");
        assert_ne!(first.path(), second.path());

        let a = std::fs::metadata(first.staged_command()).expect("stat first");
        let b = std::fs::metadata(second.staged_command()).expect("stat second");
        assert_eq!(a.permissions().mode(), b.permissions().mode());
        assert_eq!(
            std::fs::read(first.staged_command()).expect("read first"),
            std::fs::read(second.staged_command()).expect("read second")
        );
    }

    #[test]
    fn prepare_root_missing_executable_is_filesystem_error() {
        let parent = tempfile::tempdir().expect("failed to create tempdir");
        let err = prepare_root(Some(parent.path()), Path::new("/nonexistent/burrow/cmd"))
            .expect_err("must fail");
        assert!(matches!(err, BurrowError::Filesystem { .. }));
        assert_eq!(
            std::fs::read_dir(parent.path()).expect("read_dir").count(),
            0,
            "no staging root should be created"
        );
    }

    #[test]
    fn prepare_root_rejects_directories_and_relative_paths() {
        let host = tempfile::tempdir().expect("failed to create tempdir");
        assert!(matches!(
            prepare_root(None, host.path()),
            Err(BurrowError::Filesystem { .. })
        ));
        assert!(matches!(
            prepare_root(None, Path::new("bin/sh")),
            Err(BurrowError::Config { .. })
        ));
    }

    #[test]
    fn scratch_dir_is_outside_root() {
        let host = tempfile::tempdir().expect("failed to create tempdir");
        let parent = tempfile::tempdir().expect("failed to create tempdir");
        let exe = fake_executable(host.path());
        let root = prepare_root(Some(parent.path()), &exe).expect("prepare failed");
        assert_eq!(root.scratch_dir(), parent.path());
    }

    #[test]
    fn resolve_command_finds_bare_names_on_path() {
        let resolved = resolve_command("sh").expect("sh should be on PATH");
        assert!(resolved.is_absolute());
        assert!(resolved.ends_with("sh"));
    }

    #[test]
    fn resolve_command_keeps_absolute_paths() {
        assert_eq!(
            resolve_command("/usr/local/bin/docker-explorer").expect("resolve failed"),
            PathBuf::from("/usr/local/bin/docker-explorer")
        );
    }

    #[test]
    fn resolve_command_rejects_bad_input() {
        assert!(matches!(resolve_command(""), Err(BurrowError::Config { .. })));
        assert!(matches!(
            resolve_command("/usr/../etc/passwd"),
            Err(BurrowError::Config { .. })
        ));
        assert!(matches!(
            resolve_command("definitely-not-a-real-burrow-command"),
            Err(BurrowError::Filesystem { .. })
        ));
    }
}
