//! Layer blob extraction.
//!
//! Each blob is written to a private transient file named after its digest, unpacked
//! on top of the root directory, and the transient file is removed whether
//! or not unpacking succeeded. Later layers overwrite files from earlier
//! ones, following ordinary tar semantics.

use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use burrow_common::error::{BurrowError, Result};
use tempfile::NamedTempFile;

use crate::manifest::LayerDescriptor;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Encoding of a layer blob, detected from its leading bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    /// Plain tar.
    None,
    /// Gzip-compressed tar.
    Gzip,
}

impl Compression {
    /// Detects the encoding from the first bytes of a blob.
    #[must_use]
    pub fn sniff(head: &[u8]) -> Self {
        if head.starts_with(&GZIP_MAGIC) {
            Self::Gzip
        } else {
            Self::None
        }
    }
}

/// Outcome of unpacking one layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedLayer {
    /// Digest of the layer.
    pub digest: String,
    /// Size of the blob in bytes.
    pub size_bytes: u64,
    /// Detected encoding.
    pub compression: Compression,
}

/// Creates the transient file for `layer` inside `scratch_dir`.
///
/// The name is the digest stem plus a random suffix, and the file is opened
/// with `O_EXCL`, so an existing entry at any path (including a symlink) is
/// never followed or reused. The file is removed when the handle drops.
fn transient_blob(scratch_dir: &Path, layer: &LayerDescriptor) -> std::io::Result<NamedTempFile> {
    tempfile::Builder::new()
        .prefix(&format!("{}-", layer.file_stem()))
        .suffix(".tar")
        .tempfile_in(scratch_dir)
}

/// Unpacks a layer blob on top of `root`.
///
/// The blob is staged as a transient file in `scratch_dir`, which must not
/// be inside `root`. Compression is detected from the blob itself.
///
/// # Errors
///
/// Returns `BurrowError::Extract` if the transient file cannot be written,
/// the archive is malformed, or an entry cannot be written into `root`.
pub fn extract_layer(
    root: &Path,
    scratch_dir: &Path,
    layer: &LayerDescriptor,
    blob: &[u8],
) -> Result<ExtractedLayer> {
    let fail = |source: std::io::Error| BurrowError::Extract {
        digest: layer.digest().to_string(),
        root: root.to_path_buf(),
        source,
    };

    tracing::info!(
        digest = layer.digest(),
        target = %root.display(),
        bytes = blob.len(),
        "extracting layer"
    );

    let mut transient = transient_blob(scratch_dir, layer).map_err(fail)?;
    let file = transient.as_file_mut();
    file.write_all(blob).map_err(fail)?;
    file.flush().map_err(fail)?;
    let _ = file.seek(SeekFrom::Start(0)).map_err(fail)?;

    let mut head = [0_u8; 2];
    let read = file.read(&mut head).map_err(fail)?;
    let _ = file.seek(SeekFrom::Start(0)).map_err(fail)?;
    let compression = Compression::sniff(&head[..read]);

    let unpacked = match compression {
        Compression::Gzip => unpack(flate2::read::GzDecoder::new(&mut *file), root),
        Compression::None => unpack(&mut *file, root),
    };
    let path = transient.path().to_path_buf();
    if let Err(e) = transient.close() {
        tracing::warn!(path = %path.display(), error = %e, "failed to remove transient blob");
    }
    unpacked.map_err(fail)?;

    tracing::debug!(digest = layer.digest(), ?compression, "layer extracted");
    Ok(ExtractedLayer {
        digest: layer.digest().to_string(),
        size_bytes: blob.len() as u64,
        compression,
    })
}

fn unpack<R: Read>(reader: R, root: &Path) -> std::io::Result<()> {
    let mut archive = tar::Archive::new(reader);
    archive.set_preserve_permissions(true);
    archive.set_preserve_mtime(true);
    archive.set_overwrite(true);
    archive.set_unpack_xattrs(false);
    archive.unpack(root)
}
