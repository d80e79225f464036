//! Image manifest model.
//!
//! The client asks for the legacy (schema 1) media type, whose layer list is
//! `fsLayers[].blobSum`. Registries that no longer serve schema 1 answer with
//! a schema 2 document (`layers[].digest`), which decodes to the same model.
//! Layer order is kept exactly as the server sent it, duplicates included.

use burrow_common::types::ImageReference;
use serde::Deserialize;

/// A content digest naming one layer blob.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LayerDescriptor {
    digest: String,
}

impl LayerDescriptor {
    /// Creates a descriptor from a digest such as `sha256:…`.
    #[must_use]
    pub fn new(digest: impl Into<String>) -> Self {
        Self {
            digest: digest.into(),
        }
    }

    /// Returns the digest.
    #[must_use]
    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// Returns the digest made safe for use as a single file name.
    #[must_use]
    pub fn file_stem(&self) -> String {
        self.digest
            .chars()
            .map(|c| if c == ':' || c == '/' || c == '\\' { '_' } else { c })
            .collect()
    }
}

/// The layer list of one image, in application order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    name: String,
    tag: String,
    layers: Vec<LayerDescriptor>,
}

impl Manifest {
    /// Creates a manifest from its parts.
    #[must_use]
    pub const fn new(name: String, tag: String, layers: Vec<LayerDescriptor>) -> Self {
        Self { name, tag, layers }
    }

    /// Decodes a registry response body.
    ///
    /// Missing `name`/`tag` fields fall back to `image`.
    ///
    /// # Errors
    ///
    /// Returns a description of the problem if the body is not a manifest,
    /// or is a multi-platform manifest list.
    pub fn from_json(body: &[u8], image: &ImageReference) -> Result<Self, String> {
        let doc: ManifestDocument =
            serde_json::from_slice(body).map_err(|e| format!("undecodable manifest: {e}"))?;

        if doc.manifests.is_some() {
            return Err("received a manifest list; platform selection is not supported".into());
        }

        let layers = match (doc.fs_layers, doc.layers) {
            (Some(fs_layers), _) => fs_layers
                .into_iter()
                .map(|l| LayerDescriptor::new(l.blob_sum))
                .collect(),
            (None, Some(layers)) => layers
                .into_iter()
                .map(|l| LayerDescriptor::new(l.digest))
                .collect(),
            (None, None) => Vec::new(),
        };

        Ok(Self {
            name: doc.name.unwrap_or_else(|| image.path()),
            tag: doc.tag.unwrap_or_else(|| image.tag().to_string()),
            layers,
        })
    }

    /// Returns the repository name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the tag.
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Returns the layers in application order.
    #[must_use]
    pub fn layers(&self) -> &[LayerDescriptor] {
        &self.layers
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ManifestDocument {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    tag: Option<String>,
    #[serde(default)]
    fs_layers: Option<Vec<FsLayer>>,
    #[serde(default)]
    layers: Option<Vec<Descriptor>>,
    #[serde(default)]
    manifests: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FsLayer {
    blob_sum: String,
}

#[derive(Debug, Deserialize)]
struct Descriptor {
    digest: String,
}
