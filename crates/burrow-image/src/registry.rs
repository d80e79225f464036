//! Registry client: token exchange, manifest resolution, and layer pulls.
//!
//! Operations are meant to be called in order — [`RegistryClient::authenticate`],
//! [`RegistryClient::fetch_manifest`], then [`RegistryClient::extract_image`] —
//! or all at once through [`RegistryClient::pull`]. Nothing is retried. A
//! blob response of `307 Temporary Redirect` is followed exactly once.

use std::path::Path;

use burrow_common::config::RegistryConfig;
use burrow_common::error::{BurrowError, Result};
use burrow_common::types::ImageReference;

use crate::auth::AccessToken;
use crate::layer::{self, ExtractedLayer};
use crate::manifest::{LayerDescriptor, Manifest};
use crate::transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};

const TEMPORARY_REDIRECT: u16 = 307;

/// Client for a single registry, configured at construction.
#[derive(Debug)]
pub struct RegistryClient<T = ReqwestTransport> {
    config: RegistryConfig,
    transport: T,
}

impl RegistryClient<ReqwestTransport> {
    /// Creates a client that talks to the network through `reqwest`.
    ///
    /// # Errors
    ///
    /// Returns `BurrowError::Config` if the configuration is invalid or the
    /// HTTP client cannot be built.
    pub fn new(config: RegistryConfig) -> Result<Self> {
        config.validate()?;
        let transport = ReqwestTransport::new(&config.user_agent)?;
        Ok(Self { config, transport })
    }
}

impl<T: HttpTransport> RegistryClient<T> {
    /// Creates a client over an arbitrary transport.
    ///
    /// # Errors
    ///
    /// Returns `BurrowError::Config` if the configuration is invalid.
    pub fn with_transport(config: RegistryConfig, transport: T) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, transport })
    }

    /// Returns the client configuration.
    #[must_use]
    pub const fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Returns the underlying transport.
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Requests an anonymous pull token scoped to `image`.
    ///
    /// # Errors
    ///
    /// Returns `BurrowError::Auth` on network failure, a non-2xx status, or
    /// a payload without a usable token.
    pub fn authenticate(&self, image: &ImageReference) -> Result<AccessToken> {
        let fail = |message: String| BurrowError::Auth {
            repository: image.path(),
            message,
        };

        let scope = image.pull_scope();
        let url = reqwest::Url::parse_with_params(
            &self.config.auth_url,
            &[("service", self.config.service.as_str()), ("scope", scope.as_str())],
        )
        .map_err(|e| fail(format!("invalid auth URL {}: {e}", self.config.auth_url)))?;

        tracing::debug!(%image, "requesting pull token");
        let response = self
            .transport
            .get(&HttpRequest::get(url.as_str()))
            .map_err(|e| fail(e.to_string()))?;
        if !response.is_success() {
            return Err(fail(status_message(&response)));
        }

        AccessToken::from_json(&response.body).map_err(fail)
    }

    /// Fetches the manifest for `image` at its tag.
    ///
    /// # Errors
    ///
    /// Returns `BurrowError::Manifest` on network failure, a non-2xx status,
    /// or a body that does not decode to a manifest.
    pub fn fetch_manifest(&self, token: &AccessToken, image: &ImageReference) -> Result<Manifest> {
        let fail = |message: String| BurrowError::Manifest {
            reference: image.to_string(),
            message,
        };

        let url = format!(
            "{}/{}/manifests/{}",
            self.config.registry_base(),
            image.path(),
            image.tag()
        );
        let request = HttpRequest::get(url)
            .header("Authorization", token.bearer())
            .header("Accept", self.config.manifest_media_type.as_str());

        let response = self.transport.get(&request).map_err(|e| fail(e.to_string()))?;
        if !response.is_success() {
            return Err(fail(status_message(&response)));
        }

        let manifest = Manifest::from_json(&response.body, image).map_err(fail)?;
        tracing::info!(%image, layers = manifest.layers().len(), "manifest resolved");
        Ok(manifest)
    }

    /// Downloads one layer blob.
    ///
    /// A `307` response is re-issued once against its `Location`, with the
    /// same `Authorization` header.
    ///
    /// # Errors
    ///
    /// Returns `BurrowError::Layer` on network failure, a redirect without
    /// `Location`, a second redirect, or any other non-2xx status.
    pub fn fetch_layer(
        &self,
        token: &AccessToken,
        image: &ImageReference,
        layer: &LayerDescriptor,
    ) -> Result<Vec<u8>> {
        let fail = |message: String| BurrowError::Layer {
            digest: layer.digest().to_string(),
            message,
        };

        let url = format!(
            "{}/{}/blobs/{}",
            self.config.registry_base(),
            image.path(),
            layer.digest()
        );
        let authorization = token.bearer();

        let mut response = self
            .transport
            .get(&HttpRequest::get(url.as_str()).header("Authorization", authorization.as_str()))
            .map_err(|e| fail(e.to_string()))?;

        if response.status == TEMPORARY_REDIRECT {
            let location = redirect_target(&url, &response).map_err(fail)?;
            tracing::debug!(digest = layer.digest(), %location, "following blob redirect");
            response = self
                .transport
                .get(&HttpRequest::get(location).header("Authorization", authorization.as_str()))
                .map_err(|e| fail(e.to_string()))?;
            if response.status == TEMPORARY_REDIRECT {
                return Err(fail("redirected more than once".into()));
            }
        }

        if !response.is_success() {
            return Err(fail(status_message(&response)));
        }
        Ok(response.body)
    }

    /// Fetches and unpacks every layer of `manifest` into `root`, in order.
    ///
    /// Stops at the first failure; layers already unpacked stay in place.
    ///
    /// # Errors
    ///
    /// Returns the first `BurrowError::Layer` or `BurrowError::Extract`.
    pub fn extract_image(
        &self,
        root: &Path,
        scratch_dir: &Path,
        token: &AccessToken,
        image: &ImageReference,
        manifest: &Manifest,
    ) -> Result<Vec<ExtractedLayer>> {
        let total = manifest.layers().len();
        let mut extracted = Vec::with_capacity(total);
        for (index, descriptor) in manifest.layers().iter().enumerate() {
            tracing::info!(
                digest = descriptor.digest(),
                layer = index + 1,
                total,
                "pulling layer"
            );
            let blob = self.fetch_layer(token, image, descriptor)?;
            extracted.push(layer::extract_layer(root, scratch_dir, descriptor, &blob)?);
        }
        Ok(extracted)
    }

    /// Authenticates, resolves the manifest, and unpacks every layer.
    ///
    /// # Errors
    ///
    /// Returns the first error of any step.
    pub fn pull(&self, root: &Path, scratch_dir: &Path, image: &ImageReference) -> Result<Manifest> {
        let token = self.authenticate(image)?;
        let manifest = self.fetch_manifest(&token, image)?;
        let _ = self.extract_image(root, scratch_dir, &token, image, &manifest)?;
        Ok(manifest)
    }
}

fn redirect_target(base: &str, response: &HttpResponse) -> std::result::Result<String, String> {
    let location = response
        .header("Location")
        .ok_or_else(|| "redirect without Location header".to_string())?;
    let base = reqwest::Url::parse(base).map_err(|e| format!("invalid blob URL {base}: {e}"))?;
    base.join(location)
        .map(String::from)
        .map_err(|e| format!("invalid redirect target {location:?}: {e}"))
}

fn status_message(response: &HttpResponse) -> String {
    let excerpt = response.body_excerpt();
    if excerpt.is_empty() {
        format!("HTTP {}", response.status)
    } else {
        format!("HTTP {}: {excerpt}", response.status)
    }
}
