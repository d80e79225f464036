//! Configuration model for a Burrow launch.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::constants::{
    APP_NAME, DEFAULT_AUTH_SERVICE, DEFAULT_AUTH_URL, DEFAULT_REGISTRY_URL,
    LEGACY_MANIFEST_MEDIA_TYPE,
};
use crate::error::{BurrowError, Result};

/// Root configuration for the Burrow launcher.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BurrowConfig {
    /// Registry endpoints used to resolve images.
    pub registry: RegistryConfig,
    /// Parent directory for staging roots (system temp dir when unset).
    pub staging_parent: Option<PathBuf>,
}

/// Endpoints and request details for the registry client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Token endpoint.
    pub auth_url: String,
    /// Value of the `service` query parameter on token requests.
    pub service: String,
    /// Registry API base, e.g. `https://registry-1.docker.io/v2`.
    pub registry_url: String,
    /// Media type sent in the `Accept` header of manifest requests.
    pub manifest_media_type: String,
    /// `User-Agent` sent with every request.
    pub user_agent: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            auth_url: DEFAULT_AUTH_URL.to_string(),
            service: DEFAULT_AUTH_SERVICE.to_string(),
            registry_url: DEFAULT_REGISTRY_URL.to_string(),
            manifest_media_type: LEGACY_MANIFEST_MEDIA_TYPE.to_string(),
            user_agent: format!("{APP_NAME}/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl RegistryConfig {
    /// Checks that both endpoints are absolute http(s) URLs.
    ///
    /// # Errors
    ///
    /// Returns `BurrowError::Config` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        check_url("auth_url", &self.auth_url)?;
        check_url("registry_url", &self.registry_url)?;
        if self.service.trim().is_empty() {
            return Err(BurrowError::Config {
                message: "service must not be empty".into(),
            });
        }
        Ok(())
    }

    /// Returns the registry base without a trailing slash.
    #[must_use]
    pub fn registry_base(&self) -> &str {
        self.registry_url.trim_end_matches('/')
    }
}

fn check_url(field: &str, value: &str) -> Result<()> {
    let rest = value
        .strip_prefix("https://")
        .or_else(|| value.strip_prefix("http://"));
    match rest {
        Some(host) if !host.is_empty() && !host.starts_with('/') => Ok(()),
        _ => Err(BurrowError::Config {
            message: format!("{field} must be an absolute http(s) URL, got {value:?}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_points_at_public_registry() {
        let config = RegistryConfig::default();
        assert_eq!(config.auth_url, "https://auth.docker.io/token");
        assert_eq!(config.service, "registry.docker.io");
        assert!(config.user_agent.starts_with("burrow/"));
        config.validate().expect("default config must validate");
    }

    #[test]
    fn validate_rejects_non_http_urls() {
        let config = RegistryConfig {
            registry_url: "ftp://mirror.local/v2".into(),
            ..RegistryConfig::default()
        };
        let err = config.validate().expect_err("ftp must be rejected");
        assert!(err.to_string().contains("registry_url"));

        let config = RegistryConfig {
            auth_url: "https://".into(),
            ..RegistryConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_empty_service() {
        let config = RegistryConfig {
            service: " ".into(),
            ..RegistryConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn registry_base_trims_trailing_slash() {
        let config = RegistryConfig {
            registry_url: "http://127.0.0.1:5000/v2/".into(),
            ..RegistryConfig::default()
        };
        assert_eq!(config.registry_base(), "http://127.0.0.1:5000/v2");
    }

    #[test]
    fn config_survives_json_roundtrip() {
        let config = BurrowConfig {
            staging_parent: Some(PathBuf::from("/var/tmp")),
            ..BurrowConfig::default()
        };
        let json = serde_json::to_string(&config).expect("serialize failed");
        let back: BurrowConfig = serde_json::from_str(&json).expect("deserialize failed");
        assert_eq!(back.registry, config.registry);
        assert_eq!(back.staging_parent, config.staging_parent);
    }
}
