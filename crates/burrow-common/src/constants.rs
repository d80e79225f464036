//! System-wide constants and default endpoints.

/// Default token endpoint of the public registry.
pub const DEFAULT_AUTH_URL: &str = "https://auth.docker.io/token";

/// Service name sent with every token request.
pub const DEFAULT_AUTH_SERVICE: &str = "registry.docker.io";

/// Default registry API base (the `/v2` root, without namespace).
pub const DEFAULT_REGISTRY_URL: &str = "https://registry-1.docker.io/v2";

/// Namespace that official images live under.
pub const DEFAULT_NAMESPACE: &str = "library";

/// The only tag Burrow resolves.
pub const DEFAULT_TAG: &str = "latest";

/// Legacy (schema 1) manifest media type requested from the registry.
pub const LEGACY_MANIFEST_MEDIA_TYPE: &str = "application/vnd.docker.distribution.manifest.v1+json";

/// Maximum accepted length of a repository name.
pub const MAX_REPOSITORY_LEN: usize = 255;

/// Exit status reported for any failure that is not a child's own exit code.
pub const FALLBACK_EXIT_CODE: u8 = 1;

/// Prefix for staging root directories.
pub const STAGING_PREFIX: &str = "burrow-";

/// Device stub path, relative to the staging root.
pub const DEV_NULL_RELATIVE: &str = "dev/null";

/// Permission bits of the `dev/null` stub.
pub const DEV_NULL_MODE: u32 = 0o666;

/// Permission bits for directories created while staging.
pub const STAGING_DIR_MODE: u32 = 0o755;

/// Application name used in user agents and diagnostics.
pub const APP_NAME: &str = "burrow";
