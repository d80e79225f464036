//! Bearer token model for anonymous registry pulls.
//!
//! A token is requested once per run and only lives in memory. It is never
//! refreshed: a pull that outlives it fails on the registry side.

use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Deserialize;

/// A scoped pull credential.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    token: String,
    expires_in: Option<u64>,
    issued_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    /// Creates a token from its parts.
    #[must_use]
    pub fn new(
        token: impl Into<String>,
        expires_in: Option<u64>,
        issued_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            token: token.into(),
            expires_in,
            issued_at,
        }
    }

    /// Decodes a token endpoint response body.
    ///
    /// `token` wins over `access_token`; at least one must be non-empty.
    /// An unparseable `issued_at` is dropped rather than rejected.
    ///
    /// # Errors
    ///
    /// Returns a description of the problem if the body is not JSON or
    /// carries no usable token.
    pub fn from_json(body: &[u8]) -> Result<Self, String> {
        let payload: TokenPayload =
            serde_json::from_slice(body).map_err(|e| format!("malformed token payload: {e}"))?;

        let token = [payload.token, payload.access_token]
            .into_iter()
            .flatten()
            .find(|t| !t.is_empty())
            .ok_or_else(|| "token payload carries no token".to_string())?;

        let issued_at = payload
            .issued_at
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|t| t.with_timezone(&Utc));

        Ok(Self::new(token, payload.expires_in, issued_at))
    }

    /// Returns the raw bearer credential.
    #[must_use]
    pub fn secret(&self) -> &str {
        &self.token
    }

    /// Returns the `Authorization` header value.
    #[must_use]
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }

    /// Returns the advertised lifetime in seconds.
    #[must_use]
    pub const fn expires_in(&self) -> Option<u64> {
        self.expires_in
    }

    /// Returns the issue timestamp, if the endpoint reported one.
    #[must_use]
    pub const fn issued_at(&self) -> Option<DateTime<Utc>> {
        self.issued_at
    }

    /// Returns the expiry instant when both issue time and lifetime are known.
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let lifetime = i64::try_from(self.expires_in?).ok()?;
        self.issued_at?
            .checked_add_signed(TimeDelta::try_seconds(lifetime)?)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"<redacted>")
            .field("expires_in", &self.expires_in)
            .field("issued_at", &self.issued_at)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct TokenPayload {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
    #[serde(default)]
    issued_at: Option<String>,
}
