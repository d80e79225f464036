//! # burrow-image
//!
//! Minimal registry client that turns an image name into a populated
//! directory tree.
//!
//! Handles:
//! - **Auth**: anonymous bearer token exchange for one pull scope.
//! - **Manifests**: legacy layer lists, decoded in server order.
//! - **Layers**: blob download with a single temporary-redirect hop.
//! - **Extraction**: tar unpacking with gzip auto-detection.
//! - **Transport**: the HTTP seam, so tests can script registry responses.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod auth;
pub mod layer;
pub mod manifest;
pub mod registry;
pub mod transport;
