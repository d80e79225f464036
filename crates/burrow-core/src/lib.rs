//! # burrow-core
//!
//! Low-level Linux isolation primitives for the Burrow launcher.
//!
//! This crate provides safe abstractions over:
//! - **Filesystem**: `chroot(2)` into a staging root.
//! - **Namespaces**: PID namespace creation for the launched child.
//! - **Isolation**: the [`isolation::Isolation`] capability boundary that
//!   the launcher goes through, so tests can substitute a simulated
//!   implementation for the privileged one.
//!
//! Both privileged operations are irreversible for the calling process.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod filesystem;
pub mod isolation;
pub mod namespace;
