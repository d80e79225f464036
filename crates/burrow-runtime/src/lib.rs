//! Launch orchestration for the Burrow runtime.
//!
//! A launch stages a root directory, optionally populates it from a
//! registry image, swaps the process root into it, and runs the command
//! in a fresh PID namespace. The child's exit status is the result.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod launcher;
pub mod process;
pub mod staging;
