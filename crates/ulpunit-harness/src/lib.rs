//! Tooling around the ulpunit runtime.
//!
//! - [`probe`]: ULP distance between two literals
//! - [`selfcheck`]: a suite that runs the ULP engine through the runtime
//! - [`artifacts`]: report bundles with a SHA-256 index

#![forbid(unsafe_code)]

pub mod artifacts;
pub mod probe;
pub mod selfcheck;

pub use artifacts::{ArtifactEntry, ArtifactError, ArtifactIndex, ArtifactIssue, verify_bundle};
pub use probe::{DistanceReport, Precision, ProbeError};
