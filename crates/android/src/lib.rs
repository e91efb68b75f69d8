//! Android release tooling for distkit
//!
//! This crate provides:
//! - Release signing configuration from `key.properties`
//! - Artifact export with candidate-path fallback and fixed naming
//! - Build task finalizers (`assembleRelease`, `bundleRelease`)
//! - Gradle wrapper integration

#![warn(missing_docs)]

pub mod artifact;
pub mod export;
pub mod gradle;
pub mod layout;
pub mod signing;
pub mod tasks;
pub mod version;

pub use artifact::{ArtifactKind, ReleaseName};
pub use export::{ExportOutcome, ExportStep, StepReport};
pub use layout::ProjectLayout;
pub use signing::{ReleaseBuildType, SigningConfig, SigningCredentials};
pub use tasks::ExportPlan;
