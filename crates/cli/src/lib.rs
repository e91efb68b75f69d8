//! Terminal output helpers for distkit tools
//!
//! - Status lines and headers
//! - Human-readable sizes, durations and paths
//! - Spinners for long-running Gradle tasks

#![warn(missing_docs)]

pub mod output;
pub mod progress;
