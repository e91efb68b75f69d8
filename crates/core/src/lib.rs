//! Core utilities for distkit release tooling
//!
//! This crate provides shared functionality used by the platform crates:
//!
//! - **Error handling**: errors with codes, context, and recovery suggestions
//! - **Configuration**: TOML-based `distkit.toml` with defaults for every field
//! - **Properties**: Java `.properties` reading and writing (`key.properties`)
//! - **Process execution**: captured or streamed command execution
//!
//! # Example
//!
//! ```rust,no_run
//! use distkit_core::{config::Config, properties::Properties};
//! use std::path::Path;
//!
//! let config = Config::load(None, Path::new(".")).expect("invalid distkit.toml");
//! let key_props = Properties::load_if_exists(Path::new(&config.schema.signing.key_properties))
//!     .expect("unreadable key.properties");
//!
//! if key_props.is_empty() {
//!     println!("release builds will not be signed by distkit");
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod process;
pub mod properties;

pub use error::{Error, ErrorCode, Result, ResultExt};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{Config, ConfigSchema};
    pub use crate::error::{exit_codes, Error, ErrorCode, Result, ResultExt};
    pub use crate::properties::Properties;
}
