//! Resolved Gradle project layout

use distkit_core::config::ConfigSchema;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Absolute-or-base-relative locations of everything distkit touches
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectLayout {
    /// Android (Gradle root) project directory
    pub root: PathBuf,
    /// App module directory
    pub app_dir: PathBuf,
    /// Build directory of the app module
    pub app_build_dir: PathBuf,
    /// Build directory of the root project
    pub root_build_dir: PathBuf,
    /// Distribution directory
    pub dist_dir: PathBuf,
    /// Directory where the Flutter tool looks for APKs
    pub framework_output_dir: PathBuf,
    /// Signing credentials file
    pub key_properties: PathBuf,
}

impl ProjectLayout {
    /// Resolve configured paths against `base` (usually the working directory)
    pub fn resolve(base: &Path, config: &ConfigSchema) -> Self {
        let root = base.join(&config.project.android_dir);
        let root_build_dir = root.join(&config.project.root_build_dir);

        Self {
            app_dir: root.join(&config.project.app_module),
            app_build_dir: root.join(&config.project.app_build_dir),
            dist_dir: root.join(&config.export.dist_dir),
            framework_output_dir: root_build_dir.join(&config.export.framework_output_dir),
            key_properties: root.join(&config.signing.key_properties),
            root_build_dir,
            root,
        }
    }

    /// Path of the Gradle wrapper script for this platform
    pub fn gradle_wrapper(&self) -> PathBuf {
        if cfg!(windows) {
            self.root.join("gradlew.bat")
        } else {
            self.root.join("gradlew")
        }
    }

    /// Resolve a path relative to the app build directory
    pub fn in_app_build(&self, relative: &str) -> PathBuf {
        self.app_build_dir.join(relative)
    }
}
