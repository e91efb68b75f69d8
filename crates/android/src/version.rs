//! Version name lookup
//!
//! The exported file name embeds the app's version name. It comes from, in
//! order: `distkit.toml`, a literal `versionName` in the app build script,
//! `flutter.versionName` in `local.properties`, the `version:` line of the
//! Flutter `pubspec.yaml` (build number stripped).

use crate::layout::ProjectLayout;
use distkit_core::error::{Error, ErrorCode, Result, ResultExt};
use distkit_core::properties::Properties;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::path::{Path, PathBuf};

static BUILD_SCRIPT_VERSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\bversionName\s*(?:=\s*)?["']([^"'$]+)["']"#).unwrap());

static PUBSPEC_VERSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?m)^version:\s*["']?([^\s"'+#]+)"#).unwrap());

static GRADLE_COMMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)/\*.*?\*/|//[^\n]*").unwrap());

/// Where a version name was found
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "path", rename_all = "snake_case")]
pub enum VersionSource {
    /// `app.version_name` in the configuration
    Config,
    /// `versionName` literal in a Gradle build script
    BuildScript(PathBuf),
    /// `flutter.versionName` in `local.properties`
    LocalProperties(PathBuf),
    /// `version:` in `pubspec.yaml`
    Pubspec(PathBuf),
}

/// A resolved version name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionName {
    /// The version name
    pub value: String,
    /// Where it came from
    pub source: VersionSource,
}

/// Resolve the version name for exported artifacts
pub fn resolve_version_name(configured: Option<&str>, layout: &ProjectLayout) -> Result<VersionName> {
    if let Some(value) = configured {
        return Ok(VersionName {
            value: value.to_string(),
            source: VersionSource::Config,
        });
    }

    for script in ["build.gradle.kts", "build.gradle"] {
        let path = layout.app_dir.join(script);
        let content = read_if_exists(&path)?.map(|s| GRADLE_COMMENT.replace_all(&s, "").into_owned());
        if let Some(value) = content.and_then(|s| first_capture(&s, &BUILD_SCRIPT_VERSION)) {
            return Ok(found(value, VersionSource::BuildScript(path)));
        }
    }

    let local_properties = layout.root.join("local.properties");
    if let Some(value) = Properties::load_if_exists(&local_properties)?.get("flutter.versionName") {
        return Ok(found(
            value.to_string(),
            VersionSource::LocalProperties(local_properties),
        ));
    }

    let pubspec = layout.root.join("..").join("pubspec.yaml");
    if let Some(value) = read_if_exists(&pubspec)?.and_then(|s| first_capture(&s, &PUBSPEC_VERSION)) {
        return Ok(found(value, VersionSource::Pubspec(pubspec)));
    }

    Err(Error::new(ErrorCode::ConfigError, "Could not determine the app version name")
        .with_context(format!("Searched build scripts in {}", layout.app_dir.display()))
        .with_suggestion("Set app.version_name in distkit.toml or pass --version-name"))
}

fn found(value: String, source: VersionSource) -> VersionName {
    tracing::debug!(version = %value, source = ?source, "resolved version name");
    VersionName { value, source }
}

fn read_if_exists(path: &Path) -> Result<Option<String>> {
    if !path.is_file() {
        return Ok(None);
    }
    std::fs::read_to_string(path)
        .map(Some)
        .context(format!("Reading {}", path.display()))
}

fn first_capture(content: &str, pattern: &Regex) -> Option<String> {
    pattern
        .captures(content)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|v| !v.is_empty())
}
