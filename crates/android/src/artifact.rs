//! Release artifact kinds and naming

use distkit_core::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Binary package produced by a release build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    /// Android application package
    Apk,
    /// Android app bundle
    Aab,
}

impl ArtifactKind {
    /// All kinds, APK first
    pub const ALL: [ArtifactKind; 2] = [ArtifactKind::Apk, ArtifactKind::Aab];

    /// File extension without the dot
    pub fn extension(&self) -> &'static str {
        match self {
            ArtifactKind::Apk => "apk",
            ArtifactKind::Aab => "aab",
        }
    }

    /// Human-readable name
    pub fn display_name(&self) -> &'static str {
        match self {
            ArtifactKind::Apk => "APK",
            ArtifactKind::Aab => "App Bundle",
        }
    }

    /// Gradle task that produces the release artifact
    pub fn release_task(&self) -> &'static str {
        match self {
            ArtifactKind::Apk => crate::tasks::ASSEMBLE_RELEASE,
            ArtifactKind::Aab => crate::tasks::BUNDLE_RELEASE,
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Product name and version used to name exported artifacts
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleaseName {
    product: String,
    version: String,
}

impl ReleaseName {
    /// Create a release name
    ///
    /// Both parts end up in a file name, so they must be non-empty and free
    /// of path separators.
    pub fn new(product: impl Into<String>, version: impl Into<String>) -> Result<Self> {
        let product = product.into();
        let version = version.into();
        validate_component("app.product", &product)?;
        validate_component("app.version_name", &version)?;
        Ok(Self { product, version })
    }

    /// Product name
    pub fn product(&self) -> &str {
        &self.product
    }

    /// Version name
    pub fn version(&self) -> &str {
        &self.version
    }

    /// `<product>-v<version>-release.<ext>`
    pub fn file_name(&self, kind: ArtifactKind) -> String {
        format!(
            "{}-v{}-release.{}",
            self.product,
            self.version,
            kind.extension()
        )
    }
}

/// Path separators, quotes and characters Windows rejects in file names
const FORBIDDEN_CHARS: [char; 10] = ['/', '\\', '"', '\'', ':', '*', '?', '<', '>', '|'];

fn validate_component(key: &str, value: &str) -> Result<()> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::invalid_config_value(key, "must not be empty"));
    }
    if trimmed != value {
        return Err(Error::invalid_config_value(
            key,
            "must not start or end with whitespace",
        ));
    }
    if value.contains(FORBIDDEN_CHARS)
        || value.chars().any(char::is_control)
        || value == "."
        || value == ".."
    {
        return Err(Error::invalid_config_value(
            key,
            format!("'{}' cannot be used in a file name", value),
        ));
    }
    Ok(())
}
