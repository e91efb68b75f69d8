//! Release signing configuration
//!
//! Credentials come from an optional `key.properties` file in the Gradle
//! root project. The release build is signed by distkit only when that file
//! exists and holds at least one property; a non-empty file missing any of
//! the four required keys is a configuration error.

use distkit_core::config::SigningSettings;
use distkit_core::error::{Error, ErrorCode, Result, ResultExt};
use distkit_core::properties::Properties;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Property holding the keystore path
pub const STORE_FILE: &str = "storeFile";
/// Property holding the keystore password
pub const STORE_PASSWORD: &str = "storePassword";
/// Property holding the key alias
pub const KEY_ALIAS: &str = "keyAlias";
/// Property holding the key password
pub const KEY_PASSWORD: &str = "keyPassword";

const REDACTED: &str = "********";

/// Keystore location and secrets for release signing
#[derive(Clone, PartialEq, Eq)]
pub struct SigningCredentials {
    store_file: PathBuf,
    store_password: String,
    key_alias: String,
    key_password: String,
}

impl fmt::Debug for SigningCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningCredentials")
            .field("store_file", &self.store_file)
            .field("store_password", &REDACTED)
            .field("key_alias", &self.key_alias)
            .field("key_password", &REDACTED)
            .finish()
    }
}

impl SigningCredentials {
    /// Create credentials
    pub fn new(
        store_file: impl Into<PathBuf>,
        store_password: impl Into<String>,
        key_alias: impl Into<String>,
        key_password: impl Into<String>,
    ) -> Self {
        Self {
            store_file: store_file.into(),
            store_password: store_password.into(),
            key_alias: key_alias.into(),
            key_password: key_password.into(),
        }
    }

    /// Build credentials from parsed properties
    ///
    /// Returns `None` for an empty property set. A relative `storeFile` is
    /// resolved against `module_dir` (the app module, as Gradle's `file()`
    /// does).
    pub fn from_properties(props: &Properties, module_dir: &Path) -> Result<Option<Self>> {
        if props.is_empty() {
            return Ok(None);
        }

        let missing: Vec<&str> = [STORE_FILE, STORE_PASSWORD, KEY_ALIAS, KEY_PASSWORD]
            .into_iter()
            .filter(|key| props.get(key).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(Error::signing(format!(
                "Signing properties are incomplete, missing: {}",
                missing.join(", ")
            ))
            .with_suggestion(
                "Provide storeFile, storePassword, keyAlias and keyPassword, or remove the file to build unsigned",
            ));
        }

        let required = |key: &str| props.get(key).unwrap_or_default().to_string();
        let store_file = PathBuf::from(required(STORE_FILE));
        if store_file.as_os_str().is_empty() {
            return Err(Error::signing("storeFile must not be empty"));
        }

        Ok(Some(Self {
            store_file: module_dir.join(store_file),
            store_password: required(STORE_PASSWORD),
            key_alias: required(KEY_ALIAS),
            key_password: required(KEY_PASSWORD),
        }))
    }

    /// Load credentials from a properties file, `None` when it is absent or empty
    pub fn load(path: &Path, module_dir: &Path) -> Result<Option<Self>> {
        let props = Properties::load_if_exists(path)?;
        Self::from_properties(&props, module_dir).context(format!("Reading {}", path.display()))
    }

    /// Keystore path
    pub fn store_file(&self) -> &Path {
        &self.store_file
    }

    /// Key alias
    pub fn key_alias(&self) -> &str {
        &self.key_alias
    }

    /// Properties as they appear in `key.properties`
    pub fn to_properties(&self) -> Properties {
        let mut props = Properties::new();
        props.set(STORE_PASSWORD, self.store_password.clone());
        props.set(KEY_PASSWORD, self.key_password.clone());
        props.set(KEY_ALIAS, self.key_alias.clone());
        props.set(STORE_FILE, self.store_file.display().to_string());
        props
    }
}

/// A named signing configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningConfig {
    /// Configuration name
    pub name: String,
    /// Keystore and secrets
    pub credentials: SigningCredentials,
    /// JAR signing
    pub v1_enabled: bool,
    /// APK Signature Scheme v2
    pub v2_enabled: bool,
}

impl SigningConfig {
    /// The `release` signing config
    pub fn release(credentials: SigningCredentials, settings: &SigningSettings) -> Self {
        Self {
            name: "release".to_string(),
            credentials,
            v1_enabled: settings.v1_signing,
            v2_enabled: settings.v2_signing,
        }
    }

    /// Non-secret Android Gradle Plugin injected-signing properties
    pub fn gradle_properties(&self) -> Vec<(&'static str, String)> {
        let creds = &self.credentials;
        vec![
            (
                "android.injected.signing.store.file",
                creds.store_file.display().to_string(),
            ),
            ("android.injected.signing.key.alias", creds.key_alias.clone()),
            (
                "android.injected.signing.v1-enabled",
                self.v1_enabled.to_string(),
            ),
            (
                "android.injected.signing.v2-enabled",
                self.v2_enabled.to_string(),
            ),
        ]
    }

    /// Injected-signing password properties
    ///
    /// These never go on the command line, where other local users can read
    /// them. Gradle picks them up from `ORG_GRADLE_PROJECT_*` variables.
    pub fn secret_properties(&self) -> Vec<(&'static str, String)> {
        vec![
            (
                "android.injected.signing.store.password",
                self.credentials.store_password.clone(),
            ),
            (
                "android.injected.signing.key.password",
                self.credentials.key_password.clone(),
            ),
        ]
    }
}

/// Prefix Gradle maps environment variables to project properties with
pub const GRADLE_PROJECT_ENV_PREFIX: &str = "ORG_GRADLE_PROJECT_";

/// Release build type: signed iff credentials were loaded
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReleaseBuildType {
    /// Attached signing configuration
    pub signing: Option<SigningConfig>,
}

impl ReleaseBuildType {
    /// Attach a signing configuration only when credentials are present
    pub fn configure(credentials: Option<SigningCredentials>, settings: &SigningSettings) -> Self {
        let signing = credentials.map(|c| SigningConfig::release(c, settings));
        match &signing {
            Some(config) => tracing::info!(
                alias = %config.credentials.key_alias(),
                store = %config.credentials.store_file().display(),
                "release signing attached"
            ),
            None => tracing::info!("no signing credentials, release signing not attached"),
        }
        Self { signing }
    }

    /// Load credentials from `key_properties` and configure
    pub fn load(key_properties: &Path, module_dir: &Path, settings: &SigningSettings) -> Result<Self> {
        let credentials = SigningCredentials::load(key_properties, module_dir)?;
        Ok(Self::configure(credentials, settings))
    }

    /// Whether a signing configuration is attached
    pub fn is_signed(&self) -> bool {
        self.signing.is_some()
    }

    /// `-P` arguments passed to Gradle; never includes passwords
    pub fn gradle_args(&self) -> Vec<String> {
        self.signing
            .iter()
            .flat_map(SigningConfig::gradle_properties)
            .map(|(key, value)| format!("-P{}={}", key, value))
            .collect()
    }

    /// Environment for the Gradle process carrying the signing passwords
    pub fn gradle_env(&self) -> Vec<(String, String)> {
        self.signing
            .iter()
            .flat_map(SigningConfig::secret_properties)
            .map(|(key, value)| (format!("{}{}", GRADLE_PROJECT_ENV_PREFIX, key), value))
            .collect()
    }

    /// Summary safe to print or serialize
    pub fn summary(&self) -> SigningSummary {
        match &self.signing {
            Some(config) => SigningSummary {
                attached: true,
                config: Some(config.name.clone()),
                store_file: Some(config.credentials.store_file().to_path_buf()),
                store_file_exists: Some(config.credentials.store_file().is_file()),
                key_alias: Some(config.credentials.key_alias().to_string()),
                v1_enabled: Some(config.v1_enabled),
                v2_enabled: Some(config.v2_enabled),
            },
            None => SigningSummary::default(),
        }
    }
}

/// Printable description of the release signing state (no secrets)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SigningSummary {
    /// Whether release builds are signed
    pub attached: bool,
    /// Signing config name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<String>,
    /// Resolved keystore path
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_file: Option<PathBuf>,
    /// Whether the keystore is on disk
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_file_exists: Option<bool>,
    /// Key alias inside the keystore
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_alias: Option<String>,
    /// JAR signing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub v1_enabled: Option<bool>,
    /// APK Signature Scheme v2
    #[serde(skip_serializing_if = "Option::is_none")]
    pub v2_enabled: Option<bool>,
}

/// Render `key.properties` content for the given credentials
pub fn render_key_properties(credentials: &SigningCredentials) -> String {
    credentials.to_properties().render()
}

/// Write `key.properties`, refusing to replace an existing file unless `force`
pub fn write_key_properties(path: &Path, credentials: &SigningCredentials, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(Error::already_exists(path));
    }
    if credentials.key_alias().is_empty() {
        return Err(Error::new(ErrorCode::InvalidInput, "Key alias must not be empty"));
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, render_key_properties(credentials))
        .context(format!("Writing {}", path.display()))?;

    tracing::debug!(path = %path.display(), "wrote signing properties");
    Ok(())
}
