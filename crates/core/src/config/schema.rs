//! Configuration schema definitions
//!
//! Every field has a default matching a stock Flutter Android project, so an
//! empty `distkit.toml` (or none at all) is a valid configuration.

use serde::{Deserialize, Serialize};

/// Root configuration schema
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConfigSchema {
    /// Product name and version
    #[serde(default)]
    pub app: AppConfig,

    /// Gradle project layout
    #[serde(default)]
    pub project: ProjectConfig,

    /// Export steps
    #[serde(default)]
    pub export: ExportConfig,

    /// Release signing
    #[serde(default)]
    pub signing: SigningSettings,

    /// Logging
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Product identity used in exported file names
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Product name, the `<product>` in `<product>-v<version>-release.apk`
    #[serde(default = "default_product")]
    pub product: String,

    /// Version name; read from the app build script when unset
    #[serde(default)]
    pub version_name: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            product: default_product(),
            version_name: None,
        }
    }
}

fn default_product() -> String {
    "app".to_string()
}

/// Gradle project layout, relative to the Android project root
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Android (Gradle root) project directory
    #[serde(default = "default_android_dir")]
    pub android_dir: String,

    /// App module directory
    #[serde(default = "default_app_module")]
    pub app_module: String,

    /// Build directory of the app module
    #[serde(default = "default_app_build_dir")]
    pub app_build_dir: String,

    /// Build directory of the root project
    #[serde(default = "default_root_build_dir")]
    pub root_build_dir: String,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            android_dir: default_android_dir(),
            app_module: default_app_module(),
            app_build_dir: default_app_build_dir(),
            root_build_dir: default_root_build_dir(),
        }
    }
}

fn default_android_dir() -> String {
    ".".to_string()
}

fn default_app_module() -> String {
    "app".to_string()
}

fn default_app_build_dir() -> String {
    "app/build".to_string()
}

fn default_root_build_dir() -> String {
    "build".to_string()
}

/// Artifact export configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Distribution directory, relative to the Android project root
    #[serde(default = "default_dist_dir")]
    pub dist_dir: String,

    /// APK candidates relative to the app build directory, in priority order
    #[serde(default = "default_apk_candidates")]
    pub apk_candidates: Vec<String>,

    /// AAB candidates relative to the app build directory, in priority order
    #[serde(default = "default_aab_candidates")]
    pub aab_candidates: Vec<String>,

    /// Also copy the Gradle-built APK where the Flutter tool expects it
    #[serde(default = "default_true")]
    pub mirror_to_framework_output: bool,

    /// Framework APK directory, relative to the root build directory
    #[serde(default = "default_framework_output_dir")]
    pub framework_output_dir: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            dist_dir: default_dist_dir(),
            apk_candidates: default_apk_candidates(),
            aab_candidates: default_aab_candidates(),
            mirror_to_framework_output: true,
            framework_output_dir: default_framework_output_dir(),
        }
    }
}

fn default_dist_dir() -> String {
    "dist".to_string()
}

fn default_apk_candidates() -> Vec<String> {
    vec![
        "outputs/flutter-apk/app-release.apk".to_string(),
        "outputs/apk/release/app-release.apk".to_string(),
    ]
}

fn default_aab_candidates() -> Vec<String> {
    vec!["outputs/bundle/release/app-release.aab".to_string()]
}

fn default_framework_output_dir() -> String {
    "app/outputs/flutter-apk".to_string()
}

fn default_true() -> bool {
    true
}

/// Release signing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SigningSettings {
    /// Credentials file, relative to the Android project root
    #[serde(default = "default_key_properties")]
    pub key_properties: String,

    /// Enable v1 (JAR) signing
    #[serde(default = "default_true")]
    pub v1_signing: bool,

    /// Enable v2 (APK Signature Scheme v2) signing
    #[serde(default = "default_true")]
    pub v2_signing: bool,
}

impl Default for SigningSettings {
    fn default() -> Self {
        Self {
            key_properties: default_key_properties(),
            v1_signing: true,
            v2_signing: true,
        }
    }
}

fn default_key_properties() -> String {
    "key.properties".to_string()
}

/// Log output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default log level when neither `RUST_LOG` nor `-v`/`-q` is given
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for daily-rotated log files; console only when unset
    #[serde(default)]
    pub directory: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: None,
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}
