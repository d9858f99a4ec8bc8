use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::LocaleError;

/// Top-level pagelocale configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub locale: LocaleConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

/// Localization behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocaleConfig {
    /// Language used when no preference has been stored yet.
    #[serde(default = "default_language")]
    pub default_language: String,
    /// Key under which the active language is persisted.
    #[serde(default = "default_storage_key")]
    pub storage_key: String,
    /// Attribute marking an element as translatable; its value is the lookup key.
    #[serde(default = "default_marker_attribute")]
    pub marker_attribute: String,
    #[serde(default)]
    pub content_mode: ContentMode,
    #[serde(default)]
    pub missing_policy: MissingPolicy,
    #[serde(default)]
    pub missing_language: MissingLanguage,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for LocaleConfig {
    fn default() -> Self {
        Self {
            default_language: default_language(),
            storage_key: default_storage_key(),
            marker_attribute: default_marker_attribute(),
            content_mode: ContentMode::default(),
            missing_policy: MissingPolicy::default(),
            missing_language: MissingLanguage::default(),
            log_level: default_log_level(),
        }
    }
}

/// How a translated string is written into an element.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentMode {
    /// Inserted as escaped text; embedded tags show up literally (default).
    #[default]
    Text,
    /// Parsed as markup. Only for translation tables you control.
    Markup,
}

/// What happens to an element whose key has no usable translation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingPolicy {
    /// Keep the element's existing content when the value is absent or blank (default).
    #[default]
    Preserve,
    /// Always write the looked-up value; absent keys clear the element.
    Overwrite,
}

/// What happens when the requested language is absent from the table.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingLanguage {
    /// Return an error before touching any element (default).
    #[default]
    Fail,
    /// Apply the default language's entries instead.
    Fallback,
    /// Leave the document untouched and succeed.
    Skip,
}

impl ContentMode {
    pub fn display_name(&self) -> &str {
        match self {
            Self::Text => "text",
            Self::Markup => "markup",
        }
    }
}

impl MissingPolicy {
    pub fn display_name(&self) -> &str {
        match self {
            Self::Preserve => "preserve",
            Self::Overwrite => "overwrite",
        }
    }
}

impl MissingLanguage {
    pub fn display_name(&self) -> &str {
        match self {
            Self::Fail => "fail",
            Self::Fallback => "fallback",
            Self::Skip => "skip",
        }
    }
}

/// Where the translation table comes from.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Http,
    File,
}

/// Translation table source config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default)]
    pub kind: SourceKind,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Fixed resource path joined onto `base_url`.
    #[serde(default = "default_table_path")]
    pub path: String,
    /// Local table file, used when `kind = "file"`.
    #[serde(default = "default_table_file")]
    pub file: String,
    /// Request timeout in seconds (default: 10).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::default(),
            base_url: default_base_url(),
            path: default_table_path(),
            file: default_table_file(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl SourceConfig {
    /// Full URL of the translation table.
    pub fn url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        if self.path.starts_with('/') {
            format!("{base}{}", self.path)
        } else {
            format!("{base}/{}", self.path)
        }
    }
}

/// Preference store config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

// --- Default value functions ---

fn default_language() -> String {
    "en".to_string()
}
fn default_storage_key() -> String {
    "lang".to_string()
}
fn default_marker_attribute() -> String {
    "data-t".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}
fn default_table_path() -> String {
    "/assets/lang/lang.json".to_string()
}
fn default_table_file() -> String {
    "assets/lang/lang.json".to_string()
}
fn default_timeout_secs() -> u64 {
    10
}
fn default_db_path() -> String {
    "~/.pagelocale/prefs.db".to_string()
}

/// Expand `~` to home directory.
pub fn shellexpand(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return format!("{}/{rest}", home.to_string_lossy());
        }
    }
    path.to_string()
}

/// Load configuration from a TOML file, falling back to defaults.
pub fn load(path: &str) -> Result<Config, LocaleError> {
    let path = Path::new(path);
    if !path.exists() {
        tracing::info!(
            "Config file not found at {}, using defaults",
            path.display()
        );
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| LocaleError::Config(format!("failed to read {}: {}", path.display(), e)))?;

    let config: Config = toml::from_str(&content)
        .map_err(|e| LocaleError::Config(format!("failed to parse config: {}", e)))?;

    Ok(config)
}
