use thiserror::Error;

/// Top-level error type for pagelocale.
#[derive(Debug, Error)]
pub enum LocaleError {
    /// The translation table could not be retrieved.
    #[error("fetch error: {0}")]
    Fetch(String),

    /// The translation table is not a flat `{lang: {key: text}}` document.
    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The requested language has no entry in the translation table.
    #[error("language '{0}' not present in translation table")]
    MissingLanguage(String),

    /// Preference store error.
    #[error("store error: {0}")]
    Store(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Document parsing or mutation error.
    #[error("document error: {0}")]
    Document(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
