//! Translation table: language code → key → translated text.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::LocaleError;

/// Translations for a single language.
pub type LanguageMap = HashMap<String, String>;

/// The whole table as served by the translation resource.
///
/// Only flat maps are accepted; nested objects or non-string values
/// fail to parse.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TranslationTable {
    languages: HashMap<String, LanguageMap>,
}

impl TranslationTable {
    /// Parse a table from its JSON bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, LocaleError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Parse a table from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, LocaleError> {
        Ok(serde_json::from_str(json)?)
    }

    /// The entries for `lang`, if the table has that language.
    pub fn language(&self, lang: &str) -> Option<&LanguageMap> {
        self.languages.get(lang)
    }

    /// Language codes in sorted order.
    pub fn languages(&self) -> Vec<&str> {
        let mut codes: Vec<&str> = self.languages.keys().map(String::as_str).collect();
        codes.sort_unstable();
        codes
    }

    pub fn is_empty(&self) -> bool {
        self.languages.is_empty()
    }

    /// Insert or replace one translation.
    #[cfg(test)]
    pub fn insert(&mut self, lang: &str, key: &str, text: &str) {
        self.languages
            .entry(lang.to_string())
            .or_default()
            .insert(key.to_string(), text.to_string());
    }
}

/// Whether a looked-up value is worth writing into an element.
pub fn is_usable(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.trim().is_empty())
}
