//! Localizer: persists the active language, fetches the translation
//! table, and rewrites every marked element of a document.
//!
//! One pass is: store write → table fetch → element scan → content
//! replacement. Nothing is cached between passes.

use pagelocale_core::{
    config::{ContentMode, LocaleConfig, MissingLanguage, MissingPolicy},
    error::LocaleError,
    table::{is_usable, LanguageMap, TranslationTable},
    traits::{Document, ElementId, PreferenceStore, TableSource},
};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[cfg(test)]
mod tests;

/// Outcome of one localization pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Language that was asked for (and persisted).
    pub requested: String,
    /// Language whose entries were actually applied. Differs from
    /// `requested` only after a default-language fallback.
    pub applied: Option<String>,
    /// Elements still in the document that received a usable translation.
    pub translated: usize,
    /// Keys left with their existing content (absent or blank translation).
    pub untouched: Vec<String>,
    /// Keys overwritten with an absent or blank translation.
    pub cleared: Vec<String>,
}

pub struct Localizer {
    store: Arc<dyn PreferenceStore>,
    source: Arc<dyn TableSource>,
    config: LocaleConfig,
}

impl Localizer {
    pub fn new(
        store: Arc<dyn PreferenceStore>,
        source: Arc<dyn TableSource>,
        config: LocaleConfig,
    ) -> Self {
        Self {
            store,
            source,
            config,
        }
    }

    pub fn config(&self) -> &LocaleConfig {
        &self.config
    }

    pub fn source(&self) -> &dyn TableSource {
        self.source.as_ref()
    }

    pub fn store(&self) -> &dyn PreferenceStore {
        self.store.as_ref()
    }

    /// The stored language, or the configured default if none was stored.
    pub async fn active_language(&self) -> Result<String, LocaleError> {
        let stored = self.store.get(&self.config.storage_key).await?;
        Ok(stored.unwrap_or_else(|| self.config.default_language.clone()))
    }

    /// Startup hook: apply the stored (or default) language.
    pub async fn on_load(&self, doc: &mut dyn Document) -> Result<ApplyReport, LocaleError> {
        let lang = self.active_language().await?;
        self.apply_language(doc, &lang).await
    }

    /// Persist `lang`, fetch the table, and translate every marked element.
    ///
    /// The preference is written before the fetch, so it sticks even when
    /// the fetch fails. A language missing from the table is handled per
    /// [`MissingLanguage`]; with `Fail` no element is touched.
    pub async fn apply_language(
        &self,
        doc: &mut dyn Document,
        lang: &str,
    ) -> Result<ApplyReport, LocaleError> {
        self.store.set(&self.config.storage_key, lang).await?;
        info!(
            "applying language '{lang}' (table: {})",
            self.source.location()
        );

        let table = self.source.fetch().await?;
        let mut report = ApplyReport {
            requested: lang.to_string(),
            ..Default::default()
        };

        let Some((applied, trans)) = self.resolve(&table, lang)? else {
            return Ok(report);
        };
        report.applied = Some(applied.clone());

        for marked in doc.marked_elements(&self.config.marker_attribute) {
            // An earlier write in this pass replaced an ancestor's content.
            if !doc.is_attached(marked.id) {
                debug!("'{}' was removed by an enclosing translation", marked.key);
                continue;
            }
            let value = trans.get(&marked.key).map(String::as_str);
            let usable = is_usable(value);

            match self.config.missing_policy {
                MissingPolicy::Preserve if !usable => {
                    debug!("keeping default content for '{}'", marked.key);
                    report.untouched.push(marked.key);
                    continue;
                }
                MissingPolicy::Preserve => {}
                MissingPolicy::Overwrite => {
                    if !usable {
                        report.cleared.push(marked.key.clone());
                    }
                }
            }

            self.write(doc, marked.id, value.unwrap_or(""))?;
            if usable {
                report.translated += 1;
            }
        }

        if !report.untouched.is_empty() || !report.cleared.is_empty() {
            warn!(
                "language '{applied}': {} key(s) without a usable translation",
                report.untouched.len() + report.cleared.len()
            );
        }
        info!(
            "language '{applied}' applied to {} element(s)",
            report.translated
        );
        Ok(report)
    }

    /// Keys marked in `doc` that have no usable translation in `lang`.
    ///
    /// Read-only: neither the preference nor the document is changed.
    pub async fn audit(&self, doc: &dyn Document, lang: &str) -> Result<Vec<String>, LocaleError> {
        let table = self.source.fetch().await?;
        let trans = table
            .language(lang)
            .ok_or_else(|| LocaleError::MissingLanguage(lang.to_string()))?;

        let mut missing: Vec<String> = doc
            .marked_elements(&self.config.marker_attribute)
            .into_iter()
            .filter(|m| !is_usable(trans.get(&m.key).map(String::as_str)))
            .map(|m| m.key)
            .collect();
        missing.sort();
        missing.dedup();
        Ok(missing)
    }

    /// Pick the entries to apply for `lang`. `Ok(None)` means skip the pass.
    fn resolve<'t>(
        &self,
        table: &'t TranslationTable,
        lang: &str,
    ) -> Result<Option<(String, &'t LanguageMap)>, LocaleError> {
        if let Some(trans) = table.language(lang) {
            return Ok(Some((lang.to_string(), trans)));
        }

        match self.config.missing_language {
            MissingLanguage::Fail => {
                warn!("language '{lang}' not in translation table");
                Err(LocaleError::MissingLanguage(lang.to_string()))
            }
            MissingLanguage::Skip => {
                warn!("language '{lang}' not in translation table, leaving page as is");
                Ok(None)
            }
            MissingLanguage::Fallback => {
                let fallback = &self.config.default_language;
                let trans = table
                    .language(fallback)
                    .ok_or_else(|| LocaleError::MissingLanguage(lang.to_string()))?;
                warn!("language '{lang}' not in translation table, using '{fallback}'");
                Ok(Some((fallback.clone(), trans)))
            }
        }
    }

    fn write(&self, doc: &mut dyn Document, id: ElementId, value: &str) -> Result<(), LocaleError> {
        match self.config.content_mode {
            ContentMode::Text => doc.set_text(id, value),
            ContentMode::Markup => doc.set_markup(id, value),
        }
    }
}
