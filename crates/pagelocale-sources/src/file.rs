//! Translation table read from a local `lang.json`.

use async_trait::async_trait;
use pagelocale_core::{
    config::SourceConfig, error::LocaleError, shellexpand, table::TranslationTable,
    traits::TableSource,
};
use tracing::debug;

pub struct FileTableSource {
    path: String,
}

impl FileTableSource {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: shellexpand(&path.into()),
        }
    }

    /// Create from config values.
    pub fn from_config(config: &SourceConfig) -> Self {
        Self::new(config.file.as_str())
    }
}

#[async_trait]
impl TableSource for FileTableSource {
    fn name(&self) -> &str {
        "file"
    }

    fn location(&self) -> &str {
        &self.path
    }

    async fn fetch(&self) -> Result<TranslationTable, LocaleError> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|e| LocaleError::Fetch(format!("failed to read {}: {e}", self.path)))?;
        let table = TranslationTable::from_slice(&bytes)?;
        debug!("translation table loaded from {}", self.path);
        Ok(table)
    }
}
