//! Translation table fetched over HTTP from a fixed URL.
//!
//! One GET per fetch; the whole table is downloaded every time.

use async_trait::async_trait;
use pagelocale_core::{
    config::SourceConfig, error::LocaleError, table::TranslationTable, traits::TableSource,
};
use std::time::{Duration, Instant};
use tracing::{debug, info};

pub struct HttpTableSource {
    client: reqwest::Client,
    url: String,
}

impl HttpTableSource {
    /// Create a source for `url` with a whole-request timeout.
    pub fn new(url: String, timeout: Duration) -> Result<Self, LocaleError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LocaleError::Fetch(format!("failed to build http client: {e}")))?;
        Ok(Self { client, url })
    }

    /// Create from config values.
    pub fn from_config(config: &SourceConfig) -> Result<Self, LocaleError> {
        Self::new(config.url(), Duration::from_secs(config.timeout_secs))
    }
}

#[async_trait]
impl TableSource for HttpTableSource {
    fn name(&self) -> &str {
        "http"
    }

    fn location(&self) -> &str {
        &self.url
    }

    async fn fetch(&self) -> Result<TranslationTable, LocaleError> {
        let started = Instant::now();
        debug!("fetching translation table from {}", self.url);

        let resp = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| LocaleError::Fetch(format!("GET {} failed: {e}", self.url)))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(LocaleError::Fetch(format!(
                "GET {} returned {status}",
                self.url
            )));
        }

        let body = resp
            .bytes()
            .await
            .map_err(|e| LocaleError::Fetch(format!("failed to read body from {}: {e}", self.url)))?;

        let table = TranslationTable::from_slice(&body)?;
        info!(
            "translation table loaded from {} ({} languages, {}ms)",
            self.url,
            table.languages().len(),
            started.elapsed().as_millis()
        );
        Ok(table)
    }
}
