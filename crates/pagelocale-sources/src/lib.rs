//! # pagelocale-sources
//!
//! Where translation tables come from: a fixed HTTP resource or a local file.

pub mod file;
pub mod http;

pub use file::FileTableSource;
pub use http::HttpTableSource;

use pagelocale_core::{
    config::{SourceConfig, SourceKind},
    error::LocaleError,
    traits::TableSource,
};

/// Build the table source selected in config.
pub fn build_source(config: &SourceConfig) -> Result<Box<dyn TableSource>, LocaleError> {
    match config.kind {
        SourceKind::Http => Ok(Box::new(HttpTableSource::from_config(config)?)),
        SourceKind::File => Ok(Box::new(FileTableSource::from_config(config))),
    }
}
