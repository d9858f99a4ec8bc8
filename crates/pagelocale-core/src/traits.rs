use crate::{error::LocaleError, table::TranslationTable};
use async_trait::async_trait;

/// Durable key-value storage for the language preference.
///
/// Backends (SQLite, in-memory) implement this trait so the localizer
/// never reaches for ambient global storage.
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    /// Human-readable backend name.
    fn name(&self) -> &str;

    /// Read a stored value, `None` if nothing was ever written.
    async fn get(&self, key: &str) -> Result<Option<String>, LocaleError>;

    /// Store a value, replacing any previous one.
    async fn set(&self, key: &str, value: &str) -> Result<(), LocaleError>;
}

/// Source of the translation table.
///
/// Every call retrieves the whole table; implementations must not cache.
#[async_trait]
pub trait TableSource: Send + Sync {
    /// Human-readable source name.
    fn name(&self) -> &str;

    /// Where the table is read from (URL or path), for logs and status output.
    fn location(&self) -> &str;

    /// Retrieve and parse the full table.
    async fn fetch(&self) -> Result<TranslationTable, LocaleError>;
}

/// Opaque handle to an element inside a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementId(pub usize);

/// An element carrying the marker attribute, with the attribute's value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkedElement {
    pub id: ElementId,
    pub key: String,
}

/// A document whose marked elements can be rewritten.
pub trait Document: Send {
    /// Every element carrying `attribute`, in document order.
    fn marked_elements(&self, attribute: &str) -> Vec<MarkedElement>;

    /// Whether the element is still part of the document. An element whose
    /// ancestor had its content replaced is not.
    fn is_attached(&self, id: ElementId) -> bool;

    /// Replace the element's content with parsed markup.
    fn set_markup(&mut self, id: ElementId, markup: &str) -> Result<(), LocaleError>;

    /// Replace the element's content with plain text.
    fn set_text(&mut self, id: ElementId, text: &str) -> Result<(), LocaleError>;
}
