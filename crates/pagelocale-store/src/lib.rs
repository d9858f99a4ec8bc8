//! # pagelocale-store
//!
//! Language preference stores: durable (SQLite-backed) and in-memory.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryPreferenceStore;
pub use sqlite::SqlitePreferenceStore;
