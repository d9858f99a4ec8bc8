//! # pagelocale-dom
//!
//! A small in-memory markup tree that implements
//! [`pagelocale_core::traits::Document`].
//!
//! Parsing is lenient: untouched markup serializes back byte for byte,
//! only replaced element content is rewritten.

pub mod escape;
mod page;

pub use page::Page;
