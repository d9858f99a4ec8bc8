//! # pagelocale-core
//!
//! Core types, traits, configuration, and error handling for pagelocale.

pub mod config;
pub mod error;
pub mod table;
pub mod traits;

pub use config::shellexpand;
