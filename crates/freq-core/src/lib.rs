//! Core types and pure logic for the CJK frequency collector.
//!
//! Holds the code-point classifier, the per-document tally, the Pinyin
//! transliteration table, shared error types, formatting helpers and the
//! command-line settings.

pub mod classify;
pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;
pub mod transliteration;

pub use error::{FreqError, Result};
pub use models::{CodePoint, FrequencyRecord, StoreKey};
