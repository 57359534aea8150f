//! Runtime layer for the CJK frequency collector.
//!
//! Fetches documents, strips markup, and drives concurrent ingestion of
//! many URLs into a frequency store.

pub mod fetcher;
pub mod ingest;
pub mod text;

pub use freq_core as core;
pub use freq_data as data;
