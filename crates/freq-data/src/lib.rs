//! Persistence and statistics layer for the CJK frequency collector.
//!
//! Defines the [`store::FrequencyStore`] contract with in-memory and SQLite
//! implementations, merges per-document tallies into a store and builds the
//! ranked frequency report.

pub mod aggregator;
pub mod report;
pub mod sqlite;
pub mod store;

pub use freq_core as core;
