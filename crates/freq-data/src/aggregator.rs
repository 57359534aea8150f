//! Merging per-document tallies into a frequency store.

use std::collections::BTreeMap;

use freq_core::classify::Tally;
use freq_core::{CodePoint, Result, StoreKey};
use serde::Serialize;
use tracing::debug;

use crate::store::FrequencyStore;

// ── MergeOutcome ──────────────────────────────────────────────────────────────

/// What one merge added to the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MergeOutcome {
    /// Characters whose counter was incremented.
    pub distinct: usize,
    /// Sum of all increments, also added to the total.
    pub added: u64,
}

// ── FrequencyAggregator ───────────────────────────────────────────────────────

/// Stateless helper that turns observations into store increments.
pub struct FrequencyAggregator;

impl FrequencyAggregator {
    /// Merge one batch of observations into `store`.
    ///
    /// Every per-character increment and the matching increase of the total
    /// are submitted as a single store batch, so they land together or not at
    /// all. Merging the same observations twice counts them twice.
    pub fn merge<S: FrequencyStore + ?Sized>(
        store: &S,
        observations: &BTreeMap<CodePoint, u64>,
    ) -> Result<MergeOutcome> {
        let mut batch: Vec<(StoreKey, u64)> = observations
            .iter()
            .filter(|&(_, &n)| n > 0)
            .map(|(&cp, &n)| (StoreKey::Char(cp), n))
            .collect();

        let outcome = MergeOutcome {
            distinct: batch.len(),
            added: batch.iter().map(|&(_, n)| n).sum(),
        };
        // The total is written even for an empty batch, so a scraped page
        // without ideographs still registers as collected statistics.
        batch.push((StoreKey::Total, outcome.added));

        store.increment_batch(&batch)?;
        debug!(
            distinct = outcome.distinct,
            added = outcome.added,
            "batch merged"
        );
        Ok(outcome)
    }

    /// Merge a document tally.
    pub fn merge_tally<S: FrequencyStore + ?Sized>(store: &S, tally: &Tally) -> Result<MergeOutcome> {
        Self::merge(store, &tally.counts)
    }

    /// Delete all frequency records and the total.
    ///
    /// Not coordinated with concurrent merges: a merge racing a clear may be
    /// dropped or survive.
    pub fn clear<S: FrequencyStore + ?Sized>(store: &S) -> Result<()> {
        store.clear()?;
        debug!("statistics cleared");
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
