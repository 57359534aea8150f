//! Counter store contract and the in-memory implementation.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use freq_core::{CodePoint, FreqError, FrequencyRecord, Result, StoreKey};

// ── FrequencyStore ────────────────────────────────────────────────────────────

/// Persistent map from [`StoreKey`] to a non-negative counter.
///
/// Implementations must make [`increment_batch`](Self::increment_batch)
/// atomic: either every increment of the batch is applied or none is, and
/// concurrent batches touching the same key compose additively.
pub trait FrequencyStore: Send + Sync {
    /// Add each `(key, by)` to its counter, inserting missing counters with
    /// value `by`. All or nothing.
    fn increment_batch(&self, increments: &[(StoreKey, u64)]) -> Result<()>;

    /// Current value of one counter.
    fn get(&self, key: StoreKey) -> Result<Option<u64>>;

    /// Up to `limit` character records, highest count first. Equal counts are
    /// ordered by code point.
    fn top(&self, limit: usize) -> Result<Vec<FrequencyRecord>>;

    /// Number of character records (the total is not counted).
    fn distinct(&self) -> Result<u64>;

    /// Delete every character record and the total.
    fn clear(&self) -> Result<()>;

    /// Single-key convenience over [`increment_batch`](Self::increment_batch).
    fn increment(&self, key: StoreKey, by: u64) -> Result<()> {
        self.increment_batch(&[(key, by)])
    }

    fn total(&self) -> Result<Option<u64>> {
        self.get(StoreKey::Total)
    }

    fn count(&self, code_point: CodePoint) -> Result<Option<u64>> {
        self.get(StoreKey::Char(code_point))
    }
}

// ── MemoryStore ───────────────────────────────────────────────────────────────

/// Process-local store. The lock is held for a whole batch, which makes each
/// batch atomic with respect to every other operation.
#[derive(Debug, Default)]
pub struct MemoryStore {
    counters: Mutex<HashMap<StoreKey, u64>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<StoreKey, u64>>> {
        self.counters
            .lock()
            .map_err(|_| FreqError::storage("memory store lock poisoned"))
    }
}

impl FrequencyStore for MemoryStore {
    fn increment_batch(&self, increments: &[(StoreKey, u64)]) -> Result<()> {
        let mut counters = self.lock()?;

        // Check for overflow before touching anything so a failed batch
        // leaves no trace.
        let mut pending: HashMap<StoreKey, u64> = HashMap::new();
        for &(key, by) in increments {
            let current = pending
                .get(&key)
                .copied()
                .unwrap_or_else(|| counters.get(&key).copied().unwrap_or(0));
            let next = current
                .checked_add(by)
                .ok_or_else(|| FreqError::storage(format!("counter overflow for {key:?}")))?;
            pending.insert(key, next);
        }

        counters.extend(pending);
        Ok(())
    }

    fn get(&self, key: StoreKey) -> Result<Option<u64>> {
        Ok(self.lock()?.get(&key).copied())
    }

    fn top(&self, limit: usize) -> Result<Vec<FrequencyRecord>> {
        let counters = self.lock()?;
        let mut records: Vec<FrequencyRecord> = counters
            .iter()
            .filter_map(|(key, &count)| match key {
                StoreKey::Char(cp) => Some(FrequencyRecord::new(*cp, count)),
                StoreKey::Total => None,
            })
            .collect();
        drop(counters);

        records.sort_by(|a, b| b.count.cmp(&a.count).then(a.code_point.cmp(&b.code_point)));
        records.truncate(limit);
        Ok(records)
    }

    fn distinct(&self) -> Result<u64> {
        let counters = self.lock()?;
        Ok(counters
            .keys()
            .filter(|k| matches!(k, StoreKey::Char(_)))
            .count() as u64)
    }

    fn clear(&self) -> Result<()> {
        self.lock()?.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    const X: CodePoint = CodePoint(0x4E01);
    const Y: CodePoint = CodePoint(0x3899);

    #[test]
    fn test_increment_inserts_then_adds() {
        let store = MemoryStore::new();
        assert_eq!(store.count(X).unwrap(), None);
        store.increment(StoreKey::Char(X), 2).unwrap();
        store.increment(StoreKey::Char(X), 5).unwrap();
        assert_eq!(store.count(X).unwrap(), Some(7));
    }

    #[test]
    fn test_batch_with_repeated_key() {
        let store = MemoryStore::new();
        store
            .increment_batch(&[(StoreKey::Char(X), 1), (StoreKey::Char(X), 2)])
            .unwrap();
        assert_eq!(store.count(X).unwrap(), Some(3));
    }

    #[test]
    fn test_overflowing_batch_is_not_applied() {
        let store = MemoryStore::new();
        store.increment(StoreKey::Char(Y), u64::MAX).unwrap();
        let err = store
            .increment_batch(&[(StoreKey::Char(X), 1), (StoreKey::Char(Y), 1)])
            .unwrap_err();
        assert!(matches!(err, FreqError::Storage(_)));
        assert_eq!(store.count(X).unwrap(), None);
        assert_eq!(store.count(Y).unwrap(), Some(u64::MAX));
    }

    #[test]
    fn test_top_orders_by_count_then_code_point() {
        let store = MemoryStore::new();
        store
            .increment_batch(&[
                (StoreKey::Char(CodePoint(0x4E03)), 1),
                (StoreKey::Char(X), 4),
                (StoreKey::Char(Y), 4),
                (StoreKey::Total, 9),
            ])
            .unwrap();

        let top = store.top(10).unwrap();
        assert_eq!(
            top,
            vec![
                FrequencyRecord::new(Y, 4),
                FrequencyRecord::new(X, 4),
                FrequencyRecord::new(CodePoint(0x4E03), 1),
            ]
        );
        assert_eq!(store.top(1).unwrap().len(), 1);
        assert_eq!(store.distinct().unwrap(), 3);
    }

    #[test]
    fn test_clear_removes_everything() {
        let store = MemoryStore::new();
        store
            .increment_batch(&[(StoreKey::Char(X), 1), (StoreKey::Total, 1)])
            .unwrap();
        store.clear().unwrap();
        assert_eq!(store.total().unwrap(), None);
        assert_eq!(store.distinct().unwrap(), 0);
    }

    #[test]
    fn test_concurrent_increments_are_not_lost() {
        let store = Arc::new(MemoryStore::new());
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        store.increment(StoreKey::Char(X), 1).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(store.count(X).unwrap(), Some(1600));
    }
}
