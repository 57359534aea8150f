//! SQLite-backed frequency store.
//!
//! Increments are native upserts (`count = count + excluded.count`) executed
//! inside one immediate transaction per batch, so concurrent writers, whether
//! threads of this process or other processes sharing the file, never lose
//! updates.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use freq_core::{CodePoint, FreqError, FrequencyRecord, Result, StoreKey};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use tracing::debug;

use crate::store::FrequencyStore;

// SQLite turns an overflowing `count + excluded.count` into a REAL; the
// typeof checks make that a constraint failure instead.

/// How long a writer waits for another process's lock before failing with
/// `SQLITE_BUSY`.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS char_frequency (
        code_point INTEGER PRIMARY KEY,
        count      INTEGER NOT NULL CHECK (typeof(count) = 'integer' AND count >= 0)
    );
    CREATE TABLE IF NOT EXISTS meta_total (
        id    INTEGER PRIMARY KEY CHECK (id = 1),
        count INTEGER NOT NULL CHECK (typeof(count) = 'integer' AND count >= 0)
    );
";

const UPSERT_CHAR: &str = "
    INSERT INTO char_frequency (code_point, count) VALUES (?1, ?2)
    ON CONFLICT(code_point) DO UPDATE SET count = count + excluded.count
";

const UPSERT_TOTAL: &str = "
    INSERT INTO meta_total (id, count) VALUES (1, ?1)
    ON CONFLICT(id) DO UPDATE SET count = count + excluded.count
";

/// Frequency store persisted in a SQLite database file.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        debug!(path = %path.display(), "opening sqlite store");
        Self::init(Connection::open(path).map_err(FreqError::storage)?)
    }

    /// A private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory().map_err(FreqError::storage)?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.busy_timeout(BUSY_TIMEOUT).map_err(FreqError::storage)?;
        conn.execute_batch(SCHEMA).map_err(FreqError::storage)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| FreqError::storage("sqlite connection lock poisoned"))
    }
}

impl FrequencyStore for SqliteStore {
    fn increment_batch(&self, increments: &[(StoreKey, u64)]) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(FreqError::storage)?;
        {
            let mut upsert_char = tx.prepare_cached(UPSERT_CHAR).map_err(FreqError::storage)?;
            let mut upsert_total = tx.prepare_cached(UPSERT_TOTAL).map_err(FreqError::storage)?;
            for &(key, by) in increments {
                let by = to_sql_count(by)?;
                let applied = match key {
                    StoreKey::Char(cp) => upsert_char.execute(params![cp.value(), by]),
                    StoreKey::Total => upsert_total.execute(params![by]),
                };
                applied.map_err(FreqError::storage)?;
            }
        }
        // Dropping an uncommitted transaction rolls it back, so an early
        // return above leaves the store untouched.
        tx.commit().map_err(FreqError::storage)
    }

    fn get(&self, key: StoreKey) -> Result<Option<u64>> {
        let conn = self.conn()?;
        let count: Option<i64> = match key {
            StoreKey::Char(cp) => conn.query_row(
                "SELECT count FROM char_frequency WHERE code_point = ?1",
                params![cp.value()],
                |row| row.get(0),
            ),
            StoreKey::Total => {
                conn.query_row("SELECT count FROM meta_total WHERE id = 1", [], |row| row.get(0))
            }
        }
        .optional()
        .map_err(FreqError::storage)?;
        count.map(from_sql_count).transpose()
    }

    fn top(&self, limit: usize) -> Result<Vec<FrequencyRecord>> {
        let conn = self.conn()?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut stmt = conn
            .prepare_cached(
                "SELECT code_point, count FROM char_frequency \
                 ORDER BY count DESC, code_point ASC LIMIT ?1",
            )
            .map_err(FreqError::storage)?;
        let rows = stmt
            .query_map(params![limit], |row| {
                Ok((row.get::<_, u32>(0)?, row.get::<_, i64>(1)?))
            })
            .map_err(FreqError::storage)?;

        let mut records = Vec::new();
        for row in rows {
            let (code_point, count) = row.map_err(FreqError::storage)?;
            records.push(FrequencyRecord::new(CodePoint(code_point), from_sql_count(count)?));
        }
        Ok(records)
    }

    fn distinct(&self) -> Result<u64> {
        let conn = self.conn()?;
        let n: i64 = conn
            .query_row("SELECT COUNT(*) FROM char_frequency", [], |row| row.get(0))
            .map_err(FreqError::storage)?;
        from_sql_count(n)
    }

    fn clear(&self) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(FreqError::storage)?;
        tx.execute_batch("DELETE FROM char_frequency; DELETE FROM meta_total;")
            .map_err(FreqError::storage)?;
        tx.commit().map_err(FreqError::storage)
    }
}

// ── Private helpers ───────────────────────────────────────────────────────────

fn to_sql_count(count: u64) -> Result<i64> {
    i64::try_from(count).map_err(|_| FreqError::storage(format!("count {count} exceeds SQLite range")))
}

fn from_sql_count(count: i64) -> Result<u64> {
    u64::try_from(count).map_err(|_| FreqError::Inconsistent(format!("negative count {count} in store")))
}
