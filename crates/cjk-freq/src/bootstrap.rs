use std::path::Path;

use anyhow::Context;
use freq_core::transliteration::TransliterationTable;
use freq_data::report::{generate_report, MissingPolicy, Report};
use freq_data::sqlite::SqliteStore;
use freq_data::store::FrequencyStore;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// ── Logging bootstrap ──────────────────────────────────────────────────────────

/// Initialise the global `tracing` subscriber, writing to stderr so report
/// output on stdout stays clean.
///
/// `log_level` takes the CLI level names; `RUST_LOG`, when set, wins.
pub fn setup_logging(log_level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(normalise_level(log_level)))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false);

    tracing_subscriber::registry().with(filter).with(layer).try_init()?;

    Ok(())
}

/// Map CLI level names to tracing directives (tracing uses lowercase).
fn normalise_level(log_level: &str) -> &'static str {
    match log_level.to_uppercase().as_str() {
        "DEBUG" => "debug",
        "INFO" => "info",
        "WARNING" | "WARN" => "warn",
        "ERROR" | "CRITICAL" => "error",
        _ => "warn",
    }
}

// ── Resource bootstrap ─────────────────────────────────────────────────────────

/// Open the statistics database, creating it and its directory if needed.
pub fn open_store(path: &Path) -> anyhow::Result<SqliteStore> {
    SqliteStore::open(path).with_context(|| format!("cannot open database {}", path.display()))
}

/// Load the transliteration table, pointing at the expected file format when
/// it cannot be read.
pub fn load_table(path: &Path) -> anyhow::Result<TransliterationTable> {
    let table = TransliterationTable::load(path).with_context(|| {
        format!(
            "cannot load transliteration table {} (expected lines like `U+4E00 kMandarin yi`; \
             set --table or CJK_FREQ_TABLE)",
            path.display()
        )
    })?;
    tracing::debug!(entries = table.len(), "transliteration table ready");
    Ok(table)
}

/// Build the top-`n` report, loading the table only once the store holds a
/// total. An empty store reports `NoStatistics` even without a table file.
pub fn top_report<S: FrequencyStore + ?Sized>(
    store: &S,
    table_path: &Path,
    n: usize,
    policy: MissingPolicy,
) -> anyhow::Result<Report> {
    if store.total()?.is_none() {
        return Ok(Report::NoStatistics);
    }
    let table = load_table(table_path)?;
    Ok(generate_report(store, &table, n, policy)?)
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use freq_core::CodePoint;
    use freq_data::aggregator::FrequencyAggregator;
    use tempfile::TempDir;

    #[test]
    fn test_normalise_level() {
        assert_eq!(normalise_level("DEBUG"), "debug");
        assert_eq!(normalise_level("info"), "info");
        assert_eq!(normalise_level("WARNING"), "warn");
        assert_eq!(normalise_level("CRITICAL"), "error");
        assert_eq!(normalise_level("verbose"), "warn");
    }

    #[test]
    fn test_open_store_creates_database() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp.path().join(".cjk-freq").join("stats.db");
        let store = open_store(&path).expect("open store");
        assert!(path.exists());
        assert_eq!(store.total().unwrap(), None);
    }

    #[test]
    fn test_load_table_reports_path() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp.path().join("pinyin.txt");
        let err = load_table(&path).unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("pinyin.txt"));
        assert!(msg.contains("Failed to read file"));
    }

    #[test]
    fn test_load_table() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp.path().join("pinyin.txt");
        std::fs::write(&path, "U+4E01 kMandarin dīng\n").unwrap();
        let table = load_table(&path).expect("table");
        assert_eq!(table.lookup(CodePoint(0x4E01)).unwrap(), "dīng");
    }

    #[test]
    fn test_top_report_without_table_after_clear() {
        let tmp = TempDir::new().expect("tempdir");
        let store = open_store(&tmp.path().join("stats.db")).expect("open store");
        let counts = BTreeMap::from([(CodePoint(0x4E01), 3)]);
        FrequencyAggregator::merge(&store, &counts).unwrap();
        FrequencyAggregator::clear(&store).unwrap();

        let missing_table = tmp.path().join("none.txt");
        let report = top_report(&store, &missing_table, 10, MissingPolicy::Skip).expect("report");
        assert_eq!(report, Report::NoStatistics);
    }

    #[test]
    fn test_top_report_needs_table_once_populated() {
        let tmp = TempDir::new().expect("tempdir");
        let store = open_store(&tmp.path().join("stats.db")).expect("open store");
        let counts = BTreeMap::from([(CodePoint(0x4E01), 3)]);
        FrequencyAggregator::merge(&store, &counts).unwrap();

        let missing_table = tmp.path().join("none.txt");
        let err = top_report(&store, &missing_table, 10, MissingPolicy::Skip).unwrap_err();
        assert!(format!("{err:#}").contains("none.txt"));

        let table_path = tmp.path().join("pinyin.txt");
        std::fs::write(&table_path, "U+4E01 kMandarin dīng\n").unwrap();
        let report = top_report(&store, &table_path, 10, MissingPolicy::Skip).expect("report");
        match report {
            Report::Ranked(ranked) => {
                assert_eq!(ranked.total, 3);
                assert_eq!(ranked.entries[0].transliteration, "dīng");
            }
            Report::NoStatistics => panic!("expected a ranking"),
        }
    }
}
