use clap::{CommandFactory, FromArgMatches, Parser};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the per-user data directory under `$HOME`.
pub const DATA_DIR_NAME: &str = ".cjk-freq";

/// Default number of characters shown by the ranking.
pub const DEFAULT_TOP_N: usize = 10;

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Count CJK character frequencies across web pages
#[derive(Parser, Debug, Clone)]
#[command(
    name = "cjk-freq",
    about = "Count CJK character frequencies across web pages",
    long_about = "Scrapes the given URLs for CJK characters, counts their \
                  frequencies and stores them in a database. If URLs are \
                  omitted, the most frequent characters collected so far are shown.",
    version
)]
pub struct Settings {
    /// The URLs of the documents to scrape
    #[arg(value_name = "URL")]
    pub urls: Vec<String>,

    /// Encoding of the web pages to scrape (default: guessed)
    #[arg(short, long)]
    pub encoding: Option<String>,

    /// Max number of characters to print out; use with no other argument
    #[arg(
        short = 'n',
        long,
        default_value_t = DEFAULT_TOP_N,
        conflicts_with_all = ["urls", "clear_stats"]
    )]
    pub numwords: usize,

    /// Clear all statistics gathered so far; use with no other argument
    #[arg(long, conflicts_with = "urls")]
    pub clear_stats: bool,

    /// Transliteration table (`U+XXXX <field> <pinyin>` per line)
    #[arg(long, env = "CJK_FREQ_TABLE")]
    pub table: Option<PathBuf>,

    /// SQLite database holding the statistics
    #[arg(long, env = "CJK_FREQ_DB")]
    pub db: Option<PathBuf>,

    /// Documents fetched concurrently (1-64)
    #[arg(long, default_value = "4", value_parser = clap::value_parser!(u32).range(1..=64))]
    pub jobs: u32,

    /// Per-request timeout in seconds
    #[arg(long, default_value = "30")]
    pub timeout: u64,

    /// Abort the report when a character has no known transliteration
    #[arg(long)]
    pub strict: bool,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,

    /// Logging level
    #[arg(long, default_value = "WARNING", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"])]
    pub log_level: String,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

/// The single operation selected by one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Scrape the listed URLs and merge their counts.
    Ingest(Vec<String>),
    /// Show the `n` most frequent characters.
    Top(usize),
    /// Delete every statistic.
    Clear,
}

// ── LastUsedParams ─────────────────────────────────────────────────────────────

/// Persisted last-used parameters saved to `~/.cjk-freq/last_used.json`.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct LastUsedParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jobs: Option<u32>,
}

impl LastUsedParams {
    /// Return the default path to the persisted config file.
    pub fn config_path() -> PathBuf {
        Self::config_path_in(&home_dir())
    }

    /// Return the config path rooted at `base_dir` (used for testing).
    pub fn config_path_in(base_dir: &Path) -> PathBuf {
        base_dir.join(DATA_DIR_NAME).join("last_used.json")
    }

    /// Load persisted params from an explicit path.
    /// Returns `Default` when the file is absent or cannot be parsed.
    pub fn load_from(path: &Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        serde_json::from_str(&content).unwrap_or_default()
    }

    /// Atomically write params to an explicit path.
    pub fn save_to(&self, path: &Path) -> Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;

        // Write to a temp file then rename for atomicity.
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, path)?;

        Ok(())
    }
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse the process arguments, merging last-used params. Exits with a
    /// usage message on invalid arguments.
    pub fn load_with_last_used() -> Self {
        Self::try_load_with_last_used(std::env::args_os().collect(), &LastUsedParams::config_path())
            .unwrap_or_else(|e| e.exit())
    }

    /// Parse `args`, fill unset `--table`, `--db` and `--jobs` from the
    /// params stored at `config_path`, and persist the result.
    pub fn try_load_with_last_used(
        args: Vec<std::ffi::OsString>,
        config_path: &Path,
    ) -> Result<Self, clap::Error> {
        let matches = Settings::command().try_get_matches_from(args)?;
        Self::from_matches_with_last_used(&matches, config_path)
    }

    /// Values from the command line or the environment win over the stored
    /// ones for this run. Only command-line values are written back, so a
    /// one-off `CJK_FREQ_DB` is not remembered.
    fn from_matches_with_last_used(
        matches: &clap::ArgMatches,
        config_path: &Path,
    ) -> Result<Self, clap::Error> {
        let mut settings = Settings::from_arg_matches(matches)?;

        let last = LastUsedParams::load_from(config_path);
        let mut remembered = last.clone();

        if !is_arg_explicitly_set(matches, "table") && last.table.is_some() {
            settings.table = last.table.clone();
        }
        if !is_arg_explicitly_set(matches, "db") && last.db.is_some() {
            settings.db = last.db.clone();
        }
        if !is_arg_explicitly_set(matches, "jobs") {
            if let Some(v) = last.jobs {
                settings.jobs = v;
            }
        }

        if is_arg_on_command_line(matches, "table") {
            remembered.table = settings.table.clone();
        }
        if is_arg_on_command_line(matches, "db") {
            remembered.db = settings.db.clone();
        }
        if is_arg_on_command_line(matches, "jobs") {
            remembered.jobs = Some(settings.jobs);
        }

        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }

        if remembered != last {
            if let Err(e) = remembered.save_to(config_path) {
                tracing::debug!(error = %e, "could not persist last-used params");
            }
        }

        Ok(settings)
    }

    /// The operation requested by this invocation.
    pub fn operation(&self) -> Operation {
        if self.clear_stats {
            Operation::Clear
        } else if self.urls.is_empty() {
            Operation::Top(self.numwords)
        } else {
            Operation::Ingest(self.urls.clone())
        }
    }

    /// Transliteration table path, defaulting to `~/.cjk-freq/pinyin.txt`.
    pub fn table_path(&self) -> PathBuf {
        self.table
            .clone()
            .unwrap_or_else(|| data_dir().join("pinyin.txt"))
    }

    /// Database path, defaulting to `~/.cjk-freq/stats.db`.
    pub fn db_path(&self) -> PathBuf {
        self.db
            .clone()
            .unwrap_or_else(|| data_dir().join("stats.db"))
    }
}

// ── Helpers ────────────────────────────────────────────────────────────────────

/// `~/.cjk-freq`, or `./.cjk-freq` when no home directory is known.
pub fn data_dir() -> PathBuf {
    home_dir().join(DATA_DIR_NAME)
}

fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

/// Returns `true` when `name` was supplied on the command line or through its
/// environment variable (not via a default value).
fn is_arg_explicitly_set(matches: &clap::ArgMatches, name: &str) -> bool {
    matches!(
        matches.value_source(name),
        Some(clap::parser::ValueSource::CommandLine | clap::parser::ValueSource::EnvVariable)
    )
}

fn is_arg_on_command_line(matches: &clap::ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(clap::parser::ValueSource::CommandLine)
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;
    use tempfile::TempDir;

    fn args(list: &[&str]) -> Vec<OsString> {
        std::iter::once("cjk-freq")
            .chain(list.iter().copied())
            .map(OsString::from)
            .collect()
    }

    fn load(tmp: &TempDir, list: &[&str]) -> Result<Settings, clap::Error> {
        Settings::try_load_with_last_used(args(list), &LastUsedParams::config_path_in(tmp.path()))
    }

    #[test]
    fn test_no_arguments_shows_top_ten() {
        let tmp = TempDir::new().expect("tempdir");
        let s = load(&tmp, &[]).unwrap();
        assert_eq!(s.operation(), Operation::Top(10));
    }

    #[test]
    fn test_numwords() {
        let tmp = TempDir::new().expect("tempdir");
        let s = load(&tmp, &["-n", "25"]).unwrap();
        assert_eq!(s.operation(), Operation::Top(25));
    }

    #[test]
    fn test_urls_select_ingest() {
        let tmp = TempDir::new().expect("tempdir");
        let s = load(&tmp, &["-e", "gbk", "http://a.example", "http://b.example"]).unwrap();
        assert_eq!(
            s.operation(),
            Operation::Ingest(vec![
                "http://a.example".to_string(),
                "http://b.example".to_string()
            ])
        );
        assert_eq!(s.encoding.as_deref(), Some("gbk"));
    }

    #[test]
    fn test_clear_stats() {
        let tmp = TempDir::new().expect("tempdir");
        let s = load(&tmp, &["--clear-stats"]).unwrap();
        assert_eq!(s.operation(), Operation::Clear);
    }

    #[test]
    fn test_clear_with_urls_is_usage_error() {
        let tmp = TempDir::new().expect("tempdir");
        let err = load(&tmp, &["--clear-stats", "http://a.example"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn test_numwords_with_urls_is_usage_error() {
        let tmp = TempDir::new().expect("tempdir");
        let err = load(&tmp, &["-n", "5", "http://a.example"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn test_numwords_with_clear_is_usage_error() {
        let tmp = TempDir::new().expect("tempdir");
        assert!(load(&tmp, &["-n", "5", "--clear-stats"]).is_err());
    }

    #[test]
    fn test_jobs_range_enforced() {
        let tmp = TempDir::new().expect("tempdir");
        assert!(load(&tmp, &["--jobs", "0"]).is_err());
        assert!(load(&tmp, &["--jobs", "65"]).is_err());
    }

    #[test]
    fn test_debug_overrides_log_level() {
        let tmp = TempDir::new().expect("tempdir");
        let s = load(&tmp, &["--debug"]).unwrap();
        assert_eq!(s.log_level, "DEBUG");
    }

    #[test]
    fn test_last_used_paths_are_remembered() {
        let tmp = TempDir::new().expect("tempdir");
        load(&tmp, &["--db", "/tmp/x.db", "--table", "/tmp/p.txt", "--jobs", "8"]).unwrap();

        let s = load(&tmp, &[]).unwrap();
        assert_eq!(s.db_path(), PathBuf::from("/tmp/x.db"));
        assert_eq!(s.table_path(), PathBuf::from("/tmp/p.txt"));
        assert_eq!(s.jobs, 8);
    }

    #[test]
    fn test_cli_wins_over_last_used() {
        let tmp = TempDir::new().expect("tempdir");
        load(&tmp, &["--db", "/tmp/old.db", "--jobs", "8"]).unwrap();

        let s = load(&tmp, &["--db", "/tmp/new.db", "--jobs", "2"]).unwrap();
        assert_eq!(s.db_path(), PathBuf::from("/tmp/new.db"));
        assert_eq!(s.jobs, 2);
    }

    #[test]
    fn test_last_used_params_save_load() {
        let tmp = TempDir::new().expect("tempdir");
        let path = LastUsedParams::config_path_in(tmp.path());
        let params = LastUsedParams {
            table: Some(PathBuf::from("/data/pinyin.txt")),
            db: None,
            jobs: Some(3),
        };
        params.save_to(&path).expect("save");
        assert_eq!(LastUsedParams::load_from(&path), params);
    }

    #[test]
    fn test_last_used_params_corrupt_file_gives_default() {
        let tmp = TempDir::new().expect("tempdir");
        let path = LastUsedParams::config_path_in(tmp.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "not json").unwrap();
        assert_eq!(LastUsedParams::load_from(&path), LastUsedParams::default());
    }

    #[test]
    fn test_default_paths_live_in_data_dir() {
        let tmp = TempDir::new().expect("tempdir");
        let mut s = load(&tmp, &[]).unwrap();
        s.db = None;
        s.table = None;
        assert!(s.db_path().ends_with(".cjk-freq/stats.db"));
        assert!(s.table_path().ends_with(".cjk-freq/pinyin.txt"));
    }

    #[test]
    fn test_env_paths_apply_but_are_not_remembered() {
        // Rebind --db to a variable no other test touches.
        const VAR: &str = "CJK_FREQ_TEST_ONE_OFF_DB";
        let tmp = TempDir::new().expect("tempdir");
        let config = LastUsedParams::config_path_in(tmp.path());
        load(&tmp, &["--db", "/tmp/kept.db"]).unwrap();

        std::env::set_var(VAR, "/tmp/one-off.db");
        let matches = Settings::command()
            .mut_arg("db", |a| a.env(VAR))
            .try_get_matches_from(args(&["--jobs", "6"]))
            .unwrap();
        std::env::remove_var(VAR);

        let s = Settings::from_matches_with_last_used(&matches, &config).unwrap();
        assert_eq!(s.db_path(), PathBuf::from("/tmp/one-off.db"));

        let stored = LastUsedParams::load_from(&config);
        assert_eq!(stored.db, Some(PathBuf::from("/tmp/kept.db")));
        assert_eq!(stored.jobs, Some(6));

        let s = load(&tmp, &[]).unwrap();
        assert_eq!(s.db_path(), PathBuf::from("/tmp/kept.db"));
    }
}
