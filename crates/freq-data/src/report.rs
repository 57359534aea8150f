//! Ranked frequency report.
//!
//! Reads the total and the top-N character records from a store, joins each
//! with its transliteration and computes each character's share of the
//! total.

use std::fmt::Write as _;

use chrono::Utc;
use freq_core::formatting::{format_percent, pad_display, share};
use freq_core::transliteration::TransliterationTable;
use freq_core::{CodePoint, FreqError, Result};
use serde::Serialize;
use tracing::warn;

use crate::store::FrequencyStore;

/// Column width of the transliteration field in the text rendering.
const READING_WIDTH: usize = 5;

// ── Public types ──────────────────────────────────────────────────────────────

/// What to do with a ranked character the table has no reading for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MissingPolicy {
    /// Leave it out of the ranking, warn, and list it in [`RankedReport::missing`].
    #[default]
    Skip,
    /// Fail the report with [`FreqError::MissingTransliteration`].
    Abort,
}

/// One row of the ranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedEntry {
    pub code_point: CodePoint,
    pub count: u64,
    pub transliteration: String,
    /// `100 * count / total`.
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedReport {
    /// Number of distinct characters in the store.
    pub distinct: u64,
    /// The aggregate total.
    pub total: u64,
    /// The `n` the report was asked for.
    pub requested: usize,
    pub entries: Vec<RankedEntry>,
    /// Sum of the counts of `entries`.
    pub shown_count: u64,
    /// `shown_count` as a share of `total`.
    pub shown_percent: f64,
    /// Ranked characters left out for lack of a transliteration.
    pub missing: Vec<CodePoint>,
    pub generated_at: String,
}

/// Outcome of [`generate_report`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Report {
    /// Nothing has been collected yet.
    NoStatistics,
    Ranked(RankedReport),
}

// ── Public function ───────────────────────────────────────────────────────────

/// Build the top-`n` report.
///
/// 1. Read the total; absent means [`Report::NoStatistics`].
/// 2. Read the distinct count and the `n` highest records.
/// 3. Join each record with `table` according to `policy`.
///
/// A positive total with no character records at all is reported as
/// [`FreqError::Inconsistent`].
pub fn generate_report<S: FrequencyStore + ?Sized>(
    store: &S,
    table: &TransliterationTable,
    n: usize,
    policy: MissingPolicy,
) -> Result<Report> {
    let Some(total) = store.total()? else {
        return Ok(Report::NoStatistics);
    };

    let distinct = store.distinct()?;
    let records = store.top(n)?;

    if total > 0 && distinct == 0 {
        return Err(FreqError::Inconsistent(format!(
            "total is {total} but no character records exist"
        )));
    }

    let mut entries = Vec::with_capacity(records.len());
    let mut missing = Vec::new();
    for record in records {
        let transliteration = match table.lookup(record.code_point) {
            Ok(reading) => reading.to_string(),
            Err(err @ FreqError::MissingTransliteration(_)) if policy == MissingPolicy::Abort => {
                return Err(err);
            }
            Err(FreqError::MissingTransliteration(cp)) => {
                warn!(code_point = %cp, count = record.count, "no transliteration; skipping");
                missing.push(cp);
                continue;
            }
            Err(other) => return Err(other),
        };
        entries.push(RankedEntry {
            code_point: record.code_point,
            count: record.count,
            transliteration,
            percent: share(record.count, total),
        });
    }

    let shown_count: u64 = entries.iter().map(|e| e.count).sum();

    Ok(Report::Ranked(RankedReport {
        distinct,
        total,
        requested: n,
        entries,
        shown_count,
        shown_percent: share(shown_count, total),
        missing,
        generated_at: Utc::now().to_rfc3339(),
    }))
}

// ── Rendering ─────────────────────────────────────────────────────────────────

impl Report {
    /// Human-readable rendering, one line per ranked character.
    pub fn render(&self) -> String {
        match self {
            Report::NoStatistics => "No statistics found in the database.\n".to_string(),
            Report::Ranked(report) => report.render(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl RankedReport {
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{} distinct characters collected so far.", self.distinct);
        let _ = writeln!(out, "The {} most frequent ones are:", self.requested);

        for entry in &self.entries {
            let glyph = entry.code_point.as_char().unwrap_or(char::REPLACEMENT_CHARACTER);
            let _ = writeln!(
                out,
                "{} ({}: {}): {} ({})",
                glyph,
                entry.code_point,
                pad_display(&entry.transliteration, READING_WIDTH),
                entry.count,
                format_percent(entry.percent)
            );
        }

        if !self.missing.is_empty() {
            let list: Vec<String> = self.missing.iter().map(|cp| cp.to_string()).collect();
            let _ = writeln!(out, "Skipped without transliteration: {}", list.join(", "));
        }

        let _ = writeln!(out, "------------");
        let _ = writeln!(
            out,
            "Total occurrences: {}/{} ({})",
            self.shown_count,
            self.total,
            format_percent(self.shown_percent)
        );
        out
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
