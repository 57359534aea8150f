//! Pinyin transliteration table.
//!
//! The table is read from a cleaned-up Unihan extract holding one reading per
//! code point, e.g. the `kMandarin` field only:
//!
//! ```text
//! U+4E00	kMandarin	yī
//! U+4E01	kMandarin	dīng
//! ```
//!
//! It is built once at startup and handed by reference to whatever needs
//! lookups.

use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;

use regex::Regex;
use tracing::debug;

use crate::error::{FreqError, Result};
use crate::models::CodePoint;

/// Read-only map from code point to phonetic rendering.
#[derive(Debug, Clone, Default)]
pub struct TransliterationTable {
    entries: HashMap<CodePoint, String>,
}

impl TransliterationTable {
    /// Load the table from a file on disk.
    pub fn load(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(|source| FreqError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let table = Self::from_reader(std::io::BufReader::new(file)).map_err(|e| match e {
            FreqError::Io(source) => FreqError::FileRead {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })?;
        debug!(
            entries = table.len(),
            path = %path.display(),
            "transliteration table loaded"
        );
        Ok(table)
    }

    /// Parse the table from any line-oriented reader.
    ///
    /// The first malformed line aborts the load; no partial table is returned.
    pub fn from_reader(reader: impl BufRead) -> Result<Self> {
        let code_re = code_token_regex();
        let mut entries = HashMap::new();

        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let (code_point, reading) = parse_line(&code_re, idx + 1, &line)?;
            if let Some(previous) = entries.insert(code_point, reading) {
                debug!(%code_point, %previous, "duplicate table entry; keeping the later one");
            }
        }

        Ok(Self { entries })
    }

    /// Parse the table from an in-memory string.
    pub fn parse(source: &str) -> Result<Self> {
        Self::from_reader(source.as_bytes())
    }

    /// Transliteration of `code_point`.
    ///
    /// Returns [`FreqError::MissingTransliteration`] when the table has no entry.
    pub fn lookup(&self, code_point: CodePoint) -> Result<&str> {
        self.entries
            .get(&code_point)
            .map(String::as_str)
            .ok_or(FreqError::MissingTransliteration(code_point))
    }

    pub fn contains(&self, code_point: CodePoint) -> bool {
        self.entries.contains_key(&code_point)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ── Private helpers ───────────────────────────────────────────────────────────

fn code_token_regex() -> Regex {
    Regex::new(r"^U\+([0-9a-fA-F]+)$").expect("regex is valid")
}

/// Split one `U+XXXX <ignored> <reading>` line.
fn parse_line(code_re: &Regex, line_no: usize, line: &str) -> Result<(CodePoint, String)> {
    let malformed = |reason: String| FreqError::MalformedTableLine {
        line: line_no,
        content: line.to_string(),
        reason,
    };

    let fields: Vec<&str> = line.split_whitespace().collect();
    let [code, _, reading] = fields.as_slice() else {
        return Err(malformed(format!(
            "expected 3 fields, found {}",
            fields.len()
        )));
    };

    let hex = code_re
        .captures(code)
        .and_then(|caps| caps.get(1))
        .ok_or_else(|| malformed(format!("{code:?} is not a U+<hex> code")))?;
    let value = u32::from_str_radix(hex.as_str(), 16)
        .map_err(|e| malformed(format!("bad hex {:?}: {e}", hex.as_str())))?;

    Ok((CodePoint(value), (*reading).to_string()))
}
