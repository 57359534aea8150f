//! Code-point classification and per-document tallying.
//!
//! Recognised ideograph blocks:
//!
//! | Block                                   | Range       | Recognised |
//! |-----------------------------------------|-------------|------------|
//! | CJK Unified Ideographs Extension A      | 3400-4DBF   | yes        |
//! | CJK Unified Ideographs                  | 4E00-9FFF   | yes        |
//! | CJK Compatibility Ideographs            | F900-FAFF   | yes        |
//! | CJK Unified Ideographs Extension B      | 20000-2A6DF | no         |
//! | CJK Compatibility Ideographs Supplement | 2F800-2FA1F | no         |
//!
//! Only the Basic Multilingual Plane is considered. The gap between
//! Extension A and the unified block (4DC0-4DFF, Yijing hexagrams) is
//! accepted along with the rest of `3400..=9FFF`.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::models::CodePoint;

const CJK_RANGES: [(u32, u32); 2] = [(0x3400, 0x9FFF), (0xF900, 0xFAFF)];

/// `true` when `code_point` lies in one of the recognised ideograph ranges.
///
/// # Examples
///
/// ```
/// use freq_core::classify::is_cjk;
///
/// assert!(is_cjk(0x4E01));
/// assert!(!is_cjk(0xA000));
/// assert!(!is_cjk(0x20000));
/// ```
pub fn is_cjk(code_point: u32) -> bool {
    CJK_RANGES
        .iter()
        .any(|&(lo, hi)| (lo..=hi).contains(&code_point))
}

pub fn is_cjk_char(c: char) -> bool {
    is_cjk(u32::from(c))
}

/// Lazily yield the CJK code points of `text`, in order of appearance.
pub fn cjk_code_points(text: &str) -> impl Iterator<Item = CodePoint> + '_ {
    text.chars().filter(|&c| is_cjk_char(c)).map(CodePoint::from)
}

// ── Tally ─────────────────────────────────────────────────────────────────────

/// Per-document character counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Tally {
    /// Occurrences of each CJK code point.
    pub counts: BTreeMap<CodePoint, u64>,
    /// Number of CJK code points seen (sum of `counts`).
    pub cjk_chars: u64,
    /// Number of code points scanned, CJK or not.
    pub all_chars: u64,
}

impl Tally {
    /// Fold `text` into a fresh tally.
    pub fn from_text(text: &str) -> Self {
        let base = Tally {
            all_chars: text.chars().count() as u64,
            ..Tally::default()
        };
        cjk_code_points(text).fold(base, |mut tally, cp| {
            *tally.counts.entry(cp).or_insert(0) += 1;
            tally.cjk_chars += 1;
            tally
        })
    }

    pub fn distinct(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}
