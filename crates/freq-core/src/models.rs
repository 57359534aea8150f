//! Data types shared by the classifier, the store and the report.

use std::fmt;

use serde::{Deserialize, Serialize};

// ── CodePoint ─────────────────────────────────────────────────────────────────

/// A Unicode scalar value used as the join key between the transliteration
/// table and the frequency store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CodePoint(pub u32);

impl CodePoint {
    pub fn value(self) -> u32 {
        self.0
    }

    /// The character for this code point, if it is a valid scalar value.
    pub fn as_char(self) -> Option<char> {
        char::from_u32(self.0)
    }
}

impl From<char> for CodePoint {
    fn from(c: char) -> Self {
        CodePoint(u32::from(c))
    }
}

impl fmt::Display for CodePoint {
    /// `U+XXXX`, uppercase, at least four hex digits.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "U+{:04X}", self.0)
    }
}

// ── StoreKey ──────────────────────────────────────────────────────────────────

/// Key of a counter in the frequency store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKey {
    /// Per-character occurrence counter.
    Char(CodePoint),
    /// The single running total of every occurrence ever merged.
    Total,
}

// ── FrequencyRecord ───────────────────────────────────────────────────────────

/// A persisted `(code point, count)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrequencyRecord {
    pub code_point: CodePoint,
    pub count: u64,
}

impl FrequencyRecord {
    pub fn new(code_point: CodePoint, count: u64) -> Self {
        Self { code_point, count }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_point_display_pads_to_four_digits() {
        assert_eq!(CodePoint(0x3899).to_string(), "U+3899");
        assert_eq!(CodePoint(0x41).to_string(), "U+0041");
        assert_eq!(CodePoint(0x2A6DF).to_string(), "U+2A6DF");
    }

    #[test]
    fn test_code_point_from_char() {
        assert_eq!(CodePoint::from('丁'), CodePoint(0x4E01));
        assert_eq!(CodePoint(0x4E01).as_char(), Some('丁'));
    }

    #[test]
    fn test_code_point_invalid_scalar() {
        assert_eq!(CodePoint(0xD800).as_char(), None);
    }

    #[test]
    fn test_code_point_serializes_as_number() {
        let json = serde_json::to_string(&FrequencyRecord::new(CodePoint(0x4E01), 5)).unwrap();
        assert_eq!(json, r#"{"code_point":19969,"count":5}"#);
    }

    #[test]
    fn test_code_point_ordering() {
        assert!(CodePoint(0x3899) < CodePoint(0x4E01));
    }
}
