use unicode_width::UnicodeWidthStr;

/// `part` as a percentage of `whole`, unrounded.
///
/// Returns `0.0` if `whole` is zero to avoid division by zero.
///
/// # Examples
///
/// ```
/// use freq_core::formatting::share;
///
/// assert!((share(7, 10) - 70.0).abs() < 1e-9);
/// assert_eq!(share(3, 0), 0.0);
/// ```
pub fn share(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    part as f64 * 100.0 / whole as f64
}

/// Format a percentage with two decimals and a trailing `%`.
///
/// ```
/// use freq_core::formatting::format_percent;
///
/// assert_eq!(format_percent(70.0), "70.00%");
/// assert_eq!(format_percent(33.3333), "33.33%");
/// ```
pub fn format_percent(value: f64) -> String {
    format!("{:.2}%", value)
}

/// Left-align `s` in a field `width` terminal columns wide.
///
/// Width is measured in display columns, so tone-marked Pinyin and
/// full-width characters line up. Strings already wider than `width` are
/// returned unchanged.
pub fn pad_display(s: &str, width: usize) -> String {
    let used = UnicodeWidthStr::width(s);
    if used >= width {
        return s.to_string();
    }
    let mut padded = String::with_capacity(s.len() + width - used);
    padded.push_str(s);
    padded.extend(std::iter::repeat(' ').take(width - used));
    padded
}

// ── Tests ──────────────────────────────────────────────────────────────────────
