//! Plain-text extraction from HTML.
//!
//! Markup is removed with a few regular expressions rather than a full HTML
//! parser: only the character content matters for counting, so structure,
//! attributes and broken nesting can be ignored.

use std::sync::OnceLock;

use regex::{Captures, Regex};

struct Markup {
    hidden_blocks: Regex,
    comments: Regex,
    tags: Regex,
    entities: Regex,
}

fn markup() -> &'static Markup {
    static INSTANCE: OnceLock<Markup> = OnceLock::new();
    INSTANCE.get_or_init(|| Markup {
        hidden_blocks: Regex::new(r"(?is)<(script|style|noscript)\b[^>]*>.*?</(script|style|noscript)\s*>")
            .expect("regex is valid"),
        comments: Regex::new(r"(?s)<!--.*?-->").expect("regex is valid"),
        tags: Regex::new(r"(?s)</?[A-Za-z!?][^>]*>").expect("regex is valid"),
        entities: Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[a-zA-Z]+);").expect("regex is valid"),
    })
}

/// Text content of an HTML document.
///
/// Script, style and noscript blocks and comments are dropped, every tag is
/// replaced by a space (a `<` not followed by a tag name is kept as text), and numeric plus the common named entities are
/// decoded. Input without markup passes through unchanged.
pub fn extract_text(html: &str) -> String {
    let m = markup();
    let text = m.hidden_blocks.replace_all(html, " ");
    let text = m.comments.replace_all(&text, " ");
    let text = m.tags.replace_all(&text, " ");
    m.entities
        .replace_all(&text, |caps: &Captures| decode_entity(&caps[1]).unwrap_or_else(|| caps[0].to_string()))
        .into_owned()
}

fn decode_entity(name: &str) -> Option<String> {
    if let Some(num) = name.strip_prefix('#') {
        let value = match num.strip_prefix(|c: char| c == 'x' || c == 'X') {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse::<u32>().ok()?,
        };
        return char::from_u32(value).map(String::from);
    }
    let decoded = match name {
        "amp" => "&",
        "lt" => "<",
        "gt" => ">",
        "quot" => "\"",
        "apos" => "'",
        "nbsp" => "\u{A0}",
        "ensp" => "\u{2002}",
        "emsp" => "\u{2003}",
        "middot" => "·",
        "hellip" => "…",
        "ldquo" => "“",
        "rdquo" => "”",
        _ => return None,
    };
    Some(decoded.to_string())
}
