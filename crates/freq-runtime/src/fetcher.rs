//! Document fetching.
//!
//! [`DocumentFetcher`] is the seam between ingestion and the network.
//! [`HttpFetcher`] downloads a page with `reqwest`, decodes it with
//! `encoding_rs` and strips the markup.

use std::future::Future;
use std::sync::OnceLock;
use std::time::Duration;

use encoding_rs::{Encoding, UTF_8};
use regex::bytes::Regex;
use thiserror::Error;
use tracing::{debug, warn};

use crate::text::extract_text;

/// How many leading bytes are searched for a `<meta charset>` declaration.
const META_SNIFF_LEN: usize = 2048;

/// Errors raised while obtaining a document's text.
#[derive(Error, Debug)]
pub enum FetchError {
    /// Transport-level failure: DNS, connect, TLS, timeout, body read.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// The encoding hint is not a known WHATWG label.
    #[error("Unknown encoding: {0}")]
    UnknownEncoding(String),

    /// A local (`file://`) document could not be read.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The document source is temporarily unavailable.
    #[error("Document unavailable: {0}")]
    Unavailable(String),
}

impl FetchError {
    /// `true` when repeating the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Http(e) => e.is_timeout() || e.is_connect() || e.is_body(),
            FetchError::Status { status, .. } => *status == 429 || *status >= 500,
            FetchError::Unavailable(_) => true,
            FetchError::UnknownEncoding(_) | FetchError::Io(_) => false,
        }
    }
}

// ── DocumentFetcher ───────────────────────────────────────────────────────────

/// Source of document text.
pub trait DocumentFetcher: Send + Sync + 'static {
    /// Return the plain text of the document at `url`.
    ///
    /// `encoding` is an optional label (e.g. `"gbk"`) overriding whatever the
    /// document declares.
    fn fetch(
        &self,
        url: &str,
        encoding: Option<&str>,
    ) -> impl Future<Output = Result<String, FetchError>> + Send;
}

// ── HttpFetcher ───────────────────────────────────────────────────────────────

/// Fetches `http(s)://` pages with a shared client, and `file://` paths from
/// disk.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Build a fetcher whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("cjk-freq/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

impl DocumentFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, encoding: Option<&str>) -> Result<String, FetchError> {
        if let Some(path) = url.strip_prefix("file://") {
            let bytes = tokio::fs::read(path).await?;
            let html = decode_body(&bytes, encoding, None)?;
            return Ok(extract_text(&html));
        }

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let bytes = response.bytes().await?;
        debug!(url, bytes = bytes.len(), "document downloaded");

        let html = decode_body(&bytes, encoding, content_type.as_deref())?;
        Ok(extract_text(&html))
    }
}

// ── Decoding ──────────────────────────────────────────────────────────────────

/// Decode a response body to a string.
///
/// The encoding is chosen in this order: the explicit `hint`, the charset of
/// `content_type`, a `<meta charset>` declaration near the top of the
/// document, UTF-8. A byte-order mark overrides all of them. Malformed
/// sequences become U+FFFD.
pub fn decode_body(
    bytes: &[u8],
    hint: Option<&str>,
    content_type: Option<&str>,
) -> Result<String, FetchError> {
    let encoding = match hint {
        Some(label) => Encoding::for_label(label.trim().as_bytes())
            .ok_or_else(|| FetchError::UnknownEncoding(label.to_string()))?,
        None => content_type
            .and_then(charset_from_content_type)
            .or_else(|| charset_from_meta(bytes))
            .unwrap_or(UTF_8),
    };

    let (text, used, had_errors) = encoding.decode(bytes);
    if had_errors {
        warn!(encoding = used.name(), "document contained malformed byte sequences");
    }
    Ok(text.into_owned())
}

fn charset_from_content_type(content_type: &str) -> Option<&'static Encoding> {
    content_type
        .split(';')
        .filter_map(|param| param.trim().split_once('='))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("charset"))
        .and_then(|(_, value)| Encoding::for_label(value.trim().trim_matches('"').as_bytes()))
}

fn charset_from_meta(bytes: &[u8]) -> Option<&'static Encoding> {
    static META_CHARSET: OnceLock<Regex> = OnceLock::new();
    let re = META_CHARSET.get_or_init(|| {
        Regex::new(r#"(?i)<meta[^>]+charset\s*=\s*["']?([A-Za-z0-9_.:\-]+)"#).expect("regex is valid")
    });
    let head = &bytes[..bytes.len().min(META_SNIFF_LEN)];
    re.captures(head)
        .and_then(|caps| caps.get(1))
        .and_then(|label| Encoding::for_label(label.as_bytes()))
}
