//! Concurrent ingestion of documents into a frequency store.
//!
//! Each URL becomes one task: fetch (retried on transient failures), tally
//! the CJK characters, and merge the tally as one store batch. At most
//! `concurrency` tasks are in flight. A failing document is reported and
//! never stops the others.

use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use freq_core::classify::Tally;
use freq_data::aggregator::FrequencyAggregator;
use freq_data::store::FrequencyStore;
use serde::Serialize;
use tokio::task::JoinSet;
use tokio::time;

use crate::fetcher::{DocumentFetcher, FetchError};

// ── Defaults ──────────────────────────────────────────────────────────────────

/// Default number of documents processed at once.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Maximum number of fetch attempts per document.
pub const DEFAULT_FETCH_ATTEMPTS: u32 = 3;

/// Back-off unit between fetch attempts (attempt `k` waits `k * unit`).
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_millis(200);

// ── Public types ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Documents fetched and merged concurrently (at least 1).
    pub concurrency: usize,
    /// Encoding label forwarded to the fetcher.
    pub encoding: Option<String>,
    pub fetch_attempts: u32,
    pub retry_backoff: Duration,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            encoding: None,
            fetch_attempts: DEFAULT_FETCH_ATTEMPTS,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
        }
    }
}

/// Where a document's processing stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    Fetch,
    Merge,
    /// The task died before reporting (panic or abort).
    Task,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DocumentOutcome {
    /// The document's tally was committed to the store.
    Merged {
        cjk_chars: u64,
        all_chars: u64,
        distinct: usize,
    },
    /// Nothing from this document reached the store.
    Failed { stage: FailureStage, error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentReport {
    pub url: String,
    pub outcome: DocumentOutcome,
}

/// Result of one ingestion run, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestSummary {
    pub documents: Vec<DocumentReport>,
}

impl IngestSummary {
    /// CJK characters committed across all documents.
    pub fn added(&self) -> u64 {
        self.documents
            .iter()
            .map(|d| match d.outcome {
                DocumentOutcome::Merged { cjk_chars, .. } => cjk_chars,
                DocumentOutcome::Failed { .. } => 0,
            })
            .sum()
    }

    pub fn failures(&self) -> usize {
        self.documents
            .iter()
            .filter(|d| matches!(d.outcome, DocumentOutcome::Failed { .. }))
            .count()
    }

    /// One line per document, then the overall count.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for doc in &self.documents {
            match &doc.outcome {
                DocumentOutcome::Merged {
                    cjk_chars,
                    all_chars,
                    ..
                } => {
                    let _ = writeln!(
                        out,
                        "Scraping {}... {}/{} CJK chars found.",
                        doc.url, cjk_chars, all_chars
                    );
                }
                DocumentOutcome::Failed { stage, error } => {
                    let stage = match stage {
                        FailureStage::Fetch => "fetch",
                        FailureStage::Merge => "merge",
                        FailureStage::Task => "task",
                    };
                    let _ = writeln!(out, "Scraping {}... failed ({}): {}", doc.url, stage, error);
                }
            }
        }
        let _ = writeln!(out, "Added {} CJK characters to the database.", self.added());
        out
    }
}

// ── Ingestor ──────────────────────────────────────────────────────────────────

/// Drives fetch → tally → merge for a list of URLs.
///
/// The store is the only shared state; documents coordinate solely through
/// its atomic batch increments. Dropping the future returned by
/// [`Ingestor::ingest`] aborts the in-flight fetches. Batches already
/// handed to the store still commit or roll back as a whole.
pub struct Ingestor<S, F> {
    store: Arc<S>,
    fetcher: Arc<F>,
    config: IngestConfig,
}

impl<S, F> Ingestor<S, F>
where
    S: FrequencyStore + 'static,
    F: DocumentFetcher,
{
    pub fn new(store: Arc<S>, fetcher: Arc<F>, config: IngestConfig) -> Self {
        Self {
            store,
            fetcher,
            config,
        }
    }

    /// Ingest every URL and report each document's outcome in input order.
    pub async fn ingest(&self, urls: &[String]) -> IngestSummary {
        let concurrency = self.config.concurrency.max(1);
        let mut slots: Vec<Option<DocumentOutcome>> = vec![None; urls.len()];
        let mut pending = urls.iter().cloned().enumerate();
        let mut tasks: JoinSet<(usize, DocumentOutcome)> = JoinSet::new();

        loop {
            while tasks.len() < concurrency {
                let Some((index, url)) = pending.next() else {
                    break;
                };
                let store = Arc::clone(&self.store);
                let fetcher = Arc::clone(&self.fetcher);
                let config = self.config.clone();
                tasks.spawn(async move {
                    let outcome = process_document(store, fetcher, &url, &config).await;
                    (index, outcome)
                });
            }

            let Some(joined) = tasks.join_next().await else {
                break;
            };
            match joined {
                Ok((index, outcome)) => slots[index] = Some(outcome),
                Err(e) => tracing::error!(error = %e, "ingestion task failed"),
            }
        }

        let documents = urls
            .iter()
            .zip(slots)
            .map(|(url, outcome)| DocumentReport {
                url: url.clone(),
                outcome: outcome.unwrap_or_else(|| DocumentOutcome::Failed {
                    stage: FailureStage::Task,
                    error: "task ended without a result".to_string(),
                }),
            })
            .collect();

        IngestSummary { documents }
    }
}

// ── Private implementation ────────────────────────────────────────────────────

async fn process_document<S, F>(
    store: Arc<S>,
    fetcher: Arc<F>,
    url: &str,
    config: &IngestConfig,
) -> DocumentOutcome
where
    S: FrequencyStore + 'static,
    F: DocumentFetcher,
{
    let text = match fetch_with_retry(fetcher.as_ref(), url, config).await {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(url, error = %e, "giving up on document");
            return DocumentOutcome::Failed {
                stage: FailureStage::Fetch,
                error: e.to_string(),
            };
        }
    };

    let tally = Tally::from_text(&text);
    let (cjk_chars, all_chars, distinct) = (tally.cjk_chars, tally.all_chars, tally.distinct());

    // Store calls block; keep them off the async workers. A failed merge is
    // not retried: without a batch id the store cannot tell a lost reply
    // from a lost write.
    let merged = tokio::task::spawn_blocking(move || {
        FrequencyAggregator::merge_tally(store.as_ref(), &tally)
    })
    .await;

    match merged {
        Ok(Ok(_)) => {
            tracing::info!(url, cjk_chars, all_chars, "document merged");
            DocumentOutcome::Merged {
                cjk_chars,
                all_chars,
                distinct,
            }
        }
        Ok(Err(e)) => {
            tracing::warn!(url, error = %e, "merge failed");
            DocumentOutcome::Failed {
                stage: FailureStage::Merge,
                error: e.to_string(),
            }
        }
        Err(e) => DocumentOutcome::Failed {
            stage: FailureStage::Task,
            error: e.to_string(),
        },
    }
}

/// Up to `config.fetch_attempts` attempts with linear back-off; permanent
/// errors are returned at once.
async fn fetch_with_retry<F: DocumentFetcher>(
    fetcher: &F,
    url: &str,
    config: &IngestConfig,
) -> Result<String, FetchError> {
    let attempts = config.fetch_attempts.max(1);
    let mut attempt = 0;
    loop {
        match fetcher.fetch(url, config.encoding.as_deref()).await {
            Ok(text) => return Ok(text),
            Err(e) if e.is_retryable() && attempt + 1 < attempts => {
                attempt += 1;
                let pause = config.retry_backoff * attempt;
                tracing::debug!(url, attempt, error = %e, ?pause, "retrying fetch after back-off");
                time::sleep(pause).await;
            }
            Err(e) => return Err(e),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
