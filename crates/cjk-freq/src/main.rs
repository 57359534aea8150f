mod bootstrap;

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use freq_core::settings::{Operation, Settings};
use freq_data::aggregator::FrequencyAggregator;
use freq_data::report::MissingPolicy;
use freq_runtime::fetcher::HttpFetcher;
use freq_runtime::ingest::{IngestConfig, Ingestor};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let settings = Settings::load_with_last_used();

    bootstrap::setup_logging(&settings.log_level)?;

    tracing::info!("cjk-freq v{} starting", env!("CARGO_PKG_VERSION"));

    let db_path = settings.db_path();
    tracing::debug!(db = %db_path.display(), "using database");
    let store = Arc::new(bootstrap::open_store(&db_path)?);

    match settings.operation() {
        Operation::Clear => {
            FrequencyAggregator::clear(store.as_ref())?;
            println!("All data removed.");
            Ok(ExitCode::SUCCESS)
        }

        Operation::Top(n) => {
            let policy = if settings.strict {
                MissingPolicy::Abort
            } else {
                MissingPolicy::Skip
            };

            // The table is only read once there is something to rank.
            let report = bootstrap::top_report(store.as_ref(), &settings.table_path(), n, policy)?;
            if settings.json {
                println!("{}", report.to_json()?);
            } else {
                print!("{}", report.render());
            }
            Ok(ExitCode::SUCCESS)
        }

        Operation::Ingest(urls) => {
            tracing::info!("Scraping {} document(s)...", urls.len());

            let fetcher = Arc::new(HttpFetcher::new(Duration::from_secs(settings.timeout))?);
            let config = IngestConfig {
                concurrency: settings.jobs as usize,
                encoding: settings.encoding.clone(),
                ..IngestConfig::default()
            };
            let ingestor = Ingestor::new(Arc::clone(&store), fetcher, config);

            // Ctrl+C drops the ingestion future, aborting in-flight fetches.
            // Documents already merged stay merged.
            let summary = tokio::select! {
                summary = ingestor.ingest(&urls) => summary,
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Ctrl+C received; aborting ingestion");
                    eprintln!("Interrupted.");
                    return Ok(ExitCode::from(130));
                }
            };

            if settings.json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print!("{}", summary.render());
            }

            if summary.failures() > 0 {
                Ok(ExitCode::FAILURE)
            } else {
                Ok(ExitCode::SUCCESS)
            }
        }
    }
}
