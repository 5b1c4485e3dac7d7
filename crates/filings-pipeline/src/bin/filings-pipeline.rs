//! Filings pipeline CLI
//!
//! Runs the pipeline for one entity and logs a per-category summary.
//!
//! # Usage
//!
//! ```bash
//! export SEC_USER_AGENT="YourApp (you@example.com)"
//!
//! # Every category for Boeing
//! cargo run --bin filings-pipeline -- --cik 12927
//!
//! # Re-render payloads only, from stored datasets
//! cargo run --bin filings-pipeline -- --ticker BA --category liquidity --from transform
//! ```

use anyhow::Context;
use clap::Parser;
use filings_pipeline::{
    Category, Cik, ExecutionStrategy, InMemoryWarehouse, Pipeline, PipelineConfig, PipelineStep,
    SecEdgarClient, StorageManager,
};
use filings_utils::SystemClock;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "filings-pipeline")]
#[command(about = "Fetch SEC filings, derive ratios and store chart payloads", long_about = None)]
struct Args {
    /// Central Index Key of the entity
    #[arg(long, conflicts_with = "ticker", required_unless_present = "ticker")]
    cik: Option<Cik>,

    /// Ticker symbol, resolved to a CIK
    #[arg(long)]
    ticker: Option<String>,

    /// Category to process; repeat for several (default: all)
    #[arg(long = "category")]
    categories: Vec<Category>,

    /// Step to start from: fetch, preprocess, derive or transform
    #[arg(long, default_value = "fetch")]
    from: PipelineStep,

    /// Storage root, overriding FILINGS_STORAGE_ROOT
    #[arg(long)]
    storage_root: Option<PathBuf>,

    /// Derive ratios through the in-process warehouse views
    #[arg(long)]
    warehouse: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    filings_utils::init_tracing();

    let args = Args::parse();

    let mut builder = PipelineConfig::builder().with_env();
    if let Some(root) = args.storage_root {
        builder = builder.storage_root(root);
    }
    let config = builder.build().context("Invalid configuration")?;

    let clock = Arc::new(SystemClock);
    let mut client = SecEdgarClient::new(&config, clock.clone())?;
    let cik = match (args.cik, args.ticker) {
        (Some(cik), _) => cik,
        (None, Some(ticker)) => client
            .lookup_cik(&ticker)
            .await
            .with_context(|| format!("Failed to resolve ticker {ticker}"))?,
        (None, None) => anyhow::bail!("Either --cik or --ticker is required"),
    };

    let strategy = if args.warehouse {
        ExecutionStrategy::Warehouse(Arc::new(InMemoryWarehouse::new(config.monetary_scale)))
    } else {
        ExecutionStrategy::Local
    };
    let categories = if args.categories.is_empty() {
        Category::ALL.to_vec()
    } else {
        args.categories
    };

    info!("Running pipeline for CIK {cik} from {:?} with {strategy:?}", args.from);

    let storage = StorageManager::new(config.storage_root.clone(), cik, clock);
    let mut pipeline = Pipeline::from_parts(client, storage, strategy, config.monetary_scale);
    let report = pipeline.run_from(args.from, &categories).await;

    for outcome in &report.outcomes {
        match &outcome.error {
            None => info!(
                "{}: {:?}, {} artifacts",
                outcome.category,
                outcome.state,
                outcome.artifacts.len()
            ),
            Some(e) => error!("{}: stopped at {:?}: {e}", outcome.category, outcome.state),
        }
    }

    for insight in pipeline.insights() {
        info!("{}: {} ({})", insight.label, insight.verdict, insight.explanation);
    }

    if !report.is_success() {
        anyhow::bail!("{} categories failed", report.failures().count());
    }
    Ok(())
}
