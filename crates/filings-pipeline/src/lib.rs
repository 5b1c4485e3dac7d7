//! Regulatory filing pipeline
//!
//! This crate turns SEC EDGAR company facts into versioned chart payloads:
//!
//! - Fetching company facts with a TTL cache and rate-limit cooldown
//! - Period processors normalising facts to annual or quarterly records
//! - Category ratio engines (liquidity, profitability, cash flow, assets & liabilities)
//! - Chart payload transformers, including divergence interpolation
//! - Versioned local storage with a per-entity pointer index
//! - An orchestrator that runs the stages per category and can resume
//!
//! # Example
//!
//! ```rust,ignore
//! use filings_pipeline::{Category, Cik, ExecutionStrategy, Pipeline, PipelineConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = PipelineConfig::from_env()?;
//!     let cik = Cik::parse("12927")?;
//!     let mut pipeline = Pipeline::new(&config, cik, ExecutionStrategy::Local)?;
//!
//!     let report = pipeline.run(&Category::ALL).await;
//!     for outcome in &report.outcomes {
//!         println!("{}: {:?}", outcome.category, outcome.state);
//!     }
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cache;
pub mod category;
pub mod cik;
pub mod config;
pub mod dataset;
pub mod engines;
pub mod error;
pub mod insights;
pub mod pipeline;
pub mod processing;
pub mod storage;
pub mod transform;
pub mod warehouse;

// Re-export main types for convenience
pub use api::{RawFact, SecEdgarClient};
pub use category::{Cadence, Category};
pub use cik::Cik;
pub use config::PipelineConfig;
pub use dataset::CategoryDataset;
pub use engines::{RatioEngine, engine_for};
pub use error::{PipelineError, Result};
pub use insights::{Insight, InsightOutcome};
pub use pipeline::{
    CategoryOutcome, ExecutionStrategy, Pipeline, PipelineReport, PipelineState, PipelineStep,
};
pub use processing::{PeriodFact, PeriodProcessor};
pub use storage::{Stage, StorageManager, VersionIndex};
pub use transform::{ChartKind, ChartPayload, TransformerManager};
pub use warehouse::{InMemoryWarehouse, Warehouse};
