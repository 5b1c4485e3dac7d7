//! Pipeline orchestration
//!
//! Per category the pipeline walks `Fetched → Preprocessed → Derived →
//! Transformed → Stored`. Every stage after the fetch reads its input through
//! the latest-artifact lookup, so a run can resume from any step without
//! redoing earlier ones. A failing category is logged and recorded in the
//! [`PipelineReport`]; the remaining categories still run.

use crate::api::{RawFact, SecEdgarClient};
use crate::category::Category;
use crate::cik::Cik;
use crate::config::PipelineConfig;
use crate::engines::engine_for;
use crate::error::{PipelineError, Result};
use crate::insights::{Insight, InsightOutcome};
use crate::processing::processor_for;
use crate::storage::{Stage, StorageManager};
use crate::transform::TransformerManager;
use crate::warehouse::Warehouse;
use filings_utils::{Clock, SystemClock};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{error, info};

/// Where ratio derivation happens, chosen once per pipeline
#[derive(Clone)]
pub enum ExecutionStrategy {
    /// Run the category engines in process
    Local,
    /// Upload facts and query the warehouse's category views
    Warehouse(Arc<dyn Warehouse>),
}

impl fmt::Debug for ExecutionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => f.write_str("Local"),
            Self::Warehouse(_) => f.write_str("Warehouse"),
        }
    }
}

/// Step a run starts from
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PipelineStep {
    /// Refresh the raw facts, then preprocess
    Fetch,
    /// Preprocess facts already held, fetching only when none are
    Preprocess,
    /// Derive ratios from the latest preprocessed artifact
    Derive,
    /// Build payloads from the latest processed artifact
    Transform,
}

impl FromStr for PipelineStep {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fetch" => Ok(Self::Fetch),
            "preprocess" => Ok(Self::Preprocess),
            "derive" => Ok(Self::Derive),
            "transform" => Ok(Self::Transform),
            other => Err(PipelineError::Query(format!(
                "Unknown pipeline step '{other}'. Expected one of: fetch, preprocess, derive, transform"
            ))),
        }
    }
}

/// Last state a category reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PipelineState {
    Fetched,
    Preprocessed,
    Derived,
    Transformed,
    Stored,
}

/// Result of one category within a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryOutcome {
    pub category: Category,
    pub state: Option<PipelineState>,
    /// File names stored during the run
    pub artifacts: Vec<String>,
    pub error: Option<String>,
}

impl CategoryOutcome {
    fn new(category: Category, state: Option<PipelineState>) -> Self {
        Self {
            category,
            state,
            artifacts: Vec::new(),
            error: None,
        }
    }

    fn advance(&mut self, state: PipelineState) {
        self.state = Some(state);
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Summary of a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineReport {
    pub outcomes: Vec<CategoryOutcome>,
}

impl PipelineReport {
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(CategoryOutcome::is_success)
    }

    pub fn failures(&self) -> impl Iterator<Item = &CategoryOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    pub fn outcome(&self, category: Category) -> Option<&CategoryOutcome> {
        self.outcomes.iter().find(|o| o.category == category)
    }
}

/// Orchestrates fetch, preprocessing, derivation and payload storage for one entity
pub struct Pipeline {
    client: SecEdgarClient,
    storage: StorageManager,
    transformer: TransformerManager,
    strategy: ExecutionStrategy,
    monetary_scale: f64,
    raw_facts: Option<Vec<RawFact>>,
}

impl Pipeline {
    pub fn new(config: &PipelineConfig, cik: Cik, strategy: ExecutionStrategy) -> Result<Self> {
        Self::with_clock(config, cik, strategy, Arc::new(SystemClock))
    }

    pub fn with_clock(
        config: &PipelineConfig,
        cik: Cik,
        strategy: ExecutionStrategy,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        let client = SecEdgarClient::new(config, clock.clone())?;
        let storage = StorageManager::new(config.storage_root.clone(), cik, clock);
        Ok(Self::from_parts(client, storage, strategy, config.monetary_scale))
    }

    /// Assemble from an existing client, e.g. one already used for a ticker lookup
    pub fn from_parts(
        client: SecEdgarClient,
        storage: StorageManager,
        strategy: ExecutionStrategy,
        monetary_scale: f64,
    ) -> Self {
        Self {
            client,
            storage,
            transformer: TransformerManager::default(),
            strategy,
            monetary_scale,
            raw_facts: None,
        }
    }

    /// Replace the chart registry
    #[must_use]
    pub fn with_transformer(mut self, transformer: TransformerManager) -> Self {
        self.transformer = transformer;
        self
    }

    /// Seed previously fetched facts so preprocessing skips the network
    #[must_use]
    pub fn with_raw_facts(mut self, facts: Vec<RawFact>) -> Self {
        self.raw_facts = Some(facts);
        self
    }

    pub fn cik(&self) -> &Cik {
        self.storage.cik()
    }

    pub fn storage(&self) -> &StorageManager {
        &self.storage
    }

    pub fn strategy(&self) -> &ExecutionStrategy {
        &self.strategy
    }

    /// Full run starting at the fetch
    pub async fn run(&mut self, categories: &[Category]) -> PipelineReport {
        self.run_from(PipelineStep::Fetch, categories).await
    }

    /// Run starting at `from`, resuming from stored artifacts
    pub async fn run_from(&mut self, from: PipelineStep, categories: &[Category]) -> PipelineReport {
        let mut initial = None;

        if from <= PipelineStep::Preprocess {
            if from == PipelineStep::Fetch {
                self.raw_facts = None;
            }
            if let Err(e) = self.ensure_facts().await {
                error!("Fetch failed for CIK {}: {e}", self.cik());
                let message = e.to_string();
                return PipelineReport {
                    outcomes: categories
                        .iter()
                        .map(|&category| CategoryOutcome {
                            error: Some(message.clone()),
                            ..CategoryOutcome::new(category, None)
                        })
                        .collect(),
                };
            }
            initial = Some(PipelineState::Fetched);
        }

        let mut report = PipelineReport::default();
        for &category in categories {
            let mut outcome = CategoryOutcome::new(category, initial);
            if let Err(e) = self.run_category(category, from, &mut outcome).await {
                error!("{category} failed after {:?}: {e}", outcome.state);
                outcome.error = Some(e.to_string());
            } else {
                info!("{category} completed with {} artifacts", outcome.artifacts.len());
            }
            report.outcomes.push(outcome);
        }
        report
    }

    /// Insights over the latest processed datasets; missing data is skipped
    pub fn insights(&self) -> Vec<InsightOutcome> {
        Insight::ALL
            .into_iter()
            .filter_map(|insight| {
                let dataset = self.storage.load_latest_dataset(insight.category())?;
                insight.evaluate(&dataset)
            })
            .collect()
    }

    async fn ensure_facts(&mut self) -> Result<()> {
        if self.raw_facts.is_some() {
            return Ok(());
        }
        let cik = *self.storage.cik();
        let facts = self.client.fetch_company_facts(&cik).await?;
        info!("Fetched {} facts for CIK {cik}", facts.len());
        self.raw_facts = Some(facts);
        Ok(())
    }

    async fn run_category(
        &self,
        category: Category,
        from: PipelineStep,
        outcome: &mut CategoryOutcome,
    ) -> Result<()> {
        if from <= PipelineStep::Preprocess {
            outcome.artifacts.push(self.preprocess(category).await?);
            outcome.advance(PipelineState::Preprocessed);
        }
        if from <= PipelineStep::Derive {
            outcome.artifacts.push(self.derive(category).await?);
            outcome.advance(PipelineState::Derived);
        }
        self.transform(category, outcome)
    }

    async fn preprocess(&self, category: Category) -> Result<String> {
        let raw = self
            .raw_facts
            .as_deref()
            .ok_or_else(|| missing_input("fetched facts", category))?;

        let facts = processor_for(category.cadence(), raw).process_data(category.required_metrics());
        info!("Preprocessed {} {category} facts", facts.len());

        let file_name = self
            .storage
            .store_table(facts.as_slice(), Stage::Preprocessed, category)
            .ok_or_else(|| not_stored(category, Stage::Preprocessed))?;

        if let ExecutionStrategy::Warehouse(warehouse) = &self.strategy {
            warehouse.upload(&category.warehouse_table(), &facts).await?;
        }
        Ok(file_name)
    }

    async fn derive(&self, category: Category) -> Result<String> {
        let dataset = match &self.strategy {
            ExecutionStrategy::Local => {
                let facts = self
                    .storage
                    .read_latest_facts(category)?
                    .ok_or_else(|| missing_input("preprocessed facts", category))?;
                engine_for(category).run_query(&facts, self.monetary_scale)?
            }
            ExecutionStrategy::Warehouse(warehouse) => {
                if self.storage.latest_path(category, Stage::Preprocessed).is_none() {
                    return Err(missing_input("preprocessed facts", category));
                }
                warehouse.query(&category.warehouse_query()).await?
            }
        };
        info!("Derived {} {category} rows", dataset.len());

        self.storage
            .store_table(&dataset, Stage::Processed, category)
            .ok_or_else(|| not_stored(category, Stage::Processed))
    }

    fn transform(&self, category: Category, outcome: &mut CategoryOutcome) -> Result<()> {
        let dataset = self
            .storage
            .read_latest_dataset(category)?
            .ok_or_else(|| missing_input("processed dataset", category))?;

        let payloads = self.transformer.transform_all(&dataset, category)?;
        outcome.advance(PipelineState::Transformed);

        for payload in &payloads {
            let file_name = self
                .storage
                .store_payload(payload, Stage::ProcessedPayloads, category, payload.kind())
                .ok_or_else(|| not_stored(category, Stage::ProcessedPayloads))?;
            outcome.artifacts.push(file_name);
        }
        outcome.advance(PipelineState::Stored);
        Ok(())
    }
}

fn missing_input(what: &str, category: Category) -> PipelineError {
    PipelineError::Storage(format!("No {what} found for {category}"))
}

fn not_stored(category: Category, stage: Stage) -> PipelineError {
    PipelineError::Storage(format!(
        "Failed to store {category} artifact in {}",
        stage.directory()
    ))
}
