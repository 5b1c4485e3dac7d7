//! Period processors
//!
//! Processors narrow the flattened upstream facts to a metric set, drop filing
//! metadata, attach the fiscal year and period recovered from the frame tag and
//! sort the result by `(year, quarter)`.

pub mod annual;
pub mod frame;
pub mod quarterly;

pub use annual::AnnualProcessor;
pub use frame::{FiscalPeriod, Frame};
pub use quarterly::QuarterlyProcessor;

use crate::api::RawFact;
use crate::category::Cadence;
use crate::error::{PipelineError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::io::Read;

/// Columns a preprocessed table must carry before it can be pivoted
pub const REQUIRED_COLUMNS: [&str; 7] = ["EntityName", "CIK", "end", "year", "quarter", "Metric", "val"];

/// A cleaned fact in long format, one row per (metric, period)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodFact {
    #[serde(rename = "EntityName")]
    pub entity_name: String,
    #[serde(rename = "CIK")]
    pub cik: u64,
    #[serde(rename = "Metric")]
    pub metric: String,
    pub start: Option<NaiveDate>,
    pub end: NaiveDate,
    #[serde(rename = "val")]
    pub value: f64,
    pub year: i32,
    pub quarter: FiscalPeriod,
}

impl PeriodFact {
    fn from_raw(fact: &RawFact, year: i32, quarter: FiscalPeriod) -> Self {
        Self {
            entity_name: fact.entity_name.clone(),
            cik: fact.cik,
            metric: fact.metric.clone(),
            start: fact.start,
            end: fact.end,
            value: fact.value,
            year,
            quarter,
        }
    }
}

/// Turns raw facts into sorted period facts for a metric set
pub trait PeriodProcessor {
    /// Process the facts whose metric name is exactly one of `metrics`
    fn process_data(&self, metrics: &[&str]) -> Vec<PeriodFact>;
}

/// Pick the processor matching a category's cadence
pub fn processor_for<'a>(cadence: Cadence, facts: &'a [RawFact]) -> Box<dyn PeriodProcessor + 'a> {
    match cadence {
        Cadence::Annual => Box::new(AnnualProcessor::new(facts)),
        Cadence::Quarterly => Box::new(QuarterlyProcessor::new(facts)),
    }
}

pub(crate) fn filter_by_metric<'a>(
    facts: &'a [RawFact],
    metrics: &'a [&str],
) -> impl Iterator<Item = &'a RawFact> + 'a {
    facts
        .iter()
        .filter(move |fact| metrics.contains(&fact.metric.as_str()))
}

/// Parse a fact's frame, logging malformed tags
pub(crate) fn parse_frame(fact: &RawFact) -> Option<Frame> {
    let raw = fact.frame.as_deref()?;
    let parsed = Frame::parse(raw);
    if parsed.is_none() {
        tracing::warn!(
            "Dropping {} fact ending {}: malformed frame '{raw}'",
            fact.metric,
            fact.end
        );
    }
    parsed
}

pub(crate) fn sort_by_period(facts: &mut [PeriodFact]) {
    facts.sort_by_key(|fact| (fact.year, fact.quarter));
}

/// Serialize period facts as a long-format CSV table
pub fn write_period_facts(facts: &[PeriodFact]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    if facts.is_empty() {
        writer.write_record([
            "EntityName", "CIK", "Metric", "start", "end", "val", "year", "quarter",
        ])?;
    }
    for fact in facts {
        writer.serialize(fact)?;
    }
    writer
        .into_inner()
        .map_err(|e| PipelineError::Storage(format!("Failed to flush CSV writer: {e}")))
}

/// Read a long-format CSV table back, validating its columns first
pub fn read_period_facts<R: Read>(reader: R) -> Result<Vec<PeriodFact>> {
    let mut reader = csv::Reader::from_reader(reader);
    let headers = reader.headers()?.clone();

    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|column| !headers.iter().any(|h| h == *column))
        .collect();
    if !missing.is_empty() {
        return Err(PipelineError::Validation(format!(
            "Missing required columns: {}",
            missing.join(", ")
        )));
    }

    reader
        .deserialize()
        .map(|row| row.map_err(PipelineError::from))
        .collect()
}
