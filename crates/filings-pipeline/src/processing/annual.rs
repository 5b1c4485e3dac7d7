//! Annual (10-K) processor

use super::{PeriodFact, PeriodProcessor, filter_by_metric, parse_frame, sort_by_period};
use crate::api::RawFact;

const ANNUAL_FORM: &str = "10-K";

/// Keeps facts reported on annual forms that carry a frame tag
pub struct AnnualProcessor<'a> {
    facts: &'a [RawFact],
}

impl<'a> AnnualProcessor<'a> {
    pub fn new(facts: &'a [RawFact]) -> Self {
        Self { facts }
    }
}

impl PeriodProcessor for AnnualProcessor<'_> {
    fn process_data(&self, metrics: &[&str]) -> Vec<PeriodFact> {
        let mut processed: Vec<PeriodFact> = filter_by_metric(self.facts, metrics)
            .filter(|fact| fact.form.as_deref() == Some(ANNUAL_FORM))
            .filter_map(|fact| {
                let frame = parse_frame(fact)?;
                Some(PeriodFact::from_raw(fact, frame.year, frame.annual_period()))
            })
            .collect();

        sort_by_period(&mut processed);
        tracing::debug!("Annual processor kept {} facts", processed.len());
        processed
    }
}
