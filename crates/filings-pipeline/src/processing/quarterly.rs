//! Quarterly processor

use super::{PeriodFact, PeriodProcessor, filter_by_metric, parse_frame, sort_by_period};
use crate::api::RawFact;

/// Keeps facts of any form whose frame names a quarter
pub struct QuarterlyProcessor<'a> {
    facts: &'a [RawFact],
}

impl<'a> QuarterlyProcessor<'a> {
    pub fn new(facts: &'a [RawFact]) -> Self {
        Self { facts }
    }
}

impl PeriodProcessor for QuarterlyProcessor<'_> {
    fn process_data(&self, metrics: &[&str]) -> Vec<PeriodFact> {
        let mut processed: Vec<PeriodFact> = filter_by_metric(self.facts, metrics)
            .filter_map(|fact| {
                let frame = parse_frame(fact)?;
                let quarter = frame.quarterly_period()?;
                Some(PeriodFact::from_raw(fact, frame.year, quarter))
            })
            .collect();

        sort_by_period(&mut processed);
        tracing::debug!("Quarterly processor kept {} facts", processed.len());
        processed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::FiscalPeriod;
    use crate::processing::test_support::raw;

    #[test]
    fn test_quarterly_drops_annual_frames() {
        let facts = vec![
            raw("AssetsCurrent", "2023-12-31", 10.0, "10-K", Some("CY2023Q4I")),
            raw("AssetsCurrent", "2023-12-31", 11.0, "10-K", Some("CY2023")),
            raw("AssetsCurrent", "2023-06-30", 7.0, "10-Q", Some("CY2023Q2I")),
            raw("AssetsCurrent", "2023-03-31", 6.0, "10-Q", None),
        ];

        let processed = QuarterlyProcessor::new(&facts).process_data(&["AssetsCurrent"]);
        let order: Vec<(i32, FiscalPeriod)> =
            processed.iter().map(|f| (f.year, f.quarter)).collect();

        assert_eq!(order, vec![(2023, FiscalPeriod::Q2), (2023, FiscalPeriod::Q4)]);
        assert!(processed.iter().all(|f| f.quarter != FiscalPeriod::FY));
    }

    #[test]
    fn test_quarterly_filters_metrics_first() {
        let facts = vec![
            raw("AssetsCurrent", "2023-03-31", 6.0, "10-Q", Some("CY2023Q1I")),
            raw("LiabilitiesCurrent", "2023-03-31", 3.0, "10-Q", Some("CY2023Q1I")),
            raw("Goodwill", "2023-03-31", 1.0, "10-Q", Some("CY2023Q1I")),
        ];

        let processed = QuarterlyProcessor::new(&facts)
            .process_data(&["AssetsCurrent", "LiabilitiesCurrent"]);
        assert_eq!(processed.len(), 2);
        assert!(processed.iter().all(|f| f.metric != "Goodwill"));
    }
}
