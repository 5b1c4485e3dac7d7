//! Chart payload transformation
//!
//! The [`TransformerManager`] is an explicit registry mapping each category to
//! its [`ChartPlan`]. It is built once and handed to whoever renders payloads.

pub mod charts;
pub mod interpolation;
pub mod payload;

pub use interpolation::InterpolationTransformer;
pub use payload::{
    BarRow, ChartKind, ChartPayload, DivergenceSeriesPair, GridRow, LineSeries, Point,
};

use crate::category::Category;
use crate::dataset::CategoryDataset;
use crate::error::{PipelineError, Result};
use std::collections::BTreeMap;

/// Metrics charted for one category
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartPlan {
    pub line: Vec<&'static str>,
    pub bar: Vec<&'static str>,
    /// Signed metric rendered as a divergence chart, if any
    pub divergence: Option<&'static str>,
}

impl ChartPlan {
    /// Chart kinds this plan produces
    pub fn kinds(&self) -> Vec<ChartKind> {
        let mut kinds = vec![ChartKind::Line, ChartKind::Bar, ChartKind::DataGrid];
        if self.divergence.is_some() {
            kinds.push(ChartKind::Divergence);
        }
        kinds
    }
}

/// Registry of chart plans keyed by category
#[derive(Debug, Clone)]
pub struct TransformerManager {
    plans: BTreeMap<Category, ChartPlan>,
}

impl Default for TransformerManager {
    fn default() -> Self {
        let cash_flow = vec!["CASH_FLOW_FINANCING", "CASH_FLOW_INVESTING", "CASH_FLOW_OPERATING"];
        let profitability = vec!["NET_INCOME_LOSS", "REVENUES", "OPS_INCOME_LOSS"];

        Self::new()
            .register(
                Category::AssetsLiabilities,
                ChartPlan {
                    line: vec!["ASSET_TO_LIABILITY_RATIO", "DEBT_TO_EQUITY_RATIO"],
                    bar: vec!["ASSETS_CURRENT", "LIABILITIES_CURRENT", "STOCKHOLDERS_EQUITY"],
                    divergence: None,
                },
            )
            .register(
                Category::CashFlow,
                ChartPlan {
                    line: cash_flow.clone(),
                    bar: cash_flow,
                    divergence: None,
                },
            )
            .register(
                Category::Liquidity,
                ChartPlan {
                    line: vec!["CURRENT_RATIO"],
                    bar: vec!["CURRENT_ASSETS", "CURRENT_LIABILITIES"],
                    divergence: None,
                },
            )
            .register(
                Category::Profitability,
                ChartPlan {
                    line: profitability.clone(),
                    bar: profitability,
                    divergence: Some("PROFIT_MARGIN"),
                },
            )
    }
}

impl TransformerManager {
    /// Empty registry
    pub fn new() -> Self {
        Self {
            plans: BTreeMap::new(),
        }
    }

    /// Add or replace a category's plan
    #[must_use]
    pub fn register(mut self, category: Category, plan: ChartPlan) -> Self {
        self.plans.insert(category, plan);
        self
    }

    pub fn plan(&self, category: Category) -> Result<&ChartPlan> {
        self.plans.get(&category).ok_or_else(|| {
            PipelineError::Query(format!("No chart plan registered for {category}"))
        })
    }

    /// Build one chart payload
    pub fn transform(
        &self,
        dataset: &CategoryDataset,
        category: Category,
        kind: ChartKind,
    ) -> Result<ChartPayload> {
        let plan = self.plan(category)?;
        let payload = match kind {
            ChartKind::Line => ChartPayload::Line(charts::line_chart(dataset, &plan.line)),
            ChartKind::Bar => ChartPayload::Bar(charts::bar_chart(dataset, &plan.bar)),
            ChartKind::DataGrid => ChartPayload::DataGrid(charts::data_grid(dataset)),
            ChartKind::Divergence => {
                let metric = plan.divergence.ok_or_else(|| {
                    PipelineError::Query(format!("{category} has no divergence chart"))
                })?;
                ChartPayload::Divergence(InterpolationTransformer::new(dataset).stream(metric)?)
            }
        };
        Ok(payload)
    }

    /// Build every payload the category's plan names
    pub fn transform_all(
        &self,
        dataset: &CategoryDataset,
        category: Category,
    ) -> Result<Vec<ChartPayload>> {
        self.plan(category)?
            .kinds()
            .into_iter()
            .map(|kind| self.transform(dataset, category, kind))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::test_support::quarterly;
    use crate::engines::engine_for;

    fn profitability() -> CategoryDataset {
        let facts = quarterly(&[
            ("NetIncomeLoss", [5.0, -2.0, 3.0]),
            ("OperatingIncomeLoss", [6.0, -1.0, 4.0]),
            ("RevenueFromContractWithCustomerExcludingAssessedTax", [100.0, 100.0, 100.0]),
        ]);
        engine_for(Category::Profitability).run_query(&facts, 1.0).unwrap()
    }

    #[test]
    fn test_every_category_has_a_plan() {
        let manager = TransformerManager::default();
        for category in Category::ALL {
            assert!(manager.plan(category).is_ok());
        }
        assert_eq!(
            manager.plan(Category::Profitability).unwrap().kinds(),
            vec![ChartKind::Line, ChartKind::Bar, ChartKind::DataGrid, ChartKind::Divergence]
        );
    }

    #[test]
    fn test_profitability_transform_all() {
        let manager = TransformerManager::default();
        let payloads = manager
            .transform_all(&profitability(), Category::Profitability)
            .unwrap();

        assert_eq!(payloads.len(), 4);
        let ChartPayload::Divergence(pair) = &payloads[3] else {
            panic!("expected divergence payload");
        };
        assert_eq!(pair.positive.points.len(), 5);
        assert_eq!(pair.negative.points.len(), 5);
    }

    #[test]
    fn test_divergence_for_other_category_is_query_error() {
        let manager = TransformerManager::default();
        let result = manager.transform(&CategoryDataset::default(), Category::Liquidity, ChartKind::Divergence);
        assert!(matches!(result, Err(PipelineError::Query(_))));
    }

    #[test]
    fn test_unregistered_category() {
        let manager = TransformerManager::new();
        let result = manager.transform(&CategoryDataset::default(), Category::CashFlow, ChartKind::Line);
        assert!(matches!(result, Err(PipelineError::Query(_))));
    }

    #[test]
    fn test_empty_dataset_gives_empty_payloads() {
        let manager = TransformerManager::default();
        let payload = manager
            .transform(&CategoryDataset::default(), Category::CashFlow, ChartKind::Bar)
            .unwrap();
        assert!(payload.is_empty());
    }
}
