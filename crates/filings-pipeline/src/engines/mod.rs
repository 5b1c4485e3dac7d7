//! Category ratio engines
//!
//! Each category maps to one [`RatioEngine`]. An engine pivots the category's
//! period facts into a wide table, scales the monetary columns, derives its
//! ratios and renames everything to canonical column names.

pub mod assets_liabilities;
pub mod cash_flow;
pub mod liquidity;
pub mod profitability;

pub use assets_liabilities::AssetsLiabilitiesEngine;
pub use cash_flow::CashFlowEngine;
pub use liquidity::LiquidityEngine;
pub use profitability::ProfitabilityEngine;

use crate::category::Category;
use crate::dataset::{CategoryDataset, Cell};
use crate::error::{PipelineError, Result};
use crate::processing::PeriodFact;

/// Strategy deriving one category's ratios
pub trait RatioEngine: Send + Sync {
    fn category(&self) -> Category;

    /// `(upstream or derived name, canonical name)` pairs
    fn rename_map(&self) -> &'static [(&'static str, &'static str)];

    /// Add the category's ratio columns to a scaled wide table
    fn derive_ratios(&self, dataset: &mut CategoryDataset) -> Result<()>;

    fn required_metrics(&self) -> &'static [&'static str] {
        self.category().required_metrics()
    }

    /// Pivot, scale, derive and rename
    fn run_query(&self, facts: &[PeriodFact], monetary_scale: f64) -> Result<CategoryDataset> {
        if !monetary_scale.is_finite() || monetary_scale <= 0.0 {
            return Err(PipelineError::Validation(format!(
                "Invalid monetary scale: {monetary_scale}"
            )));
        }

        let metrics = self.required_metrics();
        let mut dataset = CategoryDataset::pivot(facts, metrics);
        dataset.scale_columns(metrics, monetary_scale);
        self.derive_ratios(&mut dataset)?;
        dataset.rename_columns(self.rename_map());

        tracing::debug!(
            "{} engine produced {} rows",
            self.category(),
            dataset.len()
        );
        Ok(dataset)
    }
}

static ASSETS_LIABILITIES: AssetsLiabilitiesEngine = AssetsLiabilitiesEngine;
static CASH_FLOW: CashFlowEngine = CashFlowEngine;
static LIQUIDITY: LiquidityEngine = LiquidityEngine;
static PROFITABILITY: ProfitabilityEngine = ProfitabilityEngine;

/// Engine registered for a category
pub fn engine_for(category: Category) -> &'static dyn RatioEngine {
    match category {
        Category::AssetsLiabilities => &ASSETS_LIABILITIES,
        Category::CashFlow => &CASH_FLOW,
        Category::Liquidity => &LIQUIDITY,
        Category::Profitability => &PROFITABILITY,
    }
}

/// Round half away from zero to `decimals` places
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10_f64.powi(decimals);
    (value * factor).round() / factor
}

/// Numeric column that ratio derivation depends on
pub(crate) fn require_column(dataset: &CategoryDataset, name: &str) -> Result<Vec<Option<f64>>> {
    dataset.numeric_column(name).ok_or_else(|| {
        PipelineError::Validation(format!("Missing required column for derivation: {name}"))
    })
}

/// Combine two columns row by row into a new cell column
pub(crate) fn combine(
    left: &[Option<f64>],
    right: &[Option<f64>],
    ratio: impl Fn(Option<f64>, Option<f64>) -> Option<f64>,
) -> Vec<Cell> {
    left.iter()
        .zip(right)
        .map(|(l, r)| Cell::from_option(ratio(*l, *r)))
        .collect()
}
