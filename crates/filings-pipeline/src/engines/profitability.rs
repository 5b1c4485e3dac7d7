//! Profitability: profit margin

use super::{RatioEngine, combine, require_column, round_to};
use crate::category::Category;
use crate::dataset::CategoryDataset;
use crate::error::Result;

pub struct ProfitabilityEngine;

const REVENUE: &str = "RevenueFromContractWithCustomerExcludingAssessedTax";

/// Net income as a percentage of revenue, two decimals
pub fn profit_margin_percent(net_income: Option<f64>, revenue: Option<f64>) -> Option<f64> {
    let (net_income, revenue) = (net_income?, revenue?);
    (revenue != 0.0).then(|| round_to(net_income / revenue * 100.0, 2))
}

impl RatioEngine for ProfitabilityEngine {
    fn category(&self) -> Category {
        Category::Profitability
    }

    fn rename_map(&self) -> &'static [(&'static str, &'static str)] {
        &[
            ("NetIncomeLoss", "NET_INCOME_LOSS"),
            ("OperatingIncomeLoss", "OPS_INCOME_LOSS"),
            (REVENUE, "REVENUES"),
            ("ProfitMarginPercent", "PROFIT_MARGIN"),
        ]
    }

    fn derive_ratios(&self, dataset: &mut CategoryDataset) -> Result<()> {
        let net_income = require_column(dataset, "NetIncomeLoss")?;
        let revenue = require_column(dataset, REVENUE)?;
        dataset.push_column(
            "ProfitMarginPercent",
            combine(&net_income, &revenue, profit_margin_percent),
        )
    }
}
