//! Cash flow: scaled pass-through of the three activity totals

use super::RatioEngine;
use crate::category::Category;
use crate::dataset::CategoryDataset;
use crate::error::Result;

pub struct CashFlowEngine;

impl RatioEngine for CashFlowEngine {
    fn category(&self) -> Category {
        Category::CashFlow
    }

    fn rename_map(&self) -> &'static [(&'static str, &'static str)] {
        &[
            ("NetCashProvidedByUsedInOperatingActivities", "CASH_FLOW_OPERATING"),
            ("NetCashProvidedByUsedInInvestingActivities", "CASH_FLOW_INVESTING"),
            ("NetCashProvidedByUsedInFinancingActivities", "CASH_FLOW_FINANCING"),
        ]
    }

    fn derive_ratios(&self, _dataset: &mut CategoryDataset) -> Result<()> {
        Ok(())
    }
}
