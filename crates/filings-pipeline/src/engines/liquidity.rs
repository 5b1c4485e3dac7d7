//! Liquidity: current ratio

use super::{RatioEngine, combine, require_column, round_to};
use crate::category::Category;
use crate::dataset::CategoryDataset;
use crate::error::Result;

pub struct LiquidityEngine;

/// Current assets over current liabilities, two decimals; null unless liabilities > 0
pub fn current_ratio(assets: Option<f64>, liabilities: Option<f64>) -> Option<f64> {
    let (assets, liabilities) = (assets?, liabilities?);
    (liabilities > 0.0).then(|| round_to(assets / liabilities, 2))
}

impl RatioEngine for LiquidityEngine {
    fn category(&self) -> Category {
        Category::Liquidity
    }

    fn rename_map(&self) -> &'static [(&'static str, &'static str)] {
        &[
            ("AssetsCurrent", "CURRENT_ASSETS"),
            ("LiabilitiesCurrent", "CURRENT_LIABILITIES"),
            ("CurrentRatio", "CURRENT_RATIO"),
        ]
    }

    fn derive_ratios(&self, dataset: &mut CategoryDataset) -> Result<()> {
        let assets = require_column(dataset, "AssetsCurrent")?;
        let liabilities = require_column(dataset, "LiabilitiesCurrent")?;
        dataset.push_column("CurrentRatio", combine(&assets, &liabilities, current_ratio))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::test_support::quarterly;

    #[test]
    fn test_current_ratio_scenario() {
        let facts = quarterly(&[
            ("AssetsCurrent", [100.0, 120.0, 90.0]),
            ("LiabilitiesCurrent", [50.0, 60.0, 100.0]),
        ]);

        let dataset = LiquidityEngine.run_query(&facts, 1_000_000.0).unwrap();

        assert_eq!(
            dataset.columns(),
            &["CURRENT_ASSETS", "CURRENT_LIABILITIES", "CURRENT_RATIO"]
        );
        assert_eq!(
            dataset.numeric_column("CURRENT_RATIO").unwrap(),
            vec![Some(2.0), Some(2.0), Some(0.9)]
        );
        assert_eq!(dataset.value(0, "CURRENT_ASSETS"), Some(0.0001));
    }

    #[test]
    fn test_current_ratio_null_rules() {
        for assets in [0.0, 1.0, 250.5, -3.0] {
            assert_eq!(current_ratio(Some(assets), Some(0.0)), None);
            assert_eq!(current_ratio(Some(assets), Some(-10.0)), None);
        }
        assert_eq!(current_ratio(None, Some(1.0)), None);
        assert_eq!(current_ratio(Some(3.0), Some(4.0)), Some(0.75));
    }
}
