//! Assets & liabilities: asset coverage and leverage

use super::{RatioEngine, combine, require_column, round_to};
use crate::category::Category;
use crate::dataset::CategoryDataset;
use crate::error::Result;

pub struct AssetsLiabilitiesEngine;

/// Assets over liabilities, one decimal; null when liabilities are zero or missing
pub fn asset_to_liability_ratio(assets: Option<f64>, liabilities: Option<f64>) -> Option<f64> {
    let (assets, liabilities) = (assets?, liabilities?);
    (liabilities != 0.0).then(|| round_to(assets / liabilities, 1))
}

/// Liabilities over equity, one decimal; null when either is missing or equity is zero
pub fn debt_to_equity_ratio(liabilities: Option<f64>, equity: Option<f64>) -> Option<f64> {
    let (liabilities, equity) = (liabilities?, equity?);
    (equity != 0.0).then(|| round_to(liabilities / equity, 1))
}

impl RatioEngine for AssetsLiabilitiesEngine {
    fn category(&self) -> Category {
        Category::AssetsLiabilities
    }

    fn rename_map(&self) -> &'static [(&'static str, &'static str)] {
        &[
            ("AssetsCurrent", "ASSETS_CURRENT"),
            ("LiabilitiesCurrent", "LIABILITIES_CURRENT"),
            ("StockholdersEquity", "STOCKHOLDERS_EQUITY"),
            ("AssetToLiabilityRatio", "ASSET_TO_LIABILITY_RATIO"),
            ("DebtToEquityRatio", "DEBT_TO_EQUITY_RATIO"),
        ]
    }

    fn derive_ratios(&self, dataset: &mut CategoryDataset) -> Result<()> {
        let assets = require_column(dataset, "AssetsCurrent")?;
        let liabilities = require_column(dataset, "LiabilitiesCurrent")?;
        let equity = require_column(dataset, "StockholdersEquity")?;

        dataset.push_column(
            "AssetToLiabilityRatio",
            combine(&assets, &liabilities, asset_to_liability_ratio),
        )?;
        dataset.push_column(
            "DebtToEquityRatio",
            combine(&liabilities, &equity, debt_to_equity_ratio),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::test_support::quarterly;
    use crate::error::PipelineError;

    #[test]
    fn test_asset_to_liability_null_rule() {
        for assets in [0.0, 1.0, 99.9, -4.0] {
            assert_eq!(asset_to_liability_ratio(Some(assets), Some(0.0)), None);
        }
        assert_eq!(asset_to_liability_ratio(Some(3.0), Some(2.0)), Some(1.5));
        assert_eq!(asset_to_liability_ratio(Some(1.0), Some(3.0)), Some(0.3));
    }

    #[test]
    fn test_debt_to_equity_null_rules() {
        assert_eq!(debt_to_equity_ratio(Some(5.0), None), None);
        assert_eq!(debt_to_equity_ratio(None, Some(5.0)), None);
        assert_eq!(debt_to_equity_ratio(Some(5.0), Some(0.0)), None);
        assert_eq!(debt_to_equity_ratio(Some(5.0), Some(-2.0)), Some(-2.5));
    }

    #[test]
    fn test_engine_output_columns() {
        let facts = quarterly(&[
            ("AssetsCurrent", [300.0, 200.0, 100.0]),
            ("LiabilitiesCurrent", [100.0, 0.0, 50.0]),
            ("StockholdersEquity", [50.0, 40.0, 0.0]),
        ]);

        let dataset = AssetsLiabilitiesEngine.run_query(&facts, 1.0).unwrap();

        assert_eq!(
            dataset.numeric_column("ASSET_TO_LIABILITY_RATIO").unwrap(),
            vec![Some(3.0), None, Some(2.0)]
        );
        assert_eq!(
            dataset.numeric_column("DEBT_TO_EQUITY_RATIO").unwrap(),
            vec![Some(2.0), Some(0.0), None]
        );
    }

    #[test]
    fn test_missing_column_is_validation_error() {
        let mut dataset = CategoryDataset::default();
        let err = AssetsLiabilitiesEngine.derive_ratios(&mut dataset).unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)));
    }
}
