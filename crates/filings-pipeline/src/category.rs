//! Analysis categories

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Financial analysis grouping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    AssetsLiabilities,
    CashFlow,
    Liquidity,
    Profitability,
}

/// Reporting cadence a category is preprocessed at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    Annual,
    Quarterly,
}

impl Category {
    /// Every category, in processing order
    pub const ALL: [Category; 4] = [
        Category::AssetsLiabilities,
        Category::CashFlow,
        Category::Liquidity,
        Category::Profitability,
    ];

    /// Human-readable name, also used as the index heading
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::AssetsLiabilities => "Assets Liabilities",
            Self::CashFlow => "Cash Flow",
            Self::Liquidity => "Liquidity",
            Self::Profitability => "Profitability",
        }
    }

    /// Directory and file-name segment
    pub fn folder_name(&self) -> &'static str {
        match self {
            Self::AssetsLiabilities => "Assets_Liabilities",
            Self::CashFlow => "Cash_Flow",
            Self::Liquidity => "Liquidity",
            Self::Profitability => "Profitability",
        }
    }

    /// Which period processor feeds this category
    pub fn cadence(&self) -> Cadence {
        match self {
            Self::CashFlow => Cadence::Annual,
            Self::AssetsLiabilities | Self::Liquidity | Self::Profitability => Cadence::Quarterly,
        }
    }

    /// Upstream metric names the category needs
    pub fn required_metrics(&self) -> &'static [&'static str] {
        match self {
            Self::AssetsLiabilities => &["AssetsCurrent", "LiabilitiesCurrent", "StockholdersEquity"],
            Self::CashFlow => &[
                "NetCashProvidedByUsedInOperatingActivities",
                "NetCashProvidedByUsedInInvestingActivities",
                "NetCashProvidedByUsedInFinancingActivities",
            ],
            Self::Liquidity => &["AssetsCurrent", "LiabilitiesCurrent"],
            Self::Profitability => &[
                "NetIncomeLoss",
                "OperatingIncomeLoss",
                "RevenueFromContractWithCustomerExcludingAssessedTax",
            ],
        }
    }

    /// Warehouse table receiving this category's preprocessed facts
    pub fn warehouse_table(&self) -> String {
        self.folder_name().to_uppercase()
    }

    /// Query text selecting the derived view from the warehouse
    pub fn warehouse_query(&self) -> String {
        format!("SELECT * FROM {}_VIEW", self.warehouse_table())
    }

    fn normalize(raw: &str) -> String {
        raw.chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Category {
    type Err = PipelineError;

    /// Accepts display names, folder names and `&`/`and` spellings, case-insensitively
    fn from_str(s: &str) -> Result<Self> {
        let wanted = Self::normalize(&s.replace('&', "").replace(" and ", " "));
        Self::ALL
            .into_iter()
            .find(|category| Self::normalize(category.display_name()) == wanted)
            .ok_or_else(|| {
                let known: Vec<_> = Self::ALL.iter().map(Category::display_name).collect();
                PipelineError::Query(format!(
                    "Unknown category '{s}'; expected one of: {}",
                    known.join(", ")
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_category_spellings() {
        assert_eq!("Assets Liabilities".parse::<Category>().unwrap(), Category::AssetsLiabilities);
        assert_eq!("Assets & Liabilities".parse::<Category>().unwrap(), Category::AssetsLiabilities);
        assert_eq!("assets_liabilities".parse::<Category>().unwrap(), Category::AssetsLiabilities);
        assert_eq!("CASH FLOW".parse::<Category>().unwrap(), Category::CashFlow);
        assert_eq!("profitability".parse::<Category>().unwrap(), Category::Profitability);
    }

    #[test]
    fn test_unknown_category_is_descriptive() {
        let err = "Solvency".parse::<Category>().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Solvency"));
        assert!(message.contains("Liquidity"));
    }

    #[test]
    fn test_cadence_and_folders() {
        assert_eq!(Category::CashFlow.cadence(), Cadence::Annual);
        assert_eq!(Category::Liquidity.cadence(), Cadence::Quarterly);
        assert_eq!(Category::AssetsLiabilities.folder_name(), "Assets_Liabilities");
        assert_eq!(
            Category::Profitability.warehouse_query(),
            "SELECT * FROM PROFITABILITY_VIEW"
        );
    }
}
