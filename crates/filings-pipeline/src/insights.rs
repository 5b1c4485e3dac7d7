//! Headline insights over processed datasets

use crate::category::Category;
use crate::dataset::CategoryDataset;
use serde::Serialize;

/// A named verdict about one category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Insight {
    ProfitMarginTrend,
    CashFlowHealth,
    LiquidityPosition,
    LeverageSituation,
}

/// Evaluated insight
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InsightOutcome {
    pub label: &'static str,
    pub verdict: &'static str,
    pub favorable: bool,
    pub explanation: &'static str,
}

impl Insight {
    pub const ALL: [Insight; 4] = [
        Self::ProfitMarginTrend,
        Self::CashFlowHealth,
        Self::LiquidityPosition,
        Self::LeverageSituation,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::ProfitMarginTrend => "Profit Margin Trend",
            Self::CashFlowHealth => "Cash Flow Health",
            Self::LiquidityPosition => "Liquidity Position",
            Self::LeverageSituation => "Leverage Situation",
        }
    }

    /// Category whose processed dataset the insight reads
    pub fn category(&self) -> Category {
        match self {
            Self::ProfitMarginTrend => Category::Profitability,
            Self::CashFlowHealth => Category::CashFlow,
            Self::LiquidityPosition => Category::Liquidity,
            Self::LeverageSituation => Category::AssetsLiabilities,
        }
    }

    /// Evaluate against the category's dataset; `None` when the column has no values
    pub fn evaluate(&self, dataset: &CategoryDataset) -> Option<InsightOutcome> {
        match self {
            Self::ProfitMarginTrend => profit_margin_trend(dataset),
            Self::CashFlowHealth => cash_flow_health(dataset),
            Self::LiquidityPosition => liquidity_position(dataset),
            Self::LeverageSituation => leverage_situation(dataset),
        }
    }
}

/// First and last non-null values of a column
fn endpoints(dataset: &CategoryDataset, column: &str) -> Option<(f64, f64)> {
    let values: Vec<f64> = dataset.numeric_column(column)?.into_iter().flatten().collect();
    Some((*values.first()?, *values.last()?))
}

fn outcome(insight: Insight, verdict: &'static str, favorable: bool, explanation: &'static str) -> InsightOutcome {
    InsightOutcome {
        label: insight.label(),
        verdict,
        favorable,
        explanation,
    }
}

pub fn profit_margin_trend(dataset: &CategoryDataset) -> Option<InsightOutcome> {
    let (first, last) = endpoints(dataset, "PROFIT_MARGIN")?;
    let increasing = last > first;
    Some(outcome(
        Insight::ProfitMarginTrend,
        if increasing { "increasing" } else { "decreasing" },
        increasing,
        "An increasing trend suggests the company is converting more of its sales into profit.",
    ))
}

pub fn cash_flow_health(dataset: &CategoryDataset) -> Option<InsightOutcome> {
    let (_, last) = endpoints(dataset, "CASH_FLOW_OPERATING")?;
    let healthy = last > 0.0;
    Some(outcome(
        Insight::CashFlowHealth,
        if healthy { "healthy" } else { "concerning" },
        healthy,
        "Positive operating cash flow means the company can meet its obligations and fund growth.",
    ))
}

pub fn liquidity_position(dataset: &CategoryDataset) -> Option<InsightOutcome> {
    let (_, last) = endpoints(dataset, "CURRENT_RATIO")?;
    let good = last > 1.0;
    Some(outcome(
        Insight::LiquidityPosition,
        if good { "good" } else { "poor" },
        good,
        "A current ratio above 1 means current assets exceed current liabilities.",
    ))
}

pub fn leverage_situation(dataset: &CategoryDataset) -> Option<InsightOutcome> {
    let (first, last) = endpoints(dataset, "DEBT_TO_EQUITY_RATIO")?;
    let rising = last > first;
    Some(outcome(
        Insight::LeverageSituation,
        if rising { "increasing risk" } else { "stable" },
        !rising,
        "A stable or low debt-to-equity ratio means less reliance on debt financing.",
    ))
}
