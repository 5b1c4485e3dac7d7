//! Calendar frame tags
//!
//! Upstream frames look like `CY2023` (annual duration), `CY2023Q2` (quarterly
//! duration) or `CY2023Q4I` (instant at quarter end).

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

static FRAME_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^CY(\d{4})(?:Q([1-4]))?(I)?$").ok());

/// Fiscal period within a year; ordered Q1 < Q2 < Q3 < Q4 < FY
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FiscalPeriod {
    Q1,
    Q2,
    Q3,
    Q4,
    FY,
}

impl FiscalPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Q1 => "Q1",
            Self::Q2 => "Q2",
            Self::Q3 => "Q3",
            Self::Q4 => "Q4",
            Self::FY => "FY",
        }
    }

    fn from_quarter(quarter: u8) -> Option<Self> {
        match quarter {
            1 => Some(Self::Q1),
            2 => Some(Self::Q2),
            3 => Some(Self::Q3),
            4 => Some(Self::Q4),
            _ => None,
        }
    }
}

impl fmt::Display for FiscalPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FiscalPeriod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "Q1" => Ok(Self::Q1),
            "Q2" => Ok(Self::Q2),
            "Q3" => Ok(Self::Q3),
            "Q4" => Ok(Self::Q4),
            "FY" => Ok(Self::FY),
            other => Err(format!("Unknown fiscal period: '{other}'")),
        }
    }
}

/// Validated components of a frame tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    pub year: i32,
    pub quarter: Option<u8>,
    pub instant: bool,
}

impl Frame {
    /// Parse a frame, returning `None` when it does not match `CY<yyyy>[Q<n>][I]`
    pub fn parse(raw: &str) -> Option<Self> {
        let captures = FRAME_PATTERN.as_ref()?.captures(raw.trim())?;
        let year = captures.get(1)?.as_str().parse().ok()?;
        let quarter = match captures.get(2) {
            Some(q) => Some(q.as_str().parse().ok()?),
            None => None,
        };

        Some(Self {
            year,
            quarter,
            instant: captures.get(3).is_some(),
        })
    }

    /// Period as read by the annual processor: only bare `Qn` tags keep their quarter
    pub fn annual_period(&self) -> FiscalPeriod {
        match self.quarter {
            Some(q) if !self.instant => FiscalPeriod::from_quarter(q).unwrap_or(FiscalPeriod::FY),
            _ => FiscalPeriod::FY,
        }
    }

    /// Period as read by the quarterly processor; `None` for annual frames
    pub fn quarterly_period(&self) -> Option<FiscalPeriod> {
        self.quarter.and_then(FiscalPeriod::from_quarter)
    }
}
