//! Central Index Key handling

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Regulator-assigned identifier for a filing entity
///
/// Stored as a number, rendered zero-padded to ten digits for URLs, file names
/// and directory names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Cik(u64);

impl Cik {
    /// Largest value that fits in ten digits
    const MAX: u64 = 9_999_999_999;

    /// Parse a CIK with or without leading zeros
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.len() > 10 || !trimmed.chars().all(|c| c.is_ascii_digit()) {
            return Err(PipelineError::Validation(format!(
                "Invalid CIK format: '{raw}' (expected up to 10 digits)"
            )));
        }

        let value: u64 = trimmed
            .parse()
            .map_err(|e| PipelineError::Validation(format!("Invalid CIK '{raw}': {e}")))?;
        Self::from_number(value)
    }

    /// Build from the numeric form used in upstream documents
    pub fn from_number(value: u64) -> Result<Self> {
        if value == 0 || value > Self::MAX {
            return Err(PipelineError::Validation(format!(
                "CIK out of range: {value}"
            )));
        }
        Ok(Self(value))
    }

    /// Numeric value without padding
    pub fn value(&self) -> u64 {
        self.0
    }

    /// Ten-digit zero-padded form
    pub fn padded(&self) -> String {
        format!("{:010}", self.0)
    }
}

impl fmt::Display for Cik {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:010}", self.0)
    }
}

impl FromStr for Cik {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Cik {
    type Error = PipelineError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Cik> for String {
    fn from(cik: Cik) -> Self {
        cik.padded()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pads_to_ten_digits() {
        let cik = Cik::parse("12927").unwrap();
        assert_eq!(cik.padded(), "0000012927");
        assert_eq!(cik.to_string(), "0000012927");
        assert_eq!(cik.value(), 12927);

        let cik: Cik = "0000320193".parse().unwrap();
        assert_eq!(cik.value(), 320_193);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Cik::parse("").is_err());
        assert!(Cik::parse("12A45").is_err());
        assert!(Cik::parse("12345678901").is_err());
        assert!(Cik::parse("0000000000").is_err());
    }
}
