//! Configuration for pipeline runs

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://data.sec.gov";
const DEFAULT_TICKERS_URL: &str = "https://www.sec.gov/files/company_tickers.json";
const DEFAULT_USER_AGENT: &str = "filings-pipeline (filings-pipeline@example.com)";

/// Configuration for fetching, storing and deriving filing data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Base URL of the filings API
    pub base_url: String,

    /// URL of the ticker → CIK directory document
    pub tickers_url: String,

    /// User-Agent sent with every request (the SEC requires a contact)
    pub user_agent: String,

    /// Lifetime of cached upstream documents
    pub cache_ttl: Duration,

    /// Maximum number of cached upstream documents
    pub cache_capacity: usize,

    /// Client-side request pacing
    pub requests_per_second: u32,

    /// Request timeout duration
    pub request_timeout: Duration,

    /// Facts whose period ended before `current_year - lookback_years` are dropped
    pub lookback_years: i32,

    /// Root directory for versioned artifacts
    pub storage_root: PathBuf,

    /// Divisor applied to monetary metrics before ratios are derived
    pub monetary_scale: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            tickers_url: DEFAULT_TICKERS_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            cache_ttl: Duration::from_secs(3600), // 1 hour
            cache_capacity: 100,
            requests_per_second: 10,
            request_timeout: Duration::from_secs(30),
            lookback_years: 10,
            storage_root: PathBuf::from("data"),
            monetary_scale: 1_000_000.0,
        }
    }
}

impl PipelineConfig {
    /// Create a new configuration builder
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// Default configuration overridden by environment variables
    pub fn from_env() -> Result<Self> {
        Self::builder().with_env().build()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.user_agent.trim().is_empty() {
            return Err(PipelineError::Config(
                "user_agent must not be empty".to_string(),
            ));
        }

        if self.requests_per_second == 0 {
            return Err(PipelineError::Config(
                "requests_per_second must be greater than 0".to_string(),
            ));
        }

        if self.cache_capacity == 0 {
            return Err(PipelineError::Config(
                "cache_capacity must be greater than 0".to_string(),
            ));
        }

        if self.lookback_years <= 0 {
            return Err(PipelineError::Config(
                "lookback_years must be greater than 0".to_string(),
            ));
        }

        if !self.monetary_scale.is_finite() || self.monetary_scale <= 0.0 {
            return Err(PipelineError::Config(format!(
                "monetary_scale must be a positive number, got {}",
                self.monetary_scale
            )));
        }

        Ok(())
    }
}

/// Builder for PipelineConfig
#[derive(Debug, Default)]
pub struct PipelineConfigBuilder {
    base_url: Option<String>,
    tickers_url: Option<String>,
    user_agent: Option<String>,
    cache_ttl: Option<Duration>,
    cache_capacity: Option<usize>,
    requests_per_second: Option<u32>,
    request_timeout: Option<Duration>,
    lookback_years: Option<i32>,
    storage_root: Option<PathBuf>,
    monetary_scale: Option<f64>,
}

impl PipelineConfigBuilder {
    /// Set the filings API base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the ticker directory URL
    pub fn tickers_url(mut self, url: impl Into<String>) -> Self {
        self.tickers_url = Some(url.into());
        self
    }

    /// Set the User-Agent header
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Set cache TTL
    pub fn cache_ttl(mut self, duration: Duration) -> Self {
        self.cache_ttl = Some(duration);
        self
    }

    /// Set cache capacity
    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = Some(capacity);
        self
    }

    /// Set client-side request pacing
    pub fn requests_per_second(mut self, rate: u32) -> Self {
        self.requests_per_second = Some(rate);
        self
    }

    /// Set request timeout
    pub fn request_timeout(mut self, duration: Duration) -> Self {
        self.request_timeout = Some(duration);
        self
    }

    /// Set the fact lookback window in years
    pub fn lookback_years(mut self, years: i32) -> Self {
        self.lookback_years = Some(years);
        self
    }

    /// Set the artifact storage root
    pub fn storage_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.storage_root = Some(root.into());
        self
    }

    /// Set the monetary divisor
    pub fn monetary_scale(mut self, scale: f64) -> Self {
        self.monetary_scale = Some(scale);
        self
    }

    /// Load SEC_BASE_URL, SEC_USER_AGENT and FILINGS_STORAGE_ROOT from the environment
    pub fn with_env(mut self) -> Self {
        if let Ok(url) = std::env::var("SEC_BASE_URL") {
            self.base_url = Some(url);
        }
        if let Ok(agent) = std::env::var("SEC_USER_AGENT") {
            self.user_agent = Some(agent);
        }
        if let Ok(root) = std::env::var("FILINGS_STORAGE_ROOT") {
            self.storage_root = Some(PathBuf::from(root));
        }
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<PipelineConfig> {
        let defaults = PipelineConfig::default();

        let config = PipelineConfig {
            base_url: self.base_url.unwrap_or(defaults.base_url),
            tickers_url: self.tickers_url.unwrap_or(defaults.tickers_url),
            user_agent: self.user_agent.unwrap_or(defaults.user_agent),
            cache_ttl: self.cache_ttl.unwrap_or(defaults.cache_ttl),
            cache_capacity: self.cache_capacity.unwrap_or(defaults.cache_capacity),
            requests_per_second: self.requests_per_second.unwrap_or(defaults.requests_per_second),
            request_timeout: self.request_timeout.unwrap_or(defaults.request_timeout),
            lookback_years: self.lookback_years.unwrap_or(defaults.lookback_years),
            storage_root: self.storage_root.unwrap_or(defaults.storage_root),
            monetary_scale: self.monetary_scale.unwrap_or(defaults.monetary_scale),
        };

        config.validate()?;
        Ok(config)
    }
}
