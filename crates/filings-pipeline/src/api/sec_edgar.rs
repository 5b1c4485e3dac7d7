//! SEC EDGAR client for XBRL company facts
//!
//! Every request waits on two throttles: a client-side `governor` quota
//! (10 requests per second by default, as per the SEC fair access policy) and
//! the cooldown advertised by the `X-RateLimit-Remaining`/`X-RateLimit-Reset`
//! headers of the previous response. When the remaining quota reaches zero the
//! next call sleeps until the reset instant plus one second.
//!
//! The client is single-caller: rate-limit state and the response cache are
//! mutated through `&mut self`, so sharing one instance between tasks requires
//! the caller to wrap it in a lock.

use crate::cache::{CacheKey, ResponseCache};
use crate::cik::Cik;
use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use chrono::{Datelike, NaiveDate};
use filings_utils::Clock;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::header::{HeaderMap, USER_AGENT};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

const PROVIDER: &str = "SEC EDGAR";
const REMAINING_HEADER: &str = "X-RateLimit-Remaining";
const RESET_HEADER: &str = "X-RateLimit-Reset";

/// One flattened XBRL fact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawFact {
    pub entity_name: String,
    pub cik: u64,
    /// us-gaap taxonomy concept, e.g. `AssetsCurrent`
    pub metric: String,
    pub value: f64,
    pub start: Option<NaiveDate>,
    pub end: NaiveDate,
    pub fiscal_year: Option<i32>,
    pub fiscal_period: Option<String>,
    /// Form type the fact was reported in (10-K, 10-Q, ...)
    pub form: Option<String>,
    /// Calendar period tag, e.g. `CY2023Q1I`
    pub frame: Option<String>,
    pub accession: Option<String>,
    pub filed: Option<NaiveDate>,
}

/// Company facts document
#[derive(Debug, Clone, Deserialize)]
struct CompanyFactsDocument {
    cik: u64,
    #[serde(rename = "entityName")]
    entity_name: String,
    facts: TaxonomyFacts,
}

#[derive(Debug, Clone, Deserialize)]
struct TaxonomyFacts {
    #[serde(rename = "us-gaap", default)]
    us_gaap: BTreeMap<String, ConceptFacts>,
}

#[derive(Debug, Clone, Deserialize)]
struct ConceptFacts {
    #[serde(default)]
    units: ConceptUnits,
}

/// Only the USD unit is read; other units are never parsed
#[derive(Debug, Clone, Default, Deserialize)]
struct ConceptUnits {
    #[serde(rename = "USD", default)]
    usd: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
struct FactEntry {
    start: Option<NaiveDate>,
    end: NaiveDate,
    val: f64,
    accn: Option<String>,
    fy: Option<i32>,
    fp: Option<String>,
    form: Option<String>,
    filed: Option<NaiveDate>,
    frame: Option<String>,
}

/// Entry of the company tickers directory
#[derive(Debug, Clone, Deserialize)]
struct TickerEntry {
    cik_str: serde_json::Value,
    ticker: String,
}

/// Quota state reported by the last response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RateLimitState {
    remaining: u64,
    /// Unix timestamp (seconds) at which the quota resets
    reset: i64,
}

/// SEC EDGAR API client
pub struct SecEdgarClient {
    client: Client,
    base_url: String,
    tickers_url: String,
    user_agent: String,
    rate_limiter: DirectRateLimiter,
    rate_limit: Option<RateLimitState>,
    cache: ResponseCache,
    clock: Arc<dyn Clock>,
    lookback_years: i32,
}

impl SecEdgarClient {
    /// Create a client from configuration
    pub fn new(config: &PipelineConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        let per_second = NonZeroU32::new(config.requests_per_second).ok_or_else(|| {
            PipelineError::Config("requests_per_second must be greater than 0".to_string())
        })?;

        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| PipelineError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            tickers_url: config.tickers_url.clone(),
            user_agent: config.user_agent.clone(),
            rate_limiter: RateLimiter::direct(Quota::per_second(per_second)),
            rate_limit: None,
            cache: ResponseCache::new(config.cache_capacity, config.cache_ttl, clock.clone()),
            clock,
            lookback_years: config.lookback_years,
        })
    }

    /// Fetch and flatten the company facts of one entity
    ///
    /// Only USD-denominated facts whose period ended within the lookback
    /// window are returned. A cached document is reused without a network
    /// call. Failures are logged here and returned to the caller.
    pub async fn fetch_company_facts(&mut self, cik: &Cik) -> Result<Vec<RawFact>> {
        let key = CacheKey::new("company_facts", cik.padded());
        let url = format!("{}/api/xbrl/companyfacts/CIK{}.json", self.base_url, cik.padded());

        let document = self
            .cached_get(key, &url)
            .await
            .inspect_err(|e| tracing::error!("Failed to fetch company facts for CIK {cik}: {e}"))?;

        self.flatten_company_facts(document)
            .inspect_err(|e| tracing::error!("Failed to parse company facts for CIK {cik}: {e}"))
    }

    /// Resolve a ticker symbol to its CIK
    pub async fn lookup_cik(&mut self, ticker: &str) -> Result<Cik> {
        let key = CacheKey::new("company_tickers", "");
        let url = self.tickers_url.clone();
        let document = self
            .cached_get(key, &url)
            .await
            .inspect_err(|e| tracing::error!("Failed to fetch company tickers: {e}"))?;

        let entries: BTreeMap<String, TickerEntry> = serde_json::from_value(document)
            .map_err(|e| PipelineError::Parse(format!("Malformed company tickers document: {e}")))?;

        let wanted = ticker.trim().to_uppercase();
        let entry = entries
            .values()
            .find(|entry| entry.ticker.to_uppercase() == wanted)
            .ok_or_else(|| PipelineError::Validation(format!("Unknown ticker: {ticker}")))?;

        match &entry.cik_str {
            serde_json::Value::Number(n) => n
                .as_u64()
                .ok_or_else(|| PipelineError::Parse(format!("Invalid CIK for {ticker}: {n}")))
                .and_then(Cik::from_number),
            serde_json::Value::String(s) => Cik::parse(s),
            other => Err(PipelineError::Parse(format!(
                "Invalid CIK for {ticker}: {other}"
            ))),
        }
    }

    async fn cached_get(&mut self, key: CacheKey, url: &str) -> Result<serde_json::Value> {
        if let Some(document) = self.cache.get(&key) {
            tracing::debug!("Cache hit for {:?}", key);
            return Ok(document);
        }

        tracing::debug!("Cache miss for {:?}, requesting {url}", key);
        let document = self.send_get(url).await?;
        self.cache.insert(key, document.clone());
        Ok(document)
    }

    async fn send_get(&mut self, url: &str) -> Result<serde_json::Value> {
        self.wait_for_cooldown().await;
        self.rate_limiter.until_ready().await;

        let response = self
            .client
            .get(url)
            .header(USER_AGENT, &self.user_agent)
            .send()
            .await
            .map_err(|e| PipelineError::Network(format!("SEC request failed: {e}")))?;

        self.record_rate_limit(response.headers());

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(PipelineError::RateLimitExceeded {
                provider: PROVIDER.to_string(),
            });
        }
        if !status.is_success() {
            return Err(PipelineError::Network(format!(
                "SEC API error: {status} for {url}"
            )));
        }

        response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| PipelineError::Parse(format!("Failed to parse SEC response: {e}")))
    }

    async fn wait_for_cooldown(&self) {
        let Some(state) = self.rate_limit else {
            return;
        };
        if state.remaining > 0 {
            return;
        }

        let cooldown = state.reset - self.clock.now().timestamp();
        if cooldown > 0 {
            let wait = Duration::from_secs(u64::try_from(cooldown).unwrap_or(0) + 1);
            tracing::warn!("{PROVIDER} quota exhausted, sleeping {:?}", wait);
            self.clock.sleep(wait).await;
        }
    }

    fn record_rate_limit(&mut self, headers: &HeaderMap) {
        let read = |name: &str| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .map(str::to_string)
        };

        let Some(remaining) = read(REMAINING_HEADER) else {
            return;
        };

        let parsed = remaining
            .parse::<u64>()
            .ok()
            .zip(read(RESET_HEADER).and_then(|reset| reset.parse::<i64>().ok()));

        match parsed {
            Some((remaining, reset)) => {
                self.rate_limit = Some(RateLimitState { remaining, reset });
            }
            None => tracing::warn!("Ignoring malformed rate-limit headers from {PROVIDER}"),
        }
    }

    fn flatten_company_facts(&self, document: serde_json::Value) -> Result<Vec<RawFact>> {
        let document: CompanyFactsDocument = serde_json::from_value(document)
            .map_err(|e| PipelineError::Parse(format!("Malformed company facts document: {e}")))?;

        let earliest_year = self.clock.now().year() - self.lookback_years;
        let entity_name = document.entity_name;
        let cik = document.cik;

        let mut facts = Vec::new();
        for (metric, concept) in document.facts.us_gaap {
            for entry in concept.units.usd {
                let entry: FactEntry = match serde_json::from_value(entry) {
                    Ok(entry) => entry,
                    Err(e) => {
                        tracing::warn!("Skipping malformed {metric} fact: {e}");
                        continue;
                    }
                };
                if entry.end.year() < earliest_year {
                    continue;
                }
                facts.push(RawFact {
                    entity_name: entity_name.clone(),
                    cik,
                    metric: metric.clone(),
                    value: entry.val,
                    start: entry.start,
                    end: entry.end,
                    fiscal_year: entry.fy,
                    fiscal_period: entry.fp,
                    form: entry.form,
                    frame: entry.frame,
                    accession: entry.accn,
                    filed: entry.filed,
                });
            }
        }

        tracing::debug!("Flattened {} USD facts for {entity_name}", facts.len());
        Ok(facts)
    }
}
