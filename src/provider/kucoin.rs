//! KuCoin klines data source
//!
//! Serves OHLCV candle pages from KuCoin's public REST API. Window bounds go
//! out as the `startAt`/`endAt` query parameters, in whole seconds, which is
//! the unit this API expects. Rate limiting shows up as HTTP 429 with a
//! `Retry-After` header and is surfaced as a structured error so the fetch
//! loop can honor the indicated delay.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::interval::Interval;
use crate::timeframe::Timeframe;

use super::traits::{PageResult, PageSource, ProviderError, ProviderResult, Record, Schema};

/// Default KuCoin REST endpoint
const DEFAULT_BASE_URL: &str = "https://api.kucoin.com";

/// Fallback retry delay when a 429 response carries no Retry-After header
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(10);

/// KuCoin source settings
#[derive(Debug, Clone)]
pub struct KucoinSettings {
    /// REST base URL
    pub base_url: String,
    /// Trading pair, e.g. "BTC-USDT"
    pub symbol: String,
}

impl KucoinSettings {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            symbol: symbol.into(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// KuCoin candle envelope: `{"code": "200000", "data": [[...], ...]}`
#[derive(Debug, Deserialize)]
struct KucoinResponse {
    code: String,
    #[serde(default)]
    data: Vec<Vec<String>>,
    #[serde(default)]
    msg: Option<String>,
}

/// KuCoin klines data source
pub struct KucoinSource {
    http_client: reqwest::Client,
    settings: KucoinSettings,
}

impl KucoinSource {
    pub fn new(http_client: reqwest::Client, settings: KucoinSettings) -> Self {
        Self {
            http_client,
            settings,
        }
    }

    /// KuCoin's name for an interval, e.g. `1d` is "1day"
    fn candle_type(interval: Interval) -> &'static str {
        match interval {
            Interval::Min1 => "1min",
            Interval::Min5 => "5min",
            Interval::Min15 => "15min",
            Interval::Min30 => "30min",
            Interval::Hour1 => "1hour",
            Interval::Hour4 => "4hour",
            Interval::Hour6 => "6hour",
            Interval::Hour12 => "12hour",
            Interval::Day1 => "1day",
        }
    }

    /// Column labels in KuCoin's row order
    fn schema() -> Schema {
        Schema::from_fields(&[
            "timestamp", "open", "close", "high", "low", "volume", "turnover",
        ])
    }

    /// Parse one candle row: `[time, open, close, high, low, volume, turnover]`,
    /// every field a decimal string, time in seconds.
    fn parse_row(row: &[String]) -> ProviderResult<Record> {
        let timestamp_secs: i64 = row
            .first()
            .ok_or_else(|| ProviderError::Parse("empty candle row".to_string()))?
            .parse()
            .map_err(|e| ProviderError::Parse(format!("bad candle timestamp: {}", e)))?;

        let values = row[1..]
            .iter()
            .map(|v| {
                v.parse::<f64>()
                    .map_err(|e| ProviderError::Parse(format!("bad candle field '{}': {}", v, e)))
            })
            .collect::<ProviderResult<Vec<f64>>>()?;

        Ok(Record::new(timestamp_secs * 1_000, values))
    }

    fn retry_after_from(response: &reqwest::Response) -> Duration {
        response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_RETRY_AFTER)
    }
}

#[async_trait]
impl PageSource for KucoinSource {
    fn name(&self) -> &str {
        "kucoin"
    }

    async fn fetch_page(&self, window: &Timeframe) -> ProviderResult<PageResult> {
        let url = format!("{}/api/v1/market/candles", self.settings.base_url);
        let start_at = window.start_secs().to_string();
        let end_at = window.end_secs().to_string();

        debug!(
            symbol = %self.settings.symbol,
            start_at = %start_at,
            end_at = %end_at,
            "requesting candles"
        );

        let response = self
            .http_client
            .get(&url)
            .query(&[
                ("symbol", self.settings.symbol.as_str()),
                ("type", Self::candle_type(window.interval())),
                ("startAt", start_at.as_str()),
                ("endAt", end_at.as_str()),
            ])
            .send()
            .await
            .map_err(|e| ProviderError::Connection(e.to_string()))?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimited {
                retry_after: Self::retry_after_from(&response),
            });
        }
        if !response.status().is_success() {
            return Err(ProviderError::Request(format!(
                "unexpected status {}",
                response.status()
            )));
        }

        let body: KucoinResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        match body.code.as_str() {
            "200000" => {}
            // in-band rate limit code, no delay attached
            "429000" => {
                return Err(ProviderError::RateLimited {
                    retry_after: DEFAULT_RETRY_AFTER,
                })
            }
            other => {
                return Err(ProviderError::Request(format!(
                    "kucoin error {}: {}",
                    other,
                    body.msg.unwrap_or_default()
                )))
            }
        }

        let records = body
            .data
            .iter()
            .map(|row| Self::parse_row(row))
            .collect::<ProviderResult<Vec<Record>>>()?
            .into_iter()
            // the API treats its second bounds loosely, keep the contract strict
            .filter(|r| window.contains(r.timestamp))
            .collect();

        Ok(PageResult {
            records,
            schema: Self::schema(),
        })
    }
}
