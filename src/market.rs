//! # market — candle history for trade signals
//!
//! Trade signals carry no candles, so the trade endpoints and the consumer
//! ask this module for the recent 5-minute history of the pair.
//!
//! ## Data Sources
//! 1. Candle API — when `MARKET_URL` is set:
//!    `GET {MARKET_URL}/api/v1/candles?symbol=..&timeframe=5m&limit=N`
//! 2. Synthetic — a deterministic ramp of N candles around the trade price
//!    (dev / test without a market feed)

use std::time::Duration;

use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::GatewayConfig;
use crate::error::AppError;
use crate::models::{Candle, Timeframe, Validate};

/// Candle as returned by the candle API (symbol is implied by the query).
#[derive(Debug, Deserialize)]
struct ApiCandle {
    timestamp: i64,
    open:      f64,
    high:      f64,
    low:       f64,
    close:     f64,
    volume:    f64,
}

/// The API answers either a bare array or `{"candles": [...]}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ApiResponse {
    Bare(Vec<ApiCandle>),
    Wrapped { candles: Vec<ApiCandle> },
}

impl ApiResponse {
    fn into_candles(self) -> Vec<ApiCandle> {
        match self {
            ApiResponse::Bare(c) | ApiResponse::Wrapped { candles: c } => c,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MarketData {
    client:   reqwest::Client,
    base_url: Option<String>,
    timeout:  Duration,
    limit:    usize,
}

impl MarketData {
    pub fn new(client: reqwest::Client, base_url: Option<String>, timeout: Duration, limit: usize) -> Self {
        Self { client, base_url, timeout, limit: limit.max(1) }
    }

    pub fn from_config(config: &GatewayConfig) -> Self {
        Self::new(
            reqwest::Client::new(),
            config.market_url.clone(),
            config.market_timeout,
            config.candle_limit,
        )
    }

    /// Synthetic-only source.
    #[cfg(test)]
    pub fn synthetic(limit: usize) -> Self {
        Self::new(reqwest::Client::new(), None, Duration::from_secs(5), limit)
    }

    pub fn is_remote(&self) -> bool {
        self.base_url.is_some()
    }

    /// Recent 5-minute candles for `pair`, oldest first.
    ///
    /// `price` anchors the synthetic series when no candle API is configured.
    pub async fn candles_for_trade(&self, pair: &str, price: f64) -> Result<Vec<Candle>, AppError> {
        let candles = match &self.base_url {
            Some(base) => self.fetch(base, pair).await?,
            None => synthetic_candles(pair, price, self.limit, Utc::now().timestamp_millis()),
        };

        if candles.is_empty() {
            return Err(AppError::BadRequest(format!("no candle data available for {pair}")));
        }
        debug!(pair, count = candles.len(), remote = self.is_remote(), "candles loaded");
        Ok(candles)
    }

    async fn fetch(&self, base: &str, pair: &str) -> Result<Vec<Candle>, AppError> {
        let url = format!("{base}/api/v1/candles");
        let limit = self.limit.to_string();

        let resp = self
            .client
            .get(&url)
            .query(&[
                ("symbol", pair),
                ("timeframe", Timeframe::FiveMinutes.as_str()),
                ("limit", limit.as_str()),
            ])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                warn!(pair, error = %e, "Candle API unreachable");
                AppError::Upstream(format!("candle API unreachable: {e}"))
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            warn!(pair, %status, "Candle API returned an error");
            return Err(AppError::Upstream(format!("candle API returned {status}")));
        }

        let body: ApiResponse = resp
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("failed to parse candle API response: {e}")))?;

        let mut candles: Vec<Candle> = body
            .into_candles()
            .into_iter()
            .map(|c| Candle {
                timestamp: c.timestamp,
                open:      c.open,
                high:      c.high,
                low:       c.low,
                close:     c.close,
                volume:    c.volume,
                symbol:    pair.to_string(),
                timeframe: Timeframe::FiveMinutes,
            })
            .collect();

        // upstream rows get the same checks as candles posted to /score
        for (i, candle) in candles.iter().enumerate() {
            if let Err(e) = candle.validate() {
                warn!(pair, row = i, error = %e, "Candle API returned a malformed candle");
                return Err(AppError::Upstream(format!("candle API row {i} is malformed: {e}")));
            }
        }
        candles.sort_by_key(|c| c.timestamp);
        Ok(candles)
    }
}

/// `count` 5-minute candles ending at `now_ms`, drifting 0.1 % per bar
/// through `price` at the midpoint.
pub fn synthetic_candles(pair: &str, price: f64, count: usize, now_ms: i64) -> Vec<Candle> {
    let step = Timeframe::FiveMinutes.millis();
    let mid = count as f64 / 2.0;

    (0..count)
        .map(|i| {
            let close = price * (1.0 + (i as f64 - mid) * 0.001);
            Candle {
                timestamp: now_ms - (count - i) as i64 * step,
                open:      close * 0.999,
                high:      close * 1.002,
                low:       close * 0.998,
                close,
                volume:    1000.0 + i as f64 * 10.0,
                symbol:    pair.to_string(),
                timeframe: Timeframe::FiveMinutes,
            }
        })
        .collect()
}
