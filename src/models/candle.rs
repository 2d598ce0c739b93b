//! # models::candle
//!
//! Defines [`Candle`], one OHLCV bar for a trading pair, and the supported
//! [`Timeframe`]s.

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::{is_valid_pair, require_positive, Validate};

// ─── Timeframe ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1m")]
    OneMinute,
    #[default]
    #[serde(rename = "5m")]
    FiveMinutes,
    #[serde(rename = "15m")]
    FifteenMinutes,
    #[serde(rename = "30m")]
    ThirtyMinutes,
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "4h")]
    FourHours,
    #[serde(rename = "1d")]
    OneDay,
}

impl Timeframe {
    /// Bar length in milliseconds.
    pub fn millis(&self) -> i64 {
        const MINUTE: i64 = 60_000;
        match self {
            Timeframe::OneMinute      => MINUTE,
            Timeframe::FiveMinutes    => 5 * MINUTE,
            Timeframe::FifteenMinutes => 15 * MINUTE,
            Timeframe::ThirtyMinutes  => 30 * MINUTE,
            Timeframe::OneHour        => 60 * MINUTE,
            Timeframe::FourHours      => 240 * MINUTE,
            Timeframe::OneDay         => 1_440 * MINUTE,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::OneMinute      => "1m",
            Timeframe::FiveMinutes    => "5m",
            Timeframe::FifteenMinutes => "15m",
            Timeframe::ThirtyMinutes  => "30m",
            Timeframe::OneHour        => "1h",
            Timeframe::FourHours      => "4h",
            Timeframe::OneDay         => "1d",
        }
    }
}

// ─── Candle ───────────────────────────────────────────────────────────────────

/// A single OHLCV bar as delivered by an exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Bar open time, Unix epoch milliseconds.
    pub timestamp: i64,
    pub open:      f64,
    pub high:      f64,
    pub low:       f64,
    pub close:     f64,
    pub volume:    f64,
    /// Trading pair, e.g. `"BTC/USDT"`.
    pub symbol:    String,
    #[serde(default)]
    pub timeframe: Timeframe,
}

impl Candle {
    /// `(high + low + close) / 3`
    #[inline]
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }
}

impl Validate for Candle {
    fn validate(&self) -> Result<(), AppError> {
        require_positive("open", self.open)?;
        require_positive("high", self.high)?;
        require_positive("low", self.low)?;
        require_positive("close", self.close)?;

        if !(self.volume.is_finite() && self.volume >= 0.0) {
            return Err(AppError::Validation(format!(
                "volume must be >= 0, got {}", self.volume
            )));
        }
        if !is_valid_pair(&self.symbol) {
            return Err(AppError::Validation(format!(
                "candle symbol '{}' must look like BASE/QUOTE", self.symbol
            )));
        }
        if self.high <= self.low {
            return Err(AppError::Validation(format!(
                "high ({}) must be greater than low ({})", self.high, self.low
            )));
        }
        if self.high < self.open || self.high < self.close {
            return Err(AppError::Validation(
                "high must be >= open and close".into(),
            ));
        }
        if self.low > self.open || self.low > self.close {
            return Err(AppError::Validation(
                "low must be <= open and close".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(open: f64, high: f64, low: f64, close: f64) -> Candle {
        Candle {
            timestamp: 1_640_995_200_000,
            open,
            high,
            low,
            close,
            volume: 1000.5,
            symbol: "BTC/USDT".into(),
            timeframe: Timeframe::FiveMinutes,
        }
    }

    #[test]
    fn well_formed_candle_passes() {
        assert!(candle(50000.0, 51000.0, 49000.0, 50500.0).validate().is_ok());
    }

    #[test]
    fn inverted_range_is_rejected() {
        assert!(candle(100.0, 99.0, 101.0, 100.0).validate().is_err());
    }

    #[test]
    fn close_outside_range_is_rejected() {
        assert!(candle(100.0, 101.0, 99.0, 102.0).validate().is_err());
        assert!(candle(100.0, 101.0, 99.0, 98.0).validate().is_err());
    }

    #[test]
    fn timeframe_defaults_to_five_minutes() {
        let c: Candle = serde_json::from_str(
            r#"{"timestamp":1,"open":1.0,"high":2.0,"low":0.5,"close":1.5,"volume":0,"symbol":"ETH/USDT"}"#,
        )
        .unwrap();
        assert_eq!(c.timeframe, Timeframe::FiveMinutes);
        assert_eq!(c.timeframe.millis(), 300_000);
    }

    #[test]
    fn unknown_timeframe_fails_to_parse() {
        let res: Result<Candle, _> = serde_json::from_str(
            r#"{"timestamp":1,"open":1.0,"high":2.0,"low":0.5,"close":1.5,"volume":0,"symbol":"ETH/USDT","timeframe":"7m"}"#,
        );
        assert!(res.is_err());
    }
}
