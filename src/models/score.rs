//! # models::score
//!
//! Payloads of `POST /score`: a candle history plus the name of the strategy
//! that should score it.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::{is_valid_pair, Candle, Timeframe, Validate};
use crate::strategy::{Evaluation, Signal};

/// Upper bound on candles per request.
pub const MAX_REQUEST_CANDLES: usize = 1000;

/// Free-form strategy parameters, e.g. `{"lookback_period": 20}`.
pub type Parameters = HashMap<String, serde_json::Value>;

// ─── Request ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreRequest {
    pub symbol: String,
    /// Every candle must carry this timeframe.
    #[serde(default)]
    pub timeframe: Timeframe,
    /// Ordered oldest → newest.
    pub candles: Vec<Candle>,
    pub strategy_name: String,
    #[serde(default)]
    pub parameters: Option<Parameters>,
    #[serde(default = "default_true")]
    pub include_indicators: bool,
    #[serde(default = "default_true")]
    pub include_signals: bool,
}

fn default_true() -> bool {
    true
}

impl Validate for ScoreRequest {
    fn validate(&self) -> Result<(), AppError> {
        if !is_valid_pair(&self.symbol) {
            return Err(AppError::Validation(format!(
                "symbol '{}' must look like BASE/QUOTE", self.symbol
            )));
        }
        if self.strategy_name.trim().is_empty() {
            return Err(AppError::Validation("strategy_name must not be empty".into()));
        }
        if self.candles.len() > MAX_REQUEST_CANDLES {
            return Err(AppError::Validation(format!(
                "at most {MAX_REQUEST_CANDLES} candles are accepted, got {}",
                self.candles.len()
            )));
        }

        for (i, candle) in self.candles.iter().enumerate() {
            candle
                .validate()
                .map_err(|e| AppError::Validation(format!("candles[{i}]: {e}")))?;
            if candle.timeframe != self.timeframe {
                return Err(AppError::Validation(format!(
                    "candles[{i}]: timeframe {} does not match request timeframe {}",
                    candle.timeframe.as_str(),
                    self.timeframe.as_str()
                )));
            }
        }

        for pair in self.candles.windows(2) {
            if pair[1].timestamp <= pair[0].timestamp {
                return Err(AppError::Validation(
                    "candles must be sorted by strictly increasing timestamp".into(),
                ));
            }
            if pair[1].symbol != pair[0].symbol {
                return Err(AppError::Validation(
                    "all candles must share the same symbol".into(),
                ));
            }
        }
        Ok(())
    }
}

// ─── Response ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreResponse {
    pub symbol:     String,
    pub strategy:   String,
    pub timestamp:  DateTime<Utc>,
    /// Normalised to `[0, 1]` regardless of the strategy's native scale.
    pub score:      f64,
    pub confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signal:     Option<Signal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning:  Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indicators: Option<BTreeMap<String, f64>>,
    pub sub_scores: BTreeMap<String, f64>,
}

impl ScoreResponse {
    pub fn from_evaluation(request: &ScoreRequest, strategy: &str, eval: Evaluation) -> Self {
        let score = eval.normalized_score();
        let (signal, reasoning) = if request.include_signals {
            (Some(eval.signal), Some(eval.reasoning))
        } else {
            (None, None)
        };

        Self {
            symbol:     request.symbol.clone(),
            strategy:   strategy.to_string(),
            timestamp:  Utc::now(),
            score,
            confidence: eval.confidence,
            signal,
            reasoning,
            indicators: request.include_indicators.then_some(eval.indicators),
            sub_scores: eval.sub_scores,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candles(count: usize) -> Vec<Candle> {
        (0..count)
            .map(|i| {
                let price = 100.0 + i as f64;
                Candle {
                    timestamp: 1_700_000_000_000 + i as i64 * 300_000,
                    open:      price,
                    high:      price + 1.0,
                    low:       price - 1.0,
                    close:     price,
                    volume:    1000.0 + i as f64,
                    symbol:    "BTC/USDT".into(),
                    timeframe: Timeframe::FiveMinutes,
                }
            })
            .collect()
    }

    fn request(candles: Vec<Candle>) -> ScoreRequest {
        ScoreRequest {
            symbol: "BTC/USDT".into(),
            timeframe: Timeframe::FiveMinutes,
            candles,
            strategy_name: "BreakoutStrategy".into(),
            parameters: None,
            include_indicators: true,
            include_signals: true,
        }
    }

    #[test]
    fn optional_fields_take_defaults() {
        let req: ScoreRequest = serde_json::from_str(
            r#"{"symbol":"BTC/USDT","candles":[],"strategy_name":"BreakoutStrategy"}"#,
        )
        .unwrap();
        assert_eq!(req.timeframe, Timeframe::FiveMinutes);
        assert!(req.include_indicators);
        assert!(req.include_signals);
        assert!(req.parameters.is_none());
    }

    #[test]
    fn short_history_is_not_a_schema_error() {
        // minimum history is a domain rule enforced by the strategy
        assert!(request(candles(10)).validate().is_ok());
    }

    #[test]
    fn unsorted_candles_are_rejected() {
        let mut c = candles(5);
        c.swap(1, 2);
        assert!(matches!(request(c).validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn mixed_symbols_are_rejected() {
        let mut c = candles(5);
        c[3].symbol = "ETH/USDT".into();
        assert!(matches!(request(c).validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn candle_timeframe_must_match_request() {
        let mut c = candles(5);
        c[4].timeframe = Timeframe::OneHour;
        let err = request(c).validate().unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(err.to_string().contains("candles[4]"));
    }

    #[test]
    fn response_reports_points_scale_as_unit_score() {
        let eval = Evaluation {
            total_score: 72.0,
            scale:       crate::strategy::Scale::Points,
            signal:      Signal::Hold,
            confidence:  0.72,
            sub_scores:  BTreeMap::from([("trigger_score".to_string(), 20.0)]),
            indicators:  BTreeMap::from([("close".to_string(), 105.0)]),
            reasoning:   "trigger confirmed".into(),
        };
        let resp = ScoreResponse::from_evaluation(&request(candles(20)), "breakout", eval.clone());
        assert_eq!(resp.score, 0.72);
        assert_eq!(resp.signal, Some(Signal::Hold));
        assert_eq!(resp.reasoning.as_deref(), Some("trigger confirmed"));
        assert_eq!(resp.sub_scores["trigger_score"], 20.0);

        let mut quiet = request(candles(20));
        quiet.include_signals = false;
        quiet.include_indicators = false;
        let resp = ScoreResponse::from_evaluation(&quiet, "breakout", eval);
        assert_eq!(resp.score, 0.72);
        assert!(resp.signal.is_none() && resp.reasoning.is_none() && resp.indicators.is_none());
    }

    #[test]
    fn oversized_history_is_rejected() {
        assert!(request(candles(MAX_REQUEST_CANDLES + 1)).validate().is_err());
    }

    #[test]
    fn bad_candle_reports_its_index() {
        let mut c = candles(3);
        c[2].low = c[2].high + 1.0;
        let err = request(c).validate().unwrap_err();
        assert!(err.to_string().contains("candles[2]"));
    }
}
