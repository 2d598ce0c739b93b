//! # models::trade
//!
//! Defines [`TradeRequest`], a trade signal emitted by the bot that wants a
//! second opinion, and [`TradeScoreResponse`], what the trade endpoints return.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::{is_valid_pair, require_positive, serde_utils, Validate};
use crate::strategy::{Evaluation, Signal};

// ─── Side ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

// ─── TradeRequest ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRequest {
    /// Trading pair, e.g. `"BTC/USDT"`.
    pub pair:        String,
    pub side:        Side,
    pub amount:      f64,
    pub price:       f64,
    #[serde(deserialize_with = "serde_utils::deserialize_iso8601")]
    pub timestamp:   DateTime<Utc>,
    /// Strategy that produced the signal (informational).
    pub strategy:    String,
    /// Bot's own confidence, `0.0 ..= 1.0`.
    pub confidence:  f64,
    pub stop_loss:   f64,
    pub take_profit: f64,
    pub metadata:    HashMap<String, serde_json::Value>,
}

impl Validate for TradeRequest {
    fn validate(&self) -> Result<(), AppError> {
        if !is_valid_pair(&self.pair) {
            return Err(AppError::Validation(format!(
                "pair '{}' must look like BASE/QUOTE", self.pair
            )));
        }
        require_positive("amount", self.amount)?;
        require_positive("price", self.price)?;
        require_positive("stop_loss", self.stop_loss)?;
        require_positive("take_profit", self.take_profit)?;

        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(AppError::Validation(format!(
                "confidence must be within [0, 1], got {}", self.confidence
            )));
        }

        if self.side == Side::Buy {
            if self.take_profit <= self.price {
                return Err(AppError::Validation(
                    "take_profit must be above price for a buy".into(),
                ));
            }
            if self.stop_loss >= self.price {
                return Err(AppError::Validation(
                    "stop_loss must be below price for a buy".into(),
                ));
            }
        }
        Ok(())
    }
}

// ─── TradeScoreResponse ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeScoreResponse {
    /// Always `"success"` on a 200.
    pub status:       String,
    pub symbol:       String,
    pub strategy:     String,
    pub timestamp:    DateTime<Utc>,
    pub total_score:  f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score_percentage: Option<String>,
    pub signal:       Signal,
    pub confidence:   f64,
    pub indicators:   BTreeMap<String, f64>,
    pub reasoning:    String,
    pub trade_info:   TradeRequest,
    pub processed_at: DateTime<Utc>,
    pub sub_scores:   BTreeMap<String, f64>,
}

impl TradeScoreResponse {
    /// Report the evaluation on its native scale.
    pub fn native(trade: TradeRequest, strategy: &str, eval: Evaluation) -> Self {
        Self {
            status:           "success".to_string(),
            symbol:           trade.pair.clone(),
            strategy:         strategy.to_string(),
            timestamp:        Utc::now(),
            total_score:      eval.total_score,
            score_percentage: None,
            signal:           eval.signal,
            confidence:       eval.confidence,
            indicators:       BTreeMap::new(),
            reasoning:        eval.reasoning,
            trade_info:       trade,
            processed_at:     Utc::now(),
            sub_scores:       eval.sub_scores,
        }
    }

    /// Report a `[0, 1]` evaluation as points out of 100 (one decimal),
    /// including indicators and a `"NN.N%"` label.
    pub fn percent(trade: TradeRequest, strategy: &str, eval: Evaluation) -> Self {
        let to_points = |v: f64| (v * 1000.0).round() / 10.0;

        let total = to_points(eval.normalized_score());
        let sub_scores = eval
            .sub_scores
            .iter()
            .map(|(k, v)| (k.clone(), to_points(*v)))
            .collect();

        Self {
            status:           "success".to_string(),
            symbol:           trade.pair.clone(),
            strategy:         strategy.to_string(),
            timestamp:        Utc::now(),
            total_score:      total,
            score_percentage: Some(format!("{total:.1}%")),
            signal:           eval.signal,
            confidence:       eval.confidence,
            indicators:       eval.indicators,
            reasoning:        eval.reasoning,
            trade_info:       trade,
            processed_at:     Utc::now(),
            sub_scores,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload() -> serde_json::Value {
        json!({
            "pair": "BTC/USDT",
            "side": "buy",
            "amount": 0.001,
            "price": 50000.0,
            "timestamp": "2024-01-01T12:00:00.000001",
            "strategy": "BreakoutStrategy",
            "confidence": 0.8,
            "stop_loss": 49000.0,
            "take_profit": 51000.0,
            "metadata": {"rsi": 60}
        })
    }

    fn parse(v: serde_json::Value) -> TradeRequest {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn full_payload_parses_and_validates() {
        let trade = parse(payload());
        assert_eq!(trade.side, Side::Buy);
        assert!(trade.validate().is_ok());
    }

    #[test]
    fn empty_object_fails_to_parse() {
        assert!(serde_json::from_value::<TradeRequest>(json!({})).is_err());
    }

    #[test]
    fn unknown_side_fails_to_parse() {
        let mut v = payload();
        v["side"] = json!("hold");
        assert!(serde_json::from_value::<TradeRequest>(v).is_err());
    }

    #[test]
    fn buy_take_profit_must_exceed_price() {
        let mut v = payload();
        v["take_profit"] = json!(50000.0);
        assert!(matches!(parse(v).validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn buy_stop_loss_must_be_below_price() {
        let mut v = payload();
        v["stop_loss"] = json!(50500.0);
        assert!(parse(v).validate().is_err());
    }

    #[test]
    fn sell_is_not_bound_by_buy_rules() {
        let mut v = payload();
        v["side"] = json!("sell");
        v["stop_loss"] = json!(51000.0);
        v["take_profit"] = json!(49000.0);
        assert!(parse(v).validate().is_ok());
    }

    fn unit_evaluation(total_score: f64) -> Evaluation {
        Evaluation {
            total_score,
            scale:      crate::strategy::Scale::Unit,
            signal:     Signal::Hold,
            confidence: total_score,
            sub_scores: BTreeMap::from([("rsi_score".to_string(), 0.25)]),
            indicators: BTreeMap::new(),
            reasoning:  String::new(),
        }
    }

    #[test]
    fn percent_keeps_one_decimal_on_whole_scores() {
        let resp = TradeScoreResponse::percent(parse(payload()), "BreakoutStrategy", unit_evaluation(0.5));
        assert_eq!(resp.total_score, 50.0);
        assert_eq!(resp.score_percentage.as_deref(), Some("50.0%"));
        assert_eq!(resp.sub_scores["rsi_score"], 25.0);

        let resp = TradeScoreResponse::percent(parse(payload()), "BreakoutStrategy", unit_evaluation(0.4567));
        assert_eq!(resp.score_percentage.as_deref(), Some("45.7%"));
    }

    #[test]
    fn native_has_no_percentage_label() {
        let resp = TradeScoreResponse::native(parse(payload()), "breakout", unit_evaluation(0.5));
        assert_eq!(resp.total_score, 0.5);
        assert!(resp.score_percentage.is_none());
    }

    #[test]
    fn confidence_out_of_range() {
        let mut v = payload();
        v["confidence"] = json!(1.5);
        assert!(parse(v).validate().is_err());
    }
}
