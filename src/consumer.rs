//! # consumer — `trade.raw` → `trade.score`
//!
//! Background worker started by `main`. For every trade signal on the raw
//! topic it loads candles for the pair, scores them and publishes the result
//! (with the incoming signal as `trade_info`) to the score topic.
//!
//! Bad messages and scoring failures are logged and skipped; only the
//! shutdown signal ends the loop.

use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::{broadcast, watch};
use tracing::{debug, error, info, warn};

use crate::bus::BusMessage;
use crate::error::AppError;
use crate::models::{Parameters, Side};
use crate::state::SharedState;

const REQUIRED_FIELDS: [&str; 5] = ["pair", "side", "amount", "price", "timestamp"];

/// The parts of a raw trade message the consumer relies on.
#[derive(Debug, Deserialize)]
struct RawTrade {
    pair:       String,
    #[allow(dead_code)]
    side:       Side,
    amount:     f64,
    price:      f64,
    #[serde(default)]
    strategy:   Option<String>,
    #[serde(default)]
    parameters: Option<Parameters>,
}

/// Checks required fields, `side ∈ {buy, sell}` and positive price/amount.
fn parse_trade(payload: &Value) -> Result<RawTrade, AppError> {
    let obj = payload
        .as_object()
        .ok_or_else(|| AppError::Validation("trade message must be a JSON object".into()))?;

    if let Some(missing) = REQUIRED_FIELDS
        .iter()
        .find(|f| obj.get(**f).map_or(true, Value::is_null))
    {
        return Err(AppError::Validation(format!("missing required field '{missing}'")));
    }

    let trade: RawTrade = serde_json::from_value(payload.clone())
        .map_err(|e| AppError::Validation(e.to_string()))?;

    if !(trade.price.is_finite() && trade.price > 0.0) {
        return Err(AppError::Validation(format!("price must be > 0, got {}", trade.price)));
    }
    if !(trade.amount.is_finite() && trade.amount > 0.0) {
        return Err(AppError::Validation(format!("amount must be > 0, got {}", trade.amount)));
    }
    Ok(trade)
}

/// Scores one raw trade message into the `trade.score` payload.
pub async fn score_message(state: &SharedState, payload: &Value) -> Result<Value, AppError> {
    let trade = parse_trade(payload)?;

    // the named strategy when it resolves, otherwise the composite scorer
    let strategy = trade
        .strategy
        .as_deref()
        .and_then(|name| state.strategies.get(name))
        .unwrap_or_else(|| state.strategies.composite());

    let candles = state.market.candles_for_trade(&trade.pair, trade.price).await?;
    let params = trade.parameters.unwrap_or_default();
    let eval = strategy.evaluate(&candles, &params)?;
    state.record_score();

    Ok(json!({
        "symbol":       trade.pair,
        "strategy":     strategy.name(),
        "timestamp":    Utc::now(),
        "total_score":  eval.total_score,
        "signal":       eval.signal,
        "confidence":   eval.confidence,
        "indicators":   eval.indicators,
        "reasoning":    eval.reasoning,
        "sub_scores":   eval.sub_scores,
        "trade_info":   payload,
        "processed_at": Utc::now(),
    }))
}

// ─── Worker ───────────────────────────────────────────────────────────────────

pub struct TradeConsumer {
    state: SharedState,
    rx:    broadcast::Receiver<BusMessage>,
}

impl TradeConsumer {
    /// Subscribes immediately so nothing published after this call is missed.
    pub fn new(state: SharedState) -> Self {
        let rx = state.bus.subscribe(&state.config.trade_raw_topic);
        Self { state, rx }
    }

    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let raw_topic = self.state.config.trade_raw_topic.clone();
        let score_topic = self.state.config.trade_score_topic.clone();
        info!(
            topic = %raw_topic,
            group = %self.state.config.consumer_group,
            "🎧 Trade consumer started"
        );

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                result = self.rx.recv() => match result {
                    Ok(message) => self.handle(message, &score_topic).await,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "Trade consumer lagged behind — messages dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            }
        }

        info!("Trade consumer stopped");
    }

    async fn handle(&self, message: BusMessage, score_topic: &str) {
        debug!(id = %message.id, "trade message received");

        let scored = match score_message(&self.state, &message.payload).await {
            Ok(scored) => scored,
            Err(AppError::Validation(reason)) => {
                warn!(id = %message.id, %reason, "Invalid trade message skipped");
                return;
            }
            Err(e) => {
                error!(id = %message.id, error = %e, "Trade scoring failed");
                return;
            }
        };

        let pair = scored["symbol"].as_str().unwrap_or_default().to_string();
        let total = scored["total_score"].as_f64().unwrap_or_default();
        match self.state.bus.publish(score_topic, scored).await {
            Ok(_) => info!(%pair, total, "📤 Score published"),
            Err(e) => error!(%pair, error = %e, "Failed to publish score"),
        }
    }
}

/// Subscribes and runs the consumer until `shutdown` flips to `true`.
pub async fn run_trade_consumer(state: SharedState, shutdown: watch::Receiver<bool>) {
    TradeConsumer::new(state).run(shutdown).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_state;
    use std::time::Duration;

    fn raw_trade() -> Value {
        json!({
            "pair": "BTC/USDT",
            "side": "buy",
            "amount": 0.001,
            "price": 50000.0,
            "timestamp": "2024-01-01T12:00:00"
        })
    }

    #[test]
    fn message_validation() {
        assert!(parse_trade(&raw_trade()).is_ok());

        let mut v = raw_trade();
        v.as_object_mut().unwrap().remove("timestamp");
        assert!(parse_trade(&v).is_err());

        let mut v = raw_trade();
        v["side"] = json!("short");
        assert!(parse_trade(&v).is_err());

        let mut v = raw_trade();
        v["price"] = json!(0);
        assert!(parse_trade(&v).is_err());

        let mut v = raw_trade();
        v["amount"] = json!(-1.0);
        assert!(parse_trade(&v).is_err());

        assert!(parse_trade(&json!([1, 2])).is_err());
    }

    #[tokio::test]
    async fn unknown_strategy_falls_back_to_composite() {
        let state = test_state();
        let mut v = raw_trade();
        v["strategy"] = json!("Martingale");
        let scored = score_message(&state, &v).await.unwrap();
        assert_eq!(scored["strategy"], "BreakoutStrategy");
        assert_eq!(scored["trade_info"]["pair"], "BTC/USDT");
        assert!(scored.get("processed_at").is_some());
    }

    #[tokio::test]
    async fn consumer_publishes_scores_and_skips_bad_messages() {
        let state = test_state();
        state.bus.start().await.unwrap();

        let mut scores = state.bus.subscribe(&state.config.trade_score_topic);
        let consumer = TradeConsumer::new(state.clone());
        let (tx, rx) = watch::channel(false);
        let worker = tokio::spawn(consumer.run(rx));

        let raw = state.config.trade_raw_topic.clone();
        state.bus.publish(&raw, json!({"pair": "BTC/USDT"})).await.unwrap();
        let mut trend = raw_trade();
        trend["strategy"] = json!("trend");
        state.bus.publish(&raw, trend).await.unwrap();

        let msg = tokio::time::timeout(Duration::from_secs(5), scores.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(msg.payload["strategy"], "TrendStrategy");
        assert_eq!(msg.payload["trade_info"]["side"], "buy");
        // the invalid message produced nothing
        assert!(scores.try_recv().is_err());
        assert_eq!(state.scores_served(), 1);

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), worker)
            .await
            .unwrap()
            .unwrap();
    }
}
