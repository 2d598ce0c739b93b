//! # config
//!
//! Gateway configuration read from environment variables (`.env` is loaded
//! by `main` before this runs).
//!
//! | Variable              | Default         | Description                              |
//! |-----------------------|-----------------|------------------------------------------|
//! | `BIND_ADDR`           | `0.0.0.0:8000`  | Address Axum listens on                  |
//! | `KAFKA_BROKER`        | `kafka:9092`    | Broker for a Kafka-backed bus            |
//! | `TRADE_RAW_TOPIC`     | `trade.raw`     | Topic the consumer reads trade signals   |
//! | `TRADE_SCORE_TOPIC`   | `trade.score`   | Topic scored trades are published to     |
//! | `CONSUMER_GROUP`      | `scoring-gateway` | Consumer group for a Kafka-backed bus  |
//! | `BUS_CAPACITY`        | `1024`          | Per-topic buffer of the message bus      |
//! | `MARKET_URL`          | unset           | Candle API; unset → synthetic candles    |
//! | `MARKET_TIMEOUT_SECS` | `5`             | Candle API request timeout               |
//! | `MARKET_CANDLE_LIMIT` | `100`           | Candles fetched per trade                |
//!
//! `KAFKA_BROKER` and `CONSUMER_GROUP` are only logged at startup: the
//! in-memory bus has no broker and no consumer groups.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub bind_addr:         SocketAddr,
    /// Unused by the in-memory bus.
    pub kafka_broker:      String,
    pub trade_raw_topic:   String,
    pub trade_score_topic: String,
    /// Unused by the in-memory bus.
    pub consumer_group:    String,
    pub bus_capacity:      usize,
    /// Base URL of the candle API; `None` means synthetic candles.
    pub market_url:        Option<String>,
    pub market_timeout:    Duration,
    pub candle_limit:      usize,
}

impl GatewayConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let bind_addr = env_string("BIND_ADDR", "0.0.0.0:8000")
            .parse()
            .context("BIND_ADDR must be a socket address, e.g. 0.0.0.0:8000")?;

        Ok(Self {
            bind_addr,
            kafka_broker:      env_string("KAFKA_BROKER", "kafka:9092"),
            trade_raw_topic:   env_string("TRADE_RAW_TOPIC", "trade.raw"),
            trade_score_topic: env_string("TRADE_SCORE_TOPIC", "trade.score"),
            consumer_group:    env_string("CONSUMER_GROUP", "scoring-gateway"),
            bus_capacity:      env_usize("BUS_CAPACITY", 1024).max(1),
            market_url:        std::env::var("MARKET_URL")
                .ok()
                .map(|u| u.trim_end_matches('/').to_string())
                .filter(|u| !u.is_empty()),
            market_timeout:    Duration::from_secs(env_u64("MARKET_TIMEOUT_SECS", 5)),
            candle_limit:      env_usize("MARKET_CANDLE_LIMIT", 100).max(1),
        })
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind_addr:         SocketAddr::from(([0, 0, 0, 0], 8000)),
            kafka_broker:      "kafka:9092".to_string(),
            trade_raw_topic:   "trade.raw".to_string(),
            trade_score_topic: "trade.score".to_string(),
            consumer_group:    "scoring-gateway".to_string(),
            bus_capacity:      1024,
            market_url:        None,
            market_timeout:    Duration::from_secs(5),
            candle_limit:      100,
        }
    }
}

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}
fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = GatewayConfig::default();
        assert_eq!(cfg.bind_addr.port(), 8000);
        assert_eq!(cfg.trade_raw_topic, "trade.raw");
        assert_eq!(cfg.trade_score_topic, "trade.score");
        assert!(cfg.market_url.is_none());
        assert_eq!(cfg.candle_limit, 100);
        assert_eq!(cfg.consumer_group, "scoring-gateway");
    }

    #[test]
    fn unparsable_numbers_fall_back() {
        // key that no test sets
        assert_eq!(env_u64("SCORING_GATEWAY_TEST_UNSET_KEY", 7), 7);
    }
}
