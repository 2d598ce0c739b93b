//! # state
//!
//! Shared application state injected into every handler and the trade
//! consumer.
//!
//! Everything here is either immutable after startup (config, strategy
//! registry, market client) or internally synchronised (bus, counters), so
//! `Arc<AppState>` is shared without locks. No request can change how another
//! request is validated or scored.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::bus::{InMemoryBus, MessageBus};
use crate::config::GatewayConfig;
use crate::market::MarketData;
use crate::strategy::StrategyRegistry;

// ─── AppState ─────────────────────────────────────────────────────────────────

pub struct AppState {
    pub config:     Arc<GatewayConfig>,
    pub strategies: Arc<StrategyRegistry>,
    pub market:     MarketData,
    pub bus:        Arc<dyn MessageBus>,
    pub started_at: Instant,

    /// Evaluations served over HTTP and the consumer. Monotonic.
    pub score_count: AtomicU64,
}

impl AppState {
    pub fn new(config: GatewayConfig, market: MarketData, bus: Arc<dyn MessageBus>) -> Self {
        Self {
            config: Arc::new(config),
            strategies: Arc::new(StrategyRegistry::default()),
            market,
            bus,
            started_at: Instant::now(),
            score_count: AtomicU64::new(0),
        }
    }

    pub fn record_score(&self) -> u64 {
        self.score_count.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn scores_served(&self) -> u64 {
        self.score_count.load(Ordering::Relaxed)
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

/// Convenience alias used by the router and handlers.
pub type SharedState = Arc<AppState>;

/// Wire production state from config: candle source per `MARKET_URL`,
/// in-memory bus sized by `BUS_CAPACITY`.
pub fn build_state(config: GatewayConfig) -> SharedState {
    let market = MarketData::from_config(&config);
    let bus: Arc<dyn MessageBus> = Arc::new(InMemoryBus::new(config.bus_capacity));
    Arc::new(AppState::new(config, market, bus))
}

/// Synthetic candles, default config, bus not started.
#[cfg(test)]
pub fn test_state() -> SharedState {
    build_state(GatewayConfig::default())
}
