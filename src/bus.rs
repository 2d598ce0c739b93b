//! # bus — message bus seam
//!
//! The gateway consumes trade signals from `trade.raw` and publishes scores
//! to `trade.score`. [`MessageBus`] is the producer/consumer seam;
//! [`InMemoryBus`] implements it with one `tokio::sync::broadcast` channel per
//! topic, so publishers never wait on slow subscribers (a lagging subscriber
//! drops the oldest messages and is told how many).
//!
//! No Kafka client is wired in: [`InMemoryBus`] reports its broker as
//! `"in-memory"` so `/health` never claims a broker connection it lacks.
//!
//! Lifecycle: `start()` before serving, `stop()` after graceful shutdown.
//! Publishing on a stopped bus fails with [`BusError::NotConnected`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, info};
use uuid::Uuid;

// ─── Message ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusMessage {
    pub id:           Uuid,
    pub topic:        String,
    pub payload:      serde_json::Value,
    pub published_at: DateTime<Utc>,
}

impl BusMessage {
    pub fn new(topic: &str, payload: serde_json::Value) -> Self {
        Self {
            id:           Uuid::new_v4(),
            topic:        topic.to_string(),
            payload,
            published_at: Utc::now(),
        }
    }
}

// ─── Errors ───────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum BusError {
    #[error("message bus at {0} is not connected")]
    NotConnected(String),
}

impl From<BusError> for crate::error::AppError {
    fn from(err: BusError) -> Self {
        crate::error::AppError::Internal(anyhow::Error::new(err))
    }
}

// ─── Trait ────────────────────────────────────────────────────────────────────

#[async_trait]
pub trait MessageBus: Send + Sync {
    async fn start(&self) -> Result<(), BusError>;
    async fn stop(&self);

    /// Publishes `payload`; returns the number of subscribers that got it.
    async fn publish(&self, topic: &str, payload: serde_json::Value) -> Result<usize, BusError>;

    fn subscribe(&self, topic: &str) -> broadcast::Receiver<BusMessage>;

    fn is_connected(&self) -> bool;

    /// Broker reported by `/health`.
    fn broker(&self) -> &str;
}

// ─── In-memory implementation ─────────────────────────────────────────────────

pub struct InMemoryBus {
    capacity:  usize,
    connected: AtomicBool,
    topics:    RwLock<HashMap<String, broadcast::Sender<BusMessage>>>,
}

impl InMemoryBus {
    pub const BROKER: &'static str = "in-memory";

    pub fn new(capacity: usize) -> Self {
        Self {
            capacity:  capacity.max(1),
            connected: AtomicBool::new(false),
            topics:    RwLock::new(HashMap::new()),
        }
    }

    fn sender(&self, topic: &str) -> broadcast::Sender<BusMessage> {
        if let Ok(topics) = self.topics.read() {
            if let Some(tx) = topics.get(topic) {
                return tx.clone();
            }
        }
        let mut topics = match self.topics.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        topics
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }
}

#[async_trait]
impl MessageBus for InMemoryBus {
    async fn start(&self) -> Result<(), BusError> {
        self.connected.store(true, Ordering::SeqCst);
        info!(broker = Self::BROKER, capacity = self.capacity, "📡 Message bus connected");
        Ok(())
    }

    async fn stop(&self) {
        if self.connected.swap(false, Ordering::SeqCst) {
            info!(broker = Self::BROKER, "Message bus disconnected");
        }
    }

    async fn publish(&self, topic: &str, payload: serde_json::Value) -> Result<usize, BusError> {
        if !self.is_connected() {
            return Err(BusError::NotConnected(Self::BROKER.to_string()));
        }
        let message = BusMessage::new(topic, payload);
        let id = message.id;
        // no subscribers is not an error: the message is simply dropped
        let delivered = self.sender(topic).send(message).unwrap_or(0);
        debug!(topic, %id, delivered, "message published");
        Ok(delivered)
    }

    fn subscribe(&self, topic: &str) -> broadcast::Receiver<BusMessage> {
        self.sender(topic).subscribe()
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn broker(&self) -> &str {
        Self::BROKER
    }
}
