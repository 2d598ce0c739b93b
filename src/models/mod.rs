//! # models
//!
//! Request / response payloads of the gateway and their schema rules.
//!
//! Serde handles presence and type checks; [`Validate`] layers the field
//! constraints on top. Both failure kinds surface as `422` through
//! [`crate::extract::ValidJson`].

pub mod candle;
pub mod score;
pub mod serde_utils;
pub mod trade;

pub use candle::{Candle, Timeframe};
pub use score::{Parameters, ScoreRequest, ScoreResponse};
pub use trade::{Side, TradeRequest};

use crate::error::AppError;

/// Field-level constraints that serde alone cannot express.
pub trait Validate {
    fn validate(&self) -> Result<(), AppError>;
}

/// `^[A-Z0-9]+/[A-Z0-9]+$`, e.g. `BTC/USDT`.
pub fn is_valid_pair(pair: &str) -> bool {
    let is_part = |s: &str| {
        !s.is_empty() && s.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
    };
    match pair.split_once('/') {
        Some((base, quote)) => is_part(base) && is_part(quote),
        None => false,
    }
}

pub(crate) fn require_positive(field: &str, value: f64) -> Result<(), AppError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(AppError::Validation(format!("{field} must be greater than 0, got {value}")))
    }
}
