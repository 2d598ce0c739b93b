//! # routes
//!
//! HTTP surface of the gateway, one module per concern. Each module exposes
//! `routes()` and [`crate::app::build_router`] merges them.

pub mod score;
pub mod system;
pub mod trade;
