//! # error
//!
//! Centralised application error type.
//!
//! Every handler returns `Result<_, AppError>`. The two validation tiers map
//! to different status codes:
//!
//! | Variant      | Status | Meaning                                         |
//! |--------------|--------|-------------------------------------------------|
//! | `Validation` | 422    | payload is malformed / missing / wrong type     |
//! | `BadRequest` | 400    | payload is well-formed but breaks a domain rule |
//! | `Upstream`   | 502    | market data API failed                          |
//! | `Internal`   | 500    | anything else                                   |

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::warn;

use crate::strategy::StrategyError;

#[derive(Debug, Error)]
pub enum AppError {
    /// Schema-level failure: the body could not be parsed into the model, or a
    /// field violates its declared constraints.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The request payload was syntactically correct but semantically invalid.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The market data source could not deliver candles.
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Catch-all for unexpected failures.
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Upstream(_)   => StatusCode::BAD_GATEWAY,
            AppError::Internal(_)   => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StrategyError> for AppError {
    fn from(err: StrategyError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Validation(msg) | AppError::BadRequest(msg) | AppError::Upstream(msg) => {
                msg.clone()
            }
            AppError::Internal(err) => format!("Internal error: {err}"),
        };

        warn!(status = status.as_u16(), error = %message, "request rejected");

        let body = Json(json!({
            "ok":    false,
            "error": message,
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_and_domain_errors_use_distinct_status_codes() {
        assert_eq!(
            AppError::Validation("missing field `pair`".into()).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AppError::BadRequest("not enough candles".into()).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn strategy_errors_are_domain_errors() {
        let err: AppError = StrategyError::InsufficientCandles { required: 20, actual: 10 }.into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(err.to_string().contains("20"));
    }
}
