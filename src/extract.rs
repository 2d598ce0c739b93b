//! # extract
//!
//! [`ValidJson`] — like `axum::Json`, but every rejection (bad syntax, missing
//! field, wrong type, wrong content type) and every [`Validate`] failure comes
//! back as a `422` [`AppError::Validation`] in the gateway's error shape.

use axum::{
    extract::{FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;

use crate::error::AppError;
use crate::models::Validate;

pub struct ValidJson<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::Validation(rejection.body_text()))?;
        value.validate()?;
        Ok(Self(value))
    }
}
