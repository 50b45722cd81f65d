use crate::error::PlatelabError;
use axum::Json;
use axum::extract::rejection::JsonRejection;

pub mod dashboard;
pub mod experiments;
pub mod pages;
pub mod plates;
pub mod reagents;

/// Malformed bodies get the standard error envelope instead of axum's plain-text rejection.
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, PlatelabError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| PlatelabError::InvalidInput(rejection.body_text()))
}
