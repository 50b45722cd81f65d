use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use serde_json::Value;
use sqlx::error::ErrorKind;
use std::fmt;
use thiserror::Error as ThisError;

/// Which database constraint rejected a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintKind {
    ForeignKey,
    Unique,
    NotNull,
    Check,
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConstraintKind::ForeignKey => "foreign key",
            ConstraintKind::Unique => "unique",
            ConstraintKind::NotNull => "not null",
            ConstraintKind::Check => "check",
        };
        f.write_str(s)
    }
}

#[derive(Debug, ThisError)]
pub enum PlatelabError {
    #[error("Database error: {0}")]
    DatabaseError(sqlx::Error),

    #[error("{kind} constraint violated: {message}")]
    Constraint {
        kind: ConstraintKind,
        message: String,
    },

    #[error("Migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Ingest error: {0}")]
    Ingest(String),

    #[error("Ractor error: {0}")]
    RactorError(String),
}

impl PlatelabError {
    pub fn constraint_kind(&self) -> Option<ConstraintKind> {
        match self {
            PlatelabError::Constraint { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

/// SQLite constraint failures become [`PlatelabError::Constraint`] so callers can
/// tell a referential error apart from an I/O or driver failure.
impl From<sqlx::Error> for PlatelabError {
    fn from(err: sqlx::Error) -> Self {
        let kind = err.as_database_error().and_then(|db| match db.kind() {
            ErrorKind::ForeignKeyViolation => Some(ConstraintKind::ForeignKey),
            ErrorKind::UniqueViolation => Some(ConstraintKind::Unique),
            ErrorKind::NotNullViolation => Some(ConstraintKind::NotNull),
            ErrorKind::CheckViolation => Some(ConstraintKind::Check),
            _ => None,
        });
        match kind {
            Some(kind) => PlatelabError::Constraint {
                kind,
                message: err
                    .as_database_error()
                    .map(|db| db.message().to_string())
                    .unwrap_or_default(),
            },
            None => PlatelabError::DatabaseError(err),
        }
    }
}

impl IntoResponse for PlatelabError {
    fn into_response(self) -> axum::response::Response {
        let (status, error_body) = match self {
            PlatelabError::NotFound { entity, id } => (
                StatusCode::NOT_FOUND,
                ApiErrorObject {
                    code: "NOT_FOUND".to_string(),
                    message: format!("{entity} {id} not found."),
                    details: None,
                },
            ),

            PlatelabError::Constraint { kind, message } => (
                StatusCode::CONFLICT,
                ApiErrorObject {
                    code: "CONSTRAINT_VIOLATION".to_string(),
                    message: format!("The change violates a {kind} constraint."),
                    details: Some(serde_json::json!({ "kind": kind, "detail": message })),
                },
            ),

            PlatelabError::InvalidInput(message) => (
                StatusCode::BAD_REQUEST,
                ApiErrorObject {
                    code: "INVALID_INPUT".to_string(),
                    message,
                    details: None,
                },
            ),

            PlatelabError::DatabaseError(_)
            | PlatelabError::MigrateError(_)
            | PlatelabError::CsvError(_)
            | PlatelabError::IoError(_)
            | PlatelabError::Ingest(_)
            | PlatelabError::RactorError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiErrorObject {
                    code: "INTERNAL_ERROR".to_string(),
                    message: "An internal server error occurred.".to_string(),
                    details: None,
                },
            ),
        };
        (status, Json(ApiErrorBody { inner: error_body })).into_response()
    }
}

/// Standardized API error response payload.
#[derive(Serialize)]
pub struct ApiErrorObject {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

#[derive(Serialize)]
pub struct ApiErrorBody {
    #[serde(rename = "error")]
    pub inner: ApiErrorObject,
}
