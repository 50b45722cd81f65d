mod platelab;

pub use platelab::{ApiErrorBody, ApiErrorObject, ConstraintKind, PlatelabError};
