use super::json_body;
use crate::db::{DbReagent, ReagentCreate};
use crate::error::PlatelabError;
use crate::server::router::LabState;
use axum::extract::rejection::JsonRejection;
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use tracing::info;

pub fn router() -> Router<LabState> {
    Router::new()
        .route("/api/reagents", get(list_reagents).post(create_reagent))
        .route("/api/reagents/{id}", get(get_reagent).delete(delete_reagent))
}

/// GET /api/reagents
async fn list_reagents(State(state): State<LabState>) -> Result<Json<Vec<DbReagent>>, PlatelabError> {
    Ok(Json(state.db.list_reagents().await?))
}

/// POST /api/reagents
///
/// 409 when the name is already taken.
async fn create_reagent(
    State(state): State<LabState>,
    payload: Result<Json<ReagentCreate>, JsonRejection>,
) -> Result<(StatusCode, Json<DbReagent>), PlatelabError> {
    let create = json_body(payload)?;
    let reagent = state.db.create_reagent(create).await?;
    info!(reagent_id = reagent.id, name = %reagent.name, "Reagent created");
    Ok((StatusCode::CREATED, Json(reagent)))
}

/// GET /api/reagents/{id}
async fn get_reagent(
    State(state): State<LabState>,
    Path(id): Path<i64>,
) -> Result<Json<DbReagent>, PlatelabError> {
    Ok(Json(state.db.get_reagent(id).await?))
}

/// DELETE /api/reagents/{id}
///
/// Reagents still mapped onto a plate cannot be removed (409).
async fn delete_reagent(
    State(state): State<LabState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, PlatelabError> {
    state.db.delete_reagent(id).await?;
    info!(reagent_id = id, "Reagent deleted");
    Ok(StatusCode::NO_CONTENT)
}
