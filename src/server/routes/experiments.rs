use crate::dashboard;
use crate::db::DbExperiment;
use crate::error::PlatelabError;
use crate::server::router::LabState;
use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use platelab_schema::ExperimentCost;

pub fn router() -> Router<LabState> {
    Router::new()
        .route("/api/experiments", get(list_experiments))
        .route("/api/experiments/{id}", get(experiment_cost))
}

async fn list_experiments(
    State(state): State<LabState>,
) -> Result<Json<Vec<DbExperiment>>, PlatelabError> {
    Ok(Json(state.db.list_experiments().await?))
}

/// GET /api/experiments/{id}
///
/// The experiment's parameters plus every priced reagent line from its sheet.
async fn experiment_cost(
    State(state): State<LabState>,
    Path(id): Path<i64>,
) -> Result<Json<ExperimentCost>, PlatelabError> {
    let experiment = state.db.get_experiment(id).await?;
    let rows = state.db.experiment_cost_rows(id).await?;
    Ok(Json(dashboard::experiment_cost(&experiment, &rows)))
}
