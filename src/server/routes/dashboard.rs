use crate::dashboard;
use crate::error::PlatelabError;
use crate::server::router::LabState;
use axum::{Json, Router, extract::State, routing::get};
use platelab_schema::CostDashboard;
use serde_json::{Value, json};

pub fn router() -> Router<LabState> {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/dashboard/cost", get(cost_dashboard))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

/// GET /api/dashboard/cost
///
/// Everything the Cost Dashboard page plots, in one payload.
async fn cost_dashboard(State(state): State<LabState>) -> Result<Json<CostDashboard>, PlatelabError> {
    let rows = state.db.plate_cost_rows(None).await?;
    Ok(Json(dashboard::summarize(&rows)))
}
