use super::json_body;
use crate::dashboard;
use crate::db::{
    CellGrowthCreate, DbAbsorbanceReading, DbCellGrowth, DbPlate, DbPlateExperimentMap,
    DbPlateReagentMap, PlateCreate, PlateExperimentCreate, PlateReagentCreate,
};
use crate::error::PlatelabError;
use crate::ingest::Well;
use crate::server::router::LabState;
use axum::extract::rejection::JsonRejection;
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use platelab_schema::{
    CellGrowthInput, GrowthChart, PlateCostSummary, PlateExperimentInput, PlateReagentInput,
};
use tracing::info;

pub fn router() -> Router<LabState> {
    Router::new()
        .route("/api/plates", get(list_plates).post(create_plate))
        .route("/api/plates/{id}", get(get_plate).delete(delete_plate))
        .route(
            "/api/plates/{id}/reagents",
            get(list_plate_reagents).post(add_plate_reagent),
        )
        .route(
            "/api/plates/{id}/growth",
            get(growth_chart).post(add_cell_growth),
        )
        .route(
            "/api/plates/{id}/experiments",
            get(list_plate_experiments).post(map_plate_experiment),
        )
        .route("/api/plates/{id}/absorbance", get(list_absorbance))
        .route("/api/plates/{id}/cost", get(plate_cost))
}

async fn list_plates(State(state): State<LabState>) -> Result<Json<Vec<DbPlate>>, PlatelabError> {
    Ok(Json(state.db.list_plates().await?))
}

/// POST /api/plates
async fn create_plate(
    State(state): State<LabState>,
    payload: Result<Json<PlateCreate>, JsonRejection>,
) -> Result<(StatusCode, Json<DbPlate>), PlatelabError> {
    let create = json_body(payload)?;
    let plate = state.db.create_plate(create).await?;
    info!(plate_id = plate.id, label = %plate.label, well_count = plate.well_count, "Plate created");
    Ok((StatusCode::CREATED, Json(plate)))
}

async fn get_plate(
    State(state): State<LabState>,
    Path(id): Path<i64>,
) -> Result<Json<DbPlate>, PlatelabError> {
    Ok(Json(state.db.get_plate(id).await?))
}

/// DELETE /api/plates/{id}
///
/// Cascades to the plate's mappings, growth rows and absorbance readings.
async fn delete_plate(
    State(state): State<LabState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, PlatelabError> {
    state.db.delete_plate(id).await?;
    info!(plate_id = id, "Plate deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn list_plate_reagents(
    State(state): State<LabState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<DbPlateReagentMap>>, PlatelabError> {
    state.db.get_plate(id).await?;
    Ok(Json(state.db.list_plate_reagents(id).await?))
}

/// POST /api/plates/{id}/reagents
///
/// An unknown plate or reagent is a 409 from the foreign key, not a 404.
async fn add_plate_reagent(
    State(state): State<LabState>,
    Path(id): Path<i64>,
    payload: Result<Json<PlateReagentInput>, JsonRejection>,
) -> Result<(StatusCode, Json<DbPlateReagentMap>), PlatelabError> {
    let input = json_body(payload)?;
    let well: Well = input.well.parse()?;
    let mapping = state
        .db
        .add_plate_reagent(PlateReagentCreate {
            plate_id: id,
            well,
            reagent_id: input.reagent_id,
            quantity: input.quantity,
        })
        .await?;
    info!(
        plate_id = id,
        well = %well,
        reagent_id = mapping.reagent_id,
        quantity = mapping.quantity,
        "Reagent mapped onto plate"
    );
    Ok((StatusCode::CREATED, Json(mapping)))
}

/// GET /api/plates/{id}/growth
///
/// One ascending series per well.
async fn growth_chart(
    State(state): State<LabState>,
    Path(id): Path<i64>,
) -> Result<Json<GrowthChart>, PlatelabError> {
    let plate = state.db.get_plate(id).await?;
    let rows = state.db.list_cell_growth(id).await?;
    Ok(Json(dashboard::growth_chart(&plate, &rows)))
}

async fn add_cell_growth(
    State(state): State<LabState>,
    Path(id): Path<i64>,
    payload: Result<Json<CellGrowthInput>, JsonRejection>,
) -> Result<(StatusCode, Json<DbCellGrowth>), PlatelabError> {
    let input = json_body(payload)?;
    let well: Well = input.well.parse()?;
    let row = state
        .db
        .add_cell_growth(CellGrowthCreate {
            plate_id: id,
            well,
            time_index: input.time_index,
            cell_density: input.cell_density,
            measured_at: input.measured_at,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(row)))
}

async fn list_plate_experiments(
    State(state): State<LabState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<DbPlateExperimentMap>>, PlatelabError> {
    state.db.get_plate(id).await?;
    Ok(Json(state.db.list_plate_experiments(id).await?))
}

/// POST /api/plates/{id}/experiments
///
/// A column already taken on the plate is a 409.
async fn map_plate_experiment(
    State(state): State<LabState>,
    Path(id): Path<i64>,
    payload: Result<Json<PlateExperimentInput>, JsonRejection>,
) -> Result<(StatusCode, Json<DbPlateExperimentMap>), PlatelabError> {
    let input = json_body(payload)?;
    let mapping = state
        .db
        .map_plate_experiment(PlateExperimentCreate {
            plate_id: id,
            column_id: input.column_id,
            experiment_id: input.experiment_id,
        })
        .await?;
    info!(
        plate_id = id,
        column_id = mapping.column_id,
        experiment_id = mapping.experiment_id,
        "Experiment mapped onto plate column"
    );
    Ok((StatusCode::CREATED, Json(mapping)))
}

async fn list_absorbance(
    State(state): State<LabState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<DbAbsorbanceReading>>, PlatelabError> {
    state.db.get_plate(id).await?;
    Ok(Json(state.db.list_absorbance(id).await?))
}

/// GET /api/plates/{id}/cost
async fn plate_cost(
    State(state): State<LabState>,
    Path(id): Path<i64>,
) -> Result<Json<PlateCostSummary>, PlatelabError> {
    let plate = state.db.get_plate(id).await?;
    let rows = state.db.plate_cost_rows(Some(id)).await?;
    let summary = dashboard::summarize(&rows)
        .plates
        .into_iter()
        .next()
        .unwrap_or_else(|| PlateCostSummary {
            plate_id: plate.id,
            label: plate.label,
            created_at: plate.created_at,
            total_cost: 0.0,
            lines: Vec::new(),
        });
    Ok(Json(summary))
}
