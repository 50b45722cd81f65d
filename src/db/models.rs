use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct DbReagent {
    pub id: i64,
    pub name: String,
    pub concentration: f64,
    pub unit: String,
    /// Cost of one `unit` of this reagent.
    pub unit_cost: f64,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct DbPlate {
    pub id: i64,
    pub label: String,
    pub well_count: i64,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct DbPlateReagentMap {
    pub id: i64,
    pub plate_id: i64,
    pub row_id: String,
    pub column_id: i64,
    pub reagent_id: i64,
    pub quantity: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct DbCellGrowth {
    pub id: i64,
    pub plate_id: i64,
    pub row_id: String,
    pub column_id: i64,
    pub time_index: i64,
    pub cell_density: f64,
    pub measured_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct DbAbsorbanceReading {
    pub id: i64,
    pub plate_id: i64,
    pub row_id: String,
    pub column_id: i64,
    pub seconds_time_sample: i64,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct DbExperiment {
    pub id: i64,
    /// The `exp <n>` number the run was recorded under.
    pub number: i64,
    pub cell_concentration: f64,
    pub dilution: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct DbPlateExperimentMap {
    pub id: i64,
    pub plate_id: i64,
    pub column_id: i64,
    pub experiment_id: i64,
}

/// One row of the plate × mapping × reagent join behind the cost dashboard.
///
/// Plates without mappings still produce a row, with every reagent-side field `None`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct PlateCostRow {
    pub plate_id: i64,
    pub plate_label: String,
    pub plate_created_at: DateTime<Utc>,
    pub reagent_id: Option<i64>,
    pub reagent_name: Option<String>,
    pub unit: Option<String>,
    pub quantity: Option<f64>,
    pub unit_cost: Option<f64>,
}

/// A reagent amount recorded for an experiment, joined with the reagent's unit cost.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, FromRow)]
pub struct ExperimentCostRow {
    pub reagent_value_id: i64,
    pub reagent_id: i64,
    pub reagent_name: String,
    pub unit: String,
    pub value: f64,
    pub unit_cost: f64,
}
