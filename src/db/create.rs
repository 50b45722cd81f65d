use crate::db::models::DbExperiment;
use crate::ingest::Well;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReagentCreate {
    pub name: String,
    pub concentration: f64,
    pub unit: String,
    #[serde(default)]
    pub unit_cost: f64,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlateCreate {
    pub label: String,
    /// Defaults to a 96-well plate.
    #[serde(default)]
    pub well_count: Option<i64>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlateReagentCreate {
    pub plate_id: i64,
    pub well: Well,
    pub reagent_id: i64,
    pub quantity: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CellGrowthCreate {
    pub plate_id: i64,
    pub well: Well,
    pub time_index: i64,
    pub cell_density: f64,
    /// `None` stamps the row with the insert time.
    pub measured_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AbsorbanceCreate {
    pub well: Well,
    pub seconds_time_sample: i64,
    pub value: f64,
}

/// Outcome of a batch reagent upsert keyed by name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UpsertCounts {
    pub inserted: u64,
    pub updated: u64,
}

/// One reagent line of an experiment sheet; the reagent is resolved by name.
#[derive(Debug, Clone, PartialEq)]
pub struct ReagentValueCreate {
    pub reagent_name: String,
    pub value: f64,
    pub unit: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentCreate {
    pub number: i64,
    pub cell_concentration: f64,
    pub dilution: f64,
    pub values: Vec<ReagentValueCreate>,
}

/// Outcome of storing an experiment sheet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredExperiment {
    pub experiment: DbExperiment,
    pub inserted: u64,
    /// Names on the sheet with no matching reagent; their lines are not stored.
    pub unknown_reagents: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlateExperimentCreate {
    pub plate_id: i64,
    pub column_id: i64,
    pub experiment_id: i64,
}
