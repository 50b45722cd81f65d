//! Request bodies accepted by the plate sub-resources.
//!
//! Wells are addressed by their printed name (`"A1"`, `"H12"`); the server
//! validates them against the plate's format.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlateReagentInput {
    pub well: String,
    pub reagent_id: i64,
    pub quantity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellGrowthInput {
    pub well: String,
    pub time_index: i64,
    pub cell_density: f64,
    /// Defaults to the time the row is stored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measured_at: Option<DateTime<Utc>>,
}

/// Assigns an experiment to one column of a plate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlateExperimentInput {
    pub column_id: i64,
    pub experiment_id: i64,
}
