//! Cost dashboard payloads.
//!
//! All amounts are in the currency the reagent unit costs were entered in; the
//! service does not convert between currencies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One reagent mapping on a plate, priced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostLine {
    pub reagent_id: i64,
    pub reagent_name: String,
    pub unit: String,
    pub quantity: f64,
    pub unit_cost: f64,
    /// `quantity * unit_cost`
    pub cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlateCostSummary {
    pub plate_id: i64,
    pub label: String,
    pub created_at: DateTime<Utc>,
    pub total_cost: f64,
    pub lines: Vec<CostLine>,
}

/// Spend on a single reagent across every plate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReagentCostShare {
    pub reagent_id: i64,
    pub reagent_name: String,
    pub quantity: f64,
    pub cost: f64,
    /// Fraction of the grand total in `[0, 1]`; `0` when nothing has been spent.
    pub share: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CumulativeCostPoint {
    pub at: DateTime<Utc>,
    pub plate_id: i64,
    pub plate_label: String,
    pub cumulative_cost: f64,
}

/// Reagent spend recorded on one experiment sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentCost {
    pub experiment_id: i64,
    pub number: i64,
    pub cell_concentration: f64,
    pub dilution: f64,
    pub total_cost: f64,
    /// `quantity` here is the amount from the sheet, in the sheet's unit.
    pub lines: Vec<CostLine>,
}

/// Everything the cost dashboard page renders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CostDashboard {
    pub grand_total: f64,
    pub plates: Vec<PlateCostSummary>,
    pub reagents: Vec<ReagentCostShare>,
    pub cumulative: Vec<CumulativeCostPoint>,
}
