pub mod cost;
pub mod growth;
pub mod input;

pub use cost::{
    CostDashboard, CostLine, CumulativeCostPoint, ExperimentCost, PlateCostSummary,
    ReagentCostShare,
};
pub use growth::{GrowthChart, GrowthPoint, GrowthSeries};
pub use input::{CellGrowthInput, PlateExperimentInput, PlateReagentInput};
