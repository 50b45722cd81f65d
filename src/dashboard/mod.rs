//! Read-side shaping for the dashboard pages. Pure functions over rows the
//! database actor returns; no I/O here.

pub mod cost;
pub mod growth;

pub use cost::{experiment_cost, summarize};
pub use growth::growth_chart;
