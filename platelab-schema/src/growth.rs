use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GrowthPoint {
    /// Seconds since the plate's first reading.
    pub time_index: i64,
    pub cell_density: f64,
}

/// Time series for one well; points are ascending by `time_index`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthSeries {
    pub well: String,
    pub points: Vec<GrowthPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthChart {
    pub plate_id: i64,
    pub plate_label: String,
    pub series: Vec<GrowthSeries>,
}
