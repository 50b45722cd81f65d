//! Database module: record types, migrations and the repository actor.
//!
//! Layout:
//! - `models.rs`: Rust structs mirroring DB rows
//! - `create.rs`: insert payloads
//! - `migrate.rs`: versioned, reversible schema migrations (`migrations/`)
//! - `ops.rs`: typed queries over a `SqlitePool`
//! - `actor.rs`: single-writer actor fronting `ops`

pub mod actor;
pub mod create;
pub mod migrate;
pub mod models;
pub mod ops;
pub mod pool;

pub use actor::{DbActorHandle, spawn};
pub use create::{
    AbsorbanceCreate, CellGrowthCreate, ExperimentCreate, PlateCreate, PlateExperimentCreate,
    PlateReagentCreate, ReagentCreate, ReagentValueCreate, StoredExperiment, UpsertCounts,
};
pub use models::{
    DbAbsorbanceReading, DbCellGrowth, DbExperiment, DbPlate, DbPlateExperimentMap,
    DbPlateReagentMap, DbReagent, ExperimentCostRow, PlateCostRow,
};
