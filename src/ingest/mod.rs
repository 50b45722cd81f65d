//! Getting data into the database: the default reagent list, plate-reader
//! exports, experiment cost sheets, and well addressing.

pub mod absorbance;
pub mod experiment;
pub mod seed;
pub mod well;

pub use absorbance::{IngestSummary, ingest_path};
pub use experiment::{ExperimentIngestSummary, ingest_path as ingest_experiment_path};
pub use seed::{SeedReport, import_file as import_seed_file};
pub use well::{PlateFormat, Well};
