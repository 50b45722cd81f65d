pub mod config;
pub mod dashboard;
pub mod db;
pub mod error;
pub mod ingest;
pub mod server;

pub use error::PlatelabError;
