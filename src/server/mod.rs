pub mod router;
pub mod routes;

pub use router::{LabState, lab_router};
