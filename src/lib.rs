pub mod analytics;
pub mod clean;
pub mod enrich;
pub mod error;
pub mod fetch;
pub mod loader;
pub mod merge;
pub mod output;
pub mod pipeline;
pub mod reject;
pub mod stats;
pub mod types;

pub use error::{PipelineError, Result};
pub use types::{TripRecord, TripTable, Zone, ZoneLookup};
