pub mod config;
pub mod error;
pub mod runner;
pub mod summary;

pub use config::PipelineConfig;
pub use error::PipelineError;
pub use runner::{run, Pipeline};
pub use summary::RunSummary;
