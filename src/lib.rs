pub mod cli;
pub mod environment;
pub mod error;
pub mod languages;
pub mod pipeline;
pub mod planner;
pub mod query;
pub mod render;
pub mod search;
pub mod telemetry;

pub use error::PipelineError;
