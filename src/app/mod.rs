pub mod controller;
pub mod pipeline;

pub use controller::{AppController, Elevation, Overrides};
pub use pipeline::{Pipeline, PipelinePorts, PipelineSettings, RunOutcome};
