#![forbid(unsafe_code)]

//! Match the hardware of a machine against a driver catalog, pick the newest
//! applicable driver per logical driver and stage the packages for download
//! and optional installation.

pub mod adapters;
pub mod app;
pub mod commands;
pub mod domain;
pub mod infrastructure;
pub mod ports;

pub use app::{AppController, Elevation, Overrides, Pipeline, PipelinePorts, PipelineSettings, RunOutcome};
pub use domain::{CompletionCode, DomainError, RunReport, Stage};
