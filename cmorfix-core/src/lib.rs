//! Embeddable core library for cmorfix.
//!
//! Provides a clap-free, I/O-abstracted entry point for correcting whole datasets: discover the
//! variable files, run every variable through the fix pipeline, collect a run report.
//!
//! # Port traits
//!
//! All I/O is abstracted behind port traits in [`ports`]:
//! - [`DatasetSource`](ports::DatasetSource): list the variable files of a dataset
//! - [`WritePort`](ports::WritePort): write files and create directories
//!
//! Cube parsing goes through the domain's [`CubeLoader`]. The [`adapters`] module provides
//! filesystem-backed implementations.
//!
//! # Entry points
//!
//! - [`run_load`](pipeline::run_load): correct every configured dataset and build the report
//! - [`write_load_artifacts`](pipeline::write_load_artifacts): persist cubes and the report

pub mod adapters;
pub mod pipeline;
pub mod ports;
pub mod settings;

// Re-export the domain pieces embedders need to call `run_load`.
pub use cmorfix_domain::{CubeLoader, FixRegistry, FsCubeLoader};
