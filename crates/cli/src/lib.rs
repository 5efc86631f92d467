//! tdbuild CLI
//!
//! Task graph, run context and output formatting behind the `tdbuild`
//! binary.

pub mod context;
pub mod output;
pub mod tasks;

pub use context::{PipelineContext, Toolchain};
pub use tasks::{graph, PipelineGraph, TaskId};
