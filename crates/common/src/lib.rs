//! tdbuild Common Library
//!
//! Shared types and the orchestration core of the tdbuild pipeline: the task
//! graph, browser batch planning and the artifact builder.

pub mod artifact;
pub mod batch;
pub mod config;
pub mod error;
pub mod graph;
pub mod types;

// Re-export commonly used types
pub use artifact::{
    Artifact, ArtifactBuilder, ArtifactSpec, BrowserifyBundler, BuiltArtifact, Bundler,
    LoaderVars, Minifier, UglifyMinifier,
};
pub use batch::{Batch, BatchPlan};
pub use config::ProjectConfig;
pub use error::{Error, Result};
pub use graph::{RunReport, TaskAction, TaskGraph, TaskGraphBuilder};
pub use types::*;

/// tdbuild version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
