//! Error types for tdbuild

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using tdbuild Error
pub type Result<T> = std::result::Result<T, Error>;

/// tdbuild error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Entry point not found: {0}")]
    EntryPointNotFound(PathBuf),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("{tool} exited with status {status}: {stderr}")]
    ToolFailed {
        tool: String,
        status: i32,
        stderr: String,
    },

    #[error("Failed to bind server on port {port}: {reason}")]
    ServerBind { port: u16, reason: String },

    #[error("Tunnel error: {0}")]
    Tunnel(String),

    #[error("Cycle detected involving task: {0}")]
    CycleDetected(String),

    #[error("Unknown task: {0}")]
    UnknownTask(String),

    #[error("Missing dependency: task '{from}' depends on undefined task '{to}'")]
    MissingDependency { from: String, to: String },

    #[error("Duplicate task: {0}")]
    DuplicateTask(String),

    #[error("Task '{task}' failed: {reason}")]
    TaskFailed { task: String, reason: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::InvalidConfig(e.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(e: toml::ser::Error) -> Self {
        Error::InvalidConfig(e.to_string())
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(e: tokio::task::JoinError) -> Self {
        Error::Internal(e.to_string())
    }
}

impl Error {
    /// Whether this error belongs to the setup class (fatal, no retry).
    pub fn is_setup_failure(&self) -> bool {
        matches!(
            self,
            Error::InvalidConfig(_)
                | Error::EntryPointNotFound(_)
                | Error::ToolNotFound(_)
                | Error::ServerBind { .. }
                | Error::Tunnel(_)
                | Error::CycleDetected(_)
                | Error::UnknownTask(_)
                | Error::MissingDependency { .. }
                | Error::DuplicateTask(_)
        )
    }
}
