//! Error types for browser test runs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("{0} not found. Install it with: npm install")]
    ToolNotFound(String),

    #[error("Karma error: {0}")]
    Karma(String),

    #[error("Tunnel failed to start: {0}")]
    TunnelStartup(String),

    #[error("Tunnel not ready after {0} seconds")]
    TunnelTimeout(u64),

    #[error("WebDriver hub unreachable at {url}: {reason}")]
    HubUnreachable { url: String, reason: String },

    #[error("No specs matching {0}")]
    NoSpecs(String),

    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),

    #[error("{0}")]
    Common(#[from] tdbuild_common::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl E2eError {
    /// Setup failures abort the run before any test executes.
    pub fn is_setup_failure(&self) -> bool {
        match self {
            E2eError::ToolNotFound(_)
            | E2eError::TunnelStartup(_)
            | E2eError::TunnelTimeout(_)
            | E2eError::HubUnreachable { .. }
            | E2eError::NoSpecs(_) => true,
            E2eError::Common(e) => e.is_setup_failure(),
            _ => false,
        }
    }
}

impl From<E2eError> for tdbuild_common::Error {
    fn from(e: E2eError) -> Self {
        use tdbuild_common::Error;

        match e {
            E2eError::Common(e) => e,
            E2eError::ToolNotFound(tool) => Error::ToolNotFound(tool),
            E2eError::TunnelStartup(_) | E2eError::TunnelTimeout(_) => Error::Tunnel(e.to_string()),
            E2eError::Io(e) => Error::Io(e),
            E2eError::Json(e) => Error::Serialization(e),
            other => Error::Internal(other.to_string()),
        }
    }
}

pub type E2eResult<T> = Result<T, E2eError>;
