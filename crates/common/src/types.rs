//! Core types for tdbuild

use serde::{Deserialize, Serialize};

/// One remote execution environment on the browser grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowserTarget {
    #[serde(rename = "browserName")]
    pub browser_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
}

impl BrowserTarget {
    pub fn new(browser_name: impl Into<String>) -> Self {
        Self {
            browser_name: browser_name.into(),
            version: None,
            platform: None,
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = Some(platform.into());
        self
    }
}

impl std::fmt::Display for BrowserTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.browser_name)?;
        if let Some(version) = &self.version {
            write!(f, " {}", version)?;
        }
        if let Some(platform) = &self.platform {
            write!(f, " ({})", platform)?;
        }
        Ok(())
    }
}

/// Exit status of a test run. Zero means every test passed.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RunStatus(pub i32);

impl RunStatus {
    pub const SUCCESS: RunStatus = RunStatus(0);
    /// Status reported for fatal setup failures.
    pub const FATAL: RunStatus = RunStatus(1);

    pub fn code(self) -> i32 {
        self.0
    }

    pub fn is_success(self) -> bool {
        self.0 == 0
    }

    /// Worst-case status over a sequence; success for an empty one.
    pub fn worst<I: IntoIterator<Item = RunStatus>>(statuses: I) -> RunStatus {
        statuses.into_iter().max().unwrap_or(RunStatus::SUCCESS)
    }
}

impl From<std::process::ExitStatus> for RunStatus {
    fn from(status: std::process::ExitStatus) -> Self {
        // Killed by a signal: no code, treat as a generic failure.
        RunStatus(status.code().unwrap_or(1))
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Completion status of a task inside a graph run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl Default for TaskState {
    fn default() -> Self {
        Self::Pending
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskState::Pending => write!(f, "pending"),
            TaskState::Running => write!(f, "running"),
            TaskState::Succeeded => write!(f, "succeeded"),
            TaskState::Failed => write!(f, "failed"),
        }
    }
}

/// Lifecycle of a browser test run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Idle,
    ArtifactsBuilding,
    ServerStarting,
    TestsRunning,
    TearingDown,
    Passed,
    Failed,
}

impl RunPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunPhase::Passed | RunPhase::Failed)
    }

    /// Whether `next` is a legal successor of this phase.
    ///
    /// Terminal phases may loop back to `ArtifactsBuilding` (watch mode). A
    /// run that fails during setup tears down straight from `ServerStarting`.
    pub fn can_transition_to(self, next: RunPhase) -> bool {
        use RunPhase::*;
        matches!(
            (self, next),
            (Idle, ArtifactsBuilding)
                | (Idle, ServerStarting)
                | (Idle, TestsRunning)
                | (ArtifactsBuilding, ServerStarting)
                | (ArtifactsBuilding, TestsRunning)
                | (ServerStarting, TestsRunning)
                | (ServerStarting, TearingDown)
                | (TestsRunning, ArtifactsBuilding)
                | (TestsRunning, TearingDown)
                | (TearingDown, Passed)
                | (TearingDown, Failed)
                | (Passed, ArtifactsBuilding)
                | (Failed, ArtifactsBuilding)
        )
    }
}

impl std::fmt::Display for RunPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RunPhase::Idle => "idle",
            RunPhase::ArtifactsBuilding => "artifacts-building",
            RunPhase::ServerStarting => "server-starting",
            RunPhase::TestsRunning => "tests-running",
            RunPhase::TearingDown => "tearing-down",
            RunPhase::Passed => "passed",
            RunPhase::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// Recorded phase history of one pipeline run.
#[derive(Debug, Clone)]
pub struct PhaseLog {
    history: Vec<RunPhase>,
}

impl PhaseLog {
    pub fn new() -> Self {
        Self {
            history: vec![RunPhase::Idle],
        }
    }

    pub fn current(&self) -> RunPhase {
        self.history.last().copied().unwrap_or(RunPhase::Idle)
    }

    /// Move to `next`. Re-entering the current phase is a no-op and
    /// illegal transitions are ignored; returns whether the phase changed.
    pub fn enter(&mut self, next: RunPhase) -> bool {
        let current = self.current();
        if current == next {
            return false;
        }
        if !current.can_transition_to(next) {
            tracing::debug!("Ignoring phase transition {} -> {}", current, next);
            return false;
        }
        tracing::debug!("Phase {} -> {}", current, next);
        self.history.push(next);
        true
    }

    pub fn history(&self) -> &[RunPhase] {
        &self.history
    }
}

impl Default for PhaseLog {
    fn default() -> Self {
        Self::new()
    }
}
