//! WebDriver end-to-end specs
//!
//! Each spec file is a standalone node script that drives a browser through
//! a Selenium-compatible hub. Specs run concurrently; the run reports the
//! worst exit status.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{error, info};
use walkdir::WalkDir;

use tdbuild_common::artifact::wildcard;
use tdbuild_common::{PhaseLog, RunPhase, RunStatus};

use crate::error::{E2eError, E2eResult};

/// Spec files in `dir` whose names match `pattern`, sorted.
pub fn discover_specs(dir: &Path, pattern: &str) -> E2eResult<Vec<PathBuf>> {
    let matcher = wildcard(pattern)?;
    let mut specs = Vec::new();

    if !dir.is_dir() {
        return Ok(specs);
    }

    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| E2eError::Io(e.into()))?;
        if entry.file_type().is_file()
            && matcher.is_match(&entry.file_name().to_string_lossy())
        {
            specs.push(entry.into_path());
        }
    }

    specs.sort();
    Ok(specs)
}

/// Executes a single spec file.
#[async_trait]
pub trait SpecRunner: Send + Sync {
    /// Checked once before any spec starts.
    async fn preflight(&self) -> E2eResult<()> {
        Ok(())
    }

    async fn run_spec(&self, spec: &Path) -> E2eResult<RunStatus>;
}

/// Runs specs with `node`, pointing them at a WebDriver hub through
/// `WD_HUB_URL` and `WD_BROWSER`.
#[derive(Debug, Clone)]
pub struct NodeSpecRunner {
    node: String,
    hub_url: String,
    browser: String,
}

impl NodeSpecRunner {
    pub fn new(
        node: impl Into<String>,
        hub_url: impl Into<String>,
        browser: impl Into<String>,
    ) -> Self {
        Self {
            node: node.into(),
            hub_url: hub_url.into(),
            browser: browser.into(),
        }
    }
}

#[async_trait]
impl SpecRunner for NodeSpecRunner {
    /// The hub must answer `GET <hub>/status`.
    async fn preflight(&self) -> E2eResult<()> {
        let url = format!("{}/status", self.hub_url.trim_end_matches('/'));
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()?;

        client
            .get(&url)
            .send()
            .await
            .map_err(|e| E2eError::HubUnreachable {
                url: self.hub_url.clone(),
                reason: e.to_string(),
            })?;
        Ok(())
    }

    async fn run_spec(&self, spec: &Path) -> E2eResult<RunStatus> {
        let status = Command::new(&self.node)
            .arg(spec)
            .env("WD_HUB_URL", &self.hub_url)
            .env("WD_BROWSER", &self.browser)
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    E2eError::ToolNotFound(self.node.clone())
                } else {
                    E2eError::Io(e)
                }
            })?;
        Ok(RunStatus::from(status))
    }
}

/// The e2e spec suite.
pub struct E2eSuite {
    runner: Arc<dyn SpecRunner>,
    specs_dir: PathBuf,
    pattern: String,
}

impl E2eSuite {
    pub fn new(
        runner: Arc<dyn SpecRunner>,
        specs_dir: impl Into<PathBuf>,
        pattern: impl Into<String>,
    ) -> Self {
        Self {
            runner,
            specs_dir: specs_dir.into(),
            pattern: pattern.into(),
        }
    }

    pub async fn run(&self, phases: &mut PhaseLog) -> E2eResult<RunStatus> {
        self.runner.preflight().await?;

        let specs = discover_specs(&self.specs_dir, &self.pattern)?;
        if specs.is_empty() {
            return Err(E2eError::NoSpecs(
                self.specs_dir.join(&self.pattern).display().to_string(),
            ));
        }
        info!("Running {} e2e spec(s)", specs.len());

        phases.enter(RunPhase::TestsRunning);
        let results =
            futures::future::join_all(specs.iter().map(|spec| self.runner.run_spec(spec))).await;

        let statuses = specs.iter().zip(results).map(|(spec, result)| {
            let status = match result {
                Ok(status) => status,
                Err(e) => {
                    error!("Spec {} failed to run: {}", spec.display(), e);
                    RunStatus::FATAL
                }
            };
            info!("{} finished with code {}", spec.display(), status);
            status
        });
        let status = RunStatus::worst(statuses);

        phases.enter(RunPhase::TearingDown);
        phases.enter(if status.is_success() {
            RunPhase::Passed
        } else {
            RunPhase::Failed
        });
        Ok(status)
    }
}
