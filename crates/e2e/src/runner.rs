//! Local browser test runs
//!
//! [`TestRunner`] drives the karma suite against the dev server, either once
//! or in watch mode. Either way the run owns the dev server handle and stops
//! it before reporting a status.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use tdbuild_common::{PhaseLog, RunPhase, RunStatus};
use tdbuild_web::{shutdown, DevServer};

use crate::error::E2eResult;
use crate::karma::{SuiteRequest, SuiteRunner};

/// Rebuilds artifacts after a source change in watch mode.
#[async_trait]
pub trait Rebuild: Send + Sync {
    async fn rebuild(&self) -> E2eResult<()>;
}

/// What to watch and how long to wait for a burst of changes to settle.
#[derive(Debug, Clone)]
pub struct WatchConfig {
    pub paths: Vec<PathBuf>,
    pub debounce: Duration,
}

/// Runs the browser suite through a [`SuiteRunner`].
#[derive(Clone)]
pub struct TestRunner {
    suite: Arc<dyn SuiteRunner>,
}

impl TestRunner {
    pub fn new(suite: Arc<dyn SuiteRunner>) -> Self {
        Self { suite }
    }

    /// Run one suite invocation. Launch failures are logged and reported as
    /// a fatal status so callers can keep aggregating.
    pub async fn run_batch(&self, request: &SuiteRequest) -> RunStatus {
        match self.suite.run(request).await {
            Ok(status) => status,
            Err(e) => {
                error!("Suite run {} failed: {}", request.label, e);
                RunStatus::FATAL
            }
        }
    }

    /// Single run against the local browsers.
    pub async fn run_once(&self, server: Option<DevServer>, phases: &mut PhaseLog) -> RunStatus {
        phases.enter(RunPhase::TestsRunning);
        let status = self.run_batch(&SuiteRequest::local(true)).await;
        finish(server, phases, status).await;
        status
    }

    /// Keep the suite running and rebuild artifacts whenever a watched path
    /// changes. Ends when the suite process exits.
    pub async fn watch(
        &self,
        server: Option<DevServer>,
        config: &WatchConfig,
        rebuild: &dyn Rebuild,
        phases: &mut PhaseLog,
    ) -> E2eResult<RunStatus> {
        let (watcher, mut changes) = match start_watcher(&config.paths) {
            Ok(watcher) => watcher,
            Err(e) => {
                shutdown(server).await;
                return Err(e);
            }
        };

        phases.enter(RunPhase::TestsRunning);
        let request = SuiteRequest::local(false);
        let suite = self.suite.run(&request);
        tokio::pin!(suite);

        let status = loop {
            tokio::select! {
                result = &mut suite => {
                    break match result {
                        Ok(status) => status,
                        Err(e) => {
                            error!("Suite run {} failed: {}", request.label, e);
                            RunStatus::FATAL
                        }
                    };
                }
                Some(first) = changes.recv() => {
                    let mut changed: BTreeSet<PathBuf> = first.into_iter().collect();
                    tokio::time::sleep(config.debounce).await;
                    while let Ok(more) = changes.try_recv() {
                        changed.extend(more);
                    }

                    info!("{} file(s) changed, rebuilding", changed.len());
                    debug!("Changed: {:?}", changed);

                    phases.enter(RunPhase::ArtifactsBuilding);
                    match rebuild.rebuild().await {
                        Ok(()) => info!("Rebuild finished"),
                        Err(e) => error!("Rebuild failed: {}", e),
                    }
                    phases.enter(RunPhase::TestsRunning);
                }
            }
        };

        drop(watcher);
        finish(server, phases, status).await;
        Ok(status)
    }
}

async fn finish(server: Option<DevServer>, phases: &mut PhaseLog, status: RunStatus) {
    phases.enter(RunPhase::TearingDown);
    shutdown(server).await;
    phases.enter(if status.is_success() {
        RunPhase::Passed
    } else {
        RunPhase::Failed
    });
}

type Changes = mpsc::UnboundedReceiver<Vec<PathBuf>>;

fn start_watcher(paths: &[PathBuf]) -> E2eResult<(RecommendedWatcher, Changes)> {
    let (tx, rx) = mpsc::unbounded_channel();

    let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
        match res {
            Ok(event) if !matches!(event.kind, EventKind::Access(_)) => {
                let _ = tx.send(event.paths);
            }
            Ok(_) => {}
            Err(e) => warn!("Watch error: {}", e),
        }
    })?;

    for path in paths {
        if path.exists() {
            watcher.watch(path, RecursiveMode::Recursive)?;
            info!("Watching {}", path.display());
        } else {
            warn!("Watch path {} does not exist", path.display());
        }
    }

    Ok((watcher, rx))
}
