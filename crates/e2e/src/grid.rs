//! Remote browser grid
//!
//! Runs the suite on Sauce Labs through a Sauce Connect tunnel. The browser
//! matrix is split into batches no larger than the account's concurrency
//! limit; batches run one after another and the run reports the worst exit
//! status seen.
//!
//! ```text
//!   open tunnel ──► batch 1 ──► batch 2 ──► ... ──► stop server ──► close tunnel
//!        │
//!        └─ failure: stop server, report setup error, no tests run
//! ```

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::StreamExt;
use serde::Serialize;
use serde_json::Value;
use tokio::process::{Child, Command};
use tracing::{debug, error, info, warn};

use tdbuild_common::config::SauceConnectConfig;
use tdbuild_common::{Batch, BatchPlan, BrowserTarget, PhaseLog, RunPhase, RunStatus};
use tdbuild_web::{shutdown, DevServer};

use crate::error::{E2eError, E2eResult};
use crate::karma::SuiteRequest;
use crate::runner::TestRunner;

/// An open tunnel to the remote grid.
#[async_trait]
pub trait Tunnel: Send {
    async fn close(&mut self) -> E2eResult<()>;
}

/// Opens a [`Tunnel`], returning once it is ready for traffic.
#[async_trait]
pub trait TunnelLauncher: Send + Sync {
    async fn open(&self) -> E2eResult<Box<dyn Tunnel>>;
}

/// Launches the `sc` binary and waits for its ready file.
#[derive(Debug, Clone)]
pub struct SauceConnectLauncher {
    program: String,
    connect: SauceConnectConfig,
    ready_file: PathBuf,
    poll_interval: Duration,
}

impl SauceConnectLauncher {
    pub fn new(
        program: impl Into<String>,
        connect: SauceConnectConfig,
        ready_file: impl Into<PathBuf>,
    ) -> Self {
        Self {
            program: program.into(),
            connect,
            ready_file: ready_file.into(),
            poll_interval: Duration::from_millis(500),
        }
    }

    fn command(&self, username: &str, access_key: &str) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("--user")
            .arg(username)
            .arg("--api-key")
            .arg(access_key)
            .arg("--readyfile")
            .arg(&self.ready_file);
        if let Some(id) = &self.connect.tunnel_identifier {
            cmd.arg("--tunnel-identifier").arg(id);
        }
        cmd.stdout(Stdio::null()).kill_on_drop(true);
        cmd
    }

    async fn wait_until_ready(&self, child: &mut Child) -> E2eResult<()> {
        let timeout = Duration::from_secs(self.connect.ready_timeout_secs);
        let start = Instant::now();

        while start.elapsed() < timeout {
            if tokio::fs::try_exists(&self.ready_file).await? {
                return Ok(());
            }
            if let Some(status) = child.try_wait()? {
                return Err(E2eError::TunnelStartup(format!(
                    "{} exited with {}",
                    self.program, status
                )));
            }
            tokio::time::sleep(self.poll_interval).await;
        }

        Err(E2eError::TunnelTimeout(self.connect.ready_timeout_secs))
    }
}

#[async_trait]
impl TunnelLauncher for SauceConnectLauncher {
    async fn open(&self) -> E2eResult<Box<dyn Tunnel>> {
        let (username, access_key) = match (&self.connect.username, &self.connect.access_key) {
            (Some(user), Some(key)) if !user.is_empty() && !key.is_empty() => (user, key),
            _ => {
                return Err(E2eError::TunnelStartup(
                    "SAUCE_USERNAME and SAUCE_ACCESS_KEY must be set".to_string(),
                ))
            }
        };

        if tokio::fs::try_exists(&self.ready_file).await? {
            tokio::fs::remove_file(&self.ready_file).await?;
        }
        if let Some(parent) = self.ready_file.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        info!("Starting Sauce Connect as {}", username);
        let mut child = self.command(username, access_key).spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                E2eError::ToolNotFound(self.program.clone())
            } else {
                E2eError::TunnelStartup(format!("Failed to spawn {}: {}", self.program, e))
            }
        })?;

        if let Err(e) = self.wait_until_ready(&mut child).await {
            let _ = child.kill().await;
            return Err(e);
        }

        info!("Sauce Connect ready");
        Ok(Box::new(SauceConnectTunnel { child }))
    }
}

struct SauceConnectTunnel {
    child: Child,
}

#[async_trait]
impl Tunnel for SauceConnectTunnel {
    async fn close(&mut self) -> E2eResult<()> {
        // Sauce Connect tears the tunnel down cleanly on SIGTERM.
        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            if let Some(id) = self.child.id() {
                debug!("Stopping Sauce Connect (pid: {})", id);
                if kill(Pid::from_raw(id as i32), Signal::SIGTERM).is_ok()
                    && tokio::time::timeout(Duration::from_secs(10), self.child.wait())
                        .await
                        .is_ok()
                {
                    return Ok(());
                }
            }
        }

        self.child.kill().await?;
        Ok(())
    }
}

/// Per-batch statuses and their aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GridOutcome {
    pub batches: Vec<RunStatus>,
    pub status: RunStatus,
}

/// Runs the suite across a browser matrix on the remote grid.
pub struct RemoteGridCoordinator {
    launcher: Arc<dyn TunnelLauncher>,
    runner: TestRunner,
    overlay: Value,
}

impl RemoteGridCoordinator {
    /// `overlay` holds the karma settings every remote batch shares.
    pub fn new(launcher: Arc<dyn TunnelLauncher>, runner: TestRunner, overlay: Value) -> Self {
        Self {
            launcher,
            runner,
            overlay,
        }
    }

    /// Open the tunnel, run every batch in order, then stop the dev server
    /// and close the tunnel. A tunnel failure stops the server and is
    /// returned without running any tests.
    pub async fn run(
        &self,
        targets: &[BrowserTarget],
        concurrency: usize,
        server: Option<DevServer>,
        phases: &mut PhaseLog,
    ) -> E2eResult<GridOutcome> {
        let plan = match BatchPlan::new(targets, concurrency) {
            Ok(plan) => plan,
            Err(e) => {
                shutdown(server).await;
                return Err(e.into());
            }
        };

        let mut tunnel = match self.launcher.open().await {
            Ok(tunnel) => tunnel,
            Err(e) => {
                error!("Error starting tunnel: {}", e);
                phases.enter(RunPhase::TearingDown);
                shutdown(server).await;
                phases.enter(RunPhase::Failed);
                return Err(e);
            }
        };
        info!(
            "Running {} browser(s) in {} batch(es) of at most {}",
            plan.total(),
            plan.len(),
            plan.limit()
        );

        phases.enter(RunPhase::TestsRunning);
        let batches: Vec<RunStatus> = futures::stream::iter(plan)
            .then(|batch| self.run_batch(batch))
            .collect()
            .await;
        let status = RunStatus::worst(batches.iter().copied());
        info!("Batch results {:?}, reporting {}", batches, status);

        phases.enter(RunPhase::TearingDown);
        shutdown(server).await;
        match tunnel.close().await {
            Ok(()) => info!("Closed tunnel"),
            Err(e) => warn!("Error closing tunnel: {}", e),
        }
        phases.enter(if status.is_success() {
            RunPhase::Passed
        } else {
            RunPhase::Failed
        });

        Ok(GridOutcome { batches, status })
    }

    async fn run_batch(&self, batch: Batch<BrowserTarget>) -> RunStatus {
        let names: Vec<String> = batch.items.iter().map(ToString::to_string).collect();
        info!("Batch {}: {}", batch.number + 1, names.join(", "));

        let request = SuiteRequest::for_batch(&batch, &self.overlay);
        let status = self.runner.run_batch(&request).await;

        info!("Batch {} finished with code {}", batch.number + 1, status);
        status
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connect(username: Option<&str>) -> SauceConnectConfig {
        SauceConnectConfig {
            username: username.map(String::from),
            access_key: Some("key".to_string()),
            tunnel_identifier: Some("ci-42".to_string()),
            ready_timeout_secs: 1,
        }
    }

    #[tokio::test]
    async fn test_missing_credentials_fail_before_spawn() {
        let launcher = SauceConnectLauncher::new("sc", connect(None), "/tmp/tdbuild-sc.ready");
        let err = launcher.open().await.err().unwrap();
        assert!(matches!(err, E2eError::TunnelStartup(_)));
        assert!(err.is_setup_failure());
    }

    #[tokio::test]
    async fn test_missing_binary_is_tool_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let launcher = SauceConnectLauncher::new(
            "tdbuild-no-such-sc",
            connect(Some("user")),
            dir.path().join("sc.ready"),
        );
        let err = launcher.open().await.err().unwrap();
        assert!(matches!(err, E2eError::ToolNotFound(_)));
    }

    #[test]
    fn test_command_passes_tunnel_identifier() {
        let launcher = SauceConnectLauncher::new("sc", connect(Some("user")), "sc.ready");
        let cmd = launcher.command("user", "key");
        let args: Vec<String> = cmd
            .as_std()
            .get_args()
            .map(|a| a.to_string_lossy().to_string())
            .collect();
        assert_eq!(
            args,
            [
                "--user",
                "user",
                "--api-key",
                "key",
                "--readyfile",
                "sc.ready",
                "--tunnel-identifier",
                "ci-42"
            ]
        );
    }
}
