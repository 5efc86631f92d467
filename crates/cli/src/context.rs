//! Run context shared by the task actions of one pipeline run

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::info;

use tdbuild_common::{
    Artifact, ArtifactBuilder, BrowserifyBundler, Bundler, LoaderVars, Minifier, PhaseLog,
    ProjectConfig, Result, RunStatus, UglifyMinifier,
};
use tdbuild_e2e::{
    KarmaLauncher, NodeSpecRunner, SauceConnectLauncher, SpecRunner, SuiteRunner, TunnelLauncher,
};
use tdbuild_web::DevServer;

/// External programs the pipeline drives.
#[derive(Clone)]
pub struct Toolchain {
    pub bundler: Arc<dyn Bundler>,
    pub minifier: Arc<dyn Minifier>,
    pub suite: Arc<dyn SuiteRunner>,
    pub tunnel: Arc<dyn TunnelLauncher>,
    pub specs: Arc<dyn SpecRunner>,
}

impl Toolchain {
    pub fn from_config(config: &ProjectConfig) -> Self {
        let tools = &config.tools;
        let work_dir = config.work_dir();

        Self {
            bundler: Arc::new(BrowserifyBundler::new(&tools.browserify)),
            minifier: Arc::new(UglifyMinifier::new(&tools.uglify)),
            suite: Arc::new(KarmaLauncher::new(
                &tools.karma,
                &config.karma.config,
                &work_dir,
            )),
            tunnel: Arc::new(SauceConnectLauncher::new(
                &tools.sauce_connect,
                config.sauce.connect.clone().with_env_credentials(),
                work_dir.join("sc.ready"),
            )),
            specs: Arc::new(NodeSpecRunner::new(
                &tools.node,
                &config.e2e.hub_url,
                &config.e2e.browser,
            )),
        }
    }
}

/// State threaded through every task of a run.
///
/// `server` holds the only handle to the dev server. The task that starts it
/// stores it here; a test task takes it and stops it when done; anything
/// left over is stopped by the top-level teardown.
///
/// `compressing` holds the background compress pass, if one was started.
/// Later tasks run while it works; whoever drives the run joins it with
/// [`PipelineContext::finish_compress`] before reporting.
pub struct PipelineContext {
    pub config: ProjectConfig,
    pub tools: Toolchain,
    pub builder: ArtifactBuilder,
    pub vars: LoaderVars,
    pub server: Option<DevServer>,
    pub status: RunStatus,
    pub phases: PhaseLog,
    pub artifacts: Vec<Artifact>,
    pub compressing: Option<JoinHandle<Result<Vec<Artifact>>>>,
}

impl PipelineContext {
    pub fn new(config: ProjectConfig, tools: Toolchain, vars: LoaderVars) -> Self {
        let builder = ArtifactBuilder::new(
            config.folders.dist.clone(),
            tools.bundler.clone(),
            tools.minifier.clone(),
        );

        Self {
            config,
            tools,
            builder,
            vars,
            server: None,
            status: RunStatus::SUCCESS,
            phases: PhaseLog::new(),
            artifacts: Vec::new(),
            compressing: None,
        }
    }

    /// Gzip the dist outputs matching the compress pattern on a background
    /// task and return immediately.
    pub async fn start_compress(&mut self) -> Result<()> {
        self.finish_compress().await?;

        let builder = self.builder.clone();
        let pattern = self.config.compress.pattern.clone();
        self.compressing = Some(tokio::spawn(async move { builder.compress(&pattern).await }));
        Ok(())
    }

    /// Wait for the background compress pass, if any, and record its outputs.
    pub async fn finish_compress(&mut self) -> Result<()> {
        let Some(handle) = self.compressing.take() else {
            return Ok(());
        };
        let compressed = handle.await??;
        info!("Compressed {} file(s)", compressed.len());
        self.artifacts.extend(compressed);
        Ok(())
    }
}
