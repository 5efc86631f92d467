//! Pipeline tasks and their dependency graph

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

use tdbuild_common::{
    ArtifactSpec, Error, LoaderVars, ProjectConfig, Result, RunPhase, TaskAction, TaskGraph,
};
use tdbuild_e2e::{
    E2eResult, E2eSuite, Rebuild, RemoteGridCoordinator, TestRunner, WatchConfig,
};
use tdbuild_web::{DevServer, DevServerConfig};

use crate::context::{PipelineContext, Toolchain};

/// Every task the CLI can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TaskId {
    Clean,
    Loader,
    Td,
    TdLegacy,
    Compress,
    Build,
    Default,
    Dev,
    Tdd,
    Test,
    E2e,
    Ci,
}

impl TaskId {
    pub const ALL: [TaskId; 12] = [
        TaskId::Clean,
        TaskId::Loader,
        TaskId::Td,
        TaskId::TdLegacy,
        TaskId::Compress,
        TaskId::Build,
        TaskId::Default,
        TaskId::Dev,
        TaskId::Tdd,
        TaskId::Test,
        TaskId::E2e,
        TaskId::Ci,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TaskId::Clean => "clean",
            TaskId::Loader => "loader",
            TaskId::Td => "td",
            TaskId::TdLegacy => "td.legacy",
            TaskId::Compress => "compress",
            TaskId::Build => "build",
            TaskId::Default => "default",
            TaskId::Dev => "dev",
            TaskId::Tdd => "tdd",
            TaskId::Test => "test",
            TaskId::E2e => "e2e",
            TaskId::Ci => "ci",
        }
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        TaskId::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| Error::UnknownTask(s.to_string()))
    }
}

pub type PipelineGraph = TaskGraph<TaskId, PipelineContext>;

/// The full task graph.
pub fn graph(config: &ProjectConfig) -> Result<PipelineGraph> {
    let bundles = &config.bundles;

    TaskGraph::builder()
        .define(TaskId::Clean, &[], CleanTask)
        .define(TaskId::Loader, &[], ArtifactTask(ArtifactSpec::loader(&bundles.loader)))
        .define(TaskId::Td, &[], ArtifactTask(ArtifactSpec::bundle(&bundles.index, "td.js")))
        .define(
            TaskId::TdLegacy,
            &[],
            ArtifactTask(ArtifactSpec::bundle(&bundles.legacy, "td.legacy.js")),
        )
        .define(TaskId::Compress, &[], CompressTask)
        .define(
            TaskId::Build,
            &[TaskId::Loader, TaskId::Td, TaskId::TdLegacy],
            CompressTask,
        )
        .alias(TaskId::Default, &[TaskId::Build])
        .define(TaskId::Dev, &[], DevTask)
        .define(TaskId::Tdd, &[TaskId::Build, TaskId::Dev], TddTask)
        .define(TaskId::Test, &[TaskId::Build, TaskId::Dev], TestTask)
        .define(TaskId::E2e, &[], E2eTask)
        .define(TaskId::Ci, &[TaskId::Build, TaskId::Dev], CiTask)
        .build()
}

struct CleanTask;

#[async_trait]
impl TaskAction<PipelineContext> for CleanTask {
    async fn run(&self, ctx: &mut PipelineContext) -> Result<()> {
        let removed = ctx.builder.clean().await?;
        info!("Removed {} entries from {}", removed, ctx.builder.out_dir().display());
        Ok(())
    }
}

struct ArtifactTask(ArtifactSpec);

#[async_trait]
impl TaskAction<PipelineContext> for ArtifactTask {
    async fn run(&self, ctx: &mut PipelineContext) -> Result<()> {
        ctx.phases.enter(RunPhase::ArtifactsBuilding);
        let built = ctx.builder.build(&self.0, &ctx.vars).await?;
        ctx.artifacts.extend(built.files().cloned());
        Ok(())
    }
}

/// Starts the compress pass in the background. Karma only serves the raw
/// and minified scripts, so later tasks do not wait for the `.gz` files.
struct CompressTask;

#[async_trait]
impl TaskAction<PipelineContext> for CompressTask {
    async fn run(&self, ctx: &mut PipelineContext) -> Result<()> {
        ctx.phases.enter(RunPhase::ArtifactsBuilding);
        ctx.start_compress().await
    }
}

struct DevTask;

#[async_trait]
impl TaskAction<PipelineContext> for DevTask {
    async fn run(&self, ctx: &mut PipelineContext) -> Result<()> {
        if ctx.server.is_some() {
            return Ok(());
        }
        ctx.phases.enter(RunPhase::ServerStarting);
        let server = DevServer::start(DevServerConfig::from_project(&ctx.config)).await?;
        ctx.server = Some(server);
        Ok(())
    }
}

struct TestTask;

#[async_trait]
impl TaskAction<PipelineContext> for TestTask {
    async fn run(&self, ctx: &mut PipelineContext) -> Result<()> {
        let runner = TestRunner::new(ctx.tools.suite.clone());
        ctx.status = runner.run_once(ctx.server.take(), &mut ctx.phases).await;
        Ok(())
    }
}

struct TddTask;

#[async_trait]
impl TaskAction<PipelineContext> for TddTask {
    async fn run(&self, ctx: &mut PipelineContext) -> Result<()> {
        let runner = TestRunner::new(ctx.tools.suite.clone());
        let watch = WatchConfig {
            paths: ctx.config.tdd.watch.clone(),
            debounce: Duration::from_millis(ctx.config.tdd.debounce_ms),
        };
        let rebuild = GraphRebuild {
            config: ctx.config.clone(),
            tools: ctx.tools.clone(),
            vars: ctx.vars.clone(),
        };

        ctx.status = runner
            .watch(ctx.server.take(), &watch, &rebuild, &mut ctx.phases)
            .await?;
        Ok(())
    }
}

struct E2eTask;

#[async_trait]
impl TaskAction<PipelineContext> for E2eTask {
    async fn run(&self, ctx: &mut PipelineContext) -> Result<()> {
        let e2e = &ctx.config.e2e;
        let suite = E2eSuite::new(ctx.tools.specs.clone(), &e2e.specs, &e2e.pattern);
        ctx.status = suite.run(&mut ctx.phases).await?;
        Ok(())
    }
}

struct CiTask;

#[async_trait]
impl TaskAction<PipelineContext> for CiTask {
    async fn run(&self, ctx: &mut PipelineContext) -> Result<()> {
        let sauce = &ctx.config.sauce;
        let coordinator = RemoteGridCoordinator::new(
            ctx.tools.tunnel.clone(),
            TestRunner::new(ctx.tools.suite.clone()),
            sauce.karma.clone(),
        );

        let outcome = coordinator
            .run(
                &sauce.browsers,
                sauce.concurrency,
                ctx.server.take(),
                &mut ctx.phases,
            )
            .await?;
        ctx.status = outcome.status;
        Ok(())
    }
}

/// Watch-mode rebuild: runs `build` on a fresh context.
struct GraphRebuild {
    config: ProjectConfig,
    tools: Toolchain,
    vars: LoaderVars,
}

#[async_trait]
impl Rebuild for GraphRebuild {
    async fn rebuild(&self) -> E2eResult<()> {
        let graph = graph(&self.config)?;
        let mut ctx = PipelineContext::new(
            self.config.clone(),
            self.tools.clone(),
            self.vars.clone(),
        );
        let result = graph.run(TaskId::Build, &mut ctx).await;
        ctx.finish_compress().await?;
        result?;
        Ok(())
    }
}
