//! tdbuild CLI - Main Entry Point
//!
//! Runs a named pipeline task (and everything it depends on) for the td
//! JavaScript SDK: bundle builds, the dev server and browser test runs.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{debug, info};

use tdbuild_cli::output::{self, OutputFormat, TaskRow, TaskRunRow};
use tdbuild_cli::{graph, PipelineContext, PipelineGraph, TaskId, Toolchain};
use tdbuild_common::config::DEFAULT_CONFIG_FILE;
use tdbuild_common::{LoaderVars, ProjectConfig, RunStatus};

/// tdbuild - build and test the td JavaScript SDK
#[derive(Parser)]
#[command(name = "tdbuild")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Project configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE, global = true)]
    config: PathBuf,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Task to run (default: build)
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Clone, Copy)]
enum Commands {
    /// Remove build outputs (dotfiles are kept)
    Clean,
    /// Build the loader snippet
    Loader,
    /// Build the td bundle
    Td,
    /// Build the legacy bundle
    #[command(name = "td.legacy")]
    TdLegacy,
    /// Gzip the built bundles
    Compress,
    /// Build every artifact, then compress
    Build,
    /// Same as build
    Default,
    /// Serve test fixtures and the JSONP mock until interrupted
    Dev,
    /// Build, serve and rerun the browser suite on every change
    Tdd,
    /// Build, serve and run the browser suite once
    Test,
    /// Run the WebDriver specs against a local hub
    E2e,
    /// Build, serve and run the suite across the Sauce Labs browser matrix
    Ci,
    /// List tasks and their dependencies
    Tasks,
}

impl Commands {
    fn task(self) -> Option<TaskId> {
        Some(match self {
            Commands::Clean => TaskId::Clean,
            Commands::Loader => TaskId::Loader,
            Commands::Td => TaskId::Td,
            Commands::TdLegacy => TaskId::TdLegacy,
            Commands::Compress => TaskId::Compress,
            Commands::Build => TaskId::Build,
            Commands::Default => TaskId::Default,
            Commands::Dev => TaskId::Dev,
            Commands::Tdd => TaskId::Tdd,
            Commands::Test => TaskId::Test,
            Commands::E2e => TaskId::E2e,
            Commands::Ci => TaskId::Ci,
            Commands::Tasks => return None,
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .init();

    let config = ProjectConfig::load(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    let graph = graph(&config)?;

    let command = cli.command.unwrap_or(Commands::Default);
    let status = match command.task() {
        Some(target) => match run(&graph, target, config, &cli).await {
            Ok(status) => status,
            Err(e) => {
                output::print_error(&format!("{:#}", e));
                std::process::exit(1);
            }
        },
        None => {
            let rows: Vec<TaskRow> = graph
                .tasks()
                .map(|(id, deps)| TaskRow::new(id, deps))
                .collect();
            output::print_list(&rows, cli.format);
            RunStatus::SUCCESS
        }
    };

    if !status.is_success() {
        std::process::exit(status.code());
    }
    Ok(())
}

async fn run(
    graph: &PipelineGraph,
    target: TaskId,
    config: ProjectConfig,
    cli: &Cli,
) -> anyhow::Result<RunStatus> {
    let tools = Toolchain::from_config(&config);
    let mut ctx = PipelineContext::new(config, tools, LoaderVars::from_env());

    let result = graph.run(target, &mut ctx).await;
    // Compression may still be running behind the later tasks.
    let compressed = ctx.finish_compress().await;

    if result.is_ok() && target == TaskId::Dev && ctx.server.is_some() {
        info!("Dev server running, press Ctrl-C to stop");
        wait_for_signal().await?;
    }

    // Whatever still holds the server at this point, stop it.
    tdbuild_web::shutdown(ctx.server.take()).await;

    let report = result?;
    compressed?;
    debug!(
        "Ran {} task(s) in {} ms",
        report.tasks.len(),
        report.total_duration_ms()
    );

    if cli.verbose {
        let rows: Vec<TaskRunRow> = report.tasks.iter().map(TaskRunRow::from).collect();
        output::print_list(&rows, cli.format);
    }
    output::print_list(&ctx.artifacts, cli.format);
    output::print_status(target, ctx.status);

    Ok(ctx.status)
}

async fn wait_for_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        let mut terminate =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => result?,
            _ = terminate.recv() => {},
        }
    }

    #[cfg(not(unix))]
    tokio::signal::ctrl_c().await?;

    info!("Shutdown signal received");
    Ok(())
}
