//! Output formatting for CLI

use clap::ValueEnum;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

use tdbuild_common::graph::TaskRecord;
use tdbuild_common::{Artifact, RunStatus, TaskState};

use crate::tasks::TaskId;

/// Output format
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format
    Json,
    /// YAML format
    Yaml,
    /// Plain text format
    Plain,
}

/// Trait for items that can be displayed in a table
pub trait TableDisplay {
    fn headers() -> Vec<&'static str>;
    fn row(&self) -> Vec<String>;
}

impl TableDisplay for Artifact {
    fn headers() -> Vec<&'static str> {
        vec!["File", "Size", "SHA-256"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.file_name(),
            format_size(self.size),
            self.sha256.chars().take(16).collect(),
        ]
    }
}

/// A task and what it depends on.
#[derive(Debug, Clone, Serialize)]
pub struct TaskRow {
    pub task: String,
    pub depends_on: Vec<String>,
}

impl TaskRow {
    pub fn new(id: TaskId, deps: &[TaskId]) -> Self {
        Self {
            task: id.to_string(),
            depends_on: deps.iter().map(ToString::to_string).collect(),
        }
    }
}

impl TableDisplay for TaskRow {
    fn headers() -> Vec<&'static str> {
        vec!["Task", "Depends on"]
    }

    fn row(&self) -> Vec<String> {
        let deps = if self.depends_on.is_empty() {
            "-".to_string()
        } else {
            self.depends_on.join(", ")
        };
        vec![self.task.clone(), deps]
    }
}

/// One executed task of a run.
#[derive(Debug, Clone, Serialize)]
pub struct TaskRunRow {
    pub task: String,
    pub state: TaskState,
    pub duration_ms: u64,
}

impl From<&TaskRecord<TaskId>> for TaskRunRow {
    fn from(record: &TaskRecord<TaskId>) -> Self {
        Self {
            task: record.id.to_string(),
            state: record.state,
            duration_ms: record.duration_ms,
        }
    }
}

impl TableDisplay for TaskRunRow {
    fn headers() -> Vec<&'static str> {
        vec!["Task", "State", "Duration"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.task.clone(),
            self.state.to_string(),
            format!("{} ms", self.duration_ms),
        ]
    }
}

/// Print a list of items
pub fn print_list<T: Serialize + TableDisplay>(items: &[T], format: OutputFormat) {
    if items.is_empty() {
        return;
    }

    match format {
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic);

            table.set_header(T::headers());
            for item in items {
                table.add_row(item.row());
            }

            println!("{table}");
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(items).unwrap_or_default());
        }
        OutputFormat::Yaml => {
            println!("{}", serde_yaml::to_string(items).unwrap_or_default());
        }
        OutputFormat::Plain => {
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    println!("---");
                }
                let row = item.row();
                for (header, value) in T::headers().iter().zip(row.iter()) {
                    println!("{}: {}", header, value);
                }
            }
        }
    }
}

/// Final line of a run
pub fn print_status(target: TaskId, status: RunStatus) {
    if status.is_success() {
        println!("{} '{}' finished", "✅".green(), target);
    } else {
        eprintln!(
            "{} '{}' finished with exit code {}",
            "❌".red(),
            target,
            status
        );
    }
}

/// Print error message
pub fn print_error(message: &str) {
    eprintln!("{}", error_line(message));
}

fn error_line(message: &str) -> String {
    format!("{} {}", "Error:".red().bold(), message)
}

fn format_size(bytes: u64) -> String {
    const KIB: u64 = 1024;
    if bytes < KIB {
        format!("{} B", bytes)
    } else if bytes < KIB * KIB {
        format!("{:.1} KiB", bytes as f64 / KIB as f64)
    } else {
        format!("{:.1} MiB", bytes as f64 / (KIB * KIB) as f64)
    }
}
