//! Karma invocation
//!
//! Every suite run goes through a generated wrapper config that loads the
//! project's karma config and overlays per-run settings (single-run flag,
//! browsers, custom launchers) on top of it.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::process::Command;
use tracing::{debug, info};

use tdbuild_common::{Batch, BrowserTarget, RunStatus};

use crate::error::{E2eError, E2eResult};

/// Launcher base used for every remote browser.
pub const SAUCE_LAUNCHER_BASE: &str = "SauceLabs";

/// One invocation of the browser suite.
#[derive(Debug, Clone, PartialEq)]
pub struct SuiteRequest {
    /// Used to name the generated config (`karma.<label>.conf.js`)
    pub label: String,
    pub single_run: bool,
    /// Browser names to launch; `None` keeps whatever the base config lists
    pub browsers: Option<Vec<String>>,
    pub custom_launchers: Map<String, Value>,
    /// Extra karma settings applied before the per-run fields
    pub overlay: Value,
}

impl SuiteRequest {
    /// Run against the locally configured browsers.
    pub fn local(single_run: bool) -> Self {
        Self {
            label: "local".to_string(),
            single_run,
            browsers: None,
            custom_launchers: Map::new(),
            overlay: Value::Object(Map::new()),
        }
    }

    /// Run one batch of remote browsers. Launchers are keyed by each
    /// target's index in the full browser list, so names stay unique across
    /// batches.
    pub fn for_batch(batch: &Batch<BrowserTarget>, overlay: &Value) -> Self {
        let mut custom_launchers = Map::new();
        let mut browsers = Vec::with_capacity(batch.items.len());

        for (index, target) in batch.indexed() {
            let key = index.to_string();
            custom_launchers.insert(key.clone(), launcher_for(target));
            browsers.push(key);
        }

        Self {
            label: format!("batch-{}", batch.number),
            single_run: true,
            browsers: Some(browsers),
            custom_launchers,
            overlay: overlay.clone(),
        }
    }

    /// Settings merged over the base karma config.
    pub fn settings(&self) -> Value {
        let mut settings = match &self.overlay {
            Value::Object(map) => map.clone(),
            _ => Map::new(),
        };

        settings.insert("singleRun".to_string(), Value::Bool(self.single_run));
        settings.insert("autoWatch".to_string(), Value::Bool(!self.single_run));
        if let Some(browsers) = &self.browsers {
            settings.insert(
                "browsers".to_string(),
                Value::Array(browsers.iter().cloned().map(Value::String).collect()),
            );
        }
        if !self.custom_launchers.is_empty() {
            settings.insert(
                "customLaunchers".to_string(),
                Value::Object(self.custom_launchers.clone()),
            );
        }

        Value::Object(settings)
    }
}

fn launcher_for(target: &BrowserTarget) -> Value {
    let mut launcher = Map::new();
    launcher.insert(
        "base".to_string(),
        Value::String(SAUCE_LAUNCHER_BASE.to_string()),
    );
    launcher.insert(
        "browserName".to_string(),
        Value::String(target.browser_name.clone()),
    );
    if let Some(version) = &target.version {
        launcher.insert("version".to_string(), Value::String(version.clone()));
    }
    if let Some(platform) = &target.platform {
        launcher.insert("platform".to_string(), Value::String(platform.clone()));
    }
    Value::Object(launcher)
}

/// Runs the browser suite once and reports its exit status.
#[async_trait]
pub trait SuiteRunner: Send + Sync {
    async fn run(&self, request: &SuiteRequest) -> E2eResult<RunStatus>;
}

/// [`SuiteRunner`] backed by the `karma` CLI.
#[derive(Debug, Clone)]
pub struct KarmaLauncher {
    program: String,
    base_config: PathBuf,
    work_dir: PathBuf,
}

impl KarmaLauncher {
    pub fn new(
        program: impl Into<String>,
        base_config: impl Into<PathBuf>,
        work_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            program: program.into(),
            base_config: base_config.into(),
            work_dir: work_dir.into(),
        }
    }

    /// Generate the wrapper config for `request`.
    ///
    /// The base config may either call `config.set` itself or return a
    /// settings object; both styles are supported.
    pub fn render_config(&self, base: &Path, request: &SuiteRequest) -> E2eResult<String> {
        let base = serde_json::to_string(&base.to_string_lossy())?;
        let settings = serde_json::to_string_pretty(&request.settings())?;

        Ok(format!(
            r#"// Generated by tdbuild. Do not edit.
var base = require({base});
var overlay = {settings};

module.exports = function (config) {{
  var settings = typeof base === 'function' ? base(config) : base;
  settings = settings || {{}};
  Object.keys(overlay).forEach(function (key) {{
    settings[key] = overlay[key];
  }});
  config.set(settings);
}};
"#
        ))
    }

    /// Write the wrapper config into the work dir and return its path.
    pub async fn write_config(&self, request: &SuiteRequest) -> E2eResult<PathBuf> {
        let base = tokio::fs::canonicalize(&self.base_config)
            .await
            .map_err(|e| {
                E2eError::Karma(format!(
                    "config {} not readable: {}",
                    self.base_config.display(),
                    e
                ))
            })?;

        tokio::fs::create_dir_all(&self.work_dir).await?;
        let path = self.work_dir.join(format!("karma.{}.conf.js", request.label));
        tokio::fs::write(&path, self.render_config(&base, request)?).await?;

        debug!("Wrote karma config {}", path.display());
        Ok(path)
    }
}

#[async_trait]
impl SuiteRunner for KarmaLauncher {
    async fn run(&self, request: &SuiteRequest) -> E2eResult<RunStatus> {
        let config = self.write_config(request).await?;

        let mut cmd = Command::new(&self.program);
        cmd.arg("start")
            .arg(&config)
            .arg(if request.single_run {
                "--single-run"
            } else {
                "--no-single-run"
            })
            .kill_on_drop(true);

        info!("Starting karma ({})", request.label);
        let status = cmd.status().await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                E2eError::ToolNotFound(self.program.clone())
            } else {
                E2eError::Io(e)
            }
        })?;

        let status = RunStatus::from(status);
        info!("Karma finished running with code {}", status);
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tdbuild_common::BatchPlan;

    fn targets() -> Vec<BrowserTarget> {
        vec![
            BrowserTarget::new("chrome"),
            BrowserTarget::new("firefox").with_version("52"),
            BrowserTarget::new("internet explorer")
                .with_version("11")
                .with_platform("Windows 10"),
        ]
    }

    #[test]
    fn test_local_request_keeps_base_browsers() {
        let settings = SuiteRequest::local(true).settings();
        assert_eq!(settings["singleRun"], true);
        assert_eq!(settings["autoWatch"], false);
        assert!(settings.get("browsers").is_none());
        assert!(settings.get("customLaunchers").is_none());
    }

    #[test]
    fn test_watch_request_enables_auto_watch() {
        let settings = SuiteRequest::local(false).settings();
        assert_eq!(settings["singleRun"], false);
        assert_eq!(settings["autoWatch"], true);
    }

    #[test]
    fn test_batch_launchers_use_global_indices() {
        let plan = BatchPlan::new(&targets(), 2).unwrap();
        let second = plan.iter().nth(1).unwrap();
        let request = SuiteRequest::for_batch(second, &serde_json::json!({"reporters": ["dots"]}));

        assert_eq!(request.label, "batch-1");
        assert_eq!(request.browsers, Some(vec!["2".to_string()]));

        let launcher = &request.custom_launchers["2"];
        assert_eq!(launcher["base"], "SauceLabs");
        assert_eq!(launcher["browserName"], "internet explorer");
        assert_eq!(launcher["version"], "11");
        assert_eq!(launcher["platform"], "Windows 10");

        let settings = request.settings();
        assert_eq!(settings["reporters"][0], "dots");
        assert_eq!(settings["browsers"][0], "2");
    }

    #[test]
    fn test_launcher_omits_unset_fields() {
        let launcher = launcher_for(&BrowserTarget::new("chrome"));
        assert!(launcher.get("version").is_none());
        assert!(launcher.get("platform").is_none());
    }

    #[test]
    fn test_render_config_wraps_base() {
        let launcher = KarmaLauncher::new("karma", "karma.conf.js", ".tdbuild");
        let script = launcher
            .render_config(Path::new("/project/karma.conf.js"), &SuiteRequest::local(true))
            .unwrap();

        assert!(script.contains(r#"require("/project/karma.conf.js")"#));
        assert!(script.contains(r#""singleRun": true"#));
        assert!(script.contains("config.set(settings);"));
    }

    #[tokio::test]
    async fn test_write_config_requires_base() {
        let dir = tempfile::tempdir().unwrap();
        let launcher = KarmaLauncher::new("karma", dir.path().join("missing.js"), dir.path());

        let err = launcher.write_config(&SuiteRequest::local(true)).await.unwrap_err();
        assert!(matches!(err, E2eError::Karma(_)));
    }

    #[tokio::test]
    async fn test_write_config_names_file_by_label() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("karma.conf.js");
        std::fs::write(&base, "module.exports = function () { return {}; };").unwrap();
        let launcher = KarmaLauncher::new("karma", &base, dir.path().join(".tdbuild"));

        let path = launcher.write_config(&SuiteRequest::local(false)).await.unwrap();
        assert!(path.ends_with(".tdbuild/karma.local.conf.js"));
        assert!(std::fs::read_to_string(path).unwrap().contains(r#""singleRun": false"#));
    }
}
