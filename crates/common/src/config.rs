//! Project configuration

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::BrowserTarget;

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "tdbuild.toml";

/// Project configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    pub folders: FoldersConfig,
    pub bundles: BundlesConfig,
    pub tools: ToolsConfig,
    pub compress: CompressConfig,
    pub server: ServerConfig,
    pub tdd: TddConfig,
    pub karma: KarmaConfig,
    pub e2e: E2eConfig,
    pub sauce: SauceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FoldersConfig {
    /// Output directory for artifacts
    pub dist: PathBuf,

    /// Static test fixtures served by the dev server
    pub test: PathBuf,
}

impl Default for FoldersConfig {
    fn default() -> Self {
        Self {
            dist: PathBuf::from("dist"),
            test: PathBuf::from("test"),
        }
    }
}

/// Entry points of the artifact builds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BundlesConfig {
    pub index: PathBuf,
    pub legacy: PathBuf,
    /// Loader template containing the placeholder tokens
    pub loader: PathBuf,
}

impl Default for BundlesConfig {
    fn default() -> Self {
        Self {
            index: PathBuf::from("lib/index.js"),
            legacy: PathBuf::from("lib/legacy.js"),
            loader: PathBuf::from("src/loader.js"),
        }
    }
}

/// External programs the pipeline drives
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub browserify: String,
    pub uglify: String,
    pub karma: String,
    pub node: String,
    pub sauce_connect: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            browserify: "browserify".to_string(),
            uglify: "uglifyjs".to_string(),
            karma: "karma".to_string(),
            node: "node".to_string(),
            sauce_connect: "sc".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressConfig {
    /// File name pattern (`*` wildcard) selecting artifacts to gzip
    pub pattern: String,
}

impl Default for CompressConfig {
    fn default() -> Self {
        Self {
            pattern: "td*js".to_string(),
        }
    }
}

/// Dev server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,

    /// Body returned by the mock endpoint on success
    pub success: serde_json::Value,

    /// Body returned by the mock endpoint when the request mentions "error"
    pub error: serde_json::Value,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 9999,
            success: serde_json::json!({ "created": true }),
            error: serde_json::json!({
                "error": "Bad Request",
                "message": "Mock request failed"
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TddConfig {
    /// Source paths watched in watch mode
    pub watch: Vec<PathBuf>,
    pub debounce_ms: u64,
}

impl Default for TddConfig {
    fn default() -> Self {
        Self {
            watch: vec![PathBuf::from("lib"), PathBuf::from("src")],
            debounce_ms: 200,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KarmaConfig {
    /// JS module exporting a function that returns the base karma config
    pub config: PathBuf,
}

impl Default for KarmaConfig {
    fn default() -> Self {
        Self {
            config: PathBuf::from("karma.conf.js"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct E2eConfig {
    pub specs: PathBuf,
    pub pattern: String,
    pub hub_url: String,
    pub browser: String,
}

impl Default for E2eConfig {
    fn default() -> Self {
        Self {
            specs: PathBuf::from("test/e2e"),
            pattern: "*.spec.js".to_string(),
            hub_url: "http://localhost:4444/wd/hub".to_string(),
            browser: "chrome".to_string(),
        }
    }
}

/// Cloud grid configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SauceConfig {
    /// Maximum number of browsers running at once on the grid
    pub concurrency: usize,
    pub browsers: Vec<BrowserTarget>,
    /// Karma settings merged over the base config for cloud runs
    pub karma: serde_json::Value,
    pub connect: SauceConnectConfig,
}

impl Default for SauceConfig {
    fn default() -> Self {
        Self {
            concurrency: 3,
            browsers: Vec::new(),
            karma: serde_json::json!({
                "reporters": ["dots", "saucelabs"],
                "captureTimeout": 120000,
                "browserNoActivityTimeout": 120000
            }),
            connect: SauceConnectConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SauceConnectConfig {
    pub username: Option<String>,
    pub access_key: Option<String>,
    pub tunnel_identifier: Option<String>,
    pub ready_timeout_secs: u64,
}

impl Default for SauceConnectConfig {
    fn default() -> Self {
        Self {
            username: None,
            access_key: None,
            tunnel_identifier: None,
            ready_timeout_secs: 120,
        }
    }
}

impl SauceConnectConfig {
    /// Fill missing credentials from `SAUCE_USERNAME` / `SAUCE_ACCESS_KEY`.
    pub fn with_env_credentials(mut self) -> Self {
        if self.username.is_none() {
            self.username = std::env::var("SAUCE_USERNAME").ok();
        }
        if self.access_key.is_none() {
            self.access_key = std::env::var("SAUCE_ACCESS_KEY").ok();
        }
        self
    }
}

impl ProjectConfig {
    /// Load configuration from file, falling back to defaults when absent
    pub fn load(path: &Path) -> Result<Self> {
        let config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            toml::from_str(&content)?
        } else {
            Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.sauce.concurrency == 0 {
            return Err(Error::InvalidConfig(
                "sauce.concurrency must be greater than zero".to_string(),
            ));
        }
        if self.compress.pattern.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "compress.pattern must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Directory for files generated while running (karma wrappers, ready files)
    pub fn work_dir(&self) -> PathBuf {
        PathBuf::from(".tdbuild")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ProjectConfig::load(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config.folders.dist, PathBuf::from("dist"));
        assert_eq!(config.compress.pattern, "td*js");
        assert_eq!(config.server.port, 9999);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        std::fs::write(
            &path,
            r#"
[server]
port = 7777

[sauce]
concurrency = 2

[[sauce.browsers]]
browserName = "firefox"
version = "40"
platform = "Linux"

[[sauce.browsers]]
browserName = "safari"
"#,
        )
        .unwrap();

        let config = ProjectConfig::load(&path).unwrap();

        assert_eq!(config.server.port, 7777);
        assert_eq!(config.server.success, ServerConfig::default().success);
        assert_eq!(config.sauce.concurrency, 2);
        assert_eq!(config.sauce.browsers.len(), 2);
        assert_eq!(config.sauce.browsers[1], BrowserTarget::new("safari"));
        assert_eq!(config.tools.karma, "karma");
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        std::fs::write(&path, "[sauce]\nconcurrency = 0\n").unwrap();

        assert!(matches!(
            ProjectConfig::load(&path),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(DEFAULT_CONFIG_FILE);
        let mut config = ProjectConfig::default();
        config.e2e.browser = "firefox".to_string();

        config.save(&path).unwrap();
        let loaded = ProjectConfig::load(&path).unwrap();

        assert_eq!(loaded.e2e.browser, "firefox");
        assert_eq!(loaded.sauce.karma, config.sauce.karma);
    }
}
