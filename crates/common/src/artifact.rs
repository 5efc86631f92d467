//! Artifact pipeline
//!
//! Produces the browser-loadable build outputs:
//! - bundles resolved from an entry point by an external bundler
//! - the loader snippet, built from a template by placeholder substitution
//! - minified variants (`<stem>.min.js`) of each
//! - gzip copies of every output matching the compress pattern
//!
//! Bundling and minification are delegated to external programs behind the
//! [`Bundler`] and [`Minifier`] traits. Outputs are assembled in memory and
//! only written once every stage of an artifact has succeeded.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use flate2::write::GzEncoder;
use flate2::Compression;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// Placeholder replaced by the loader URL.
pub const URL_TOKEN: &str = "@URL";
/// Placeholder replaced by the global symbol name.
pub const SDK_GLOBAL_TOKEN: &str = "@SDK_GLOBAL";
pub const DEFAULT_URL: &str = "//td.js";
pub const DEFAULT_SDK_GLOBAL: &str = "Treasure";

/// How an artifact's raw output is produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactSource {
    /// Resolve the entry point and everything it requires into one file.
    Bundle,
    /// Copy the template, substituting the loader placeholders.
    Template,
}

/// Description of one artifact build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactSpec {
    pub entry: PathBuf,
    /// Output file name inside the dist directory
    pub output: String,
    pub source: ArtifactSource,
    pub minify: bool,
    /// Whether the output is expected to be picked up by the compress pass
    pub compress: bool,
}

impl ArtifactSpec {
    pub fn bundle(entry: impl Into<PathBuf>, output: impl Into<String>) -> Self {
        Self {
            entry: entry.into(),
            output: output.into(),
            source: ArtifactSource::Bundle,
            minify: true,
            compress: true,
        }
    }

    /// The loader output is named after its template file.
    pub fn loader(template: impl Into<PathBuf>) -> Self {
        let entry = template.into();
        let output = entry
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "loader.js".to_string());
        Self {
            entry,
            output,
            source: ArtifactSource::Template,
            minify: true,
            compress: false,
        }
    }

    /// `td.legacy.js` -> `td.legacy.min.js`
    pub fn minified_output(&self) -> String {
        match self.output.rsplit_once('.') {
            Some((stem, ext)) => format!("{}.min.{}", stem, ext),
            None => format!("{}.min", self.output),
        }
    }
}

/// A file written by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub path: PathBuf,
    pub size: u64,
    pub sha256: String,
}

impl Artifact {
    fn from_bytes(path: PathBuf, bytes: &[u8]) -> Self {
        Self {
            path,
            size: bytes.len() as u64,
            sha256: sha256_hex(bytes),
        }
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

/// Outputs of one [`ArtifactSpec`]: the raw file and, when requested, its
/// minified variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuiltArtifact {
    pub raw: Artifact,
    pub min: Option<Artifact>,
}

impl BuiltArtifact {
    pub fn files(&self) -> impl Iterator<Item = &Artifact> {
        std::iter::once(&self.raw).chain(self.min.iter())
    }
}

/// Resolves an entry point into one self-contained script.
#[async_trait]
pub trait Bundler: Send + Sync {
    async fn bundle(&self, entry: &Path) -> Result<Vec<u8>>;
}

/// Rewrites a script into a smaller, behaviorally equivalent one.
#[async_trait]
pub trait Minifier: Send + Sync {
    async fn minify(&self, source: &[u8]) -> Result<Vec<u8>>;
}

/// Runs `program args...`, feeding `stdin` when given, and returns stdout.
async fn run_tool(program: &str, args: &[&str], stdin: Option<&[u8]>) -> Result<Vec<u8>> {
    debug!("Running {} {:?}", program, args);

    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd.spawn().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::ToolNotFound(program.to_string())
        } else {
            Error::Io(e)
        }
    })?;

    // Stdin is fed while stdout and stderr drain.
    let pipe = child.stdin.take();
    let feed = async move {
        if let (Some(input), Some(mut pipe)) = (stdin, pipe) {
            pipe.write_all(input).await?;
        }
        // Dropping the pipe closes stdin.
        Ok::<_, std::io::Error>(())
    };

    let (fed, output) = tokio::join!(feed, child.wait_with_output());
    let output = output?;
    if !output.status.success() {
        return Err(Error::ToolFailed {
            tool: program.to_string(),
            status: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    match fed {
        // The tool exited successfully without reading all of its input.
        Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {
            debug!("{} closed stdin early", program);
        }
        Err(e) => return Err(e.into()),
        Ok(()) => {}
    }

    Ok(output.stdout)
}

/// Bundler backed by the `browserify` CLI.
#[derive(Debug, Clone)]
pub struct BrowserifyBundler {
    program: String,
}

impl BrowserifyBundler {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl Bundler for BrowserifyBundler {
    async fn bundle(&self, entry: &Path) -> Result<Vec<u8>> {
        let entry = entry.to_string_lossy();
        run_tool(&self.program, &[entry.as_ref()], None).await
    }
}

/// Minifier backed by the `uglifyjs` CLI reading from stdin.
#[derive(Debug, Clone)]
pub struct UglifyMinifier {
    program: String,
}

impl UglifyMinifier {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl Minifier for UglifyMinifier {
    async fn minify(&self, source: &[u8]) -> Result<Vec<u8>> {
        run_tool(&self.program, &["-", "--compress", "--mangle"], Some(source)).await
    }
}

/// Values substituted into the loader template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderVars {
    pub url: String,
    pub sdk_global: String,
}

impl Default for LoaderVars {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            sdk_global: DEFAULT_SDK_GLOBAL.to_string(),
        }
    }
}

impl LoaderVars {
    /// Read `URL` and `SDK_GLOBAL` from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve values through `lookup`; unset or empty values use defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str, default: &str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };
        Self {
            url: value("URL", DEFAULT_URL),
            sdk_global: value("SDK_GLOBAL", DEFAULT_SDK_GLOBAL),
        }
    }

    /// Replace every placeholder occurrence; `@URL` first, then `@SDK_GLOBAL`.
    pub fn apply(&self, template: &str) -> String {
        template
            .replace(URL_TOKEN, &self.url)
            .replace(SDK_GLOBAL_TOKEN, &self.sdk_global)
    }
}

/// Builds artifacts into the dist directory.
#[derive(Clone)]
pub struct ArtifactBuilder {
    out_dir: PathBuf,
    bundler: Arc<dyn Bundler>,
    minifier: Arc<dyn Minifier>,
}

impl ArtifactBuilder {
    pub fn new(
        out_dir: impl Into<PathBuf>,
        bundler: Arc<dyn Bundler>,
        minifier: Arc<dyn Minifier>,
    ) -> Self {
        Self {
            out_dir: out_dir.into(),
            bundler,
            minifier,
        }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Build one artifact. The entry point must exist; nothing is written
    /// unless bundling (or substitution) and minification all succeed.
    pub async fn build(&self, spec: &ArtifactSpec, vars: &LoaderVars) -> Result<BuiltArtifact> {
        if !spec.entry.is_file() {
            return Err(Error::EntryPointNotFound(spec.entry.clone()));
        }

        let raw = match spec.source {
            ArtifactSource::Bundle => self.bundler.bundle(&spec.entry).await?,
            ArtifactSource::Template => {
                let template = tokio::fs::read_to_string(&spec.entry).await?;
                vars.apply(&template).into_bytes()
            }
        };

        let min = if spec.minify {
            Some(self.minifier.minify(&raw).await?)
        } else {
            None
        };

        tokio::fs::create_dir_all(&self.out_dir).await?;

        let raw = Staged::new(&self.out_dir, &spec.output, raw);
        let min = min.map(|bytes| Staged::new(&self.out_dir, &spec.minified_output(), bytes));
        let staged: Vec<&Staged> = std::iter::once(&raw).chain(min.as_ref()).collect();

        if let Err(e) = publish(&staged).await {
            for file in &staged {
                file.discard().await;
            }
            return Err(e);
        }

        Ok(BuiltArtifact {
            raw: raw.into_artifact(),
            min: min.map(Staged::into_artifact),
        })
    }

    /// Gzip every output whose name matches `pattern` into `<name>.gz`.
    ///
    /// Files are compressed concurrently on blocking worker threads.
    pub async fn compress(&self, pattern: &str) -> Result<Vec<Artifact>> {
        let matcher = wildcard(pattern)?;
        let mut sources = Vec::new();

        if self.out_dir.is_dir() {
            let mut entries = tokio::fs::read_dir(&self.out_dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let name = entry.file_name().to_string_lossy().to_string();
                if entry.file_type().await?.is_file()
                    && !name.ends_with(".gz")
                    && matcher.is_match(&name)
                {
                    sources.push(entry.path());
                }
            }
        }
        sources.sort();

        let jobs = sources
            .into_iter()
            .map(|path| tokio::task::spawn_blocking(move || gzip_file(&path)));
        let results = futures::future::join_all(jobs).await;

        let mut artifacts = Vec::with_capacity(results.len());
        for result in results {
            let artifact = result??;
            info!("Compressed {} ({} bytes)", artifact.path.display(), artifact.size);
            artifacts.push(artifact);
        }
        Ok(artifacts)
    }

    /// Remove everything in the dist directory except dotfiles.
    pub async fn clean(&self) -> Result<usize> {
        if !self.out_dir.is_dir() {
            return Ok(0);
        }

        let mut removed = 0;
        let mut entries = tokio::fs::read_dir(&self.out_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_name().to_string_lossy().starts_with('.') {
                continue;
            }
            let path = entry.path();
            if entry.file_type().await?.is_dir() {
                tokio::fs::remove_dir_all(&path).await?;
            } else {
                tokio::fs::remove_file(&path).await?;
            }
            debug!("Removed {}", path.display());
            removed += 1;
        }

        if removed == 0 {
            warn!("Nothing to clean in {}", self.out_dir.display());
        }
        Ok(removed)
    }
}

/// One output held under a temporary name until every output of its
/// artifact is on disk.
struct Staged {
    temp: PathBuf,
    path: PathBuf,
    bytes: Vec<u8>,
}

impl Staged {
    fn new(dir: &Path, name: &str, bytes: Vec<u8>) -> Self {
        Self {
            temp: dir.join(format!(".{}.tmp", name)),
            path: dir.join(name),
            bytes,
        }
    }

    async fn discard(&self) {
        if let Err(e) = tokio::fs::remove_file(&self.temp).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Failed to remove {}: {}", self.temp.display(), e);
            }
        }
    }

    fn into_artifact(self) -> Artifact {
        Artifact::from_bytes(self.path, &self.bytes)
    }
}

/// Write every staged file, then move them all into place. A failed move
/// removes the outputs already moved, so an artifact is never half written.
async fn publish(staged: &[&Staged]) -> Result<()> {
    for file in staged {
        tokio::fs::write(&file.temp, &file.bytes).await?;
    }

    for (i, file) in staged.iter().enumerate() {
        if let Err(e) = tokio::fs::rename(&file.temp, &file.path).await {
            for done in &staged[..i] {
                if let Err(e) = tokio::fs::remove_file(&done.path).await {
                    warn!("Failed to remove {}: {}", done.path.display(), e);
                }
            }
            return Err(e.into());
        }
        info!(
            "Wrote {} ({} bytes)",
            file.path.display(),
            file.bytes.len()
        );
    }
    Ok(())
}

fn gzip_file(path: &Path) -> Result<Artifact> {
    use std::io::Write;

    let input = std::fs::read(path)?;
    let mut encoder = GzEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(&input)?;
    let compressed = encoder.finish()?;

    let mut target = path.as_os_str().to_owned();
    target.push(".gz");
    let target = PathBuf::from(target);
    std::fs::write(&target, &compressed)?;

    Ok(Artifact::from_bytes(target, &compressed))
}

/// Anchored regex for a `*`-wildcard file name pattern.
pub fn wildcard(pattern: &str) -> Result<Regex> {
    let body = pattern
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");
    Regex::new(&format!("^{}$", body)).map_err(|e| Error::InvalidConfig(e.to_string()))
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Emits a fixed banner followed by the entry file contents.
    struct ConcatBundler;

    #[async_trait]
    impl Bundler for ConcatBundler {
        async fn bundle(&self, entry: &Path) -> Result<Vec<u8>> {
            let mut out = b"(function(){\n".to_vec();
            out.extend(std::fs::read(entry)?);
            out.extend_from_slice(b"\n})();\n");
            Ok(out)
        }
    }

    /// Strips whitespace; counts invocations.
    #[derive(Default)]
    struct SqueezeMinifier {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Minifier for SqueezeMinifier {
        async fn minify(&self, source: &[u8]) -> Result<Vec<u8>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(source
                .iter()
                .copied()
                .filter(|b| !b.is_ascii_whitespace())
                .collect())
        }
    }

    struct BrokenMinifier;

    #[async_trait]
    impl Minifier for BrokenMinifier {
        async fn minify(&self, _source: &[u8]) -> Result<Vec<u8>> {
            Err(Error::ToolFailed {
                tool: "uglifyjs".to_string(),
                status: 1,
                stderr: "Unexpected token".to_string(),
            })
        }
    }

    fn builder(dir: &Path, minifier: Arc<dyn Minifier>) -> ArtifactBuilder {
        ArtifactBuilder::new(dir.join("dist"), Arc::new(ConcatBundler), minifier)
    }

    #[test]
    fn test_minified_output_name() {
        assert_eq!(ArtifactSpec::bundle("a", "td.js").minified_output(), "td.min.js");
        assert_eq!(
            ArtifactSpec::bundle("a", "td.legacy.js").minified_output(),
            "td.legacy.min.js"
        );
        assert_eq!(ArtifactSpec::loader("src/loader.js").output, "loader.js");
    }

    #[test]
    fn test_loader_defaults_when_env_unset() {
        let vars = LoaderVars::from_lookup(|_| None);
        let out = vars.apply("load('@URL', '@SDK_GLOBAL');");
        assert_eq!(out, "load('//td.js', 'Treasure');");
    }

    #[test]
    fn test_loader_uses_env_values() {
        let vars = LoaderVars::from_lookup(|key| match key {
            "URL" => Some("https://cdn.example.com/x.js".to_string()),
            "SDK_GLOBAL" => Some("Acme".to_string()),
            _ => None,
        });
        let template = "!function(){var u='@URL';window['@SDK_GLOBAL']=u;/* @URL */}();";
        assert_eq!(
            vars.apply(template),
            "!function(){var u='https://cdn.example.com/x.js';window['Acme']=u;/* https://cdn.example.com/x.js */}();"
        );
    }

    #[tokio::test]
    async fn test_bundle_writes_raw_and_minified() {
        let dir = tempfile::tempdir().unwrap();
        let entry = dir.path().join("index.js");
        std::fs::write(&entry, "var a = 1;").unwrap();
        let minifier = Arc::new(SqueezeMinifier::default());
        let builder = builder(dir.path(), minifier.clone());

        let built = builder
            .build(&ArtifactSpec::bundle(&entry, "td.js"), &LoaderVars::default())
            .await
            .unwrap();

        let raw = std::fs::read_to_string(&built.raw.path).unwrap();
        assert!(raw.contains("var a = 1;"));
        let min = built.min.as_ref().unwrap();
        assert_eq!(min.file_name(), "td.min.js");
        assert_eq!(std::fs::read_to_string(&min.path).unwrap(), "(function(){vara=1;})();");
        assert_eq!(minifier.calls.load(Ordering::SeqCst), 1);
        assert_eq!(built.files().count(), 2);
    }

    #[tokio::test]
    async fn test_bundle_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let entry = dir.path().join("index.js");
        std::fs::write(&entry, "module.exports = 42;").unwrap();
        let builder = builder(dir.path(), Arc::new(SqueezeMinifier::default()));
        let spec = ArtifactSpec::bundle(&entry, "td.js");

        let first = builder.build(&spec, &LoaderVars::default()).await.unwrap();
        let second = builder.build(&spec, &LoaderVars::default()).await.unwrap();

        assert_eq!(first.raw.sha256, second.raw.sha256);
    }

    #[tokio::test]
    async fn test_loader_substitutes_before_minify() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("loader.js");
        std::fs::write(&template, "x('@URL', @SDK_GLOBAL);").unwrap();
        let builder = builder(dir.path(), Arc::new(SqueezeMinifier::default()));
        let vars = LoaderVars {
            url: "https://cdn.example.com/x.js".to_string(),
            sdk_global: "Acme".to_string(),
        };

        let built = builder
            .build(&ArtifactSpec::loader(&template), &vars)
            .await
            .unwrap();

        assert_eq!(
            std::fs::read_to_string(&built.raw.path).unwrap(),
            "x('https://cdn.example.com/x.js', Acme);"
        );
        let min = std::fs::read_to_string(&built.min.unwrap().path).unwrap();
        assert!(min.contains("https://cdn.example.com/x.js"));
        assert!(!min.contains('@'));
    }

    #[tokio::test]
    async fn test_missing_entry_point_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let builder = builder(dir.path(), Arc::new(SqueezeMinifier::default()));

        let err = builder
            .build(
                &ArtifactSpec::bundle(dir.path().join("missing.js"), "td.js"),
                &LoaderVars::default(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, Error::EntryPointNotFound(_)));
        assert!(!dir.path().join("dist").join("td.js").exists());
    }

    #[tokio::test]
    async fn test_failed_minify_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let entry = dir.path().join("index.js");
        std::fs::write(&entry, "var a;").unwrap();
        let builder = builder(dir.path(), Arc::new(BrokenMinifier));

        let err = builder
            .build(&ArtifactSpec::bundle(&entry, "td.js"), &LoaderVars::default())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::ToolFailed { .. }));
        assert!(!dir.path().join("dist").join("td.js").exists());
    }

    #[tokio::test]
    async fn test_failed_minified_write_leaves_no_raw_output() {
        let dir = tempfile::tempdir().unwrap();
        let entry = dir.path().join("index.js");
        std::fs::write(&entry, "var a;").unwrap();
        let dist = dir.path().join("dist");
        // A directory squatting on the minified name makes its move fail.
        std::fs::create_dir_all(dist.join("td.min.js").join("occupied")).unwrap();
        let builder = builder(dir.path(), Arc::new(SqueezeMinifier::default()));

        let err = builder
            .build(&ArtifactSpec::bundle(&entry, "td.js"), &LoaderVars::default())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Io(_)));
        assert!(!dist.join("td.js").exists());
        let leftovers: Vec<String> = std::fs::read_dir(&dist)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(leftovers, vec!["td.min.js"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_tool_streams_large_input() {
        let input = vec![b'a'; 2 * 1024 * 1024];

        let output = tokio::time::timeout(
            std::time::Duration::from_secs(10),
            run_tool("cat", &[], Some(&input)),
        )
        .await
        .expect("tool stalled on a full pipe")
        .unwrap();

        assert_eq!(output.len(), input.len());
    }

    #[tokio::test]
    async fn test_compress_selects_by_pattern() {
        let dir = tempfile::tempdir().unwrap();
        let dist = dir.path().join("dist");
        std::fs::create_dir_all(&dist).unwrap();
        for name in ["td.js", "td.min.js", "td.legacy.js", "loader.js", "td.js.map"] {
            std::fs::write(dist.join(name), format!("// {}", name)).unwrap();
        }
        let builder = builder(dir.path(), Arc::new(SqueezeMinifier::default()));

        let compressed = builder.compress("td*js").await.unwrap();

        let names: Vec<String> = compressed.iter().map(|a| a.file_name()).collect();
        assert_eq!(names, vec!["td.js.gz", "td.legacy.js.gz", "td.min.js.gz"]);

        let mut decoder =
            flate2::read::GzDecoder::new(std::fs::File::open(dist.join("td.js.gz")).unwrap());
        let mut text = String::new();
        decoder.read_to_string(&mut text).unwrap();
        assert_eq!(text, "// td.js");

        // A second pass does not gzip the .gz files again.
        let again = builder.compress("td*js").await.unwrap();
        assert_eq!(again.len(), 3);
    }

    #[tokio::test]
    async fn test_clean_keeps_dotfiles() {
        let dir = tempfile::tempdir().unwrap();
        let dist = dir.path().join("dist");
        std::fs::create_dir_all(dist.join("sub")).unwrap();
        std::fs::write(dist.join(".gitkeep"), "").unwrap();
        std::fs::write(dist.join("td.js"), "x").unwrap();
        let builder = builder(dir.path(), Arc::new(SqueezeMinifier::default()));

        let removed = builder.clean().await.unwrap();

        assert_eq!(removed, 2);
        assert!(dist.join(".gitkeep").exists());
        assert!(!dist.join("td.js").exists());
        assert!(!dist.join("sub").exists());
    }

    #[test]
    fn test_wildcard() {
        let re = wildcard("td*js").unwrap();
        assert!(re.is_match("td.js"));
        assert!(re.is_match("td.legacy.min.js"));
        assert!(!re.is_match("loader.js"));
        assert!(!re.is_match("td.js.gz"));
    }
}
