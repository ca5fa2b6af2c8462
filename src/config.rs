//! Configuration for newsacquire.
//!
//! A config file is TOML or JSON (by extension) with three sections:
//! `[pipeline]`, `[browser]`, and `[sources.<id>]`. Sources declared in the
//! file override or extend the built-in registry.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::registry::{SiteAdapter, SiteRegistry};
use crate::scrapers::BrowserSettings;

/// Config file names looked up in the working directory, in order.
pub const CONFIG_FILE_NAMES: &[&str] = &["newsacquire.toml", "newsacquire.json"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse TOML config: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Failed to parse JSON config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Unknown source: {0}")]
    UnknownSource(String),
    #[error("Invalid source '{source_id}': {reason}")]
    InvalidSource { source_id: String, reason: String },
}

/// Export file format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Csv,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
        }
    }
}

/// Which page fetcher drives the crawl.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FetcherKind {
    /// Headless Chrome; required for load-more and scroll sources.
    #[default]
    Browser,
    /// Plain HTTP; enough for server-rendered listings.
    Http,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

fn default_true() -> bool {
    true
}

fn default_max_iterations() -> u32 {
    crate::models::DEFAULT_MAX_ITERATIONS
}

fn default_fetch_timeout() -> u64 {
    30
}

fn default_extraction_workers() -> usize {
    4
}

/// Run-wide pipeline options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineSettings {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default)]
    pub format: OutputFormat,
    /// Also write every record to `combined.<ext>`.
    #[serde(default = "default_true")]
    pub combined: bool,
    /// Fill `summary` with the body truncated to this many characters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary_chars: Option<usize>,
    /// Cap on listing states per source, unless the source sets its own.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    /// Per-fetch timeout in seconds.
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout: u64,
    /// Seen-index location. Defaults to `<output_dir>/seen.json`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_file: Option<PathBuf>,
    /// Save the HTML of each fetched article page.
    #[serde(default)]
    pub snapshots: bool,
    /// Download attachments for sources that declare an attachment rule.
    #[serde(default)]
    pub attachments: bool,
    /// Parallel workers for snapshot re-extraction.
    #[serde(default = "default_extraction_workers")]
    pub extraction_workers: usize,
    #[serde(default)]
    pub fetcher: FetcherKind,
    /// User agent for HTTP requests: unset for the crate default,
    /// `impersonate` for a browser string, anything else is sent as-is.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            format: OutputFormat::default(),
            combined: true,
            summary_chars: None,
            max_iterations: default_max_iterations(),
            fetch_timeout: default_fetch_timeout(),
            state_file: None,
            snapshots: false,
            attachments: false,
            extraction_workers: default_extraction_workers(),
            fetcher: FetcherKind::default(),
            user_agent: None,
        }
    }
}

impl PipelineSettings {
    pub fn state_file(&self) -> PathBuf {
        self.state_file
            .clone()
            .unwrap_or_else(|| self.output_dir.join("seen.json"))
    }

    pub fn snapshot_dir(&self) -> PathBuf {
        self.output_dir.join("snapshots")
    }

    pub fn attachment_dir(&self) -> PathBuf {
        self.output_dir.join("attachments")
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout.max(1))
    }
}

/// Configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub pipeline: PipelineSettings,
    #[serde(default, skip_serializing_if = "BrowserSettings::is_default")]
    pub browser: BrowserSettings,
    /// Source definitions layered over the built-in registry.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub sources: BTreeMap<String, SiteAdapter>,
    /// Path to the config file this was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load from `path` if given, otherwise from the first config file found in
    /// the working directory, otherwise defaults.
    pub async fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::load_from_path(path).await;
        }
        for name in CONFIG_FILE_NAMES {
            let candidate = Path::new(name);
            if candidate.exists() {
                return Self::load_from_path(candidate).await;
            }
        }
        debug!("No config file found, using defaults");
        let mut config = Self::default();
        config.browser = config.browser.with_env_overrides();
        Ok(config)
    }

    /// Load configuration from a specific file path (TOML or JSON by extension).
    pub async fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

        let mut config = Self::parse(&contents, ext)?;
        config.source_path = Some(path.to_path_buf());
        config.resolve_relative_paths();
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    fn parse(contents: &str, ext: &str) -> Result<Self, ConfigError> {
        let mut config: Config = match ext {
            "toml" => toml::from_str(contents)?,
            _ => serde_json::from_str(contents)?,
        };
        config.browser = config.browser.with_env_overrides();
        Ok(config)
    }

    /// Directory of the config file, used for relative paths.
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(Path::to_path_buf))
            .filter(|p| !p.as_os_str().is_empty())
    }

    /// Absolute paths pass through; relative ones are joined onto `base_dir`.
    pub fn resolve_path(path: &Path, base_dir: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        }
    }

    fn resolve_relative_paths(&mut self) {
        let Some(base) = self.base_dir() else {
            return;
        };
        self.pipeline.output_dir = Self::resolve_path(&self.pipeline.output_dir, &base);
        if let Some(state) = self.pipeline.state_file.take() {
            self.pipeline.state_file = Some(Self::resolve_path(&state, &base));
        }
    }

    /// Built-in sources with this config's sources layered on top, validated.
    pub fn registry(&self) -> Result<SiteRegistry, ConfigError> {
        let registry = SiteRegistry::builtin()?.with_overrides(self.sources.clone());
        registry.validate()?;
        Ok(registry)
    }
}
