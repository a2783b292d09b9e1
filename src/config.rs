use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::providers::{DEFAULT_CONCURRENCY, DEFAULT_LOG_LINES};

/// Configuration file structure for cireport.
///
/// Lets operators pin the buildbot instance, project and flake once instead of
/// passing them on every run. Command-line flags take precedence.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    #[serde(default)]
    pub buildbot: BuildbotConfig,

    #[serde(default)]
    pub evaluation: EvaluationConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BuildbotConfig {
    /// Buildbot instance base URL
    #[serde(default = "default_buildbot_url")]
    pub url: String,

    /// Buildbot project name
    #[serde(default = "default_project")]
    pub project: String,

    /// Number of jobs collected concurrently
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Log lines kept per job
    #[serde(default = "default_log_lines")]
    pub log_lines: usize,

    /// HTTP request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct EvaluationConfig {
    /// Flake reference to evaluate
    #[serde(default = "default_flake")]
    pub flake: String,

    /// Platforms to report on; the first one is primary
    #[serde(default = "default_systems")]
    pub systems: Vec<String>,

    /// Flake inputs listed in the report
    #[serde(default = "default_inputs")]
    pub inputs: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CacheConfig {
    /// Directory holding the cache artifacts
    #[serde(default = "default_cache_dir")]
    pub dir: PathBuf,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,

    /// Pretty-print JSON output
    #[serde(default)]
    pub pretty: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Summary,
    Json,
    Html,
}

impl Default for BuildbotConfig {
    fn default() -> Self {
        Self {
            url: default_buildbot_url(),
            project: default_project(),
            concurrency: default_concurrency(),
            log_lines: default_log_lines(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            flake: default_flake(),
            systems: default_systems(),
            inputs: default_inputs(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: default_cache_dir(),
        }
    }
}

fn default_buildbot_url() -> String {
    "https://buildbot.nix-community.org".to_string()
}

fn default_project() -> String {
    "nix-community/dream2nix-pypi-most-popular".to_string()
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

fn default_log_lines() -> usize {
    DEFAULT_LOG_LINES
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_flake() -> String {
    ".".to_string()
}

fn default_systems() -> Vec<String> {
    vec!["x86_64-linux".to_string(), "aarch64-darwin".to_string()]
}

fn default_inputs() -> Vec<String> {
    vec!["nixpkgs".to_string(), "dream2nix".to_string()]
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Config {
    /// Load configuration from a file.
    ///
    /// Searches for configuration files in this order:
    /// 1. Specified path
    /// 2. ./cireport.toml
    /// 3. ./cireport.json
    /// 4. ./cireport.yaml
    /// 5. ./cireport.yml
    /// 6. `<config dir>/cireport/config.toml`
    ///
    /// Returns default configuration if no file is found.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from_path(path);
        }

        let candidates = [
            "cireport.toml",
            "cireport.json",
            "cireport.yaml",
            "cireport.yml",
        ];

        for candidate in &candidates {
            let path = Path::new(candidate);
            if path.exists() {
                return Self::load_from_path(path);
            }
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("cireport").join("config.toml");
            if user_config.exists() {
                return Self::load_from_path(&user_config);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file path.
    fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

        match extension {
            "toml" => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display())),
            "json" => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display())),
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display())),
            _ => toml::from_str(&contents)
                .or_else(|_| serde_json::from_str(&contents))
                .or_else(|_| serde_yaml::from_str(&contents))
                .with_context(|| format!("Failed to parse config file: {}", path.display())),
        }
    }
}
