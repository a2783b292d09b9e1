use std::path::PathBuf;

use indexmap::IndexMap;
use log::{debug, info};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::process::Command;

use crate::error::{ReportError, Result};

/// Maps every check attribute to its output path and source URL.
const CHECK_SUMMARY_EXPR: &str =
    "builtins.mapAttrs (n: v: { storePath = v.out; source = v.config.mkDerivation.src.url; })";

/// Evaluation output for one package.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInfo {
    pub store_path: String,
    #[serde(default)]
    pub source: Option<String>,
}

impl CheckInfo {
    /// Whether the package was built from a pre-built wheel rather than sources.
    pub fn from_wheel(&self) -> bool {
        self.source
            .as_deref()
            .is_some_and(|source| source.ends_with(".whl"))
    }
}

/// platform -> package -> check
pub type Checks = IndexMap<String, IndexMap<String, CheckInfo>>;

/// Packages that failed dependency resolution, with the reason nix reports.
pub type SkippedPackages = IndexMap<String, Value>;

/// Thin wrapper over the `nix` command line for one flake.
pub struct NixEvaluator {
    program: PathBuf,
    flake: String,
    inputs: Vec<String>,
}

impl NixEvaluator {
    pub fn new(flake: impl Into<String>, inputs: Vec<String>) -> Self {
        Self {
            program: PathBuf::from("nix"),
            flake: flake.into(),
            inputs,
        }
    }

    /// Runs `program` instead of the `nix` found on `PATH`.
    #[must_use]
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    async fn run_json<T: DeserializeOwned>(&self, args: &[&str]) -> Result<T> {
        let program = self.program.display();
        debug!("Running {program} {}", args.join(" "));

        let output = Command::new(&self.program)
            .args(args)
            .arg("--json")
            .output()
            .await
            .map_err(|e| ReportError::Evaluation(format!("Failed to run {program}: {e}")))?;

        if !output.status.success() {
            return Err(ReportError::Evaluation(format!(
                "{program} {} exited with {}: {}",
                args.join(" "),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        serde_json::from_slice(&output.stdout).map_err(|e| {
            ReportError::Evaluation(format!(
                "Unexpected output of {program} {}: {e}",
                args.join(" ")
            ))
        })
    }

    /// Evaluates the flake checks of every platform.
    pub async fn checks(&self, systems: &[String]) -> Result<Checks> {
        info!("Evaluating nix checks for: {}", systems.join(", "));

        let mut checks = Checks::new();
        for system in systems {
            let attr = format!("{}#checks.{system}", self.flake);
            let packages = self
                .run_json(&["eval", attr.as_str(), "--apply", CHECK_SUMMARY_EXPR])
                .await?;
            checks.insert(system.clone(), packages);
        }

        Ok(checks)
    }

    /// Evaluates the packages skipped during dependency locking.
    pub async fn skipped_packages(&self) -> Result<SkippedPackages> {
        info!("Evaluating locking errors");
        let attr = format!("{}#skippedPackages", self.flake);
        self.run_json(&["eval", attr.as_str()]).await
    }

    /// Resolves the configured flake inputs to browsable source URLs.
    pub async fn inputs(&self) -> Result<IndexMap<String, String>> {
        let metadata: FlakeMetadata = self
            .run_json(&["flake", "metadata", self.flake.as_str()])
            .await?;
        resolve_inputs(&metadata, &self.inputs)
    }
}

#[derive(Debug, Default, Deserialize)]
struct FlakeMetadata {
    #[serde(default)]
    locks: FlakeLocks,
}

#[derive(Debug, Default, Deserialize)]
struct FlakeLocks {
    #[serde(default)]
    nodes: IndexMap<String, LockNode>,
}

#[derive(Debug, Default, Deserialize)]
struct LockNode {
    #[serde(default)]
    locked: Option<LockedRef>,
}

#[derive(Debug, Deserialize)]
struct LockedRef {
    #[serde(rename = "type")]
    kind: String,
    owner: Option<String>,
    repo: Option<String>,
    rev: Option<String>,
}

impl LockedRef {
    fn github_url(&self) -> Option<String> {
        if self.kind != "github" {
            return None;
        }
        Some(format!(
            "https://github.com/{}/{}/tree/{}",
            self.owner.as_deref()?,
            self.repo.as_deref()?,
            self.rev.as_deref()?
        ))
    }
}

fn resolve_inputs(metadata: &FlakeMetadata, wanted: &[String]) -> Result<IndexMap<String, String>> {
    metadata
        .locks
        .nodes
        .iter()
        .filter(|(name, _)| wanted.contains(*name))
        .map(|(name, node)| {
            node.locked
                .as_ref()
                .and_then(LockedRef::github_url)
                .map(|url| (name.clone(), url))
                .ok_or_else(|| {
                    ReportError::Evaluation(format!("Input {name} is not a locked github input"))
                })
        })
        .collect()
}
