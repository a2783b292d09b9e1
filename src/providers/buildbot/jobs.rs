use log::{debug, info};
use regex::Regex;

use crate::error::{ReportError, Result};

use super::client::BuildbotClient;
use super::types::{BuildersResponse, ProjectsResponse};

/// One build pipeline for one (package, platform) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub builder_id: u64,
    pub platform: String,
    pub package: String,
}

/// Naming convention that maps builder names onto jobs.
///
/// Builders for package checks are named `<flake>#checks.<platform>.<package>`.
/// Anything else (the evaluation builder, unsupported platforms) is not a job.
#[derive(Debug, Clone)]
pub struct JobPattern {
    regex: Regex,
}

impl JobPattern {
    pub fn new<S: AsRef<str>>(platforms: &[S]) -> Result<Self> {
        if platforms.is_empty() {
            return Err(ReportError::Config(
                "At least one platform is required".into(),
            ));
        }

        let alternatives = platforms
            .iter()
            .map(|p| regex::escape(p.as_ref()))
            .collect::<Vec<_>>()
            .join("|");

        let regex = Regex::new(&format!(r"^.*#checks\.({alternatives})\.(.*)$"))
            .map_err(|e| ReportError::Config(format!("Invalid platform list: {e}")))?;

        Ok(Self { regex })
    }

    /// Returns `(platform, package)` encoded in a builder name.
    pub fn parse<'a>(&self, builder_name: &'a str) -> Option<(&'a str, &'a str)> {
        let captures = self.regex.captures(builder_name)?;
        let platform = captures.get(1)?.as_str();
        let package = captures.get(2)?.as_str();
        Some((platform, package))
    }

    pub fn job(&self, builder_id: u64, builder_name: &str) -> Option<Job> {
        self.parse(builder_name).map(|(platform, package)| Job {
            builder_id,
            platform: platform.to_string(),
            package: package.to_string(),
        })
    }
}

/// Looks up a project id by exact name.
///
/// Server-side name filtering is unreliable on the buildbot instances we
/// query and project ids are not stable, so the full project list is scanned.
pub async fn resolve_project_id(client: &BuildbotClient, name: &str) -> Result<Option<u64>> {
    let response: ProjectsResponse = client.get_json("projects").await?;

    Ok(response
        .projects
        .into_iter()
        .find(|project| project.name == name)
        .map(|project| project.id))
}

/// Lists all builders of a project that follow the job naming convention.
pub async fn list_jobs(
    client: &BuildbotClient,
    project_id: u64,
    pattern: &JobPattern,
) -> Result<Vec<Job>> {
    let response: BuildersResponse = client
        .get_json(&format!("builders?projectid={project_id}"))
        .await?;

    let total = response.builders.len();
    let jobs: Vec<Job> = response
        .builders
        .into_iter()
        .filter_map(|builder| {
            let job = pattern.job(builder.id, &builder.name);
            if job.is_none() {
                debug!("Skipping builder {} ({})", builder.name, builder.id);
            }
            job
        })
        .collect();

    info!("Found {} jobs among {total} builders", jobs.len());

    Ok(jobs)
}

/// Resolves `project_name` and lists its jobs. A missing project is fatal.
pub async fn discover_jobs(
    client: &BuildbotClient,
    project_name: &str,
    pattern: &JobPattern,
) -> Result<Vec<Job>> {
    let project_id = resolve_project_id(client, project_name)
        .await?
        .ok_or_else(|| ReportError::ProjectNotFound(project_name.to_string()))?;

    debug!("Resolved project {project_name} to id {project_id}");

    list_jobs(client, project_id, pattern).await
}
