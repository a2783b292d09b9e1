use chrono::{DateTime, Utc};
use serde::Deserialize;

/// A buildbot project as listed by the `projects` endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct BuildbotProject {
    #[serde(rename = "projectid")]
    pub id: u64,
    pub name: String,
}

/// A builder (persistent build pipeline) registered under a project.
#[derive(Debug, Clone, Deserialize)]
pub struct BuildbotBuilder {
    #[serde(rename = "builderid")]
    pub id: u64,
    pub name: String,
}

/// One execution of a builder.
#[derive(Debug, Clone, Deserialize)]
pub struct BuildbotBuild {
    #[serde(rename = "buildid")]
    pub id: u64,
}

/// A named phase within a build.
#[derive(Debug, Clone, Deserialize)]
pub struct BuildbotStep {
    #[serde(rename = "stepid")]
    pub id: u64,
    pub name: String,
    /// Result code; `None` while the step has not finished
    #[serde(default)]
    pub results: Option<i64>,
    #[serde(default, with = "chrono::serde::ts_seconds_option")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, with = "chrono::serde::ts_seconds_option")]
    pub complete_at: Option<DateTime<Utc>>,
}

/// A log attached to a step. Only the id is needed, the text is fetched raw.
#[derive(Debug, Clone, Deserialize)]
pub struct BuildbotLog {
    #[serde(rename = "logid")]
    pub id: u64,
}

// Response envelopes. Buildbot wraps every collection in an object keyed by
// the collection name next to a `meta` object we do not need.

#[derive(Debug, Deserialize)]
pub struct ProjectsResponse {
    #[serde(default)]
    pub projects: Vec<BuildbotProject>,
}

#[derive(Debug, Deserialize)]
pub struct BuildersResponse {
    #[serde(default)]
    pub builders: Vec<BuildbotBuilder>,
}

#[derive(Debug, Deserialize)]
pub struct BuildsResponse {
    #[serde(default)]
    pub builds: Vec<BuildbotBuild>,
}

#[derive(Debug, Deserialize)]
pub struct StepsResponse {
    #[serde(default)]
    pub steps: Vec<BuildbotStep>,
}

#[derive(Debug, Deserialize)]
pub struct LogsResponse {
    #[serde(default)]
    pub logs: Vec<BuildbotLog>,
}
