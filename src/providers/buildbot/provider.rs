use std::sync::Arc;
use std::time::Duration;

use indicatif::ProgressBar;
use log::{info, warn};

use crate::error::Result;
use crate::results::ResultMap;

use super::client::BuildbotClient;
use super::collector::{collect, CollectSettings};
use super::jobs::{discover_jobs, JobPattern};

/// Buildbot CI results provider for one project.
///
/// Discovers the project's per-package check builders and collects the latest
/// outcome of each into a package -> platform -> outcome map.
pub struct BuildbotProvider {
    client: Arc<BuildbotClient>,
    project: String,
    pattern: JobPattern,
    settings: CollectSettings,
}

impl BuildbotProvider {
    /// Creates a provider for `project` on the buildbot instance at `base_url`.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Buildbot instance base URL (e.g., <https://buildbot.nix-community.org>)
    /// * `project` - Project name (e.g., "nix-community/dream2nix-pypi-most-popular")
    /// * `systems` - Platforms whose check builders are collected
    /// * `settings` - Worker pool size and log tail length
    /// * `timeout` - Per-request HTTP timeout
    ///
    /// # Errors
    ///
    /// Returns an error if the API URL is invalid or the platform list is empty.
    pub fn new(
        base_url: &str,
        project: String,
        systems: &[String],
        settings: CollectSettings,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            client: Arc::new(BuildbotClient::new(base_url, timeout)?),
            project,
            pattern: JobPattern::new(systems)?,
            settings,
        })
    }

    /// Collects the latest CI outcome of every check builder.
    ///
    /// Discovery failures are fatal; failures of individual jobs only leave
    /// their entry out of the map.
    pub async fn collect_results(&self, progress: &ProgressBar) -> Result<ResultMap> {
        info!(
            "Starting CI result collection for project: {}",
            self.project
        );

        let jobs = discover_jobs(&self.client, &self.project, &self.pattern).await?;
        if jobs.is_empty() {
            warn!("No check builders found for project: {}", self.project);
        }

        progress.set_length(jobs.len() as u64);

        let client = Arc::clone(&self.client);
        Ok(collect(client, jobs, self.settings, progress).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReportError;

    fn systems() -> Vec<String> {
        vec!["x86_64-linux".into(), "aarch64-darwin".into()]
    }

    #[test]
    fn test_provider_rejects_empty_systems() {
        let result = BuildbotProvider::new(
            "https://buildbot.example.org",
            "org/repo".into(),
            &[],
            CollectSettings::default(),
            Duration::from_secs(5),
        );
        assert!(matches!(result, Err(ReportError::Config(_))));
    }

    #[tokio::test]
    async fn test_collect_results_end_to_end() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v2/projects")
            .with_status(200)
            .with_body(r#"{"projects": [{"projectid": 4, "name": "org/repo"}]}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/api/v2/builders?projectid=4")
            .with_status(200)
            .with_body(
                r#"{"builders": [
                    {"builderid": 1, "name": "org/repo#checks.x86_64-linux.pkgA"},
                    {"builderid": 2, "name": "org/repo#checks.x86_64-linux.pkgB"},
                    {"builderid": 3, "name": "org/repo#checks.aarch64-darwin.pkgA"},
                    {"builderid": 9, "name": "org/repo/nix-eval"}
                ]}"#,
            )
            .create_async()
            .await;
        for (builder, code) in [(1, 0), (2, 2), (3, 0)] {
            server
                .mock(
                    "GET",
                    format!("/api/v2/builders/{builder}/builds?order=-started_at&complete=true")
                        .as_str(),
                )
                .with_status(200)
                .with_body(format!(
                    r#"{{"builds": [{{"buildid": {builder}0, "complete": true}}]}}"#
                ))
                .create_async()
                .await;
            server
                .mock("GET", format!("/api/v2/builds/{builder}0/steps").as_str())
                .with_status(200)
                .with_body(format!(
                    r#"{{"steps": [{{"stepid": {builder}00, "name": "Build flake attr", "results": {code}}}]}}"#
                ))
                .create_async()
                .await;
            server
                .mock("GET", format!("/api/v2/steps/{builder}00/logs").as_str())
                .with_status(200)
                .with_body(format!(r#"{{"logs": [{{"logid": {builder}000}}]}}"#))
                .create_async()
                .await;
            server
                .mock(
                    "GET",
                    format!("/api/v2/logs/{builder}000/raw_inline").as_str(),
                )
                .with_status(200)
                .with_body("done")
                .create_async()
                .await;
        }

        let provider = BuildbotProvider::new(
            &server.url(),
            "org/repo".into(),
            &systems(),
            CollectSettings::default(),
            Duration::from_secs(5),
        )
        .unwrap();

        let progress = ProgressBar::hidden();
        let results = provider.collect_results(&progress).await.unwrap();

        assert_eq!(progress.length(), Some(3));
        assert_eq!(results.len(), 2);
        assert!(results["pkgA"]["x86_64-linux"].is_success());
        assert!(results["pkgA"]["aarch64-darwin"].is_success());
        assert!(!results["pkgB"]["x86_64-linux"].is_success());
    }
}
