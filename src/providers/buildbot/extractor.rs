use log::debug;

use crate::error::{ReportError, Result};
use crate::results::{Outcome, StepRecord};

use super::client::{raw_log_path, BuildbotClient};
use super::jobs::Job;
use super::types::{BuildbotStep, BuildsResponse, LogsResponse, StepsResponse};

/// Name of the step that builds the flake attribute; every other step is noise.
pub const BUILD_STEP_NAME: &str = "Build flake attr";

pub const DEFAULT_LOG_LINES: usize = 100;

/// Classification of a build step's result code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StepResult {
    Success,
    Failure,
    /// Cancelled or skipped; the job has no usable result
    Skipped,
}

impl StepResult {
    fn from_code(code: Option<i64>) -> Result<Self> {
        match code {
            Some(0) => Ok(Self::Success),
            Some(2) => Ok(Self::Failure),
            Some(3) => Ok(Self::Skipped),
            Some(other) => Err(ReportError::Protocol(format!(
                "unknown step result code {other}"
            ))),
            None => Err(ReportError::Protocol(
                "completed build has a step without result code".into(),
            )),
        }
    }
}

/// Fetches the latest known result of `job`.
///
/// Builds are scanned newest first until one carries the build step. A
/// skipped step ends the scan without a result.
pub async fn extract_outcome(
    client: &BuildbotClient,
    job: &Job,
    log_lines: usize,
) -> Result<Option<Outcome>> {
    let builds: BuildsResponse = client
        .get_json(&format!(
            "builders/{}/builds?order=-started_at&complete=true",
            job.builder_id
        ))
        .await?;

    for build in builds.builds {
        let steps: StepsResponse = client
            .get_json(&format!("builds/{}/steps", build.id))
            .await?;

        let Some(step) = steps
            .steps
            .into_iter()
            .find(|step| step.name == BUILD_STEP_NAME)
        else {
            debug!(
                "Build {} of {} ({}) has no build step, trying an older one",
                build.id, job.package, job.platform
            );
            continue;
        };

        let result = StepResult::from_code(step.results)?;
        if result == StepResult::Skipped {
            debug!(
                "Latest build of {} ({}) was skipped",
                job.package, job.platform
            );
            return Ok(None);
        }

        let record = fetch_step_record(client, &step, log_lines).await?;
        let outcome = match result {
            StepResult::Success => Outcome::Success(record),
            _ => Outcome::Failure(record),
        };

        debug!(
            "Collected {} ({}, {}, {})",
            job.package,
            job.platform,
            outcome.label(),
            outcome.record().log_uri
        );

        return Ok(Some(outcome));
    }

    Ok(None)
}

async fn fetch_step_record(
    client: &BuildbotClient,
    step: &BuildbotStep,
    log_lines: usize,
) -> Result<StepRecord> {
    let logs: LogsResponse = client
        .get_json(&format!("steps/{}/logs", step.id))
        .await?;

    let [log] = logs.logs.as_slice() else {
        return Err(ReportError::Protocol(format!(
            "expected exactly one log for step {}, found {}",
            step.id,
            logs.logs.len()
        )));
    };

    let text = client.get_text(&raw_log_path(log.id)).await?;

    Ok(StepRecord {
        log_tail: tail_lines(&text, log_lines),
        log_uri: client.log_uri(log.id),
        started_at: step.started_at,
        complete_at: step.complete_at,
    })
}

/// Keeps the last `count` newline-separated lines of `text`.
pub fn tail_lines(text: &str, count: usize) -> String {
    let lines: Vec<&str> = text.split('\n').collect();
    let start = lines.len().saturating_sub(count);
    lines[start..].join("\n")
}
