use std::sync::Arc;

use indicatif::ProgressBar;
use log::{error, info};
use tokio::sync::{mpsc, Mutex};

use crate::error::Result;
use crate::results::{Outcome, ResultMap};

use super::client::BuildbotClient;
use super::extractor::{extract_outcome, DEFAULT_LOG_LINES};
use super::jobs::Job;

pub const DEFAULT_CONCURRENCY: usize = 5;

#[derive(Debug, Clone, Copy)]
pub struct CollectSettings {
    /// Number of extractions in flight at once
    pub concurrency: usize,
    /// Log lines kept per outcome
    pub log_lines: usize,
}

impl Default for CollectSettings {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            log_lines: DEFAULT_LOG_LINES,
        }
    }
}

type Extraction = (Job, Result<Option<Outcome>>);

/// Runs the extractor for every job on a fixed set of workers.
///
/// Jobs go through a bounded queue drained by `settings.concurrency` worker
/// tasks. Workers only send their results back; this function is the sole
/// writer of the returned map. A failing job is logged and left out of the
/// map, it never aborts the batch.
pub async fn collect(
    client: Arc<BuildbotClient>,
    jobs: Vec<Job>,
    settings: CollectSettings,
    progress: &ProgressBar,
) -> ResultMap {
    let concurrency = settings.concurrency.max(1);
    let total = jobs.len();
    info!("Collecting results for {total} jobs with {concurrency} workers");

    let (job_tx, job_rx) = mpsc::channel::<Job>(concurrency);
    let job_rx = Arc::new(Mutex::new(job_rx));
    let (result_tx, mut result_rx) = mpsc::channel::<Extraction>(concurrency);

    let feeder = tokio::spawn(async move {
        for job in jobs {
            if job_tx.send(job).await.is_err() {
                break;
            }
        }
    });

    let workers: Vec<_> = (0..concurrency)
        .map(|_| {
            let client = Arc::clone(&client);
            let job_rx = Arc::clone(&job_rx);
            let result_tx = result_tx.clone();
            tokio::spawn(async move {
                loop {
                    // Hold the lock only while taking the next job
                    let next = job_rx.lock().await.recv().await;
                    let Some(job) = next else { break };

                    let result = extract_outcome(&client, &job, settings.log_lines).await;
                    if result_tx.send((job, result)).await.is_err() {
                        break;
                    }
                }
            })
        })
        .collect();
    drop(result_tx);

    let mut results = ResultMap::new();
    let mut failed = 0;

    while let Some((job, result)) = result_rx.recv().await {
        progress.inc(1);
        match result {
            Ok(Some(outcome)) => {
                results
                    .entry(job.package)
                    .or_default()
                    .insert(job.platform, outcome);
            }
            Ok(None) => {}
            Err(e) => {
                failed += 1;
                error!(
                    "Failed to collect {} ({}) from builder {}: {e}",
                    job.package, job.platform, job.builder_id
                );
            }
        }
    }

    for handle in futures::future::join_all(workers).await {
        if let Err(e) = handle {
            error!("Collector worker stopped unexpectedly: {e}");
        }
    }
    if let Err(e) = feeder.await {
        error!("Job feeder stopped unexpectedly: {e}");
    }

    info!(
        "Collected results for {} packages ({failed} of {total} jobs failed)",
        results.len()
    );

    results
}
