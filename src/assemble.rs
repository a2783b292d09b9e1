use chrono::Utc;
use indexmap::IndexMap;
use log::{error, info, warn};

use crate::error::{ReportError, Result};
use crate::evaluation::{Checks, SkippedPackages};
use crate::report::{PackageResult, PackageStatus, Report, SystemResult, SystemStats};
use crate::results::ResultMap;

/// Everything the report is joined from.
pub struct ReportInputs<'a> {
    pub project: &'a str,
    /// The first system is the primary one; its checks decide which packages are reported.
    pub systems: &'a [String],
    pub ci_results: ResultMap,
    pub checks: &'a Checks,
    pub skipped_packages: SkippedPackages,
    pub inputs: IndexMap<String, String>,
}

/// Joins CI outcomes with evaluation output into the final report.
///
/// Packages without CI results are skipped. Packages missing from a secondary
/// platform's evaluation are reported without a store path for it.
///
/// # Errors
///
/// Returns [`ReportError::Evaluation`] if no systems are given or the primary
/// system was not evaluated.
pub fn assemble(input: ReportInputs<'_>) -> Result<Report> {
    let ReportInputs {
        project,
        systems,
        mut ci_results,
        checks,
        skipped_packages,
        inputs,
    } = input;

    let (primary, secondary) = systems
        .split_first()
        .ok_or_else(|| ReportError::Evaluation("No systems to report on".into()))?;
    let primary_checks = checks
        .get(primary)
        .ok_or_else(|| ReportError::Evaluation(format!("No checks evaluated for {primary}")))?;

    let mut results = Vec::with_capacity(primary_checks.len());

    for (package, check) in primary_checks {
        let Some(mut outcomes) = ci_results.remove(package) else {
            error!("Could not find CI results for {package}");
            continue;
        };

        let mut package_systems = IndexMap::with_capacity(systems.len());
        package_systems.insert(
            primary.clone(),
            SystemResult {
                outcome: outcomes.remove(primary),
                store_path: Some(check.store_path.clone()),
            },
        );

        for system in secondary {
            let store_path = match checks.get(system).and_then(|c| c.get(package)) {
                Some(check) => Some(check.store_path.clone()),
                None => {
                    warn!(
                        "Could not evaluate {system} store path for {package}, lock file outdated?"
                    );
                    None
                }
            };
            package_systems.insert(
                system.clone(),
                SystemResult {
                    outcome: outcomes.remove(system),
                    store_path,
                },
            );
        }

        let status =
            PackageStatus::classify(package_systems.values().map(|s| s.outcome.as_ref()));

        results.push(PackageResult {
            name: package.clone(),
            status,
            from_wheel: check.from_wheel(),
            systems: package_systems,
        });
    }

    warn_unevaluated(primary, &ci_results);

    results.sort_by_key(|result| result.status);

    let stats_per_system = system_stats(systems, &results, skipped_packages.len());

    info!(
        "Assembled report with {} packages ({} skipped during locking)",
        results.len(),
        skipped_packages.len()
    );

    Ok(Report {
        project: project.to_string(),
        generated_at: Utc::now(),
        systems: systems.to_vec(),
        inputs,
        results,
        stats_per_system,
        skipped_packages,
    })
}

/// Logs every package that has CI results but no primary evaluation.
///
/// Returns the names of those packages; none of them end up in the report.
fn warn_unevaluated<'a>(primary: &str, leftover: &'a ResultMap) -> Vec<&'a str> {
    leftover
        .keys()
        .map(|package| {
            warn!("CI results for {package} but no {primary} evaluation, lock file outdated?");
            package.as_str()
        })
        .collect()
}

/// Counts outcomes per platform; packages without an outcome count as failures.
pub fn system_stats(
    systems: &[String],
    results: &[PackageResult],
    skipped: usize,
) -> IndexMap<String, SystemStats> {
    systems
        .iter()
        .map(|system| {
            let success = results
                .iter()
                .filter(|r| r.outcome(system).is_some_and(|o| o.is_success()))
                .count();
            let failure = results.len() - success;

            let stats = SystemStats {
                success,
                failure,
                skipped_packages: skipped,
                total: success + failure + skipped,
            };
            (system.clone(), stats)
        })
        .collect()
}
