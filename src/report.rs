use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::evaluation::SkippedPackages;
use crate::results::Outcome;

/// The consolidated report handed to the renderers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub project: String,
    pub generated_at: DateTime<Utc>,
    pub systems: Vec<String>,
    /// Flake input name -> source URL
    pub inputs: IndexMap<String, String>,
    /// Sorted by package status, failures first
    pub results: Vec<PackageResult>,
    pub stats_per_system: IndexMap<String, SystemStats>,
    pub skipped_packages: SkippedPackages,
}

/// Aggregate status of a package across all platforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageStatus {
    Failure,
    #[serde(rename = "some")]
    Partial,
    Success,
}

impl PackageStatus {
    /// Classifies per-platform outcomes; a missing outcome counts as a failure.
    pub fn classify<'a, I>(outcomes: I) -> Self
    where
        I: IntoIterator<Item = Option<&'a Outcome>>,
    {
        let mut any = false;
        let mut all = true;
        for success in outcomes.into_iter().map(|o| o.is_some_and(Outcome::is_success)) {
            any |= success;
            all &= success;
        }

        match (all, any) {
            (true, true) => PackageStatus::Success,
            (_, true) => PackageStatus::Partial,
            _ => PackageStatus::Failure,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PackageStatus::Failure => "failure",
            PackageStatus::Partial => "some",
            PackageStatus::Success => "success",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageResult {
    pub name: String,
    pub status: PackageStatus,
    pub from_wheel: bool,
    pub systems: IndexMap<String, SystemResult>,
}

impl PackageResult {
    pub fn outcome(&self, system: &str) -> Option<&Outcome> {
        self.systems.get(system).and_then(|s| s.outcome.as_ref())
    }
}

/// CI outcome and evaluated output path of a package on one platform.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SystemResult {
    pub outcome: Option<Outcome>,
    pub store_path: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemStats {
    pub success: usize,
    pub failure: usize,
    pub skipped_packages: usize,
    pub total: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::StepRecord;

    fn record() -> StepRecord {
        StepRecord {
            log_tail: String::new(),
            log_uri: String::new(),
            started_at: None,
            complete_at: None,
        }
    }

    #[test]
    fn test_classify_package_status() {
        let success = Outcome::Success(record());
        let failure = Outcome::Failure(record());

        assert_eq!(
            PackageStatus::classify([Some(&success), Some(&success)]),
            PackageStatus::Success
        );
        assert_eq!(
            PackageStatus::classify([Some(&success), Some(&failure)]),
            PackageStatus::Partial
        );
        assert_eq!(
            PackageStatus::classify([Some(&failure), Some(&failure)]),
            PackageStatus::Failure
        );
        assert_eq!(
            PackageStatus::classify([Some(&success), None]),
            PackageStatus::Partial
        );
        assert_eq!(
            PackageStatus::classify([None, None]),
            PackageStatus::Failure
        );
    }

    #[test]
    fn test_status_orders_failures_first() {
        let mut statuses = vec![
            PackageStatus::Success,
            PackageStatus::Failure,
            PackageStatus::Partial,
        ];
        statuses.sort();
        assert_eq!(
            statuses,
            vec![
                PackageStatus::Failure,
                PackageStatus::Partial,
                PackageStatus::Success
            ]
        );
    }

    #[test]
    fn test_status_serializes_as_label() {
        for status in [
            PackageStatus::Failure,
            PackageStatus::Partial,
            PackageStatus::Success,
        ] {
            assert_eq!(
                serde_json::to_value(status).unwrap(),
                serde_json::Value::from(status.label())
            );
        }
    }
}
