use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// package -> platform -> outcome
pub type ResultMap = BTreeMap<String, BTreeMap<String, Outcome>>;

/// Details of the meaningful build step, shared by both outcomes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    /// Final lines of the step log
    pub log_tail: String,
    /// Permanent link to the full raw log
    pub log_uri: String,
    pub started_at: Option<DateTime<Utc>>,
    pub complete_at: Option<DateTime<Utc>>,
}

/// Terminal CI result for one (package, platform) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Outcome {
    Success(StepRecord),
    Failure(StepRecord),
}

impl Outcome {
    pub fn record(&self) -> &StepRecord {
        match self {
            Outcome::Success(record) | Outcome::Failure(record) => record,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Success(_) => "success",
            Outcome::Failure(_) => "failure",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Outcome::Success(_) => "✓",
            Outcome::Failure(_) => "✗",
        }
    }
}
