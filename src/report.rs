use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::workflow::TriggerEvent;

/// Outcome of a single pipeline run, suitable for JSON export.
#[derive(Debug, Serialize, Deserialize)]
pub struct RunReport {
    pub event: TriggerEvent,
    pub source: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub jobs: Vec<JobReport>,
}

impl RunReport {
    /// A run succeeds iff every triggered job passed.
    pub fn succeeded(&self) -> bool {
        self.jobs.iter().all(|job| job.status == Status::Passed)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobReport {
    pub workflow: String,
    pub name: String,
    pub status: Status,
    pub duration_secs: f64,
    pub steps: Vec<StepReport>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepReport {
    pub name: String,
    pub status: Status,
    /// Exit code of the step's process, when one ran to completion.
    pub exit_code: Option<i32>,
    pub duration_secs: f64,
    /// Captured output, kept only for failing steps (lint diffs, failing
    /// tests, install errors).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Passed,
    Failed,
    /// Never executed because an earlier step in the job failed.
    Skipped,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Passed => write!(f, "passed"),
            Status::Failed => write!(f, "failed"),
            Status::Skipped => write!(f, "skipped"),
        }
    }
}
