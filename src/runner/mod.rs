mod job;
mod provision;
mod step;

use std::path::PathBuf;

use chrono::Utc;
use futures::future::join_all;
use log::{debug, info};
use tempfile::TempDir;

use crate::error::{CirunError, Result};
use crate::report::{JobReport, RunReport};
use crate::workflow::{TriggerEvent, TriggeredJob};

/// Executes triggered jobs in isolated ephemeral workspaces.
///
/// Jobs are independent and run concurrently; steps within a job run
/// strictly in order and the job stops at its first failing step. Nothing
/// is shared between jobs and nothing persists across runs unless
/// `keep_workspaces` is set.
pub struct Runner {
    options: RunOptions,
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Source tree the checkout action copies from.
    pub source: PathBuf,
    /// Shell used for `run:` steps, invoked as `<shell> -c <command>`.
    pub shell: String,
    /// Retain job workspaces after the run instead of deleting them.
    pub keep_workspaces: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            source: PathBuf::from("."),
            shell: "sh".to_string(),
            keep_workspaces: false,
        }
    }
}

impl Runner {
    pub fn new(options: RunOptions) -> Self {
        Self { options }
    }

    /// Runs every triggered job and collects the run report.
    ///
    /// A failing job is recorded in the report, never propagated as an
    /// error; `Err` is reserved for runner infrastructure failures such as
    /// an uncreatable workspace.
    pub async fn execute(
        &self,
        triggered: Vec<TriggeredJob>,
        event: TriggerEvent,
    ) -> Result<RunReport> {
        let started_at = Utc::now();
        let run_root = TempDir::with_prefix("cirun-")?;
        info!(
            "Run root {} ({} job(s) triggered by {event})",
            run_root.path().display(),
            triggered.len()
        );

        let mut handles = Vec::with_capacity(triggered.len());
        for (idx, item) in triggered.into_iter().enumerate() {
            let workspace = run_root.path().join(workspace_dir_name(idx, &item));
            let options = self.options.clone();
            handles.push(tokio::spawn(async move {
                job::run_job(item, workspace, options).await
            }));
        }

        let mut jobs: Vec<JobReport> = Vec::with_capacity(handles.len());
        for joined in join_all(handles).await {
            let report = joined.map_err(|e| {
                CirunError::Io(std::io::Error::new(std::io::ErrorKind::Other, e))
            })??;
            jobs.push(report);
        }

        if self.options.keep_workspaces {
            let kept = run_root.into_path();
            info!("Workspaces kept at {}", kept.display());
        } else {
            debug!("Removing run root");
        }

        Ok(RunReport {
            event,
            source: self.options.source.display().to_string(),
            started_at,
            finished_at: Utc::now(),
            jobs,
        })
    }
}

/// Filesystem-safe per-job workspace directory name, unique within a run.
fn workspace_dir_name(idx: usize, item: &TriggeredJob) -> String {
    let sanitized: String = item
        .job_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '-' })
        .collect();
    format!("{idx}-{sanitized}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Status;
    use crate::workflow::{Job, Step};

    fn run_step(command: &str) -> Step {
        Step::Run {
            name: None,
            command: command.to_string(),
        }
    }

    fn triggered(job_id: &str, steps: Vec<Step>) -> TriggeredJob {
        TriggeredJob {
            workflow: "wf".to_string(),
            job_id: job_id.to_string(),
            job: Job { steps },
        }
    }

    #[tokio::test]
    async fn test_independent_jobs_report_their_own_status() {
        let runner = Runner::new(RunOptions::default());
        let report = runner
            .execute(
                vec![
                    triggered("lint", vec![run_step("true")]),
                    triggered("test", vec![run_step("false")]),
                ],
                TriggerEvent::Push,
            )
            .await
            .unwrap();

        assert_eq!(report.jobs.len(), 2);
        assert_eq!(report.jobs[0].status, Status::Passed);
        assert_eq!(report.jobs[1].status, Status::Failed);
        assert!(!report.succeeded());
    }

    #[tokio::test]
    async fn test_run_with_no_triggered_jobs_succeeds() {
        let runner = Runner::new(RunOptions::default());
        let report = runner
            .execute(vec![], TriggerEvent::PullRequest)
            .await
            .unwrap();
        assert!(report.jobs.is_empty());
        assert!(report.succeeded());
    }

    #[test]
    fn test_workspace_dir_name_sanitized_and_unique() {
        let a = workspace_dir_name(0, &triggered("unit tests", vec![]));
        let b = workspace_dir_name(1, &triggered("unit tests", vec![]));
        assert_eq!(a, "0-unit-tests");
        assert_ne!(a, b);
    }
}
