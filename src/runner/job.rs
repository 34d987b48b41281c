use std::path::PathBuf;
use std::time::Instant;

use log::{info, warn};

use crate::error::{CirunError, Result};
use crate::report::{JobReport, Status, StepReport};
use crate::workflow::{Action, Step, TriggeredJob};

use super::{provision, step, RunOptions};

/// Per-job execution state threaded through the steps.
pub(super) struct JobContext {
    pub workspace: PathBuf,
    pub options: RunOptions,
    /// Virtualenv created by setup-python, once provisioned.
    pub venv: Option<PathBuf>,
}

/// Runs one job's steps strictly in order, stopping at the first failure.
///
/// Steps after a failure are recorded as skipped. Step failures (non-zero
/// exit, provisioning errors) become report entries; only infrastructure
/// errors (e.g. the workspace cannot be created) propagate as `Err`.
pub(super) async fn run_job(
    item: TriggeredJob,
    workspace: PathBuf,
    options: RunOptions,
) -> Result<JobReport> {
    std::fs::create_dir_all(&workspace)?;
    let mut ctx = JobContext {
        workspace,
        options,
        venv: None,
    };

    let job_started = Instant::now();
    let mut steps: Vec<StepReport> = Vec::with_capacity(item.job.steps.len());
    let mut failed = false;

    for step_def in &item.job.steps {
        let name = step_def.display_name();
        if failed {
            steps.push(StepReport {
                name,
                status: Status::Skipped,
                exit_code: None,
                duration_secs: 0.0,
                output: None,
            });
            continue;
        }

        info!("[{}] step: {name}", item.job_id);
        let started = Instant::now();
        let outcome = execute_step(&mut ctx, step_def).await;
        let duration_secs = started.elapsed().as_secs_f64();

        let report = match outcome {
            Ok(StepOutcome { exit_code: Some(0), .. }) => StepReport {
                name,
                status: Status::Passed,
                exit_code: Some(0),
                duration_secs,
                output: None,
            },
            Ok(StepOutcome { exit_code, output }) => {
                warn!("[{}] step '{name}' failed (exit {exit_code:?})", item.job_id);
                StepReport {
                    name,
                    status: Status::Failed,
                    exit_code,
                    duration_secs,
                    output: Some(output),
                }
            }
            Err(err @ (CirunError::Provision(_) | CirunError::Spawn { .. })) => {
                warn!("[{}] step '{name}' failed: {err}", item.job_id);
                StepReport {
                    name,
                    status: Status::Failed,
                    exit_code: None,
                    duration_secs,
                    output: Some(err.to_string()),
                }
            }
            Err(other) => return Err(other),
        };

        failed = report.status == Status::Failed;
        steps.push(report);
    }

    Ok(JobReport {
        workflow: item.workflow,
        name: item.job_id,
        status: if failed { Status::Failed } else { Status::Passed },
        duration_secs: job_started.elapsed().as_secs_f64(),
        steps,
    })
}

/// Exit status and captured output of one executed step.
#[derive(Debug)]
pub(super) struct StepOutcome {
    /// `None` when the process was killed by a signal.
    pub exit_code: Option<i32>,
    pub output: String,
}

async fn execute_step(ctx: &mut JobContext, step_def: &Step) -> Result<StepOutcome> {
    match step_def {
        Step::Run { command, .. } => step::run_command(ctx, command).await,
        Step::Action { action, .. } => match action {
            Action::Checkout => provision::checkout(ctx).await,
            Action::SetupPython { version } => provision::setup_python(ctx, version).await,
            Action::InstallRequirements { manifest } => {
                provision::install_requirements(ctx, manifest).await
            }
        },
    }
}
