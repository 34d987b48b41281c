use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use std::path::{Path, PathBuf};

use crate::config::{Config, OutputFormat};
use crate::output;
use crate::report::RunReport;
use crate::runner::{RunOptions, Runner};
use crate::workflow::{jobs_for_event, TriggerEvent, Workflow};

#[derive(Parser)]
#[command(name = "cirun")]
#[command(author, version, about = "Local CI Pipeline Runner", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Write the JSON run report to this file
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(short, long, global = true, default_value_t = false)]
    pretty: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run all jobs triggered by an event
    Run {
        /// Event triggering the pipelines
        #[arg(short, long, value_enum)]
        event: TriggerEvent,

        /// Workflow file(s) to run; defaults to the configured workflows directory
        #[arg(short, long)]
        workflow: Vec<PathBuf>,

        /// Source tree checked out into job workspaces
        #[arg(short, long)]
        source: Option<PathBuf>,

        /// Run only the job with this id
        #[arg(short, long)]
        job: Option<String>,

        /// Retain job workspaces after the run
        #[arg(short, long, default_value_t = false)]
        keep_workspaces: bool,
    },

    /// Parse and validate workflow files without executing them
    Check {
        /// Workflow file(s) to validate
        #[arg(short, long, required = true)]
        workflow: Vec<PathBuf>,
    },
}

impl Cli {
    pub async fn execute(&self) -> Result<()> {
        let config = Config::load(self.config.as_deref())?;

        match &self.command {
            Commands::Run {
                event,
                workflow,
                source,
                job,
                keep_workspaces,
            } => {
                self.execute_run(
                    &config,
                    *event,
                    workflow,
                    source.as_deref(),
                    job.as_deref(),
                    *keep_workspaces,
                )
                .await
            }
            Commands::Check { workflow } => Self::execute_check(workflow),
        }
    }

    async fn execute_run(
        &self,
        config: &Config,
        event: TriggerEvent,
        workflow_paths: &[PathBuf],
        source: Option<&Path>,
        job_filter: Option<&str>,
        keep_workspaces: bool,
    ) -> Result<()> {
        info!("Running pipelines for event: {event}");

        let progress = output::PhaseProgress::start_phase_1();

        let files = collect_workflow_files(workflow_paths, &config.runner.workflows_dir)?;
        let workflows = files
            .iter()
            .map(|path| Workflow::from_path(path))
            .collect::<crate::error::Result<Vec<_>>>()?;

        let mut triggered = jobs_for_event(&workflows, event);
        if let Some(filter) = job_filter {
            triggered.retain(|t| t.job_id == filter);
            if triggered.is_empty() {
                bail!("No job named '{filter}' is triggered by {event}");
            }
        }

        let progress = progress.finish_phase_1_start_phase_2(triggered.len());

        let options = RunOptions {
            source: source
                .map(Path::to_path_buf)
                .unwrap_or_else(|| config.runner.source.clone()),
            shell: config.runner.shell.clone(),
            keep_workspaces: keep_workspaces || config.runner.keep_workspaces,
        };
        let report = Runner::new(options).execute(triggered, event).await?;

        let progress = progress.finish_phase_2_start_phase_3();
        self.emit_report(config, &report)?;
        progress.finish_phase_3();

        output::print_summary(&report);

        if !report.succeeded() {
            let failed = report
                .jobs
                .iter()
                .filter(|j| j.status != crate::report::Status::Passed)
                .count();
            bail!("{failed} job(s) failed");
        }
        Ok(())
    }

    fn execute_check(workflow_paths: &[PathBuf]) -> Result<()> {
        let mut invalid = 0;
        for path in workflow_paths {
            match Workflow::from_path(path) {
                Ok(wf) => {
                    println!(
                        "{}: ok ({} job(s), triggers: {})",
                        path.display(),
                        wf.jobs.len(),
                        wf.on
                            .iter()
                            .map(ToString::to_string)
                            .collect::<Vec<_>>()
                            .join(", ")
                    );
                }
                Err(err) => {
                    println!("{}: {err}", path.display());
                    invalid += 1;
                }
            }
        }

        if invalid > 0 {
            bail!("{invalid} workflow file(s) failed validation");
        }
        Ok(())
    }

    fn emit_report(&self, config: &Config, report: &RunReport) -> Result<()> {
        let pretty = self.pretty || config.output.pretty;
        let json_output = if pretty {
            serde_json::to_string_pretty(report)?
        } else {
            serde_json::to_string(report)?
        };

        if let Some(output_path) = &self.output {
            std::fs::write(output_path, &json_output)?;
            info!("Run report written to: {}", output_path.display());
        } else if config.output.format == OutputFormat::Json {
            println!("{json_output}");
        }

        Ok(())
    }
}

/// Resolves the workflow files for a run: explicit paths when given,
/// otherwise every .yml/.yaml file in the workflows directory.
fn collect_workflow_files(explicit: &[PathBuf], workflows_dir: &Path) -> Result<Vec<PathBuf>> {
    if !explicit.is_empty() {
        return Ok(explicit.to_vec());
    }

    let entries = std::fs::read_dir(workflows_dir).with_context(|| {
        format!(
            "No workflow files given and workflows directory '{}' is not readable",
            workflows_dir.display()
        )
    })?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(std::result::Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            matches!(
                path.extension().and_then(|ext| ext.to_str()),
                Some("yml" | "yaml")
            )
        })
        .collect();
    files.sort();

    if files.is_empty() {
        bail!(
            "No workflow files found in '{}'",
            workflows_dir.display()
        );
    }
    Ok(files)
}
