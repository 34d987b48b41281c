use std::fmt::Write;

use comfy_table::{Cell, Color as TableColor};

use crate::report::{JobReport, RunReport, Status};

use super::styling::{bright, bright_green, bright_red, bright_yellow, cyan, dim};
use super::tables::{create_table, duration_cell, exit_code_cell, status_cell};

/// Prints a human-readable summary of a pipeline run to stdout.
///
/// Displays an overview (event, source, pass/fail counts), one
/// color-coded table per job with its steps, and the captured output of
/// every failing step (lint diffs, failing tests, install errors).
pub fn print_summary(report: &RunReport) {
    println!("{}", render_summary(report));
}

fn create_cyan_header(labels: &[&str]) -> Vec<Cell> {
    labels
        .iter()
        .map(|label| Cell::new(*label).fg(TableColor::Cyan))
        .collect()
}

fn add_section_header(output: &mut String, emoji: &str, title: &str) {
    let _ = writeln!(output, "{} {}", bright(emoji), bright(title).underlined());
}

fn job_status_display(job: &JobReport) -> String {
    match job.status {
        Status::Passed => bright_green("passed").to_string(),
        Status::Failed => bright_red("failed").to_string(),
        Status::Skipped => bright_yellow("skipped").to_string(),
    }
}

fn render_summary(report: &RunReport) -> String {
    let mut output = String::new();

    // Overview section
    add_section_header(&mut output, "📊", "Run Overview");

    let passed = report
        .jobs
        .iter()
        .filter(|j| j.status == Status::Passed)
        .count();
    let failed = report.jobs.len() - passed;

    let verdict = if report.succeeded() {
        bright_green("success")
    } else {
        bright_red("failure")
    };

    let _ = write!(
        output,
        "  {} {}\n  {} {}\n  {} {}\n  {} {} passed, {} failed\n\n",
        dim("Event:"),
        cyan(report.event),
        dim("Source:"),
        cyan(&report.source),
        dim("Result:"),
        verdict,
        dim("Jobs:"),
        bright_yellow(passed),
        bright_yellow(failed),
    );

    // One table per job
    for job in &report.jobs {
        add_section_header(
            &mut output,
            "🧱",
            &format!(
                "{} / {} — {} ({:.1}s)",
                job.workflow,
                job.name,
                job_status_display(job),
                job.duration_secs
            ),
        );

        let mut table = create_table();
        table.set_header(create_cyan_header(&["Step", "Status", "Exit", "Duration"]));
        for step in &job.steps {
            table.add_row(vec![
                Cell::new(&step.name),
                status_cell(step.status),
                exit_code_cell(step.exit_code),
                duration_cell(step.duration_secs),
            ]);
        }
        let _ = writeln!(output, "{table}\n");

        // Echo captured output of failing steps so diffs and failing tests
        // are visible without opening the JSON report.
        for step in &job.steps {
            if step.status == Status::Failed {
                if let Some(text) = &step.output {
                    if !text.is_empty() {
                        let _ = writeln!(
                            output,
                            "  {}\n{}",
                            bright_red(format!("Output of failing step '{}':", step.name)),
                            indent(text)
                        );
                    }
                }
            }
        }
    }

    output
}

fn indent(text: &str) -> String {
    text.lines()
        .map(|line| format!("    {line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::StepReport;
    use crate::workflow::TriggerEvent;
    use chrono::Utc;

    fn sample_report() -> RunReport {
        RunReport {
            event: TriggerEvent::Push,
            source: ".".to_string(),
            started_at: Utc::now(),
            finished_at: Utc::now(),
            jobs: vec![JobReport {
                workflow: "ppscan".to_string(),
                name: "lint".to_string(),
                status: Status::Failed,
                duration_secs: 2.5,
                steps: vec![
                    StepReport {
                        name: "Checkout".to_string(),
                        status: Status::Passed,
                        exit_code: Some(0),
                        duration_secs: 0.1,
                        output: None,
                    },
                    StepReport {
                        name: "Check formatting".to_string(),
                        status: Status::Failed,
                        exit_code: Some(1),
                        duration_secs: 1.2,
                        output: Some("--- a/ppscan.py\n+++ b/ppscan.py".to_string()),
                    },
                    StepReport {
                        name: "Never ran".to_string(),
                        status: Status::Skipped,
                        exit_code: None,
                        duration_secs: 0.0,
                        output: None,
                    },
                ],
            }],
        }
    }

    #[test]
    fn test_summary_includes_jobs_steps_and_failure_output() {
        let rendered = render_summary(&sample_report());
        assert!(rendered.contains("Run Overview"));
        assert!(rendered.contains("lint"));
        assert!(rendered.contains("Check formatting"));
        assert!(rendered.contains("+++ b/ppscan.py"));
        assert!(rendered.contains("skipped"));
    }

    #[test]
    fn test_indent_prefixes_every_line() {
        let indented = indent("one\ntwo");
        assert_eq!(indented, "    one\n    two");
    }
}
