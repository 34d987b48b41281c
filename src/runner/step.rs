use std::ffi::OsString;
use std::path::Path;

use tokio::process::Command;

use crate::error::{CirunError, Result};

use super::job::{JobContext, StepOutcome};

/// Output captured per step is capped to keep reports bounded; the tail is
/// kept since that is where linters and test runners print their verdict.
const MAX_CAPTURE: usize = 16 * 1024;

#[cfg(not(windows))]
pub(super) const VENV_BIN: &str = "bin";
#[cfg(windows)]
pub(super) const VENV_BIN: &str = "Scripts";

/// Executes a `run:` step through the configured shell in the workspace.
///
/// When a virtualenv has been provisioned its bin directory is prepended to
/// PATH so tools installed from the manifest resolve first.
pub(super) async fn run_command(ctx: &JobContext, command: &str) -> Result<StepOutcome> {
    let mut cmd = Command::new(&ctx.options.shell);
    cmd.arg("-c").arg(command).current_dir(&ctx.workspace);
    if let Some(venv) = &ctx.venv {
        cmd.env("PATH", prepend_venv_path(venv));
    }
    run_process(cmd, &ctx.options.shell).await
}

/// Runs a process to completion, capturing exit code and combined output.
pub(super) async fn run_process(mut cmd: Command, label: &str) -> Result<StepOutcome> {
    let output = cmd.output().await.map_err(|source| CirunError::Spawn {
        command: label.to_string(),
        source,
    })?;

    Ok(StepOutcome {
        exit_code: output.status.code(),
        output: combine_output(&output.stdout, &output.stderr),
    })
}

fn combine_output(stdout: &[u8], stderr: &[u8]) -> String {
    let mut combined = String::from_utf8_lossy(stdout).into_owned();
    let err = String::from_utf8_lossy(stderr);
    if !err.is_empty() {
        if !combined.is_empty() && !combined.ends_with('\n') {
            combined.push('\n');
        }
        combined.push_str(&err);
    }
    truncate_to_tail(combined)
}

fn truncate_to_tail(mut text: String) -> String {
    if text.len() > MAX_CAPTURE {
        let cut = text.len() - MAX_CAPTURE;
        // Cut on a char boundary at or after the byte offset.
        let boundary = (cut..text.len())
            .find(|&i| text.is_char_boundary(i))
            .unwrap_or(text.len());
        text.replace_range(..boundary, "[... output truncated ...]\n");
    }
    text
}

fn prepend_venv_path(venv: &Path) -> OsString {
    let current = std::env::var_os("PATH").unwrap_or_default();
    let mut paths = vec![venv.join(VENV_BIN)];
    paths.extend(std::env::split_paths(&current));
    std::env::join_paths(paths).unwrap_or(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::RunOptions;
    use std::path::PathBuf;

    fn ctx(workspace: PathBuf) -> JobContext {
        JobContext {
            workspace,
            options: RunOptions::default(),
            venv: None,
        }
    }

    #[tokio::test]
    async fn test_run_command_captures_exit_code_and_output() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ctx(dir.path().to_path_buf());

        let ok = run_command(&ctx, "echo all good").await.unwrap();
        assert_eq!(ok.exit_code, Some(0));
        assert!(ok.output.contains("all good"));

        let bad = run_command(&ctx, "echo diff on stderr >&2; exit 1")
            .await
            .unwrap();
        assert_eq!(bad.exit_code, Some(1));
        assert!(bad.output.contains("diff on stderr"));
    }

    #[tokio::test]
    async fn test_run_command_executes_in_workspace() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "present").unwrap();
        let ctx = ctx(dir.path().to_path_buf());

        let outcome = run_command(&ctx, "cat marker.txt").await.unwrap();
        assert_eq!(outcome.exit_code, Some(0));
        assert!(outcome.output.contains("present"));
    }

    #[tokio::test]
    async fn test_missing_shell_is_a_spawn_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = ctx(dir.path().to_path_buf());
        ctx.options.shell = "definitely-not-a-shell-cirun".to_string();

        let err = run_command(&ctx, "true").await.unwrap_err();
        assert!(matches!(err, CirunError::Spawn { .. }));
    }

    #[test]
    fn test_prepend_venv_path_puts_venv_first() {
        let venv = Path::new("/tmp/ws/.venv");
        let path = prepend_venv_path(venv);
        let first = std::env::split_paths(&path).next().unwrap();
        assert_eq!(first, venv.join(VENV_BIN));
    }

    #[test]
    fn test_long_output_keeps_the_tail() {
        let long = "x".repeat(MAX_CAPTURE * 2) + "FAILED tests/test_x.py";
        let truncated = truncate_to_tail(long);
        assert!(truncated.starts_with("[... output truncated ...]"));
        assert!(truncated.ends_with("FAILED tests/test_x.py"));
    }

    #[test]
    fn test_combine_output_joins_streams() {
        let combined = combine_output(b"line from stdout\n", b"line from stderr\n");
        assert!(combined.contains("line from stdout"));
        assert!(combined.contains("line from stderr"));
    }
}
