use std::path::Path;

use log::debug;
use tokio::process::Command;

use crate::error::{CirunError, Result};

use super::job::{JobContext, StepOutcome};
use super::step::{run_process, VENV_BIN};

/// Directories never copied into a job workspace.
const CHECKOUT_SKIP: &[&str] = &[".git", ".hg", ".svn", ".venv"];

const VENV_DIR: &str = ".venv";

/// Binary name for a pinned interpreter version, e.g. "3.8" -> "python3.8".
pub fn interpreter_binary(version: &str) -> String {
    format!("python{version}")
}

/// The checkout action: copies the source tree into the job workspace.
///
/// VCS metadata is skipped; the workspace is ephemeral and never written
/// back to the source.
pub(super) async fn checkout(ctx: &JobContext) -> Result<StepOutcome> {
    let source = ctx.options.source.clone();
    if !source.is_dir() {
        return Err(CirunError::Provision(format!(
            "source tree '{}' is not a directory",
            source.display()
        )));
    }

    let workspace = ctx.workspace.clone();
    let copied = tokio::task::spawn_blocking(move || copy_tree(&source, &workspace))
        .await
        .map_err(|e| CirunError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))??;

    debug!("Checked out {copied} file(s) into {}", ctx.workspace.display());
    Ok(StepOutcome {
        exit_code: Some(0),
        output: String::new(),
    })
}

fn copy_tree(source: &Path, dest: &Path) -> Result<usize> {
    let mut copied = 0;
    std::fs::create_dir_all(dest)?;
    for entry in std::fs::read_dir(source)? {
        let entry = entry?;
        let name = entry.file_name();
        if CHECKOUT_SKIP
            .iter()
            .any(|skip| name.to_string_lossy() == *skip)
        {
            continue;
        }

        let target = dest.join(&name);
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            copied += copy_tree(&entry.path(), &target)?;
        } else if file_type.is_file() {
            std::fs::copy(entry.path(), &target)?;
            copied += 1;
        }
        // Symlinks are dropped; the workspace must not reach outside itself.
    }
    Ok(copied)
}

/// The setup-python action: resolves the pinned interpreter on PATH and
/// creates a virtualenv at `<workspace>/.venv`.
///
/// A missing interpreter is a provisioning failure, fatal to the job.
pub(super) async fn setup_python(ctx: &mut JobContext, version: &str) -> Result<StepOutcome> {
    let binary = interpreter_binary(version);
    let venv = ctx.workspace.join(VENV_DIR);

    let mut cmd = Command::new(&binary);
    cmd.arg("-m")
        .arg("venv")
        .arg(&venv)
        .current_dir(&ctx.workspace);

    let outcome = match run_process(cmd, &binary).await {
        Ok(outcome) => outcome,
        Err(CirunError::Spawn { source, .. })
            if source.kind() == std::io::ErrorKind::NotFound =>
        {
            return Err(CirunError::Provision(format!(
                "interpreter '{binary}' not found on PATH"
            )));
        }
        Err(other) => return Err(other),
    };

    if outcome.exit_code == Some(0) {
        debug!("Created virtualenv at {}", venv.display());
        ctx.venv = Some(venv);
    }
    Ok(outcome)
}

/// The install-requirements action: installs the dependency manifest into
/// the workspace virtualenv.
///
/// Requires a prior setup-python step; a missing manifest or an
/// unresolvable dependency is a provisioning failure, fatal to the job
/// before any later step runs.
pub(super) async fn install_requirements(
    ctx: &JobContext,
    manifest: &str,
) -> Result<StepOutcome> {
    let venv = ctx.venv.as_ref().ok_or_else(|| {
        CirunError::Provision(
            "no interpreter provisioned; add a setup-python step before install-requirements"
                .to_string(),
        )
    })?;

    let manifest_path = ctx.workspace.join(manifest);
    if !manifest_path.is_file() {
        return Err(CirunError::Provision(format!(
            "dependency manifest '{manifest}' not found in workspace"
        )));
    }

    let pip = venv.join(VENV_BIN).join("pip");
    let mut cmd = Command::new(&pip);
    cmd.arg("install")
        .arg("-r")
        .arg(&manifest_path)
        .current_dir(&ctx.workspace);

    match run_process(cmd, &pip.display().to_string()).await {
        Ok(outcome) => Ok(outcome),
        Err(CirunError::Spawn { source, .. })
            if source.kind() == std::io::ErrorKind::NotFound =>
        {
            Err(CirunError::Provision(format!(
                "pip not found in virtualenv at {}",
                venv.display()
            )))
        }
        Err(other) => Err(other),
    }
}
