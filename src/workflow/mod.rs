mod trigger;

pub use trigger::{jobs_for_event, TriggerEvent, TriggeredJob};

use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::error::{CirunError, Result};

/// A parsed and validated workflow definition.
///
/// Workflows are declarative YAML files naming their trigger events and an
/// ordered map of jobs. Each job is a linear sequence of steps; there is no
/// branching and no state shared between jobs beyond the checked-out tree.
#[derive(Debug, Clone)]
pub struct Workflow {
    pub name: String,
    pub on: Vec<TriggerEvent>,
    pub jobs: IndexMap<String, Job>,
}

#[derive(Debug, Clone)]
pub struct Job {
    pub steps: Vec<Step>,
}

/// A single step: either a builtin provisioning action or a shell command.
#[derive(Debug, Clone)]
pub enum Step {
    Run {
        name: Option<String>,
        command: String,
    },
    Action {
        name: Option<String>,
        action: Action,
    },
}

impl Step {
    /// Human-readable step label for reports and console output.
    pub fn display_name(&self) -> String {
        match self {
            Step::Run { name, command } => name.clone().unwrap_or_else(|| command.clone()),
            Step::Action { name, action } => {
                name.clone().unwrap_or_else(|| action.label().to_string())
            }
        }
    }
}

/// Builtin provisioning actions understood by the runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Copy the source tree into the job workspace.
    Checkout,
    /// Resolve a pinned interpreter and create a virtualenv in the workspace.
    SetupPython { version: String },
    /// Install dependencies from a manifest into the workspace virtualenv.
    InstallRequirements { manifest: String },
}

impl Action {
    fn label(&self) -> &'static str {
        match self {
            Action::Checkout => "checkout",
            Action::SetupPython { .. } => "setup-python",
            Action::InstallRequirements { .. } => "install-requirements",
        }
    }
}

const DEFAULT_MANIFEST: &str = "requirements.txt";

// Raw serde-facing structures. Validation converts these into the public
// model so that invalid combinations (a step with both `uses` and `run`,
// an unknown action, a setup-python without a version) never escape parsing.

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawWorkflow {
    name: String,
    on: OneOrMany<TriggerEvent>,
    jobs: IndexMap<String, RawJob>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawJob {
    steps: Vec<RawStep>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawStep {
    name: Option<String>,
    uses: Option<String>,
    #[serde(default)]
    with: IndexMap<String, String>,
    run: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(item) => vec![item],
            OneOrMany::Many(items) => items,
        }
    }
}

impl Workflow {
    /// Parses and validates a workflow from a YAML file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_str_named(&contents, path)
    }

    /// Parses and validates a workflow from a YAML string.
    ///
    /// `origin` is only used in error messages.
    pub fn from_str_named(contents: &str, origin: &Path) -> Result<Self> {
        let raw: RawWorkflow = serde_yaml::from_str(contents)?;
        validate(raw, origin)
    }
}

fn validate(raw: RawWorkflow, origin: &Path) -> Result<Workflow> {
    let invalid = |reason: String| CirunError::Workflow {
        path: origin.to_path_buf(),
        reason,
    };

    let on = raw.on.into_vec();
    if on.is_empty() {
        return Err(invalid("workflow has an empty 'on' trigger list".into()));
    }
    if raw.jobs.is_empty() {
        return Err(invalid("workflow defines no jobs".into()));
    }

    let mut jobs = IndexMap::with_capacity(raw.jobs.len());
    for (job_id, raw_job) in raw.jobs {
        if raw_job.steps.is_empty() {
            return Err(invalid(format!("job '{job_id}' has no steps")));
        }

        let mut steps = Vec::with_capacity(raw_job.steps.len());
        for (idx, raw_step) in raw_job.steps.into_iter().enumerate() {
            let step = convert_step(raw_step)
                .map_err(|reason| invalid(format!("job '{job_id}' step {}: {reason}", idx + 1)))?;
            steps.push(step);
        }
        jobs.insert(job_id, Job { steps });
    }

    Ok(Workflow {
        name: raw.name,
        on,
        jobs,
    })
}

fn convert_step(raw: RawStep) -> std::result::Result<Step, String> {
    match (raw.uses, raw.run) {
        (Some(_), Some(_)) => Err("step declares both 'uses' and 'run'".into()),
        (None, None) => Err("step declares neither 'uses' nor 'run'".into()),
        (None, Some(command)) => {
            if !raw.with.is_empty() {
                return Err("'with' is only valid on 'uses' steps".into());
            }
            Ok(Step::Run {
                name: raw.name,
                command,
            })
        }
        (Some(uses), None) => {
            let action = convert_action(&uses, &raw.with)?;
            Ok(Step::Action {
                name: raw.name,
                action,
            })
        }
    }
}

fn convert_action(
    uses: &str,
    with: &IndexMap<String, String>,
) -> std::result::Result<Action, String> {
    let expect_keys = |allowed: &[&str]| -> std::result::Result<(), String> {
        for key in with.keys() {
            if !allowed.contains(&key.as_str()) {
                return Err(format!("unknown input '{key}' for action '{uses}'"));
            }
        }
        Ok(())
    };

    match uses {
        "checkout" => {
            expect_keys(&[])?;
            Ok(Action::Checkout)
        }
        "setup-python" => {
            expect_keys(&["python-version"])?;
            let version = with
                .get("python-version")
                .cloned()
                .ok_or_else(|| "setup-python requires a 'python-version' input".to_string())?;
            Ok(Action::SetupPython { version })
        }
        "install-requirements" => {
            expect_keys(&["manifest"])?;
            let manifest = with
                .get("manifest")
                .cloned()
                .unwrap_or_else(|| DEFAULT_MANIFEST.to_string());
            Ok(Action::InstallRequirements { manifest })
        }
        other => Err(format!("unknown action '{other}'")),
    }
}
