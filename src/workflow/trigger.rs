use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use super::{Job, Workflow};

/// VCS events a workflow can be triggered by.
///
/// Only the event type is consumed; no payload fields exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum TriggerEvent {
    Push,
    PullRequest,
}

impl std::fmt::Display for TriggerEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TriggerEvent::Push => write!(f, "push"),
            TriggerEvent::PullRequest => write!(f, "pull-request"),
        }
    }
}

/// A job selected for execution by a trigger event.
#[derive(Debug, Clone)]
pub struct TriggeredJob {
    pub workflow: String,
    pub job_id: String,
    pub job: Job,
}

/// Selects every job of every workflow whose trigger list contains `event`.
///
/// Each matching job is selected exactly once per event; workflows not
/// listing the event contribute nothing. Order follows workflow order, then
/// job declaration order within each workflow.
pub fn jobs_for_event(workflows: &[Workflow], event: TriggerEvent) -> Vec<TriggeredJob> {
    workflows
        .iter()
        .filter(|wf| wf.on.contains(&event))
        .flat_map(|wf| {
            wf.jobs.iter().map(|(job_id, job)| TriggeredJob {
                workflow: wf.name.clone(),
                job_id: job_id.clone(),
                job: job.clone(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::Step;
    use indexmap::IndexMap;

    fn workflow(name: &str, on: Vec<TriggerEvent>, job_ids: &[&str]) -> Workflow {
        let mut jobs = IndexMap::new();
        for id in job_ids {
            jobs.insert(
                (*id).to_string(),
                Job {
                    steps: vec![Step::Run {
                        name: None,
                        command: "true".to_string(),
                    }],
                },
            );
        }
        Workflow {
            name: name.to_string(),
            on,
            jobs,
        }
    }

    #[test]
    fn test_push_selects_every_job_exactly_once() {
        let workflows = vec![workflow(
            "ppscan",
            vec![TriggerEvent::Push, TriggerEvent::PullRequest],
            &["lint", "test"],
        )];

        let triggered = jobs_for_event(&workflows, TriggerEvent::Push);
        assert_eq!(triggered.len(), 2);
        assert_eq!(triggered[0].job_id, "lint");
        assert_eq!(triggered[1].job_id, "test");

        let triggered = jobs_for_event(&workflows, TriggerEvent::PullRequest);
        assert_eq!(triggered.len(), 2);
    }

    #[test]
    fn test_non_matching_event_selects_nothing() {
        let workflows = vec![workflow("push-only", vec![TriggerEvent::Push], &["lint"])];
        let triggered = jobs_for_event(&workflows, TriggerEvent::PullRequest);
        assert!(triggered.is_empty());
    }

    #[test]
    fn test_selection_spans_workflows_in_order() {
        let workflows = vec![
            workflow("a", vec![TriggerEvent::Push], &["one"]),
            workflow("b", vec![TriggerEvent::PullRequest], &["two"]),
            workflow("c", vec![TriggerEvent::Push], &["three"]),
        ];

        let triggered = jobs_for_event(&workflows, TriggerEvent::Push);
        let ids: Vec<_> = triggered.iter().map(|t| t.job_id.as_str()).collect();
        assert_eq!(ids, vec!["one", "three"]);
        assert_eq!(triggered[0].workflow, "a");
    }

    #[test]
    fn test_event_round_trips_kebab_case() {
        let yaml = serde_yaml::to_string(&TriggerEvent::PullRequest).unwrap();
        assert_eq!(yaml.trim(), "pull-request");
        assert_eq!(TriggerEvent::PullRequest.to_string(), "pull-request");
    }
}
