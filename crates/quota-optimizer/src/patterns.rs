//! Step pattern analysis: aggregate statistics over a workflow's steps

use crate::types::{StepType, Workflow, WorkflowStep};
use indexmap::IndexMap;

/// Number of leading description characters that make two steps "similar"
pub const SIMILARITY_PREFIX_CHARS: usize = 20;

/// Statistics computed once per workflow and shared by the opportunity scans
#[derive(Debug, Clone)]
pub struct StepPatterns<'a> {
    pub vibe_steps: Vec<&'a WorkflowStep>,
    pub spec_steps: Vec<&'a WorkflowStep>,
    pub data_retrieval_steps: Vec<&'a WorkflowStep>,

    /// Steps sharing type and description prefix (groups of 2+)
    pub similar_operations: Vec<Vec<&'a WorkflowStep>>,

    /// Steps sharing type, description, inputs and outputs exactly (groups of 2+)
    pub repeated_operations: Vec<Vec<&'a WorkflowStep>>,

    pub step_count: usize,
    pub total_quota_cost: f64,
    pub avg_step_cost: f64,
}

impl<'a> StepPatterns<'a> {
    pub fn analyze(workflow: &'a Workflow) -> Self {
        let steps = &workflow.steps;
        let of_type = move |step_type: StepType| -> Vec<&'a WorkflowStep> {
            steps.iter().filter(|step| step.step_type == step_type).collect()
        };

        let mut similar: IndexMap<(StepType, String), Vec<&'a WorkflowStep>> = IndexMap::new();
        let mut repeated: IndexMap<(StepType, &'a str, &'a [String], &'a [String]), Vec<&'a WorkflowStep>> =
            IndexMap::new();

        for step in steps {
            let prefix: String = step.description.chars().take(SIMILARITY_PREFIX_CHARS).collect();
            similar.entry((step.step_type, prefix)).or_default().push(step);

            repeated
                .entry((
                    step.step_type,
                    step.description.as_str(),
                    step.inputs.as_slice(),
                    step.outputs.as_slice(),
                ))
                .or_default()
                .push(step);
        }

        let total_quota_cost = workflow.total_cost();
        let avg_step_cost = if steps.is_empty() {
            0.0
        } else {
            total_quota_cost / steps.len() as f64
        };

        Self {
            vibe_steps: of_type(StepType::Vibe),
            spec_steps: of_type(StepType::Spec),
            data_retrieval_steps: of_type(StepType::DataRetrieval),
            similar_operations: similar.into_values().filter(|group| group.len() > 1).collect(),
            repeated_operations: repeated.into_values().filter(|group| group.len() > 1).collect(),
            step_count: steps.len(),
            total_quota_cost,
            avg_step_cost,
        }
    }
}

/// Summed quota cost of a step group
pub fn group_cost(group: &[&WorkflowStep]) -> f64 {
    group.iter().map(|step| step.quota_cost).sum()
}

/// Step ids of a group, in step order
pub fn group_ids(group: &[&WorkflowStep]) -> Vec<String> {
    group.iter().map(|step| step.id.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(id: &str, step_type: StepType, description: &str, cost: f64) -> WorkflowStep {
        WorkflowStep::new(id, step_type, description, cost)
    }

    #[test]
    fn test_type_subsets_and_costs() {
        let workflow = Workflow::new(
            "wf",
            vec![
                step("a", StepType::Vibe, "Brainstorm", 10.0),
                step("b", StepType::Spec, "Template", 2.0),
                step("c", StepType::DataRetrieval, "Fetch rows", 3.0),
                step("d", StepType::Analysis, "Analyze rows", 5.0),
            ],
        );

        let patterns = StepPatterns::analyze(&workflow);
        assert_eq!(patterns.vibe_steps.len(), 1);
        assert_eq!(patterns.spec_steps.len(), 1);
        assert_eq!(patterns.data_retrieval_steps.len(), 1);
        assert_eq!(patterns.step_count, 4);
        assert_eq!(patterns.total_quota_cost, 20.0);
        assert_eq!(patterns.avg_step_cost, 5.0);
        assert!(patterns.similar_operations.is_empty());
        assert!(patterns.repeated_operations.is_empty());
    }

    #[test]
    fn test_similar_groups_use_description_prefix() {
        let workflow = Workflow::new(
            "wf",
            vec![
                step("a", StepType::Vibe, "Summarize customer feedback batch 1", 4.0),
                step("b", StepType::Vibe, "Summarize customer feedback batch 2", 4.0),
                step("c", StepType::Spec, "Summarize customer feedback batch 3", 4.0),
                step("d", StepType::Vibe, "Something else", 4.0),
            ],
        );

        let patterns = StepPatterns::analyze(&workflow);
        assert_eq!(patterns.similar_operations.len(), 1);
        assert_eq!(group_ids(&patterns.similar_operations[0]), vec!["a", "b"]);
        // descriptions differ, so nothing is an exact repeat
        assert!(patterns.repeated_operations.is_empty());
    }

    #[test]
    fn test_repeated_groups_need_identical_io() {
        let workflow = Workflow::new(
            "wf",
            vec![
                step("a", StepType::DataRetrieval, "Fetch users", 2.0).with_inputs(["orgId"]),
                step("b", StepType::DataRetrieval, "Fetch users", 2.0).with_inputs(["orgId"]),
                step("c", StepType::DataRetrieval, "Fetch users", 2.0).with_inputs(["teamId"]),
            ],
        );

        let patterns = StepPatterns::analyze(&workflow);
        assert_eq!(patterns.repeated_operations.len(), 1);
        assert_eq!(group_ids(&patterns.repeated_operations[0]), vec!["a", "b"]);
        assert_eq!(group_cost(&patterns.repeated_operations[0]), 4.0);
        assert_eq!(patterns.similar_operations[0].len(), 3);
    }
}
