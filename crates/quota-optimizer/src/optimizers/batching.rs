//! Batching Optimizer
//!
//! **Purpose**: Merge similar steps into one batched step to amortize
//! per-operation overhead.
//!
//! # Batch key
//! `type:operationPattern:inputPattern`, where the operation pattern is the
//! normalized description (`"Summarize ticket 12"` → `"summarize ticket N"`)
//! and the input pattern is the sorted list of input shapes (`"ID,PARAM"`).
//!
//! # Example
//! ```text
//! summarize ticket 1 (5) + summarize ticket 2 (5) + summarize ticket 3 (5)
//! → Batched: summarize ticket 1 (9)
//! ```

use super::{affected_indices, prefix_description};
use crate::ids::IdGenerator;
use crate::optimizer::{reduced_cost, Optimize, OptimizationError};
use crate::rules::{input_pattern, operation_pattern};
use crate::types::{BatchedOperation, Optimization, OptimizationType, Workflow, WorkflowStep};
use indexmap::IndexMap;
use std::collections::HashSet;
use tracing::debug;

/// Smallest group worth batching
pub const MIN_BATCH_SIZE: usize = 2;

/// Cost retained by a batched step (40% reduction)
const BATCHED_COST_FACTOR: f64 = 0.6;

pub struct Batching;

impl Batching {
    pub fn new() -> Self {
        Self
    }

    pub fn batch_key(step: &WorkflowStep) -> String {
        format!(
            "{}:{}:{}",
            step.step_type,
            operation_pattern(&step.description),
            input_pattern(&step.inputs)
        )
    }

    /// Savings percentage for a batch: grows 10 points per step, capped at 70
    pub fn estimated_savings(batch_size: usize) -> u32 {
        let factor_pct = 20 + 10 * batch_size.min(5) as u32;
        factor_pct.min(70)
    }

    /// Group steps by batch key and describe every group of two or more
    pub fn plan(&self, workflow: &Workflow, ids: &dyn IdGenerator) -> Vec<BatchedOperation> {
        let mut groups: IndexMap<String, Vec<&WorkflowStep>> = IndexMap::new();
        for step in &workflow.steps {
            groups.entry(Self::batch_key(step)).or_default().push(step);
        }

        let batches: Vec<BatchedOperation> = groups
            .into_values()
            .filter(|group| group.len() >= MIN_BATCH_SIZE)
            .map(|group| {
                let first = group[0];
                BatchedOperation {
                    id: ids.next_id("batch"),
                    original_operations: group.iter().map(|step| step.id.clone()).collect(),
                    step_type: first.step_type,
                    description: format!(
                        "Batch {} {} operations: {}",
                        group.len(),
                        first.step_type,
                        operation_pattern(&first.description)
                    ),
                    batch_size: group.len(),
                    estimated_savings: Self::estimated_savings(group.len()),
                }
            })
            .collect();

        debug!(workflow_id = %workflow.id, batches = batches.len(), "Batch plan built");
        batches
    }
}

impl Optimize for Batching {
    fn kind(&self) -> OptimizationType {
        OptimizationType::Batching
    }

    fn apply(
        &self,
        steps: &mut Vec<WorkflowStep>,
        optimization: &Optimization,
    ) -> Result<usize, OptimizationError> {
        let indices = affected_indices(steps, optimization);
        if indices.len() < MIN_BATCH_SIZE {
            return Err(OptimizationError::NotApplicable(format!(
                "batching needs at least {} remaining steps, found {}",
                MIN_BATCH_SIZE,
                indices.len()
            )));
        }

        let combined: f64 = indices.iter().map(|&i| steps[i].quota_cost).sum();
        let head = indices[0];
        steps[head].quota_cost = reduced_cost(combined, BATCHED_COST_FACTOR);
        prefix_description(&mut steps[head], "Batched: ");

        let absorbed: HashSet<usize> = indices[1..].iter().copied().collect();
        let mut position = 0;
        steps.retain(|_| {
            let keep = !absorbed.contains(&position);
            position += 1;
            keep
        });

        Ok(indices.len())
    }

    fn id(&self) -> &str {
        "batching"
    }

    fn description(&self) -> &str {
        "Merges similar steps into a single batched step (40% cost reduction)"
    }
}

impl Default for Batching {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::SequentialIds;
    use crate::types::{EstimatedSavings, StepType};

    fn step(id: &str, step_type: StepType, description: &str, cost: f64) -> WorkflowStep {
        WorkflowStep::new(id, step_type, description, cost)
    }

    #[test]
    fn test_three_identical_vibes_make_one_batch() {
        let workflow = Workflow::new(
            "wf",
            vec![
                step("a", StepType::Vibe, "Summarize ticket 1", 5.0).with_inputs(["ticketId"]),
                step("b", StepType::Vibe, "Summarize ticket 2", 5.0).with_inputs(["ticketId"]),
                step("c", StepType::Vibe, "Summarize ticket 3", 5.0).with_inputs(["ticketId"]),
            ],
        );

        let batches = Batching::new().plan(&workflow, &SequentialIds::new());
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].id, "batch_1");
        assert_eq!(batches[0].batch_size, 3);
        assert_eq!(batches[0].estimated_savings, 50);
        assert_eq!(batches[0].original_operations, vec!["a", "b", "c"]);
        assert_eq!(batches[0].step_type, StepType::Vibe);
    }

    #[test]
    fn test_input_shape_and_type_split_groups() {
        let workflow = Workflow::new(
            "wf",
            vec![
                step("a", StepType::Vibe, "Summarize ticket 1", 5.0).with_inputs(["ticketId"]),
                step("b", StepType::Vibe, "Summarize ticket 2", 5.0).with_inputs(["ticketData"]),
                step("c", StepType::Spec, "Summarize ticket 3", 5.0).with_inputs(["ticketId"]),
                step("d", StepType::Vibe, "Summarize ticket 4", 5.0).with_inputs(["ticketId"]),
            ],
        );

        let batches = Batching::new().plan(&workflow, &SequentialIds::new());
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].original_operations, vec!["a", "d"]);
        assert_eq!(batches[0].estimated_savings, 40);
    }

    #[test]
    fn test_savings_curve_caps_at_seventy() {
        assert_eq!(Batching::estimated_savings(2), 40);
        assert_eq!(Batching::estimated_savings(4), 60);
        assert_eq!(Batching::estimated_savings(5), 70);
        assert_eq!(Batching::estimated_savings(40), 70);
    }

    #[test]
    fn test_apply_merges_into_first_step() {
        let mut steps = vec![
            step("a", StepType::Vibe, "Draft intro", 5.0),
            step("b", StepType::Spec, "Fill template", 1.0),
            step("c", StepType::Vibe, "Draft outro", 5.0),
            step("d", StepType::Vibe, "Draft body", 5.0),
        ];
        let optimization = Optimization {
            optimization_type: OptimizationType::Batching,
            description: "batch drafts".into(),
            steps_affected: vec!["d".into(), "a".into(), "c".into()],
            estimated_savings: EstimatedSavings::default(),
        };

        let touched = Batching::new().apply(&mut steps, &optimization).unwrap();
        assert_eq!(touched, 3);
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].id, "a");
        assert_eq!(steps[0].quota_cost, 9.0);
        assert_eq!(steps[0].description, "Batched: Draft intro");
        assert_eq!(steps[1].id, "b");
    }

    #[test]
    fn test_apply_needs_two_steps() {
        let mut steps = vec![step("a", StepType::Vibe, "Draft", 5.0)];
        let optimization = Optimization {
            optimization_type: OptimizationType::Batching,
            description: "batch".into(),
            steps_affected: vec!["a".into(), "gone".into()],
            estimated_savings: EstimatedSavings::default(),
        };

        let err = Batching::new().apply(&mut steps, &optimization).unwrap_err();
        assert!(matches!(err, OptimizationError::NotApplicable(_)));
        assert_eq!(steps[0].quota_cost, 5.0);
    }
}
