//! Vibe-to-Spec Converter - Replaces unstructured vibe steps with template-driven spec steps

use super::{affected_indices, prefix_description};
use crate::optimizer::{reduced_cost, Optimize, OptimizationError};
use crate::types::{Optimization, OptimizationType, StepType, WorkflowStep};

/// Cost retained by a converted step (70% reduction)
const SPEC_COST_FACTOR: f64 = 0.3;

pub struct VibeToSpec;

impl VibeToSpec {
    pub fn new() -> Self {
        Self
    }
}

impl Optimize for VibeToSpec {
    fn kind(&self) -> OptimizationType {
        OptimizationType::VibeToSpec
    }

    fn apply(
        &self,
        steps: &mut Vec<WorkflowStep>,
        optimization: &Optimization,
    ) -> Result<usize, OptimizationError> {
        let mut converted = 0;

        // non-vibe steps stay as they are even when listed
        for i in affected_indices(steps, optimization) {
            let step = &mut steps[i];
            if step.step_type != StepType::Vibe {
                continue;
            }
            step.step_type = StepType::Spec;
            step.quota_cost = reduced_cost(step.quota_cost, SPEC_COST_FACTOR);
            prefix_description(step, "Spec-based: ");
            converted += 1;
        }

        Ok(converted)
    }

    fn id(&self) -> &str {
        "vibe_to_spec"
    }

    fn description(&self) -> &str {
        "Converts vibe steps into spec steps (70% cost reduction)"
    }
}

impl Default for VibeToSpec {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EstimatedSavings;

    #[test]
    fn test_only_vibes_are_converted() {
        let mut steps = vec![
            WorkflowStep::new("a", StepType::Vibe, "Draft reply", 10.0),
            WorkflowStep::new("b", StepType::Analysis, "Score reply", 10.0),
            WorkflowStep::new("c", StepType::Vibe, "Draft follow-up", 7.0),
        ];
        let optimization = Optimization {
            optimization_type: OptimizationType::VibeToSpec,
            description: "convert".into(),
            steps_affected: vec!["a".into(), "b".into()],
            estimated_savings: EstimatedSavings::default(),
        };

        let converted = VibeToSpec::new().apply(&mut steps, &optimization).unwrap();
        assert_eq!(converted, 1);
        assert_eq!(steps[0].step_type, StepType::Spec);
        assert_eq!(steps[0].quota_cost, 3.0);
        assert_eq!(steps[0].description, "Spec-based: Draft reply");
        assert_eq!(steps[1].step_type, StepType::Analysis);
        assert_eq!(steps[1].quota_cost, 10.0);
        assert_eq!(steps[2].step_type, StepType::Vibe);
    }
}
