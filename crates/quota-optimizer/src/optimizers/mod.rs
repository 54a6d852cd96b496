//! Optimizer implementations
//!
//! One module per optimization type. Each type implements
//! [`crate::optimizer::Optimize`] to rewrite the step array; batching,
//! caching and decomposition also expose a standalone `plan` entry point.

pub mod batching;
pub mod caching;
pub mod decomposition;
pub mod vibe_to_spec;

// Re-exports
pub use batching::Batching;
pub use caching::Caching;
pub use decomposition::Decomposition;
pub use vibe_to_spec::VibeToSpec;

use crate::types::{Optimization, WorkflowStep};
use std::collections::HashSet;

/// Indices of steps named by `optimization`, in step-array order
pub(crate) fn affected_indices(steps: &[WorkflowStep], optimization: &Optimization) -> Vec<usize> {
    let wanted: HashSet<&str> = optimization.steps_affected.iter().map(String::as_str).collect();
    steps
        .iter()
        .enumerate()
        .filter(|(_, step)| wanted.contains(step.id.as_str()))
        .map(|(index, _)| index)
        .collect()
}

pub(crate) fn prefix_description(step: &mut WorkflowStep, prefix: &str) {
    step.description = format!("{}{}", prefix, step.description);
}
