//! Caching Optimizer
//!
//! **Purpose**: Detect deterministic steps whose results can be reused.
//!
//! # Detection Patterns
//! - Step type is `vibe`, `data_retrieval` or `analysis`
//! - Description names a retrieval, computation or validation operation
//!
//! # Hit-rate model
//! ```text
//! 0.3 base
//! + min(0.5, (frequency - 1) * 0.1)   steps sharing the cache key
//! + 0.2 for data_retrieval
//! + 0.1 for two inputs or fewer
//! capped at 0.9
//! ```

use super::{affected_indices, prefix_description};
use crate::optimizer::{reduced_cost, Optimize, OptimizationError};
use crate::rules::{deterministic_operation, operation_pattern};
use crate::types::{CachePoint, CachedWorkflow, Optimization, OptimizationType, StepType, Workflow, WorkflowStep};
use indexmap::IndexMap;
use tracing::debug;

pub const MAX_HIT_RATE: f64 = 0.9;

/// Cost retained by a cached step (60% reduction)
const CACHED_COST_FACTOR: f64 = 0.4;

pub struct Caching;

impl Caching {
    pub fn new() -> Self {
        Self
    }

    pub fn is_cacheable(step: &WorkflowStep) -> bool {
        matches!(
            step.step_type,
            StepType::Vibe | StepType::DataRetrieval | StepType::Analysis
        ) && deterministic_operation(&step.description).is_some()
    }

    pub fn cache_key(step: &WorkflowStep) -> String {
        let mut inputs: Vec<&str> = step.inputs.iter().map(String::as_str).collect();
        inputs.sort_unstable();
        format!(
            "{}:{}:{}",
            step.step_type,
            operation_pattern(&step.description),
            inputs.join(",")
        )
    }

    pub fn hit_rate(step: &WorkflowStep, frequency: usize) -> f64 {
        let mut rate = 0.3 + (frequency.saturating_sub(1) as f64 * 0.1).min(0.5);
        if step.step_type == StepType::DataRetrieval {
            rate += 0.2;
        }
        if step.inputs.len() <= 2 {
            rate += 0.1;
        }
        (rate.min(MAX_HIT_RATE) * 100.0).round() / 100.0
    }

    /// Time-to-live in seconds
    pub fn ttl(step: &WorkflowStep) -> Option<u64> {
        match step.step_type {
            StepType::DataRetrieval if step.description.to_lowercase().contains("config") => Some(3600),
            StepType::DataRetrieval => Some(1800),
            StepType::Vibe => Some(900),
            StepType::Analysis => Some(1800),
            _ => None,
        }
    }

    /// Cache points for every cacheable step, plus the mean hit rate
    pub fn plan(&self, workflow: &Workflow) -> CachedWorkflow {
        let cacheable: Vec<(&WorkflowStep, String)> = workflow
            .steps
            .iter()
            .filter(|step| Self::is_cacheable(step))
            .map(|step| (step, Self::cache_key(step)))
            .collect();

        let mut frequency: IndexMap<&str, usize> = IndexMap::new();
        for (_, key) in &cacheable {
            *frequency.entry(key.as_str()).or_insert(0) += 1;
        }

        let cache_points: Vec<CachePoint> = cacheable
            .iter()
            .map(|(step, key)| CachePoint {
                step_id: step.id.clone(),
                cache_key: key.clone(),
                ttl: Self::ttl(step),
                estimated_hit_rate: Self::hit_rate(step, frequency[key.as_str()]),
            })
            .collect();

        let estimated_hit_rate = if cache_points.is_empty() {
            0.0
        } else {
            cache_points.iter().map(|point| point.estimated_hit_rate).sum::<f64>()
                / cache_points.len() as f64
        };

        debug!(
            workflow_id = %workflow.id,
            cache_points = cache_points.len(),
            estimated_hit_rate,
            "Cache plan built"
        );

        CachedWorkflow {
            workflow: workflow.clone(),
            cache_points,
            estimated_hit_rate,
        }
    }
}

impl Optimize for Caching {
    fn kind(&self) -> OptimizationType {
        OptimizationType::Caching
    }

    fn apply(
        &self,
        steps: &mut Vec<WorkflowStep>,
        optimization: &Optimization,
    ) -> Result<usize, OptimizationError> {
        let indices = affected_indices(steps, optimization);
        if indices.is_empty() {
            return Err(OptimizationError::NotApplicable(
                "none of the affected steps remain".to_string(),
            ));
        }

        for &i in &indices {
            steps[i].quota_cost = reduced_cost(steps[i].quota_cost, CACHED_COST_FACTOR);
            prefix_description(&mut steps[i], "Cached: ");
        }

        Ok(indices.len())
    }

    fn id(&self) -> &str {
        "caching"
    }

    fn description(&self) -> &str {
        "Reuses results of deterministic steps (60% cost reduction)"
    }
}

impl Default for Caching {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EstimatedSavings;

    fn step(id: &str, step_type: StepType, description: &str) -> WorkflowStep {
        WorkflowStep::new(id, step_type, description, 10.0)
    }

    #[test]
    fn test_cacheability_needs_type_and_operation() {
        assert!(Caching::is_cacheable(&step("a", StepType::DataRetrieval, "Fetch orders")));
        assert!(Caching::is_cacheable(&step("b", StepType::Analysis, "Calculate churn")));
        assert!(Caching::is_cacheable(&step("c", StepType::Vibe, "Check tone")));
        assert!(!Caching::is_cacheable(&step("d", StepType::Vibe, "Write a story")));
        assert!(!Caching::is_cacheable(&step("e", StepType::Spec, "Fetch orders")));
        assert!(!Caching::is_cacheable(&step("f", StepType::Processing, "Process orders")));
    }

    #[test]
    fn test_cache_key_sorts_inputs() {
        let s = step("a", StepType::DataRetrieval, "Fetch order 42").with_inputs(["zone", "customerId"]);
        assert_eq!(Caching::cache_key(&s), "data_retrieval:fetch order N:customerId,zone");
    }

    #[test]
    fn test_hit_rates_and_ttl() {
        let plan = Caching::new().plan(&Workflow::new(
            "wf",
            vec![
                step("a", StepType::DataRetrieval, "Fetch config 1").with_inputs(["env"]),
                step("b", StepType::DataRetrieval, "Fetch config 2").with_inputs(["env"]),
                step("c", StepType::Analysis, "Analyze usage").with_inputs(["a", "b", "c"]),
                step("d", StepType::Vibe, "Verify wording"),
                step("e", StepType::Vibe, "Compose poem"),
            ],
        ));

        assert_eq!(plan.cache_points.len(), 4);
        let a = &plan.cache_points[0];
        // 0.3 + 0.1 (frequency 2) + 0.2 (retrieval) + 0.1 (few inputs)
        assert_eq!(a.estimated_hit_rate, 0.7);
        assert_eq!(a.ttl, Some(3600));
        assert_eq!(plan.cache_points[2].estimated_hit_rate, 0.3);
        assert_eq!(plan.cache_points[2].ttl, Some(1800));
        assert_eq!(plan.cache_points[3].estimated_hit_rate, 0.4);
        assert_eq!(plan.cache_points[3].ttl, Some(900));
        assert!((plan.estimated_hit_rate - 0.525).abs() < 1e-9);
        assert_eq!(plan.id, "wf");
    }

    #[test]
    fn test_hit_rate_is_capped() {
        let s = step("a", StepType::DataRetrieval, "Fetch rows");
        assert_eq!(Caching::hit_rate(&s, 20), MAX_HIT_RATE);
    }

    #[test]
    fn test_empty_plan_has_zero_hit_rate() {
        let plan = Caching::new().plan(&Workflow::new("wf", vec![step("a", StepType::Spec, "Render")]));
        assert!(plan.cache_points.is_empty());
        assert_eq!(plan.estimated_hit_rate, 0.0);
    }

    #[test]
    fn test_apply_reduces_cost() {
        let mut steps = vec![step("a", StepType::DataRetrieval, "Fetch rows")];
        let optimization = Optimization {
            optimization_type: OptimizationType::Caching,
            description: "cache".into(),
            steps_affected: vec!["a".into()],
            estimated_savings: EstimatedSavings::default(),
        };

        Caching::new().apply(&mut steps, &optimization).unwrap();
        assert_eq!(steps[0].quota_cost, 4.0);
        assert_eq!(steps[0].description, "Cached: Fetch rows");
    }
}
