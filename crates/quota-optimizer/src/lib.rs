//! Quota Optimizer
//!
//! Cost-reduction engine for AI workflows. Given a workflow of typed steps
//! with quota costs, it finds and applies four optimizations:
//! - **Batching**: merge similar steps into one
//! - **Caching**: reuse results of deterministic steps
//! - **Vibe to spec**: replace unstructured vibe steps with template-driven specs
//! - **Decomposition**: split large workflows into smaller named specs
//!
//! Everything is synchronous and pure; the caller's workflow is never
//! mutated.
//!
//! # Example
//! ```rust
//! use quota_optimizer::{OptimizerEngine, Workflow, WorkflowStep, StepType};
//! use quota_optimizer::{EfficiencyIssue, IssueType, Severity};
//!
//! let workflow = Workflow::new(
//!     "onboarding",
//!     vec![WorkflowStep::new("welcome", StepType::Vibe, "Write welcome email", 10.0)],
//! );
//! let issues = vec![EfficiencyIssue::new(IssueType::UnnecessaryVibes, Severity::High, ["welcome"])];
//!
//! let engine = OptimizerEngine::new();
//! let optimized = engine.optimize_workflow(&workflow, &issues.into(), None).unwrap();
//! assert_eq!(optimized.efficiency_gains.total_savings_percentage, 70.0);
//! ```
//!
//! # Example (Browser, feature `wasm`)
//! ```javascript
//! import init, { optimize_workflow } from './quota_optimizer.js';
//!
//! await init();
//! const result = optimize_workflow(JSON.stringify(workflow), JSON.stringify(issues));
//! console.log(JSON.parse(result).efficiencyGains);
//! ```

// Module declarations
pub mod analysis;
pub mod ids;
pub mod opportunities;
pub mod optimizer;
pub mod optimizers;
pub mod params;
pub mod patterns;
pub mod rules;
pub mod types;

#[cfg(feature = "wasm")]
pub mod wasm;

// Re-exports for convenience
pub use analysis::{convert_analysis_to_issues, AnalysisSummary};
pub use ids::{IdGenerator, SequentialIds, UuidIds};
pub use opportunities::consolidate_optimizations;
pub use optimizer::{
    calculate_efficiency_gains, fallback_optimization, CoveragePolicy, EngineConfig, Optimize,
    OptimizationError, OptimizationInput, OptimizerEngine,
};
pub use params::{CostConstraints, OptimizationParams, PerformanceSensitivity};
pub use patterns::StepPatterns;
pub use types::{
    BatchedOperation, CachePoint, CachedWorkflow, DataDependency, EfficiencyIssue,
    EfficiencySavings, EstimatedSavings, IssueType, Optimization, OptimizationType,
    OptimizedWorkflow, Severity, SpecDefinition, StepType, Workflow, WorkflowStep,
};

/// [`OptimizerEngine::optimize_workflow`] on a default engine
pub fn optimize_workflow<'a>(
    workflow: &'a Workflow,
    input: &OptimizationInput,
    params: Option<&OptimizationParams>,
) -> Result<OptimizedWorkflow<'a>, OptimizationError> {
    OptimizerEngine::new().optimize_workflow(workflow, input, params)
}

pub fn identify_optimization_opportunities(
    workflow: &Workflow,
    issues: &[EfficiencyIssue],
    params: Option<&OptimizationParams>,
) -> Vec<Optimization> {
    opportunities::identify_optimization_opportunities(workflow, issues, params)
}

pub fn apply_batching_strategy(workflow: &Workflow) -> Vec<BatchedOperation> {
    OptimizerEngine::new().apply_batching_strategy(workflow)
}

pub fn implement_caching_layer(workflow: &Workflow) -> CachedWorkflow {
    OptimizerEngine::new().implement_caching_layer(workflow)
}

pub fn break_into_specs(workflow: &Workflow) -> Vec<SpecDefinition> {
    OptimizerEngine::new().break_into_specs(workflow)
}
