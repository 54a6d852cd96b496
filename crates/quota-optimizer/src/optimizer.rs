//! Core optimizer trait and engine

use crate::analysis::{convert_analysis_to_issues, AnalysisSummary};
use crate::ids::{IdGenerator, UuidIds};
use crate::opportunities::identify_optimization_opportunities;
use crate::params::OptimizationParams;
use crate::types::{
    cost_of_type, total_cost, BatchedOperation, CachedWorkflow, EfficiencyIssue,
    EfficiencySavings, EstimatedSavings, Optimization, OptimizationType, OptimizedWorkflow,
    SpecDefinition, StepType, Workflow, WorkflowStep,
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Stage name carried by validation errors
pub const OPTIMIZATION_STAGE: &str = "optimization";

/// Optimization error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OptimizationError {
    /// Malformed input workflow. Recoverable: callers are expected to fall
    /// back to [`fallback_optimization`].
    #[error("Invalid workflow structure ({stage}): {message}")]
    InvalidWorkflow {
        stage: &'static str,
        message: String,
        suggested_action: String,
    },

    #[error("Optimization not applicable: {0}")]
    NotApplicable(String),

    #[error("Step not found: {0}")]
    StepNotFound(String),
}

impl OptimizationError {
    pub fn validation(message: impl Into<String>, suggested_action: impl Into<String>) -> Self {
        OptimizationError::InvalidWorkflow {
            stage: OPTIMIZATION_STAGE,
            message: message.into(),
            suggested_action: suggested_action.into(),
        }
    }

    pub fn is_recoverable(&self) -> bool {
        matches!(self, OptimizationError::InvalidWorkflow { .. })
    }

    pub fn stage(&self) -> &str {
        OPTIMIZATION_STAGE
    }

    pub fn suggested_action(&self) -> Option<&str> {
        match self {
            OptimizationError::InvalidWorkflow { suggested_action, .. } => Some(suggested_action),
            _ => None,
        }
    }
}

/// Minimal optimization for callers that caught a recoverable error:
/// one low-impact caching suggestion over every step.
pub fn fallback_optimization(workflow: &Workflow) -> Optimization {
    Optimization {
        optimization_type: OptimizationType::Caching,
        description: "Cache step results where possible (fallback estimate)".to_string(),
        steps_affected: workflow
            .steps
            .iter()
            .filter(|step| !step.id.trim().is_empty())
            .map(|step| step.id.clone())
            .collect(),
        estimated_savings: EstimatedSavings {
            vibes: 0.0,
            specs: 0.0,
            percentage: 5.0,
        },
    }
}

/// Either a plain issue list or a richer analysis summary.
///
/// Deserializes from a JSON array (issues) or object (analysis).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptimizationInput {
    Issues(Vec<EfficiencyIssue>),
    Analysis(AnalysisSummary),
}

impl Default for OptimizationInput {
    fn default() -> Self {
        OptimizationInput::Issues(vec![])
    }
}

impl From<Vec<EfficiencyIssue>> for OptimizationInput {
    fn from(issues: Vec<EfficiencyIssue>) -> Self {
        OptimizationInput::Issues(issues)
    }
}

impl From<AnalysisSummary> for OptimizationInput {
    fn from(analysis: AnalysisSummary) -> Self {
        OptimizationInput::Analysis(analysis)
    }
}

/// What to do when an optimization names steps that are gone from the
/// working step array (typically removed by an earlier batching merge).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoveragePolicy {
    /// Apply to the remaining steps
    #[default]
    Lenient,
    /// Apply to the remaining steps and log a warning
    Warn,
    /// Skip the optimization
    Strict,
}

impl std::str::FromStr for CoveragePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "lenient" => Ok(CoveragePolicy::Lenient),
            "warn" => Ok(CoveragePolicy::Warn),
            "strict" => Ok(CoveragePolicy::Strict),
            other => Err(format!("Unknown coverage policy: {}", other)),
        }
    }
}

impl fmt::Display for CoveragePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CoveragePolicy::Lenient => "lenient",
            CoveragePolicy::Warn => "warn",
            CoveragePolicy::Strict => "strict",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub coverage_policy: CoveragePolicy,
}

/// One optimization type's way of rewriting the step array
pub trait Optimize: Send + Sync {
    /// Optimization type this strategy realizes
    fn kind(&self) -> OptimizationType;

    /// Apply `optimization` to `steps` in place.
    ///
    /// # Returns
    /// Number of steps rewritten or removed
    fn apply(
        &self,
        steps: &mut Vec<WorkflowStep>,
        optimization: &Optimization,
    ) -> Result<usize, OptimizationError>;

    /// Get unique identifier for this optimizer
    fn id(&self) -> &str;

    /// Get human-readable description
    fn description(&self) -> &str;
}

/// Main optimization engine that coordinates all optimizers
pub struct OptimizerEngine {
    config: EngineConfig,
    optimizers: IndexMap<OptimizationType, Box<dyn Optimize>>,
    ids: Box<dyn IdGenerator>,
}

impl OptimizerEngine {
    /// Create new optimizer engine with all available optimizers
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let mut engine = Self {
            config,
            optimizers: IndexMap::new(),
            ids: Box::new(UuidIds),
        };

        engine.register_all_optimizers();
        engine
    }

    /// Replace the id source used for batch and spec ids
    pub fn with_id_generator(mut self, ids: impl IdGenerator + 'static) -> Self {
        self.ids = Box::new(ids);
        self
    }

    /// Register all available optimizers
    fn register_all_optimizers(&mut self) {
        use crate::optimizers::*;

        self.register(Box::new(Batching::new()));
        self.register(Box::new(Caching::new()));
        self.register(Box::new(VibeToSpec::new()));
        self.register(Box::new(Decomposition::new()));
    }

    /// Register a custom optimizer, replacing any previous one of the same kind
    pub fn register(&mut self, optimizer: Box<dyn Optimize>) {
        self.optimizers.insert(optimizer.kind(), optimizer);
    }

    pub fn get_optimizer(&self, kind: OptimizationType) -> Option<&dyn Optimize> {
        self.optimizers.get(&kind).map(|optimizer| optimizer.as_ref())
    }

    /// Get list of all registered optimizers
    pub fn list_optimizers(&self) -> Vec<(String, String)> {
        self.optimizers
            .values()
            .map(|opt| (opt.id().to_string(), opt.description().to_string()))
            .collect()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Validate, discover opportunities and apply them.
    ///
    /// # Arguments
    /// * `workflow` - The workflow to optimize; borrowed by the result
    /// * `input` - Reported issues or an analysis summary
    /// * `params` - Optional tuning parameters
    pub fn optimize_workflow<'a>(
        &self,
        workflow: &'a Workflow,
        input: &OptimizationInput,
        params: Option<&OptimizationParams>,
    ) -> Result<OptimizedWorkflow<'a>, OptimizationError> {
        workflow.validate()?;

        let converted;
        let issues: &[EfficiencyIssue] = match input {
            OptimizationInput::Issues(issues) => issues,
            OptimizationInput::Analysis(analysis) => {
                converted = convert_analysis_to_issues(analysis, workflow);
                &converted
            }
        };

        let optimizations = self.identify_optimization_opportunities(workflow, issues, params);
        let optimized = self.apply_optimizations(workflow, optimizations);

        info!(
            workflow_id = %workflow.id,
            optimizations = optimized.optimizations.len(),
            steps_before = workflow.steps.len(),
            steps_after = optimized.workflow.steps.len(),
            savings_pct = optimized.efficiency_gains.total_savings_percentage,
            "Workflow optimized"
        );

        Ok(optimized)
    }

    pub fn identify_optimization_opportunities(
        &self,
        workflow: &Workflow,
        issues: &[EfficiencyIssue],
        params: Option<&OptimizationParams>,
    ) -> Vec<Optimization> {
        identify_optimization_opportunities(workflow, issues, params)
    }

    /// Apply each optimization to a clone of the workflow's steps.
    ///
    /// Failures are isolated: a failing optimization is logged and skipped,
    /// the rest still apply.
    pub fn apply_optimizations<'a>(
        &self,
        workflow: &'a Workflow,
        optimizations: Vec<Optimization>,
    ) -> OptimizedWorkflow<'a> {
        let mut steps = workflow.steps.clone();

        for optimization in &optimizations {
            match self.apply_one(&mut steps, optimization) {
                Ok(touched) => debug!(
                    kind = %optimization.optimization_type,
                    touched,
                    "Applied optimization"
                ),
                Err(e) => warn!(
                    kind = %optimization.optimization_type,
                    error = %e,
                    "Skipping optimization"
                ),
            }
        }

        let efficiency_gains = calculate_efficiency_gains(&workflow.steps, &steps);

        OptimizedWorkflow {
            workflow: Workflow {
                id: workflow.id.clone(),
                steps,
                data_flow: workflow.data_flow.clone(),
                estimated_complexity: (workflow.estimated_complexity - 1.0).max(1.0),
            },
            optimizations,
            original_workflow: workflow,
            efficiency_gains,
        }
    }

    fn apply_one(
        &self,
        steps: &mut Vec<WorkflowStep>,
        optimization: &Optimization,
    ) -> Result<usize, OptimizationError> {
        let optimizer = self.get_optimizer(optimization.optimization_type).ok_or_else(|| {
            OptimizationError::NotApplicable(format!(
                "no optimizer registered for {}",
                optimization.optimization_type
            ))
        })?;

        self.check_coverage(steps, optimization)?;
        optimizer.apply(steps, optimization)
    }

    fn check_coverage(
        &self,
        steps: &[WorkflowStep],
        optimization: &Optimization,
    ) -> Result<(), OptimizationError> {
        let present: HashSet<&str> = steps.iter().map(|step| step.id.as_str()).collect();
        let missing: Vec<&str> = optimization
            .steps_affected
            .iter()
            .map(String::as_str)
            .filter(|id| !present.contains(id))
            .collect();

        if missing.is_empty() {
            return Ok(());
        }

        match self.config.coverage_policy {
            CoveragePolicy::Lenient => {
                debug!(kind = %optimization.optimization_type, ?missing, "Applying to remaining steps");
                Ok(())
            }
            CoveragePolicy::Warn => {
                warn!(
                    kind = %optimization.optimization_type,
                    ?missing,
                    "Optimization only partially applies"
                );
                Ok(())
            }
            CoveragePolicy::Strict => Err(OptimizationError::StepNotFound(missing.join(", "))),
        }
    }

    /// Group batchable steps (standalone planner)
    pub fn apply_batching_strategy(&self, workflow: &Workflow) -> Vec<BatchedOperation> {
        crate::optimizers::Batching::new().plan(workflow, self.ids.as_ref())
    }

    /// Mark cacheable steps (standalone planner)
    pub fn implement_caching_layer(&self, workflow: &Workflow) -> CachedWorkflow {
        crate::optimizers::Caching::new().plan(workflow)
    }

    /// Split a workflow into named sub-specs (standalone planner)
    pub fn break_into_specs(&self, workflow: &Workflow) -> Vec<SpecDefinition> {
        crate::optimizers::Decomposition::new().plan(workflow, self.ids.as_ref())
    }
}

impl Default for OptimizerEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Compare original and optimized step costs
pub fn calculate_efficiency_gains(
    original: &[WorkflowStep],
    optimized: &[WorkflowStep],
) -> EfficiencySavings {
    let reduction = |before: f64, after: f64| {
        if before > 0.0 {
            (before - after) / before * 100.0
        } else {
            0.0
        }
    };

    let original_total = total_cost(original);
    let cost_savings = original_total - total_cost(optimized);

    EfficiencySavings {
        vibe_reduction: reduction(
            cost_of_type(original, StepType::Vibe),
            cost_of_type(optimized, StepType::Vibe),
        ),
        spec_reduction: reduction(
            cost_of_type(original, StepType::Spec),
            cost_of_type(optimized, StepType::Spec),
        ),
        cost_savings,
        total_savings_percentage: if original_total > 0.0 {
            (cost_savings / original_total * 100.0).round()
        } else {
            0.0
        },
    }
}

// Float noise (e.g. 0.1 * 3) must not push a value over an integer edge.
const ROUNDING_EPSILON: f64 = 1e-9;

pub(crate) fn ceil_tolerant(value: f64) -> f64 {
    (value - ROUNDING_EPSILON).ceil()
}

pub(crate) fn floor_tolerant(value: f64) -> f64 {
    (value + ROUNDING_EPSILON).floor()
}

/// `ceil(cost * factor)`, clamped to `[0, cost]`
pub(crate) fn reduced_cost(cost: f64, factor: f64) -> f64 {
    ceil_tolerant(cost * factor).clamp(0.0, cost.max(0.0))
}
