//! Workflow data model shared by the planners and the optimization engine

use crate::optimizer::OptimizationError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::ops::Deref;

/// Kind of work a step performs.
///
/// Unrecognized strings deserialize to [`StepType::Unknown`] so that
/// validation can reject them with a typed error instead of a parse failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum StepType {
    Vibe,
    Spec,
    DataRetrieval,
    Processing,
    Analysis,
    Unknown,
}

impl StepType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepType::Vibe => "vibe",
            StepType::Spec => "spec",
            StepType::DataRetrieval => "data_retrieval",
            StepType::Processing => "processing",
            StepType::Analysis => "analysis",
            StepType::Unknown => "unknown",
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, StepType::Unknown)
    }
}

impl From<String> for StepType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "vibe" => StepType::Vibe,
            "spec" => StepType::Spec,
            "data_retrieval" => StepType::DataRetrieval,
            "processing" => StepType::Processing,
            "analysis" => StepType::Analysis,
            _ => StepType::Unknown,
        }
    }
}

impl fmt::Display for StepType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single unit of work in a workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowStep {
    /// Unique step identifier
    pub id: String,

    #[serde(rename = "type")]
    pub step_type: StepType,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub inputs: Vec<String>,

    #[serde(default)]
    pub outputs: Vec<String>,

    /// Abstract resource cost of running this step
    pub quota_cost: f64,
}

impl WorkflowStep {
    pub fn new(
        id: impl Into<String>,
        step_type: StepType,
        description: impl Into<String>,
        quota_cost: f64,
    ) -> Self {
        Self {
            id: id.into(),
            step_type,
            description: description.into(),
            inputs: vec![],
            outputs: vec![],
            quota_cost,
        }
    }

    pub fn with_inputs<I, S>(mut self, inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inputs = inputs.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_outputs<I, S>(mut self, outputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.outputs = outputs.into_iter().map(Into::into).collect();
        self
    }
}

/// Directed data edge between two steps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataDependency {
    pub from: String,
    pub to: String,

    #[serde(default)]
    pub data_type: String,

    /// Hard ordering/data constraint
    #[serde(default)]
    pub required: bool,
}

/// A multi-step workflow as produced by the intent parser
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    pub id: String,

    pub steps: Vec<WorkflowStep>,

    #[serde(default)]
    pub data_flow: Vec<DataDependency>,

    #[serde(default)]
    pub estimated_complexity: f64,
}

impl Workflow {
    pub fn new(id: impl Into<String>, steps: Vec<WorkflowStep>) -> Self {
        Self {
            id: id.into(),
            steps,
            data_flow: vec![],
            estimated_complexity: 0.0,
        }
    }

    pub fn with_data_flow(mut self, data_flow: Vec<DataDependency>) -> Self {
        self.data_flow = data_flow;
        self
    }

    pub fn with_complexity(mut self, estimated_complexity: f64) -> Self {
        self.estimated_complexity = estimated_complexity;
        self
    }

    /// Get step by ID
    pub fn get_step(&self, step_id: &str) -> Option<&WorkflowStep> {
        self.steps.iter().find(|step| step.id == step_id)
    }

    pub fn step_ids(&self) -> HashSet<&str> {
        self.steps.iter().map(|step| step.id.as_str()).collect()
    }

    pub fn total_cost(&self) -> f64 {
        total_cost(&self.steps)
    }

    pub fn cost_of_type(&self, step_type: StepType) -> f64 {
        cost_of_type(&self.steps, step_type)
    }

    /// Reject malformed workflows before any optimization logic runs
    pub fn validate(&self) -> Result<(), OptimizationError> {
        if self.id.trim().is_empty() {
            return Err(OptimizationError::validation(
                "Workflow is missing an id",
                "Assign a non-empty id to the workflow before optimizing it",
            ));
        }

        if self.steps.is_empty() {
            return Err(OptimizationError::validation(
                format!("Workflow '{}' has no steps", self.id),
                "Provide at least one step to optimize",
            ));
        }

        let mut seen = HashSet::new();
        for step in &self.steps {
            if step.id.trim().is_empty() {
                return Err(OptimizationError::validation(
                    format!("Workflow '{}' contains a step without an id", self.id),
                    "Give every step a unique, non-empty id",
                ));
            }
            if !seen.insert(step.id.as_str()) {
                return Err(OptimizationError::validation(
                    format!("Duplicate step id '{}'", step.id),
                    "Give every step a unique, non-empty id",
                ));
            }
            if !step.step_type.is_known() {
                return Err(OptimizationError::validation(
                    format!("Step '{}' has an invalid type", step.id),
                    "Use one of: vibe, spec, data_retrieval, processing, analysis",
                ));
            }
            if !step.quota_cost.is_finite() || step.quota_cost < 0.0 {
                return Err(OptimizationError::validation(
                    format!("Step '{}' has invalid quota cost {}", step.id, step.quota_cost),
                    "Quota costs must be finite, non-negative numbers",
                ));
            }
        }

        Ok(())
    }
}

pub(crate) fn total_cost(steps: &[WorkflowStep]) -> f64 {
    steps.iter().map(|step| step.quota_cost).sum()
}

pub(crate) fn cost_of_type(steps: &[WorkflowStep], step_type: StepType) -> f64 {
    steps
        .iter()
        .filter(|step| step.step_type == step_type)
        .map(|step| step.quota_cost)
        .sum()
}

/// Category of an externally reported issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum IssueType {
    RedundantQuery,
    ExcessiveLoops,
    UnnecessaryVibes,
    MissingCache,
    Unknown,
}

impl IssueType {
    /// The single optimization each issue type maps to.
    /// Unknown issue types have none and are dropped.
    pub fn optimization_type(&self) -> Option<OptimizationType> {
        match self {
            IssueType::RedundantQuery => Some(OptimizationType::Caching),
            IssueType::ExcessiveLoops => Some(OptimizationType::Batching),
            IssueType::UnnecessaryVibes => Some(OptimizationType::VibeToSpec),
            IssueType::MissingCache => Some(OptimizationType::Caching),
            IssueType::Unknown => None,
        }
    }
}

impl From<String> for IssueType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "redundant_query" => IssueType::RedundantQuery,
            "excessive_loops" => IssueType::ExcessiveLoops,
            "unnecessary_vibes" => IssueType::UnnecessaryVibes,
            "missing_cache" => IssueType::MissingCache,
            _ => IssueType::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum Severity {
    Low,
    Medium,
    High,
    Unknown,
}

impl Severity {
    pub fn savings_percentage(&self) -> f64 {
        match self {
            Severity::Low => 10.0,
            Severity::Medium => 25.0,
            Severity::High => 50.0,
            Severity::Unknown => 15.0,
        }
    }
}

impl From<String> for Severity {
    fn from(value: String) -> Self {
        match value.as_str() {
            "low" => Severity::Low,
            "medium" => Severity::Medium,
            "high" => Severity::High,
            _ => Severity::Unknown,
        }
    }
}

/// Externally supplied finding about a workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EfficiencyIssue {
    #[serde(rename = "type")]
    pub issue_type: IssueType,

    pub severity: Severity,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub suggested_fix: String,

    #[serde(default)]
    pub steps_affected: Vec<String>,
}

impl EfficiencyIssue {
    pub fn new<I, S>(issue_type: IssueType, severity: Severity, steps_affected: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            issue_type,
            severity,
            description: String::new(),
            suggested_fix: String::new(),
            steps_affected: steps_affected.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationType {
    Batching,
    Caching,
    Decomposition,
    VibeToSpec,
}

impl OptimizationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OptimizationType::Batching => "batching",
            OptimizationType::Caching => "caching",
            OptimizationType::Decomposition => "decomposition",
            OptimizationType::VibeToSpec => "vibe_to_spec",
        }
    }
}

impl fmt::Display for OptimizationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EstimatedSavings {
    pub vibes: f64,
    pub specs: f64,
    /// 0-100
    pub percentage: f64,
}

/// A candidate transformation of the workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Optimization {
    #[serde(rename = "type")]
    pub optimization_type: OptimizationType,

    pub description: String,

    pub steps_affected: Vec<String>,

    pub estimated_savings: EstimatedSavings,
}

/// A cluster of similar steps that can run as one batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchedOperation {
    pub id: String,

    pub original_operations: Vec<String>,

    #[serde(rename = "type")]
    pub step_type: StepType,

    pub description: String,

    pub batch_size: usize,

    /// Percentage, 0-70
    pub estimated_savings: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachePoint {
    pub step_id: String,

    pub cache_key: String,

    /// Seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u64>,

    /// 0.0-0.9
    pub estimated_hit_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedWorkflow {
    #[serde(flatten)]
    pub workflow: Workflow,

    pub cache_points: Vec<CachePoint>,

    /// Mean of the cache-point hit rates, 0 without cache points
    pub estimated_hit_rate: f64,
}

impl Deref for CachedWorkflow {
    type Target = Workflow;

    fn deref(&self) -> &Workflow {
        &self.workflow
    }
}

/// A contiguous slice of a decomposed workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecDefinition {
    pub id: String,
    pub name: String,
    pub description: String,
    pub steps: Vec<String>,
    pub estimated_quota_cost: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EfficiencySavings {
    pub vibe_reduction: f64,
    pub spec_reduction: f64,
    pub cost_savings: f64,
    pub total_savings_percentage: f64,
}

/// Result of [`crate::OptimizerEngine::optimize_workflow`].
///
/// Borrows the caller's workflow as `original_workflow`; all changes live
/// in the owned `workflow`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizedWorkflow<'a> {
    #[serde(flatten)]
    pub workflow: Workflow,

    pub optimizations: Vec<Optimization>,

    pub original_workflow: &'a Workflow,

    pub efficiency_gains: EfficiencySavings,
}

impl Deref for OptimizedWorkflow<'_> {
    type Target = Workflow;

    fn deref(&self) -> &Workflow {
        &self.workflow
    }
}
