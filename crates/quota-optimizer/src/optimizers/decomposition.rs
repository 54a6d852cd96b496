//! Spec Decomposer
//!
//! **Purpose**: Split an oversized workflow into smaller named specs at
//! natural structural boundaries.
//!
//! # Breaking points
//! Between two consecutive steps a boundary exists when any holds:
//! - the step types differ
//! - either step costs 15 or more
//! - both steps have a functional category and the categories differ
//! - no required data-flow edge joins them and the first step's outputs
//!   feed at most one of the second step's inputs
//!
//! # Example
//! ```text
//! fetch → fetch → validate → validate → render → render
//! → [Data Retrieval Spec 1] [Validation Spec 2] [Presentation Spec 3]
//! ```
//!
//! Every call partitions the step list exactly: specs are contiguous,
//! ordered and non-overlapping.

use crate::ids::IdGenerator;
use crate::optimizer::{Optimize, OptimizationError};
use crate::rules::{functional_category, FUNCTIONAL_CATEGORIES};
use crate::types::{total_cost, Optimization, OptimizationType, SpecDefinition, Workflow, WorkflowStep};
use petgraph::graphmap::DiGraphMap;
use std::collections::HashSet;
use tracing::debug;

/// Workflows this small are never decomposed
pub const MAX_UNSPLIT_STEPS: usize = 3;
pub const MIN_SPEC_SIZE: usize = 2;
pub const MAX_SPEC_SIZE: usize = 8;

/// Step cost that always marks a boundary
pub const COST_BOUNDARY: f64 = 15.0;

/// Smallest workflow the midpoint fallback will split
const FORCED_SPLIT_MIN_STEPS: usize = 4;

/// Data-flow edges keyed by step id; weight is `required`
pub struct DataFlowGraph<'a> {
    graph: DiGraphMap<&'a str, bool>,
}

impl<'a> DataFlowGraph<'a> {
    pub fn new(workflow: &'a Workflow) -> Self {
        let mut graph = DiGraphMap::new();
        for step in &workflow.steps {
            graph.add_node(step.id.as_str());
        }

        for edge in &workflow.data_flow {
            let (from, to) = (edge.from.as_str(), edge.to.as_str());
            // parallel edges collapse; any required one wins
            let required = edge.required || graph.edge_weight(from, to).copied().unwrap_or(false);
            graph.add_edge(from, to, required);
        }

        Self { graph }
    }

    /// Whether a required edge joins `a` and `b` in either direction
    pub fn required_between(&self, a: &str, b: &str) -> bool {
        self.graph.edge_weight(a, b).copied().unwrap_or(false)
            || self.graph.edge_weight(b, a).copied().unwrap_or(false)
    }
}

pub struct Decomposition;

impl Decomposition {
    pub fn new() -> Self {
        Self
    }

    /// Split `workflow` into specs; empty for workflows of three steps or fewer
    pub fn plan(&self, workflow: &Workflow, ids: &dyn IdGenerator) -> Vec<SpecDefinition> {
        let len = workflow.steps.len();
        if len <= MAX_UNSPLIT_STEPS {
            return vec![];
        }

        let graph = DataFlowGraph::new(workflow);
        let detected = Self::find_breaking_points(&workflow.steps, &graph);
        let points = Self::filter_breaking_points(&detected, len);

        let mut specs = if points.is_empty() {
            vec![]
        } else {
            Self::build_specs(&workflow.steps, &points, ids)
        };

        if specs.is_empty() && len >= FORCED_SPLIT_MIN_STEPS {
            debug!(workflow_id = %workflow.id, "No usable breaking points, splitting at midpoint");
            specs = Self::build_specs(&workflow.steps, &[len / 2], ids);
        }

        debug!(
            workflow_id = %workflow.id,
            detected = detected.len(),
            kept = points.len(),
            specs = specs.len(),
            "Decomposition planned"
        );
        specs
    }

    /// Indices `i` such that a boundary lies between steps `i - 1` and `i`
    pub fn find_breaking_points(steps: &[WorkflowStep], graph: &DataFlowGraph<'_>) -> Vec<usize> {
        steps
            .windows(2)
            .enumerate()
            .filter(|(_, pair)| Self::is_boundary(&pair[0], &pair[1], graph))
            .map(|(i, _)| i + 1)
            .collect()
    }

    fn is_boundary(a: &WorkflowStep, b: &WorkflowStep, graph: &DataFlowGraph<'_>) -> bool {
        if a.step_type != b.step_type {
            return true;
        }

        if a.quota_cost >= COST_BOUNDARY || b.quota_cost >= COST_BOUNDARY {
            return true;
        }

        if let (Some(x), Some(y)) = (functional_category(&a.description), functional_category(&b.description)) {
            if x != y {
                return true;
            }
        }

        let produced: HashSet<&str> = a.outputs.iter().map(String::as_str).collect();
        let overlap = b.inputs.iter().filter(|input| produced.contains(input.as_str())).count();

        !graph.required_between(&a.id, &b.id) && overlap <= 1
    }

    /// Enforce the 2..=8 spec size window on detected breaking points
    pub fn filter_breaking_points(detected: &[usize], len: usize) -> Vec<usize> {
        if detected.is_empty() {
            if len <= MAX_SPEC_SIZE {
                return vec![];
            }

            let mut points = vec![];
            let mut last = 0;
            let mut candidate = MAX_SPEC_SIZE;
            while candidate < len {
                let point = candidate.min(len - MIN_SPEC_SIZE);
                if point >= last + MIN_SPEC_SIZE {
                    points.push(point);
                    last = point;
                }
                candidate += MAX_SPEC_SIZE;
            }
            return points;
        }

        let mut kept = vec![];
        let mut last = 0;
        for &point in detected {
            if point >= last + MIN_SPEC_SIZE {
                kept.push(point);
                last = point;
            }
        }

        if let Some(&tail) = kept.last() {
            if len - tail < MIN_SPEC_SIZE {
                kept.pop();
            }
        }

        kept
    }

    fn build_specs(steps: &[WorkflowStep], points: &[usize], ids: &dyn IdGenerator) -> Vec<SpecDefinition> {
        let bounds: Vec<usize> = std::iter::once(0)
            .chain(points.iter().copied())
            .chain(std::iter::once(steps.len()))
            .collect();

        bounds
            .windows(2)
            .map(|w| &steps[w[0]..w[1]])
            .filter(|slice| !slice.is_empty())
            .enumerate()
            .map(|(n, slice)| {
                let primary = Self::primary_function(slice);
                let cost = total_cost(slice);
                SpecDefinition {
                    id: ids.next_id("spec"),
                    name: format!("{} Spec {}", primary, n + 1),
                    description: format!(
                        "{} work from '{}' to '{}' ({} steps, quota cost {})",
                        primary,
                        slice[0].id,
                        slice[slice.len() - 1].id,
                        slice.len(),
                        cost
                    ),
                    steps: slice.iter().map(|step| step.id.clone()).collect(),
                    estimated_quota_cost: cost,
                }
            })
            .collect()
    }

    /// Functional category matched by the most steps; ties go to the
    /// earlier rule, no match at all is "General"
    pub fn primary_function(steps: &[WorkflowStep]) -> &'static str {
        let mut best: Option<(&'static str, usize)> = None;
        for rule in FUNCTIONAL_CATEGORIES {
            let count = steps
                .iter()
                .filter(|step| functional_category(&step.description) == Some(rule.label))
                .count();
            if count > 0 && best.map_or(true, |(_, top)| count > top) {
                best = Some((rule.label.label(), count));
            }
        }
        best.map_or("General", |(label, _)| label)
    }
}

impl Optimize for Decomposition {
    fn kind(&self) -> OptimizationType {
        OptimizationType::Decomposition
    }

    /// Recorded only; structural splitting goes through [`Decomposition::plan`]
    fn apply(
        &self,
        _steps: &mut Vec<WorkflowStep>,
        _optimization: &Optimization,
    ) -> Result<usize, OptimizationError> {
        Ok(0)
    }

    fn id(&self) -> &str {
        "decomposition"
    }

    fn description(&self) -> &str {
        "Splits large workflows into smaller specs at natural boundaries"
    }
}

impl Default for Decomposition {
    fn default() -> Self {
        Self::new()
    }
}
