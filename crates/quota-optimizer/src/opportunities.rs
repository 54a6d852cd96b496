//! Opportunity Identifier
//!
//! **Purpose**: Turn reported issues and structural patterns into a
//! consolidated list of candidate optimizations.
//!
//! # Pipeline
//! 1. One optimization per recognized issue (issue type → optimization type)
//! 2. Pattern-driven optimizations: decomposition of large workflows,
//!    batching of similar steps, caching of repeated steps
//! 3. Consolidation of same-type optimizations sharing steps
//! 4. Optional parameter adjustment
//!
//! Consolidation depends on generation order (issues first, then patterns).

use crate::optimizer::{ceil_tolerant, floor_tolerant};
use crate::params::OptimizationParams;
use crate::patterns::{group_cost, group_ids, StepPatterns};
use crate::types::{EfficiencyIssue, EstimatedSavings, Optimization, OptimizationType, StepType, Workflow};
use std::collections::HashSet;
use tracing::{debug, warn};

pub const DECOMPOSITION_MIN_STEPS: usize = 10;
pub const DECOMPOSITION_MIN_COST: f64 = 100.0;
pub const SIMILAR_BATCH_MIN: usize = 3;
pub const REPEATED_CACHE_MIN: usize = 2;

pub fn identify_optimization_opportunities(
    workflow: &Workflow,
    issues: &[EfficiencyIssue],
    params: Option<&OptimizationParams>,
) -> Vec<Optimization> {
    let mut optimizations: Vec<Optimization> = issues
        .iter()
        .filter_map(|issue| issue_optimization(workflow, issue))
        .collect();
    let from_issues = optimizations.len();

    let patterns = StepPatterns::analyze(workflow);
    optimizations.extend(pattern_optimizations(workflow, &patterns));

    let generated = optimizations.len();
    let consolidated = consolidate_optimizations(optimizations);

    debug!(
        workflow_id = %workflow.id,
        from_issues,
        from_patterns = generated - from_issues,
        similar_groups = patterns.similar_operations.len(),
        repeated_groups = patterns.repeated_operations.len(),
        consolidated = consolidated.len(),
        "Identified optimization opportunities"
    );

    match params {
        Some(params) => params.adjust(workflow, consolidated),
        None => consolidated,
    }
}

/// Optimization for a single issue; `None` for unknown types or issues
/// naming no step of the workflow
pub fn issue_optimization(workflow: &Workflow, issue: &EfficiencyIssue) -> Option<Optimization> {
    let Some(kind) = issue.issue_type.optimization_type() else {
        debug!(description = %issue.description, "Dropping issue of unknown type");
        return None;
    };

    let mut seen = HashSet::new();
    let mut steps = Vec::new();
    let mut unknown = Vec::new();
    for id in &issue.steps_affected {
        match workflow.get_step(id) {
            Some(step) if seen.insert(id.as_str()) => steps.push(step),
            Some(_) => {}
            None => unknown.push(id.as_str()),
        }
    }

    if !unknown.is_empty() {
        warn!(workflow_id = %workflow.id, kind = %kind, ?unknown, "Issue names unknown steps");
    }
    if steps.is_empty() {
        return None;
    }

    let vibes: f64 = steps
        .iter()
        .filter(|step| step.step_type == StepType::Vibe)
        .map(|step| step.quota_cost)
        .sum();
    let specs = match kind {
        OptimizationType::VibeToSpec => ceil_tolerant(steps.len() as f64 / 3.0),
        _ => 0.0,
    };

    let description = if issue.suggested_fix.trim().is_empty() {
        issue.description.clone()
    } else {
        issue.suggested_fix.clone()
    };

    Some(Optimization {
        optimization_type: kind,
        description,
        steps_affected: steps.iter().map(|step| step.id.clone()).collect(),
        estimated_savings: EstimatedSavings {
            vibes,
            specs,
            percentage: issue.severity.savings_percentage(),
        },
    })
}

/// Optimizations implied by the workflow's own structure
pub fn pattern_optimizations(workflow: &Workflow, patterns: &StepPatterns<'_>) -> Vec<Optimization> {
    let mut optimizations = Vec::new();

    if patterns.step_count >= DECOMPOSITION_MIN_STEPS && patterns.total_quota_cost > DECOMPOSITION_MIN_COST {
        optimizations.push(Optimization {
            optimization_type: OptimizationType::Decomposition,
            description: format!(
                "Split {} steps (quota cost {}) into smaller specs",
                patterns.step_count, patterns.total_quota_cost
            ),
            steps_affected: workflow.steps.iter().map(|step| step.id.clone()).collect(),
            estimated_savings: EstimatedSavings {
                vibes: floor_tolerant(patterns.total_quota_cost * 0.15),
                specs: ceil_tolerant(patterns.step_count as f64 / 5.0),
                percentage: 15.0,
            },
        });
    }

    for group in patterns
        .similar_operations
        .iter()
        .filter(|group| group.len() >= SIMILAR_BATCH_MIN)
    {
        optimizations.push(Optimization {
            optimization_type: OptimizationType::Batching,
            description: format!("Batch {} similar {} steps", group.len(), group[0].step_type),
            steps_affected: group_ids(group),
            estimated_savings: EstimatedSavings {
                vibes: floor_tolerant(group_cost(group) * 0.4),
                specs: 0.0,
                percentage: 40.0,
            },
        });
    }

    for group in patterns
        .repeated_operations
        .iter()
        .filter(|group| group.len() >= REPEATED_CACHE_MIN)
    {
        optimizations.push(Optimization {
            optimization_type: OptimizationType::Caching,
            description: format!("Cache {} repeated '{}' steps", group.len(), group[0].description),
            steps_affected: group_ids(group),
            estimated_savings: EstimatedSavings {
                vibes: floor_tolerant(group_cost(group) * 0.6),
                specs: 0.0,
                percentage: 60.0,
            },
        });
    }

    optimizations
}

fn processed_key(optimization: &Optimization) -> String {
    let mut ids: Vec<&str> = optimization.steps_affected.iter().map(String::as_str).collect();
    ids.sort_unstable();
    format!("{}:{}", optimization.optimization_type, ids.join(","))
}

fn shares_step(a: &Optimization, b: &Optimization) -> bool {
    a.steps_affected.iter().any(|id| b.steps_affected.contains(id))
}

/// Merge same-type optimizations whose step sets intersect.
///
/// Single pass, not transitive: each unprocessed optimization gathers every
/// same-type optimization overlapping it, including ones already merged
/// into an earlier group.
pub fn consolidate_optimizations(optimizations: Vec<Optimization>) -> Vec<Optimization> {
    let mut processed: HashSet<String> = HashSet::new();
    let mut consolidated = Vec::new();

    for optimization in &optimizations {
        if processed.contains(&processed_key(optimization)) {
            continue;
        }

        let members: Vec<&Optimization> = optimizations
            .iter()
            .filter(|other| {
                other.optimization_type == optimization.optimization_type && shares_step(optimization, other)
            })
            .collect();

        let mut merged = optimization.clone();
        merged.estimated_savings = EstimatedSavings::default();
        let mut seen: HashSet<&str> = HashSet::new();
        merged.steps_affected.clear();

        for member in &members {
            processed.insert(processed_key(member));
            for id in &member.steps_affected {
                if seen.insert(id.as_str()) {
                    merged.steps_affected.push(id.clone());
                }
            }
            let savings = &mut merged.estimated_savings;
            savings.vibes += member.estimated_savings.vibes;
            savings.specs += member.estimated_savings.specs;
            savings.percentage = savings.percentage.max(member.estimated_savings.percentage);
        }

        consolidated.push(merged);
    }

    consolidated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{IssueType, Severity, WorkflowStep};

    fn step(id: &str, step_type: StepType, description: &str, cost: f64) -> WorkflowStep {
        WorkflowStep::new(id, step_type, description, cost)
    }

    fn optimization(kind: OptimizationType, steps: &[&str], vibes: f64, percentage: f64) -> Optimization {
        Optimization {
            optimization_type: kind,
            description: format!("{} over {}", kind, steps.join("+")),
            steps_affected: steps.iter().map(|s| s.to_string()).collect(),
            estimated_savings: EstimatedSavings { vibes, specs: 0.0, percentage },
        }
    }

    #[test]
    fn test_issue_mapping() {
        let workflow = Workflow::new(
            "wf",
            vec![
                step("a", StepType::Vibe, "Draft", 10.0),
                step("b", StepType::Vibe, "Polish", 5.0),
                step("c", StepType::DataRetrieval, "Fetch", 2.0),
                step("d", StepType::Vibe, "Review", 1.0),
            ],
        );

        let mut vibes = EfficiencyIssue::new(IssueType::UnnecessaryVibes, Severity::High, ["a", "b", "c", "d", "ghost"]);
        vibes.description = "Too many vibes".into();
        let mut query = EfficiencyIssue::new(IssueType::RedundantQuery, Severity::Unknown, ["c"]);
        query.suggested_fix = "Cache the fetch".into();
        let unknown = EfficiencyIssue::new(IssueType::Unknown, Severity::Low, ["a"]);
        let orphan = EfficiencyIssue::new(IssueType::MissingCache, Severity::Low, ["ghost"]);

        let found = identify_optimization_opportunities(&workflow, &[vibes, query, unknown, orphan], None);
        assert_eq!(found.len(), 2);

        assert_eq!(found[0].optimization_type, OptimizationType::VibeToSpec);
        assert_eq!(found[0].description, "Too many vibes");
        assert_eq!(found[0].steps_affected, vec!["a", "b", "c", "d"]);
        assert_eq!(found[0].estimated_savings.vibes, 16.0);
        assert_eq!(found[0].estimated_savings.specs, 2.0);
        assert_eq!(found[0].estimated_savings.percentage, 50.0);

        assert_eq!(found[1].optimization_type, OptimizationType::Caching);
        assert_eq!(found[1].description, "Cache the fetch");
        assert_eq!(found[1].estimated_savings.percentage, 15.0);
        assert_eq!(found[1].estimated_savings.vibes, 0.0);
    }

    #[test]
    fn test_pattern_driven_batching_and_caching() {
        let workflow = Workflow::new(
            "wf",
            vec![
                step("a", StepType::Vibe, "Summarize support ticket 1", 5.0),
                step("b", StepType::Vibe, "Summarize support ticket 2", 5.0),
                step("c", StepType::Vibe, "Summarize support ticket 3", 5.0),
                step("d", StepType::DataRetrieval, "Fetch config", 3.0),
                step("e", StepType::DataRetrieval, "Fetch config", 3.0),
            ],
        );

        let found = identify_optimization_opportunities(&workflow, &[], None);
        assert_eq!(found.len(), 2);

        assert_eq!(found[0].optimization_type, OptimizationType::Batching);
        assert_eq!(found[0].steps_affected, vec!["a", "b", "c"]);
        assert_eq!(found[0].estimated_savings.vibes, 6.0);
        assert_eq!(found[0].estimated_savings.percentage, 40.0);

        // d and e are also "similar" but a pair is too small to batch
        assert_eq!(found[1].optimization_type, OptimizationType::Caching);
        assert_eq!(found[1].steps_affected, vec!["d", "e"]);
        assert_eq!(found[1].estimated_savings.vibes, 3.0);
        assert_eq!(found[1].estimated_savings.percentage, 60.0);
    }

    #[test]
    fn test_decomposition_threshold() {
        let steps = |n: usize, cost: f64| -> Workflow {
            Workflow::new(
                "wf",
                (0..n)
                    .map(|i| {
                        let kind = if i % 2 == 0 { StepType::Vibe } else { StepType::Spec };
                        step(&format!("s{}", i), kind, &format!("Unique task {}", i), cost)
                    })
                    .collect(),
            )
        };

        let found = identify_optimization_opportunities(&steps(10, 12.0), &[], None);
        let decomposition = found
            .iter()
            .find(|o| o.optimization_type == OptimizationType::Decomposition)
            .unwrap();
        assert_eq!(decomposition.steps_affected.len(), 10);
        assert_eq!(decomposition.estimated_savings.percentage, 15.0);
        assert_eq!(decomposition.estimated_savings.vibes, 18.0);
        assert_eq!(decomposition.estimated_savings.specs, 2.0);

        let too_cheap = identify_optimization_opportunities(&steps(10, 10.0), &[], None);
        assert!(too_cheap.iter().all(|o| o.optimization_type != OptimizationType::Decomposition));

        let too_short = identify_optimization_opportunities(&steps(9, 20.0), &[], None);
        assert!(too_short.iter().all(|o| o.optimization_type != OptimizationType::Decomposition));
    }

    #[test]
    fn test_consolidation_merges_overlapping_same_type() {
        let merged = consolidate_optimizations(vec![
            optimization(OptimizationType::Caching, &["a", "b"], 4.0, 25.0),
            optimization(OptimizationType::Batching, &["b", "c"], 1.0, 40.0),
            optimization(OptimizationType::Caching, &["b", "c"], 2.0, 60.0),
            optimization(OptimizationType::Caching, &["x"], 7.0, 10.0),
        ]);

        assert_eq!(merged.len(), 3);
        assert_eq!(merged[0].optimization_type, OptimizationType::Caching);
        assert_eq!(merged[0].description, "caching over a+b");
        assert_eq!(merged[0].steps_affected, vec!["a", "b", "c"]);
        assert_eq!(merged[0].estimated_savings.vibes, 6.0);
        assert_eq!(merged[0].estimated_savings.percentage, 60.0);
        assert_eq!(merged[1].optimization_type, OptimizationType::Batching);
        assert_eq!(merged[2].steps_affected, vec!["x"]);
    }

    #[test]
    fn test_consolidation_is_order_sensitive_and_not_transitive() {
        // A{1,2} B{2,3} C{3,4}: A gathers A+B; C is still unprocessed and
        // gathers B+C, so B's savings are counted twice
        let merged = consolidate_optimizations(vec![
            optimization(OptimizationType::Caching, &["1", "2"], 1.0, 10.0),
            optimization(OptimizationType::Caching, &["2", "3"], 10.0, 20.0),
            optimization(OptimizationType::Caching, &["3", "4"], 100.0, 30.0),
        ]);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].steps_affected, vec!["1", "2", "3"]);
        assert_eq!(merged[0].estimated_savings.vibes, 11.0);
        assert_eq!(merged[1].steps_affected, vec!["2", "3", "4"]);
        assert_eq!(merged[1].estimated_savings.vibes, 110.0);
        assert_eq!(merged[1].description, "caching over 3+4");

        // the same three records in reverse order
        let reversed = consolidate_optimizations(vec![
            optimization(OptimizationType::Caching, &["3", "4"], 100.0, 30.0),
            optimization(OptimizationType::Caching, &["2", "3"], 10.0, 20.0),
            optimization(OptimizationType::Caching, &["1", "2"], 1.0, 10.0),
        ]);
        assert_eq!(reversed.len(), 2);
        assert_eq!(reversed[0].steps_affected, vec!["3", "4", "2"]);
        assert_eq!(reversed[1].steps_affected, vec!["2", "3", "1"]);
    }

    #[test]
    fn test_params_are_applied_after_consolidation() {
        let workflow = Workflow::new("wf", vec![step("a", StepType::Vibe, "Draft", 10.0)]);
        let issues = vec![EfficiencyIssue::new(IssueType::UnnecessaryVibes, Severity::Medium, ["a"])];
        let params = OptimizationParams {
            performance_sensitivity: Some(crate::params::PerformanceSensitivity::High),
            ..Default::default()
        };

        let found = identify_optimization_opportunities(&workflow, &issues, Some(&params));
        assert_eq!(found[0].estimated_savings.percentage, 28.0);
        assert_eq!(found[0].estimated_savings.vibes, 11.0);
    }
}
