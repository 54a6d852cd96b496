//! Analysis Adapter
//!
//! **Purpose**: Turn a richer workflow analysis (category breakdowns, value
//! drivers, a zero-based redesign recommendation) into plain
//! [`EfficiencyIssue`] records the opportunity identifier understands.
//!
//! # Thresholds
//! - category: `optimizationPotential > 30`, severity high ≥ 60, medium ≥ 45
//! - value driver: `savingsPotential > 20`, severity high ≥ 50, medium ≥ 35
//! - zero-based: recommended and `estimatedSavings > 30`
//!
//! Never returns an empty list: with nothing qualifying, one medium
//! `redundant_query` issue over every step is emitted.

use crate::rules::{first_match, KeywordRule};
use crate::types::{EfficiencyIssue, IssueType, Severity, StepType, Workflow};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const CATEGORY_THRESHOLD: f64 = 30.0;
pub const DRIVER_THRESHOLD: f64 = 20.0;
pub const ZERO_BASED_THRESHOLD: f64 = 30.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryBreakdown {
    pub category: String,

    #[serde(default)]
    pub step_ids: Vec<String>,

    /// Percentage, 0-100
    #[serde(default)]
    pub optimization_potential: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverBreakdown {
    pub driver: String,

    #[serde(default)]
    pub step_ids: Vec<String>,

    /// Percentage, 0-100
    #[serde(default)]
    pub savings_potential: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZeroBasedRecommendation {
    #[serde(default)]
    pub recommended: bool,

    #[serde(default)]
    pub estimated_savings: f64,

    #[serde(default)]
    pub rationale: String,
}

/// External analysis of a workflow
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSummary {
    #[serde(default)]
    pub categories: Vec<CategoryBreakdown>,

    #[serde(default)]
    pub value_drivers: Vec<DriverBreakdown>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zero_based: Option<ZeroBasedRecommendation>,
}

const CATEGORY_ISSUES: &[KeywordRule<IssueType>] = &[
    KeywordRule { label: IssueType::UnnecessaryVibes, keywords: &["vibe", "unstructured", "creative"] },
    KeywordRule { label: IssueType::ExcessiveLoops, keywords: &["loop", "repeat", "iteration", "batch"] },
    KeywordRule { label: IssueType::MissingCache, keywords: &["cache", "reuse"] },
];

const DRIVER_ISSUES: &[KeywordRule<IssueType>] = &[
    KeywordRule { label: IssueType::ExcessiveLoops, keywords: &["volume", "frequency", "repeat"] },
    KeywordRule { label: IssueType::UnnecessaryVibes, keywords: &["vibe", "manual"] },
    KeywordRule { label: IssueType::MissingCache, keywords: &["cache", "reuse"] },
];

fn severity(value: f64, high: f64, medium: f64) -> Severity {
    if value >= high {
        Severity::High
    } else if value >= medium {
        Severity::Medium
    } else {
        Severity::Low
    }
}

/// Known ids from `ids`, or every step id when `ids` is empty
fn resolve_steps(ids: &[String], workflow: &Workflow) -> Vec<String> {
    if ids.is_empty() {
        return workflow.steps.iter().map(|step| step.id.clone()).collect();
    }
    let known = workflow.step_ids();
    ids.iter().filter(|id| known.contains(id.as_str())).cloned().collect()
}

pub fn convert_analysis_to_issues(analysis: &AnalysisSummary, workflow: &Workflow) -> Vec<EfficiencyIssue> {
    let mut issues = Vec::new();

    for category in &analysis.categories {
        if category.optimization_potential <= CATEGORY_THRESHOLD {
            continue;
        }
        let issue_type = first_match(CATEGORY_ISSUES, &category.category).unwrap_or(IssueType::RedundantQuery);
        let steps = resolve_steps(&category.step_ids, workflow);
        if steps.is_empty() {
            continue;
        }

        issues.push(EfficiencyIssue {
            issue_type,
            severity: severity(category.optimization_potential, 60.0, 45.0),
            description: format!(
                "Category '{}' has {:.0}% optimization potential",
                category.category, category.optimization_potential
            ),
            suggested_fix: format!("Optimize {} steps", category.category),
            steps_affected: steps,
        });
    }

    for driver in &analysis.value_drivers {
        if driver.savings_potential <= DRIVER_THRESHOLD {
            continue;
        }
        let issue_type = first_match(DRIVER_ISSUES, &driver.driver).unwrap_or(IssueType::RedundantQuery);
        let steps = resolve_steps(&driver.step_ids, workflow);
        if steps.is_empty() {
            continue;
        }

        issues.push(EfficiencyIssue {
            issue_type,
            severity: severity(driver.savings_potential, 50.0, 35.0),
            description: format!(
                "Value driver '{}' could save {:.0}%",
                driver.driver, driver.savings_potential
            ),
            suggested_fix: format!("Reduce cost driven by {}", driver.driver),
            steps_affected: steps,
        });
    }

    if let Some(zero_based) = analysis
        .zero_based
        .as_ref()
        .filter(|z| z.recommended && z.estimated_savings > ZERO_BASED_THRESHOLD)
    {
        let vibes: Vec<String> = workflow
            .steps
            .iter()
            .filter(|step| step.step_type == StepType::Vibe)
            .map(|step| step.id.clone())
            .collect();

        if !vibes.is_empty() {
            issues.push(EfficiencyIssue {
                issue_type: IssueType::UnnecessaryVibes,
                severity: Severity::High,
                description: format!(
                    "Zero-based redesign could save {:.0}%: {}",
                    zero_based.estimated_savings, zero_based.rationale
                ),
                suggested_fix: "Replace vibe steps with structured specs".to_string(),
                steps_affected: vibes,
            });
        }
    }

    if issues.is_empty() {
        debug!(workflow_id = %workflow.id, "Analysis produced no issues, using generic review");
        let mut generic = EfficiencyIssue::new(
            IssueType::RedundantQuery,
            Severity::Medium,
            workflow.steps.iter().map(|step| step.id.clone()),
        );
        generic.description = "General workflow efficiency review".to_string();
        generic.suggested_fix = "Cache repeated queries".to_string();
        issues.push(generic);
    }

    debug!(workflow_id = %workflow.id, issues = issues.len(), "Converted analysis to issues");
    issues
}
