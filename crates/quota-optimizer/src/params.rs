//! Optional tuning parameters that scale savings estimates

use crate::optimizer::floor_tolerant;
use crate::types::{Optimization, OptimizationType, StepType, Workflow};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Upper bound for any adjusted savings percentage
pub const MAX_ADJUSTED_PERCENTAGE: f64 = 85.0;

/// Upper bound for the combined multiplier
pub const MAX_MULTIPLIER: f64 = 1.3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceSensitivity {
    Low,
    #[default]
    Medium,
    High,
}

impl PerformanceSensitivity {
    /// Nudge applied to vibe-to-spec savings
    pub fn multiplier(&self) -> f64 {
        match self {
            PerformanceSensitivity::Low => 0.95,
            PerformanceSensitivity::Medium => 1.0,
            PerformanceSensitivity::High => 1.1,
        }
    }
}

impl std::str::FromStr for PerformanceSensitivity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(PerformanceSensitivity::Low),
            "medium" => Ok(PerformanceSensitivity::Medium),
            "high" => Ok(PerformanceSensitivity::High),
            other => Err(format!("Unknown performance sensitivity: {}", other)),
        }
    }
}

impl fmt::Display for PerformanceSensitivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PerformanceSensitivity::Low => "low",
            PerformanceSensitivity::Medium => "medium",
            PerformanceSensitivity::High => "high",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostConstraints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_vibes: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_specs: Option<f64>,

    /// Passed through for cost forecasting; not used by the engine
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_cost_dollars: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_user_volume: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_constraints: Option<CostConstraints>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performance_sensitivity: Option<PerformanceSensitivity>,
}

impl OptimizationParams {
    /// Batching and caching pay off more as traffic grows
    pub fn volume_multiplier(&self) -> f64 {
        match self.expected_user_volume {
            Some(volume) if volume > 10_000 => 1.3,
            Some(volume) if volume > 1_000 => 1.15,
            _ => 1.0,
        }
    }

    /// 1.3 when the workflow exceeds its budget, 0.9 when the vibe budget
    /// leaves at least 2x headroom, 1.0 otherwise
    pub fn constraint_multiplier(&self, workflow: &Workflow) -> f64 {
        let Some(constraints) = &self.cost_constraints else {
            return 1.0;
        };

        let vibe_cost = workflow.cost_of_type(StepType::Vibe);
        let spec_count = workflow
            .steps
            .iter()
            .filter(|step| step.step_type == StepType::Spec)
            .count() as f64;

        let tight = constraints.max_vibes.is_some_and(|max| max < vibe_cost)
            || constraints.max_specs.is_some_and(|max| max < spec_count);
        if tight {
            return 1.3;
        }

        if constraints.max_vibes.is_some_and(|max| max >= 2.0 * vibe_cost) {
            0.9
        } else {
            1.0
        }
    }

    pub fn sensitivity_multiplier(&self) -> f64 {
        self.performance_sensitivity.unwrap_or_default().multiplier()
    }

    /// Combined multiplier for one optimization type, capped at 1.3
    pub fn multiplier_for(&self, kind: OptimizationType, workflow: &Workflow) -> f64 {
        let constraint = self.constraint_multiplier(workflow);
        let multiplier = match kind {
            OptimizationType::Batching | OptimizationType::Caching => {
                let volume = self.volume_multiplier();
                if volume > 1.0 {
                    volume.max(constraint)
                } else {
                    constraint
                }
            }
            OptimizationType::VibeToSpec => constraint * self.sensitivity_multiplier(),
            OptimizationType::Decomposition => constraint,
        };
        multiplier.min(MAX_MULTIPLIER)
    }

    /// Scale each optimization's savings by its multiplier
    pub fn adjust(&self, workflow: &Workflow, optimizations: Vec<Optimization>) -> Vec<Optimization> {
        optimizations
            .into_iter()
            .map(|mut optimization| {
                let m = self.multiplier_for(optimization.optimization_type, workflow);
                let savings = &mut optimization.estimated_savings;
                savings.percentage = (savings.percentage * m).round().clamp(0.0, MAX_ADJUSTED_PERCENTAGE);
                savings.vibes = floor_tolerant(savings.vibes * m);
                savings.specs = (savings.specs * m).round();

                debug!(
                    kind = %optimization.optimization_type,
                    multiplier = m,
                    percentage = optimization.estimated_savings.percentage,
                    "Adjusted savings"
                );
                optimization
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EstimatedSavings, WorkflowStep};

    fn workflow() -> Workflow {
        Workflow::new(
            "wf",
            vec![
                WorkflowStep::new("a", StepType::Vibe, "Draft", 20.0),
                WorkflowStep::new("b", StepType::Spec, "Fill", 5.0),
            ],
        )
    }

    fn optimization(kind: OptimizationType, percentage: f64, vibes: f64, specs: f64) -> Optimization {
        Optimization {
            optimization_type: kind,
            description: "test".into(),
            steps_affected: vec!["a".into()],
            estimated_savings: EstimatedSavings { vibes, specs, percentage },
        }
    }

    #[test]
    fn test_volume_scales_batching_only() {
        let params = OptimizationParams {
            expected_user_volume: Some(5_000),
            ..Default::default()
        };
        let adjusted = params.adjust(
            &workflow(),
            vec![
                optimization(OptimizationType::Batching, 40.0, 10.0, 0.0),
                optimization(OptimizationType::Decomposition, 15.0, 10.0, 2.0),
            ],
        );

        assert_eq!(adjusted[0].estimated_savings.percentage, 46.0);
        assert_eq!(adjusted[0].estimated_savings.vibes, 11.0);
        assert_eq!(adjusted[1].estimated_savings.percentage, 15.0);
        assert_eq!(adjusted[1].estimated_savings.specs, 2.0);
    }

    #[test]
    fn test_constraints() {
        let tight = OptimizationParams {
            cost_constraints: Some(CostConstraints {
                max_vibes: Some(10.0),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(tight.constraint_multiplier(&workflow()), 1.3);

        let loose = OptimizationParams {
            cost_constraints: Some(CostConstraints {
                max_vibes: Some(40.0),
                max_specs: Some(3.0),
                max_cost_dollars: Some(1.0),
            }),
            ..Default::default()
        };
        assert_eq!(loose.constraint_multiplier(&workflow()), 0.9);

        let specs_over = OptimizationParams {
            cost_constraints: Some(CostConstraints {
                max_vibes: Some(100.0),
                max_specs: Some(0.0),
                max_cost_dollars: None,
            }),
            ..Default::default()
        };
        assert_eq!(specs_over.constraint_multiplier(&workflow()), 1.3);
        assert_eq!(OptimizationParams::default().constraint_multiplier(&workflow()), 1.0);
    }

    #[test]
    fn test_multiplier_and_percentage_caps() {
        let params = OptimizationParams {
            cost_constraints: Some(CostConstraints {
                max_vibes: Some(1.0),
                ..Default::default()
            }),
            performance_sensitivity: Some(PerformanceSensitivity::High),
            ..Default::default()
        };
        assert_eq!(params.multiplier_for(OptimizationType::VibeToSpec, &workflow()), MAX_MULTIPLIER);

        let adjusted = params.adjust(&workflow(), vec![optimization(OptimizationType::VibeToSpec, 70.0, 20.0, 1.0)]);
        assert_eq!(adjusted[0].estimated_savings.percentage, MAX_ADJUSTED_PERCENTAGE);
        assert_eq!(adjusted[0].estimated_savings.vibes, 26.0);
        assert_eq!(adjusted[0].estimated_savings.specs, 1.0);
    }

    #[test]
    fn test_low_sensitivity_lowers_spec_conversion() {
        let params = OptimizationParams {
            performance_sensitivity: Some(PerformanceSensitivity::Low),
            ..Default::default()
        };
        let adjusted = params.adjust(&workflow(), vec![optimization(OptimizationType::VibeToSpec, 50.0, 20.0, 3.0)]);
        assert_eq!(adjusted[0].estimated_savings.percentage, 48.0);
        assert_eq!(adjusted[0].estimated_savings.vibes, 19.0);
        assert_eq!(adjusted[0].estimated_savings.specs, 3.0);
    }

    #[test]
    fn test_params_from_json() {
        let params: OptimizationParams = serde_json::from_value(serde_json::json!({
            "expectedUserVolume": 20000,
            "costConstraints": { "maxVibes": 50, "maxCostDollars": 12.5 },
            "performanceSensitivity": "high"
        }))
        .unwrap();

        assert_eq!(params.volume_multiplier(), 1.3);
        assert_eq!(params.performance_sensitivity, Some(PerformanceSensitivity::High));
        assert_eq!(params.cost_constraints.unwrap().max_cost_dollars, Some(12.5));
        assert_eq!("HIGH".parse::<PerformanceSensitivity>().unwrap(), PerformanceSensitivity::High);
    }
}
