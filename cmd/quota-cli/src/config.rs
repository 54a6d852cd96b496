/// Configuration for the qopt CLI
/// Loads from environment variables with validation and defaults

use anyhow::{Context, Result};
use quota_optimizer::{CostConstraints, CoveragePolicy, OptimizationParams, PerformanceSensitivity};
use std::env;
use std::str::FromStr;

// ============================================================================
// Environment Variable Helpers
// ============================================================================

/// Parse string from environment with default
fn get_env_string(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse boolean from environment with default
fn get_env_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .map(|v| v.to_lowercase() == "true")
        .unwrap_or(default)
}

/// Parse an optional typed value; unset or empty is `None`, garbage is an error
fn get_env_opt<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("{}", e))
            .with_context(|| format!("Invalid value for {}: {}", key, value)),
        _ => Ok(None),
    }
}

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone)]
pub struct CliConfig {
    // Logging
    pub log_level: String,
    pub log_json: bool,

    // Engine
    pub coverage_policy: CoveragePolicy,

    // Default tuning parameters
    pub expected_user_volume: Option<u64>,
    pub max_vibes: Option<f64>,
    pub max_specs: Option<f64>,
    pub max_cost_dollars: Option<f64>,
    pub performance_sensitivity: Option<PerformanceSensitivity>,
}

impl CliConfig {
    /// Load configuration from environment variables
    pub fn load_from_env() -> Result<Self> {
        Ok(Self {
            log_level: get_env_string("QOPT_LOG_LEVEL", "warn"),
            log_json: get_env_bool("QOPT_LOG_JSON", false),
            coverage_policy: get_env_opt("QOPT_COVERAGE_POLICY")?.unwrap_or_default(),
            expected_user_volume: get_env_opt("QOPT_USER_VOLUME")?,
            max_vibes: get_env_opt("QOPT_MAX_VIBES")?,
            max_specs: get_env_opt("QOPT_MAX_SPECS")?,
            max_cost_dollars: get_env_opt("QOPT_MAX_COST_DOLLARS")?,
            performance_sensitivity: get_env_opt("QOPT_PERFORMANCE_SENSITIVITY")?,
        })
    }

    /// Create config with default values
    pub fn with_defaults() -> Self {
        Self {
            log_level: "warn".to_string(),
            log_json: false,
            coverage_policy: CoveragePolicy::default(),
            expected_user_volume: None,
            max_vibes: None,
            max_specs: None,
            max_cost_dollars: None,
            performance_sensitivity: None,
        }
    }

    /// Validate configuration values
    pub fn validate(self) -> Result<Self> {
        if !LOG_LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            anyhow::bail!("log_level must be one of {}, got {}", LOG_LEVELS.join("/"), self.log_level);
        }

        for (name, value) in [
            ("max_vibes", self.max_vibes),
            ("max_specs", self.max_specs),
            ("max_cost_dollars", self.max_cost_dollars),
        ] {
            if let Some(value) = value {
                if !value.is_finite() || value < 0.0 {
                    anyhow::bail!("{} must be a non-negative number, got {}", name, value);
                }
            }
        }

        Ok(self)
    }

    /// Tuning parameters from the environment, `None` when nothing is set
    pub fn engine_params(&self) -> Option<OptimizationParams> {
        let constraints = CostConstraints {
            max_vibes: self.max_vibes,
            max_specs: self.max_specs,
            max_cost_dollars: self.max_cost_dollars,
        };
        let params = OptimizationParams {
            expected_user_volume: self.expected_user_volume,
            cost_constraints: (constraints != CostConstraints::default()).then_some(constraints),
            performance_sensitivity: self.performance_sensitivity,
        };

        (params != OptimizationParams::default()).then_some(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CliConfig::with_defaults().validate().unwrap();
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.coverage_policy, CoveragePolicy::Lenient);
        assert!(config.engine_params().is_none());
    }

    #[test]
    fn test_validate_log_level() {
        let mut config = CliConfig::with_defaults();
        config.log_level = "loud".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_negative_budget() {
        let mut config = CliConfig::with_defaults();
        config.max_vibes = Some(-1.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_engine_params() {
        let mut config = CliConfig::with_defaults();
        config.max_specs = Some(4.0);
        config.performance_sensitivity = Some(PerformanceSensitivity::High);

        let params = config.engine_params().unwrap();
        assert_eq!(params.expected_user_volume, None);
        assert_eq!(params.cost_constraints.unwrap().max_specs, Some(4.0));
        assert_eq!(params.performance_sensitivity, Some(PerformanceSensitivity::High));
    }

    #[test]
    fn test_load_from_env() {
        env::set_var("QOPT_COVERAGE_POLICY", "strict");
        env::set_var("QOPT_USER_VOLUME", "2500");
        env::set_var("QOPT_LOG_JSON", "TRUE");
        let config = CliConfig::load_from_env().unwrap();
        assert_eq!(config.coverage_policy, CoveragePolicy::Strict);
        assert_eq!(config.expected_user_volume, Some(2500));
        assert!(config.log_json);

        env::set_var("QOPT_USER_VOLUME", "lots");
        assert!(CliConfig::load_from_env().is_err());

        env::remove_var("QOPT_COVERAGE_POLICY");
        env::remove_var("QOPT_USER_VOLUME");
        env::remove_var("QOPT_LOG_JSON");
    }
}
