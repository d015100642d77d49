use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::calendar::AssemblyStrategy;
use crate::error::ConfigError;
use crate::optim::relaxation::{DEFAULT_MAX_CHANGE_FACTOR, DEFAULT_RELAXATION_STEP};
use crate::planner::SnackPlacement;

pub const RELAXATION_STEP_VAR: &str = "MEAL_PLAN_RELAXATION_STEP";
pub const MAX_CHANGE_FACTOR_VAR: &str = "MEAL_PLAN_MAX_CHANGE_FACTOR";
pub const SOLVE_TIMEOUT_VAR: &str = "MEAL_PLAN_SOLVE_TIMEOUT_SECS";
pub const POLICY_VAR: &str = "MEAL_PLAN_POLICY";

pub const DEFAULT_SOLVE_TIMEOUT_SECS: u64 = 60;

/// Planner defaults, before any command-line override.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannerConfig {
    pub relaxation_step: f64,
    pub max_change_factor: f64,
    pub solve_timeout: Duration,
    pub strategy: AssemblyStrategy,
    pub snack_placement: SnackPlacement,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            relaxation_step: DEFAULT_RELAXATION_STEP,
            max_change_factor: DEFAULT_MAX_CHANGE_FACTOR,
            solve_timeout: Duration::from_secs(DEFAULT_SOLVE_TIMEOUT_SECS),
            strategy: AssemblyStrategy::default(),
            snack_placement: SnackPlacement::default(),
        }
    }
}

impl PlannerConfig {
    /// Loads `.env` if present, then reads the `MEAL_PLAN_*` variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Builds the config from any variable source; unset variables keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(step) = parse_var::<f64, _>(&lookup, RELAXATION_STEP_VAR)? {
            if !(step > 0.0 && step <= 1.0) {
                return Err(invalid(RELAXATION_STEP_VAR, &step.to_string()));
            }
            config.relaxation_step = step;
        }
        if let Some(factor) = parse_var::<f64, _>(&lookup, MAX_CHANGE_FACTOR_VAR)? {
            if !(factor > 0.0 && factor.is_finite()) {
                return Err(invalid(MAX_CHANGE_FACTOR_VAR, &factor.to_string()));
            }
            config.max_change_factor = factor;
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, SOLVE_TIMEOUT_VAR)? {
            config.solve_timeout = Duration::from_secs(secs);
        }
        if let Some(raw) = lookup(POLICY_VAR) {
            config.strategy = raw
                .parse::<AssemblyStrategy>()
                .map_err(|_| invalid(POLICY_VAR, &raw))?;
        }

        Ok(config)
    }
}

fn parse_var<T, F>(lookup: &F, var: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|_| invalid(var, &raw)),
    }
}

fn invalid(var: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue { var: var.to_string(), value: value.to_string() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = PlannerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, PlannerConfig::default());
        assert_eq!(config.solve_timeout, Duration::from_secs(60));
        assert_eq!(config.strategy, AssemblyStrategy::CalorieBalance);
    }

    #[test]
    fn test_overrides() {
        let config = PlannerConfig::from_lookup(lookup(&[
            (RELAXATION_STEP_VAR, "0.5"),
            (MAX_CHANGE_FACTOR_VAR, "4"),
            (SOLVE_TIMEOUT_VAR, "5"),
            (POLICY_VAR, "slots"),
        ]))
        .unwrap();
        assert_eq!(config.relaxation_step, 0.5);
        assert_eq!(config.max_change_factor, 4.0);
        assert_eq!(config.solve_timeout, Duration::from_secs(5));
        assert_eq!(config.strategy, AssemblyStrategy::SlotClassification);
    }

    #[test]
    fn test_bad_value_names_the_variable() {
        let err = PlannerConfig::from_lookup(lookup(&[(SOLVE_TIMEOUT_VAR, "soon")])).unwrap_err();
        assert_eq!(err.to_string(), "invalid value 'soon' for MEAL_PLAN_SOLVE_TIMEOUT_SECS");

        let err = PlannerConfig::from_lookup(lookup(&[(RELAXATION_STEP_VAR, "1.5")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref var, .. } if var == RELAXATION_STEP_VAR));

        assert!(PlannerConfig::from_lookup(lookup(&[(POLICY_VAR, "random")])).is_err());
    }

    #[test]
    fn test_blank_value_is_ignored() {
        let config = PlannerConfig::from_lookup(lookup(&[(MAX_CHANGE_FACTOR_VAR, "  ")])).unwrap();
        assert_eq!(config.max_change_factor, DEFAULT_MAX_CHANGE_FACTOR);
    }
}
