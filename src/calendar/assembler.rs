use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use super::{CalendarDay, CalorieBalancePolicy, RecipeInstance, SlotClassificationPolicy, SnackEntry};
use crate::catalog::{RecipeCatalog, RecipeId};
use crate::error::{AssemblyError, ConfigError};

/// Which assembly policy lays out the calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AssemblyStrategy {
    /// Meal-slot quotas per day.
    SlotClassification,
    /// Three recipes per day, interleaved by calories.
    #[default]
    CalorieBalance,
}

impl FromStr for AssemblyStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "slots" | "slot-classification" | "slot_classification" => Ok(AssemblyStrategy::SlotClassification),
            "calories" | "calorie-balance" | "calorie_balance" => Ok(AssemblyStrategy::CalorieBalance),
            _ => Err(ConfigError::InvalidValue {
                var: "assembly policy".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for AssemblyStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssemblyStrategy::SlotClassification => f.write_str("slot-classification"),
            AssemblyStrategy::CalorieBalance => f.write_str("calorie-balance"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssembledCalendar {
    pub days: Vec<CalendarDay>,
    /// Instances that did not fit on any day, in the order they were set aside.
    pub overflow: Vec<RecipeInstance>,
}

impl AssembledCalendar {
    pub fn snacks(&self) -> Vec<SnackEntry> {
        super::snack_entries(&self.overflow)
    }
}

pub trait AssemblyPolicy {
    /// `instances` arrive flattened in ascending recipe-id order.
    fn assemble(
        &self,
        instances: Vec<RecipeInstance>,
        horizon_days: u32,
        start_date: NaiveDate,
    ) -> Result<AssembledCalendar, AssemblyError>;
}

/// Expands `(recipe, multiplicity)` pairs into one instance per serving, ascending by id.
pub fn flatten(
    catalog: &RecipeCatalog,
    selection: &[(RecipeId, u32)],
) -> Result<Vec<RecipeInstance>, AssemblyError> {
    let mut sorted = selection.to_vec();
    sorted.sort_by_key(|(id, _)| *id);

    let mut instances = Vec::new();
    for (id, multiplicity) in sorted {
        let recipe = catalog.get(id).ok_or(AssemblyError::UnknownRecipe(id))?;
        let instance = RecipeInstance::from_recipe(recipe);
        instances.extend(std::iter::repeat(instance).take(multiplicity as usize));
    }
    Ok(instances)
}

pub struct CalendarAssembler {
    strategy: AssemblyStrategy,
}

impl CalendarAssembler {
    pub fn new(strategy: AssemblyStrategy) -> Self {
        Self { strategy }
    }

    fn policy(&self) -> Box<dyn AssemblyPolicy> {
        match self.strategy {
            AssemblyStrategy::SlotClassification => Box::new(SlotClassificationPolicy),
            AssemblyStrategy::CalorieBalance => Box::new(CalorieBalancePolicy),
        }
    }

    pub fn assemble(
        &self,
        catalog: &RecipeCatalog,
        selection: &[(RecipeId, u32)],
        horizon_days: u32,
        start_date: NaiveDate,
    ) -> Result<AssembledCalendar, AssemblyError> {
        let instances = flatten(catalog, selection)?;
        debug!(
            strategy = %self.strategy,
            instances = instances.len(),
            horizon_days,
            "assembling calendar"
        );
        self.policy().assemble(instances, horizon_days, start_date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Recipe;
    use crate::nutrients::Nutrient;

    #[test]
    fn test_flatten_repeats_in_id_order() {
        let catalog = RecipeCatalog::from_recipes(vec![
            Recipe::new(5, "Soup").with_nutrient(Nutrient::Energy, 200.0),
            Recipe::new(1, "Toast").with_nutrient(Nutrient::Energy, 120.0),
        ]);
        let instances = flatten(&catalog, &[(5, 2), (1, 1)]).unwrap();
        let ids: Vec<RecipeId> = instances.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![1, 5, 5]);
    }

    #[test]
    fn test_flatten_unknown_recipe() {
        let catalog = RecipeCatalog::default();
        let err = flatten(&catalog, &[(3, 1)]).unwrap_err();
        assert!(matches!(err, AssemblyError::UnknownRecipe(3)));
    }

    #[test]
    fn test_strategy_parsing() {
        assert_eq!("slots".parse::<AssemblyStrategy>().unwrap(), AssemblyStrategy::SlotClassification);
        assert_eq!("Calorie-Balance".parse::<AssemblyStrategy>().unwrap(), AssemblyStrategy::CalorieBalance);
        assert!("random".parse::<AssemblyStrategy>().is_err());
        assert_eq!(AssemblyStrategy::default(), AssemblyStrategy::CalorieBalance);
    }
}
