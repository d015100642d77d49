use std::collections::HashSet;
use tracing::{debug, warn};

use crate::catalog::{RecipeCatalog, RecipeId};
use crate::error::ModelBuildError;
use crate::nutrients::Nutrient;
use crate::optim::targets::{NutrientTarget, NutrientTargets};

/// Energy is held to a ±5% band around its target instead of the requested range.
pub const ENERGY_LOWER_RANGE: f64 = 0.95;
pub const ENERGY_UPPER_RANGE: f64 = 1.05;

pub const SERVINGS_PER_DAY_CAP: u32 = 11;

/// Recipes between these calorie values may be served more than once.
pub const SERVING_CAP_CALORIES: f64 = 400.0;
pub const SERVING_CAP_MIN_CALORIES: f64 = 100.0;

/// Maximum multiplicity of a recipe with the given per-serving calories.
pub fn serving_cap(calories: f64) -> u32 {
    if calories > SERVING_CAP_MIN_CALORIES && calories < SERVING_CAP_CALORIES {
        (SERVING_CAP_CALORIES / calories).floor() as u32
    } else {
        1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BoundSide {
    Min,
    Max,
}

/// One linear nutrient row: Σ coefficients[i] × x[i] (≥ | ≤) rhs.
#[derive(Debug, Clone, PartialEq)]
pub struct NutrientBound {
    pub nutrient: Nutrient,
    pub side: BoundSide,
    /// Aligned with `PlanModel::variables`.
    pub coefficients: Vec<f64>,
    pub rhs: f64,
}

impl NutrientBound {
    pub fn evaluate(&self, assignment: &[u32]) -> f64 {
        self.coefficients
            .iter()
            .zip(assignment)
            .map(|(c, x)| c * f64::from(*x))
            .sum()
    }

    pub fn is_satisfied(&self, assignment: &[u32]) -> bool {
        let total = self.evaluate(assignment);
        match self.side {
            BoundSide::Min => total >= self.rhs - 1e-6,
            BoundSide::Max => total <= self.rhs + 1e-6,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlanVariable {
    pub recipe_id: RecipeId,
    /// preference score × diet-fit score
    pub objective_weight: f64,
    pub lower: u32,
    pub upper: u32,
}

/// Integer program for one request. Variables are in ascending recipe-id order.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanModel {
    pub variables: Vec<PlanVariable>,
    pub nutrient_bounds: Vec<NutrientBound>,
    pub total_servings_cap: u32,
    /// Indices into `variables`.
    pub excluded: Vec<usize>,
    pub included: Vec<usize>,
    pub horizon_days: u32,
}

impl PlanModel {
    pub fn objective_value(&self, assignment: &[u32]) -> f64 {
        self.variables
            .iter()
            .zip(assignment)
            .map(|(v, x)| v.objective_weight * f64::from(*x))
            .sum()
    }

    /// Copy of this model with different right-hand sides on the nutrient rows.
    pub fn with_nutrient_bounds(&self, bounds: Vec<NutrientBound>) -> Self {
        Self { nutrient_bounds: bounds, ..self.clone() }
    }

    /// Checks every constraint in the model against an assignment.
    pub fn is_feasible(&self, assignment: &[u32]) -> bool {
        if assignment.len() != self.variables.len() {
            return false;
        }
        let total: u32 = assignment.iter().sum();
        total <= self.total_servings_cap
            && self.variables.iter().zip(assignment).all(|(v, x)| *x >= v.lower && *x <= v.upper)
            && self.excluded.iter().all(|&i| assignment[i] == 0)
            && self.nutrient_bounds.iter().all(|b| b.is_satisfied(assignment))
    }
}

/// Turns a catalog plus nutrient targets into a `PlanModel`.
pub struct ConstraintModelBuilder<'a> {
    catalog: &'a RecipeCatalog,
    targets: &'a NutrientTargets,
    horizon_days: u32,
    include: Vec<RecipeId>,
    exclude: Vec<RecipeId>,
}

impl<'a> ConstraintModelBuilder<'a> {
    pub fn new(catalog: &'a RecipeCatalog, targets: &'a NutrientTargets) -> Self {
        Self {
            catalog,
            targets,
            horizon_days: 1,
            include: Vec::new(),
            exclude: Vec::new(),
        }
    }

    pub fn horizon_days(mut self, days: u32) -> Self {
        self.horizon_days = days;
        self
    }

    pub fn include(mut self, ids: &[RecipeId]) -> Self {
        self.include = ids.to_vec();
        self
    }

    pub fn exclude(mut self, ids: &[RecipeId]) -> Self {
        self.exclude = ids.to_vec();
        self
    }

    pub fn build(self) -> Result<PlanModel, ModelBuildError> {
        if self.horizon_days == 0 {
            return Err(ModelBuildError::InvalidHorizon);
        }
        for id in &self.include {
            if !self.catalog.contains(*id) {
                return Err(ModelBuildError::UnknownRecipe(*id));
            }
        }
        for id in &self.exclude {
            if !self.catalog.contains(*id) {
                warn!(recipe_id = id, "excluded recipe is not in the catalog, ignoring");
            }
        }

        let include: HashSet<RecipeId> = self.include.iter().copied().collect();
        let exclude: HashSet<RecipeId> = self.exclude.iter().copied().collect();

        let mut variables = Vec::with_capacity(self.catalog.len());
        let mut included = Vec::new();
        let mut excluded = Vec::new();
        for (idx, recipe) in self.catalog.iter().enumerate() {
            let calories = recipe.calories().ok_or(ModelBuildError::MissingNutrient {
                recipe_id: recipe.id,
                nutrient: Nutrient::Energy,
            })?;
            let is_included = include.contains(&recipe.id);
            if is_included {
                included.push(idx);
            }
            if exclude.contains(&recipe.id) {
                excluded.push(idx);
            }
            variables.push(PlanVariable {
                recipe_id: recipe.id,
                objective_weight: recipe.preference_score as f64 * self.catalog.diet_score(recipe.id),
                lower: u32::from(is_included),
                upper: serving_cap(calories),
            });
        }

        let horizon = f64::from(self.horizon_days);
        let mut nutrient_bounds = Vec::new();
        for target in self.targets.iter() {
            let daily = if target.nutrient == Nutrient::Energy {
                energy_band(target)
            } else {
                *target
            };
            let scaled = daily.scaled(horizon);

            if let Some(lower) = scaled.lower {
                nutrient_bounds.push(NutrientBound {
                    nutrient: target.nutrient,
                    side: BoundSide::Min,
                    coefficients: self.coefficients(target.nutrient, BoundSide::Min)?,
                    rhs: lower,
                });
            }
            if let Some(upper) = scaled.upper {
                nutrient_bounds.push(NutrientBound {
                    nutrient: target.nutrient,
                    side: BoundSide::Max,
                    coefficients: self.coefficients(target.nutrient, BoundSide::Max)?,
                    rhs: upper,
                });
            }
        }

        debug!(
            variables = variables.len(),
            bounds = nutrient_bounds.len(),
            horizon_days = self.horizon_days,
            "built plan model"
        );

        Ok(PlanModel {
            variables,
            nutrient_bounds,
            total_servings_cap: SERVINGS_PER_DAY_CAP * self.horizon_days,
            excluded,
            included,
            horizon_days: self.horizon_days,
        })
    }

    fn coefficients(&self, nutrient: Nutrient, side: BoundSide) -> Result<Vec<f64>, ModelBuildError> {
        self.catalog
            .iter()
            .map(|recipe| {
                let value = recipe.nutrients.get(nutrient).ok_or(ModelBuildError::MissingNutrient {
                    recipe_id: recipe.id,
                    nutrient,
                })?;
                // The B12 floor also counts fortified B12; the ceiling does not.
                if nutrient == Nutrient::VitaminB12 && side == BoundSide::Min {
                    Ok(value + recipe.nutrients.get(Nutrient::VitaminB12Added).unwrap_or(0.0))
                } else {
                    Ok(value)
                }
            })
            .collect()
    }
}

fn energy_band(target: &NutrientTarget) -> NutrientTarget {
    match target.central_value() {
        Some(value) => NutrientTarget::range(target.nutrient, value * ENERGY_LOWER_RANGE, value * ENERGY_UPPER_RANGE),
        None => *target,
    }
}
