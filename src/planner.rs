//! End-to-end planning of one request: model, solve, relax, report, calendar.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{info, instrument, warn};

use crate::calendar::{distribute_snacks, place_snacks, AssemblyStrategy, CalendarAssembler, CalendarDay, SnackEntry};
use crate::catalog::{RecipeCatalog, RecipeId};
use crate::error::PlanError;
use crate::nutrients::Nutrient;
use crate::optim::report::{build_report, ConstraintEntry};
use crate::optim::{
    ConstraintModelBuilder, MilpBackend, NutrientTargets, RelaxationController, RelaxationPolicy, SolveStatus,
};

/// Where surplus servings end up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SnackPlacement {
    /// Reported only, under `snacks`.
    #[default]
    Floating,
    /// Spread across the days as snack slots.
    Distributed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlanRequest {
    pub horizon_days: u32,
    pub start_date: NaiveDate,
    pub include: Vec<RecipeId>,
    pub exclude: Vec<RecipeId>,
    /// Nutrients whose bounds must never be loosened.
    pub protected_nutrients: BTreeSet<Nutrient>,
    pub relaxation_step: f64,
    pub max_change_factor: f64,
    pub strategy: AssemblyStrategy,
    pub snack_placement: SnackPlacement,
}

impl PlanRequest {
    pub fn new(horizon_days: u32, start_date: NaiveDate) -> Self {
        Self {
            horizon_days,
            start_date,
            include: Vec::new(),
            exclude: Vec::new(),
            protected_nutrients: BTreeSet::new(),
            relaxation_step: crate::optim::relaxation::DEFAULT_RELAXATION_STEP,
            max_change_factor: crate::optim::relaxation::DEFAULT_MAX_CHANGE_FACTOR,
            strategy: AssemblyStrategy::default(),
            snack_placement: SnackPlacement::default(),
        }
    }

    fn relaxation_policy(&self) -> Result<RelaxationPolicy, PlanError> {
        RelaxationPolicy::new(
            self.relaxation_step,
            self.max_change_factor,
            self.protected_nutrients.iter().copied(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectedRecipe {
    pub id: RecipeId,
    pub name: String,
    pub multiplicity: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MealPlan {
    pub status: SolveStatus,
    pub constraints_loosened: bool,
    pub recipes: Vec<SelectedRecipe>,
    pub days: Vec<CalendarDay>,
    pub snacks: Vec<SnackEntry>,
    pub constraint_targets: Vec<ConstraintEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub out_of_orig_bound_nutrients: Option<Vec<String>>,
}

impl MealPlan {
    pub fn total_servings(&self) -> u32 {
        self.recipes.iter().map(|r| r.multiplicity).sum()
    }

    pub fn multiplicity(&self, id: RecipeId) -> u32 {
        self.recipes.iter().find(|r| r.id == id).map_or(0, |r| r.multiplicity)
    }
}

pub struct MealPlanner<B: MilpBackend> {
    catalog: RecipeCatalog,
    backend: B,
}

impl<B: MilpBackend> MealPlanner<B> {
    pub fn new(catalog: RecipeCatalog, backend: B) -> Self {
        Self { catalog, backend }
    }

    pub fn catalog(&self) -> &RecipeCatalog {
        &self.catalog
    }

    #[instrument(skip_all, fields(horizon_days = request.horizon_days, strategy = %request.strategy))]
    pub fn plan(&self, request: &PlanRequest, targets: &NutrientTargets) -> Result<MealPlan, PlanError> {
        let policy = request.relaxation_policy()?;

        let model = ConstraintModelBuilder::new(&self.catalog, targets)
            .horizon_days(request.horizon_days)
            .include(&request.include)
            .exclude(&request.exclude)
            .build()?;
        info!(
            recipes = model.variables.len(),
            bounds = model.nutrient_bounds.len(),
            "built plan model"
        );

        let relaxed = RelaxationController::new(&self.backend, &policy).run(&model)?;
        let outcome = &relaxed.outcome;

        let report = build_report(&model, &outcome.assignment, relaxed.constraints_loosened);
        let out_of_orig_bound_nutrients = relaxed
            .constraints_loosened
            .then(|| report.out_of_orig_bound_nutrients.clone());

        if outcome.status == SolveStatus::Infeasible {
            warn!("no feasible plan, returning an empty calendar");
            return Ok(MealPlan {
                status: SolveStatus::Infeasible,
                constraints_loosened: relaxed.constraints_loosened,
                recipes: Vec::new(),
                days: Vec::new(),
                snacks: Vec::new(),
                constraint_targets: report.entries,
                out_of_orig_bound_nutrients,
            });
        }

        let selection: Vec<(RecipeId, u32)> = model
            .variables
            .iter()
            .zip(&outcome.assignment)
            .filter(|&(_, &m)| m > 0)
            .map(|(v, &m)| (v.recipe_id, m))
            .collect();

        let recipes = selection
            .iter()
            .filter_map(|&(id, multiplicity)| {
                self.catalog.get(id).map(|recipe| SelectedRecipe {
                    id,
                    name: recipe.title.clone(),
                    multiplicity,
                })
            })
            .collect::<Vec<_>>();
        info!(
            distinct = recipes.len(),
            servings = recipes.iter().map(|r| r.multiplicity).sum::<u32>(),
            loosened = relaxed.constraints_loosened,
            "selected recipes"
        );

        let calendar = CalendarAssembler::new(request.strategy).assemble(
            &self.catalog,
            &selection,
            request.horizon_days,
            request.start_date,
        )?;
        let snacks = match request.snack_placement {
            SnackPlacement::Floating => calendar.snacks(),
            SnackPlacement::Distributed => Vec::new(),
        };
        let mut days = calendar.days;

        // Distributed overflow lives on the days only, never in `snacks` as well.
        if request.snack_placement == SnackPlacement::Distributed {
            distribute_snacks(&mut days, calendar.overflow);
        }
        days.iter_mut().for_each(place_snacks);

        Ok(MealPlan {
            status: SolveStatus::Optimal,
            constraints_loosened: relaxed.constraints_loosened,
            recipes,
            days,
            snacks,
            constraint_targets: report.entries,
            out_of_orig_bound_nutrients,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{MealTag, Recipe};
    use crate::optim::{GoodLpBackend, NutrientTarget};

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    fn catalog() -> RecipeCatalog {
        let recipe = |id, title: &str, kcal, protein, tag| {
            Recipe::new(id, title)
                .with_nutrient(Nutrient::Energy, kcal)
                .with_nutrient(Nutrient::Protein, protein)
                .with_tags(&[tag])
        };
        RecipeCatalog::from_recipes(vec![
            recipe(1, "Porridge", 350.0, 12.0, MealTag::Breakfast),
            recipe(2, "Chicken wrap", 550.0, 35.0, MealTag::Lunch),
            recipe(3, "Salmon", 650.0, 40.0, MealTag::Dinner),
            recipe(4, "Apple", 95.0, 0.5, MealTag::Snack),
            recipe(5, "Hummus", 180.0, 5.0, MealTag::Snack),
        ])
    }

    #[test]
    fn test_plan_returns_selection_report_and_days() {
        let planner = MealPlanner::new(catalog(), GoodLpBackend::new());
        let targets = NutrientTargets::new()
            .with(NutrientTarget::point(Nutrient::Energy, 1700.0))
            .unwrap()
            .with(NutrientTarget::at_least(Nutrient::Protein, 60.0))
            .unwrap();

        let plan = planner.plan(&PlanRequest::new(1, start()), &targets).unwrap();

        assert_eq!(plan.status, SolveStatus::Optimal);
        assert!(!plan.constraints_loosened);
        assert!(plan.out_of_orig_bound_nutrients.is_none());
        assert_eq!(plan.constraint_targets.len(), 2);
        assert_eq!(plan.days.len(), 1);
        assert!(plan.total_servings() <= 11);
        let energy = plan.constraint_targets[0].actual;
        assert!((1615..=1785).contains(&energy), "energy {} outside band", energy);
    }

    #[test]
    fn test_invalid_relaxation_step_is_rejected() {
        let planner = MealPlanner::new(catalog(), GoodLpBackend::new());
        let mut request = PlanRequest::new(1, start());
        request.relaxation_step = 0.0;
        let err = planner.plan(&request, &NutrientTargets::new()).unwrap_err();
        assert!(matches!(err, PlanError::InvalidRequest(_)));
    }

    #[test]
    fn test_zero_horizon_is_a_model_error() {
        let planner = MealPlanner::new(catalog(), GoodLpBackend::new());
        let err = planner.plan(&PlanRequest::new(0, start()), &NutrientTargets::new()).unwrap_err();
        assert!(matches!(err, PlanError::ModelBuild(_)));
    }

    #[test]
    fn test_missing_nutrient_data_fails_the_request() {
        let planner = MealPlanner::new(catalog(), GoodLpBackend::new());
        let targets = NutrientTargets::new()
            .with(NutrientTarget::at_most(Nutrient::Sodium, 2300.0))
            .unwrap();
        let err = planner.plan(&PlanRequest::new(1, start()), &targets).unwrap_err();
        assert!(matches!(err, PlanError::ModelBuild(_)));
    }

    #[test]
    fn test_infeasible_plan_serialises_empty() {
        let planner = MealPlanner::new(catalog(), GoodLpBackend::new());
        // Energy is never loosened, so this stops after the first solve.
        let targets = NutrientTargets::new()
            .with(NutrientTarget::point(Nutrient::Energy, 100_000.0))
            .unwrap();
        let plan = planner.plan(&PlanRequest::new(1, start()), &targets).unwrap();

        let json = serde_json::to_value(&plan).unwrap();
        assert_eq!(json["status"], "Infeasible");
        assert_eq!(json["constraints_loosened"], true);
        assert_eq!(json["recipes"], serde_json::json!([]));
        assert_eq!(json["days"], serde_json::json!([]));
        assert_eq!(json["constraint_targets"][0]["nutrientName"], "energy (calories)");
        assert_eq!(json["out_of_orig_bound_nutrients"], serde_json::json!(["energy (calories)"]));
    }
}
