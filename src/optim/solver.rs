//! Solver port for plan models, plus the default `good_lp` backend.

use good_lp::{
    constraint, default_solver, variable, Expression, ProblemVariables, ResolutionError, Solution, SolverModel,
    Variable,
};
use serde::Serialize;
use tracing::debug;

use crate::error::SolverError;
use crate::optim::model::{BoundSide, PlanModel};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SolveStatus {
    Optimal,
    Infeasible,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SolveOutcome {
    pub status: SolveStatus,
    /// One multiplicity per model variable. Empty when infeasible.
    pub assignment: Vec<u32>,
    pub objective: Option<f64>,
}

impl SolveOutcome {
    pub fn optimal(model: &PlanModel, assignment: Vec<u32>) -> Self {
        let objective = Some(model.objective_value(&assignment));
        Self { status: SolveStatus::Optimal, assignment, objective }
    }

    pub fn infeasible() -> Self {
        Self { status: SolveStatus::Infeasible, assignment: Vec::new(), objective: None }
    }

    pub fn is_optimal(&self) -> bool {
        self.status == SolveStatus::Optimal
    }
}

/// Anything that can solve a `PlanModel`. Infeasibility is an outcome, not an error.
pub trait MilpBackend {
    fn solve(&self, model: &PlanModel) -> Result<SolveOutcome, SolverError>;
}

impl<B: MilpBackend + ?Sized> MilpBackend for &B {
    fn solve(&self, model: &PlanModel) -> Result<SolveOutcome, SolverError> {
        (**self).solve(model)
    }
}

/// Integer program backend on `good_lp`'s default (pure Rust) solver.
#[derive(Debug, Clone, Copy, Default)]
pub struct GoodLpBackend;

impl GoodLpBackend {
    pub fn new() -> Self {
        Self
    }
}

impl MilpBackend for GoodLpBackend {
    fn solve(&self, model: &PlanModel) -> Result<SolveOutcome, SolverError> {
        if model.variables.is_empty() {
            // Nothing to choose; the empty plan is the only candidate.
            let empty = Vec::new();
            return Ok(if model.is_feasible(&empty) {
                SolveOutcome::optimal(model, empty)
            } else {
                SolveOutcome::infeasible()
            });
        }

        let mut vars = ProblemVariables::new();
        let x: Vec<Variable> = model
            .variables
            .iter()
            .map(|v| {
                vars.add(
                    variable()
                        .integer()
                        .min(f64::from(v.lower))
                        .max(f64::from(v.upper))
                        .name(format!("recipe_{}", v.recipe_id)),
                )
            })
            .collect();

        let objective: Expression = model
            .variables
            .iter()
            .zip(&x)
            .map(|(v, &var)| v.objective_weight * var)
            .sum();

        let mut problem = vars.maximise(objective).using(default_solver);

        for bound in &model.nutrient_bounds {
            let total: Expression = bound.coefficients.iter().zip(&x).map(|(&c, &var)| c * var).sum();
            let rhs = bound.rhs;
            problem = match bound.side {
                BoundSide::Min => problem.with(constraint!(total >= rhs)),
                BoundSide::Max => problem.with(constraint!(total <= rhs)),
            };
        }

        let servings: Expression = x.iter().map(|&var| Expression::from(var)).sum();
        problem = problem.with(constraint!(servings <= f64::from(model.total_servings_cap)));

        if !model.excluded.is_empty() {
            let excluded: Expression = model.excluded.iter().map(|&i| Expression::from(x[i])).sum();
            problem = problem.with(constraint!(excluded == 0.0));
        }
        if !model.included.is_empty() {
            let included: Expression = model.included.iter().map(|&i| Expression::from(x[i])).sum();
            problem = problem.with(constraint!(included >= model.included.len() as f64));
        }

        debug!(
            variables = x.len(),
            bounds = model.nutrient_bounds.len(),
            "solving plan model"
        );

        match problem.solve() {
            Ok(solution) => {
                let assignment = x.iter().map(|&var| solution.value(var).round().max(0.0) as u32).collect();
                Ok(SolveOutcome::optimal(model, assignment))
            }
            Err(ResolutionError::Infeasible) => Ok(SolveOutcome::infeasible()),
            Err(ResolutionError::Unbounded) => Err(SolverError::Unbounded),
            Err(e) => Err(SolverError::Backend(e.to_string())),
        }
    }
}
