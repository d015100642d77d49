use std::collections::BTreeSet;
use tracing::{debug, info, warn};

use crate::error::{PlanError, SolverError};
use crate::nutrients::Nutrient;
use crate::optim::model::{BoundSide, NutrientBound, PlanModel};
use crate::optim::solver::{MilpBackend, SolveOutcome};

pub const DEFAULT_RELAXATION_STEP: f64 = 0.1;
pub const DEFAULT_MAX_CHANGE_FACTOR: f64 = 10.0;

/// How far, and how fast, nutrient bounds may be loosened after an infeasible solve.
#[derive(Debug, Clone, PartialEq)]
pub struct RelaxationPolicy {
    step: f64,
    max_change_factor: f64,
    protected: BTreeSet<Nutrient>,
}

impl Default for RelaxationPolicy {
    fn default() -> Self {
        Self {
            step: DEFAULT_RELAXATION_STEP,
            max_change_factor: DEFAULT_MAX_CHANGE_FACTOR,
            protected: BTreeSet::new(),
        }
    }
}

impl RelaxationPolicy {
    /// `step` must lie in (0, 1] and `max_change_factor` must be positive.
    /// Energy, sodium and fat are always protected on top of `protected`.
    pub fn new(
        step: f64,
        max_change_factor: f64,
        protected: impl IntoIterator<Item = Nutrient>,
    ) -> Result<Self, PlanError> {
        if !(step > 0.0 && step <= 1.0) {
            return Err(PlanError::InvalidRequest(format!(
                "relaxation step must be in (0, 1], got {}",
                step
            )));
        }
        if !(max_change_factor > 0.0 && max_change_factor.is_finite()) {
            return Err(PlanError::InvalidRequest(format!(
                "max change factor must be positive, got {}",
                max_change_factor
            )));
        }
        Ok(Self { step, max_change_factor, protected: protected.into_iter().collect() })
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    pub fn max_change_factor(&self) -> f64 {
        self.max_change_factor
    }

    pub fn is_protected(&self, nutrient: Nutrient) -> bool {
        nutrient.is_always_protected() || self.protected.contains(&nutrient)
    }

    /// ceil(max_change_factor / step)
    pub fn max_iterations(&self) -> u32 {
        // Tolerance keeps e.g. 10 / 0.1 from rounding up to 101.
        ((self.max_change_factor / self.step) - 1e-9).ceil().max(1.0) as u32
    }

    fn loosen(&self, bound: &NutrientBound) -> f64 {
        match bound.side {
            BoundSide::Min => bound.rhs * (1.0 - self.step),
            BoundSide::Max => bound.rhs * (1.0 + self.step),
        }
    }
}

/// Right-hand side of one nutrient row at some point of the relaxation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundSnapshot {
    pub nutrient: Nutrient,
    pub side: BoundSide,
    pub rhs: f64,
}

#[derive(Debug, Clone)]
pub struct RelaxationOutcome {
    pub outcome: SolveOutcome,
    /// True whenever the first solve was infeasible, whether or not relaxing helped.
    pub constraints_loosened: bool,
    pub iterations: u32,
    /// Bounds before the first solve, then after every loosening step.
    pub history: Vec<Vec<BoundSnapshot>>,
    /// The model that produced `outcome`.
    pub final_model: PlanModel,
}

pub struct RelaxationController<'a, B: MilpBackend> {
    backend: &'a B,
    policy: &'a RelaxationPolicy,
}

impl<'a, B: MilpBackend> RelaxationController<'a, B> {
    pub fn new(backend: &'a B, policy: &'a RelaxationPolicy) -> Self {
        Self { backend, policy }
    }

    pub fn run(&self, model: &PlanModel) -> Result<RelaxationOutcome, SolverError> {
        let mut history = vec![snapshot(&model.nutrient_bounds)];
        let initial = self.backend.solve(model)?;
        if initial.is_optimal() {
            return Ok(RelaxationOutcome {
                outcome: initial,
                constraints_loosened: false,
                iterations: 0,
                history,
                final_model: model.clone(),
            });
        }

        info!(
            step = self.policy.step(),
            max_change_factor = self.policy.max_change_factor(),
            "plan model is infeasible, loosening nutrient bounds"
        );

        if let Some(reason) = self.unrecoverable(model) {
            warn!(reason, "relaxation cannot help, giving up");
            return Ok(RelaxationOutcome {
                outcome: SolveOutcome::infeasible(),
                constraints_loosened: true,
                iterations: 0,
                history,
                final_model: model.clone(),
            });
        }

        let max_iterations = self.policy.max_iterations();
        let mut current = model.clone();
        let mut outcome = initial;
        let mut iterations = 0;

        while !outcome.is_optimal() && iterations < max_iterations {
            iterations += 1;
            let bounds = current
                .nutrient_bounds
                .iter()
                .map(|b| {
                    let mut next = b.clone();
                    if !self.policy.is_protected(b.nutrient) {
                        next.rhs = self.policy.loosen(b);
                    }
                    next
                })
                .collect();
            current = current.with_nutrient_bounds(bounds);
            history.push(snapshot(&current.nutrient_bounds));

            debug!(
                iteration = iterations,
                cumulative_change = f64::from(iterations) * self.policy.step(),
                "re-solving with loosened bounds"
            );
            outcome = self.backend.solve(&current)?;
        }

        if outcome.is_optimal() {
            info!(iterations, "found a plan with loosened bounds");
        } else {
            warn!(iterations, "still infeasible after exhausting the relaxation budget");
            outcome = SolveOutcome::infeasible();
        }

        Ok(RelaxationOutcome {
            outcome,
            constraints_loosened: true,
            iterations,
            history,
            final_model: current,
        })
    }

    fn unrecoverable(&self, model: &PlanModel) -> Option<&'static str> {
        let relaxable = model
            .nutrient_bounds
            .iter()
            .any(|b| !self.policy.is_protected(b.nutrient));
        if !relaxable {
            return Some("no relaxable nutrient bound");
        }

        let inverted = model.nutrient_bounds.iter().any(|min| {
            min.side == BoundSide::Min
                && self.policy.is_protected(min.nutrient)
                && model.nutrient_bounds.iter().any(|max| {
                    max.nutrient == min.nutrient && max.side == BoundSide::Max && min.rhs > max.rhs
                })
        });
        if inverted {
            return Some("a protected nutrient has a lower bound above its upper bound");
        }
        None
    }
}

fn snapshot(bounds: &[NutrientBound]) -> Vec<BoundSnapshot> {
    bounds
        .iter()
        .map(|b| BoundSnapshot { nutrient: b.nutrient, side: b.side, rhs: b.rhs })
        .collect()
}
