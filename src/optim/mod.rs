pub mod model;
pub mod relaxation;
pub mod report;
pub mod solver;
pub mod targets;

pub use model::{BoundSide, ConstraintModelBuilder, NutrientBound, PlanModel, PlanVariable};
pub use relaxation::{RelaxationController, RelaxationOutcome, RelaxationPolicy};
pub use report::{build_report, ConstraintEntry, ConstraintReport};
pub use solver::{GoodLpBackend, MilpBackend, SolveOutcome, SolveStatus};
pub use targets::{NutrientTarget, NutrientTargets};
