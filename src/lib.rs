pub mod calendar;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod nutrients;
pub mod optim;
pub mod planner;

pub use catalog::{Recipe, RecipeCatalog, RecipeId};
pub use error::PlanError;
pub use nutrients::Nutrient;
pub use planner::{MealPlan, MealPlanner, PlanRequest};
