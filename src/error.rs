use thiserror::Error;

use crate::catalog::RecipeId;
use crate::nutrients::Nutrient;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("recipe file not found at: {0}")]
    FileNotFound(String),
    #[error("failed to read recipe data: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to read recipe data: {0}")]
    Io(#[from] std::io::Error),
    #[error("column '{0}' not found")]
    MissingColumn(String),
    #[error("no valid recipes loaded from {0}")]
    Empty(String),
}

#[derive(Debug, Error)]
pub enum TargetError {
    #[error("unknown nutrient '{0}'")]
    UnknownNutrient(String),
    #[error("nutrient '{0}' cannot be constrained")]
    NotConstrainable(Nutrient),
    #[error("malformed target value for '{key}': {reason}")]
    MalformedValue { key: String, reason: String },
    #[error("failed to parse targets: {0}")]
    Json(#[from] serde_json::Error),
}

/// Raised while turning targets and a catalog into a solver model. Never retried.
#[derive(Debug, Error)]
pub enum ModelBuildError {
    #[error("recipe {recipe_id} has no value for targeted nutrient '{nutrient}'")]
    MissingNutrient { recipe_id: RecipeId, nutrient: Nutrient },
    #[error("included recipe {0} is not in the catalog")]
    UnknownRecipe(RecipeId),
    #[error("plan horizon must be at least one day")]
    InvalidHorizon,
}

#[derive(Debug, Error)]
pub enum SolverError {
    #[error("solver backend failed: {0}")]
    Backend(String),
    #[error("solver returned an unbounded model")]
    Unbounded,
}

#[derive(Debug, Error)]
pub enum AssemblyError {
    #[error(
        "insufficient recipes for requested plan shape: {category} needs {required}, only {available} selected"
    )]
    InsufficientRecipes {
        category: String,
        required: usize,
        available: usize,
    },
    #[error("selected recipe {0} is not in the catalog")]
    UnknownRecipe(RecipeId),
    #[error("plan dates starting at {0} run past the supported calendar range")]
    DateOutOfRange(chrono::NaiveDate),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {var}")]
    InvalidValue { var: String, value: String },
}

/// Everything a single planning request can fail with.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Target(#[from] TargetError),
    #[error(transparent)]
    ModelBuild(#[from] ModelBuildError),
    #[error(transparent)]
    Solver(#[from] SolverError),
    #[error(transparent)]
    Assembly(#[from] AssemblyError),
    #[error("invalid plan request: {0}")]
    InvalidRequest(String),
}
