pub mod data_loader;
pub mod recipe;

pub use data_loader::{load_diet_scores, load_recipe_catalog, read_diet_scores, read_recipe_catalog};
pub use recipe::{MealTag, MealTags, Recipe, RecipeId};

use std::collections::{BTreeMap, HashMap};

/// Weight used for recipes the diet-fit mapping does not mention.
pub const NEUTRAL_DIET_SCORE: f64 = 1.0;

/// Read-only view of the recipes available to one planning request.
///
/// Built explicitly and handed to the planner, so tests can run against their own data.
/// Recipes iterate in ascending id order.
#[derive(Debug, Clone, Default)]
pub struct RecipeCatalog {
    recipes: BTreeMap<RecipeId, Recipe>,
    diet_scores: HashMap<RecipeId, f64>,
}

impl RecipeCatalog {
    pub fn new(recipes: impl IntoIterator<Item = Recipe>, diet_scores: HashMap<RecipeId, f64>) -> Self {
        let recipes = recipes.into_iter().map(|r| (r.id, r)).collect();
        Self { recipes, diet_scores }
    }

    pub fn from_recipes(recipes: impl IntoIterator<Item = Recipe>) -> Self {
        Self::new(recipes, HashMap::new())
    }

    pub fn with_diet_scores(mut self, diet_scores: HashMap<RecipeId, f64>) -> Self {
        self.diet_scores = diet_scores;
        self
    }

    pub fn get(&self, id: RecipeId) -> Option<&Recipe> {
        self.recipes.get(&id)
    }

    pub fn contains(&self, id: RecipeId) -> bool {
        self.recipes.contains_key(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Recipe> {
        self.recipes.values()
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }

    pub fn calories(&self, id: RecipeId) -> Option<f64> {
        self.get(id).and_then(Recipe::calories)
    }

    pub fn diet_score(&self, id: RecipeId) -> f64 {
        self.diet_scores.get(&id).copied().unwrap_or(NEUTRAL_DIET_SCORE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nutrients::Nutrient;

    #[test]
    fn test_catalog_orders_by_id_and_defaults_diet_score() {
        let catalog = RecipeCatalog::from_recipes(vec![
            Recipe::new(9, "Toast").with_nutrient(Nutrient::Energy, 120.0),
            Recipe::new(2, "Soup").with_nutrient(Nutrient::Energy, 300.0),
        ])
        .with_diet_scores(HashMap::from([(9, 0.5)]));

        let ids: Vec<RecipeId> = catalog.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![2, 9]);
        assert_eq!(catalog.diet_score(9), 0.5);
        assert_eq!(catalog.diet_score(2), NEUTRAL_DIET_SCORE);
        assert_eq!(catalog.get(2).and_then(|r| r.calories()), Some(300.0));
    }
}
