use csv::{ReaderBuilder, StringRecord};
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

use super::{MealTags, Recipe, RecipeCatalog, RecipeId};
use crate::error::CatalogError;
use crate::nutrients::{Nutrient, NutrientProfile};

const ID_COL: &str = "number";
const TITLE_COL: &str = "title";
const MEAL_SLOT_COL: &str = "meal_slot";
const SCORE_COL: &str = "score";

const DIET_ID_COL: &str = "id";
const DIET_SCORE_COL: &str = "diet_score";

fn parse_optional_f64(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok()
}

fn column_index(headers: &StringRecord, name: &str) -> Result<usize, CatalogError> {
    headers
        .iter()
        .position(|h| h.trim() == name)
        .ok_or_else(|| CatalogError::MissingColumn(name.to_string()))
}

struct Columns {
    id: usize,
    title: usize,
    meal_slot: usize,
    score: usize,
    // Optional nutrient columns are `None` when the header is absent.
    nutrients: Vec<(Nutrient, Option<usize>)>,
}

impl Columns {
    fn locate(headers: &StringRecord) -> Result<Self, CatalogError> {
        let mut nutrients = Vec::with_capacity(Nutrient::COUNT);
        for nutrient in Nutrient::all() {
            let idx = nutrient
                .column_headers()
                .find_map(|name| column_index(headers, name).ok());
            if idx.is_none() && nutrient.is_constrainable() {
                return Err(CatalogError::MissingColumn(nutrient.column().to_string()));
            }
            nutrients.push((nutrient, idx));
        }

        Ok(Self {
            id: column_index(headers, ID_COL)?,
            title: column_index(headers, TITLE_COL)?,
            meal_slot: column_index(headers, MEAL_SLOT_COL)?,
            score: column_index(headers, SCORE_COL)?,
            nutrients,
        })
    }

    fn parse_row(&self, record: &StringRecord) -> Result<Recipe, String> {
        let id = record
            .get(self.id)
            .and_then(|s| s.trim().parse::<RecipeId>().ok())
            .ok_or("invalid recipe number")?;

        let title = record.get(self.title).map(str::trim).unwrap_or_default();
        if title.is_empty() {
            return Err(format!("recipe {} has an empty title", id));
        }

        // Scores are stored as floats in some exports ("3.0").
        let preference_score = record
            .get(self.score)
            .and_then(parse_optional_f64)
            .map(|s| s.round() as i64)
            .ok_or_else(|| format!("recipe {} has an invalid score", id))?;

        let mut nutrients = NutrientProfile::default();
        for (nutrient, idx) in &self.nutrients {
            let value = idx.and_then(|i| record.get(i)).and_then(parse_optional_f64);
            match value {
                Some(v) => nutrients.set(*nutrient, v),
                None if nutrient.is_constrainable() => {
                    return Err(format!("recipe {} has no value for '{}'", id, nutrient.column()));
                }
                None => {}
            }
        }

        let tags = MealTags::parse(record.get(self.meal_slot).unwrap_or_default());

        Ok(Recipe {
            id,
            title: title.to_string(),
            nutrients,
            tags,
            preference_score,
        })
    }
}

/// Reads a recipe table from any CSV source.
pub fn read_recipe_catalog<R: Read>(reader: R, source: &str) -> Result<RecipeCatalog, CatalogError> {
    let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(reader);
    let headers = rdr.headers()?.clone();
    let columns = Columns::locate(&headers)?;

    let mut recipes = Vec::new();
    for (row_index, result) in rdr.records().enumerate() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                warn!(row = row_index + 1, error = %e, "skipping unreadable recipe row");
                continue;
            }
        };
        match columns.parse_row(&record) {
            Ok(recipe) => recipes.push(recipe),
            Err(reason) => warn!(row = row_index + 1, %reason, "skipping recipe row"),
        }
    }

    if recipes.is_empty() {
        return Err(CatalogError::Empty(source.to_string()));
    }

    info!(count = recipes.len(), source, "loaded recipe catalog");
    Ok(RecipeCatalog::from_recipes(recipes))
}

pub fn load_recipe_catalog(csv_path: &Path) -> Result<RecipeCatalog, CatalogError> {
    if !csv_path.exists() {
        return Err(CatalogError::FileNotFound(csv_path.display().to_string()));
    }
    let file = std::fs::File::open(csv_path)?;
    read_recipe_catalog(file, &csv_path.display().to_string())
}

/// Reads `id,diet_score` rows. Malformed rows are skipped.
pub fn read_diet_scores<R: Read>(reader: R) -> Result<HashMap<RecipeId, f64>, CatalogError> {
    let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(reader);
    let headers = rdr.headers()?.clone();
    let id_idx = column_index(&headers, DIET_ID_COL)?;
    let score_idx = column_index(&headers, DIET_SCORE_COL)?;

    let mut scores = HashMap::new();
    for result in rdr.records() {
        let record = result?;
        let id = record.get(id_idx).and_then(|s| s.trim().parse::<RecipeId>().ok());
        let score = record.get(score_idx).and_then(parse_optional_f64);
        match (id, score) {
            (Some(id), Some(score)) => {
                scores.insert(id, score);
            }
            _ => debug!(?record, "skipping diet score row"),
        }
    }
    Ok(scores)
}

pub fn load_diet_scores(csv_path: &Path) -> Result<HashMap<RecipeId, f64>, CatalogError> {
    if !csv_path.exists() {
        return Err(CatalogError::FileNotFound(csv_path.display().to_string()));
    }
    let file = std::fs::File::open(csv_path)?;
    read_diet_scores(file)
}
