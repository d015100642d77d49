use serde::{Deserialize, Serialize};
use std::fmt;

use crate::nutrients::{Nutrient, NutrientProfile};

pub type RecipeId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealTag {
    Breakfast,
    Lunch,
    Dinner,
    Main,
    Snack,
    Side,
}

impl MealTag {
    fn from_token(token: &str) -> Option<Self> {
        match token.to_lowercase().as_str() {
            "breakfast" => Some(MealTag::Breakfast),
            "lunch" => Some(MealTag::Lunch),
            "dinner" => Some(MealTag::Dinner),
            "main" => Some(MealTag::Main),
            "snack" => Some(MealTag::Snack),
            "side" => Some(MealTag::Side),
            _ => None,
        }
    }
}

impl fmt::Display for MealTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MealTag::Breakfast => "breakfast",
            MealTag::Lunch => "lunch",
            MealTag::Dinner => "dinner",
            MealTag::Main => "main",
            MealTag::Snack => "snack",
            MealTag::Side => "side",
        };
        f.write_str(s)
    }
}

/// Ordered, de-duplicated set of meal-slot tags for a recipe.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MealTags(Vec<MealTag>);

impl MealTags {
    pub fn new(tags: &[MealTag]) -> Self {
        let mut set = MealTags::default();
        for tag in tags {
            set.push(*tag);
        }
        set
    }

    /// Parses the dataset's stringified list, e.g. `"['lunch', 'side']"`.
    ///
    /// Quotes and brackets are stripped per token, so damaged entries such as
    /// `"['side','snack]"` still parse. Unknown tokens are dropped.
    pub fn parse(raw: &str) -> Self {
        let mut set = MealTags::default();
        for token in raw.split(',') {
            let cleaned = token.trim_matches(|c: char| c.is_whitespace() || matches!(c, '[' | ']' | '\'' | '"'));
            if let Some(tag) = MealTag::from_token(cleaned) {
                set.push(tag);
            }
        }
        set
    }

    fn push(&mut self, tag: MealTag) {
        if !self.0.contains(&tag) {
            self.0.push(tag);
        }
    }

    pub fn contains(&self, tag: MealTag) -> bool {
        self.0.contains(&tag)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MealTag> {
        self.0.iter()
    }
}

#[derive(Debug, Clone)]
pub struct Recipe {
    pub id: RecipeId,
    pub title: String,
    pub nutrients: NutrientProfile,
    pub tags: MealTags,
    pub preference_score: i64,
}

impl Recipe {
    pub fn new(id: RecipeId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            nutrients: NutrientProfile::default(),
            tags: MealTags::default(),
            preference_score: 1,
        }
    }

    pub fn with_nutrient(mut self, nutrient: Nutrient, value: f64) -> Self {
        self.nutrients.set(nutrient, value);
        self
    }

    pub fn with_tags(mut self, tags: &[MealTag]) -> Self {
        self.tags = MealTags::new(tags);
        self
    }

    pub fn with_preference(mut self, score: i64) -> Self {
        self.preference_score = score;
        self
    }

    pub fn calories(&self) -> Option<f64> {
        self.nutrients.get(Nutrient::Energy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_python_style_list() {
        let tags = MealTags::parse("['lunch', 'side']");
        assert_eq!(tags, MealTags::new(&[MealTag::Lunch, MealTag::Side]));
    }

    #[test]
    fn test_parse_damaged_list() {
        let tags = MealTags::parse("\"['side','snack]\"");
        assert_eq!(tags, MealTags::new(&[MealTag::Side, MealTag::Snack]));
    }

    #[test]
    fn test_parse_drops_unknown_and_duplicates() {
        let tags = MealTags::parse("['Breakfast', 'brunch', 'breakfast']");
        assert_eq!(tags.len(), 1);
        assert!(tags.contains(MealTag::Breakfast));
    }

    #[test]
    fn test_parse_empty() {
        assert!(MealTags::parse("[]").is_empty());
    }
}
