//! Turns a solved multiplicity map into dated days of meals.

pub mod assembler;
pub mod calorie_balance;
pub mod placement;
pub mod slot_classification;

pub use assembler::{AssembledCalendar, AssemblyPolicy, AssemblyStrategy, CalendarAssembler};
pub use calorie_balance::CalorieBalancePolicy;
pub use placement::{distribute_snacks, place_snacks};
pub use slot_classification::SlotClassificationPolicy;

use chrono::{Days, NaiveDate};
use serde::Serialize;

use crate::catalog::{MealTag, MealTags, Recipe, RecipeId};
use crate::error::AssemblyError;
use crate::nutrients::Nutrient;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MealName {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
    Side,
}

impl MealName {
    /// Priority used for recipes that fit more than one slot.
    pub const MULTI_TAG_PRIORITY: [MealName; 5] =
        [MealName::Lunch, MealName::Breakfast, MealName::Dinner, MealName::Snack, MealName::Side];

    pub const SINGLE_TAG_PRIORITY: [MealName; 5] =
        [MealName::Breakfast, MealName::Snack, MealName::Lunch, MealName::Dinner, MealName::Side];

    /// Whether a recipe with these tags can be served in this slot. `dinner` and `main` both fit Dinner.
    pub fn accepts(self, tags: &MealTags) -> bool {
        match self {
            MealName::Breakfast => tags.contains(MealTag::Breakfast),
            MealName::Lunch => tags.contains(MealTag::Lunch),
            MealName::Dinner => tags.contains(MealTag::Main) || tags.contains(MealTag::Dinner),
            MealName::Snack => tags.contains(MealTag::Snack),
            MealName::Side => tags.contains(MealTag::Side),
        }
    }

    /// First slot in multi-tag priority the tags allow, Snack when none does.
    pub fn for_tags(tags: &MealTags) -> MealName {
        Self::MULTI_TAG_PRIORITY
            .into_iter()
            .find(|name| name.accepts(tags))
            .unwrap_or(MealName::Snack)
    }
}

/// One serving of a recipe on the calendar.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecipeInstance {
    pub id: RecipeId,
    pub title: String,
    pub calories: f64,
    pub protein: f64,
    pub carbohydrates: f64,
    pub fat: f64,
    pub meal_slot: MealTags,
    pub meal_name: MealName,
}

impl RecipeInstance {
    pub fn from_recipe(recipe: &Recipe) -> Self {
        let value = |n: Nutrient| recipe.nutrients.get(n).unwrap_or(0.0);
        Self {
            id: recipe.id,
            title: recipe.title.clone(),
            calories: value(Nutrient::Energy),
            protein: value(Nutrient::Protein),
            carbohydrates: value(Nutrient::Carbohydrates),
            fat: value(Nutrient::Fat),
            meal_slot: recipe.tags.clone(),
            meal_name: MealName::for_tags(&recipe.tags),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalendarDay {
    /// `YYYY-MM-DD`
    pub date: String,
    /// e.g. `Monday January 06`
    pub weekday: String,
    pub recipes: Vec<RecipeInstance>,
}

impl CalendarDay {
    pub fn new(date: NaiveDate, recipes: Vec<RecipeInstance>) -> Self {
        Self {
            date: date.format("%Y-%m-%d").to_string(),
            weekday: date.format("%A %B %d").to_string(),
            recipes,
        }
    }

    pub fn calories(&self) -> f64 {
        self.recipes.iter().map(|r| r.calories).sum()
    }
}

/// A recipe that did not fit on the calendar, with how many servings were left over.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnackEntry {
    pub id: RecipeId,
    pub name: String,
    pub calories: f64,
    pub multiplicity: u32,
}

/// Collapses instances into per-recipe entries, keeping first-seen order.
pub fn snack_entries(instances: &[RecipeInstance]) -> Vec<SnackEntry> {
    let mut entries: Vec<SnackEntry> = Vec::new();
    for instance in instances {
        match entries.iter_mut().find(|e| e.id == instance.id) {
            Some(entry) => entry.multiplicity += 1,
            None => entries.push(SnackEntry {
                id: instance.id,
                name: instance.title.clone(),
                calories: instance.calories,
                multiplicity: 1,
            }),
        }
    }
    entries
}

/// Dates consecutive groups starting at `start`. Missing groups become empty days.
pub fn date_groups(
    start: NaiveDate,
    horizon_days: u32,
    mut groups: Vec<Vec<RecipeInstance>>,
) -> Result<Vec<CalendarDay>, AssemblyError> {
    groups.resize_with(groups.len().max(horizon_days as usize), Vec::new);
    groups
        .into_iter()
        .enumerate()
        .map(|(i, recipes)| {
            let date = start
                .checked_add_days(Days::new(i as u64))
                .ok_or(AssemblyError::DateOutOfRange(start))?;
            Ok(CalendarDay::new(date, recipes))
        })
        .collect()
}


#[cfg(test)]
mod tests {
    use super::test_support::instance;
    use super::*;

    #[test]
    fn test_meal_name_for_tags() {
        assert_eq!(MealName::for_tags(&MealTags::new(&[MealTag::Side, MealTag::Lunch])), MealName::Lunch);
        assert_eq!(MealName::for_tags(&MealTags::new(&[MealTag::Dinner])), MealName::Dinner);
        assert_eq!(MealName::for_tags(&MealTags::new(&[MealTag::Side, MealTag::Snack])), MealName::Snack);
        assert_eq!(MealName::for_tags(&MealTags::default()), MealName::Snack);
    }

    #[test]
    fn test_calendar_day_labels() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 6).unwrap();
        let day = CalendarDay::new(date, vec![]);
        assert_eq!(day.date, "2025-01-06");
        assert_eq!(day.weekday, "Monday January 06");
    }

    #[test]
    fn test_snack_entries_group_by_recipe() {
        let pool = vec![
            instance(4, 90.0, &[MealTag::Snack]),
            instance(2, 150.0, &[MealTag::Side]),
            instance(4, 90.0, &[MealTag::Snack]),
        ];
        let entries = snack_entries(&pool);
        assert_eq!(entries.len(), 2);
        assert_eq!((entries[0].id, entries[0].multiplicity), (4, 2));
        assert_eq!((entries[1].id, entries[1].multiplicity), (2, 1));
    }

    #[test]
    fn test_date_groups_pads_to_horizon() {
        let start = NaiveDate::from_ymd_opt(2024, 2, 28).unwrap();
        let days = date_groups(start, 3, vec![vec![instance(1, 100.0, &[])]]).unwrap();
        let dates: Vec<&str> = days.iter().map(|d| d.date.as_str()).collect();
        assert_eq!(dates, vec!["2024-02-28", "2024-02-29", "2024-03-01"]);
        assert!(days[2].recipes.is_empty());
    }
}
