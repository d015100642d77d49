use chrono::NaiveDate;
use tracing::debug;

use super::{date_groups, AssembledCalendar, AssemblyPolicy, MealName, RecipeInstance};
use crate::error::AssemblyError;

pub const LUNCH_PER_DAY: usize = 1;
pub const DINNER_PER_DAY: usize = 1;
pub const SNACKS_PER_DAY: usize = 2;
pub const SIDES_PER_DAY: usize = 2;

/// Breakfasts per day for a given number of recipes per day.
pub fn breakfasts_per_day(daily_recipes: usize) -> usize {
    match daily_recipes {
        8 => 2,
        7 => 1,
        _ => 3,
    }
}

/// Per-slot lists filled while classifying instances.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SlotBuckets {
    pub breakfast: Vec<RecipeInstance>,
    pub lunch: Vec<RecipeInstance>,
    pub dinner: Vec<RecipeInstance>,
    pub snack: Vec<RecipeInstance>,
    pub side: Vec<RecipeInstance>,
    pub overflow: Vec<RecipeInstance>,
    pub breakfasts_per_day: usize,
}

impl SlotBuckets {
    fn bucket(&mut self, name: MealName) -> &mut Vec<RecipeInstance> {
        match name {
            MealName::Breakfast => &mut self.breakfast,
            MealName::Lunch => &mut self.lunch,
            MealName::Dinner => &mut self.dinner,
            MealName::Snack => &mut self.snack,
            MealName::Side => &mut self.side,
        }
    }

    fn len(&self, name: MealName) -> usize {
        match name {
            MealName::Breakfast => self.breakfast.len(),
            MealName::Lunch => self.lunch.len(),
            MealName::Dinner => self.dinner.len(),
            MealName::Snack => self.snack.len(),
            MealName::Side => self.side.len(),
        }
    }

    fn push(&mut self, name: MealName, mut instance: RecipeInstance) {
        instance.meal_name = name;
        self.bucket(name).push(instance);
    }
}

struct Quotas {
    breakfast: usize,
    lunch: usize,
    dinner: usize,
    snack: usize,
    side: usize,
}

impl Quotas {
    fn for_horizon(horizon: usize, breakfasts_per_day: usize) -> Self {
        Self {
            breakfast: breakfasts_per_day * horizon,
            lunch: LUNCH_PER_DAY * horizon,
            dinner: DINNER_PER_DAY * horizon,
            snack: SNACKS_PER_DAY * horizon,
            side: SIDES_PER_DAY * horizon,
        }
    }

    fn limit(&self, name: MealName) -> usize {
        match name {
            MealName::Breakfast => self.breakfast,
            MealName::Lunch => self.lunch,
            MealName::Dinner => self.dinner,
            MealName::Snack => self.snack,
            MealName::Side => self.side,
        }
    }
}

/// Sorts instances into slot lists under per-horizon quotas.
///
/// Recipes that find no room overflow, except multi-tag recipes, which fall back to a
/// free snack slot first.
pub fn classify(instances: Vec<RecipeInstance>, horizon_days: u32) -> SlotBuckets {
    let horizon = (horizon_days as usize).max(1);
    let k = breakfasts_per_day(instances.len() / horizon);
    let quotas = Quotas::for_horizon(horizon, k);
    let mut buckets = SlotBuckets { breakfasts_per_day: k, ..SlotBuckets::default() };

    for instance in instances {
        let priority = if instance.meal_slot.len() > 1 {
            MealName::MULTI_TAG_PRIORITY
        } else {
            MealName::SINGLE_TAG_PRIORITY
        };
        let slot = priority
            .into_iter()
            .find(|name| name.accepts(&instance.meal_slot) && buckets.len(*name) < quotas.limit(*name));

        let snack_has_room = buckets.len(MealName::Snack) < quotas.limit(MealName::Snack);
        match slot {
            Some(name) => buckets.push(name, instance),
            None if instance.meal_slot.len() > 1 && snack_has_room => buckets.push(MealName::Snack, instance),
            None => {
                debug!(recipe_id = instance.id, "no slot left, sending to overflow");
                let mut instance = instance;
                instance.meal_name = MealName::Snack;
                buckets.overflow.push(instance);
            }
        }
    }
    buckets
}

fn require(category: &str, list: &[RecipeInstance], required: usize) -> Result<(), AssemblyError> {
    if list.len() < required {
        return Err(AssemblyError::InsufficientRecipes {
            category: category.to_string(),
            required,
            available: list.len(),
        });
    }
    Ok(())
}

fn slice(list: &[RecipeInstance], start: usize, end: usize) -> &[RecipeInstance] {
    let end = end.min(list.len());
    &list[start.min(end)..end]
}

/// Day layout: breakfasts, snack, lunch, snack, dinner, sides.
pub struct SlotClassificationPolicy;

impl AssemblyPolicy for SlotClassificationPolicy {
    fn assemble(
        &self,
        instances: Vec<RecipeInstance>,
        horizon_days: u32,
        start_date: NaiveDate,
    ) -> Result<AssembledCalendar, AssemblyError> {
        let h = horizon_days as usize;
        let buckets = classify(instances, horizon_days);

        require("lunch", &buckets.lunch, h * LUNCH_PER_DAY)?;
        require("dinner", &buckets.dinner, h * DINNER_PER_DAY)?;
        require("snack", &buckets.snack, h * SNACKS_PER_DAY)?;

        let k = buckets.breakfasts_per_day;
        let mut groups = Vec::with_capacity(h);
        for i in 0..h {
            let mut day = Vec::with_capacity(k + 6);
            day.extend_from_slice(slice(&buckets.breakfast, i * k, (i + 1) * k));
            day.push(buckets.snack[2 * i].clone());
            day.push(buckets.lunch[i].clone());
            day.push(buckets.snack[2 * i + 1].clone());
            day.push(buckets.dinner[i].clone());
            day.extend_from_slice(slice(&buckets.side, 2 * i, 2 * i + 2));
            groups.push(day);
        }

        let mut overflow = buckets.overflow;
        for (list, used) in [
            (buckets.breakfast, h * k),
            (buckets.lunch, h),
            (buckets.dinner, h),
            (buckets.snack, 2 * h),
            (buckets.side, 2 * h),
        ] {
            overflow.extend(list.into_iter().skip(used).map(|mut instance| {
                instance.meal_name = MealName::Snack;
                instance
            }));
        }

        Ok(AssembledCalendar {
            days: date_groups(start_date, horizon_days, groups)?,
            overflow,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::test_support::instance;
    use crate::catalog::{MealTag, RecipeId};

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    fn ids(list: &[RecipeInstance]) -> Vec<RecipeId> {
        list.iter().map(|i| i.id).collect()
    }

    #[test]
    fn test_breakfast_quota_by_daily_count() {
        assert_eq!(breakfasts_per_day(9), 3);
        assert_eq!(breakfasts_per_day(8), 2);
        assert_eq!(breakfasts_per_day(7), 1);
        assert_eq!(breakfasts_per_day(12), 3);
        assert_eq!(breakfasts_per_day(2), 3);
    }

    #[test]
    fn test_repeated_breakfast_fills_breakfast_list() {
        let oats = instance(1, 350.0, &[MealTag::Breakfast]);
        let buckets = classify(vec![oats.clone(), oats], 1);
        assert_eq!(ids(&buckets.breakfast), vec![1, 1]);
        assert!(buckets.breakfast.iter().all(|i| i.meal_name == MealName::Breakfast));
        assert!(buckets.overflow.is_empty());
    }

    #[test]
    fn test_multi_tag_priority_and_fallback() {
        let instances = vec![
            instance(1, 300.0, &[MealTag::Side, MealTag::Lunch]),
            instance(2, 300.0, &[MealTag::Lunch, MealTag::Dinner]),
            instance(3, 300.0, &[MealTag::Lunch, MealTag::Main]),
            instance(4, 300.0, &[MealTag::Lunch, MealTag::Breakfast]),
        ];
        let buckets = classify(instances, 1);
        assert_eq!(ids(&buckets.lunch), vec![1]);
        assert_eq!(ids(&buckets.dinner), vec![2]);
        assert_eq!(ids(&buckets.breakfast), vec![4]);
        // Lunch and dinner are both full for id 3.
        assert_eq!(ids(&buckets.snack), vec![3]);
        assert_eq!(buckets.snack[0].meal_name, MealName::Snack);
    }

    #[test]
    fn test_multi_tag_fallback_respects_snack_quota() {
        let instances = vec![
            instance(1, 500.0, &[MealTag::Lunch]),
            instance(2, 90.0, &[MealTag::Snack]),
            instance(3, 90.0, &[MealTag::Snack]),
            instance(4, 300.0, &[MealTag::Lunch, MealTag::Side]),
            instance(5, 300.0, &[MealTag::Lunch, MealTag::Side]),
            instance(6, 300.0, &[MealTag::Lunch, MealTag::Side]),
            instance(7, 300.0, &[MealTag::Lunch, MealTag::Breakfast]),
        ];
        let buckets = classify(instances, 1);
        // 4 and 5 take the side slots; 6 finds lunch, sides and snacks all full.
        assert_eq!(ids(&buckets.side), vec![4, 5]);
        assert_eq!(ids(&buckets.snack), vec![2, 3]);
        assert_eq!(ids(&buckets.overflow), vec![6]);
        assert_eq!(buckets.overflow[0].meal_name, MealName::Snack);
        assert_eq!(ids(&buckets.breakfast), vec![7]);
    }

    #[test]
    fn test_single_tag_without_room_overflows() {
        let instances = vec![
            instance(1, 500.0, &[MealTag::Lunch]),
            instance(2, 500.0, &[MealTag::Lunch]),
        ];
        let buckets = classify(instances, 1);
        assert_eq!(ids(&buckets.lunch), vec![1]);
        assert_eq!(ids(&buckets.overflow), vec![2]);
    }

    fn full_day_instances() -> Vec<RecipeInstance> {
        vec![
            instance(1, 300.0, &[MealTag::Breakfast]),
            instance(2, 250.0, &[MealTag::Breakfast]),
            instance(3, 200.0, &[MealTag::Breakfast]),
            instance(4, 500.0, &[MealTag::Lunch]),
            instance(5, 700.0, &[MealTag::Dinner]),
            instance(6, 90.0, &[MealTag::Snack]),
            instance(7, 110.0, &[MealTag::Snack]),
            instance(8, 150.0, &[MealTag::Side]),
            instance(9, 120.0, &[MealTag::Side]),
        ]
    }

    #[test]
    fn test_day_layout() {
        let calendar = SlotClassificationPolicy.assemble(full_day_instances(), 1, start()).unwrap();
        assert_eq!(calendar.days.len(), 1);
        assert_eq!(ids(&calendar.days[0].recipes), vec![1, 2, 3, 6, 4, 7, 5, 8, 9]);
        let names: Vec<MealName> = calendar.days[0].recipes.iter().map(|r| r.meal_name).collect();
        assert_eq!(names[4], MealName::Lunch);
        assert_eq!(names[6], MealName::Dinner);
        assert!(calendar.overflow.is_empty());
    }

    #[test]
    fn test_eight_per_day_uses_two_breakfasts() {
        let mut instances = full_day_instances();
        instances.remove(2);
        let calendar = SlotClassificationPolicy.assemble(instances, 1, start()).unwrap();
        assert_eq!(ids(&calendar.days[0].recipes), vec![1, 2, 6, 4, 7, 5, 8, 9]);
        assert!(calendar.overflow.is_empty());
    }

    #[test]
    fn test_shortage_is_a_typed_error() {
        let mut instances = full_day_instances();
        instances.retain(|i| i.id != 4);
        let err = SlotClassificationPolicy.assemble(instances, 1, start()).unwrap_err();
        match err {
            AssemblyError::InsufficientRecipes { category, required, available } => {
                assert_eq!(category, "lunch");
                assert_eq!((required, available), (1, 0));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_seven_per_day_keeps_one_breakfast() {
        let mut instances = full_day_instances();
        instances.retain(|i| i.id != 9 && i.id != 8);
        let calendar = SlotClassificationPolicy.assemble(instances, 1, start()).unwrap();
        // No sides were selected, so the day is simply shorter.
        assert_eq!(ids(&calendar.days[0].recipes), vec![1, 6, 4, 7, 5]);
        assert_eq!(ids(&calendar.overflow), vec![2, 3]);
    }

    #[test]
    fn test_extra_multi_tag_snacks_overflow() {
        let mut instances = full_day_instances();
        instances.push(instance(10, 80.0, &[MealTag::Snack, MealTag::Side]));
        let calendar = SlotClassificationPolicy.assemble(instances, 1, start()).unwrap();
        assert_eq!(ids(&calendar.overflow), vec![10]);
        assert_eq!(calendar.snacks()[0].multiplicity, 1);
    }
}
