use chrono::NaiveDate;
use tracing::debug;

use super::{date_groups, AssembledCalendar, AssemblyPolicy, MealName, RecipeInstance};
use crate::catalog::RecipeId;
use crate::error::AssemblyError;

pub const RECIPES_PER_DAY: usize = 3;

/// Removes the lowest-calorie servings until at most `target` remain.
///
/// Recipes are drained one at a time, lowest calories first; every serving of one recipe
/// goes before the next recipe is touched. Returns the evicted instances in eviction order.
pub fn evict_lowest_calorie(instances: &mut Vec<RecipeInstance>, target: usize) -> Vec<RecipeInstance> {
    let mut evicted = Vec::new();
    if instances.len() <= target {
        return evicted;
    }

    let mut by_calories: Vec<(RecipeId, f64)> = Vec::new();
    for instance in instances.iter() {
        if !by_calories.iter().any(|(id, _)| *id == instance.id) {
            by_calories.push((instance.id, instance.calories));
        }
    }
    // Descending, so the cheapest recipe sits at the tail.
    by_calories.sort_by(|a, b| b.1.total_cmp(&a.1));

    while instances.len() > target {
        let Some((id, _)) = by_calories.pop() else {
            break;
        };
        while instances.len() > target {
            let Some(pos) = instances.iter().rposition(|i| i.id == id) else {
                break;
            };
            let mut instance = instances.remove(pos);
            instance.meal_name = MealName::Snack;
            evicted.push(instance);
        }
    }
    evicted
}

/// Orders servings so each consecutive triple mixes low, medium and high calories.
///
/// Sorted ascending and cut into thirds; the low and high thirds are reversed and the
/// three are then interleaved round-robin.
pub fn interleave_by_calories(mut instances: Vec<RecipeInstance>) -> Vec<RecipeInstance> {
    instances.sort_by(|a, b| a.calories.total_cmp(&b.calories));

    let n = instances.len();
    let mut high = instances.split_off(2 * n / 3);
    let mid = instances.split_off(n / 3);
    let mut low = instances;
    low.reverse();
    high.reverse();

    let longest = low.len().max(mid.len()).max(high.len());
    let mut low = low.into_iter();
    let mut mid = mid.into_iter();
    let mut high = high.into_iter();
    let mut ordered = Vec::with_capacity(n);
    for _ in 0..longest {
        ordered.extend(low.next());
        ordered.extend(mid.next());
        ordered.extend(high.next());
    }
    ordered
}

/// Three servings per day with balanced calories; surplus becomes extra snacks.
///
/// The returned days run from the last date back to `start_date`, the order existing
/// consumers of the plan expect.
pub struct CalorieBalancePolicy;

impl AssemblyPolicy for CalorieBalancePolicy {
    fn assemble(
        &self,
        mut instances: Vec<RecipeInstance>,
        horizon_days: u32,
        start_date: NaiveDate,
    ) -> Result<AssembledCalendar, AssemblyError> {
        let capacity = RECIPES_PER_DAY * horizon_days as usize;
        let overflow = evict_lowest_calorie(&mut instances, capacity);
        if !overflow.is_empty() {
            debug!(evicted = overflow.len(), capacity, "moved low-calorie servings to extra snacks");
        }

        let ordered = interleave_by_calories(instances);
        let groups: Vec<Vec<RecipeInstance>> = ordered
            .chunks(RECIPES_PER_DAY)
            .map(|chunk| chunk.to_vec())
            .collect();

        let mut days = date_groups(start_date, horizon_days, groups)?;
        for day in &days {
            debug!(date = day.date.as_str(), calories = day.calories(), "balanced day");
        }
        days.reverse();

        Ok(AssembledCalendar { days, overflow })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::test_support::instance;
    use crate::catalog::MealTag;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    fn calories(list: &[RecipeInstance]) -> Vec<f64> {
        list.iter().map(|i| i.calories).collect()
    }

    fn nine_recipes() -> Vec<RecipeInstance> {
        (1..=9).map(|i| instance(i, f64::from(i * 10), &[MealTag::Lunch])).collect()
    }

    #[test]
    fn test_interleave_scenario() {
        let ordered = interleave_by_calories(nine_recipes());
        assert_eq!(
            calories(&ordered),
            vec![30.0, 40.0, 90.0, 20.0, 50.0, 80.0, 10.0, 60.0, 70.0]
        );
    }

    #[test]
    fn test_interleave_uneven_thirds() {
        let list: Vec<RecipeInstance> = (1..=5).map(|i| instance(i, f64::from(i * 10), &[])).collect();
        // low [10], mid [20, 30], high [50, 40]
        assert_eq!(calories(&interleave_by_calories(list)), vec![10.0, 20.0, 50.0, 30.0, 40.0]);
    }

    #[test]
    fn test_days_are_dated_then_reversed() {
        let calendar = CalorieBalancePolicy.assemble(nine_recipes(), 3, start()).unwrap();
        let dates: Vec<&str> = calendar.days.iter().map(|d| d.date.as_str()).collect();
        assert_eq!(dates, vec!["2024-01-03", "2024-01-02", "2024-01-01"]);
        assert_eq!(calories(&calendar.days[2].recipes), vec![30.0, 40.0, 90.0]);
        assert_eq!(calories(&calendar.days[0].recipes), vec![10.0, 60.0, 70.0]);
        assert!(calendar.overflow.is_empty());
        assert!(calendar.days[0].recipes.iter().all(|r| r.meal_name == MealName::Lunch));
    }

    #[test]
    fn test_eviction_drains_cheapest_recipe_first() {
        let mut list = vec![
            instance(1, 500.0, &[MealTag::Dinner]),
            instance(2, 80.0, &[MealTag::Snack]),
            instance(2, 80.0, &[MealTag::Snack]),
            instance(3, 120.0, &[MealTag::Side]),
            instance(4, 300.0, &[MealTag::Breakfast]),
        ];
        let evicted = evict_lowest_calorie(&mut list, 2);
        assert_eq!(evicted.iter().map(|i| i.id).collect::<Vec<_>>(), vec![2, 2, 3]);
        assert_eq!(list.iter().map(|i| i.id).collect::<Vec<_>>(), vec![1, 4]);
    }

    #[test]
    fn test_surplus_becomes_snack_entries() {
        let mut list = nine_recipes();
        list.push(instance(10, 5.0, &[MealTag::Snack]));
        list.push(instance(10, 5.0, &[MealTag::Snack]));
        let calendar = CalorieBalancePolicy.assemble(list, 3, start()).unwrap();

        let snacks = calendar.snacks();
        assert_eq!(snacks.len(), 1);
        assert_eq!((snacks[0].id, snacks[0].multiplicity), (10, 2));
        assert_eq!(calendar.days.iter().map(|d| d.recipes.len()).sum::<usize>(), 9);
    }

    #[test]
    fn test_short_selection_leaves_empty_days() {
        let list = vec![instance(1, 400.0, &[MealTag::Lunch])];
        let calendar = CalorieBalancePolicy.assemble(list, 2, start()).unwrap();
        assert_eq!(calendar.days.len(), 2);
        // Reversed: the first entry is the later, empty day.
        assert!(calendar.days[0].recipes.is_empty());
        assert_eq!(calendar.days[1].recipes.len(), 1);
    }
}
