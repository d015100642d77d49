use super::{CalendarDay, MealName, RecipeInstance};

/// Day indices that receive one extra snack when `remainder` snacks are left over.
fn remainder_days(horizon: usize, remainder: usize) -> Vec<usize> {
    if remainder == 0 {
        return Vec::new();
    }
    let stride = (horizon / remainder).max(1);
    (0..remainder).map(|i| i * stride).collect()
}

/// Spreads a snack pool evenly over the days.
///
/// Every day gets `pool / days` snacks; the remainder lands on days `0, stride, 2·stride, …`
/// with `stride = days / remainder`, so extras never sit on neighbouring days when they
/// can avoid it. Pool order is preserved.
pub fn distribute_snacks(days: &mut [CalendarDay], pool: Vec<RecipeInstance>) {
    let horizon = days.len();
    if horizon == 0 || pool.is_empty() {
        return;
    }
    let baseline = pool.len() / horizon;
    let extra_days = remainder_days(horizon, pool.len() % horizon);

    let mut pool = pool.into_iter();
    for (idx, day) in days.iter_mut().enumerate() {
        let count = baseline + usize::from(extra_days.contains(&idx));
        day.recipes.extend(pool.by_ref().take(count).map(|mut snack| {
            snack.meal_name = MealName::Snack;
            snack
        }));
    }
}

/// Moves a day's snacks to their serving points.
///
/// The first ceil(n/2) go right after the last breakfast (start of day if none), the rest
/// right after the last lunch (end of day if none). Relative order is kept.
pub fn place_snacks(day: &mut CalendarDay) {
    let (mut snacks, mut rest): (Vec<RecipeInstance>, Vec<RecipeInstance>) = day
        .recipes
        .drain(..)
        .partition(|r| r.meal_name == MealName::Snack);

    let after_breakfast = rest
        .iter()
        .rposition(|r| r.meal_name == MealName::Breakfast)
        .map_or(0, |i| i + 1);
    let after_lunch = rest
        .iter()
        .rposition(|r| r.meal_name == MealName::Lunch)
        .map_or(rest.len(), |i| i + 1);

    let second_half = snacks.split_off(snacks.len().div_ceil(2));
    let first_half = snacks;

    // Insert at the later point first so the earlier index stays valid.
    if after_lunch >= after_breakfast {
        rest.splice(after_lunch..after_lunch, second_half);
        rest.splice(after_breakfast..after_breakfast, first_half);
    } else {
        rest.splice(after_breakfast..after_breakfast, first_half);
        rest.splice(after_lunch..after_lunch, second_half);
    }
    day.recipes = rest;
}
