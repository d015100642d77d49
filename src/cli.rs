use std::path::PathBuf;

use chrono::NaiveDate;
use clap::Parser;

use crate::calendar::AssemblyStrategy;
use crate::catalog::RecipeId;
use crate::config::PlannerConfig;
use crate::nutrients::Nutrient;
use crate::planner::{PlanRequest, SnackPlacement};

#[derive(Parser, Debug)]
#[command(name = "meal-plan-optim", author, version, about, long_about = None)]
pub struct Cli {
    /// Recipe CSV (number, title, meal_slot, score and nutrient columns)
    #[arg(short, long)]
    pub recipes: PathBuf,

    /// Nutrient targets JSON
    #[arg(short, long)]
    pub targets: PathBuf,

    /// Optional `id,diet_score` CSV
    #[arg(long)]
    pub diet_scores: Option<PathBuf>,

    /// Number of days to plan
    #[arg(short, long, default_value_t = 7)]
    pub days: u32,

    /// First calendar day, defaults to today
    #[arg(long)]
    pub start_date: Option<NaiveDate>,

    /// Recipe ids that must appear at least once
    #[arg(long, value_delimiter = ',')]
    pub include: Vec<RecipeId>,

    /// Recipe ids that must not appear
    #[arg(long, value_delimiter = ',')]
    pub exclude: Vec<RecipeId>,

    /// Nutrients whose bounds are never loosened (energy, sodium and fat always are)
    #[arg(long, value_delimiter = ',')]
    pub protect: Vec<Nutrient>,

    #[arg(long)]
    pub relaxation_step: Option<f64>,

    #[arg(long)]
    pub max_change_factor: Option<f64>,

    /// Calendar layout: `slots` or `calories`
    #[arg(long)]
    pub policy: Option<AssemblyStrategy>,

    /// Spread surplus servings over the days as snacks
    #[arg(long)]
    pub distribute_snacks: bool,

    /// Write the plan here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl Cli {
    /// Merges the flags over `config`; flags win.
    pub fn plan_request(&self, config: &PlannerConfig, today: NaiveDate) -> PlanRequest {
        let mut request = PlanRequest::new(self.days, self.start_date.unwrap_or(today));
        request.include = self.include.clone();
        request.exclude = self.exclude.clone();
        request.protected_nutrients = self.protect.iter().copied().collect();
        request.relaxation_step = self.relaxation_step.unwrap_or(config.relaxation_step);
        request.max_change_factor = self.max_change_factor.unwrap_or(config.max_change_factor);
        request.strategy = self.policy.unwrap_or(config.strategy);
        request.snack_placement = if self.distribute_snacks {
            SnackPlacement::Distributed
        } else {
            config.snack_placement
        };
        request
    }
}

pub fn parse_args() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()
    }

    #[test]
    fn test_minimal_flags_use_config_defaults() {
        let cli = Cli::try_parse_from(["meal-plan-optim", "--recipes", "r.csv", "--targets", "t.json"]).unwrap();
        assert_eq!(cli.days, 7);

        let request = cli.plan_request(&PlannerConfig::default(), today());
        assert_eq!(request.start_date, today());
        assert_eq!(request.relaxation_step, 0.1);
        assert_eq!(request.strategy, AssemblyStrategy::CalorieBalance);
        assert_eq!(request.snack_placement, SnackPlacement::Floating);
        assert!(request.include.is_empty());
    }

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::try_parse_from([
            "meal-plan-optim",
            "--recipes", "r.csv",
            "--targets", "t.json",
            "--days", "3",
            "--start-date", "2024-01-01",
            "--include", "12,40",
            "--exclude", "3",
            "--protect", "fiber,protein",
            "--relaxation-step", "0.5",
            "--policy", "slots",
            "--distribute-snacks",
        ])
        .unwrap();

        let request = cli.plan_request(&PlannerConfig::default(), today());
        assert_eq!(request.horizon_days, 3);
        assert_eq!(request.start_date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(request.include, vec![12, 40]);
        assert_eq!(request.exclude, vec![3]);
        assert!(request.protected_nutrients.contains(&Nutrient::Fiber));
        assert!(request.protected_nutrients.contains(&Nutrient::Protein));
        assert_eq!(request.relaxation_step, 0.5);
        assert_eq!(request.max_change_factor, 10.0);
        assert_eq!(request.strategy, AssemblyStrategy::SlotClassification);
        assert_eq!(request.snack_placement, SnackPlacement::Distributed);
    }

    #[test]
    fn test_unknown_nutrient_is_rejected() {
        let parsed = Cli::try_parse_from([
            "meal-plan-optim", "--recipes", "r.csv", "--targets", "t.json", "--protect", "unobtainium",
        ]);
        assert!(parsed.is_err());
    }
}
