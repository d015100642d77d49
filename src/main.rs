use anyhow::{Context, Result};
use chrono::Local;
use tokio::fs;
use tracing::info;

use meal_plan_optim::catalog::{read_diet_scores, read_recipe_catalog};
use meal_plan_optim::cli::parse_args;
use meal_plan_optim::config::PlannerConfig;
use meal_plan_optim::logging;
use meal_plan_optim::optim::{GoodLpBackend, NutrientTargets};
use meal_plan_optim::planner::MealPlanner;

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let config = PlannerConfig::from_env().context("Invalid planner configuration in environment")?;
    let cli_args = parse_args();

    let recipes_csv = fs::read_to_string(&cli_args.recipes)
        .await
        .with_context(|| format!("Failed to read recipe file '{}'", cli_args.recipes.display()))?;
    let mut catalog = read_recipe_catalog(recipes_csv.as_bytes(), &cli_args.recipes.display().to_string())
        .with_context(|| format!("Failed to load recipes from '{}'", cli_args.recipes.display()))?;

    if let Some(path) = &cli_args.diet_scores {
        let scores_csv = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read diet score file '{}'", path.display()))?;
        let scores = read_diet_scores(scores_csv.as_bytes())
            .with_context(|| format!("Failed to load diet scores from '{}'", path.display()))?;
        catalog = catalog.with_diet_scores(scores);
    }
    info!(recipes = catalog.len(), "recipe catalog loaded");

    let targets_json = fs::read_to_string(&cli_args.targets)
        .await
        .with_context(|| format!("Failed to read targets file '{}'", cli_args.targets.display()))?;
    let targets = NutrientTargets::from_json_str(&targets_json)
        .with_context(|| format!("Failed to parse targets from '{}'", cli_args.targets.display()))?;

    let request = cli_args.plan_request(&config, Local::now().date_naive());
    let planner = MealPlanner::new(catalog, GoodLpBackend::new());

    // The timeout stops waiting; the blocking solve itself runs to completion.
    let handle = tokio::task::spawn_blocking(move || planner.plan(&request, &targets));
    let plan = tokio::time::timeout(config.solve_timeout, handle)
        .await
        .with_context(|| format!("Planning did not finish within {:?}", config.solve_timeout))?
        .context("Planning task panicked")?
        .context("Planning failed")?;

    let rendered = serde_json::to_string_pretty(&plan).context("Failed to serialise the meal plan")?;
    match &cli_args.output {
        Some(path) => {
            fs::write(path, rendered)
                .await
                .with_context(|| format!("Failed to write plan to '{}'", path.display()))?;
            info!(path = %path.display(), "plan written");
        }
        None => println!("{}", rendered),
    }

    Ok(())
}
