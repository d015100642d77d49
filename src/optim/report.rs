use serde::Serialize;
use tracing::{debug, info};

use crate::nutrients::Nutrient;
use crate::optim::model::{BoundSide, NutrientBound, PlanModel};

/// Achieved total for one targeted nutrient next to its requested range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConstraintEntry {
    #[serde(skip)]
    pub nutrient: Nutrient,
    #[serde(rename = "nutrientName")]
    pub nutrient_name: String,
    pub actual: i64,
    /// `"<lower> - <upper>"`, upper left blank when open.
    pub target: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub bounds_error: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConstraintReport {
    pub entries: Vec<ConstraintEntry>,
    /// Display names of nutrients that ended up outside the bounds first asked for.
    /// Only filled in after a relaxation.
    pub out_of_orig_bound_nutrients: Vec<String>,
}

/// Rows of one nutrient, in the order they were first seen.
struct NutrientRows<'a> {
    nutrient: Nutrient,
    min: Option<&'a NutrientBound>,
    max: Option<&'a NutrientBound>,
}

impl NutrientRows<'_> {
    fn lower(&self) -> Option<i64> {
        self.min.map(|b| b.rhs as i64)
    }

    fn upper(&self) -> Option<i64> {
        self.max.map(|b| b.rhs as i64)
    }

    fn achieved(&self, assignment: &[u32]) -> i64 {
        // The floor row carries the widest coefficients (B12 counts fortified amounts there).
        self.min.or(self.max).map_or(0.0, |b| b.evaluate(assignment)) as i64
    }

    fn target(&self) -> String {
        let lower = self.lower().unwrap_or(0);
        let upper = self.upper().map(|u| u.to_string()).unwrap_or_default();
        format!("{} - {}", lower, upper)
    }

    fn bounds_error(&self) -> bool {
        matches!((self.min, self.max), (Some(lo), Some(hi)) if lo.rhs > hi.rhs)
    }
}

fn group_rows(bounds: &[NutrientBound]) -> Vec<NutrientRows<'_>> {
    let mut rows: Vec<NutrientRows> = Vec::new();
    for bound in bounds {
        let idx = match rows.iter().position(|r| r.nutrient == bound.nutrient) {
            Some(idx) => idx,
            None => {
                rows.push(NutrientRows { nutrient: bound.nutrient, min: None, max: None });
                rows.len() - 1
            }
        };
        match bound.side {
            BoundSide::Min => rows[idx].min = Some(bound),
            BoundSide::Max => rows[idx].max = Some(bound),
        }
    }
    rows
}

/// Compares achieved totals with the bounds of `original`.
///
/// Target strings always show the bounds of `original`, so after a relaxation the caller
/// sees what was asked for rather than what was finally solved.
pub fn build_report(original: &PlanModel, assignment: &[u32], constraints_loosened: bool) -> ConstraintReport {
    let rows = group_rows(&original.nutrient_bounds);
    let mut report = ConstraintReport::default();

    for row in &rows {
        let actual = row.achieved(assignment);
        let entry = ConstraintEntry {
            nutrient: row.nutrient,
            nutrient_name: row.nutrient.display_name(),
            actual,
            target: row.target(),
            bounds_error: row.bounds_error(),
        };
        debug!(
            nutrient = %row.nutrient,
            actual,
            target = entry.target.as_str(),
            bounds_error = entry.bounds_error,
            "constraint result"
        );

        if constraints_loosened {
            let below = row.lower().map_or(false, |lo| actual < lo);
            let above = row.upper().map_or(false, |hi| actual > hi);
            if below || above {
                info!(nutrient = %row.nutrient, actual, original = entry.target.as_str(), "outside original bounds");
                report.out_of_orig_bound_nutrients.push(entry.nutrient_name.clone());
            }
        }
        report.entries.push(entry);
    }

    report
}
