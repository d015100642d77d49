use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::error::TargetError;
use crate::nutrients::Nutrient;

/// Lower/upper bound on the total amount of one nutrient. Either side may be open.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NutrientTarget {
    pub nutrient: Nutrient,
    pub lower: Option<f64>,
    pub upper: Option<f64>,
}

impl NutrientTarget {
    pub fn range(nutrient: Nutrient, lower: f64, upper: f64) -> Self {
        Self { nutrient, lower: Some(lower), upper: Some(upper) }
    }

    pub fn point(nutrient: Nutrient, value: f64) -> Self {
        Self::range(nutrient, value, value)
    }

    pub fn at_least(nutrient: Nutrient, lower: f64) -> Self {
        Self { nutrient, lower: Some(lower), upper: None }
    }

    pub fn at_most(nutrient: Nutrient, upper: f64) -> Self {
        Self { nutrient, lower: None, upper: Some(upper) }
    }

    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            nutrient: self.nutrient,
            lower: self.lower.map(|v| v * factor),
            upper: self.upper.map(|v| v * factor),
        }
    }

    /// Single representative value: the point value, the midpoint of a closed range,
    /// or whichever side is present.
    pub fn central_value(&self) -> Option<f64> {
        match (self.lower, self.upper) {
            (Some(lo), Some(hi)) => Some((lo + hi) / 2.0),
            (Some(v), None) | (None, Some(v)) => Some(v),
            (None, None) => None,
        }
    }

    pub fn has_inverted_bounds(&self) -> bool {
        matches!((self.lower, self.upper), (Some(lo), Some(hi)) if lo > hi)
    }
}

/// The target set for one request, keyed by nutrient.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NutrientTargets {
    targets: BTreeMap<Nutrient, NutrientTarget>,
}

impl NutrientTargets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the target for its nutrient.
    pub fn insert(&mut self, target: NutrientTarget) -> Result<(), TargetError> {
        if !target.nutrient.is_constrainable() {
            return Err(TargetError::NotConstrainable(target.nutrient));
        }
        if target.lower.is_none() && target.upper.is_none() {
            debug!(nutrient = %target.nutrient, "ignoring target with no bounds");
            return Ok(());
        }
        if target.has_inverted_bounds() {
            warn!(nutrient = %target.nutrient, lower = ?target.lower, upper = ?target.upper, "target lower bound exceeds upper bound");
        }
        self.targets.insert(target.nutrient, target);
        Ok(())
    }

    pub fn with(mut self, target: NutrientTarget) -> Result<Self, TargetError> {
        self.insert(target)?;
        Ok(self)
    }

    pub fn get(&self, nutrient: Nutrient) -> Option<&NutrientTarget> {
        self.targets.get(&nutrient)
    }

    pub fn iter(&self) -> impl Iterator<Item = &NutrientTarget> {
        self.targets.values()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }


    pub fn from_json_str(json: &str) -> Result<Self, TargetError> {
        let file: TargetsFile = serde_json::from_str(json)?;
        match file {
            TargetsFile::Explicit { targets } => {
                let mut set = Self::new();
                for entry in targets {
                    let nutrient: Nutrient = entry.nutrient.parse()?;
                    set.insert(NutrientTarget { nutrient, lower: entry.lower, upper: entry.upper })?;
                }
                Ok(set)
            }
            TargetsFile::Requirements { macros, micros } => Self::from_requirement_maps(&macros, &micros),
        }
    }

    /// Builds targets from the upstream macro/micro requirement maps.
    ///
    /// Unknown keys are ignored. `"ND"` or any other non-numeric value leaves that side open.
    pub fn from_requirement_maps(
        macros: &Map<String, Value>,
        micros: &Map<String, Value>,
    ) -> Result<Self, TargetError> {
        let mut set = Self::new();

        for (key, value) in macros {
            let Some(nutrient) = macro_nutrient(key) else {
                warn!(key = key.as_str(), "ignoring unknown macro requirement");
                continue;
            };
            let (lower, upper) = parse_macro_value(key, value)?;
            set.insert(NutrientTarget { nutrient, lower, upper })?;
        }

        for (nutrient, min_keys, max_keys) in MICRO_KEYS {
            let lower = lookup_bound(micros, min_keys);
            let upper = lookup_bound(micros, max_keys);
            set.insert(NutrientTarget { nutrient: *nutrient, lower, upper })?;
        }

        Ok(set)
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TargetsFile {
    Explicit {
        targets: Vec<TargetEntry>,
    },
    Requirements {
        macros: Map<String, Value>,
        #[serde(default)]
        micros: Map<String, Value>,
    },
}

#[derive(Debug, Deserialize)]
struct TargetEntry {
    nutrient: String,
    #[serde(default)]
    lower: Option<f64>,
    #[serde(default)]
    upper: Option<f64>,
}

fn macro_nutrient(key: &str) -> Option<Nutrient> {
    match key {
        "large_calories" => Some(Nutrient::Energy),
        "fiber_g" => Some(Nutrient::Fiber),
        "carbohydrates_g" => Some(Nutrient::Carbohydrates),
        "protein_g" => Some(Nutrient::Protein),
        "fat_g" => Some(Nutrient::Fat),
        _ => None,
    }
}

// (nutrient, lower-bound keys, upper-bound keys); the first key present wins.
const MICRO_KEYS: &[(Nutrient, &[&str], &[&str])] = &[
    (Nutrient::Calcium, &["min_calcium_mg_ai"], &["min_calcium_mg_ul"]),
    (Nutrient::Sodium, &["min_sodium_mg_ai"], &["min_sodium_mg_ul"]),
    (Nutrient::Copper, &["min_copper_mg_rda"], &["min_copper_mg_ul"]),
    (Nutrient::Fluoride, &["min_fluoride_mg_ai"], &["min_fluoride_mg_ul"]),
    (Nutrient::Iron, &["min_iron_mg_rda"], &["min_iron_mg_ul"]),
    (Nutrient::Magnesium, &["min_magnesium_mg_rda"], &["min_magnesium_mg_ul"]),
    (Nutrient::Manganese, &["min_manganese_mg_rda"], &["min_manganese_mg_ul"]),
    (Nutrient::Potassium, &["min_potassium_mg_ai"], &["min_potassium_ul", "min_potassium_mg_ul"]),
    (Nutrient::Selenium, &["min_selenium_ug_rda"], &["min_selenium_ug_ul"]),
    (Nutrient::Zinc, &["min_zinc_mg_rda"], &["min_zinc_mg_ul"]),
    (Nutrient::VitaminA, &["vit_a_ug_rda", "vit_a_iu_rda"], &["vit_a_ug_ul", "vit_a_iu_ul"]),
    (Nutrient::Thiamin, &["vit_b1_thiamin_mg_rda"], &["vit_b1_thiamin_mg_ul"]),
    (Nutrient::Riboflavin, &["vit_b2_riboflavin_mg_rda"], &["vit_b2_riboflavin_mg_ul"]),
    (Nutrient::Niacin, &["vit_b3_niacin_mg_rda"], &["vit_b3_niacin_mg_ul"]),
    (Nutrient::VitaminB5, &["vit_b5_pantothenicacid_mg_ai"], &["vit_b5_pantothenic_acid_mg_ul"]),
    (Nutrient::VitaminB6, &["vit_b6_mg_rda"], &["vit_b6_mg_ul"]),
    (Nutrient::VitaminB12, &["vit_b12_ug_rda"], &["vit_b12_ug_ul"]),
    (Nutrient::Folate, &["vit_b9_folate_ug_rda"], &["vit_b9_folate_ug_ul"]),
    (Nutrient::VitaminC, &["vit_c_mg_rda"], &["vit_c_mg_ul"]),
    (Nutrient::VitaminD, &["vit_d_ug_ai", "vit_d_iu_ai"], &["vit_d_ug_ul", "vit_d_iu_ul"]),
    (Nutrient::VitaminE, &["vit_e_mg_rda"], &["vit_e_mg_ul"]),
    (Nutrient::Choline, &["vit_choline_mg_ai"], &["vit_choline_mg_ul"]),
    (Nutrient::VitaminK, &["vit_k_ug_ai"], &["vit_k_ug_ul"]),
];

fn parse_bound(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn lookup_bound(map: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|k| map.get(*k)).and_then(parse_bound)
}

fn parse_macro_value(key: &str, value: &Value) -> Result<(Option<f64>, Option<f64>), TargetError> {
    match value {
        Value::Array(items) if items.len() == 2 => Ok((parse_bound(&items[0]), parse_bound(&items[1]))),
        Value::Array(items) => Err(TargetError::MalformedValue {
            key: key.to_string(),
            reason: format!("expected [min, max], got {} values", items.len()),
        }),
        Value::Object(_) => Err(TargetError::MalformedValue {
            key: key.to_string(),
            reason: "expected a number or [min, max]".to_string(),
        }),
        scalar => {
            let v = parse_bound(scalar);
            Ok((v, v))
        }
    }
}
