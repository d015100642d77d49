use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TargetError;

/// Every per-serving nutrient column the recipe dataset carries.
///
/// The variant order matches `NUTRIENT_TABLE`; `Nutrient::index` relies on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Nutrient {
    Energy,
    EnergyKj,
    Fiber,
    Carbohydrates,
    Starch,
    Cholesterol,
    Protein,
    Fat,
    TransFat,
    VitaminA,
    Thiamin,
    Riboflavin,
    Niacin,
    VitaminB5,
    VitaminB6,
    VitaminB12,
    VitaminB12Added,
    Folate,
    FolicAcid,
    VitaminC,
    VitaminD,
    VitaminE,
    VitaminEAdded,
    VitaminK,
    Choline,
    CaroteneAlpha,
    CaroteneBeta,
    Calcium,
    Phosphorus,
    Potassium,
    Magnesium,
    Sodium,
    Iron,
    Copper,
    Zinc,
    Manganese,
    Selenium,
    Fluoride,
}

struct NutrientInfo {
    nutrient: Nutrient,
    key: &'static str,
    column: &'static str,
    unit: &'static str,
    // Nutrients the optimizer can place a bound on. The rest are carried for display only.
    constrainable: bool,
    aliases: &'static [&'static str],
}

const NUTRIENT_TABLE: [NutrientInfo; Nutrient::COUNT] = [
    NutrientInfo { nutrient: Nutrient::Energy, key: "energy", column: "energy_kcal", unit: "calories", constrainable: true, aliases: &["calories", "kcal", "large calories"] },
    NutrientInfo { nutrient: Nutrient::EnergyKj, key: "energy kj", column: "energy_kj", unit: "kj", constrainable: false, aliases: &["kj"] },
    NutrientInfo { nutrient: Nutrient::Fiber, key: "fiber", column: "fibre_g", unit: "g", constrainable: true, aliases: &["fibre"] },
    NutrientInfo { nutrient: Nutrient::Carbohydrates, key: "carbohydrates", column: "carbohydrates_g", unit: "g", constrainable: true, aliases: &["carbs", "carbohydrate"] },
    NutrientInfo { nutrient: Nutrient::Starch, key: "starch", column: "starch_g", unit: "g", constrainable: false, aliases: &[] },
    NutrientInfo { nutrient: Nutrient::Cholesterol, key: "cholesterol", column: "cholesterol_mg", unit: "mg", constrainable: false, aliases: &[] },
    NutrientInfo { nutrient: Nutrient::Protein, key: "protein", column: "protein_g", unit: "g", constrainable: true, aliases: &[] },
    NutrientInfo { nutrient: Nutrient::Fat, key: "fat", column: "fats_total_g", unit: "g", constrainable: true, aliases: &["fats", "fats total", "total fat"] },
    NutrientInfo { nutrient: Nutrient::TransFat, key: "trans fat", column: "fatty_acids_total_trans_g", unit: "g", constrainable: false, aliases: &["trans fats"] },
    NutrientInfo { nutrient: Nutrient::VitaminA, key: "vitamin a", column: "vitamin_A_iu", unit: "iu", constrainable: true, aliases: &[] },
    NutrientInfo { nutrient: Nutrient::Thiamin, key: "thiamin", column: "thiamin_mg", unit: "mg", constrainable: true, aliases: &["vitamin b1"] },
    NutrientInfo { nutrient: Nutrient::Riboflavin, key: "riboflavin", column: "riboflavin_mg", unit: "mg", constrainable: true, aliases: &["vitamin b2"] },
    NutrientInfo { nutrient: Nutrient::Niacin, key: "niacin", column: "niacin_mg", unit: "mg", constrainable: true, aliases: &["vitamin b3"] },
    NutrientInfo { nutrient: Nutrient::VitaminB5, key: "vitamin b5", column: "vitamin_B5_pantothenic_acid_mg", unit: "mg", constrainable: true, aliases: &["pantothenic acid"] },
    NutrientInfo { nutrient: Nutrient::VitaminB6, key: "vitamin b6", column: "vitamin_B6_mg", unit: "mg", constrainable: true, aliases: &[] },
    NutrientInfo { nutrient: Nutrient::VitaminB12, key: "vitamin b12", column: "vitamin_B12_ug", unit: "ug", constrainable: true, aliases: &[] },
    NutrientInfo { nutrient: Nutrient::VitaminB12Added, key: "vitamin b12 added", column: "vitamin B12_added_ug", unit: "ug", constrainable: false, aliases: &[] },
    NutrientInfo { nutrient: Nutrient::Folate, key: "folate", column: "folate_total_ug", unit: "ug", constrainable: true, aliases: &["vitamin b9"] },
    NutrientInfo { nutrient: Nutrient::FolicAcid, key: "folic acid", column: "folic_acid_g", unit: "g", constrainable: false, aliases: &[] },
    NutrientInfo { nutrient: Nutrient::VitaminC, key: "vitamin c", column: "vitamin_C_total_ascorbic_acid_mg", unit: "mg", constrainable: true, aliases: &[] },
    NutrientInfo { nutrient: Nutrient::VitaminD, key: "vitamin d", column: "vitamin_D_IU", unit: "iu", constrainable: true, aliases: &["vitiamin d iu"] },
    NutrientInfo { nutrient: Nutrient::VitaminE, key: "vitamin e", column: "vitamin_E_alphatocopherol_mg", unit: "mg", constrainable: true, aliases: &[] },
    NutrientInfo { nutrient: Nutrient::VitaminEAdded, key: "vitamin e added", column: "vitamin_E_added_mg", unit: "mg", constrainable: false, aliases: &[] },
    NutrientInfo { nutrient: Nutrient::VitaminK, key: "vitamin k", column: "vitamin_K_phylloquinone_ug", unit: "ug", constrainable: true, aliases: &[] },
    NutrientInfo { nutrient: Nutrient::Choline, key: "choline", column: "choline_mg", unit: "mg", constrainable: true, aliases: &[] },
    NutrientInfo { nutrient: Nutrient::CaroteneAlpha, key: "carotene alpha", column: "carotene_alpha_g", unit: "g", constrainable: false, aliases: &["carotene a"] },
    NutrientInfo { nutrient: Nutrient::CaroteneBeta, key: "carotene beta", column: "carotene_beta_g", unit: "g", constrainable: false, aliases: &["carotene b"] },
    NutrientInfo { nutrient: Nutrient::Calcium, key: "calcium", column: "calcium_mg", unit: "mg", constrainable: true, aliases: &[] },
    NutrientInfo { nutrient: Nutrient::Phosphorus, key: "phosphorus", column: "phosphorus_mg", unit: "mg", constrainable: false, aliases: &[] },
    NutrientInfo { nutrient: Nutrient::Potassium, key: "potassium", column: "potassium_mg", unit: "mg", constrainable: true, aliases: &[] },
    NutrientInfo { nutrient: Nutrient::Magnesium, key: "magnesium", column: "magnesium_mg", unit: "mg", constrainable: true, aliases: &[] },
    NutrientInfo { nutrient: Nutrient::Sodium, key: "sodium", column: "sodium_mg", unit: "mg", constrainable: true, aliases: &["salt"] },
    NutrientInfo { nutrient: Nutrient::Iron, key: "iron", column: "iron_mg", unit: "mg", constrainable: true, aliases: &[] },
    NutrientInfo { nutrient: Nutrient::Copper, key: "copper", column: "copper_mg", unit: "mg", constrainable: true, aliases: &[] },
    NutrientInfo { nutrient: Nutrient::Zinc, key: "zinc", column: "zinc_mg", unit: "mg", constrainable: true, aliases: &[] },
    NutrientInfo { nutrient: Nutrient::Manganese, key: "manganese", column: "manganese_mg", unit: "mg", constrainable: true, aliases: &[] },
    NutrientInfo { nutrient: Nutrient::Selenium, key: "selenium", column: "selenium_ug", unit: "ug", constrainable: true, aliases: &[] },
    NutrientInfo { nutrient: Nutrient::Fluoride, key: "fluoride", column: "fluoride_mg", unit: "mg", constrainable: true, aliases: &["flouride"] },
];

// Misspelled headers found in older recipe exports.
const LEGACY_COLUMNS: &[(Nutrient, &str)] = &[(Nutrient::VitaminD, "vitiamin_D_IU")];

impl Nutrient {
    pub const COUNT: usize = 38;

    /// Nutrients that are never loosened during relaxation, whatever the caller asks.
    pub const ALWAYS_PROTECTED: [Nutrient; 3] = [Nutrient::Energy, Nutrient::Sodium, Nutrient::Fat];

    pub fn all() -> impl Iterator<Item = Nutrient> {
        NUTRIENT_TABLE.iter().map(|info| info.nutrient)
    }

    pub fn index(self) -> usize {
        self as usize
    }

    fn info(self) -> &'static NutrientInfo {
        &NUTRIENT_TABLE[self.index()]
    }

    /// Short lower-case name, e.g. `"vitamin b12"`. Used for protection lists.
    pub fn key(self) -> &'static str {
        self.info().key
    }

    /// Column header in the recipe dataset.
    pub fn column(self) -> &'static str {
        self.info().column
    }

    /// Every header this nutrient may appear under, preferred spelling first.
    pub fn column_headers(self) -> impl Iterator<Item = &'static str> {
        std::iter::once(self.column()).chain(
            LEGACY_COLUMNS
                .iter()
                .filter(move |(nutrient, _)| *nutrient == self)
                .map(|(_, column)| *column),
        )
    }

    fn unit(self) -> &'static str {
        self.info().unit
    }

    /// Report label, e.g. `"fiber (g)"`.
    pub fn display_name(self) -> String {
        format!("{} ({})", self.key(), self.unit())
    }

    pub fn is_constrainable(self) -> bool {
        self.info().constrainable
    }

    pub fn is_always_protected(self) -> bool {
        Self::ALWAYS_PROTECTED.contains(&self)
    }

    fn matches(self, normalized: &str) -> bool {
        let info = self.info();
        normalized == info.key
            || normalized == normalize_name(info.column)
            || normalized == normalize_name(&self.display_name())
            || info.aliases.iter().any(|alias| normalized == *alias)
    }
}

impl fmt::Display for Nutrient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Nutrient {
    type Err = TargetError;

    /// Accepts the short key, the dataset column, the report label or a known alias,
    /// ignoring case, underscores and a trailing unit in parentheses.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = normalize_name(s);
        let without_unit = strip_unit_suffix(&normalized);
        Nutrient::all()
            .find(|n| n.matches(&normalized) || n.matches(without_unit))
            .ok_or_else(|| TargetError::UnknownNutrient(s.to_string()))
    }
}

fn normalize_name(s: &str) -> String {
    s.trim()
        .to_lowercase()
        .replace(['_', '-'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn strip_unit_suffix(s: &str) -> &str {
    match s.rfind(" (") {
        Some(pos) if s.ends_with(')') => &s[..pos],
        _ => s,
    }
}

/// Per-serving nutrient values of one recipe. A missing entry means the dataset had no value.
#[derive(Debug, Clone, PartialEq)]
pub struct NutrientProfile {
    values: [Option<f64>; Nutrient::COUNT],
}

impl Default for NutrientProfile {
    fn default() -> Self {
        Self { values: [None; Nutrient::COUNT] }
    }
}

impl NutrientProfile {
    pub fn get(&self, nutrient: Nutrient) -> Option<f64> {
        self.values[nutrient.index()]
    }

    pub fn set(&mut self, nutrient: Nutrient, value: f64) {
        self.values[nutrient.index()] = Some(value);
    }

    pub fn with(mut self, nutrient: Nutrient, value: f64) -> Self {
        self.set(nutrient, value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_order_matches_enum() {
        for (i, info) in NUTRIENT_TABLE.iter().enumerate() {
            assert_eq!(info.nutrient.index(), i, "table row {} is out of order", info.key);
        }
        assert_eq!(Nutrient::all().count(), Nutrient::COUNT);
    }

    #[test]
    fn test_parse_accepts_keys_columns_and_labels() {
        assert_eq!("fiber".parse::<Nutrient>().unwrap(), Nutrient::Fiber);
        assert_eq!("fibre_g".parse::<Nutrient>().unwrap(), Nutrient::Fiber);
        assert_eq!("Fiber (g)".parse::<Nutrient>().unwrap(), Nutrient::Fiber);
        assert_eq!("Vitamin_B12".parse::<Nutrient>().unwrap(), Nutrient::VitaminB12);
        assert_eq!("fats".parse::<Nutrient>().unwrap(), Nutrient::Fat);
        assert_eq!("energy (calories)".parse::<Nutrient>().unwrap(), Nutrient::Energy);
        assert_eq!("vitamin_D_IU".parse::<Nutrient>().unwrap(), Nutrient::VitaminD);
    }

    #[test]
    fn test_parse_unknown_nutrient() {
        let err = "unobtainium".parse::<Nutrient>().unwrap_err();
        assert!(err.to_string().contains("unobtainium"));
    }

    #[test]
    fn test_column_headers_include_legacy_spelling() {
        let headers: Vec<&str> = Nutrient::VitaminD.column_headers().collect();
        assert_eq!(headers, vec!["vitamin_D_IU", "vitiamin_D_IU"]);
        assert_eq!(Nutrient::Fiber.column_headers().collect::<Vec<_>>(), vec!["fibre_g"]);
    }

    #[test]
    fn test_always_protected() {
        assert!(Nutrient::Energy.is_always_protected());
        assert!(Nutrient::Sodium.is_always_protected());
        assert!(Nutrient::Fat.is_always_protected());
        assert!(!Nutrient::Fiber.is_always_protected());
    }

    #[test]
    fn test_profile_get_set() {
        let profile = NutrientProfile::default().with(Nutrient::Protein, 12.5);
        assert_eq!(profile.get(Nutrient::Protein), Some(12.5));
        assert_eq!(profile.get(Nutrient::Fat), None);
    }
}
