use serde::{Deserialize, Serialize};
use std::fmt;

use crate::prompts;

/// One of the five fixed rubric categories.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    NutritionalQuality,
    VarietyCreativity,
    BudgetCost,
    PreparationFeasibility,
    CotQuality,
}

/// Evaluation order; feedback tie-breaking follows it.
pub const ALL_DIMENSIONS: [Dimension; 5] = [
    Dimension::NutritionalQuality,
    Dimension::VarietyCreativity,
    Dimension::BudgetCost,
    Dimension::PreparationFeasibility,
    Dimension::CotQuality,
];

pub const NUTRITIONAL_WEIGHT: f64 = 0.30;
pub const VARIETY_WEIGHT: f64 = 0.25;
pub const BUDGET_WEIGHT: f64 = 0.20;
pub const PREPARATION_WEIGHT: f64 = 0.25;
/// Applied on top of the normalized base score, so final scores can reach 5.5.
pub const COT_WEIGHT: f64 = 0.10;

/// Sum of the four base weights. Must stay 1.00 when any weight changes.
pub const BASE_WEIGHT_TOTAL: f64 =
    NUTRITIONAL_WEIGHT + VARIETY_WEIGHT + BUDGET_WEIGHT + PREPARATION_WEIGHT;

pub const MIN_SCORE: f64 = 1.0;
pub const MAX_SCORE: f64 = 5.0;
/// Neutral score substituted for missing or corrupt criteria.
pub const DEFAULT_SCORE: f64 = 3.0;

impl Dimension {
    pub fn id(&self) -> &'static str {
        match self {
            Dimension::NutritionalQuality => "nutritional_quality",
            Dimension::VarietyCreativity => "variety_creativity",
            Dimension::BudgetCost => "budget_cost",
            Dimension::PreparationFeasibility => "preparation_feasibility",
            Dimension::CotQuality => "cot_quality",
        }
    }

    pub fn criteria(&self) -> &'static [&'static str] {
        match self {
            Dimension::NutritionalQuality => &[
                "pre_diabetic_appropriateness",
                "nutrient_density_balance",
                "complete_vegetarian_protein",
            ],
            Dimension::VarietyCreativity => &[
                "ingredient_diversity",
                "culinary_creativity",
                "cultural_representation",
            ],
            Dimension::BudgetCost => &[
                "ingredient_affordability",
                "pantry_optimization",
                "scaling_flexibility",
            ],
            Dimension::PreparationFeasibility => &[
                "time_efficiency",
                "equipment_technique_accessibility",
                "instruction_clarity",
            ],
            Dimension::CotQuality => &["reasoning_transparency", "educational_value"],
        }
    }

    pub fn weight(&self) -> f64 {
        match self {
            Dimension::NutritionalQuality => NUTRITIONAL_WEIGHT,
            Dimension::VarietyCreativity => VARIETY_WEIGHT,
            Dimension::BudgetCost => BUDGET_WEIGHT,
            Dimension::PreparationFeasibility => PREPARATION_WEIGHT,
            Dimension::CotQuality => COT_WEIGHT,
        }
    }

    pub fn system_prompt(&self) -> &'static str {
        match self {
            Dimension::NutritionalQuality => prompts::NUTRITIONAL_QUALITY_PROMPT,
            Dimension::VarietyCreativity => prompts::VARIETY_CREATIVITY_PROMPT,
            Dimension::BudgetCost => prompts::BUDGET_COST_PROMPT,
            Dimension::PreparationFeasibility => prompts::PREPARATION_FEASIBILITY_PROMPT,
            Dimension::CotQuality => prompts::COT_QUALITY_PROMPT,
        }
    }

    pub fn display_name(&self) -> String {
        display_name(self.id())
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Title-cases a snake_case rubric id: `ingredient_diversity` -> `Ingredient Diversity`.
pub fn display_name(id: &str) -> String {
    id.split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_weights_sum_to_one() {
        assert!((BASE_WEIGHT_TOTAL - 1.0).abs() < 1e-12);
        let summed: f64 = ALL_DIMENSIONS
            .iter()
            .filter(|d| **d != Dimension::CotQuality)
            .map(Dimension::weight)
            .sum();
        assert!((summed - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_criterion_counts() {
        let counts: Vec<usize> = ALL_DIMENSIONS.iter().map(|d| d.criteria().len()).collect();
        assert_eq!(counts, vec![3, 3, 3, 3, 2]);
        assert_eq!(counts.iter().sum::<usize>(), 14);
    }

    #[test]
    fn test_prompts_name_every_criterion() {
        for dimension in ALL_DIMENSIONS {
            let prompt = dimension.system_prompt();
            for criterion in dimension.criteria() {
                assert!(prompt.contains(criterion), "{dimension} prompt is missing {criterion}");
            }
            assert!(prompt.contains("Do not inflate scores"));
        }
    }

    #[test]
    fn test_display_names() {
        assert_eq!(display_name("ingredient_diversity"), "Ingredient Diversity");
        assert_eq!(
            display_name("equipment_technique_accessibility"),
            "Equipment Technique Accessibility"
        );
        assert_eq!(Dimension::CotQuality.display_name(), "Cot Quality");
    }
}
