use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use super::dimensions::{
    Dimension, ALL_DIMENSIONS, BUDGET_WEIGHT, COT_WEIGHT, DEFAULT_SCORE, NUTRITIONAL_WEIGHT,
    PREPARATION_WEIGHT, VARIETY_WEIGHT,
};
use super::scorer::{CriterionScore, DimensionResult, ScoringFailure};

pub const DEFAULT_EVIDENCE: &str = "No usable evaluation was returned; neutral default applied.";

/// Returns the scored criterion, or the neutral default when it is missing.
/// This is the only place missing or rejected criteria are filled in.
pub fn score_or_default(result: &DimensionResult, criterion: &str) -> CriterionScore {
    result.get(criterion).cloned().unwrap_or_else(|| CriterionScore {
        criterion: criterion.to_string(),
        score: DEFAULT_SCORE,
        evidence: DEFAULT_EVIDENCE.to_string(),
        defaulted: true,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DimensionBreakdown {
    /// Every criterion of the dimension, in fixed order, defaults included.
    #[serde(serialize_with = "serialize_scores")]
    pub scores: Vec<CriterionScore>,
    pub average: f64,
    pub weight: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ScoringFailure>,
}

#[derive(Serialize)]
struct ScoreEntry<'a> {
    score: f64,
    evidence: &'a str,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    defaulted: bool,
}

fn serialize_scores<S: Serializer>(scores: &[CriterionScore], serializer: S) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(scores.len()))?;
    for criterion in scores {
        map.serialize_entry(
            &criterion.criterion,
            &ScoreEntry {
                score: criterion.score,
                evidence: &criterion.evidence,
                defaulted: criterion.defaulted,
            },
        )?;
    }
    map.end()
}

impl DimensionBreakdown {
    pub fn from_result(dimension: Dimension, result: &DimensionResult) -> Self {
        let scores: Vec<CriterionScore> = dimension
            .criteria()
            .iter()
            .map(|criterion| score_or_default(result, criterion))
            .collect();
        // The denominator is always the dimension's full criterion count.
        let average = scores.iter().map(|c| c.score).sum::<f64>() / scores.len() as f64;

        Self {
            scores,
            average,
            weight: dimension.weight(),
            error: result.failure.clone(),
        }
    }

    pub fn is_all_default(&self) -> bool {
        self.scores.iter().all(|c| c.defaulted)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub nutritional_quality: DimensionBreakdown,
    pub variety_creativity: DimensionBreakdown,
    pub budget_cost: DimensionBreakdown,
    pub preparation_feasibility: DimensionBreakdown,
    pub cot_quality: DimensionBreakdown,
    pub base_score: f64,
    pub cot_bonus: f64,
    /// Not clamped: a perfect base plus the CoT bonus reaches 5.5.
    pub final_score: f64,
}

impl ScoreBreakdown {
    pub fn dimension(&self, dimension: Dimension) -> &DimensionBreakdown {
        match dimension {
            Dimension::NutritionalQuality => &self.nutritional_quality,
            Dimension::VarietyCreativity => &self.variety_creativity,
            Dimension::BudgetCost => &self.budget_cost,
            Dimension::PreparationFeasibility => &self.preparation_feasibility,
            Dimension::CotQuality => &self.cot_quality,
        }
    }

    /// Dimensions in evaluation order.
    pub fn dimensions(&self) -> impl Iterator<Item = (Dimension, &DimensionBreakdown)> {
        ALL_DIMENSIONS.into_iter().map(move |d| (d, self.dimension(d)))
    }
}

/// Combines the five dimension results into weighted averages and the final score.
pub fn aggregate(
    nutritional: &DimensionResult,
    variety: &DimensionResult,
    budget: &DimensionResult,
    preparation: &DimensionResult,
    cot: &DimensionResult,
) -> ScoreBreakdown {
    let nutritional_quality = DimensionBreakdown::from_result(Dimension::NutritionalQuality, nutritional);
    let variety_creativity = DimensionBreakdown::from_result(Dimension::VarietyCreativity, variety);
    let budget_cost = DimensionBreakdown::from_result(Dimension::BudgetCost, budget);
    let preparation_feasibility =
        DimensionBreakdown::from_result(Dimension::PreparationFeasibility, preparation);
    let cot_quality = DimensionBreakdown::from_result(Dimension::CotQuality, cot);

    let base_score = nutritional_quality.average * NUTRITIONAL_WEIGHT
        + variety_creativity.average * VARIETY_WEIGHT
        + budget_cost.average * BUDGET_WEIGHT
        + preparation_feasibility.average * PREPARATION_WEIGHT;
    // With nothing scored at all the result is exactly neutral.
    let nothing_scored = [
        &nutritional_quality,
        &variety_creativity,
        &budget_cost,
        &preparation_feasibility,
        &cot_quality,
    ]
    .iter()
    .all(|breakdown| breakdown.is_all_default());
    let cot_bonus = if nothing_scored {
        0.0
    } else {
        cot_quality.average * COT_WEIGHT
    };

    ScoreBreakdown {
        nutritional_quality,
        variety_creativity,
        budget_cost,
        preparation_feasibility,
        cot_quality,
        base_score,
        cot_bonus,
        final_score: base_score + cot_bonus,
    }
}
