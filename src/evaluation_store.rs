use serde::Serialize;
use std::collections::BTreeMap;

use crate::evaluator::EvaluationResult;

/// Caller-owned evaluations keyed by an externally generated recipe id.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EvaluationStore {
    evaluations: BTreeMap<String, EvaluationResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredRecipe {
    pub recipe_id: String,
    pub final_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationSummary {
    pub recipes_evaluated: usize,
    pub average_score: f64,
    pub best: ScoredRecipe,
    /// Only reported once more than one recipe has been evaluated.
    pub worst: Option<ScoredRecipe>,
}

impl EvaluationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `result`, replacing any earlier evaluation of the same recipe.
    pub fn insert(&mut self, recipe_id: &str, result: EvaluationResult) -> &EvaluationResult {
        self.evaluations.insert(recipe_id.to_string(), result);
        &self.evaluations[recipe_id]
    }

    pub fn get(&self, recipe_id: &str) -> Option<&EvaluationResult> {
        self.evaluations.get(recipe_id)
    }

    pub fn remove(&mut self, recipe_id: &str) -> Option<EvaluationResult> {
        self.evaluations.remove(recipe_id)
    }

    pub fn len(&self) -> usize {
        self.evaluations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.evaluations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &EvaluationResult)> {
        self.evaluations.iter().map(|(id, result)| (id.as_str(), result))
    }

    pub fn summary(&self) -> Option<EvaluationSummary> {
        let mut scored = self.iter().map(|(id, result)| ScoredRecipe {
            recipe_id: id.to_string(),
            final_score: result.final_score,
        });
        let first = scored.next()?;
        let (mut best, mut worst, mut total, mut count) = (first.clone(), first.clone(), first.final_score, 1usize);
        for recipe in scored {
            total += recipe.final_score;
            count += 1;
            if recipe.final_score > best.final_score {
                best = recipe.clone();
            }
            if recipe.final_score < worst.final_score {
                worst = recipe;
            }
        }

        Some(EvaluationSummary {
            recipes_evaluated: count,
            average_score: total / count as f64,
            best,
            worst: (count > 1).then_some(worst),
        })
    }
}
