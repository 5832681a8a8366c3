use async_trait::async_trait;
use recipe_eval::api_connection::{ApiConnectionError, CompletionBackend, Provider};
use recipe_eval::prompts::{EXTRACTION_SYSTEM_PROMPT, JSON_REPAIR_SYSTEM_PROMPT};
use recipe_eval::rubric::{Dimension, Interpretation, ALL_DIMENSIONS};
use recipe_eval::{EvaluationError, EvaluationReport, EvaluationService, EvaluationStore, RecipeEvaluator};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Mutex;

const EPS: f64 = 1e-3;

const QUINOA_RECIPE: &str = "Quinoa Black Bean Bowl\n\nTHINKING: quinoa and black beans together give a complete protein with a low glycemic load.\n\nIngredients: 1 cup quinoa, 1 can black beans, 1 avocado, lime, cumin\n\nCook quinoa 15 minutes, warm beans, assemble and dress with lime.";

#[derive(Clone)]
enum Reply {
    Text(String),
    Fail,
}

/// Answers by the kind of prompt it receives and records every system prompt.
struct ScriptedBackend {
    extraction: Reply,
    dimensions: HashMap<Dimension, Reply>,
    repair: Reply,
    calls: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    fn new(extraction: Reply, repair: Reply) -> Self {
        Self {
            extraction,
            dimensions: HashMap::new(),
            repair,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn dimension(mut self, dimension: Dimension, reply: Reply) -> Self {
        self.dimensions.insert(dimension, reply);
        self
    }

    fn every_dimension(mut self, reply: Reply) -> Self {
        for dimension in ALL_DIMENSIONS {
            self.dimensions.insert(dimension, reply.clone());
        }
        self
    }

    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn repair_calls(&self) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|system| system.as_str() == JSON_REPAIR_SYSTEM_PROMPT)
            .count()
    }
}

#[async_trait]
impl CompletionBackend for ScriptedBackend {
    async fn generate_completion(
        &self,
        system_prompt: &str,
        _user_prompt: &str,
        _json_response: bool,
    ) -> Result<String, ApiConnectionError> {
        self.calls.lock().unwrap().push(system_prompt.to_string());

        let reply = if system_prompt == EXTRACTION_SYSTEM_PROMPT {
            Some(&self.extraction)
        } else if system_prompt == JSON_REPAIR_SYSTEM_PROMPT {
            Some(&self.repair)
        } else {
            let position = ALL_DIMENSIONS
                .iter()
                .position(|d| d.system_prompt() == system_prompt);
            // Finish scorers in reverse evaluation order.
            if let Some(position) = position {
                for _ in 0..(ALL_DIMENSIONS.len() - position) * 3 {
                    tokio::task::yield_now().await;
                }
            }
            position.and_then(|p| self.dimensions.get(&ALL_DIMENSIONS[p]))
        };

        match reply {
            Some(Reply::Text(text)) => Ok(text.clone()),
            Some(Reply::Fail) | None => Err(ApiConnectionError::Timeout {
                provider: Provider::OpenAi,
            }),
        }
    }
}

fn scores_reply(dimension: Dimension, scores: &[f64]) -> Reply {
    let object: serde_json::Map<String, Value> = dimension
        .criteria()
        .iter()
        .zip(scores)
        .map(|(criterion, score)| {
            (
                criterion.to_string(),
                json!({"score": score, "evidence": format!("{criterion} evidence")}),
            )
        })
        .collect();
    Reply::Text(Value::Object(object).to_string())
}

fn quinoa_extraction() -> Reply {
    Reply::Text(
        json!({
            "title": "Quinoa Black Bean Bowl",
            "ingredients": ["1 cup quinoa", "1 can black beans", "1 avocado", "lime", "cumin"],
            "instructions": ["Cook quinoa 15 minutes", "Warm beans", "Assemble and dress with lime"],
            "reasoning": "Quinoa and black beans together give a complete protein.",
            "timing": {"total": "25 minutes"}
        })
        .to_string(),
    )
}

fn quinoa_backend() -> ScriptedBackend {
    ScriptedBackend::new(quinoa_extraction(), Reply::Fail)
        .dimension(Dimension::NutritionalQuality, scores_reply(Dimension::NutritionalQuality, &[4.0, 4.0, 5.0]))
        .dimension(Dimension::VarietyCreativity, scores_reply(Dimension::VarietyCreativity, &[3.0, 4.0, 3.0]))
        .dimension(Dimension::BudgetCost, scores_reply(Dimension::BudgetCost, &[5.0, 4.0, 4.0]))
        .dimension(Dimension::PreparationFeasibility, scores_reply(Dimension::PreparationFeasibility, &[4.0, 3.0, 4.0]))
        .dimension(Dimension::CotQuality, scores_reply(Dimension::CotQuality, &[5.0, 4.0]))
}

#[tokio::test]
async fn test_quinoa_bowl_end_to_end() {
    let evaluator = RecipeEvaluator::new(quinoa_backend());
    let result = evaluator.evaluate(QUINOA_RECIPE).await;
    let breakdown = &result.score_breakdown;

    assert!((breakdown.nutritional_quality.average - 4.333).abs() < EPS);
    assert!((breakdown.variety_creativity.average - 3.333).abs() < EPS);
    assert!((breakdown.budget_cost.average - 4.333).abs() < EPS);
    assert!((breakdown.preparation_feasibility.average - 3.667).abs() < EPS);
    assert!((breakdown.cot_quality.average - 4.5).abs() < EPS);
    assert!((breakdown.base_score - 3.917).abs() < EPS);
    assert!((breakdown.cot_bonus - 0.45).abs() < EPS);
    assert!((result.final_score - 4.367).abs() < EPS);
    assert_eq!(result.final_score, breakdown.final_score);
    assert_eq!(result.feedback.interpretation, Interpretation::Excellent);

    let strengths: Vec<&str> = result.feedback.strengths.iter().map(|s| s.criterion.as_str()).collect();
    assert_eq!(
        strengths,
        vec!["complete_vegetarian_protein", "ingredient_affordability", "reasoning_transparency"]
    );
    let improvements: Vec<&str> = result
        .feedback
        .areas_for_improvement
        .iter()
        .map(|s| s.criterion.as_str())
        .collect();
    assert_eq!(
        improvements,
        vec!["ingredient_diversity", "cultural_representation", "equipment_technique_accessibility"]
    );

    assert_eq!(result.components.title, "Quinoa Black Bean Bowl");
    assert_eq!(result.components.ingredients.len(), 5);
    // 1 extraction + 5 dimensions, no repairs.
    assert_eq!(evaluator.client().call_count(), 6);
}

#[tokio::test]
async fn test_result_serializes_with_display_field_names() {
    let evaluator = RecipeEvaluator::new(quinoa_backend());
    let service = EvaluationService::with_evaluator(evaluator);
    let report = EvaluationReport::from(service.evaluate_recipe(QUINOA_RECIPE).await);
    let json = serde_json::to_value(&report).unwrap();

    let object = json.as_object().unwrap();
    let mut keys: Vec<&str> = object.keys().map(String::as_str).collect();
    keys.sort_unstable();
    assert_eq!(keys, vec!["components", "feedback", "final_score", "score_breakdown"]);

    assert!((json["score_breakdown"]["final_score"].as_f64().unwrap() - 4.367).abs() < EPS);
    assert_eq!(json["feedback"]["strengths"][0]["criterion"], "complete_vegetarian_protein");
    assert_eq!(
        json["feedback"]["strengths"][0]["evidence"],
        "complete_vegetarian_protein evidence"
    );
    assert!(json["feedback"]["interpretation"]
        .as_str()
        .unwrap()
        .starts_with("Excellent - "));
    assert_eq!(
        json["score_breakdown"]["cot_quality"]["scores"]["educational_value"]["score"],
        4.0
    );
    assert_eq!(json["score_breakdown"]["budget_cost"]["weight"], 0.2);
}

#[tokio::test]
async fn test_all_scorers_unparseable_gives_neutral_result() {
    let backend = ScriptedBackend::new(quinoa_extraction(), Reply::Text("still not json".to_string()))
        .every_dimension(Reply::Text("I think this recipe is quite good overall.".to_string()));
    let evaluator = RecipeEvaluator::new(backend);
    let result = evaluator.evaluate(QUINOA_RECIPE).await;

    assert!((result.final_score - 3.0).abs() < 1e-9);
    for (dimension, breakdown) in result.score_breakdown.dimensions() {
        assert!((breakdown.average - 3.0).abs() < 1e-9, "{dimension}");
        assert_eq!(breakdown.error.as_ref().unwrap().error, "Failed to parse response");
        assert!(breakdown.scores.iter().all(|c| c.defaulted));
    }
    assert_eq!(result.feedback.interpretation, Interpretation::Good);
    // Exactly one repair attempt per dimension.
    assert_eq!(evaluator.client().repair_calls(), 5);
    assert_eq!(evaluator.client().call_count(), 11);
}

#[tokio::test]
async fn test_scorer_outage_degrades_to_defaults() {
    let backend = ScriptedBackend::new(Reply::Fail, Reply::Fail).every_dimension(Reply::Fail);
    let service = EvaluationService::with_evaluator(RecipeEvaluator::new(backend));
    let result = service.evaluate_recipe(QUINOA_RECIPE).await.unwrap();

    assert!((result.final_score - 3.0).abs() < 1e-9);
    assert_eq!(result.components.reasoning, QUINOA_RECIPE);
    let error = result.score_breakdown.nutritional_quality.error.as_ref().unwrap();
    assert!(error.error.contains("timed out"));
}

#[tokio::test]
async fn test_fenced_dimension_reply_avoids_repair() {
    let fenced = match scores_reply(Dimension::BudgetCost, &[2.0, 2.0, 2.0]) {
        Reply::Text(text) => Reply::Text(format!("Here is my assessment:\n```json\n{text}\n```")),
        Reply::Fail => unreachable!(),
    };
    let backend = quinoa_backend().dimension(Dimension::BudgetCost, fenced);
    let evaluator = RecipeEvaluator::new(backend);
    let result = evaluator.evaluate(QUINOA_RECIPE).await;

    assert!((result.score_breakdown.budget_cost.average - 2.0).abs() < 1e-9);
    assert_eq!(evaluator.client().repair_calls(), 0);
}

#[tokio::test]
async fn test_missing_criterion_is_neutral() {
    let partial = Reply::Text(json!({"reasoning_transparency": {"score": 5, "evidence": "explains each swap"}}).to_string());
    let backend = quinoa_backend().dimension(Dimension::CotQuality, partial);
    let result = RecipeEvaluator::new(backend).evaluate(QUINOA_RECIPE).await;

    let cot = &result.score_breakdown.cot_quality;
    assert!((cot.average - 4.0).abs() < 1e-9);
    assert!((result.score_breakdown.cot_bonus - 0.4).abs() < 1e-9);
    assert!(cot.scores[1].defaulted);
}

#[tokio::test]
async fn test_service_guards() {
    let service = EvaluationService::<ScriptedBackend>::uninitialized("No API key provided");
    assert!(matches!(
        service.evaluate_recipe(QUINOA_RECIPE).await,
        Err(EvaluationError::NotInitialized(_))
    ));

    let service = EvaluationService::with_evaluator(RecipeEvaluator::new(quinoa_backend()));
    assert!(matches!(service.evaluate_recipe("  \n ").await, Err(EvaluationError::EmptyRecipe)));
}

#[tokio::test]
async fn test_evaluate_into_replaces_previous_result() {
    let mut store = EvaluationStore::new();

    let weak = ScriptedBackend::new(quinoa_extraction(), Reply::Fail).every_dimension(Reply::Fail);
    EvaluationService::with_evaluator(RecipeEvaluator::new(weak))
        .evaluate_into(&mut store, "meal-7", QUINOA_RECIPE)
        .await
        .unwrap();
    assert!((store.get("meal-7").unwrap().final_score - 3.0).abs() < 1e-9);

    let service = EvaluationService::with_evaluator(RecipeEvaluator::new(quinoa_backend()));
    let stored = service
        .evaluate_into(&mut store, "meal-7", QUINOA_RECIPE)
        .await
        .unwrap();
    assert!((stored.final_score - 4.367).abs() < EPS);
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn test_recipe_read_from_file() {
    use std::io::Write;

    let mut file = tempfile::Builder::new()
        .prefix("quinoa_bowl")
        .suffix(".txt")
        .tempfile()
        .unwrap();
    file.write_all(QUINOA_RECIPE.as_bytes()).unwrap();
    file.flush().unwrap();

    let recipe_text = tokio::fs::read_to_string(file.path()).await.unwrap();
    let recipe_id = file.path().file_stem().unwrap().to_string_lossy().into_owned();

    let mut store = EvaluationStore::new();
    let service = EvaluationService::with_evaluator(RecipeEvaluator::new(quinoa_backend()));
    service
        .evaluate_into(&mut store, &recipe_id, &recipe_text)
        .await
        .unwrap();

    let summary = store.summary().unwrap();
    assert_eq!(summary.recipes_evaluated, 1);
    assert!(summary.best.recipe_id.starts_with("quinoa_bowl"));
    assert!((summary.average_score - 4.367).abs() < EPS);
}

#[tokio::test]
async fn test_cot_outage_scores_as_neutral_reasoning() {
    let backend = quinoa_backend().dimension(Dimension::CotQuality, Reply::Fail);
    let result = RecipeEvaluator::new(backend).evaluate(QUINOA_RECIPE).await;
    let breakdown = &result.score_breakdown;

    assert!(breakdown.cot_quality.error.is_some());
    assert!((breakdown.cot_quality.average - 3.0).abs() < 1e-9);
    assert!((breakdown.cot_bonus - 0.3).abs() < 1e-9);
    assert!((result.final_score - 4.217).abs() < EPS);
}
