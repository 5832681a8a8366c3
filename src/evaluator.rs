use serde::Serialize;
use tracing::{info, warn};

use crate::api_connection::{CompletionBackend, LlmClient, Provider};
use crate::config::EvaluatorConfig;
use crate::error::{ConfigError, EvaluationError};
use crate::evaluation_store::EvaluationStore;
use crate::recipe_components::{extract_components, RecipeComponents};
use crate::rubric::{
    aggregate, generate_feedback, score_dimension, Dimension, DimensionResult, Feedback,
    ScoreBreakdown,
};

/// The outcome of one `evaluate_recipe` call. Built fresh per call and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationResult {
    pub final_score: f64,
    pub score_breakdown: ScoreBreakdown,
    pub feedback: Feedback,
    pub components: RecipeComponents,
}

/// Serializable `EvaluationResult | {"error": "..."}` shape for display layers.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum EvaluationReport {
    Completed(Box<EvaluationResult>),
    Failed { error: String },
}

impl From<Result<EvaluationResult, EvaluationError>> for EvaluationReport {
    fn from(outcome: Result<EvaluationResult, EvaluationError>) -> Self {
        match outcome {
            Ok(result) => EvaluationReport::Completed(Box::new(result)),
            Err(e) => EvaluationReport::Failed {
                error: e.to_string(),
            },
        }
    }
}

/// Runs extraction, the five rubric scorers, aggregation, and feedback.
pub struct RecipeEvaluator<C = LlmClient> {
    client: C,
}

impl RecipeEvaluator<LlmClient> {
    /// Builds an evaluator for `provider`, taking the key from `<PROVIDER>_API_KEY`
    /// when none is given and the provider's default model when `model` is `None`.
    pub fn create(
        provider: &str,
        api_key: Option<&str>,
        model: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let mut config = EvaluatorConfig::for_provider(provider)?;
        config.api_key = api_key.map(str::to_string);
        config.model = model.map(str::to_string);
        Self::from_config(&config)
    }

    pub fn from_config(config: &EvaluatorConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(config.build_client()?))
    }

    pub fn provider(&self) -> Provider {
        self.client.provider()
    }
}

impl<C: CompletionBackend> RecipeEvaluator<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub async fn evaluate(&self, recipe_text: &str) -> EvaluationResult {
        let components = extract_components(&self.client, recipe_text).await;
        info!(title = %components.title, "extracted recipe components");

        // Placement is by dimension, not by completion order.
        let (nutritional, variety, budget, preparation, cot) = tokio::join!(
            self.score_or_degrade(Dimension::NutritionalQuality, &components),
            self.score_or_degrade(Dimension::VarietyCreativity, &components),
            self.score_or_degrade(Dimension::BudgetCost, &components),
            self.score_or_degrade(Dimension::PreparationFeasibility, &components),
            self.score_or_degrade(Dimension::CotQuality, &components),
        );

        let score_breakdown = aggregate(&nutritional, &variety, &budget, &preparation, &cot);
        let feedback = generate_feedback(&score_breakdown);
        info!(
            final_score = score_breakdown.final_score,
            interpretation = feedback.interpretation.label(),
            "recipe evaluated"
        );

        EvaluationResult {
            final_score: score_breakdown.final_score,
            score_breakdown,
            feedback,
            components,
        }
    }

    async fn score_or_degrade(
        &self,
        dimension: Dimension,
        components: &RecipeComponents,
    ) -> DimensionResult {
        match score_dimension(&self.client, dimension, components).await {
            Ok(result) => result,
            Err(e) => {
                if e.is_response_format_rejection() {
                    warn!(%dimension, "model rejected structured JSON output; choose a JSON-capable model such as gpt-4-turbo");
                }
                warn!(%dimension, error = %e, "dimension scorer failed, using neutral defaults");
                DimensionResult::failed(dimension, e.to_string(), "")
            }
        }
    }
}

/// Public entry point. Holds either a ready evaluator or the reason it could not be built,
/// so callers always get a result or an explicit error and never a panic.
pub struct EvaluationService<C = LlmClient> {
    evaluator: Result<RecipeEvaluator<C>, String>,
}

impl EvaluationService<LlmClient> {
    /// Never fails; a bad configuration surfaces on the first `evaluate_recipe` call.
    pub fn new(config: &EvaluatorConfig) -> Self {
        let evaluator = RecipeEvaluator::from_config(config).map_err(|e| {
            warn!(provider = %config.provider, error = %e, "error setting up evaluator");
            e.to_string()
        });
        Self { evaluator }
    }
}

impl<C: CompletionBackend> EvaluationService<C> {
    pub fn with_evaluator(evaluator: RecipeEvaluator<C>) -> Self {
        Self {
            evaluator: Ok(evaluator),
        }
    }

    pub fn uninitialized(reason: impl Into<String>) -> Self {
        Self {
            evaluator: Err(reason.into()),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.evaluator.is_ok()
    }

    pub async fn evaluate_recipe(&self, recipe_text: &str) -> Result<EvaluationResult, EvaluationError> {
        let evaluator = self
            .evaluator
            .as_ref()
            .map_err(|reason| EvaluationError::NotInitialized(reason.clone()))?;
        if recipe_text.trim().is_empty() {
            return Err(EvaluationError::EmptyRecipe);
        }
        Ok(evaluator.evaluate(recipe_text).await)
    }

    /// Evaluates and stores the result under `recipe_id`, replacing any earlier evaluation.
    pub async fn evaluate_into<'s>(
        &self,
        store: &'s mut EvaluationStore,
        recipe_id: &str,
        recipe_text: &str,
    ) -> Result<&'s EvaluationResult, EvaluationError> {
        let result = self.evaluate_recipe(recipe_text).await?;
        Ok(store.insert(recipe_id, result))
    }
}
