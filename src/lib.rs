pub mod api_connection;
pub mod cli;
pub mod config;
pub mod error;
pub mod evaluation_store;
pub mod evaluator;
pub mod json_repair;
pub mod prompts;
pub mod recipe_components;
pub mod rubric;

pub use config::EvaluatorConfig;
pub use error::{ConfigError, EvaluationError};
pub use evaluation_store::EvaluationStore;
pub use evaluator::{EvaluationReport, EvaluationResult, EvaluationService, RecipeEvaluator};
