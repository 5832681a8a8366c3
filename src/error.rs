use thiserror::Error;

use crate::api_connection::ApiConnectionError;

/// Problems found while turning settings into a working LLM client.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unsupported provider: {0} (expected one of openai, mistral, anthropic, google)")]
    UnsupportedProvider(String),
    #[error("No API key provided and {0} environment variable not found")]
    MissingApiKey(String),
    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
    #[error(transparent)]
    Client(#[from] ApiConnectionError),
}

/// Why `evaluate_recipe` returned no result.
#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error("Evaluator not initialized: {0}")]
    NotInitialized(String),
    #[error("Recipe text is empty")]
    EmptyRecipe,
}
