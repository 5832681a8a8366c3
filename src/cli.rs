use clap::Parser;
use std::time::Duration;

use crate::config::EvaluatorConfig;
use crate::error::ConfigError;

#[derive(Parser, Debug)]
#[command(author, version, about = "Score a recipe against the MealMate rubric", long_about = None)]
pub struct Cli {
    /// Path to the recipe text file
    #[arg(short, long)]
    pub recipe_file: String,

    /// LLM provider: openai, mistral, anthropic, or google
    #[arg(short, long)]
    pub provider: Option<String>,

    /// Model name; defaults to the provider's standard model
    #[arg(short, long)]
    pub model: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Identifier to file the evaluation under (defaults to the file name)
    #[arg(long)]
    pub recipe_id: Option<String>,

    /// Log pipeline progress to stderr
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Loads `.env` and the environment, with flags taking precedence.
    pub fn load_config(&self) -> Result<EvaluatorConfig, ConfigError> {
        let config = EvaluatorConfig::from_env_with_provider(self.provider.as_deref())?;
        Ok(self.apply_overrides(config))
    }

    pub fn config_from_lookup(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<EvaluatorConfig, ConfigError> {
        let config = EvaluatorConfig::from_lookup_with_provider(lookup, self.provider.as_deref())?;
        Ok(self.apply_overrides(config))
    }

    fn apply_overrides(&self, mut config: EvaluatorConfig) -> EvaluatorConfig {
        if let Some(model) = &self.model {
            config.model = Some(model.clone());
        }
        if let Some(secs) = self.timeout_secs {
            config.request_timeout = Duration::from_secs(secs);
        }
        config
    }
}

pub fn parse_args() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api_connection::Provider;
    use crate::config::{MODEL_ENV_VAR, PROVIDER_ENV_VAR};
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_flags_override_environment() {
        let cli = Cli::parse_from([
            "recipe_eval",
            "--recipe-file",
            "bowl.txt",
            "--provider",
            "mistral",
            "--timeout-secs",
            "15",
        ]);
        let config = cli
            .config_from_lookup(lookup_from(&[
                (PROVIDER_ENV_VAR, "openai"),
                ("OPENAI_API_KEY", "openai-key"),
                (MODEL_ENV_VAR, "gpt-4o"),
            ]))
            .unwrap();
        assert_eq!(config.provider, Provider::Mistral);
        assert!(config.api_key.is_none());
        assert_eq!(config.resolved_model(), "mistral-medium");
        assert_eq!(config.request_timeout, Duration::from_secs(15));
    }

    #[test]
    fn test_provider_flag_rescues_invalid_environment_provider() {
        let cli = Cli::parse_from(["recipe_eval", "-r", "bowl.txt", "-p", "anthropic"]);
        let config = cli
            .config_from_lookup(lookup_from(&[
                (PROVIDER_ENV_VAR, "not-a-vendor"),
                ("ANTHROPIC_API_KEY", "sk-ant"),
            ]))
            .unwrap();
        assert_eq!(config.provider, Provider::Anthropic);
        assert_eq!(config.api_key.as_deref(), Some("sk-ant"));

        let without_flag = Cli::parse_from(["recipe_eval", "-r", "bowl.txt"]);
        let err = without_flag
            .config_from_lookup(lookup_from(&[(PROVIDER_ENV_VAR, "not-a-vendor")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedProvider(_)));
    }

    #[test]
    fn test_same_provider_keeps_environment_key() {
        let cli = Cli::parse_from(["recipe_eval", "-r", "bowl.txt", "-p", "openai", "-m", "gpt-3.5-turbo"]);
        let config = cli
            .config_from_lookup(lookup_from(&[("OPENAI_API_KEY", "openai-key")]))
            .unwrap();
        assert_eq!(config.api_key.as_deref(), Some("openai-key"));
        assert_eq!(config.resolved_model(), "gpt-3.5-turbo");
    }
}
