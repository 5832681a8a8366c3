use dotenv::dotenv;
use std::env;
use std::time::Duration;

use crate::api_connection::connection::DEFAULT_REQUEST_TIMEOUT;
use crate::api_connection::{LlmClient, Provider};
use crate::error::ConfigError;

pub const PROVIDER_ENV_VAR: &str = "RECIPE_EVAL_PROVIDER";
pub const MODEL_ENV_VAR: &str = "RECIPE_EVAL_MODEL";
pub const BASE_URL_ENV_VAR: &str = "RECIPE_EVAL_BASE_URL";
pub const TIMEOUT_ENV_VAR: &str = "RECIPE_EVAL_TIMEOUT_SECS";

/// Provider and model selection for an evaluator.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluatorConfig {
    pub provider: Provider,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub request_timeout: Duration,
}

impl EvaluatorConfig {
    pub fn new(provider: Provider) -> Self {
        Self {
            provider,
            api_key: None,
            model: None,
            base_url: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn for_provider(provider_id: &str) -> Result<Self, ConfigError> {
        let provider = provider_id
            .parse::<Provider>()
            .map_err(ConfigError::UnsupportedProvider)?;
        Ok(Self::new(provider))
    }

    /// Reads settings from the process environment after loading `.env`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_with_provider(None)
    }

    /// Like [`Self::from_env`], but an explicit `provider_id` wins over
    /// `RECIPE_EVAL_PROVIDER`, which is then never parsed.
    pub fn from_env_with_provider(provider_id: Option<&str>) -> Result<Self, ConfigError> {
        dotenv().ok();
        Self::from_lookup_with_provider(|name| env::var(name).ok(), provider_id)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Self::from_lookup_with_provider(lookup, None)
    }

    pub fn from_lookup_with_provider(
        lookup: impl Fn(&str) -> Option<String>,
        provider_id: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let non_empty = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let explicit = provider_id.map(str::trim).filter(|id| !id.is_empty());

        let (mut config, env_model_applies) = match explicit {
            Some(id) => {
                let config = Self::for_provider(id)?;
                // RECIPE_EVAL_MODEL only carries over when it was chosen for the same vendor.
                let same_vendor = non_empty(PROVIDER_ENV_VAR)
                    .and_then(|env_id| env_id.parse::<Provider>().ok())
                    .map_or(config.provider == Provider::OpenAi, |env_provider| env_provider == config.provider);
                (config, same_vendor)
            }
            None => match non_empty(PROVIDER_ENV_VAR) {
                Some(env_id) => (Self::for_provider(&env_id)?, true),
                None => (Self::new(Provider::OpenAi), true),
            },
        };
        if env_model_applies {
            config.model = non_empty(MODEL_ENV_VAR);
        }
        config.base_url = non_empty(BASE_URL_ENV_VAR);
        config.api_key = non_empty(&config.provider.api_key_env_var());
        if let Some(raw) = non_empty(TIMEOUT_ENV_VAR) {
            let secs = raw.parse::<u64>().map_err(|_| ConfigError::InvalidValue {
                name: TIMEOUT_ENV_VAR,
                value: raw.clone(),
            })?;
            config.request_timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn resolved_model(&self) -> &str {
        self.model
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| self.provider.default_model())
    }

    /// Explicit key first, then `<PROVIDER>_API_KEY` from the environment.
    pub fn resolve_api_key(&self) -> Result<String, ConfigError> {
        self.resolve_api_key_with(|name| env::var(name).ok())
    }

    pub fn resolve_api_key_with(&self, lookup: impl Fn(&str) -> Option<String>) -> Result<String, ConfigError> {
        if let Some(key) = self.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
            return Ok(key.to_string());
        }
        let env_var = self.provider.api_key_env_var();
        lookup(&env_var)
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or(ConfigError::MissingApiKey(env_var))
    }

    pub fn build_client(&self) -> Result<LlmClient, ConfigError> {
        let api_key = self.resolve_api_key()?;
        Ok(LlmClient::with_options(
            self.provider,
            &api_key,
            self.resolved_model(),
            self.base_url.as_deref(),
            self.request_timeout,
        )?)
    }
}
