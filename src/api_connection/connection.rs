use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use super::endpoints::{
    AnthropicMessagesRequest, AnthropicMessagesResponse, ChatCompletionRequest,
    ChatCompletionResponse, ChatMessage, GeminiContent, GeminiGenerateRequest,
    GeminiGenerateResponse, GeminiPart, Provider, ResponseFormat, ANTHROPIC_API_VERSION,
    ANTHROPIC_MAX_TOKENS, JSON_ONLY_SYSTEM_SUFFIX, JSON_ONLY_USER_SUFFIX,
};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum ApiConnectionError {
    #[error("API key not found: set {0} or pass a key explicitly")]
    MissingApiKey(String),
    #[error("{provider}: failed to build HTTP client: {source}")]
    ClientBuild {
        provider: Provider,
        #[source]
        source: reqwest::Error,
    },
    #[error("{provider} API error: network error: {source}")]
    NetworkError {
        provider: Provider,
        #[source]
        source: reqwest::Error,
    },
    #[error("{provider} API error: malformed response body: {source}")]
    MalformedResponse {
        provider: Provider,
        #[source]
        source: reqwest::Error,
    },
    #[error("{provider} API error: request timed out")]
    Timeout { provider: Provider },
    #[error("{provider} API error {status}: {error_body}")]
    ApiError {
        provider: Provider,
        status: reqwest::StatusCode,
        error_body: String,
    },
    #[error("{provider} API error: response contained no text")]
    EmptyResponse { provider: Provider },
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl ApiConnectionError {
    fn transport(provider: Provider, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            ApiConnectionError::Timeout { provider }
        } else {
            ApiConnectionError::NetworkError { provider, source }
        }
    }

    /// Errors while reading a 2xx body: a body that is not the expected JSON is malformed,
    /// not a network failure.
    fn decode(provider: Provider, source: reqwest::Error) -> Self {
        if source.is_decode() {
            ApiConnectionError::MalformedResponse { provider, source }
        } else {
            Self::transport(provider, source)
        }
    }

    /// True when the vendor rejected a `response_format` field, i.e. the model has no JSON mode.
    pub fn is_response_format_rejection(&self) -> bool {
        matches!(self, ApiConnectionError::ApiError { error_body, .. } if error_body.contains("response_format"))
    }
}

/// The one capability every LLM backend offers the evaluation pipeline.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn generate_completion(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        json_response: bool,
    ) -> Result<String, ApiConnectionError>;
}

/// A configured client for one vendor and model.
#[derive(Clone, Debug)]
pub struct LlmClient {
    provider: Provider,
    api_key: String,
    model: String,
    base_url: String,
    supports_json_mode: bool,
    http: Client,
}

impl LlmClient {
    pub fn new(
        provider: Provider,
        api_key: &str,
        model: &str,
    ) -> Result<Self, ApiConnectionError> {
        Self::with_options(provider, api_key, model, None, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Builds a client, failing fast on a blank key. `base_url` replaces the vendor
    /// endpoint root (no trailing slash needed).
    pub fn with_options(
        provider: Provider,
        api_key: &str,
        model: &str,
        base_url: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, ApiConnectionError> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(ApiConnectionError::MissingApiKey(provider.api_key_env_var()));
        }
        let model = model.trim();
        let model = if model.is_empty() {
            provider.default_model()
        } else {
            model
        };
        let base_url = base_url
            .map_or(provider.default_base_url(), |url| url.trim_end_matches('/'))
            .to_string();
        let http = Client::builder()
            .timeout(timeout)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|source| ApiConnectionError::ClientBuild { provider, source })?;

        Ok(Self {
            provider,
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url,
            supports_json_mode: provider.supports_json_mode(model),
            http,
        })
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn supports_json_mode(&self) -> bool {
        self.supports_json_mode
    }

    /// Applies the JSON-only instructions when JSON is wanted but the model has no native mode.
    fn shape_prompts(&self, system_prompt: &str, user_prompt: &str, json_response: bool) -> (String, String) {
        if json_response && !self.supports_json_mode {
            (
                format!("{system_prompt}{JSON_ONLY_SYSTEM_SUFFIX}"),
                format!("{user_prompt}{JSON_ONLY_USER_SUFFIX}"),
            )
        } else {
            (system_prompt.to_string(), user_prompt.to_string())
        }
    }

    async fn send_json<T: serde::Serialize>(
        &self,
        request: reqwest::RequestBuilder,
        payload: &T,
    ) -> Result<reqwest::Response, ApiConnectionError> {
        let provider = self.provider;
        let response = request
            .header("Content-Type", "application/json")
            .json(payload)
            .send()
            .await
            .map_err(|e| ApiConnectionError::transport(provider, e))?;

        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            Err(ApiConnectionError::ApiError {
                provider,
                status,
                error_body,
            })
        }
    }

    async fn chat_completion(
        &self,
        system_prompt: String,
        user_prompt: String,
        json_response: bool,
    ) -> Result<String, ApiConnectionError> {
        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user_prompt,
                },
            ],
            response_format: (json_response && self.supports_json_mode)
                .then(ResponseFormat::json_object),
        };
        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .send_json(self.http.post(url).bearer_auth(&self.api_key), &request)
            .await?;
        let chat_response = response
            .json::<ChatCompletionResponse>()
            .await
            .map_err(|e| ApiConnectionError::decode(self.provider, e))?;

        chat_response
            .first_content()
            .filter(|content| !content.trim().is_empty())
            .map(str::to_string)
            .ok_or(ApiConnectionError::EmptyResponse {
                provider: self.provider,
            })
    }

    async fn anthropic_messages(
        &self,
        system_prompt: String,
        user_prompt: String,
    ) -> Result<String, ApiConnectionError> {
        let request = AnthropicMessagesRequest {
            model: self.model.clone(),
            max_tokens: ANTHROPIC_MAX_TOKENS,
            system: system_prompt,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: user_prompt,
            }],
        };
        let url = format!("{}/v1/messages", self.base_url);
        let builder = self
            .http
            .post(url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_API_VERSION);
        let response = self.send_json(builder, &request).await?;
        let messages_response = response
            .json::<AnthropicMessagesResponse>()
            .await
            .map_err(|e| ApiConnectionError::decode(self.provider, e))?;

        messages_response.text().ok_or(ApiConnectionError::EmptyResponse {
            provider: self.provider,
        })
    }

    async fn gemini_generate(
        &self,
        system_prompt: String,
        user_prompt: String,
    ) -> Result<String, ApiConnectionError> {
        // Gemini gets a single combined prompt.
        let request = GeminiGenerateRequest {
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart {
                    text: Some(format!("{system_prompt}\n\n{user_prompt}")),
                }],
            }],
        };
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let builder = self.http.post(url).query(&[("key", self.api_key.as_str())]);
        let response = self.send_json(builder, &request).await?;
        let generate_response = response
            .json::<GeminiGenerateResponse>()
            .await
            .map_err(|e| ApiConnectionError::decode(self.provider, e))?;

        generate_response.text().ok_or(ApiConnectionError::EmptyResponse {
            provider: self.provider,
        })
    }
}

#[async_trait]
impl CompletionBackend for LlmClient {
    async fn generate_completion(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        json_response: bool,
    ) -> Result<String, ApiConnectionError> {
        let (system_prompt, user_prompt) = self.shape_prompts(system_prompt, user_prompt, json_response);
        debug!(provider = %self.provider, model = %self.model, json_response, "sending completion request");

        let content = match self.provider {
            Provider::OpenAi | Provider::Mistral => {
                self.chat_completion(system_prompt, user_prompt, json_response).await?
            }
            Provider::Anthropic => self.anthropic_messages(system_prompt, user_prompt).await?,
            Provider::Google => self.gemini_generate(system_prompt, user_prompt).await?,
        };

        debug!(provider = %self.provider, chars = content.len(), "received completion");
        Ok(content)
    }
}
