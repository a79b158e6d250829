use async_openai::{
    Client,
    config::OpenAIConfig,
    error::OpenAIError,
    types::{ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs},
};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// Default base URL of the Gemini REST API.
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
/// Default base URL of the OpenAI REST API.
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Failures of a single text-generation call.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Request to the model endpoint failed: {0}")]
    Network(String),
    #[error("Model endpoint returned HTTP {status}: {message}")]
    Status { status: u16, message: String },
    #[error("Model response had no text content")]
    EmptyContent,
    #[error("Failed to decode model response: {0}")]
    Decode(String),
    #[error("Model provider error: {0}")]
    Provider(String),
    #[error("Model request timed out after {0:?}")]
    Timeout(Duration),
}

impl From<OpenAIError> for LlmError {
    fn from(err: OpenAIError) -> Self {
        match err {
            OpenAIError::Reqwest(e) => LlmError::Network(e.to_string()),
            e @ OpenAIError::JSONDeserialize(..) => LlmError::Decode(e.to_string()),
            other => LlmError::Provider(other.to_string()),
        }
    }
}

/// Sampling parameters sent along with a prompt.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationOptions {
    pub temperature: Option<f32>,
    pub top_k: Option<u32>,
    pub top_p: Option<f32>,
    pub max_output_tokens: Option<u32>,
}

impl GenerationOptions {
    /// Parameters for the structured step-list request.
    pub fn tutorial_steps() -> Self {
        Self {
            temperature: Some(0.7),
            top_k: Some(40),
            top_p: Some(0.95),
            max_output_tokens: Some(1024),
        }
    }

    /// Parameters for the one-sentence guidance request.
    pub fn step_guidance() -> Self {
        Self {
            temperature: Some(0.7),
            max_output_tokens: Some(100),
            ..Default::default()
        }
    }
}

/// A generic client for a text-generating model.
///
/// The credential is passed per call so a single client can serve callers
/// holding different keys.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Sends one prompt and returns the model's raw text output.
    async fn generate_text(
        &self,
        prompt: &str,
        options: &GenerationOptions,
        credential: &str,
    ) -> Result<String, LlmError>;
}

fn build_http_client(timeout: Duration) -> anyhow::Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .timeout(timeout)
        .build()?)
}

// --- Gemini wire types ---
mod gemini_types {
    use serde::{Deserialize, Serialize};

    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    pub(super) struct GenerateContentRequest {
        pub contents: Vec<Content>,
        pub generation_config: GenerationConfig,
    }
    #[derive(Serialize)]
    pub(super) struct Content {
        pub parts: Vec<Part>,
    }
    #[derive(Serialize)]
    pub(super) struct Part {
        pub text: String,
    }
    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    pub(super) struct GenerationConfig {
        #[serde(skip_serializing_if = "Option::is_none")]
        pub temperature: Option<f32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub top_k: Option<u32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub top_p: Option<f32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub max_output_tokens: Option<u32>,
    }
    #[derive(Deserialize, Debug, Default)]
    pub(super) struct GenerateContentResponse {
        #[serde(default)]
        pub candidates: Vec<Candidate>,
    }
    #[derive(Deserialize, Debug)]
    pub(super) struct Candidate {
        pub content: Option<CandidateContent>,
    }
    #[derive(Deserialize, Debug)]
    pub(super) struct CandidateContent {
        #[serde(default)]
        pub parts: Vec<CandidatePart>,
    }
    #[derive(Deserialize, Debug)]
    pub(super) struct CandidatePart {
        pub text: Option<String>,
    }
}

/// An `LLMClient` speaking the Gemini `generateContent` REST contract.
///
/// The credential travels as the `key` query parameter.
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
}

impl GeminiClient {
    pub fn new(model: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        Ok(Self {
            http: build_http_client(timeout)?,
            base_url: GEMINI_BASE_URL.to_string(),
            model: model.into(),
        })
    }

    /// Points the client at a different API root (proxies, test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl LLMClient for GeminiClient {
    async fn generate_text(
        &self,
        prompt: &str,
        options: &GenerationOptions,
        credential: &str,
    ) -> Result<String, LlmError> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        );
        let request = gemini_types::GenerateContentRequest {
            contents: vec![gemini_types::Content {
                parts: vec![gemini_types::Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: gemini_types::GenerationConfig {
                temperature: options.temperature,
                top_k: options.top_k,
                top_p: options.top_p,
                max_output_tokens: options.max_output_tokens,
            },
        };

        debug!(model = %self.model, "Sending generateContent request");

        let response = self
            .http
            .post(&url)
            .query(&[("key", credential)])
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| LlmError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(LlmError::Status {
                status: status.as_u16(),
                message: body,
            });
        }

        let parsed: gemini_types::GenerateContentResponse =
            serde_json::from_str(&body).map_err(|e| LlmError::Decode(e.to_string()))?;

        parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .and_then(|content| content.parts.into_iter().next())
            .and_then(|part| part.text)
            .filter(|text| !text.trim().is_empty())
            .ok_or(LlmError::EmptyContent)
    }
}

/// An `LLMClient` for any OpenAI-compatible chat completions API.
///
/// async-openai retries rate-limited requests on its own, so the whole call,
/// retries included, is bounded by the client's timeout.
pub struct OpenAICompatibleClient {
    http: reqwest::Client,
    api_base: String,
    model: String,
    timeout: Duration,
}

impl OpenAICompatibleClient {
    /// Creates a new client for an OpenAI-compatible service.
    ///
    /// # Arguments
    ///
    /// * `api_base` - Root URL of the service (e.g. `https://api.openai.com/v1`).
    /// * `model` - The model identifier to use for chat completions (e.g., "gpt-4o").
    /// * `timeout` - Per-request timeout.
    pub fn new(
        api_base: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            http: build_http_client(timeout)?,
            api_base: api_base.into(),
            model: model.into(),
            timeout,
        })
    }
}

#[async_trait]
impl LLMClient for OpenAICompatibleClient {
    async fn generate_text(
        &self,
        prompt: &str,
        options: &GenerationOptions,
        credential: &str,
    ) -> Result<String, LlmError> {
        let config = OpenAIConfig::new()
            .with_api_key(credential)
            .with_api_base(&self.api_base);
        let client = Client::with_config(config).with_http_client(self.http.clone());

        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(&self.model).messages(vec![
            ChatCompletionRequestUserMessageArgs::default()
                .content(prompt)
                .build()?
                .into(),
        ]);
        if let Some(temperature) = options.temperature {
            args.temperature(temperature);
        }
        if let Some(top_p) = options.top_p {
            args.top_p(top_p);
        }
        if let Some(max_tokens) = options.max_output_tokens {
            args.max_completion_tokens(max_tokens);
        }
        let request = args.build()?;

        debug!(model = %self.model, "Sending chat completion request");
        let response = tokio::time::timeout(self.timeout, client.chat().create(request))
            .await
            .map_err(|_| LlmError::Timeout(self.timeout))??;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or(LlmError::EmptyContent)
    }
}
