//! Language-model categorizer over HTTP.
//!
//! Four wire dialects are supported: OpenAI-compatible chat completions, the
//! OpenAI Responses API, Gemini `generateContent` and Anthropic messages. Each
//! asks for JSON where the dialect allows it, and each returns the model's text,
//! which must be a JSON object `{"categories": [...]}`.

use std::future::Future;
use std::str::FromStr;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::Deserialize;
use serde_json::{Value, json};
use thiserror::Error;

use super::category::CategoryGroup;
use super::prompt::system_prompt;

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com/v1";
pub const GOOGLE_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_OUTPUT_TOKENS: u32 = 2048;

/// Categorizes raw release notes into ordered groups.
///
/// Implementations may fail; callers are expected to fall back to the local
/// heuristic.
pub trait Categorizer {
    fn categorize(
        &self,
        body: &str,
    ) -> impl Future<Output = Result<Vec<CategoryGroup>, CategorizeError>> + Send;
}

#[derive(Debug, Error)]
pub enum CategorizeError {
    #[error("model request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("model endpoint returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("model response had no text content")]
    EmptyResponse,

    #[error("model output is not the expected JSON: {0}")]
    InvalidOutput(#[from] serde_json::Error),

    #[error("invalid API key header value")]
    InvalidApiKey,
}

/// Which HTTP dialect to speak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Provider {
    /// Chat completions.
    #[default]
    OpenAi,
    /// The Responses API.
    OpenAiResponses,
    Google,
    Anthropic,
}

impl Provider {
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Provider::OpenAi | Provider::OpenAiResponses => OPENAI_BASE_URL,
            Provider::Google => GOOGLE_BASE_URL,
            Provider::Anthropic => ANTHROPIC_BASE_URL,
        }
    }
}

#[derive(Debug, Error)]
#[error(
    "unknown AI provider {0:?} (expected openai-completions, openai-responses, google or anthropic)"
)]
pub struct UnknownProvider(String);

impl FromStr for Provider {
    type Err = UnknownProvider;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" | "openai-chat" | "openai-completions" => Ok(Provider::OpenAi),
            "openai-responses" => Ok(Provider::OpenAiResponses),
            "google" | "gemini" => Ok(Provider::Google),
            "anthropic" => Ok(Provider::Anthropic),
            _ => Err(UnknownProvider(s.to_string())),
        }
    }
}

/// Model connection settings.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub provider: Provider,
    /// `None` uses the provider's public endpoint.
    pub base_url: Option<String>,
    pub api_key: String,
    pub model: String,
    pub target_lang: String,
}

/// A [`Categorizer`] backed by a hosted language model.
#[derive(Debug, Clone)]
pub struct LlmCategorizer {
    http: reqwest::Client,
    settings: LlmSettings,
}

#[derive(Debug, Deserialize)]
struct ModelOutput {
    #[serde(default)]
    categories: Vec<CategoryGroup>,
}

impl LlmCategorizer {
    pub fn new(http: reqwest::Client, settings: LlmSettings) -> Self {
        LlmCategorizer { http, settings }
    }

    fn endpoint(&self, path: &str) -> String {
        let base = self
            .settings
            .base_url
            .as_deref()
            .unwrap_or_else(|| self.settings.provider.default_base_url());
        format!("{}/{path}", base.trim_end_matches('/'))
    }

    fn headers(&self) -> Result<HeaderMap, CategorizeError> {
        let mut headers = HeaderMap::new();
        match self.settings.provider {
            Provider::OpenAi | Provider::OpenAiResponses => {
                let value = HeaderValue::from_str(&format!("Bearer {}", self.settings.api_key))
                    .map_err(|_| CategorizeError::InvalidApiKey)?;
                headers.insert(AUTHORIZATION, value);
            }
            Provider::Google => {
                let value = HeaderValue::from_str(&self.settings.api_key)
                    .map_err(|_| CategorizeError::InvalidApiKey)?;
                headers.insert("x-goog-api-key", value);
            }
            Provider::Anthropic => {
                let value = HeaderValue::from_str(&self.settings.api_key)
                    .map_err(|_| CategorizeError::InvalidApiKey)?;
                headers.insert("x-api-key", value);
                headers.insert("anthropic-version", HeaderValue::from_static(ANTHROPIC_VERSION));
            }
        }
        Ok(headers)
    }

    fn request(&self, body: &str) -> (String, Value) {
        let system = system_prompt(&self.settings.target_lang);
        match self.settings.provider {
            Provider::OpenAi => (
                self.endpoint("chat/completions"),
                json!({
                    "model": self.settings.model,
                    "messages": [
                        {"role": "system", "content": system},
                        {"role": "user", "content": body},
                    ],
                    "response_format": {"type": "json_object"},
                }),
            ),
            Provider::OpenAiResponses => (
                self.endpoint("responses"),
                json!({
                    "model": self.settings.model,
                    "instructions": system,
                    "input": body,
                    "text": {"format": {"type": "json_object"}},
                }),
            ),
            Provider::Google => (
                self.endpoint(&format!(
                    "models/{}:generateContent",
                    urlencoding::encode(&self.settings.model)
                )),
                json!({
                    "systemInstruction": {"parts": [{"text": system}]},
                    "contents": [{"role": "user", "parts": [{"text": body}]}],
                    "generationConfig": {"responseMimeType": "application/json"},
                }),
            ),
            Provider::Anthropic => (
                self.endpoint("messages"),
                json!({
                    "model": self.settings.model,
                    "max_tokens": MAX_OUTPUT_TOKENS,
                    "system": system,
                    "messages": [{"role": "user", "content": body}],
                }),
            ),
        }
    }

    async fn complete(&self, body: &str) -> Result<String, CategorizeError> {
        let (url, payload) = self.request(body);
        let response = self
            .http
            .post(url)
            .headers(self.headers()?)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CategorizeError::Status { status, body });
        }

        let value: Value = response.json().await?;
        extract_text(self.settings.provider, &value).ok_or(CategorizeError::EmptyResponse)
    }
}

impl Categorizer for LlmCategorizer {
    fn categorize(
        &self,
        body: &str,
    ) -> impl Future<Output = Result<Vec<CategoryGroup>, CategorizeError>> + Send {
        let body = body.to_string();
        async move {
            let text = self.complete(&body).await?;
            parse_model_output(&text)
        }
    }
}

fn extract_text(provider: Provider, value: &Value) -> Option<String> {
    let text = match provider {
        Provider::OpenAi => value
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .map(str::to_string),
        Provider::OpenAiResponses => {
            let text: String = value
                .get("output")?
                .as_array()?
                .iter()
                .filter_map(|item| item.get("content").and_then(Value::as_array))
                .flatten()
                .filter(|c| c.get("type").and_then(Value::as_str) == Some("output_text"))
                .filter_map(|c| c.get("text").and_then(Value::as_str))
                .collect();
            Some(text)
        }
        Provider::Google => {
            let parts = value.pointer("/candidates/0/content/parts")?.as_array()?;
            let text: String = parts
                .iter()
                .filter_map(|p| p.get("text").and_then(Value::as_str))
                .collect();
            Some(text)
        }
        Provider::Anthropic => {
            let blocks = value.get("content")?.as_array()?;
            let text: String = blocks
                .iter()
                .filter(|b| b.get("type").and_then(Value::as_str) == Some("text"))
                .filter_map(|b| b.get("text").and_then(Value::as_str))
                .collect();
            Some(text)
        }
    };
    text.filter(|t| !t.trim().is_empty())
}

/// Parses the model's JSON answer, tolerating a surrounding code fence.
pub fn parse_model_output(text: &str) -> Result<Vec<CategoryGroup>, CategorizeError> {
    let output: ModelOutput = serde_json::from_str(strip_code_fence(text))?;
    Ok(output.categories)
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (e.g. `json`) on the opening fence line.
    let rest = rest.split_once('\n').map_or("", |(_, body)| body);
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}
