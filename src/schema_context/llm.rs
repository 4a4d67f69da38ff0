//! LLM-backed term suggestions
//!
//! Supports two API formats:
//! - **Anthropic** (default): Claude API with `x-api-key` auth
//! - **OpenAI-compatible**: Works with OpenAI, Ollama, vLLM, LiteLLM, Qwen/DashScope, etc.
//!
//! Set `GRAPHLENS_LLM_PROVIDER=openai` to switch to OpenAI-compatible mode.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::errors::SuggestError;
use super::mapping::MappingRegistry;
use super::term_extractor::TermSuggester;
use super::types::QueryTerms;

/// Supported API providers
#[derive(Debug, Clone, PartialEq)]
pub enum LlmProvider {
    Anthropic,
    OpenAI,
}

/// LLM configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub model: String,
    pub api_url: String,
    pub max_tokens: u32,
    pub provider: LlmProvider,
}

impl LlmConfig {
    /// Load config from environment. Returns None if no API key is set.
    ///
    /// Checks `GRAPHLENS_LLM_PROVIDER` to determine the provider:
    /// - `"openai"` → OpenAI-compatible mode (`OPENAI_API_KEY`, base URL from
    ///   `OPENAI_BASE_URL` when set)
    /// - `"anthropic"` or unset → Anthropic mode (`ANTHROPIC_API_KEY`)
    pub fn from_env() -> Option<Self> {
        let provider_str = std::env::var("GRAPHLENS_LLM_PROVIDER")
            .unwrap_or_default()
            .to_lowercase();

        let (provider, api_key, default_model, default_url) = match provider_str.as_str() {
            "openai" => {
                let key = std::env::var("OPENAI_API_KEY").ok()?;
                let url = std::env::var("OPENAI_BASE_URL")
                    .map(|base| format!("{}/chat/completions", base.trim_end_matches('/')))
                    .unwrap_or_else(|_| "https://api.openai.com/v1/chat/completions".to_string());
                (LlmProvider::OpenAI, key, "gpt-4o-mini".to_string(), url)
            }
            _ => {
                let key = std::env::var("ANTHROPIC_API_KEY").ok()?;
                (
                    LlmProvider::Anthropic,
                    key,
                    "claude-3-5-haiku-latest".to_string(),
                    "https://api.anthropic.com/v1/messages".to_string(),
                )
            }
        };

        if api_key.is_empty() {
            return None;
        }

        Some(Self {
            api_key,
            model: std::env::var("GRAPHLENS_LLM_MODEL").unwrap_or(default_model),
            api_url: std::env::var("GRAPHLENS_LLM_API_URL").unwrap_or(default_url),
            max_tokens: std::env::var("GRAPHLENS_LLM_MAX_TOKENS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(512),
            provider,
        })
    }
}

// ── Anthropic API types ──

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    system: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContentBlock>,
}

#[derive(Debug, Deserialize)]
struct AnthropicContentBlock {
    text: Option<String>,
}

// ── OpenAI-compatible API types ──

#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIMessage {
    content: Option<String>,
}

// ── Shared types ──

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

/// Shape the model is asked to answer with
#[derive(Debug, Default, Deserialize)]
struct SuggestedTerms {
    #[serde(default)]
    entities: Vec<String>,
    #[serde(default)]
    attributes: Vec<String>,
    #[serde(default)]
    actions: Vec<String>,
}

const SYSTEM_PROMPT: &str = "You extract key terms from business questions asked against an \
ERP knowledge graph. Classify each term as an entity (a kind of business object), an \
attribute (a property of an object) or an action (a relation between objects). Reply with \
JSON only.";

/// Temperature for term extraction; low so repeated queries agree
const TEMPERATURE: f32 = 0.1;

/// [`TermSuggester`] that asks an LLM for entity/attribute/action words
pub struct LlmTermSuggester {
    client: Client,
    config: LlmConfig,
    mappings: Arc<MappingRegistry>,
}

impl LlmTermSuggester {
    pub fn new(config: LlmConfig, mappings: Arc<MappingRegistry>) -> Self {
        LlmTermSuggester {
            client: Client::new(),
            config,
            mappings,
        }
    }

    /// Build from environment, `None` when no API key is configured
    pub fn from_env(mappings: Arc<MappingRegistry>) -> Option<Self> {
        LlmConfig::from_env().map(|config| Self::new(config, mappings))
    }

    fn user_prompt(&self, query_text: &str) -> String {
        let tables = self.mappings.snapshot();
        format!(
            "User question: {}\n\n\
             Known business terms: {}\n\n\
             Return JSON of the form:\n\
             {{\"entities\": [\"...\"], \"attributes\": [\"...\"], \"actions\": [\"...\"]}}\n\
             Return ONLY the JSON, no explanation.",
            query_text,
            tables.vocabulary_terms().join(", ")
        )
    }
}

#[async_trait]
impl TermSuggester for LlmTermSuggester {
    async fn suggest(&self, query_text: &str) -> Result<QueryTerms, SuggestError> {
        let user_prompt = self.user_prompt(query_text);
        let text = call_llm(&self.client, &self.config, SYSTEM_PROMPT, &user_prompt).await?;
        parse_suggested_terms(&text)
    }
}

/// Parse a model reply into [`QueryTerms`].
///
/// Tolerates code fences and prose around the JSON object.
pub fn parse_suggested_terms(text: &str) -> Result<QueryTerms, SuggestError> {
    let start = text.find('{');
    let end = text.rfind('}');
    let json = match (start, end) {
        (Some(s), Some(e)) if s < e => &text[s..=e],
        _ => {
            return Err(SuggestError::MalformedResponse(format!(
                "no JSON object in response: {}",
                truncate(text, 80)
            )))
        }
    };

    let parsed: SuggestedTerms = serde_json::from_str(json)
        .map_err(|e| SuggestError::MalformedResponse(e.to_string()))?;

    Ok(QueryTerms {
        entities: parsed.entities.into_iter().collect(),
        attributes: parsed.attributes.into_iter().collect(),
        actions: parsed.actions.into_iter().collect(),
    })
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Provider reply body reduced to its text content
trait ReplyText: DeserializeOwned {
    fn into_text(self) -> String;
}

impl ReplyText for AnthropicResponse {
    fn into_text(self) -> String {
        self.content.into_iter().filter_map(|b| b.text).collect()
    }
}

impl ReplyText for OpenAIResponse {
    fn into_text(self) -> String {
        self.choices
            .into_iter()
            .filter_map(|c| c.message.content)
            .collect()
    }
}

impl LlmProvider {
    fn name(&self) -> &'static str {
        match self {
            LlmProvider::Anthropic => "Anthropic",
            LlmProvider::OpenAI => "OpenAI",
        }
    }
}

fn chat_message(role: &str, content: &str) -> ChatMessage {
    ChatMessage {
        role: role.to_string(),
        content: content.to_string(),
    }
}

/// Ask the configured provider for a completion and return its text
async fn call_llm(
    client: &Client,
    config: &LlmConfig,
    system_prompt: &str,
    user_prompt: &str,
) -> Result<String, SuggestError> {
    let post = client
        .post(&config.api_url)
        .header("content-type", "application/json");

    match config.provider {
        LlmProvider::Anthropic => {
            let request = AnthropicRequest {
                model: config.model.clone(),
                max_tokens: config.max_tokens,
                system: system_prompt.to_string(),
                messages: vec![chat_message("user", user_prompt)],
                temperature: TEMPERATURE,
            };
            let post = post
                .header("x-api-key", &config.api_key)
                .header("anthropic-version", "2023-06-01")
                .json(&request);
            reply_text::<AnthropicResponse>(&config.provider, post).await
        }
        LlmProvider::OpenAI => {
            let request = OpenAIRequest {
                model: config.model.clone(),
                max_tokens: config.max_tokens,
                messages: vec![
                    chat_message("system", system_prompt),
                    chat_message("user", user_prompt),
                ],
                temperature: TEMPERATURE,
            };
            let post = post
                .header("authorization", format!("Bearer {}", config.api_key))
                .json(&request);
            reply_text::<OpenAIResponse>(&config.provider, post).await
        }
    }
}

async fn reply_text<R: ReplyText>(
    provider: &LlmProvider,
    request: RequestBuilder,
) -> Result<String, SuggestError> {
    let name = provider.name();
    let response = request
        .send()
        .await
        .map_err(|e| SuggestError::Request(format!("{} API request failed: {}", name, e)))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(SuggestError::Request(format!(
            "{} API error ({}): {}",
            name, status, body
        )));
    }

    let reply: R = response
        .json()
        .await
        .map_err(|e| SuggestError::MalformedResponse(format!("{} response: {}", name, e)))?;

    reply_or_empty(name, reply.into_text())
}

fn reply_or_empty(provider: &str, text: String) -> Result<String, SuggestError> {
    if text.trim().is_empty() {
        return Err(SuggestError::MalformedResponse(format!(
            "{} returned empty response",
            provider
        )));
    }
    Ok(text)
}
