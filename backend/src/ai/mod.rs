//! Calls to a chat-completion language model.
//!
//! The service talks to the model through the `LanguageModel` trait. `OpenAiClient` implements
//! it against an OpenAI-compatible HTTP API. Tests use a scripted fake.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod generation;
pub mod prompts;

pub use generation::{
    extract_idea, generate_landing_page, summarize_results, ExtractedIdea, GeneratedLandingPage,
    MarketPotential, ResultsSummary,
};

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("no API key configured for the language model")]
    NotConfigured,
    #[error("language model request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("language model returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("no response from the language model")]
    EmptyReply,
    #[error("could not parse the language model reply: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Model names for the two tiers of task.
#[derive(Clone, Debug)]
pub struct Models {
    /// Used for landing page copy and result summaries.
    pub main: String,
    /// Used for quick extraction tasks.
    pub fast: String,
}

/// One system + user exchange. The reply is always requested as a JSON object.
#[derive(Clone, Debug, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub system: String,
    pub user: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Returns the text of the first choice.
    async fn complete(&self, request: ChatRequest) -> Result<String, LlmError>;
}

pub struct OpenAiClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl OpenAiClient {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Serialize)]
struct ChatCompletionBody<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    response_format: ResponseFormat,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Deserialize)]
struct ReplyMessage {
    content: Option<String>,
}

fn request_body(request: &ChatRequest) -> ChatCompletionBody<'_> {
    ChatCompletionBody {
        model: &request.model,
        messages: vec![
            ChatMessage {
                role: "system",
                content: &request.system,
            },
            ChatMessage {
                role: "user",
                content: &request.user,
            },
        ],
        response_format: ResponseFormat {
            format_type: "json_object",
        },
        temperature: request.temperature,
        max_tokens: request.max_tokens,
    }
}

fn first_choice(completion: ChatCompletion) -> Result<String, LlmError> {
    completion
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or(LlmError::EmptyReply)
}

#[async_trait]
impl LanguageModel for OpenAiClient {
    async fn complete(&self, request: ChatRequest) -> Result<String, LlmError> {
        if self.api_key.is_empty() {
            return Err(LlmError::NotConfigured);
        }
        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request_body(&request))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                body,
            });
        }
        let completion: ChatCompletion = response.json().await?;
        first_choice(completion)
    }
}
