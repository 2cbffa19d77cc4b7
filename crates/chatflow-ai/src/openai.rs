// OpenAI-compatible chat-completions client (HTTP direct, no SDK)

use crate::TextGenerator;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::json;

const OPENAI_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

const AGENT_SYSTEM_PROMPT: &str =
    "You are a helpful assistant replying inside a messaging conversation. \
     Answer concisely in the language the user writes in.";

pub struct OpenAiTextClient {
    http_client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OpenAiTextClient {
    /// Create a new client with an API key against the public OpenAI base.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key))
                .context("Invalid API key format")?,
        );

        let http_client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http_client,
            base_url: OPENAI_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
        })
    }

    /// Point the client at a compatible self-hosted endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    async fn complete(&self, messages: serde_json::Value) -> Result<String> {
        let payload = json!({
            "model": self.model,
            "messages": messages,
        });

        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .json(&payload)
            .send()
            .await
            .context("Chat completion request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Chat completion failed ({}): {}", status, body));
        }

        let completion: ChatCompletion = response
            .json()
            .await
            .context("Failed to parse chat completion response")?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| anyhow!("Chat completion returned no content"))
    }
}

#[async_trait]
impl TextGenerator for OpenAiTextClient {
    async fn generate_text(&self, prompt: &str) -> Result<String> {
        tracing::debug!(model = %self.model, "generating text");
        self.complete(json!([{ "role": "user", "content": prompt }]))
            .await
    }

    async fn chat_reply(&self, user_message: &str) -> Result<String> {
        tracing::debug!(model = %self.model, "generating chat reply");
        self.complete(json!([
            { "role": "system", "content": AGENT_SYSTEM_PROMPT },
            { "role": "user", "content": user_message },
        ]))
        .await
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}
