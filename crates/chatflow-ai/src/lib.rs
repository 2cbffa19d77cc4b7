pub mod openai;

pub use openai::OpenAiTextClient;

use anyhow::Result;
use async_trait::async_trait;

/// AI capability consumed by the engine's generation nodes.
///
/// `generate_text` is a one-shot prompt completion (the `ai-text-generation`
/// node); `chat_reply` answers a single end-user message in an assistant
/// persona (the `intelligent-agent` node).
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate_text(&self, prompt: &str) -> Result<String>;

    async fn chat_reply(&self, user_message: &str) -> Result<String>;
}
