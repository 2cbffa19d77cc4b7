use crate::error::ChannelError;
use serde_json::json;
use tracing::debug;

/// Dialogy client: bearer-authenticated, instance-scoped conversation
/// messages.
pub struct DialogyClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl DialogyClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    pub async fn send_text(
        &self,
        instance_id: &str,
        conversation_id: &str,
        text: &str,
    ) -> Result<(), ChannelError> {
        let url = format!(
            "{}/v1/instances/{}/conversations/{}/messages",
            self.base_url, instance_id, conversation_id
        );
        debug!(%instance_id, %conversation_id, "sending dialogy message");

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .json(&json!({ "text": text }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChannelError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}
