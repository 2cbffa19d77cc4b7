use crate::error::ChannelError;
use serde_json::json;
use tracing::debug;

/// Chatwoot client: posts outgoing messages into an existing conversation
/// under an account (the workspace's linked instance id).
pub struct ChatwootClient {
    http: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl ChatwootClient {
    pub fn new(base_url: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
        }
    }

    pub async fn send_text(
        &self,
        account_id: &str,
        conversation_id: &str,
        text: &str,
    ) -> Result<(), ChannelError> {
        let url = format!(
            "{}/api/v1/accounts/{}/conversations/{}/messages",
            self.base_url, account_id, conversation_id
        );
        debug!(%account_id, %conversation_id, "sending chatwoot message");

        let response = self
            .http
            .post(&url)
            .header("api_access_token", &self.access_token)
            .json(&json!({ "content": text, "message_type": "outgoing" }))
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
