use crate::error::ChannelError;
use serde_json::json;
use tracing::debug;

/// WhatsApp gateway client (Evolution-style HTTP API: instance-scoped
/// endpoints authenticated with an `apikey` header).
pub struct WhatsAppClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl WhatsAppClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    pub async fn send_text(&self, instance: &str, to: &str, text: &str) -> Result<(), ChannelError> {
        let url = format!("{}/message/sendText/{}", self.base_url, instance);
        debug!(%instance, %to, "sending whatsapp text");
        self.post(&url, json!({ "number": to, "text": text })).await
    }

    pub async fn send_media(
        &self,
        instance: &str,
        to: &str,
        media_url: &str,
        caption: Option<&str>,
    ) -> Result<(), ChannelError> {
        let url = format!("{}/message/sendMedia/{}", self.base_url, instance);
        let mut payload = json!({ "number": to, "media": media_url });
        if let Some(caption) = caption {
            payload["caption"] = json!(caption);
        }
        debug!(%instance, %to, "sending whatsapp media");
        self.post(&url, payload).await
    }

    async fn post(&self, url: &str, payload: serde_json::Value) -> Result<(), ChannelError> {
        let response = self
            .http
            .post(url)
            .header("apikey", &self.api_key)
            .json(&payload)
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
