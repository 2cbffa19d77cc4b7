pub mod chatwoot;
pub mod dialogy;
pub mod error;
pub mod whatsapp;

pub use chatwoot::ChatwootClient;
pub use dialogy::DialogyClient;
pub use error::ChannelError;
pub use whatsapp::WhatsAppClient;

use async_trait::async_trait;

/// One outbound delivery, already resolved to concrete per-channel
/// addressing by the engine's dispatcher.
#[derive(Debug, Clone)]
pub enum ChannelMessage {
    WhatsappText {
        instance: String,
        to: String,
        text: String,
    },
    WhatsappMedia {
        instance: String,
        to: String,
        media_url: String,
        caption: Option<String>,
    },
    ChatwootText {
        instance_id: String,
        conversation_id: String,
        text: String,
    },
    DialogyText {
        instance_id: String,
        conversation_id: String,
        text: String,
    },
}

/// Capability for delivering a message to an external channel.
///
/// Implementations own credentials and wire formats; callers decide what to
/// do with a failed delivery (the engine logs and swallows it).
#[async_trait]
pub trait ChannelSender: Send + Sync {
    async fn send_text(&self, message: ChannelMessage) -> Result<(), ChannelError>;
}

/// Default [`ChannelSender`] backed by the HTTP clients in this crate.
/// Channels a deployment does not use are simply left unconfigured.
#[derive(Default)]
pub struct HttpChannels {
    whatsapp: Option<WhatsAppClient>,
    chatwoot: Option<ChatwootClient>,
    dialogy: Option<DialogyClient>,
}

impl HttpChannels {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_whatsapp(mut self, client: WhatsAppClient) -> Self {
        self.whatsapp = Some(client);
        self
    }

    pub fn with_chatwoot(mut self, client: ChatwootClient) -> Self {
        self.chatwoot = Some(client);
        self
    }

    pub fn with_dialogy(mut self, client: DialogyClient) -> Self {
        self.dialogy = Some(client);
        self
    }
}

#[async_trait]
impl ChannelSender for HttpChannels {
    async fn send_text(&self, message: ChannelMessage) -> Result<(), ChannelError> {
        match message {
            ChannelMessage::WhatsappText { instance, to, text } => {
                let client = self
                    .whatsapp
                    .as_ref()
                    .ok_or(ChannelError::NotConfigured("whatsapp"))?;
                client.send_text(&instance, &to, &text).await
            }
            ChannelMessage::WhatsappMedia {
                instance,
                to,
                media_url,
                caption,
            } => {
                let client = self
                    .whatsapp
                    .as_ref()
                    .ok_or(ChannelError::NotConfigured("whatsapp"))?;
                client
                    .send_media(&instance, &to, &media_url, caption.as_deref())
                    .await
            }
            ChannelMessage::ChatwootText {
                instance_id,
                conversation_id,
                text,
            } => {
                let client = self
                    .chatwoot
                    .as_ref()
                    .ok_or(ChannelError::NotConfigured("chatwoot"))?;
                client.send_text(&instance_id, &conversation_id, &text).await
            }
            ChannelMessage::DialogyText {
                instance_id,
                conversation_id,
                text,
            } => {
                let client = self
                    .dialogy
                    .as_ref()
                    .ok_or(ChannelError::NotConfigured("dialogy"))?;
                client.send_text(&instance_id, &conversation_id, &text).await
            }
        }
    }
}
