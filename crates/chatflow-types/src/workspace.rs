use serde::{Deserialize, Serialize};

/// Channel-instance linkage the workspace resolves for a run: which external
/// messaging instances a session's channel context maps to. Read-only to the
/// engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkspaceChannels {
    /// Default WhatsApp instance used when neither the node configuration
    /// nor the session variables name one.
    pub whatsapp_instance: Option<String>,
    pub chatwoot_instance_id: Option<String>,
    pub dialogy_instance_id: Option<String>,
}

impl WorkspaceChannels {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_whatsapp_instance(mut self, instance: impl Into<String>) -> Self {
        self.whatsapp_instance = Some(instance.into());
        self
    }

    pub fn with_chatwoot_instance(mut self, id: impl Into<String>) -> Self {
        self.chatwoot_instance_id = Some(id.into());
        self
    }

    pub fn with_dialogy_instance(mut self, id: impl Into<String>) -> Self {
        self.dialogy_instance_id = Some(id.into());
        self
    }
}
