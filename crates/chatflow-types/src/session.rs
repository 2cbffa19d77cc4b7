use crate::id::{NodeId, SessionId};
use crate::node::ChoiceOption;
use crate::variables::VariableBag;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Variable the webhook collaborator sets before invoking the engine so the
/// `start` node knows which trigger handle fired. Consumed on read.
pub const PENDING_TRIGGER_VAR: &str = "__pending_trigger";

/// Well-known variables the outbound dispatcher resolves addressing from.
pub const CONTACT_PHONE_VAR: &str = "contact_phone";
pub const CONVERSATION_ID_VAR: &str = "conversation_id";
pub const INSTANCE_VAR: &str = "whatsapp_instance";

/// Which external messaging system a session's outbound messages route
/// through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelContext {
    #[default]
    Whatsapp,
    Chatwoot,
    Dialogy,
}

/// Kind of external input a suspended session is waiting on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    Text,
    Date,
    File,
    Rating,
    Choice,
}

/// Suspension details persisted alongside a session so a later invocation
/// can merge the reply and re-enter the loop after the suspending node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AwaitingInput {
    pub kind: InputKind,
    /// Variable the external reply is written into.
    pub variable: String,
    /// The node that suspended; resumption routes from its outgoing edges.
    pub node_id: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<ChoiceOption>>,
}

/// The resumable, per-end-user execution context. Owned exclusively by one
/// execution-loop invocation at a time; the store provides the durable copy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub current_node_id: Option<NodeId>,
    pub variables: VariableBag,
    pub awaiting_input: Option<AwaitingInput>,
    pub channel: ChannelContext,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new(id: impl Into<SessionId>, channel: ChannelContext) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            current_node_id: None,
            variables: VariableBag::new(),
            awaiting_input: None,
            channel,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_variables(mut self, variables: VariableBag) -> Self {
        self.variables = variables;
        self
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Marks the trigger handle the next `start` node should route on.
    pub fn set_pending_trigger(&mut self, handle: impl Into<String>) {
        self.variables
            .insert(PENDING_TRIGGER_VAR, serde_json::Value::String(handle.into()));
    }
}
