use chatflow_types::{
    AwaitingInput, ChannelContext, ChoiceOption, InputKind, NodeId, Session, SessionId,
    VariableBag,
};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Durable session shape, backend-agnostic. Field names follow the
/// persisted schema (`session_id`, `flow_variables`, ...) rather than the
/// in-memory `Session`, so storage stays stable if the runtime model moves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionDocument {
    pub session_id: String,
    pub current_node_id: Option<String>,
    pub flow_variables: VariableBag,
    pub awaiting_input_type: Option<InputKind>,
    pub awaiting_input_details: Option<AwaitingDetails>,
    pub flow_context: ChannelContext,
    /// Epoch milliseconds, backend-neutral.
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AwaitingDetails {
    pub variable_to_save: String,
    pub original_node_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<ChoiceOption>>,
}

impl From<&Session> for SessionDocument {
    fn from(session: &Session) -> Self {
        Self {
            session_id: session.id.as_str().to_string(),
            current_node_id: session
                .current_node_id
                .as_ref()
                .map(|id| id.as_str().to_string()),
            flow_variables: session.variables.clone(),
            awaiting_input_type: session.awaiting_input.as_ref().map(|a| a.kind),
            awaiting_input_details: session.awaiting_input.as_ref().map(|a| AwaitingDetails {
                variable_to_save: a.variable.clone(),
                original_node_id: a.node_id.as_str().to_string(),
                options: a.options.clone(),
            }),
            flow_context: session.channel,
            created_at: session.created_at.timestamp_millis(),
            updated_at: session.updated_at.timestamp_millis(),
        }
    }
}

impl From<SessionDocument> for Session {
    fn from(doc: SessionDocument) -> Self {
        let awaiting_input = match (doc.awaiting_input_type, doc.awaiting_input_details) {
            (Some(kind), Some(details)) => Some(AwaitingInput {
                kind,
                variable: details.variable_to_save,
                node_id: NodeId::new(details.original_node_id),
                options: details.options,
            }),
            _ => None,
        };
        Self {
            id: SessionId::new(doc.session_id),
            current_node_id: doc.current_node_id.map(NodeId::new),
            variables: doc.flow_variables,
            awaiting_input,
            channel: doc.flow_context,
            created_at: millis_to_datetime(doc.created_at),
            updated_at: millis_to_datetime(doc.updated_at),
        }
    }
}

fn millis_to_datetime(millis: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .unwrap_or_else(Utc::now)
}
