use crate::context::ExecutionContext;
use chatflow_channels::ChannelMessage;
use chatflow_types::{
    ChannelContext, Session, CONTACT_PHONE_VAR, CONVERSATION_ID_VAR, INSTANCE_VAR,
};
use serde_json::Value;
use tracing::warn;

/// Delivers `text` through the session's channel context. Pure side-effect
/// sink: addressing gaps and delivery failures are logged and swallowed,
/// control flow is never affected.
pub async fn deliver(ctx: &ExecutionContext, session: &Session, text: &str) {
    if text.trim().is_empty() {
        return;
    }

    let message = match session.channel {
        ChannelContext::Dialogy => {
            let Some(instance_id) = ctx.workspace.dialogy_instance_id.clone() else {
                warn!(session_id = %session.id, "no dialogy instance linked, dropping message");
                return;
            };
            let Some(conversation_id) = string_var(session, CONVERSATION_ID_VAR) else {
                warn!(session_id = %session.id, "no dialogy conversation id, dropping message");
                return;
            };
            ChannelMessage::DialogyText {
                instance_id,
                conversation_id,
                text: text.to_string(),
            }
        }
        ChannelContext::Chatwoot => {
            let Some(instance_id) = ctx.workspace.chatwoot_instance_id.clone() else {
                warn!(session_id = %session.id, "no chatwoot instance linked, dropping message");
                return;
            };
            let Some(conversation_id) = string_var(session, CONVERSATION_ID_VAR) else {
                warn!(session_id = %session.id, "no chatwoot conversation id, dropping message");
                return;
            };
            ChannelMessage::ChatwootText {
                instance_id,
                conversation_id,
                text: text.to_string(),
            }
        }
        ChannelContext::Whatsapp => {
            let Some(to) = whatsapp_recipient(session) else {
                warn!(session_id = %session.id, "no whatsapp recipient, dropping message");
                return;
            };
            let Some(instance) = whatsapp_instance(ctx, session) else {
                warn!(session_id = %session.id, "no whatsapp instance, dropping message");
                return;
            };
            ChannelMessage::WhatsappText {
                instance,
                to,
                text: text.to_string(),
            }
        }
    };

    if let Err(e) = ctx.channels.send_text(message).await {
        warn!(session_id = %session.id, error = %e, "outbound delivery failed");
    }
}

/// Recipient for WhatsApp delivery: the contact variable, falling back to
/// the recipient embedded in the `<instance>:<recipient>` session id shape.
pub(crate) fn whatsapp_recipient(session: &Session) -> Option<String> {
    string_var(session, CONTACT_PHONE_VAR)
        .or_else(|| session.id.embedded_recipient().map(str::to_string))
}

pub(crate) fn whatsapp_instance(ctx: &ExecutionContext, session: &Session) -> Option<String> {
    string_var(session, INSTANCE_VAR).or_else(|| ctx.workspace.whatsapp_instance.clone())
}

pub(crate) fn string_var(session: &Session, key: &str) -> Option<String> {
    match session.variables.get_path(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
