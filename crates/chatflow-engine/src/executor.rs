use crate::condition::{evaluate, in_time_window, parse_clock, parse_utc_offset};
use crate::context::ExecutionContext;
use crate::http::{HttpRequest, ResolvedAuth};
use crate::outbound::{self, whatsapp_instance, whatsapp_recipient};
use crate::substitute::{substitute, value_to_string};
use chatflow_channels::ChannelMessage;
use chatflow_types::{
    ApiAuth, AwaitingInput, ChoiceOption, HandleId, InputKind, Node, NodeKind, Session,
    PENDING_TRIGGER_VAR,
};
use chrono::Utc;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Variable the intelligent-agent node reads when no input variable is
/// configured; the webhook collaborator merges the inbound text here.
const DEFAULT_AGENT_INPUT_VAR: &str = "last_message";

/// What a node handler decided: route on a handle, suspend the session
/// pending external input, or halt the run at a terminal node.
pub(crate) enum NodeOutcome {
    Next(HandleId),
    Suspend(AwaitingInput),
    Halt,
}

/// Dispatch table: one arm per node variant. Handler-local failures are
/// recovered here (error-shaped output variables, safe default branches);
/// nothing in this function terminates a run.
pub(crate) async fn execute_node(
    ctx: &ExecutionContext,
    session: &mut Session,
    node: &Node,
) -> NodeOutcome {
    debug!(node_id = %node.id, node_type = node.kind.type_name(), "executing node");

    match &node.kind {
        NodeKind::Start { .. } => match session.variables.remove(PENDING_TRIGGER_VAR) {
            Some(Value::String(handle)) => NodeOutcome::Next(HandleId::new(handle)),
            Some(other) => {
                warn!(node_id = %node.id, value = %other, "non-string trigger marker");
                NodeOutcome::Next(HandleId::default_handle())
            }
            None => NodeOutcome::Next(HandleId::default_handle()),
        },

        NodeKind::Message { text } => {
            let content = substitute(text, &session.variables);
            outbound::deliver(ctx, session, &content).await;
            NodeOutcome::Next(HandleId::default_handle())
        }

        NodeKind::Input {
            prompt,
            output_variable,
        } => prompt_and_suspend(ctx, session, node, prompt, output_variable, InputKind::Text).await,

        NodeKind::DateInput {
            prompt,
            output_variable,
        } => prompt_and_suspend(ctx, session, node, prompt, output_variable, InputKind::Date).await,

        NodeKind::FileUpload {
            prompt,
            output_variable,
        } => prompt_and_suspend(ctx, session, node, prompt, output_variable, InputKind::File).await,

        NodeKind::RatingInput {
            prompt,
            output_variable,
        } => {
            prompt_and_suspend(ctx, session, node, prompt, output_variable, InputKind::Rating).await
        }

        NodeKind::Option {
            question,
            options,
            output_variable,
        } => {
            let question = question
                .as_deref()
                .map(|q| substitute(q, &session.variables))
                .unwrap_or_default();
            if question.trim().is_empty() || options.is_empty() {
                warn!(node_id = %node.id, "option node missing question or options, falling through");
                return NodeOutcome::Next(HandleId::default_handle());
            }
            let resolved: Vec<ChoiceOption> = options
                .iter()
                .map(|o| ChoiceOption {
                    id: o.id.clone(),
                    label: substitute(&o.label, &session.variables),
                })
                .collect();
            let mut body = question;
            body.push_str("\n\n");
            for (index, option) in resolved.iter().enumerate() {
                body.push_str(&format!("{}. {}\n", index + 1, option.label));
            }
            outbound::deliver(ctx, session, body.trim_end()).await;
            NodeOutcome::Suspend(AwaitingInput {
                kind: InputKind::Choice,
                variable: output_variable.clone(),
                node_id: node.id.clone(),
                options: Some(resolved),
            })
        }

        NodeKind::Condition {
            variable,
            operator,
            value,
            data_type,
        } => {
            let name = variable
                .trim()
                .trim_start_matches("{{")
                .trim_end_matches("}}")
                .trim();
            let left = session
                .variables
                .get_path(name)
                .cloned()
                // The original token text stands in when nothing resolves.
                .or_else(|| Some(Value::String(variable.clone())));
            let right = substitute(value, &session.variables);
            let result = evaluate(left.as_ref(), &right, *data_type, operator);
            NodeOutcome::Next(bool_handle(result))
        }

        NodeKind::TimeOfDay {
            start,
            end,
            timezone,
        } => {
            let now = match timezone.as_deref().and_then(parse_utc_offset) {
                Some(offset) => Utc::now().with_timezone(&offset).time(),
                None => Utc::now().time(),
            };
            let result = match (parse_clock(start), parse_clock(end)) {
                (Some(s), Some(e)) => in_time_window(now, s, e),
                _ => {
                    warn!(node_id = %node.id, %start, %end, "unparseable time-of-day window");
                    false
                }
            };
            NodeOutcome::Next(bool_handle(result))
        }

        NodeKind::Switch { variable, cases } => {
            let value = if variable.contains("{{") {
                substitute(variable, &session.variables)
            } else {
                session
                    .variables
                    .get_path(variable)
                    .map(value_to_string)
                    .unwrap_or_default()
            };
            for case in cases {
                if substitute(&case.value, &session.variables) == value {
                    return NodeOutcome::Next(HandleId::new(case.id.as_str()));
                }
            }
            NodeOutcome::Next(HandleId::otherwise())
        }

        NodeKind::SetVariable { variable, value } => {
            let resolved = substitute(value, &session.variables);
            session
                .variables
                .set_path(variable, Value::String(resolved));
            NodeOutcome::Next(HandleId::default_handle())
        }

        NodeKind::ApiCall {
            url,
            method,
            headers,
            query,
            body,
            auth,
            response_path,
            output_variable,
        } => {
            let vars = &session.variables;
            let request = HttpRequest {
                url: substitute(url, vars),
                method: method.clone(),
                headers: headers
                    .iter()
                    .map(|h| (h.key.clone(), substitute(&h.value, vars)))
                    .collect(),
                query: query
                    .iter()
                    .map(|q| (q.key.clone(), substitute(&q.value, vars)))
                    .collect(),
                body: body.as_deref().map(|b| substitute(b, vars)),
                auth: auth.as_ref().map(|a| match a {
                    ApiAuth::Bearer { token } => ResolvedAuth::Bearer(substitute(token, vars)),
                    ApiAuth::Basic { username, password } => ResolvedAuth::Basic {
                        username: substitute(username, vars),
                        password: substitute(password, vars),
                    },
                }),
            };
            match ctx.http.request(request).await {
                Ok(response) => {
                    if let Some(output) = output_variable {
                        let value = match response_path.as_deref() {
                            Some(path) => json_path(&response.body, path)
                                .cloned()
                                .unwrap_or(Value::Null),
                            None => response.body,
                        };
                        session.variables.set_path(output, value);
                    }
                }
                Err(e) => {
                    // Failures continue on the normal edge with an
                    // error-shaped payload; the graph decides what to do.
                    warn!(node_id = %node.id, error = %e, "api-call failed");
                    if let Some(output) = output_variable {
                        session
                            .variables
                            .set_path(output, json!({ "error": e.to_string() }));
                    }
                }
            }
            NodeOutcome::Next(HandleId::default_handle())
        }

        NodeKind::WhatsappText { to, instance, text } => {
            let text = substitute(text, &session.variables);
            send_whatsapp(ctx, session, node, to, instance, |instance, to| {
                ChannelMessage::WhatsappText { instance, to, text }
            })
            .await;
            NodeOutcome::Next(HandleId::default_handle())
        }

        NodeKind::WhatsappMedia {
            to,
            instance,
            media_url,
            caption,
        } => {
            let media_url = substitute(media_url, &session.variables);
            let caption = caption
                .as_deref()
                .map(|c| substitute(c, &session.variables));
            send_whatsapp(ctx, session, node, to, instance, |instance, to| {
                ChannelMessage::WhatsappMedia {
                    instance,
                    to,
                    media_url,
                    caption,
                }
            })
            .await;
            NodeOutcome::Next(HandleId::default_handle())
        }

        NodeKind::AiTextGeneration {
            prompt,
            input_variable,
            output_variable,
        } => {
            let prompt_text = match prompt.as_deref() {
                Some(p) if !p.trim().is_empty() => substitute(p, &session.variables),
                _ => input_variable
                    .as_deref()
                    .and_then(|v| session.variables.get_path(v))
                    .map(value_to_string)
                    .unwrap_or_default(),
            };
            let result = invoke_generator(ctx, node, &prompt_text, AiCall::Completion).await;
            session
                .variables
                .set_path(output_variable, Value::String(result));
            NodeOutcome::Next(HandleId::default_handle())
        }

        NodeKind::IntelligentAgent {
            input_variable,
            output_variable,
        } => {
            let input_var = input_variable.as_deref().unwrap_or(DEFAULT_AGENT_INPUT_VAR);
            let user_message = session
                .variables
                .get_path(input_var)
                .map(value_to_string)
                .unwrap_or_default();
            let result = invoke_generator(ctx, node, &user_message, AiCall::Agent).await;
            session
                .variables
                .set_path(output_variable, Value::String(result));
            NodeOutcome::Next(HandleId::default_handle())
        }

        NodeKind::Delay { duration_ms } => {
            // In-run wait: the task sleeps, the session does not suspend.
            tokio::time::sleep(Duration::from_millis(*duration_ms)).await;
            NodeOutcome::Next(HandleId::default_handle())
        }

        NodeKind::LogConsole { message } => {
            let message = substitute(message, &session.variables);
            info!(node_id = %node.id, session_id = %session.id, %message, "log-console");
            NodeOutcome::Next(HandleId::default_handle())
        }

        NodeKind::EndFlow => NodeOutcome::Halt,

        NodeKind::Unknown => {
            warn!(node_id = %node.id, "unrecognized node type, attempting default edge");
            NodeOutcome::Next(HandleId::default_handle())
        }
    }
}

async fn prompt_and_suspend(
    ctx: &ExecutionContext,
    session: &mut Session,
    node: &Node,
    prompt: &Option<String>,
    output_variable: &str,
    kind: InputKind,
) -> NodeOutcome {
    if let Some(prompt) = prompt.as_deref() {
        let content = substitute(prompt, &session.variables);
        outbound::deliver(ctx, session, &content).await;
    }
    NodeOutcome::Suspend(AwaitingInput {
        kind,
        variable: output_variable.to_string(),
        node_id: node.id.clone(),
        options: None,
    })
}

/// Shared send path for the channel-forcing WhatsApp variants: resolves
/// addressing, builds the message, logs and swallows failures.
async fn send_whatsapp(
    ctx: &ExecutionContext,
    session: &Session,
    node: &Node,
    to: &Option<String>,
    instance: &Option<String>,
    build: impl FnOnce(String, String) -> ChannelMessage,
) {
    let Some((instance, to)) = resolve_whatsapp_address(ctx, session, to, instance) else {
        warn!(node_id = %node.id, kind = node.kind.type_name(), "whatsapp node missing recipient or instance");
        return;
    };
    if let Err(e) = ctx.channels.send_text(build(instance, to)).await {
        warn!(node_id = %node.id, kind = node.kind.type_name(), error = %e, "whatsapp delivery failed");
    }
}

enum AiCall {
    Completion,
    Agent,
}

/// Shared generation path for the AI variants: empty input or a failed call
/// degrades to a string the graph can still route on.
async fn invoke_generator(
    ctx: &ExecutionContext,
    node: &Node,
    input: &str,
    call: AiCall,
) -> String {
    if input.trim().is_empty() {
        warn!(node_id = %node.id, kind = node.kind.type_name(), "generation node has no input");
        return String::new();
    }
    let result = match call {
        AiCall::Completion => ctx.generator.generate_text(input).await,
        AiCall::Agent => ctx.generator.chat_reply(input).await,
    };
    match result {
        Ok(text) => text,
        Err(e) => {
            warn!(node_id = %node.id, error = %e, "text generation failed");
            format!("AI generation failed: {e}")
        }
    }
}

fn bool_handle(value: bool) -> HandleId {
    if value {
        HandleId::truthy()
    } else {
        HandleId::falsy()
    }
}

/// WhatsApp addressing for the channel-forcing node variants: node config
/// first (substituted), then session variables, then workspace defaults.
fn resolve_whatsapp_address(
    ctx: &ExecutionContext,
    session: &Session,
    to: &Option<String>,
    instance: &Option<String>,
) -> Option<(String, String)> {
    let to = to
        .as_deref()
        .map(|t| substitute(t, &session.variables))
        .filter(|t| !t.trim().is_empty())
        .or_else(|| whatsapp_recipient(session))?;
    let instance = instance
        .as_deref()
        .map(|i| substitute(i, &session.variables))
        .filter(|i| !i.trim().is_empty())
        .or_else(|| whatsapp_instance(ctx, session))?;
    Some((instance, to))
}

/// Total dot-path lookup into an arbitrary JSON value (used to extract a
/// sub-value from an api-call response).
fn json_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for part in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(part)?,
            Value::Array(items) => items.get(part.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}
