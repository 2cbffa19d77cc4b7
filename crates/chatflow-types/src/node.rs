use crate::id::{HandleId, NodeId};
use serde::{Deserialize, Serialize};

/// One typed step in a flow graph. The variant-specific configuration is
/// flattened next to the id, so the wire shape stays
/// `{ "id": ..., "type": ..., <fields> }` as the editor emits it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    #[serde(flatten)]
    pub kind: NodeKind,
}

/// Closed set of node variants, each carrying only its own configuration.
///
/// Variants the engine does not recognize deserialize as [`NodeKind::Unknown`]
/// and degrade to a best-effort `default` edge at execution time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum NodeKind {
    Start {
        #[serde(default)]
        triggers: Vec<TriggerConfig>,
    },
    Message {
        #[serde(default)]
        text: String,
    },
    Input {
        #[serde(default)]
        prompt: Option<String>,
        output_variable: String,
    },
    DateInput {
        #[serde(default)]
        prompt: Option<String>,
        output_variable: String,
    },
    FileUpload {
        #[serde(default)]
        prompt: Option<String>,
        output_variable: String,
    },
    RatingInput {
        #[serde(default)]
        prompt: Option<String>,
        output_variable: String,
    },
    Option {
        #[serde(default)]
        question: Option<String>,
        #[serde(default)]
        options: Vec<ChoiceOption>,
        output_variable: String,
    },
    Condition {
        variable: String,
        /// Carried as a raw string so an unrecognized operator degrades to
        /// a warning and a false branch instead of a deserialization error.
        operator: String,
        #[serde(default)]
        value: String,
        #[serde(default)]
        data_type: ValueType,
    },
    TimeOfDay {
        start: String,
        end: String,
        /// Fixed UTC offset such as `"+02:00"`. Absent means UTC.
        #[serde(default)]
        timezone: Option<String>,
    },
    Switch {
        variable: String,
        #[serde(default)]
        cases: Vec<SwitchCase>,
    },
    SetVariable {
        variable: String,
        #[serde(default)]
        value: String,
    },
    ApiCall {
        url: String,
        #[serde(default = "default_method")]
        method: String,
        #[serde(default)]
        headers: Vec<KeyValue>,
        #[serde(default)]
        query: Vec<KeyValue>,
        #[serde(default)]
        body: Option<String>,
        #[serde(default)]
        auth: Option<ApiAuth>,
        /// Dot path into the response body to extract before writing the
        /// output variable. Absent stores the whole body.
        #[serde(default)]
        response_path: Option<String>,
        #[serde(default)]
        output_variable: Option<String>,
    },
    WhatsappText {
        #[serde(default)]
        to: Option<String>,
        #[serde(default)]
        instance: Option<String>,
        text: String,
    },
    WhatsappMedia {
        #[serde(default)]
        to: Option<String>,
        #[serde(default)]
        instance: Option<String>,
        media_url: String,
        #[serde(default)]
        caption: Option<String>,
    },
    AiTextGeneration {
        #[serde(default)]
        prompt: Option<String>,
        #[serde(default)]
        input_variable: Option<String>,
        output_variable: String,
    },
    IntelligentAgent {
        #[serde(default)]
        input_variable: Option<String>,
        output_variable: String,
    },
    Delay {
        duration_ms: u64,
    },
    LogConsole {
        #[serde(default)]
        message: String,
    },
    EndFlow,
    #[serde(other)]
    Unknown,
}

fn default_method() -> String {
    "GET".to_string()
}

impl NodeKind {
    /// The catalog of output handles this variant declares. Edge
    /// `source_handle`s are validated against this at graph load time.
    pub fn handles(&self) -> Vec<HandleId> {
        match self {
            // Entries without a pending trigger marker route on `default`,
            // so start nodes declare it alongside their trigger handles.
            NodeKind::Start { triggers } => triggers
                .iter()
                .filter(|t| t.enabled)
                .flat_map(|t| {
                    std::iter::once(HandleId::new(t.name.as_str()))
                        .chain(t.keywords.iter().map(|k| HandleId::new(k.as_str())))
                })
                .chain(std::iter::once(HandleId::default_handle()))
                .collect(),
            NodeKind::Condition { .. } | NodeKind::TimeOfDay { .. } => {
                vec![HandleId::truthy(), HandleId::falsy()]
            }
            NodeKind::Switch { cases, .. } => cases
                .iter()
                .map(|c| HandleId::new(c.id.as_str()))
                .chain(std::iter::once(HandleId::otherwise()))
                .collect(),
            // A misconfigured option node falls through on `default`, so
            // that handle is part of the declared catalog.
            NodeKind::Option { options, .. } => options
                .iter()
                .map(|o| HandleId::new(o.id.as_str()))
                .chain(std::iter::once(HandleId::default_handle()))
                .collect(),
            NodeKind::EndFlow => Vec::new(),
            _ => vec![HandleId::default_handle()],
        }
    }

    /// Stable name used in diagnostics (matches the serde tag).
    pub fn type_name(&self) -> &'static str {
        match self {
            NodeKind::Start { .. } => "start",
            NodeKind::Message { .. } => "message",
            NodeKind::Input { .. } => "input",
            NodeKind::DateInput { .. } => "date-input",
            NodeKind::FileUpload { .. } => "file-upload",
            NodeKind::RatingInput { .. } => "rating-input",
            NodeKind::Option { .. } => "option",
            NodeKind::Condition { .. } => "condition",
            NodeKind::TimeOfDay { .. } => "time-of-day",
            NodeKind::Switch { .. } => "switch",
            NodeKind::SetVariable { .. } => "set-variable",
            NodeKind::ApiCall { .. } => "api-call",
            NodeKind::WhatsappText { .. } => "whatsapp-text",
            NodeKind::WhatsappMedia { .. } => "whatsapp-media",
            NodeKind::AiTextGeneration { .. } => "ai-text-generation",
            NodeKind::IntelligentAgent { .. } => "intelligent-agent",
            NodeKind::Delay { .. } => "delay",
            NodeKind::LogConsole { .. } => "log-console",
            NodeKind::EndFlow => "end-flow",
            NodeKind::Unknown => "unknown",
        }
    }
}

/// One inbound trigger enabled on a `start` node. The trigger name and
/// every keyword each become an output handle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerConfig {
    pub name: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Idle expiry for sessions suspended under this trigger; enforced by
    /// the hosting service via `SessionStore::delete_idle`, not the engine.
    #[serde(default)]
    pub session_timeout_secs: Option<u64>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceOption {
    pub id: String,
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwitchCase {
    pub id: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ApiAuth {
    Bearer { token: String },
    Basic { username: String, password: String },
}

/// Data type a condition compares under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    #[default]
    String,
    Number,
    Boolean,
    Date,
}
