use anyhow::anyhow;
use async_trait::async_trait;
use chatflow_ai::TextGenerator;
use chatflow_channels::{ChannelError, ChannelMessage, ChannelSender};
use chatflow_engine::{
    ContextBuilder, EngineError, ExecutionContext, FlowRunner, HttpCapability, HttpRequest,
    HttpResponse, RunOutcome,
};
use chatflow_persist::{MemorySessionStore, SessionStore};
use chatflow_types::{
    ChannelContext, Edge, FlowGraph, HandleId, Node, NodeId, Session, WorkspaceChannels,
    CONVERSATION_ID_VAR,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::Mutex;

// --- mock capabilities -----------------------------------------------------

/// Records every outbound delivery instead of hitting a channel API.
#[derive(Default)]
struct RecordingChannel {
    sent: Mutex<Vec<ChannelMessage>>,
}

impl RecordingChannel {
    async fn messages(&self) -> Vec<ChannelMessage> {
        self.sent.lock().await.clone()
    }

    async fn texts(&self) -> Vec<String> {
        self.sent
            .lock()
            .await
            .iter()
            .map(|m| match m {
                ChannelMessage::WhatsappText { text, .. } => text.clone(),
                ChannelMessage::ChatwootText { text, .. } => text.clone(),
                ChannelMessage::DialogyText { text, .. } => text.clone(),
                ChannelMessage::WhatsappMedia { media_url, .. } => media_url.clone(),
            })
            .collect()
    }
}

#[async_trait]
impl ChannelSender for RecordingChannel {
    async fn send_text(&self, message: ChannelMessage) -> Result<(), ChannelError> {
        self.sent.lock().await.push(message);
        Ok(())
    }
}

/// Rejects every delivery, for verifying the engine swallows send failures.
struct FailingChannel;

#[async_trait]
impl ChannelSender for FailingChannel {
    async fn send_text(&self, _message: ChannelMessage) -> Result<(), ChannelError> {
        Err(ChannelError::Api {
            status: 500,
            body: "upstream exploded".to_string(),
        })
    }
}

struct CannedGenerator {
    reply: String,
}

#[async_trait]
impl TextGenerator for CannedGenerator {
    async fn generate_text(&self, _prompt: &str) -> anyhow::Result<String> {
        Ok(self.reply.clone())
    }

    async fn chat_reply(&self, _user_message: &str) -> anyhow::Result<String> {
        Ok(self.reply.clone())
    }
}

/// Fails every generation call, for the error-string fallback path.
struct FailingGenerator;

#[async_trait]
impl TextGenerator for FailingGenerator {
    async fn generate_text(&self, _prompt: &str) -> anyhow::Result<String> {
        Err(anyhow!("model unavailable"))
    }

    async fn chat_reply(&self, _user_message: &str) -> anyhow::Result<String> {
        Err(anyhow!("model unavailable"))
    }
}

/// Replays a fixed HTTP response and records the requests it saw.
struct ScriptedHttp {
    body: Value,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedHttp {
    fn returning(body: Value) -> Self {
        Self {
            body,
            requests: Mutex::new(Vec::new()),
        }
    }

    async fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl HttpCapability for ScriptedHttp {
    async fn request(&self, request: HttpRequest) -> anyhow::Result<HttpResponse> {
        self.requests.lock().await.push(request);
        Ok(HttpResponse {
            status: 200,
            body: self.body.clone(),
        })
    }
}

struct FailingHttp;

#[async_trait]
impl HttpCapability for FailingHttp {
    async fn request(&self, _request: HttpRequest) -> anyhow::Result<HttpResponse> {
        Err(anyhow!("connection refused"))
    }
}

// --- fixtures ---------------------------------------------------------------

fn node(value: Value) -> Node {
    serde_json::from_value(value).expect("valid node json")
}

fn edge(id: &str, from: &str, to: &str, handle: &str) -> Edge {
    Edge {
        id: id.to_string(),
        from: NodeId::new(from),
        to: NodeId::new(to),
        source_handle: HandleId::new(handle),
        target_handle: None,
    }
}

fn start_node() -> Node {
    node(json!({
        "id": "start",
        "type": "start",
        "triggers": [{ "name": "new_conversation" }]
    }))
}

fn whatsapp_session() -> Session {
    let mut session = Session::new("inst-1:5511999990000", ChannelContext::Whatsapp);
    session.set_pending_trigger("new_conversation");
    session
}

struct Harness {
    store: Arc<MemorySessionStore>,
    channel: Arc<RecordingChannel>,
    http: Arc<ScriptedHttp>,
}

impl Harness {
    fn new() -> (Self, ExecutionContext) {
        Self::with_http(Arc::new(ScriptedHttp::returning(json!({}))))
    }

    fn with_http(http: Arc<ScriptedHttp>) -> (Self, ExecutionContext) {
        let store = Arc::new(MemorySessionStore::new());
        let channel = Arc::new(RecordingChannel::default());
        let ctx = ContextBuilder::new()
            .store(store.clone())
            .channels(channel.clone())
            .generator(Arc::new(CannedGenerator {
                reply: "canned reply".to_string(),
            }))
            .http(http.clone())
            .workspace(WorkspaceChannels::new().with_whatsapp_instance("inst-1"))
            .build()
            .expect("context builds");
        (
            Self {
                store,
                channel,
                http,
            },
            ctx,
        )
    }
}

// --- scenarios ---------------------------------------------------------------

#[tokio::test]
async fn linear_flow_substitutes_delivers_and_completes() {
    let (harness, ctx) = Harness::new();
    let graph = FlowGraph::new(
        vec![
            start_node(),
            node(json!({ "id": "greet", "type": "message", "text": "Hi {{name}}" })),
            node(json!({ "id": "end", "type": "end-flow" })),
        ],
        vec![
            edge("e1", "start", "greet", "new_conversation"),
            edge("e2", "greet", "end", "default"),
        ],
    )
    .expect("graph loads");

    let mut session = whatsapp_session();
    session.variables.insert("name", json!("Ana"));

    let outcome = FlowRunner::new(ctx)
        .start(&graph, &mut session)
        .await
        .expect("run succeeds");

    assert_eq!(outcome, RunOutcome::Completed);
    // A completed session leaves no durable trace.
    assert!(harness.store.is_empty().await);

    let sent = harness.channel.messages().await;
    assert_eq!(sent.len(), 1);
    match &sent[0] {
        ChannelMessage::WhatsappText { instance, to, text } => {
            assert_eq!(instance, "inst-1");
            assert_eq!(to, "5511999990000");
            assert_eq!(text, "Hi Ana");
        }
        other => panic!("unexpected message: {other:?}"),
    }
}

#[tokio::test]
async fn start_without_pending_marker_routes_on_default() {
    let (harness, ctx) = Harness::new();
    let graph = FlowGraph::new(
        vec![
            start_node(),
            node(json!({ "id": "greet", "type": "message", "text": "hello" })),
            node(json!({ "id": "end", "type": "end-flow" })),
        ],
        vec![
            edge("e1", "start", "greet", "default"),
            edge("e2", "greet", "end", "default"),
        ],
    )
    .expect("graph loads");

    // No trigger marker set: entry falls back to the default edge.
    let mut session = Session::new("inst-1:5511999990000", ChannelContext::Whatsapp);

    let outcome = FlowRunner::new(ctx)
        .start(&graph, &mut session)
        .await
        .expect("run succeeds");

    assert_eq!(outcome, RunOutcome::Completed);
    assert_eq!(harness.channel.texts().await, vec!["hello".to_string()]);
}

#[tokio::test]
async fn condition_routes_on_typed_comparison() {
    for (age, expected) in [(20, "adult"), (10, "minor")] {
        let (harness, ctx) = Harness::new();
        let graph = condition_graph();

        let mut session = whatsapp_session();
        session.variables.insert("age", json!(age));

        let outcome = FlowRunner::new(ctx)
            .start(&graph, &mut session)
            .await
            .expect("run succeeds");

        assert_eq!(outcome, RunOutcome::Completed);
        assert_eq!(harness.channel.texts().await, vec![expected.to_string()]);
    }
}

fn condition_graph() -> FlowGraph {
    FlowGraph::new(
        vec![
            start_node(),
            node(json!({
                "id": "age-check",
                "type": "condition",
                "variable": "{{age}}",
                "operator": ">",
                "value": "18",
                "data_type": "number"
            })),
            node(json!({ "id": "adult", "type": "message", "text": "adult" })),
            node(json!({ "id": "minor", "type": "message", "text": "minor" })),
            node(json!({ "id": "end", "type": "end-flow" })),
        ],
        vec![
            edge("e1", "start", "age-check", "new_conversation"),
            edge("e2", "age-check", "adult", "true"),
            edge("e3", "age-check", "minor", "false"),
            edge("e4", "adult", "end", "default"),
            edge("e5", "minor", "end", "default"),
        ],
    )
    .expect("graph loads")
}

#[tokio::test]
async fn switch_routes_to_matching_case_or_otherwise() {
    let nodes = || {
        vec![
            start_node(),
            node(json!({
                "id": "route",
                "type": "switch",
                "variable": "plan",
                "cases": [
                    { "id": "c1", "value": "pro" },
                    { "id": "c2", "value": "free" }
                ]
            })),
            node(json!({ "id": "pro-msg", "type": "message", "text": "pro plan" })),
            node(json!({ "id": "fallback", "type": "message", "text": "no plan" })),
            node(json!({ "id": "end", "type": "end-flow" })),
        ]
    };
    let edges = || {
        vec![
            edge("e1", "start", "route", "new_conversation"),
            edge("e2", "route", "pro-msg", "c1"),
            edge("e3", "route", "fallback", "otherwise"),
            edge("e4", "pro-msg", "end", "default"),
            edge("e5", "fallback", "end", "default"),
        ]
    };

    let (harness, ctx) = Harness::new();
    let graph = FlowGraph::new(nodes(), edges()).expect("graph loads");
    let mut session = whatsapp_session();
    session.variables.insert("plan", json!("pro"));
    FlowRunner::new(ctx)
        .start(&graph, &mut session)
        .await
        .expect("run succeeds");
    assert_eq!(harness.channel.texts().await, vec!["pro plan".to_string()]);

    let (harness, ctx) = Harness::new();
    let graph = FlowGraph::new(nodes(), edges()).expect("graph loads");
    let mut session = whatsapp_session();
    session.variables.insert("plan", json!("enterprise"));
    FlowRunner::new(ctx)
        .start(&graph, &mut session)
        .await
        .expect("run succeeds");
    assert_eq!(harness.channel.texts().await, vec!["no plan".to_string()]);
}

#[tokio::test]
async fn api_call_substitutes_request_and_extracts_response_path() {
    let http = Arc::new(ScriptedHttp::returning(json!({
        "data": { "user": { "plan": "pro" } }
    })));
    let (harness, ctx) = Harness::with_http(http);
    let graph = FlowGraph::new(
        vec![
            start_node(),
            node(json!({
                "id": "fetch",
                "type": "api-call",
                "url": "https://api.example.com/users/{{user_id}}",
                "headers": [{ "key": "x-trace", "value": "{{user_id}}" }],
                "response_path": "data.user.plan",
                "output_variable": "plan"
            })),
            node(json!({ "id": "tell", "type": "message", "text": "plan: {{plan}}" })),
            node(json!({ "id": "end", "type": "end-flow" })),
        ],
        vec![
            edge("e1", "start", "fetch", "new_conversation"),
            edge("e2", "fetch", "tell", "default"),
            edge("e3", "tell", "end", "default"),
        ],
    )
    .expect("graph loads");

    let mut session = whatsapp_session();
    session.variables.insert("user_id", json!("u-42"));

    let outcome = FlowRunner::new(ctx)
        .start(&graph, &mut session)
        .await
        .expect("run succeeds");

    assert_eq!(outcome, RunOutcome::Completed);
    assert_eq!(session.variables.get("plan"), Some(&json!("pro")));
    assert_eq!(harness.channel.texts().await, vec!["plan: pro".to_string()]);

    let requests = harness.http.requests().await;
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].url, "https://api.example.com/users/u-42");
    assert_eq!(requests[0].method, "GET");
    assert_eq!(
        requests[0].headers,
        vec![("x-trace".to_string(), "u-42".to_string())]
    );
}

#[tokio::test]
async fn failing_api_call_continues_with_error_payload() {
    let store = Arc::new(MemorySessionStore::new());
    let channel = Arc::new(RecordingChannel::default());
    let ctx = ContextBuilder::new()
        .store(store.clone())
        .channels(channel.clone())
        .generator(Arc::new(CannedGenerator {
            reply: String::new(),
        }))
        .http(Arc::new(FailingHttp))
        .workspace(WorkspaceChannels::new().with_whatsapp_instance("inst-1"))
        .build()
        .expect("context builds");

    let graph = FlowGraph::new(
        vec![
            start_node(),
            node(json!({
                "id": "fetch",
                "type": "api-call",
                "url": "https://api.example.com/down",
                "output_variable": "resp"
            })),
            node(json!({ "id": "end", "type": "end-flow" })),
        ],
        vec![
            edge("e1", "start", "fetch", "new_conversation"),
            edge("e2", "fetch", "end", "default"),
        ],
    )
    .expect("graph loads");

    let mut session = whatsapp_session();
    let outcome = FlowRunner::new(ctx)
        .start(&graph, &mut session)
        .await
        .expect("failure must not abort the run");

    assert_eq!(outcome, RunOutcome::Completed);
    let error = session
        .variables
        .get_path("resp.error")
        .and_then(Value::as_str)
        .expect("error payload recorded");
    assert!(error.contains("connection refused"));
}

#[tokio::test]
async fn input_node_suspends_then_resume_merges_the_reply() {
    let (harness, ctx) = Harness::new();
    let graph = FlowGraph::new(
        vec![
            start_node(),
            node(json!({
                "id": "ask",
                "type": "input",
                "prompt": "What is your name?",
                "output_variable": "name"
            })),
            node(json!({ "id": "greet", "type": "message", "text": "Hi {{name}}" })),
            node(json!({ "id": "end", "type": "end-flow" })),
        ],
        vec![
            edge("e1", "start", "ask", "new_conversation"),
            edge("e2", "ask", "greet", "default"),
            edge("e3", "greet", "end", "default"),
        ],
    )
    .expect("graph loads");

    let runner = FlowRunner::new(ctx);
    let mut session = whatsapp_session();

    let outcome = runner
        .start(&graph, &mut session)
        .await
        .expect("run succeeds");
    assert_eq!(outcome, RunOutcome::Suspended);
    assert_eq!(harness.channel.texts().await, vec!["What is your name?".to_string()]);

    // The suspension point is durable, not in-memory.
    let persisted = harness
        .store
        .load(&session.id)
        .await
        .expect("load succeeds")
        .expect("session persisted");
    let awaiting = persisted.awaiting_input.as_ref().expect("awaiting recorded");
    assert_eq!(awaiting.variable, "name");
    assert_eq!(awaiting.node_id.as_str(), "ask");

    // A fresh invocation continues at the node after the suspension.
    let mut session = persisted;
    let outcome = runner
        .resume(&graph, &mut session, "Ana")
        .await
        .expect("resume succeeds");
    assert_eq!(outcome, RunOutcome::Completed);
    assert_eq!(
        harness.channel.texts().await,
        vec!["What is your name?".to_string(), "Hi Ana".to_string()]
    );
    assert!(harness.store.is_empty().await);
}

#[tokio::test]
async fn option_node_sends_numbered_menu_and_resumes_by_number() {
    let (harness, ctx) = Harness::new();
    let graph = FlowGraph::new(
        vec![
            start_node(),
            node(json!({
                "id": "menu",
                "type": "option",
                "question": "What would you like?",
                "options": [
                    { "id": "opt-pizza", "label": "Pizza" },
                    { "id": "opt-sushi", "label": "Sushi" }
                ],
                "output_variable": "dish"
            })),
            node(json!({ "id": "pizza", "type": "message", "text": "pizza it is" })),
            node(json!({ "id": "sushi", "type": "message", "text": "sushi it is" })),
            node(json!({ "id": "end", "type": "end-flow" })),
        ],
        vec![
            edge("e1", "start", "menu", "new_conversation"),
            edge("e2", "menu", "pizza", "opt-pizza"),
            edge("e3", "menu", "sushi", "opt-sushi"),
            edge("e4", "pizza", "end", "default"),
            edge("e5", "sushi", "end", "default"),
        ],
    )
    .expect("graph loads");

    let runner = FlowRunner::new(ctx);
    let mut session = whatsapp_session();

    let outcome = runner
        .start(&graph, &mut session)
        .await
        .expect("run succeeds");
    assert_eq!(outcome, RunOutcome::Suspended);

    let texts = harness.channel.texts().await;
    let menu = &texts[0];
    assert!(menu.contains("What would you like?"));
    assert!(menu.contains("1. Pizza"));
    assert!(menu.contains("2. Sushi"));

    // "2" selects the second option; the label is what lands in the variable.
    let outcome = runner
        .resume(&graph, &mut session, "2")
        .await
        .expect("resume succeeds");
    assert_eq!(outcome, RunOutcome::Completed);
    assert_eq!(session.variables.get("dish"), Some(&json!("Sushi")));
    assert!(harness
        .channel
        .texts()
        .await
        .contains(&"sushi it is".to_string()));
}

#[tokio::test]
async fn option_resume_matches_labels_case_insensitively() {
    let (_harness, ctx) = Harness::new();
    let graph = FlowGraph::new(
        vec![
            start_node(),
            node(json!({
                "id": "menu",
                "type": "option",
                "question": "Pick one",
                "options": [{ "id": "opt-a", "label": "Alpha" }],
                "output_variable": "choice"
            })),
            node(json!({ "id": "end", "type": "end-flow" })),
        ],
        vec![
            edge("e1", "start", "menu", "new_conversation"),
            edge("e2", "menu", "end", "opt-a"),
        ],
    )
    .expect("graph loads");

    let runner = FlowRunner::new(ctx);
    let mut session = whatsapp_session();
    runner
        .start(&graph, &mut session)
        .await
        .expect("run succeeds");

    let outcome = runner
        .resume(&graph, &mut session, "ALPHA")
        .await
        .expect("resume succeeds");
    assert_eq!(outcome, RunOutcome::Completed);
    assert_eq!(session.variables.get("choice"), Some(&json!("Alpha")));
}

#[tokio::test]
async fn misconfigured_option_node_falls_through_default() {
    let (harness, ctx) = Harness::new();
    let graph = FlowGraph::new(
        vec![
            start_node(),
            node(json!({
                "id": "menu",
                "type": "option",
                "question": "Pick one",
                "options": [],
                "output_variable": "choice"
            })),
            node(json!({ "id": "end", "type": "end-flow" })),
        ],
        vec![
            edge("e1", "start", "menu", "new_conversation"),
            edge("e2", "menu", "end", "default"),
        ],
    )
    .expect("graph loads");

    let mut session = whatsapp_session();
    let outcome = FlowRunner::new(ctx)
        .start(&graph, &mut session)
        .await
        .expect("run succeeds");

    // No menu sent, no suspension; straight through to the end node.
    assert_eq!(outcome, RunOutcome::Completed);
    assert!(harness.channel.messages().await.is_empty());
}

#[tokio::test]
async fn whatsapp_media_node_resolves_addressing_from_session() {
    let (harness, ctx) = Harness::new();
    let graph = FlowGraph::new(
        vec![
            start_node(),
            node(json!({
                "id": "send-doc",
                "type": "whatsapp-media",
                "media_url": "https://cdn.example.com/{{file}}",
                "caption": "Here, {{name}}"
            })),
            node(json!({ "id": "end", "type": "end-flow" })),
        ],
        vec![
            edge("e1", "start", "send-doc", "new_conversation"),
            edge("e2", "send-doc", "end", "default"),
        ],
    )
    .expect("graph loads");

    let mut session = whatsapp_session();
    session.variables.insert("file", json!("invoice.pdf"));
    session.variables.insert("name", json!("Ana"));

    let outcome = FlowRunner::new(ctx)
        .start(&graph, &mut session)
        .await
        .expect("run succeeds");
    assert_eq!(outcome, RunOutcome::Completed);

    let sent = harness.channel.messages().await;
    assert_eq!(sent.len(), 1);
    match &sent[0] {
        ChannelMessage::WhatsappMedia {
            instance,
            to,
            media_url,
            caption,
        } => {
            assert_eq!(instance, "inst-1");
            assert_eq!(to, "5511999990000");
            assert_eq!(media_url, "https://cdn.example.com/invoice.pdf");
            assert_eq!(caption.as_deref(), Some("Here, Ana"));
        }
        other => panic!("unexpected message: {other:?}"),
    }
}

#[tokio::test]
async fn set_variable_then_ai_generation_feed_later_nodes() {
    let (harness, ctx) = Harness::new();
    let graph = FlowGraph::new(
        vec![
            start_node(),
            node(json!({
                "id": "seed",
                "type": "set-variable",
                "variable": "topic",
                "value": "weather in {{city}}"
            })),
            node(json!({
                "id": "gen",
                "type": "ai-text-generation",
                "prompt": "Write about {{topic}}",
                "output_variable": "blurb"
            })),
            node(json!({ "id": "tell", "type": "message", "text": "{{blurb}}" })),
            node(json!({ "id": "end", "type": "end-flow" })),
        ],
        vec![
            edge("e1", "start", "seed", "new_conversation"),
            edge("e2", "seed", "gen", "default"),
            edge("e3", "gen", "tell", "default"),
            edge("e4", "tell", "end", "default"),
        ],
    )
    .expect("graph loads");

    let mut session = whatsapp_session();
    session.variables.insert("city", json!("Lisbon"));

    let outcome = FlowRunner::new(ctx)
        .start(&graph, &mut session)
        .await
        .expect("run succeeds");

    assert_eq!(outcome, RunOutcome::Completed);
    assert_eq!(
        session.variables.get("topic"),
        Some(&json!("weather in Lisbon"))
    );
    assert_eq!(harness.channel.texts().await, vec!["canned reply".to_string()]);
}

#[tokio::test]
async fn failed_generation_writes_error_string_and_continues() {
    let store = Arc::new(MemorySessionStore::new());
    let ctx = ContextBuilder::new()
        .store(store)
        .channels(Arc::new(RecordingChannel::default()))
        .generator(Arc::new(FailingGenerator))
        .http(Arc::new(ScriptedHttp::returning(json!({}))))
        .workspace(WorkspaceChannels::new().with_whatsapp_instance("inst-1"))
        .build()
        .expect("context builds");

    let graph = FlowGraph::new(
        vec![
            start_node(),
            node(json!({
                "id": "gen",
                "type": "ai-text-generation",
                "prompt": "Say hi",
                "output_variable": "blurb"
            })),
            node(json!({ "id": "end", "type": "end-flow" })),
        ],
        vec![
            edge("e1", "start", "gen", "new_conversation"),
            edge("e2", "gen", "end", "default"),
        ],
    )
    .expect("graph loads");

    let mut session = whatsapp_session();
    let outcome = FlowRunner::new(ctx)
        .start(&graph, &mut session)
        .await
        .expect("generation failure must not abort the run");

    assert_eq!(outcome, RunOutcome::Completed);
    let blurb = session
        .variables
        .get("blurb")
        .and_then(Value::as_str)
        .expect("output variable written");
    assert!(blurb.contains("model unavailable"));
}

#[tokio::test]
async fn unknown_node_type_degrades_to_default_edge() {
    let (_harness, ctx) = Harness::new();
    let graph = FlowGraph::new(
        vec![
            start_node(),
            node(json!({ "id": "mystery", "type": "quantum-leap", "anything": 1 })),
            node(json!({ "id": "end", "type": "end-flow" })),
        ],
        vec![
            edge("e1", "start", "mystery", "new_conversation"),
            edge("e2", "mystery", "end", "default"),
        ],
    )
    .expect("graph loads");

    let mut session = whatsapp_session();
    let outcome = FlowRunner::new(ctx)
        .start(&graph, &mut session)
        .await
        .expect("run succeeds");
    assert_eq!(outcome, RunOutcome::Completed);
}

#[tokio::test]
async fn dead_end_pauses_and_persists_with_no_current_node() {
    let (harness, ctx) = Harness::new();
    let graph = FlowGraph::new(
        vec![
            start_node(),
            node(json!({ "id": "last", "type": "message", "text": "bye" })),
        ],
        vec![edge("e1", "start", "last", "new_conversation")],
    )
    .expect("graph loads");

    let mut session = whatsapp_session();
    let outcome = FlowRunner::new(ctx)
        .start(&graph, &mut session)
        .await
        .expect("run succeeds");

    assert_eq!(outcome, RunOutcome::Paused);
    let persisted = harness
        .store
        .load(&session.id)
        .await
        .expect("load succeeds")
        .expect("paused session persisted");
    assert!(persisted.current_node_id.is_none());
    assert!(persisted.awaiting_input.is_none());
}

#[tokio::test]
async fn edge_to_missing_node_aborts_and_deletes_the_session() {
    let (harness, ctx) = Harness::new();
    // A dangling `to` passes load-time validation and fails at execution.
    let graph = FlowGraph::new(
        vec![
            start_node(),
            node(json!({ "id": "greet", "type": "message", "text": "hello" })),
        ],
        vec![
            edge("e1", "start", "greet", "new_conversation"),
            edge("e2", "greet", "ghost", "default"),
        ],
    )
    .expect("graph loads");

    let mut session = whatsapp_session();
    // Pre-persist so the integrity failure has something to clean up.
    harness.store.save(&session).await.expect("save succeeds");

    let result = FlowRunner::new(ctx).start(&graph, &mut session).await;
    match result {
        Err(EngineError::MissingNode(id)) => assert_eq!(id.as_str(), "ghost"),
        other => panic!("expected integrity failure, got {other:?}"),
    }
    assert!(harness.store.is_empty().await);
}

#[tokio::test]
async fn delivery_failures_are_swallowed() {
    let store = Arc::new(MemorySessionStore::new());
    let ctx = ContextBuilder::new()
        .store(store.clone())
        .channels(Arc::new(FailingChannel))
        .generator(Arc::new(CannedGenerator {
            reply: String::new(),
        }))
        .http(Arc::new(FailingHttp))
        .workspace(WorkspaceChannels::new().with_whatsapp_instance("inst-1"))
        .build()
        .expect("context builds");

    let graph = FlowGraph::new(
        vec![
            start_node(),
            node(json!({ "id": "greet", "type": "message", "text": "hello" })),
            node(json!({ "id": "end", "type": "end-flow" })),
        ],
        vec![
            edge("e1", "start", "greet", "new_conversation"),
            edge("e2", "greet", "end", "default"),
        ],
    )
    .expect("graph loads");

    let mut session = whatsapp_session();
    let outcome = FlowRunner::new(ctx)
        .start(&graph, &mut session)
        .await
        .expect("delivery failure must not abort the run");
    assert_eq!(outcome, RunOutcome::Completed);
}

#[tokio::test]
async fn chatwoot_sessions_address_from_conversation_variables() {
    let store = Arc::new(MemorySessionStore::new());
    let channel = Arc::new(RecordingChannel::default());
    let ctx = ContextBuilder::new()
        .store(store)
        .channels(channel.clone())
        .generator(Arc::new(CannedGenerator {
            reply: String::new(),
        }))
        .http(Arc::new(ScriptedHttp::returning(json!({}))))
        .workspace(WorkspaceChannels::new().with_chatwoot_instance("acct-7"))
        .build()
        .expect("context builds");

    let graph = FlowGraph::new(
        vec![
            start_node(),
            node(json!({ "id": "greet", "type": "message", "text": "hello" })),
            node(json!({ "id": "end", "type": "end-flow" })),
        ],
        vec![
            edge("e1", "start", "greet", "new_conversation"),
            edge("e2", "greet", "end", "default"),
        ],
    )
    .expect("graph loads");

    let mut session = Session::new("cw-session-1", ChannelContext::Chatwoot);
    session.set_pending_trigger("new_conversation");
    session.variables.insert(CONVERSATION_ID_VAR, json!("991"));

    FlowRunner::new(ctx)
        .start(&graph, &mut session)
        .await
        .expect("run succeeds");

    let sent = channel.messages().await;
    assert_eq!(sent.len(), 1);
    match &sent[0] {
        ChannelMessage::ChatwootText {
            instance_id,
            conversation_id,
            text,
        } => {
            assert_eq!(instance_id, "acct-7");
            assert_eq!(conversation_id, "991");
            assert_eq!(text, "hello");
        }
        other => panic!("unexpected message: {other:?}"),
    }
}

#[tokio::test]
async fn graph_without_start_node_is_rejected() {
    let (_harness, ctx) = Harness::new();
    let graph = FlowGraph::new(
        vec![node(json!({ "id": "end", "type": "end-flow" }))],
        vec![],
    )
    .expect("graph loads");

    let mut session = whatsapp_session();
    let result = FlowRunner::new(ctx).start(&graph, &mut session).await;
    assert!(matches!(result, Err(EngineError::MissingStart)));
}
