use crate::context::ExecutionContext;
use crate::error::EngineError;
use crate::executor::{execute_node, NodeOutcome};
use chatflow_types::{AwaitingInput, FlowGraph, HandleId, InputKind, Session};
use serde_json::Value;
use tracing::{debug, error, Instrument};

/// How one execution-loop invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// A node asked for external input; state persisted, caller returns to
    /// the conversation until the reply arrives.
    Suspended,
    /// An end node was reached; the persisted session is gone.
    Completed,
    /// Dead end: no edge for the resolved handle. Persisted silently with a
    /// null current node.
    Paused,
}

/// Drives one session through a graph until suspension, a terminal node, or
/// a dead end. Owns persistence timing; the session object is exclusively
/// the runner's for the duration of one invocation.
pub struct FlowRunner {
    ctx: ExecutionContext,
}

impl FlowRunner {
    pub fn new(ctx: ExecutionContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.ctx
    }

    /// First entry for a session: begins at the graph's designated start
    /// node. The caller sets the pending trigger marker beforehand.
    pub async fn start(
        &self,
        graph: &FlowGraph,
        session: &mut Session,
    ) -> Result<RunOutcome, EngineError> {
        let start = graph.start_node().ok_or(EngineError::MissingStart)?;
        session.current_node_id = Some(start.id.clone());
        self.drive(graph, session).await
    }

    /// Re-entry after a suspension: merges the external reply into the
    /// awaiting variable, then continues at the node *after* the one that
    /// suspended. There is no parked execution context — this is a brand
    /// new invocation over loaded state.
    pub async fn resume(
        &self,
        graph: &FlowGraph,
        session: &mut Session,
        input: &str,
    ) -> Result<RunOutcome, EngineError> {
        if let Some(awaiting) = session.awaiting_input.take() {
            let handle = merge_reply(session, &awaiting, input);
            session.current_node_id = graph.next_node(&awaiting.node_id, &handle).cloned();
        }
        self.drive(graph, session).await
    }

    async fn drive(
        &self,
        graph: &FlowGraph,
        session: &mut Session,
    ) -> Result<RunOutcome, EngineError> {
        let span = tracing::info_span!("flow_run", session_id = %session.id);
        self.run_loop(graph, session).instrument(span).await
    }

    async fn run_loop(
        &self,
        graph: &FlowGraph,
        session: &mut Session,
    ) -> Result<RunOutcome, EngineError> {
        while let Some(node_id) = session.current_node_id.clone() {
            let Some(node) = graph.node(&node_id) else {
                // Integrity failure: the only class that aborts a run.
                error!(node_id = %node_id, "node missing from graph, deleting session");
                if let Err(e) = self.ctx.store.delete(&session.id).await {
                    error!(error = %e, "failed to delete session after integrity failure");
                }
                return Err(EngineError::MissingNode(node_id));
            };

            // Even a mid-run failure leaves the last reached node recorded.
            session.current_node_id = Some(node_id.clone());

            match execute_node(&self.ctx, session, node).await {
                NodeOutcome::Suspend(awaiting) => {
                    debug!(node_id = %node_id, kind = ?awaiting.kind, "suspending for input");
                    session.awaiting_input = Some(awaiting);
                    session.touch();
                    self.ctx.store.save(session).await?;
                    return Ok(RunOutcome::Suspended);
                }
                NodeOutcome::Halt => {
                    debug!(node_id = %node_id, "flow ended, deleting session");
                    self.ctx.store.delete(&session.id).await?;
                    return Ok(RunOutcome::Completed);
                }
                NodeOutcome::Next(handle) => {
                    session.current_node_id = graph.next_node(&node_id, &handle).cloned();
                    if session.current_node_id.is_none() {
                        debug!(node_id = %node_id, handle = %handle, "no edge wired, pausing");
                    }
                }
            }
        }

        // Silent pause at a dead end.
        session.awaiting_input = None;
        session.touch();
        self.ctx.store.save(session).await?;
        Ok(RunOutcome::Paused)
    }
}

/// Writes the external reply into the awaiting variable and picks the
/// handle to route on. Choice replies match by 1-based number, option id,
/// or case-insensitive label; the selected option's label is what lands in
/// the variable.
fn merge_reply(session: &mut Session, awaiting: &AwaitingInput, input: &str) -> HandleId {
    if let (InputKind::Choice, Some(options)) = (awaiting.kind, awaiting.options.as_deref()) {
        let trimmed = input.trim();
        let by_number = trimmed
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| options.get(i));
        let chosen = by_number.or_else(|| {
            options
                .iter()
                .find(|o| o.id == trimmed || o.label.eq_ignore_ascii_case(trimmed))
        });
        if let Some(option) = chosen {
            session
                .variables
                .set_path(&awaiting.variable, Value::String(option.label.clone()));
            return HandleId::new(option.id.as_str());
        }
    }
    session
        .variables
        .set_path(&awaiting.variable, Value::String(input.to_string()));
    HandleId::default_handle()
}
