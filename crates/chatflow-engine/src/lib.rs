pub mod condition;
pub mod context;
pub mod error;
pub mod http;
pub mod outbound;
pub mod runner;
pub mod substitute;

mod executor;

pub use condition::{
    evaluate, in_time_window, parse_clock, parse_date_str, parse_date_value, parse_utc_offset,
};
pub use context::{ContextBuilder, ExecutionContext};
pub use error::EngineError;
pub use http::{HttpCapability, HttpRequest, HttpResponse, ReqwestHttpClient, ResolvedAuth};
pub use runner::{FlowRunner, RunOutcome};
pub use substitute::substitute;

// Re-export the model types callers need to drive a run.
pub use chatflow_types::{
    ChannelContext, Edge, FlowGraph, GraphError, HandleId, Node, NodeId, NodeKind, Session,
    SessionId, VariableBag, WorkspaceChannels,
};
