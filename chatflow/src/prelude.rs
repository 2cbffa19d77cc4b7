//! Convenience re-exports for embedding the engine.

pub use chatflow_ai::{OpenAiTextClient, TextGenerator};
pub use chatflow_channels::{
    ChannelMessage, ChannelSender, ChatwootClient, DialogyClient, HttpChannels, WhatsAppClient,
};
pub use chatflow_engine::{
    substitute, ContextBuilder, EngineError, ExecutionContext, FlowRunner, HttpCapability,
    ReqwestHttpClient, RunOutcome,
};
pub use chatflow_persist::{MemorySessionStore, SessionStore};
pub use chatflow_types::{
    AwaitingInput, ChannelContext, Edge, FlowGraph, GraphError, HandleId, InputKind, Node, NodeId,
    NodeKind, Session, SessionId, VariableBag, WorkspaceChannels,
};

#[cfg(feature = "mongodb")]
pub use chatflow_persist::MongoSessionStore;
