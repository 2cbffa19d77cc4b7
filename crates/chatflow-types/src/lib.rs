pub mod graph;
pub mod id;
pub mod node;
pub mod session;
pub mod variables;
pub mod workspace;

pub use graph::{Edge, FlowGraph, GraphError};
pub use id::{HandleId, NodeId, SessionId};
pub use node::{
    ApiAuth, ChoiceOption, KeyValue, Node, NodeKind, SwitchCase, TriggerConfig, ValueType,
};
pub use session::{
    AwaitingInput, ChannelContext, InputKind, Session, CONTACT_PHONE_VAR, CONVERSATION_ID_VAR,
    INSTANCE_VAR, PENDING_TRIGGER_VAR,
};
pub use variables::VariableBag;
pub use workspace::WorkspaceChannels;
