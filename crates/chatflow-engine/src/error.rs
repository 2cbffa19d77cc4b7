use chatflow_types::NodeId;
use thiserror::Error;

/// Failures that terminate a run. Everything else is recovered at the node
/// boundary and flows through the graph's own edges.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("graph integrity failure: node '{0}' not found")]
    MissingNode(NodeId),

    #[error("graph has no start node")]
    MissingStart,

    #[error("session store error: {0}")]
    Store(#[from] chatflow_persist::StoreError),
}
