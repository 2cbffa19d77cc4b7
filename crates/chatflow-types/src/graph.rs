use crate::id::{HandleId, NodeId};
use crate::node::{Node, NodeKind};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Directed, named connection between two nodes. `source_handle` must be one
/// of the handles the `from` node's variant declares; this is enforced when
/// the graph is loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub id: String,
    pub from: NodeId,
    pub to: NodeId,
    pub source_handle: HandleId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<HandleId>,
}

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("duplicate node id '{0}'")]
    DuplicateNode(NodeId),

    #[error("edge '{edge}' starts at unknown node '{node}'")]
    UnknownSourceNode { edge: String, node: NodeId },

    #[error("edge '{edge}' uses handle '{handle}' not declared by {kind} node '{node}'")]
    UndeclaredHandle {
        edge: String,
        node: NodeId,
        handle: HandleId,
        kind: &'static str,
    },
}

/// Immutable-per-run representation of a flow: nodes by id plus a routing
/// table keyed by `(from node, source handle)`. Safely shared across
/// concurrent session runs.
#[derive(Debug, Clone)]
pub struct FlowGraph {
    nodes: HashMap<NodeId, Node>,
    routes: HashMap<(NodeId, HandleId), NodeId>,
    start: Option<NodeId>,
}

impl FlowGraph {
    /// Builds and validates a graph. Rejects duplicate node ids, edges from
    /// unknown nodes, and edges whose `source_handle` the from-node does not
    /// declare. A dangling `to` node is deliberately *not* rejected here; it
    /// surfaces as a fatal integrity failure at execution time.
    pub fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Result<Self, GraphError> {
        let mut node_map = HashMap::with_capacity(nodes.len());
        let mut start = None;
        for node in nodes {
            if node_map.contains_key(&node.id) {
                return Err(GraphError::DuplicateNode(node.id));
            }
            if matches!(node.kind, NodeKind::Start { .. }) && start.is_none() {
                start = Some(node.id.clone());
            }
            node_map.insert(node.id.clone(), node);
        }

        let mut routes = HashMap::with_capacity(edges.len());
        for edge in &edges {
            let from = node_map
                .get(&edge.from)
                .ok_or_else(|| GraphError::UnknownSourceNode {
                    edge: edge.id.clone(),
                    node: edge.from.clone(),
                })?;
            if !from.kind.handles().contains(&edge.source_handle) {
                return Err(GraphError::UndeclaredHandle {
                    edge: edge.id.clone(),
                    node: edge.from.clone(),
                    handle: edge.source_handle.clone(),
                    kind: from.kind.type_name(),
                });
            }
            routes
                .entry((edge.from.clone(), edge.source_handle.clone()))
                .or_insert_with(|| edge.to.clone());
        }

        Ok(Self {
            nodes: node_map,
            routes,
            start,
        })
    }

    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Target of the edge leaving `from` on `handle`, if one is wired.
    pub fn next_node(&self, from: &NodeId, handle: &HandleId) -> Option<&NodeId> {
        self.routes.get(&(from.clone(), handle.clone()))
    }

    /// The designated entry node (first `start` node seen at load).
    pub fn start_node(&self) -> Option<&Node> {
        self.start.as_ref().and_then(|id| self.nodes.get(id))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
