//! Ownership tree → explicit node/edge graph.

use tracing::{debug, instrument};

use crate::graph::{GenealogyGraph, PartAttrs};
use crate::tree::{ComponentTree, NodeId};

/// Copy every instance reachable from the root into a [`GenealogyGraph`],
/// one node per instance and one edge per ownership link.
///
/// The walk uses an explicit stack, so assembly depth is bounded by memory
/// rather than by the call stack. An instance already in the graph is not
/// visited again.
#[instrument(skip(tree), fields(nodes = tree.len()))]
#[must_use]
pub fn materialize(tree: &ComponentTree) -> GenealogyGraph {
    let mut graph = GenealogyGraph::with_root(NodeId::ROOT);
    if tree.is_empty() {
        return graph;
    }

    let mut stack: Vec<(NodeId, Option<NodeId>)> = vec![(NodeId::ROOT, None)];
    while let Some((id, parent)) = stack.pop() {
        let Some(node) = tree.get(id) else {
            continue;
        };
        if !graph.add_node(PartAttrs::from(node)) {
            continue;
        }
        if let Some(parent) = parent {
            graph.add_edge(parent, id);
        }
        // Reverse so siblings pop in construction order.
        for &child in node.children.iter().rev() {
            stack.push((child, Some(id)));
        }
    }

    debug!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "materialized genealogy graph"
    );
    graph
}
