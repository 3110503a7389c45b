//! Removal pruning: drop removed components and everything they carry.
//!
//! A removed parent cannot still contain installed children in the
//! current-configuration view, so marking a node marks its whole subtree.
//! Status is evaluated per node during a pre-order walk from the root; nodes
//! are deleted descendants-first once the walk is complete.

use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, instrument};

use crate::edge::Status;
use crate::graph::GenealogyGraph;
use crate::tree::NodeId;

/// Outcome of one pruning pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PruneReport {
    /// Deleted node ids, in deletion order (descendants before ancestors).
    pub removed: Vec<NodeId>,
    /// Nodes whose own status matched and triggered a subtree removal.
    pub triggers: Vec<NodeId>,
}

impl PruneReport {
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.removed.is_empty()
    }
}

/// Remove every node reachable from `root` whose status is `removal`,
/// together with its full descendant subtree.
///
/// Total over any graph: a missing `root` or a graph with no matching node
/// leaves the graph untouched. Running it twice is a no-op the second time.
#[instrument(skip(graph), fields(nodes = graph.node_count()))]
pub fn prune(graph: &mut GenealogyGraph, root: NodeId, removal: Status) -> PruneReport {
    let mut report = PruneReport::default();
    if !graph.contains(root) {
        return report;
    }

    let mut marked: Vec<NodeId> = Vec::new();
    let mut seen: HashSet<NodeId> = HashSet::new();
    let mut stack = vec![root];

    while let Some(id) = stack.pop() {
        if seen.contains(&id) {
            continue;
        }
        let status = graph.attrs(id).and_then(|attrs| attrs.status);
        if status == Some(removal) {
            report.triggers.push(id);
            for node in graph.subtree(id) {
                if seen.insert(node) {
                    marked.push(node);
                }
            }
            continue;
        }
        stack.extend(graph.children(id).into_iter().rev());
    }

    for &id in marked.iter().rev() {
        if graph.remove_node(id).is_some() {
            report.removed.push(id);
        }
    }

    debug!(
        removed = report.removed.len(),
        triggers = report.triggers.len(),
        remaining = graph.node_count(),
        "pruned removed subtrees"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::tests::attrs;

    /// ```text
    /// 0 ROOT
    /// ├── 1 A (Removed)
    /// │   └── 3 B (Issued)
    /// │       └── 5 D (Removed)
    /// └── 2 C (Issued)
    ///     └── 4 E (Removed)
    /// ```
    fn sample() -> GenealogyGraph {
        let mut g = GenealogyGraph::with_root(NodeId(0));
        g.add_node(attrs(0, "ROOT", None));
        g.add_node(attrs(1, "A", Some(Status::Removed)));
        g.add_node(attrs(2, "C", Some(Status::Issued)));
        g.add_node(attrs(3, "B", Some(Status::Issued)));
        g.add_node(attrs(4, "E", Some(Status::Removed)));
        g.add_node(attrs(5, "D", Some(Status::Removed)));
        for (p, c) in [(0, 1), (0, 2), (1, 3), (2, 4), (3, 5)] {
            g.add_edge(NodeId(p), NodeId(c));
        }
        g
    }

    #[test]
    fn removed_node_takes_its_subtree() {
        let mut g = sample();
        let report = prune(&mut g, NodeId(0), Status::Removed);

        let left: Vec<NodeId> = g.node_ids().collect();
        assert_eq!(left, vec![NodeId(0), NodeId(2)]);
        assert_eq!(g.edges(), vec![(NodeId(0), NodeId(2))]);
        assert_eq!(report.triggers, vec![NodeId(1), NodeId(4)]);
        assert_eq!(report.removed.len(), 4);
    }

    #[test]
    fn deletion_order_is_descendants_first() {
        let mut g = sample();
        let report = prune(&mut g, NodeId(0), Status::Removed);
        let pos = |id: u32| {
            report
                .removed
                .iter()
                .position(|&n| n == NodeId(id))
                .expect("removed")
        };
        assert!(pos(5) < pos(3));
        assert!(pos(3) < pos(1));
    }

    #[test]
    fn leaf_with_removal_status_is_removed() {
        let mut g = GenealogyGraph::with_root(NodeId(0));
        g.add_node(attrs(0, "ROOT", None));
        g.add_node(attrs(1, "LEAF", Some(Status::Removed)));
        g.add_edge(NodeId(0), NodeId(1));

        let report = prune(&mut g, NodeId(0), Status::Removed);
        assert_eq!(report.removed, vec![NodeId(1)]);
        assert_eq!(g.node_count(), 1);
        assert_eq!(g.edge_count(), 0);
    }

    #[test]
    fn second_pass_is_a_noop() {
        let mut once = sample();
        prune(&mut once, NodeId(0), Status::Removed);
        let mut twice = once.clone();
        let report = prune(&mut twice, NodeId(0), Status::Removed);
        assert!(report.is_noop());
        assert_eq!(once, twice);
    }

    #[test]
    fn missing_root_leaves_graph_untouched() {
        let mut g = sample();
        let before = g.clone();
        let report = prune(&mut g, NodeId(42), Status::Removed);
        assert!(report.is_noop());
        assert_eq!(g, before);
    }

    #[test]
    fn other_markers_are_honoured() {
        let mut g = sample();
        let report = g.prune_removed(Status::Issued);
        // C (Issued) goes with E; B (Issued) goes with D; A stays.
        let left: Vec<NodeId> = g.node_ids().collect();
        assert_eq!(left, vec![NodeId(0), NodeId(1)]);
        assert_eq!(report.triggers, vec![NodeId(3), NodeId(2)]);
    }
}
