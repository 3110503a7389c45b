//! Genealogy graph: the materialized, prunable view of an ownership tree.
//!
//! # Overview
//!
//! ```text
//! ComponentTree (arena, owned children)
//!        ↓  materialize::materialize()
//! GenealogyGraph (StableDiGraph, parent → child edges)
//!        ↓  prune::prune()
//! GenealogyGraph without removed subtrees
//!        ↓  export::GraphExport::from_graph() / extract::flatten()
//! visualization / reporting collaborators
//! ```
//!
//! The graph is keyed by [`NodeId`]. It uses a [`StableDiGraph`] so that
//! deleting nodes during pruning never renumbers the survivors.

#![allow(clippy::module_name_repetitions)]

pub mod export;
pub mod materialize;
pub mod prune;

use std::collections::BTreeMap;

use petgraph::Direction;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::Dfs;
use serde::Serialize;

use crate::edge::Status;
use crate::tree::{ComponentInstance, NodeId};

pub use export::{GraphExport, render_tree};
pub use materialize::materialize;
pub use prune::{PruneReport, prune};

/// Attributes copied from a [`ComponentInstance`] onto its graph node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartAttrs {
    pub node_id: NodeId,
    pub description: String,
    pub part_number: String,
    pub serial_or_lot: Option<String>,
    pub trace_id: String,
    pub work_order: Option<String>,
    pub test_reference: Option<String>,
    pub status: Option<Status>,
}

impl From<&ComponentInstance> for PartAttrs {
    fn from(node: &ComponentInstance) -> Self {
        Self {
            node_id: node.node_id,
            description: node.description.clone(),
            part_number: node.part_number.clone(),
            serial_or_lot: node.serial_or_lot.clone(),
            trace_id: node.trace_id.clone(),
            work_order: node.work_order.clone(),
            test_reference: node.test_reference.clone(),
            status: node.status,
        }
    }
}

/// Directed parent → child graph over component instances.
#[derive(Debug, Clone)]
pub struct GenealogyGraph {
    graph: StableDiGraph<PartAttrs, ()>,
    index: BTreeMap<NodeId, NodeIndex>,
    root: NodeId,
}

impl GenealogyGraph {
    pub(crate) fn with_root(root: NodeId) -> Self {
        Self {
            graph: StableDiGraph::new(),
            index: BTreeMap::new(),
            root,
        }
    }

    /// Add a node; returns `false` if its id is already present.
    pub(crate) fn add_node(&mut self, attrs: PartAttrs) -> bool {
        if self.index.contains_key(&attrs.node_id) {
            return false;
        }
        let id = attrs.node_id;
        let idx = self.graph.add_node(attrs);
        self.index.insert(id, idx);
        true
    }

    /// Add `parent → child` unless either end is missing or the edge exists.
    pub(crate) fn add_edge(&mut self, parent: NodeId, child: NodeId) -> bool {
        match (self.index_of(parent), self.index_of(child)) {
            (Some(p), Some(c)) if !self.graph.contains_edge(p, c) => {
                self.graph.add_edge(p, c, ());
                true
            }
            _ => false,
        }
    }

    pub(crate) fn remove_node(&mut self, id: NodeId) -> Option<PartAttrs> {
        let idx = self.index.remove(&id)?;
        self.graph.remove_node(idx)
    }

    fn index_of(&self, id: NodeId) -> Option<NodeIndex> {
        self.index.get(&id).copied()
    }

    fn id_at(&self, idx: NodeIndex) -> NodeId {
        self.graph[idx].node_id
    }

    /// The id the graph was materialized from.
    #[must_use]
    pub const fn root(&self) -> NodeId {
        self.root
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.index.contains_key(&id)
    }

    #[must_use]
    pub fn attrs(&self, id: NodeId) -> Option<&PartAttrs> {
        self.index_of(id).map(|idx| &self.graph[idx])
    }

    /// Surviving node ids, ascending.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.index.keys().copied()
    }

    /// Node attributes in ascending id order.
    pub fn nodes(&self) -> impl Iterator<Item = &PartAttrs> {
        self.index.values().map(|&idx| &self.graph[idx])
    }

    /// Children of `id`, ascending (which is also construction order).
    #[must_use]
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        let Some(idx) = self.index_of(id) else {
            return Vec::new();
        };
        let mut kids: Vec<NodeId> = self
            .graph
            .neighbors_directed(idx, Direction::Outgoing)
            .map(|n| self.id_at(n))
            .collect();
        kids.sort_unstable();
        kids
    }

    /// The single owning parent of `id`, if any survives.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        let idx = self.index_of(id)?;
        self.graph
            .neighbors_directed(idx, Direction::Incoming)
            .next()
            .map(|n| self.id_at(n))
    }

    /// All `(parent, child)` pairs, sorted.
    #[must_use]
    pub fn edges(&self) -> Vec<(NodeId, NodeId)> {
        let mut edges: Vec<(NodeId, NodeId)> = self
            .graph
            .edge_indices()
            .filter_map(|e| self.graph.edge_endpoints(e))
            .map(|(p, c)| (self.id_at(p), self.id_at(c)))
            .collect();
        edges.sort_unstable();
        edges
    }

    /// `id` and everything reachable below it, in depth-first discovery
    /// order (ancestors before descendants).
    #[must_use]
    pub fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let Some(start) = self.index_of(id) else {
            return Vec::new();
        };
        let mut dfs = Dfs::new(&self.graph, start);
        let mut out = Vec::new();
        while let Some(idx) = dfs.next(&self.graph) {
            out.push(self.id_at(idx));
        }
        out
    }

    /// Prune nodes with status `removal` starting from the recorded root.
    pub fn prune_removed(&mut self, removal: Status) -> PruneReport {
        let root = self.root;
        prune(self, root, removal)
    }
}

impl PartialEq for GenealogyGraph {
    /// Same root, same node ids with the same attributes, same edges.
    fn eq(&self, other: &Self) -> bool {
        self.root == other.root
            && self.nodes().eq(other.nodes())
            && self.edges() == other.edges()
    }
}

impl Eq for GenealogyGraph {}
