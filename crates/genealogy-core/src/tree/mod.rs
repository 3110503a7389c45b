//! Arena-backed ownership tree of component instances.
//!
//! # Overview
//!
//! A [`ComponentTree`] owns every [`ComponentInstance`] created during one
//! build in a `Vec`, indexed by [`NodeId`]. Ids are handed out sequentially
//! by the builder, so `NodeId(n)` is always the `n`th node created and the
//! root is always `NodeId(0)`.
//!
//! Children are stored as ids in insertion order; parents are non-owning ids
//! used only to walk upward. Because a node's parent is always created before
//! the node itself, following parents strictly decreases the id and can never
//! loop.

#![allow(clippy::module_name_repetitions)]

pub mod build;

use std::fmt;

use serde::Serialize;

use crate::edge::{EdgeRow, ParentKey, Status};

pub use build::{BuildStats, BuiltTree, IdCounter, TreeBuilder};

/// Sequential handle of a component instance within one build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl NodeId {
    pub const ROOT: Self = Self(0);

    /// Position in the owning arena.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One physical, serialized or lot-identified unit in the assembly hierarchy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentInstance {
    pub node_id: NodeId,
    pub description: String,
    pub part_number: String,
    pub serial_or_lot: Option<String>,
    /// Matching key in the source system; not meant for display.
    pub trace_id: String,
    pub work_order: Option<String>,
    pub test_reference: Option<String>,
    /// `None` only for the root and for anchor assemblies.
    pub status: Option<Status>,
    pub children: Vec<NodeId>,
    pub parents: Vec<NodeId>,
}

impl ComponentInstance {
    /// Instance described by the child side of `row`.
    #[must_use]
    pub fn from_child(node_id: NodeId, row: &EdgeRow) -> Self {
        Self {
            node_id,
            description: row.child_description.clone(),
            part_number: row.child_part_number.clone(),
            serial_or_lot: row.child_serial.clone(),
            trace_id: row.child_trace_id.clone(),
            work_order: row.work_order.clone(),
            test_reference: row.test_serial.clone(),
            status: Some(row.status),
            children: Vec::new(),
            parents: Vec::new(),
        }
    }

    /// Instance described by the parent side of `row`; it carries no status
    /// or work order because the row does not describe its own installation.
    #[must_use]
    pub fn from_parent(node_id: NodeId, row: &EdgeRow, serial: Option<String>) -> Self {
        Self {
            node_id,
            description: row.parent_description.clone(),
            part_number: row.parent_part_number.clone(),
            serial_or_lot: serial,
            trace_id: row.parent_trace_id.clone(),
            work_order: None,
            test_reference: None,
            status: None,
            children: Vec::new(),
            parents: Vec::new(),
        }
    }

    /// Key used to look up this instance's children in the edge table.
    #[must_use]
    pub fn key(&self) -> ParentKey {
        ParentKey::new(&self.part_number, &self.description, &self.trace_id)
    }

    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Ownership tree produced by one [`TreeBuilder::build`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComponentTree {
    nodes: Vec<ComponentInstance>,
}

impl ComponentTree {
    /// Append `node`; its id must be the next arena slot.
    pub(crate) fn insert(&mut self, node: ComponentInstance) -> NodeId {
        let id = node.node_id;
        debug_assert_eq!(id.index(), self.nodes.len(), "node ids must be sequential");
        self.nodes.push(node);
        id
    }

    /// Record `child` as owned by `parent` (both lists grow).
    pub(crate) fn attach(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[parent.index()].children.push(child);
        self.nodes[child.index()].parents.push(parent);
    }

    /// The root instance; `None` only for an empty tree.
    #[must_use]
    pub fn root(&self) -> Option<&ComponentInstance> {
        self.get(NodeId::ROOT)
    }

    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&ComponentInstance> {
        self.nodes.get(id.index())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All instances in id (construction) order.
    pub fn iter(&self) -> impl Iterator<Item = &ComponentInstance> {
        self.nodes.iter()
    }

    /// Total number of parent → child ownership links.
    #[must_use]
    pub fn link_count(&self) -> usize {
        self.nodes.iter().map(|n| n.children.len()).sum()
    }

    /// `id` followed by its ancestors up to the root.
    pub fn lineage(&self, id: NodeId) -> impl Iterator<Item = &ComponentInstance> {
        std::iter::successors(self.get(id), |node| {
            node.parents.first().and_then(|&parent| self.get(parent))
        })
    }

    /// Whether `key` belongs to `id` or any of its ancestors.
    #[must_use]
    pub fn lineage_contains(&self, id: NodeId, key: &ParentKey) -> bool {
        self.lineage(id).any(|node| {
            node.part_number == key.part_number
                && node.description == key.description
                && node.trace_id == key.trace_id
        })
    }

    /// Number of links between `id` and the root.
    #[must_use]
    pub fn depth(&self, id: NodeId) -> usize {
        self.lineage(id).count().saturating_sub(1)
    }
}
