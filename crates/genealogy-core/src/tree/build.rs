//! Breadth-first tree construction from an edge table.
//!
//! # Algorithm
//!
//! 1. **Plant.** Rows matching a [`TopLevelPattern`] give the root and the
//!    beginning nodes (the child side of every match, in table order). In a
//!    table scoped to the root every description match counts; otherwise
//!    the row's parent serial must also be the root identity. The root is
//!    the parent side of the first match whose parent serial is the root
//!    identity, or of the first match when none carries it. A match whose
//!    parent is not the root hangs under an anchor node created once for
//!    that parent.
//! 2. **Expand.** For each node of the current level, every row keyed by the
//!    node's `(part_number, description, trace_id)` becomes a new child with
//!    the next id. Children that are parents themselves form the next level.
//! 3. Stop when a level is empty.
//!
//! Ids follow creation order, so the output is deterministic for a given
//! row order.
//!
//! # Guards
//!
//! - Rows whose parent and child part numbers are equal are skipped.
//! - A row whose child key already appears on the parent's lineage is
//!   skipped and counted as a cycle cut, so bad source data cannot make the
//!   build loop forever.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::config::TopLevelPattern;
use crate::edge::{EdgeRow, EdgeTable, ParentKey};
use crate::error::{ErrorCode, GenealogyError, Result};
use crate::tree::{ComponentInstance, ComponentTree, NodeId};

/// Hands out sequential node ids for one build.
#[derive(Debug, Default)]
pub struct IdCounter {
    next: u32,
}

impl IdCounter {
    /// Take the next id.
    pub fn next_id(&mut self) -> NodeId {
        let id = NodeId(self.next);
        self.next += 1;
        id
    }

    /// Number of ids handed out so far.
    #[must_use]
    pub const fn issued(&self) -> u32 {
        self.next
    }
}

/// Counters describing one build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BuildStats {
    /// Rows matched by the top-level patterns.
    pub top_level_rows: usize,
    /// Anchor assemblies inserted between the root and a beginning node.
    pub anchors: usize,
    /// Rows skipped because parent and child part numbers were equal.
    pub self_loops_skipped: usize,
    /// Rows skipped because the child already appeared on its own lineage.
    pub cycle_cuts: usize,
    /// Breadth-first levels expanded below the beginning nodes.
    pub levels: usize,
}

/// Result of a successful build.
#[derive(Debug, Clone)]
pub struct BuiltTree {
    pub tree: ComponentTree,
    pub stats: BuildStats,
}

/// Builds [`ComponentTree`]s according to a set of top-level patterns.
#[derive(Debug, Clone, Copy)]
pub struct TreeBuilder<'a> {
    patterns: &'a [TopLevelPattern],
}

impl<'a> TreeBuilder<'a> {
    #[must_use]
    pub const fn new(patterns: &'a [TopLevelPattern]) -> Self {
        Self { patterns }
    }

    /// Build the ownership tree of `root` from `table`.
    ///
    /// # Errors
    ///
    /// Returns [`GenealogyError::RootNotFound`] when no row matches any
    /// top-level pattern for `root`.
    #[instrument(skip(self, table), fields(rows = table.len()))]
    pub fn build(&self, table: &EdgeTable, root: &str) -> Result<BuiltTree> {
        let mut ctx = BuildContext::default();

        let mut level = self.plant(&mut ctx, table, root)?;
        while !level.is_empty() {
            level = ctx.expand_level(table, &level);
            ctx.stats.levels += 1;
        }

        debug!(
            nodes = ctx.tree.len(),
            levels = ctx.stats.levels,
            self_loops = ctx.stats.self_loops_skipped,
            cycle_cuts = ctx.stats.cycle_cuts,
            "built component tree"
        );
        Ok(BuiltTree {
            tree: ctx.tree,
            stats: ctx.stats,
        })
    }

    /// Rows matching any pattern, grouped by pattern priority, each row once.
    fn top_level_rows<'t>(&self, table: &'t EdgeTable, root: &str) -> Vec<&'t EdgeRow> {
        let scoped = table.is_scoped_to(root);
        let mut taken = vec![false; table.len()];
        let mut rows = Vec::new();
        for pattern in self.patterns {
            for (pos, row) in table.rows().iter().enumerate() {
                let hit = if scoped {
                    pattern.matches_description(row)
                } else {
                    pattern.matches(row, root)
                };
                if !taken[pos] && hit {
                    taken[pos] = true;
                    rows.push(row);
                }
            }
        }
        rows
    }

    /// Create the root and beginning nodes; return the first level to expand.
    fn plant(
        &self,
        ctx: &mut BuildContext,
        table: &EdgeTable,
        root: &str,
    ) -> Result<Vec<NodeId>> {
        let rows = self.top_level_rows(table, root);
        let Some(root_row) = rows
            .iter()
            .find(|row| row.parent_serial.as_deref() == Some(root))
            .or_else(|| rows.first())
        else {
            return Err(GenealogyError::RootNotFound {
                root: root.to_string(),
                patterns: self.patterns.iter().map(TopLevelPattern::describe).collect(),
            });
        };
        ctx.stats.top_level_rows = rows.len();

        let root_id = ctx.ids.next_id();
        let serial = root_row
            .parent_serial
            .clone()
            .unwrap_or_else(|| root.to_string());
        ctx.tree.insert(ComponentInstance::from_parent(root_id, root_row, Some(serial)));
        let root_key = root_row.parent_key();

        let mut anchors: HashMap<ParentKey, NodeId> = HashMap::new();
        let mut level = Vec::new();
        for row in rows {
            let parent_key = row.parent_key();
            let parent = if parent_key == root_key {
                root_id
            } else if let Some(&anchor) = anchors.get(&parent_key) {
                anchor
            } else {
                let anchor = ctx.ids.next_id();
                ctx.tree.insert(ComponentInstance::from_parent(
                    anchor,
                    row,
                    row.parent_serial.clone(),
                ));
                ctx.tree.attach(root_id, anchor);
                anchors.insert(parent_key, anchor);
                ctx.stats.anchors += 1;
                anchor
            };

            if let Some(child) = ctx.add_child(table, parent, row) {
                level.push(child);
            }
        }
        Ok(level)
    }
}

#[derive(Debug, Default)]
struct BuildContext {
    ids: IdCounter,
    tree: ComponentTree,
    stats: BuildStats,
}

impl BuildContext {
    /// Attach children to every node of `level`; return the nodes that have
    /// children of their own.
    fn expand_level(&mut self, table: &EdgeTable, level: &[NodeId]) -> Vec<NodeId> {
        let mut next = Vec::new();
        for &parent in level {
            let key = self.tree.nodes[parent.index()].key();
            for row in table.children_of(&key) {
                if let Some(child) = self.add_child(table, parent, row) {
                    next.push(child);
                }
            }
        }
        next
    }

    /// Create the child of `row` under `parent` unless a guard rejects it.
    /// Returns the new id when the child needs expanding.
    fn add_child(&mut self, table: &EdgeTable, parent: NodeId, row: &EdgeRow) -> Option<NodeId> {
        if row.is_self_loop() {
            debug!(
                part_number = %row.child_part_number,
                trace_id = %row.child_trace_id,
                "skipping self-referential row"
            );
            self.stats.self_loops_skipped += 1;
            return None;
        }

        let child_key = row.child_key();
        if self.tree.lineage_contains(parent, &child_key) {
            warn!(
                code = ErrorCode::CycleDetected.code(),
                part_number = %child_key.part_number,
                trace_id = %child_key.trace_id,
                parent = %parent,
                "child already on its own lineage; not expanding"
            );
            self.stats.cycle_cuts += 1;
            return None;
        }

        let id = self.ids.next_id();
        self.tree.insert(ComponentInstance::from_child(id, row));
        self.tree.attach(parent, id);

        table.has_children(&child_key).then_some(id)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
