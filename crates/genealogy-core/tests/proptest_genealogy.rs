use std::collections::{HashMap, HashSet};

use proptest::prelude::*;
use proptest::sample::Index;

use fixtures::{S1, config, edge};

use genealogy_core::{EdgeTable, NodeId, Status, TreeBuilder, flatten, materialize};

/// A random ownership tree as a table: part `P1` is the top assembly under
/// the satellite and every later part `Pi` hangs under some `Pj`, `j < i`.
#[derive(Debug, Clone)]
struct Shape {
    parents: Vec<usize>,
    statuses: Vec<Status>,
}

impl Shape {
    fn part(i: usize) -> (String, String, String) {
        if i == 1 {
            ("P1".into(), "ASSEMBLY".into(), "t1".into())
        } else {
            (format!("P{i}"), format!("PART {i}"), format!("t{i}"))
        }
    }

    fn table(&self) -> EdgeTable {
        let mut rows = Vec::with_capacity(self.statuses.len());
        let (pn, desc, trace) = Self::part(1);
        rows.push(edge(S1, (pn.as_str(), desc.as_str(), trace.as_str()), self.statuses[0]));
        for (offset, &parent) in self.parents.iter().enumerate() {
            let child = offset + 2;
            let (ppn, pdesc, ptrace) = Self::part(parent);
            let (cpn, cdesc, ctrace) = Self::part(child);
            rows.push(edge(
                (ppn.as_str(), pdesc.as_str(), ptrace.as_str()),
                (cpn.as_str(), cdesc.as_str(), ctrace.as_str()),
                self.statuses[child - 1],
            ));
        }
        EdgeTable::new(rows)
    }

    /// Parts, by number, that survive pruning: no Removed part on the path
    /// from the top assembly.
    fn expected_survivors(&self) -> HashSet<usize> {
        let mut alive = HashSet::new();
        for i in 1..=self.statuses.len() {
            let removed = self.statuses[i - 1] == Status::Removed;
            let parent_alive = i == 1 || alive.contains(&self.parents[i - 2]);
            if !removed && parent_alive {
                alive.insert(i);
            }
        }
        alive
    }
}

fn arb_status() -> impl Strategy<Value = Status> {
    prop_oneof![
        3 => Just(Status::Issued),
        1 => Just(Status::Removed),
        1 => Just(Status::Unknown),
    ]
}

fn arb_shape() -> impl Strategy<Value = Shape> {
    (0usize..40)
        .prop_flat_map(|extra| {
            (
                prop::collection::vec(any::<Index>(), extra),
                prop::collection::vec(arb_status(), extra + 1),
            )
        })
        .prop_map(|(picks, statuses)| {
            let parents = picks
                .iter()
                .enumerate()
                .map(|(offset, pick)| 1 + pick.index(offset + 1))
                .collect();
            Shape { parents, statuses }
        })
}

proptest! {
    #![proptest_config(proptest::test_runner::Config::with_cases(256))]

    #[test]
    fn graph_mirrors_tree(shape in arb_shape()) {
        let cfg = config();
        let built = TreeBuilder::new(&cfg.top_level).build(&shape.table(), "S1").unwrap();
        let graph = materialize(&built.tree);

        // Satellite plus every generated part.
        prop_assert_eq!(built.tree.len(), shape.statuses.len() + 1);
        prop_assert_eq!(graph.node_count(), built.tree.len());
        prop_assert_eq!(graph.edge_count(), graph.node_count() - 1);

        let ids: Vec<NodeId> = graph.node_ids().collect();
        let expected: Vec<NodeId> = (0..built.tree.len())
            .map(|i| NodeId(u32::try_from(i).unwrap()))
            .collect();
        prop_assert_eq!(ids, expected);

        for id in graph.node_ids() {
            let parent = graph.parent(id);
            if id == NodeId::ROOT {
                prop_assert!(parent.is_none());
            } else {
                // Exactly one parent, created earlier.
                let parent = parent.unwrap();
                prop_assert!(parent < id);
            }
        }
    }

    #[test]
    fn prune_keeps_exactly_unremoved_lineages(shape in arb_shape()) {
        let cfg = config();
        let built = TreeBuilder::new(&cfg.top_level).build(&shape.table(), "S1").unwrap();
        let mut graph = materialize(&built.tree);
        graph.prune_removed(Status::Removed);

        let by_part: HashMap<&str, NodeId> = graph
            .nodes()
            .map(|attrs| (attrs.part_number.as_str(), attrs.node_id))
            .collect();
        prop_assert!(graph.nodes().all(|attrs| attrs.status != Some(Status::Removed)));

        let expected = shape.expected_survivors();
        prop_assert_eq!(graph.node_count(), expected.len() + 1);
        for i in expected {
            let part = format!("P{i}");
            prop_assert!(by_part.contains_key(part.as_str()), "missing {}", part);
        }
    }

    #[test]
    fn prune_is_idempotent(shape in arb_shape()) {
        let cfg = config();
        let built = TreeBuilder::new(&cfg.top_level).build(&shape.table(), "S1").unwrap();
        let mut once = materialize(&built.tree);
        once.prune_removed(Status::Removed);
        let mut twice = once.clone();
        let report = twice.prune_removed(Status::Removed);

        prop_assert!(report.is_noop());
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn flatten_has_one_row_per_distinct_part(shape in arb_shape()) {
        let cfg = config();
        let built = TreeBuilder::new(&cfg.top_level).build(&shape.table(), "S1").unwrap();
        let graph = materialize(&built.tree);
        // Every generated part number is unique, so nothing collapses.
        prop_assert_eq!(flatten(&graph).len(), graph.node_count());
    }
}
