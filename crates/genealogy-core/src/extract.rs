//! Info extraction: pruned graph → deduplicated reporting rows.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::graph::{GenealogyGraph, PartAttrs};

/// One reporting fact about an installed component.
///
/// Field names follow the columns the downstream test-matching process
/// reads.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InfoRow {
    #[serde(rename = "PartNumber")]
    pub part_number: String,
    #[serde(rename = "SerialNumber")]
    pub serial_or_lot: Option<String>,
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "WorkOrderID")]
    pub work_order: Option<String>,
    #[serde(rename = "TestSerialNumber")]
    pub test_reference: Option<String>,
}

impl From<&PartAttrs> for InfoRow {
    fn from(attrs: &PartAttrs) -> Self {
        Self {
            part_number: attrs.part_number.clone(),
            serial_or_lot: attrs.serial_or_lot.clone(),
            description: attrs.description.clone(),
            work_order: attrs.work_order.clone(),
            test_reference: attrs.test_reference.clone(),
        }
    }
}

/// Set of [`InfoRow`]s with no two rows equal on all five fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct InfoTable {
    rows: Vec<InfoRow>,
}

impl InfoTable {
    #[must_use]
    pub fn rows(&self) -> &[InfoRow] {
        &self.rows
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows whose description contains `needle`, e.g. `"MAGNET"` when
    /// matching magnet test records.
    #[must_use]
    pub fn filter_description(&self, needle: &str) -> Self {
        Self {
            rows: self
                .rows
                .iter()
                .filter(|row| row.description.contains(needle))
                .cloned()
                .collect(),
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, InfoRow> {
        self.rows.iter()
    }
}

impl FromIterator<InfoRow> for InfoTable {
    /// Keeps the first occurrence of each distinct row.
    fn from_iter<I: IntoIterator<Item = InfoRow>>(iter: I) -> Self {
        let mut seen = HashSet::new();
        let rows = iter
            .into_iter()
            .filter(|row| seen.insert(row.clone()))
            .collect();
        Self { rows }
    }
}

impl<'a> IntoIterator for &'a InfoTable {
    type Item = &'a InfoRow;
    type IntoIter = std::slice::Iter<'a, InfoRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

/// One row per surviving node, in ascending node id order, with rows that
/// are identical on every field collapsed to their first occurrence.
///
/// Deduplication is on the whole row only: two instances that share a part
/// number and serial but differ in work order both stay.
#[instrument(skip(graph), fields(nodes = graph.node_count()))]
#[must_use]
pub fn flatten(graph: &GenealogyGraph) -> InfoTable {
    let table: InfoTable = graph.nodes().map(InfoRow::from).collect();
    debug!(
        rows = table.len(),
        collapsed = graph.node_count() - table.len(),
        "flattened genealogy graph"
    );
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::Status;
    use crate::graph::tests::attrs;
    use crate::tree::NodeId;

    fn graph_with_twins() -> GenealogyGraph {
        let mut g = GenealogyGraph::with_root(NodeId(0));
        g.add_node(attrs(0, "SAT", None));
        let mut a = attrs(1, "MAG", Some(Status::Issued));
        a.serial_or_lot = Some("LOT-7".into());
        let mut b = a.clone();
        b.node_id = NodeId(2);
        b.trace_id = "t2".into();
        g.add_node(a);
        g.add_node(b);
        g.add_edge(NodeId(0), NodeId(1));
        g.add_edge(NodeId(0), NodeId(2));
        g
    }

    #[test]
    fn identical_rows_collapse_to_one() {
        let table = flatten(&graph_with_twins());
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[0].part_number, "SAT");
        assert_eq!(table.rows()[1].serial_or_lot.as_deref(), Some("LOT-7"));
    }

    #[test]
    fn rows_differing_in_one_field_are_kept() {
        let mut g = graph_with_twins();
        let mut c = attrs(3, "MAG", Some(Status::Issued));
        c.serial_or_lot = Some("LOT-7".into());
        c.work_order = Some("WO-9".into());
        g.add_node(c);
        g.add_edge(NodeId(0), NodeId(3));
        assert_eq!(flatten(&g).len(), 3);
    }

    #[test]
    fn description_filter_selects_substring_matches() {
        let table = flatten(&graph_with_twins());
        let magnets = table.filter_description("MAG");
        assert_eq!(magnets.len(), 1);
        assert!(table.filter_description("HOUSING").is_empty());
    }

    #[test]
    fn serializes_with_report_columns() {
        let table = flatten(&graph_with_twins());
        let json = serde_json::to_value(&table).expect("json");
        assert_eq!(json[1]["PartNumber"], "MAG");
        assert_eq!(json[1]["SerialNumber"], "LOT-7");
        assert!(json[0]["WorkOrderID"].is_null());
    }

    #[test]
    fn empty_graph_gives_empty_table() {
        let g = GenealogyGraph::with_root(NodeId(0));
        assert!(flatten(&g).is_empty());
    }
}
