//! Visualization export: node set plus parent → child edge list.
//!
//! Layout and rendering belong to the consumer; this module only produces
//! the structure (as serde JSON or Graphviz DOT text) and a plain ASCII tree
//! for terminals.

use std::fmt::Write as FmtWrite;

use serde::Serialize;

use crate::graph::GenealogyGraph;
use crate::tree::NodeId;

/// A node as seen by a renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportNode {
    pub id: NodeId,
    pub description: String,
    pub part_number: String,
    pub serial_or_lot: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExportEdge {
    pub parent: NodeId,
    pub child: NodeId,
}

/// Renderer-facing snapshot of a [`GenealogyGraph`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphExport {
    pub root: NodeId,
    pub nodes: Vec<ExportNode>,
    pub edges: Vec<ExportEdge>,
}

impl GraphExport {
    /// Snapshot `graph`: nodes ascending by id, edges sorted.
    #[must_use]
    pub fn from_graph(graph: &GenealogyGraph) -> Self {
        let nodes = graph
            .nodes()
            .map(|attrs| ExportNode {
                id: attrs.node_id,
                description: attrs.description.clone(),
                part_number: attrs.part_number.clone(),
                serial_or_lot: attrs.serial_or_lot.clone(),
            })
            .collect();
        let edges = graph
            .edges()
            .into_iter()
            .map(|(parent, child)| ExportEdge { parent, child })
            .collect();
        Self {
            root: graph.root(),
            nodes,
            edges,
        }
    }

    /// Graphviz DOT text with one labelled box per node.
    #[must_use]
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph genealogy {\n");
        out.push_str("    rankdir=TB;\n    node [shape=box];\n");
        for node in &self.nodes {
            let mut label = format!(
                "{}\\nPN: {}",
                escape(&node.description),
                escape(&node.part_number)
            );
            if let Some(sn) = &node.serial_or_lot {
                let _ = write!(label, "\\nSN: {}", escape(sn));
            }
            let _ = writeln!(out, "    n{} [label=\"{label}\"];", node.id);
        }
        for edge in &self.edges {
            let _ = writeln!(out, "    n{} -> n{};", edge.parent, edge.child);
        }
        out.push_str("}\n");
        out
    }
}

fn escape(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Render `graph` as an indented ASCII tree from its root.
///
/// Each line shows `description [part_number] SN` and, for non-root nodes,
/// the lifecycle status.
#[must_use]
pub fn render_tree(graph: &GenealogyGraph) -> String {
    let mut out = String::new();
    let root = graph.root();
    let Some(attrs) = graph.attrs(root) else {
        out.push_str("(empty)\n");
        return out;
    };
    let _ = writeln!(out, "{}", label(graph, root).unwrap_or_else(|| attrs.description.clone()));

    // (node, prefix for its children, is_last among siblings)
    let mut stack: Vec<(NodeId, String, bool)> = Vec::new();
    push_children(graph, root, "", &mut stack);

    while let Some((id, prefix, is_last)) = stack.pop() {
        let connector = if is_last { "└── " } else { "├── " };
        let line = label(graph, id).unwrap_or_default();
        let _ = writeln!(out, "{prefix}{connector}{line}");
        let child_prefix = format!("{prefix}{}", if is_last { "    " } else { "│   " });
        push_children(graph, id, &child_prefix, &mut stack);
    }
    out
}

fn push_children(
    graph: &GenealogyGraph,
    id: NodeId,
    prefix: &str,
    stack: &mut Vec<(NodeId, String, bool)>,
) {
    let kids = graph.children(id);
    let count = kids.len();
    for (i, child) in kids.into_iter().enumerate().rev() {
        stack.push((child, prefix.to_string(), i + 1 == count));
    }
}

fn label(graph: &GenealogyGraph, id: NodeId) -> Option<String> {
    let attrs = graph.attrs(id)?;
    let mut line = format!("{} [{}]", attrs.description, attrs.part_number);
    if let Some(sn) = &attrs.serial_or_lot {
        let _ = write!(line, " SN {sn}");
    }
    if let Some(status) = attrs.status {
        let _ = write!(line, " ({status})");
    }
    Some(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::Status;
    use crate::graph::tests::attrs;

    fn sample() -> GenealogyGraph {
        let mut g = GenealogyGraph::with_root(NodeId(0));
        g.add_node(attrs(0, "SAT", None));
        g.add_node(attrs(1, "TA", Some(Status::Issued)));
        g.add_node(attrs(2, "PM", Some(Status::Issued)));
        g.add_node(attrs(3, "HS", Some(Status::Unknown)));
        g.add_edge(NodeId(0), NodeId(1));
        g.add_edge(NodeId(1), NodeId(2));
        g.add_edge(NodeId(1), NodeId(3));
        g
    }

    #[test]
    fn export_lists_nodes_and_edges() {
        let export = GraphExport::from_graph(&sample());
        assert_eq!(export.root, NodeId(0));
        assert_eq!(export.nodes.len(), 4);
        assert_eq!(export.nodes[2].part_number, "PM");
        assert_eq!(
            export.edges,
            vec![
                ExportEdge {
                    parent: NodeId(0),
                    child: NodeId(1),
                },
                ExportEdge {
                    parent: NodeId(1),
                    child: NodeId(2),
                },
                ExportEdge {
                    parent: NodeId(1),
                    child: NodeId(3),
                },
            ]
        );

        let json = serde_json::to_value(&export).expect("serialize");
        assert_eq!(json["nodes"][1]["id"], 1);
        assert_eq!(json["edges"][0]["child"], 1);
    }

    #[test]
    fn dot_output_escapes_labels() {
        let mut g = GenealogyGraph::with_root(NodeId(0));
        let mut root = attrs(0, "SAT", None);
        root.description = "SAT \"V2\"".into();
        g.add_node(root);
        let dot = GraphExport::from_graph(&g).to_dot();
        assert!(dot.starts_with("digraph genealogy {"));
        assert!(dot.contains("SAT \\\"V2\\\""));
        assert!(dot.trim_end().ends_with('}'));
    }

    #[test]
    fn ascii_tree_draws_connectors() {
        let text = render_tree(&sample());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("SAT DESC [SAT]"));
        assert!(lines[1].starts_with("└── TA DESC [TA]"));
        assert!(lines[2].starts_with("    ├── PM DESC [PM]"));
        assert!(lines[3].starts_with("    └── HS DESC [HS]"));
        assert!(lines[3].ends_with("(Unknown)"));
    }
}
