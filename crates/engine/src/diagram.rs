//! DOT rendering of a constraint graph.
//!
//! Statements follow the graph's insertion order, not the sorted order, so a diagram shows
//! what was declared. Each non-empty `before` / `after` list becomes a single grouped edge
//! statement.

use std::fmt::Write as _;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{
    graph::{ActionGraph, GraphNode},
    model::display_group,
};

/// Ordered DOT attributes of one node class, rendered as `[k=v, ...]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeStyle(IndexMap<String, String>);

impl NodeStyle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an attribute, replacing an earlier value in place.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn render(&self) -> String {
        if self.0.is_empty() {
            return String::new();
        }
        let attributes: Vec<String> = self.0.iter().map(|(name, value)| format!("{name}={}", quote(value))).collect();
        format!(" [{}]", attributes.join(", "))
    }
}

/// Visual configuration of a diagram.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagramStyle {
    pub graph_name: String,
    pub key: NodeStyle,
    pub class: NodeStyle,
    pub method: NodeStyle,
}

impl Default for DiagramStyle {
    fn default() -> Self {
        Self {
            graph_name: "actions".to_string(),
            key: NodeStyle::new().with("shape", "ellipse").with("style", "dashed"),
            class: NodeStyle::new().with("shape", "box").with("style", "bold"),
            method: NodeStyle::new().with("shape", "box"),
        }
    }
}

impl DiagramStyle {
    fn node_style(&self, node: &GraphNode) -> &NodeStyle {
        match node {
            GraphNode::Key(_) => &self.key,
            GraphNode::Class(_) => &self.class,
            GraphNode::Method(_) => &self.method,
        }
    }
}

/// Render `graph` as a DOT `digraph`.
pub fn render_dot(graph: &ActionGraph, style: &DiagramStyle) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "digraph {} {{", quote(&style.graph_name));
    for node in graph.graph.nodes() {
        let name = quote(display_group(&node.group));
        let _ = writeln!(out, "  {name}{};", style.node_style(&node.node).render());
        if !node.before.is_empty() {
            let _ = writeln!(out, "  {name} -> {{{}}};", group_list(&node.before));
        }
        if !node.after.is_empty() {
            let _ = writeln!(out, "  {{{}}} -> {name};", group_list(&node.after));
        }
    }
    out.push_str("}\n");
    out
}

fn group_list(groups: &[String]) -> String {
    groups.iter().map(|group| quote(display_group(group))).collect::<Vec<_>>().join(" ")
}

fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('\\', "\\\\").replace('"', "\\\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ConstraintGraph;

    fn graph() -> ActionGraph {
        let mut graph = ConstraintGraph::new();
        graph.add(GraphNode::Key("tracingId".into()), vec![], vec![]);
        graph.add(GraphNode::Key("class:Invoker".into()), vec!["result".into(), "invocation".into()], vec!["tracingId".into()]);
        graph.add(GraphNode::Key("say \"hi\"".into()), vec![], vec![]);
        ActionGraph { actions: Vec::new(), graph }
    }

    #[test]
    fn renders_grouped_edges_in_insertion_order() {
        let style = DiagramStyle {
            graph_name: "pipeline".into(),
            key: NodeStyle::new(),
            ..DiagramStyle::default()
        };
        let dot = render_dot(&graph(), &style);

        let expected = [
            r#"digraph "pipeline" {"#,
            r#"  "tracingId";"#,
            r#"  "Invoker";"#,
            r#"  "Invoker" -> {"result" "invocation"};"#,
            r#"  {"tracingId"} -> "Invoker";"#,
            r#"  "say \"hi\"";"#,
            "}",
        ];
        assert_eq!(dot.lines().collect::<Vec<_>>(), expected);
        assert!(dot.ends_with("}\n"));
    }

    #[test]
    fn node_styles_render_as_attribute_lists() {
        let style = NodeStyle::new().with("shape", "box").with("color", "red").with("shape", "ellipse");
        assert_eq!(style.render(), " [shape=\"ellipse\", color=\"red\"]");
        assert_eq!(NodeStyle::new().render(), "");
    }
}
