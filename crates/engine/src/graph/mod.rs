//! Constraint graph over actions and data keys.
//!
//! - `builder` turns action metadata into nodes with `before` / `after` edges, inserting a
//!   placeholder key node for every data key an action produces or consumes
//! - `planning` computes the stable, constraint-satisfying total order
//!
//! Edges name groups rather than nodes, so a constraint against a key that several actions
//! reference only needs the key's single placeholder node.

use std::sync::Arc;

use crate::{
    error::EngineError,
    model::{ActionClass, BoundMethod},
};

pub mod builder;
pub mod planning;

pub use builder::{SortOptions, add_action_to_graph, sort_action_classes, sort_actions};

/// Payload of a constraint node.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphNode {
    /// Placeholder marking "this data is now available". Never executed.
    Key(String),
    /// A whole action class.
    Class(Arc<ActionClass>),
    /// A single action method paired with its class.
    Method(BoundMethod),
}

impl GraphNode {
    /// The group this node is known by in the graph.
    pub fn group(&self) -> &str {
        match self {
            Self::Key(key) => key,
            Self::Class(class) => &class.group,
            Self::Method(method) => method.group(),
        }
    }

    /// `true` for class and method nodes.
    pub fn is_action(&self) -> bool {
        !matches!(self, Self::Key(_))
    }

    pub fn as_method(&self) -> Option<&BoundMethod> {
        match self {
            Self::Method(method) => Some(method),
            _ => None,
        }
    }
}

/// A node plus the constraints it declares.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintNode {
    pub group: String,
    pub node: GraphNode,
    /// Insertion sequence number; breaks ties between unconstrained nodes.
    pub sequence: usize,
    /// Groups this node must precede.
    pub before: Vec<String>,
    /// Groups this node must follow.
    pub after: Vec<String>,
}

/// Nodes in insertion order, each with its `before` / `after` group lists.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConstraintGraph {
    nodes: Vec<ConstraintNode>,
}

impl ConstraintGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a node; returns its sequence number.
    pub fn add(&mut self, node: GraphNode, before: Vec<String>, after: Vec<String>) -> usize {
        let sequence = self.nodes.len();
        self.nodes.push(ConstraintNode {
            group: node.group().to_string(),
            node,
            sequence,
            before,
            after,
        });
        sequence
    }

    /// Whether any node is known by `group`.
    pub fn contains_group(&self, group: &str) -> bool {
        self.nodes.iter().any(|node| node.group == group)
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> &[ConstraintNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Indices of all nodes in a constraint-satisfying order.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::CyclicDependency`] when the constraints are contradictory.
    pub fn sort(&self) -> Result<Vec<usize>, EngineError> {
        planning::order_constraint_nodes(&self.nodes)
    }
}

/// The sorted result of building a constraint graph.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionGraph {
    /// Nodes in execution order (key nodes removed when requested).
    pub actions: Vec<GraphNode>,
    /// The graph the order was computed from.
    pub graph: ConstraintGraph,
}

impl ActionGraph {
    /// Groups of `actions`, in order.
    pub fn groups(&self) -> Vec<&str> {
        self.actions.iter().map(GraphNode::group).collect()
    }

    /// Method nodes, in order.
    pub fn methods(&self) -> impl Iterator<Item = &BoundMethod> {
        self.actions.iter().filter_map(GraphNode::as_method)
    }
}
