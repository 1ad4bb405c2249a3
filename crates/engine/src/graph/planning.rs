//! Stable topological ordering of constraint nodes.

use std::{
    cmp::Reverse,
    collections::{BinaryHeap, HashMap},
};

use indexmap::IndexSet;
use tracing::{debug, trace};

use crate::{error::EngineError, graph::ConstraintNode};

/// Order `nodes` so that every `before` / `after` constraint holds.
///
/// Kahn's algorithm over group-name edges. Among the nodes whose constraints are satisfied
/// the one with the lowest insertion sequence is emitted first, so the same input always
/// yields the same order. Constraints naming a group with no node are ignored; a node that
/// must precede or follow its own group can never be placed and is reported as a cycle.
pub(crate) fn order_constraint_nodes(nodes: &[ConstraintNode]) -> Result<Vec<usize>, EngineError> {
    let mut members: HashMap<&str, Vec<usize>> = HashMap::new();
    for (index, node) in nodes.iter().enumerate() {
        members.entry(node.group.as_str()).or_default().push(index);
    }

    let mut successors: Vec<IndexSet<usize>> = vec![IndexSet::new(); nodes.len()];
    let mut in_degrees = vec![0usize; nodes.len()];
    let mut self_constrained = vec![false; nodes.len()];
    let mut add_edge = |from: usize, to: usize| {
        if from == to {
            // Never released, so the node stays blocked.
            if !self_constrained[from] {
                self_constrained[from] = true;
                in_degrees[from] += 1;
            }
        } else if successors[from].insert(to) {
            in_degrees[to] += 1;
        }
    };

    for (index, node) in nodes.iter().enumerate() {
        for target in &node.before {
            match members.get(target.as_str()) {
                Some(targets) => targets.iter().for_each(|&successor| add_edge(index, successor)),
                None => trace!(group = %node.group, target = %target, "before constraint names no node"),
            }
        }
        for target in &node.after {
            match members.get(target.as_str()) {
                Some(targets) => targets.iter().for_each(|&predecessor| add_edge(predecessor, index)),
                None => trace!(group = %node.group, target = %target, "after constraint names no node"),
            }
        }
    }

    let mut ready: BinaryHeap<Reverse<(usize, usize)>> = nodes
        .iter()
        .enumerate()
        .filter(|(index, _)| in_degrees[*index] == 0)
        .map(|(index, node)| Reverse((node.sequence, index)))
        .collect();

    let mut ordered = Vec::with_capacity(nodes.len());
    while let Some(Reverse((_, index))) = ready.pop() {
        ordered.push(index);
        for &successor in &successors[index] {
            in_degrees[successor] -= 1;
            if in_degrees[successor] == 0 {
                ready.push(Reverse((nodes[successor].sequence, successor)));
            }
        }
    }

    if ordered.len() != nodes.len() {
        let remaining: Vec<String> = nodes
            .iter()
            .enumerate()
            .filter(|(index, _)| in_degrees[*index] > 0)
            .map(|(_, node)| node.group.clone())
            .collect();
        debug!(remaining = ?remaining, "constraint graph contains a cycle");
        return Err(EngineError::cyclic(remaining));
    }

    Ok(ordered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{ConstraintGraph, GraphNode};

    fn key(graph: &mut ConstraintGraph, name: &str, before: &[&str], after: &[&str]) {
        graph.add(
            GraphNode::Key(name.to_string()),
            before.iter().map(|group| group.to_string()).collect(),
            after.iter().map(|group| group.to_string()).collect(),
        );
    }

    fn sorted_groups(graph: &ConstraintGraph) -> Vec<String> {
        graph
            .sort()
            .expect("sort")
            .into_iter()
            .map(|index| graph.nodes()[index].group.clone())
            .collect()
    }

    #[test]
    fn respects_constraints_even_when_declared_out_of_order() {
        let mut graph = ConstraintGraph::new();
        key(&mut graph, "second", &[], &["first"]);
        key(&mut graph, "third", &[], &[]);
        key(&mut graph, "first", &["third"], &[]);

        assert_eq!(sorted_groups(&graph), vec!["first", "second", "third"]);
    }

    #[test]
    fn unconstrained_nodes_keep_insertion_order() {
        let mut graph = ConstraintGraph::new();
        for name in ["c", "a", "b"] {
            key(&mut graph, name, &[], &[]);
        }
        assert_eq!(sorted_groups(&graph), vec!["c", "a", "b"]);
    }

    #[test]
    fn released_nodes_sort_by_insertion_sequence() {
        let mut graph = ConstraintGraph::new();
        key(&mut graph, "late", &[], &["gate"]);
        key(&mut graph, "gate", &[], &[]);
        key(&mut graph, "free", &[], &[]);

        // "late" is released by "gate" and still precedes "free".
        assert_eq!(sorted_groups(&graph), vec!["gate", "late", "free"]);
    }

    #[test]
    fn ignores_unknown_groups() {
        let mut graph = ConstraintGraph::new();
        key(&mut graph, "a", &["missing"], &[]);
        key(&mut graph, "b", &[], &["nowhere"]);

        assert_eq!(sorted_groups(&graph), vec!["a", "b"]);
    }

    #[test]
    fn node_preceding_its_own_group_is_a_cycle() {
        let mut graph = ConstraintGraph::new();
        key(&mut graph, "a", &["a"], &[]);
        key(&mut graph, "free", &[], &[]);

        match graph.sort().expect_err("self constraint cannot be satisfied") {
            EngineError::CyclicDependency { groups } => assert_eq!(groups, vec!["a"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn node_following_its_own_group_blocks_its_successors() {
        let mut graph = ConstraintGraph::new();
        key(&mut graph, "a", &["b"], &["a"]);
        key(&mut graph, "b", &[], &[]);

        match graph.sort().expect_err("self constraint cannot be satisfied") {
            EngineError::CyclicDependency { groups } => assert_eq!(groups, vec!["a", "b"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn errors_on_cycle() {
        let mut graph = ConstraintGraph::new();
        key(&mut graph, "first", &["second"], &[]);
        key(&mut graph, "second", &["first"], &[]);
        key(&mut graph, "bystander", &[], &[]);

        let error = graph.sort().expect_err("should detect cycle");
        match error {
            EngineError::CyclicDependency { groups } => assert_eq!(groups, vec!["first", "second"]),
            other => panic!("unexpected error: {other}"),
        }
    }
}
