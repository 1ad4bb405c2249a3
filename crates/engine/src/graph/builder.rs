//! Population of a [`ConstraintGraph`] from action metadata.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::EngineError,
    graph::{ActionGraph, ConstraintGraph, GraphNode},
    model::ActionClass,
};

/// How [`sort_actions`] populates and filters the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SortOptions {
    /// Add a node per class and make each of its methods sort after it.
    pub include_classes: bool,
    /// Drop key nodes from the returned order.
    pub remove_keys: bool,
}

impl Default for SortOptions {
    fn default() -> Self {
        Self {
            include_classes: true,
            remove_keys: false,
        }
    }
}

/// Add `node` to `graph`, inserting a key node for every fulfilled or required key that no
/// node is known by yet. The action node precedes its outputs and follows its inputs.
pub fn add_action_to_graph<'a, F, D>(graph: &mut ConstraintGraph, node: GraphNode, fulfills: F, depends_on: D)
where
    F: IntoIterator<Item = &'a String>,
    D: IntoIterator<Item = &'a String>,
{
    let before: Vec<String> = fulfills.into_iter().cloned().collect();
    let after: Vec<String> = depends_on.into_iter().cloned().collect();

    for key in before.iter().chain(after.iter()) {
        if !graph.contains_group(key) {
            graph.add(GraphNode::Key(key.clone()), Vec::new(), Vec::new());
        }
    }
    graph.add(node, before, after);
}

/// Order whole classes using class-level constraints only.
pub fn sort_action_classes(classes: &[Arc<ActionClass>], remove_keys: bool) -> Result<ActionGraph, EngineError> {
    let mut graph = ConstraintGraph::new();
    for class in classes {
        add_action_to_graph(&mut graph, GraphNode::Class(Arc::clone(class)), &class.fulfills, &class.depends_on);
    }
    finish(graph, remove_keys)
}

/// Order the methods of `classes`, optionally preceded by their class nodes.
pub fn sort_actions(classes: &[Arc<ActionClass>], options: SortOptions) -> Result<ActionGraph, EngineError> {
    let mut graph = ConstraintGraph::new();
    for class in classes {
        if options.include_classes {
            add_action_to_graph(&mut graph, GraphNode::Class(Arc::clone(class)), &class.fulfills, &class.depends_on);
        }
        for bound in class.bound_methods() {
            let method = bound.method();
            let fulfills = method.fulfills.clone();
            let mut depends_on: Vec<String> = method.depends_on.iter().cloned().collect();
            if options.include_classes {
                depends_on.push(class.group.clone());
            }
            add_action_to_graph(&mut graph, GraphNode::Method(bound), &fulfills, &depends_on);
        }
    }
    finish(graph, options.remove_keys)
}

fn finish(graph: ConstraintGraph, remove_keys: bool) -> Result<ActionGraph, EngineError> {
    let order = graph.sort()?;
    let actions: Vec<GraphNode> = order
        .into_iter()
        .map(|index| graph.nodes()[index].node.clone())
        .filter(|node| !remove_keys || node.is_action())
        .collect();
    debug!(nodes = graph.len(), ordered = actions.len(), remove_keys, "sorted constraint graph");
    Ok(ActionGraph { actions, graph })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        model::{Action, ActionMethod, Injection},
        registry::MetadataRegistry,
    };

    #[derive(Default)]
    struct Tracing;
    impl Action for Tracing {
        const NAME: &'static str = "Tracing";
    }

    #[derive(Default)]
    struct Invoker;
    impl Action for Invoker {
        const NAME: &'static str = "Invoker";
    }

    #[derive(Default)]
    struct Logger;
    impl Action for Logger {
        const NAME: &'static str = "Logger";
    }

    #[derive(Default)]
    struct Left;
    impl Action for Left {
        const NAME: &'static str = "Left";
    }

    #[derive(Default)]
    struct Right;
    impl Action for Right {
        const NAME: &'static str = "Right";
    }

    fn pipeline() -> Vec<Arc<ActionClass>> {
        let registry = MetadataRegistry::new();
        ActionClass::define::<Logger>()
            .construct_default()
            .depends_on(["invocation"])
            .method(ActionMethod::instance::<Logger, _, _>("log", |_this, _| async { Ok(None) }).inject(Injection::read("result")))
            .register(&registry);
        ActionClass::define::<Invoker>()
            .construct_default()
            .depends_on(["tracingId"])
            .fulfills(["invocation", "result"])
            .method(
                ActionMethod::instance::<Invoker, _, _>("invoke", |_this, _| async { Ok(None) })
                    .inject(Injection::read("tracingId"))
                    .binds_return_value_as("result"),
            )
            .register(&registry);
        ActionClass::define::<Tracing>()
            .construct_default()
            .fulfills(["tracingId"])
            .method(ActionMethod::instance::<Tracing, _, _>("trace", |_this, _| async { Ok(None) }).binds_return_value_as("tracingId"))
            .register(&registry);

        // Declared in reverse so the order comes from constraints alone.
        vec![
            registry.inspect::<Logger>().unwrap(),
            registry.inspect::<Invoker>().unwrap(),
            registry.inspect::<Tracing>().unwrap(),
        ]
    }

    fn position(groups: &[&str], group: &str) -> usize {
        groups.iter().position(|candidate| *candidate == group).unwrap_or_else(|| panic!("{group} missing from {groups:?}"))
    }

    #[test]
    fn adds_key_nodes_once_by_group() {
        let classes = pipeline();
        let mut graph = ConstraintGraph::new();
        for class in &classes {
            add_action_to_graph(&mut graph, GraphNode::Class(Arc::clone(class)), &class.fulfills, &class.depends_on);
        }

        let groups: Vec<&str> = graph.nodes().iter().map(|node| node.group.as_str()).collect();
        assert_eq!(
            groups,
            ["invocation", "class:Logger", "result", "tracingId", "class:Invoker", "class:Tracing"]
        );
        let invoker = &graph.nodes()[4];
        assert_eq!(invoker.before, ["invocation", "result"]);
        assert_eq!(invoker.after, ["tracingId"]);
    }

    #[test]
    fn orders_pipeline_classes_by_data_flow() {
        let graph = sort_action_classes(&pipeline(), true).unwrap();
        assert_eq!(graph.groups(), ["class:Tracing", "class:Invoker", "class:Logger"]);
    }

    #[test]
    fn orders_methods_after_their_classes() {
        let graph = sort_actions(&pipeline(), SortOptions { include_classes: true, remove_keys: true }).unwrap();
        let groups = graph.groups();

        assert!(position(&groups, "class:Tracing") < position(&groups, "Tracing.trace"));
        assert!(position(&groups, "Tracing.trace") < position(&groups, "class:Invoker"));
        assert!(position(&groups, "class:Invoker") < position(&groups, "Invoker.invoke"));
        assert!(position(&groups, "Invoker.invoke") < position(&groups, "Logger.log"));
        assert!(position(&groups, "class:Invoker") < position(&groups, "class:Logger"));
        assert!(position(&groups, "class:Logger") < position(&groups, "Logger.log"));
        assert_eq!(graph.methods().count(), 3);
    }

    #[test]
    fn method_only_mode_skips_class_nodes() {
        let graph = sort_actions(&pipeline(), SortOptions { include_classes: false, remove_keys: true }).unwrap();
        assert_eq!(graph.groups(), ["Tracing.trace", "Invoker.invoke", "Logger.log"]);
    }

    #[test]
    fn sorting_is_deterministic() {
        let classes = pipeline();
        let first = sort_actions(&classes, SortOptions::default()).unwrap();
        let second = sort_actions(&classes, SortOptions::default()).unwrap();
        assert_eq!(first.groups(), second.groups());
    }

    #[test]
    fn every_constraint_holds_in_the_full_order() {
        let graph = sort_actions(&pipeline(), SortOptions::default()).unwrap();
        let groups = graph.groups();
        for node in graph.graph.nodes() {
            let own = position(&groups, &node.group);
            for target in &node.before {
                assert!(own < position(&groups, target), "{} must precede {target}", node.group);
            }
            for target in &node.after {
                assert!(own > position(&groups, target), "{} must follow {target}", node.group);
            }
        }
    }

    #[test]
    fn filtered_order_is_a_subsequence_of_the_full_order() {
        let classes = pipeline();
        let full = sort_actions(&classes, SortOptions { include_classes: true, remove_keys: false }).unwrap();
        let filtered = sort_actions(&classes, SortOptions { include_classes: true, remove_keys: true }).unwrap();

        let expected: Vec<&str> = full.actions.iter().filter(|node| node.is_action()).map(GraphNode::group).collect();
        assert_eq!(filtered.groups(), expected);
    }

    #[test]
    fn contradictory_data_flow_is_a_cycle() {
        let registry = MetadataRegistry::new();
        ActionClass::define::<Left>().fulfills(["x"]).depends_on(["y"]).register(&registry);
        ActionClass::define::<Right>().fulfills(["y"]).depends_on(["x"]).register(&registry);
        let classes = vec![registry.inspect::<Left>().unwrap(), registry.inspect::<Right>().unwrap()];

        let error = sort_action_classes(&classes, false).unwrap_err();
        assert!(error.is_configuration_error());
        match error {
            EngineError::CyclicDependency { groups } => {
                assert!(groups.contains(&"class:Left".to_string()));
                assert!(groups.contains(&"class:Right".to_string()));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
