//! # Actionflow Engine
//!
//! Orders and runs the actions of a request pipeline. Each action declares the data keys it
//! requires and the keys it produces; the engine derives a deterministic execution order from
//! those declarations and runs the actions one after another against a shared binding store,
//! publishing each action's result for the actions that follow.
//!
//! ## Key Features
//!
//! - **Dependency Extraction**: Inputs read from the store become dependencies, deferred-write
//!   capabilities become outputs
//! - **Constraint Sorting**: Stable topological sort over actions and placeholder key nodes
//! - **Sequential Execution**: One action at a time, results published before the next starts
//! - **Diagnostics**: DOT rendering of the constraint graph
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use actionflow_engine::{Action, ActionClass, ActionMethod, Injection, MetadataRegistry, Sequence};
//! use serde_json::json;
//!
//! #[derive(Default)]
//! struct Tracing;
//! impl Action for Tracing {
//!     const NAME: &'static str = "Tracing";
//! }
//!
//! #[derive(Default)]
//! struct Greeter;
//! impl Action for Greeter {
//!     const NAME: &'static str = "Greeter";
//! }
//!
//! let registry = MetadataRegistry::new();
//! ActionClass::define::<Greeter>()
//!     .construct_default()
//!     .method(
//!         ActionMethod::instance::<Greeter, _, _>("greet", |_this: Arc<Greeter>, args| async move {
//!             let trace = args.value("tracingId")?.clone();
//!             Ok(Some(json!({ "hello": trace })))
//!         })
//!         .inject(Injection::read("tracingId"))
//!         .binds_return_value_as("greeting"),
//!     )
//!     .register(&registry);
//! ActionClass::define::<Tracing>()
//!     .construct_default()
//!     .method(
//!         ActionMethod::instance::<Tracing, _, _>("trace", |_this: Arc<Tracing>, _args| async move { Ok(Some(json!("t-1"))) })
//!             .binds_return_value_as("tracingId"),
//!     )
//!     .register(&registry);
//!
//! let classes = vec![registry.inspect::<Greeter>()?, registry.inspect::<Tracing>()?];
//! let mut sequence = Sequence::new(classes, None);
//! let runtime = tokio::runtime::Builder::new_current_thread().build()?;
//! let report = runtime.block_on(sequence.run())?;
//!
//! assert_eq!(report.groups(), ["Tracing.trace", "Greeter.greet"]);
//! assert_eq!(sequence.context().get_value("greeting")?, json!({ "hello": "t-1" }));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! - **`model`**: Action metadata records and group naming
//! - **`extract`**: Derivation of `depends_on` / `fulfills` from declared inputs
//! - **`definition`** / **`registry`**: Explicit declaration and capture of metadata
//! - **`graph`**: Constraint graph construction and the topological sequencer
//! - **`sequence`**: The execution session and its state machine
//! - **`diagram`**: DOT output for diagnostics
//! - **`config`**: YAML/JSON configuration

pub mod arguments;
pub mod config;
pub mod definition;
pub mod diagram;
pub mod error;
pub mod extract;
pub mod graph;
pub mod model;
pub mod registry;
pub mod sequence;

// Re-export commonly used types for convenience
pub use actionflow_context::{BindingKey, BindingScope, BoundValue, Context, ContextError, Setter};
pub use arguments::{Argument, Arguments};
pub use config::{SequenceConfig, load_sequence_config};
pub use definition::{ActionClassBuilder, ClassDefinition, MethodDefinition};
pub use diagram::{DiagramStyle, NodeStyle, render_dot};
pub use error::EngineError;
pub use extract::{DependencySets, extract_dependencies, normalize_keys};
pub use graph::{
    ActionGraph, ConstraintGraph, ConstraintNode, GraphNode, SortOptions, add_action_to_graph, sort_action_classes, sort_actions,
};
pub use model::{
    Action, ActionClass, ActionFuture, ActionMethod, BoundMethod, ClassTarget, Injection, InjectionKind, MethodTarget, class_group,
    display_group, method_group, static_method_group,
};
pub use registry::{ActionRecord, MetadataRegistry, RecordKind};
pub use sequence::{ActionRun, Sequence, SequenceReport, SequenceState};
