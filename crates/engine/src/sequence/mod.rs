//! Sequential execution of a set of action classes against a binding store.
//!
//! A [`Sequence`] registers every class as a singleton provider in its own store, sorts the
//! classes' methods once, then invokes the methods one at a time. A method's return value is
//! published under its `binds_return_value_as` key before the next method starts, so later
//! actions observe exactly what earlier ones produced.

use std::{
    sync::{Arc, Weak},
    time::Instant,
};

use actionflow_context::{BindingKey, BindingScope, BoundValue, Context, ContextError, Instance};
use anyhow::anyhow;
use chrono::Utc;
use once_cell::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::{
    arguments::Arguments,
    config::SequenceConfig,
    diagram::render_dot,
    error::EngineError,
    graph::{ActionGraph, SortOptions, sort_actions},
    model::{ActionClass, BoundMethod},
};

mod types;

pub use types::{ActionRun, SequenceReport, SequenceState};

/// An execution session over a fixed set of action classes.
pub struct Sequence {
    config: SequenceConfig,
    classes: Vec<Arc<ActionClass>>,
    context: Arc<Context>,
    graph: OnceCell<ActionGraph>,
    state: SequenceState,
}

impl Sequence {
    /// Create a sequence with default configuration.
    pub fn new(classes: Vec<Arc<ActionClass>>, parent: Option<Arc<Context>>) -> Self {
        Self::with_config(classes, parent, SequenceConfig::default())
    }

    /// Create a sequence. Class singletons are registered immediately; the graph is built on
    /// first use.
    pub fn with_config(classes: Vec<Arc<ActionClass>>, parent: Option<Arc<Context>>, config: SequenceConfig) -> Self {
        let context = match parent {
            Some(parent) => Context::with_parent(config.name.clone(), parent),
            None => Context::new(config.name.clone()),
        };
        let sequence = Self {
            config,
            classes,
            context,
            graph: OnceCell::new(),
            state: SequenceState::Unbuilt,
        };
        sequence.register_classes();
        sequence
    }

    /// The store actions read from and publish into.
    pub fn context(&self) -> &Arc<Context> {
        &self.context
    }

    pub fn classes(&self) -> &[Arc<ActionClass>] {
        &self.classes
    }

    pub fn state(&self) -> SequenceState {
        match self.state {
            SequenceState::Unbuilt if self.graph.get().is_some() => SequenceState::Built,
            state => state,
        }
    }

    /// The sorted graph, computed on first call and cached.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::CyclicDependency`] when the classes' constraints contradict.
    pub fn graph(&self) -> Result<&ActionGraph, EngineError> {
        self.graph.get_or_try_init(|| {
            debug!(sequence = %self.config.name, classes = self.classes.len(), "building action graph");
            sort_actions(
                &self.classes,
                SortOptions {
                    include_classes: true,
                    remove_keys: false,
                },
            )
        })
    }

    /// DOT diagram of the constraint graph.
    pub fn diagram(&self) -> Result<String, EngineError> {
        Ok(render_dot(self.graph()?, &self.config.diagram))
    }

    /// Invoke every method in sorted order, one at a time.
    ///
    /// The first error aborts the run; methods that already ran are not undone.
    pub async fn run(&mut self) -> Result<SequenceReport, EngineError> {
        let methods: Vec<BoundMethod> = self.graph()?.methods().cloned().collect();
        self.state = SequenceState::Running;
        info!(sequence = %self.config.name, actions = methods.len(), "running action sequence");

        let mut report = SequenceReport::default();
        for method in &methods {
            match self.invoke(method).await {
                Ok(run) => report.actions.push(run),
                Err(error) => {
                    self.state = SequenceState::Failed;
                    warn!(sequence = %self.config.name, group = %method.group(), error = %error, "action sequence aborted");
                    return Err(error);
                }
            }
        }

        self.state = SequenceState::Done;
        info!(sequence = %self.config.name, actions = report.actions.len(), "action sequence finished");
        Ok(report)
    }

    /// Clear every local binding and register the class singletons again. The graph is kept.
    pub fn reset(&mut self) {
        self.context.clear();
        self.register_classes();
        self.state = SequenceState::Unbuilt;
        debug!(sequence = %self.config.name, "sequence reset");
    }

    async fn invoke(&self, bound: &BoundMethod) -> Result<ActionRun, EngineError> {
        let method = bound.method();
        let group = method.group.clone();
        let started_at = Utc::now();
        let timer = Instant::now();
        debug!(group = %group, "invoking action");

        let instance = if method.is_static { None } else { Some(self.resolve_instance(bound.class())?) };
        let arguments = Arguments::resolve(&self.context, &method.injections).map_err(|source| EngineError::resolution(&group, source))?;
        let output = method
            .target
            .invoke(instance, arguments)
            .await
            .map_err(|source| EngineError::invocation(&group, source))?;

        let published = match (output, &method.binds_return_value_as) {
            (Some(value), Some(key)) => {
                let key = BindingKey::parse(key).key;
                self.context.bind_value(key.clone(), value);
                debug!(group = %group, key = %key, "published action result");
                Some(key)
            }
            _ => None,
        };

        let duration_ms = u64::try_from(timer.elapsed().as_millis()).unwrap_or(u64::MAX);
        debug!(group = %group, duration_ms, "action finished");
        Ok(ActionRun {
            group,
            started_at,
            duration_ms,
            published,
        })
    }

    fn resolve_instance(&self, class: &ActionClass) -> Result<Instance, EngineError> {
        let key = class.binding_key();
        match self.context.get(&key) {
            Ok(BoundValue::Instance(instance)) => Ok(instance),
            Ok(BoundValue::Value(_)) => Err(EngineError::resolution(&class.group, ContextError::type_mismatch(key, "action instance"))),
            Err(ContextError::Provider { source, .. }) => Err(EngineError::construction(&class.name, source)),
            Err(error) => Err(EngineError::resolution(&class.group, error)),
        }
    }

    fn register_classes(&self) {
        for class in &self.classes {
            let store: Weak<Context> = Arc::downgrade(&self.context);
            let provided = Arc::clone(class);
            self.context.bind_provider(class.binding_key(), BindingScope::Singleton, move |_: &Context| {
                let context = store.upgrade().ok_or_else(|| anyhow!("binding store of '{}' was dropped", provided.name))?;
                let arguments = Arguments::resolve(&context, &provided.injections)?;
                let instance = provided.target.construct(arguments)?;
                Ok(BoundValue::Instance(instance))
            });
        }
    }
}
