//! Builders for declaring action classes and methods.
//!
//! Declaring an action is an explicit registration step: build a [`ClassDefinition`] with
//! [`ActionClass::define`] (adding methods declared through [`ActionMethod::instance`] or
//! [`ActionMethod::static_fn`]) and hand it to a [`MetadataRegistry`].
//!
//! ```rust
//! use std::sync::Arc;
//! use actionflow_engine::{ActionClass, ActionMethod, Action, MetadataRegistry};
//! use serde_json::json;
//!
//! #[derive(Default)]
//! struct Tracing;
//!
//! impl Action for Tracing {
//!     const NAME: &'static str = "Tracing";
//! }
//!
//! let registry = MetadataRegistry::new();
//! ActionClass::define::<Tracing>()
//!     .construct_default()
//!     .method(
//!         ActionMethod::instance::<Tracing, _, _>("trace", |_this: Arc<Tracing>, _args| async move {
//!             Ok(Some(json!("trace-1")))
//!         })
//!         .binds_return_value_as("tracingId"),
//!     )
//!     .register(&registry);
//!
//! let class = registry.inspect::<Tracing>()?;
//! assert_eq!(class.group, "class:Tracing");
//! assert!(class.methods["trace"].fulfills.contains("tracingId"));
//! # Ok::<(), actionflow_engine::EngineError>(())
//! ```

use std::{
    any::{TypeId, type_name},
    future::Future,
    marker::PhantomData,
    sync::Arc,
};

use actionflow_context::Instance;
use anyhow::anyhow;
use futures_util::FutureExt;
use serde_json::Value;

use crate::{
    arguments::Arguments,
    model::{Action, ActionClass, ActionMethod, ConstructorFn, HandlerFn, Injection},
    registry::MetadataRegistry,
};

/// Declaration of an action class, prior to registration.
pub struct ClassDefinition {
    pub(crate) type_id: TypeId,
    pub(crate) type_name: &'static str,
    pub(crate) name: &'static str,
    pub(crate) group: Option<String>,
    pub(crate) fulfills: Vec<String>,
    pub(crate) depends_on: Vec<String>,
    pub(crate) injections: Vec<Injection>,
    pub(crate) constructor: Arc<ConstructorFn>,
    pub(crate) methods: Vec<MethodDefinition>,
}

/// Declaration of an action method, prior to registration.
pub struct MethodDefinition {
    pub(crate) class_type: TypeId,
    pub(crate) class_name: &'static str,
    pub(crate) method: String,
    pub(crate) is_static: bool,
    pub(crate) group: Option<String>,
    pub(crate) binds_return_value_as: Option<String>,
    pub(crate) fulfills: Vec<String>,
    pub(crate) depends_on: Vec<String>,
    pub(crate) injections: Vec<Injection>,
    pub(crate) handler: Arc<HandlerFn>,
}

/// Fluent builder for a [`ClassDefinition`].
pub struct ActionClassBuilder<T> {
    definition: ClassDefinition,
    _marker: PhantomData<fn() -> T>,
}

impl ActionClass {
    /// Start declaring the action class `T`.
    pub fn define<T: Action>() -> ActionClassBuilder<T> {
        let constructor: Arc<ConstructorFn> =
            Arc::new(|_: Arguments| Err::<Instance, _>(anyhow!("action class '{}' declares no constructor", T::NAME)));
        ActionClassBuilder {
            definition: ClassDefinition {
                type_id: TypeId::of::<T>(),
                type_name: type_name::<T>(),
                name: T::NAME,
                group: None,
                fulfills: Vec::new(),
                depends_on: Vec::new(),
                injections: Vec::new(),
                constructor,
                methods: Vec::new(),
            },
            _marker: PhantomData,
        }
    }
}

impl<T: Action> ActionClassBuilder<T> {
    /// Override the default `class:<NAME>` group.
    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.definition.group = Some(group.into());
        self
    }

    /// Declare keys the class produces.
    pub fn fulfills<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.definition.fulfills.extend(keys.into_iter().map(Into::into));
        self
    }

    /// Declare keys the class requires.
    pub fn depends_on<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.definition.depends_on.extend(keys.into_iter().map(Into::into));
        self
    }

    /// Declare a constructor input.
    pub fn inject(mut self, injection: Injection) -> Self {
        self.definition.injections.push(injection);
        self
    }

    /// Constructor invoked once per sequence (the instance is a singleton binding).
    pub fn construct<F>(mut self, constructor: F) -> Self
    where
        F: Fn(Arguments) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        self.definition.constructor =
            Arc::new(move |arguments: Arguments| constructor(arguments).map(|instance| Arc::new(instance) as Instance));
        self
    }

    /// Construct instances with `T::default()`.
    pub fn construct_default(self) -> Self
    where
        T: Default,
    {
        self.construct(|_| Ok(T::default()))
    }

    /// Add a method.
    pub fn method(mut self, method: MethodDefinition) -> Self {
        self.definition.methods.push(method);
        self
    }

    /// Finish without registering.
    pub fn build(self) -> ClassDefinition {
        self.definition
    }

    /// Register the class and all of its methods.
    pub fn register(self, registry: &MetadataRegistry) {
        registry.register_class(self.definition);
    }
}

impl ActionMethod {
    /// Declare an instance method of `T`. The handler receives the class singleton.
    pub fn instance<T, F, Fut>(method: impl Into<String>, handler: F) -> MethodDefinition
    where
        T: Action,
        F: Fn(Arc<T>, Arguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Option<Value>>> + Send + 'static,
    {
        let handler: Arc<HandlerFn> = Arc::new(move |instance: Option<Instance>, arguments: Arguments| {
            match instance.map(|instance| instance.downcast::<T>()) {
                Some(Ok(this)) => handler(this, arguments).boxed(),
                Some(Err(_)) | None => async { Err::<Option<Value>, _>(anyhow!("no '{}' instance available", T::NAME)) }.boxed(),
            }
        });
        MethodDefinition::new::<T>(method.into(), false, handler)
    }

    /// Declare a static method grouped under `T`. No instance is resolved to run it.
    pub fn static_fn<T, F, Fut>(method: impl Into<String>, handler: F) -> MethodDefinition
    where
        T: Action,
        F: Fn(Arguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Option<Value>>> + Send + 'static,
    {
        let handler: Arc<HandlerFn> = Arc::new(move |_instance: Option<Instance>, arguments: Arguments| handler(arguments).boxed());
        MethodDefinition::new::<T>(method.into(), true, handler)
    }
}

impl MethodDefinition {
    fn new<T: Action>(method: String, is_static: bool, handler: Arc<HandlerFn>) -> Self {
        Self {
            class_type: TypeId::of::<T>(),
            class_name: T::NAME,
            method,
            is_static,
            group: None,
            binds_return_value_as: None,
            fulfills: Vec::new(),
            depends_on: Vec::new(),
            injections: Vec::new(),
            handler,
        }
    }

    /// Override the default method group.
    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Publish the method's return value under `key`.
    pub fn binds_return_value_as(mut self, key: impl Into<String>) -> Self {
        self.binds_return_value_as = Some(key.into());
        self
    }

    pub fn fulfills<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fulfills.extend(keys.into_iter().map(Into::into));
        self
    }

    pub fn depends_on<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends_on.extend(keys.into_iter().map(Into::into));
        self
    }

    /// Declare a method input.
    pub fn inject(mut self, injection: Injection) -> Self {
        self.injections.push(injection);
        self
    }

    /// Name of the declared method.
    pub fn method_name(&self) -> &str {
        &self.method
    }
}
