//! # Action Metadata Model
//!
//! Passive records describing the units of work a sequence orders and runs.
//!
//! ## Core Concepts
//!
//! - **ActionClass**: a stateful action type. One instance serves every method invocation
//!   within a run.
//! - **ActionMethod**: a single invocable step on an action class (or a static function
//!   grouped under it), with the key its return value is published under.
//! - **BoundMethod**: the read-only pairing of a method with the class it was inspected from.
//! - **Injection**: one declared input, either a plain read or a deferred-write capability.
//!
//! Every record carries a `group`, the label that identifies it inside a constraint graph, and
//! the normalized `fulfills` / `depends_on` key sets produced by
//! [`extract_dependencies`](crate::extract::extract_dependencies).

use std::{
    any::TypeId,
    fmt,
    sync::Arc,
};

use actionflow_context::Instance;
use futures_util::future::BoxFuture;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::arguments::Arguments;

/// Namespace tag prefixed to class groups.
pub const CLASS_GROUP_TAG: &str = "class:";
/// Namespace tag prefixed to static method groups.
pub const STATIC_GROUP_TAG: &str = "static:";
/// Namespace under which action class singletons are bound in a sequence's store.
pub const ACTION_BINDING_NAMESPACE: &str = "actions.";

/// A type that can be declared as an action class.
///
/// `NAME` is the stable identifier used to derive default group labels and the binding key of
/// the class singleton. It must be unique among the classes run together.
pub trait Action: Send + Sync + 'static {
    const NAME: &'static str;
}

/// Default group for a class.
pub fn class_group(class_name: &str) -> String {
    format!("{CLASS_GROUP_TAG}{class_name}")
}

/// Default group for an instance method.
pub fn method_group(class_name: &str, method: &str) -> String {
    format!("{class_name}.{method}")
}

/// Default group for a static method.
pub fn static_method_group(class_name: &str, method: &str) -> String {
    format!("{STATIC_GROUP_TAG}{class_name}.{method}")
}

/// Strip the internal namespace tags from a group for human display.
pub fn display_group(group: &str) -> &str {
    group
        .strip_prefix(CLASS_GROUP_TAG)
        .or_else(|| group.strip_prefix(STATIC_GROUP_TAG))
        .unwrap_or(group)
}

/// How an input is supplied to an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InjectionKind {
    /// The action reads the bound value; the key becomes a dependency.
    Read,
    /// The action receives a [`Setter`](actionflow_context::Setter); the key becomes an output.
    DeferredWrite,
}

/// One declared input of a class constructor or method.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Injection {
    /// Binding key, optionally qualified with `#path`.
    pub key: String,
    /// Read or deferred write.
    pub kind: InjectionKind,
    /// Missing optional reads resolve to nothing instead of failing.
    #[serde(default)]
    pub optional: bool,
}

impl Injection {
    /// A plain read of `key`.
    pub fn read(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            kind: InjectionKind::Read,
            optional: false,
        }
    }

    /// A deferred-write capability for `key`.
    pub fn setter(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            kind: InjectionKind::DeferredWrite,
            optional: false,
        }
    }

    /// Mark the injection optional.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }
}

/// Future returned by an action method. `Ok(None)` means the method produced no value.
pub type ActionFuture = BoxFuture<'static, anyhow::Result<Option<Value>>>;

pub(crate) type ConstructorFn = dyn Fn(Arguments) -> anyhow::Result<Instance> + Send + Sync;
pub(crate) type HandlerFn = dyn Fn(Option<Instance>, Arguments) -> ActionFuture + Send + Sync;

/// Opaque reference to the type an [`ActionClass`] describes.
#[derive(Clone)]
pub struct ClassTarget {
    type_id: TypeId,
    type_name: &'static str,
    constructor: Arc<ConstructorFn>,
}

impl ClassTarget {
    pub(crate) fn new(type_id: TypeId, type_name: &'static str, constructor: Arc<ConstructorFn>) -> Self {
        Self {
            type_id,
            type_name,
            constructor,
        }
    }

    /// Identity of the described type.
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Rust type name, for diagnostics only.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub(crate) fn construct(&self, arguments: Arguments) -> anyhow::Result<Instance> {
        (self.constructor)(arguments)
    }
}

impl PartialEq for ClassTarget {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id && Arc::ptr_eq(&self.constructor, &other.constructor)
    }
}

impl fmt::Debug for ClassTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassTarget").field("type_name", &self.type_name).finish_non_exhaustive()
    }
}

/// Opaque reference to the function an [`ActionMethod`] describes.
#[derive(Clone)]
pub struct MethodTarget {
    handler: Arc<HandlerFn>,
}

impl MethodTarget {
    pub(crate) fn new(handler: Arc<HandlerFn>) -> Self {
        Self { handler }
    }

    pub(crate) fn invoke(&self, instance: Option<Instance>, arguments: Arguments) -> ActionFuture {
        (self.handler)(instance, arguments)
    }
}

impl PartialEq for MethodTarget {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.handler, &other.handler)
    }
}

impl fmt::Debug for MethodTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodTarget").finish_non_exhaustive()
    }
}

/// Metadata for an action class.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionClass {
    /// Unique label of the class within a graph.
    pub group: String,
    /// Stable class name ([`Action::NAME`]).
    pub name: String,
    /// Keys the class is responsible for producing.
    pub fulfills: IndexSet<String>,
    /// Keys the class requires before it can run.
    pub depends_on: IndexSet<String>,
    /// Constructor inputs.
    pub injections: Vec<Injection>,
    /// Method records keyed by method name, in declaration order.
    pub methods: IndexMap<String, ActionMethod>,
    /// The described type.
    pub target: ClassTarget,
}

impl ActionClass {
    /// Key the class singleton is bound under in a sequence's store.
    pub fn binding_key(&self) -> String {
        format!("{ACTION_BINDING_NAMESPACE}{}", self.name)
    }

    /// Pair every method with this class instance.
    pub fn bound_methods(self: &Arc<Self>) -> Vec<BoundMethod> {
        self.methods
            .values()
            .map(|method| BoundMethod::new(Arc::clone(self), method.clone()))
            .collect()
    }

    /// Pair a single method with this class instance.
    pub fn bound_method(self: &Arc<Self>, method: &str) -> Option<BoundMethod> {
        self.methods
            .get(method)
            .map(|record| BoundMethod::new(Arc::clone(self), record.clone()))
    }
}

/// Metadata for a single action method.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionMethod {
    /// Unique label of the method within a graph.
    pub group: String,
    /// Method name.
    pub method: String,
    /// Static methods run without resolving the class instance.
    pub is_static: bool,
    /// Key the return value is published under, when the method returns one.
    pub binds_return_value_as: Option<String>,
    /// Keys the method is responsible for producing.
    pub fulfills: IndexSet<String>,
    /// Keys the method requires before it can run.
    pub depends_on: IndexSet<String>,
    /// Method inputs.
    pub injections: Vec<Injection>,
    /// The described function.
    pub target: MethodTarget,
}

/// A method paired with the class it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundMethod {
    class: Arc<ActionClass>,
    method: ActionMethod,
}

impl BoundMethod {
    pub fn new(class: Arc<ActionClass>, method: ActionMethod) -> Self {
        Self { class, method }
    }

    /// The owning class.
    pub fn class(&self) -> &Arc<ActionClass> {
        &self.class
    }

    /// The method record.
    pub fn method(&self) -> &ActionMethod {
        &self.method
    }

    pub fn group(&self) -> &str {
        &self.method.group
    }
}
