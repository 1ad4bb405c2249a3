//! The binding store.

use std::{
    any::Any,
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Notify;
use tracing::{debug, trace};

use crate::{
    error::ContextError,
    key::{BindingKey, select_path},
    setter::Setter,
};

/// Type-erased, shareable instance held by a binding.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Factory invoked to produce a binding's value on lookup.
pub type Provider = Arc<dyn Fn(&Context) -> anyhow::Result<BoundValue> + Send + Sync>;

/// A value held by the store: either published JSON data or an object instance.
#[derive(Clone)]
pub enum BoundValue {
    /// JSON data published by an action or seeded by a caller.
    Value(Value),
    /// An object instance, typically an action class singleton.
    Instance(Instance),
}

impl BoundValue {
    /// Returns the JSON value, if this binding holds one.
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Value(value) => Some(value),
            Self::Instance(_) => None,
        }
    }
}

impl fmt::Debug for BoundValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Instance(_) => f.write_str("Instance(..)"),
        }
    }
}

impl From<Value> for BoundValue {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

/// Lifetime of a provider-backed binding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BindingScope {
    /// The provider runs on every lookup.
    #[default]
    Transient,
    /// The provider runs once; the result is cached until the store is cleared.
    Singleton,
}

enum Source {
    Constant(BoundValue),
    Provider(Provider),
}

struct Binding {
    source: Source,
    scope: BindingScope,
    cached: Option<BoundValue>,
}

/// Named key/value store with an optional parent.
///
/// Bindings are kept in insertion order. Lookups resolve locally first and then walk the
/// parent chain. Publishing a binding wakes every task waiting in [`Context::get_async`].
pub struct Context {
    name: String,
    parent: Option<Arc<Context>>,
    bindings: Mutex<IndexMap<String, Binding>>,
    bound: Notify,
}

impl Context {
    /// Create a root store.
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self::build(name.into(), None))
    }

    /// Create a store that falls back to `parent` for keys it does not bind itself.
    pub fn with_parent(name: impl Into<String>, parent: Arc<Context>) -> Arc<Self> {
        Arc::new(Self::build(name.into(), Some(parent)))
    }

    fn build(name: String, parent: Option<Arc<Context>>) -> Self {
        Self {
            name,
            parent,
            bindings: Mutex::new(IndexMap::new()),
            bound: Notify::new(),
        }
    }

    /// The store's name, used in diagnostics.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The parent store, if any.
    pub fn parent(&self) -> Option<&Arc<Context>> {
        self.parent.as_ref()
    }

    /// Bind a constant JSON value, replacing any existing binding for the key.
    pub fn bind_value(&self, key: impl Into<String>, value: Value) {
        self.insert(key.into(), Source::Constant(BoundValue::Value(value)), BindingScope::Transient);
    }

    /// Bind a constant instance.
    pub fn bind_instance(&self, key: impl Into<String>, instance: Instance) {
        self.insert(key.into(), Source::Constant(BoundValue::Instance(instance)), BindingScope::Transient);
    }

    /// Bind a provider with the given scope.
    pub fn bind_provider<F>(&self, key: impl Into<String>, scope: BindingScope, provider: F)
    where
        F: Fn(&Context) -> anyhow::Result<BoundValue> + Send + Sync + 'static,
    {
        self.insert(key.into(), Source::Provider(Arc::new(provider)), scope);
    }

    fn insert(&self, key: String, source: Source, scope: BindingScope) {
        let replaced = {
            let mut bindings = self.lock();
            bindings
                .insert(
                    key.clone(),
                    Binding {
                        source,
                        scope,
                        cached: None,
                    },
                )
                .is_some()
        };
        debug!(context = %self.name, key = %key, ?scope, replaced, "binding published");
        self.bound.notify_waiters();
    }

    /// Returns `true` when the key (path ignored) is bound here or in a parent.
    pub fn contains(&self, key: &str) -> bool {
        let binding_key = BindingKey::parse(key);
        self.contains_key(&binding_key.key)
    }

    fn contains_key(&self, key: &str) -> bool {
        self.lock().contains_key(key) || self.parent.as_ref().is_some_and(|parent| parent.contains_key(key))
    }

    /// Keys bound locally, in binding order.
    pub fn keys(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    /// Remove every local binding. The parent is left untouched.
    pub fn clear(&self) {
        let removed = {
            let mut bindings = self.lock();
            let removed = bindings.len();
            bindings.clear();
            removed
        };
        debug!(context = %self.name, removed, "bindings cleared");
    }

    /// Resolve a key synchronously. `key#path` selects into a JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`ContextError::NotFound`] when neither this store nor a parent binds the key,
    /// [`ContextError::PathNotFound`] when the path does not exist in the value, and
    /// [`ContextError::Provider`] when a provider fails.
    pub fn get(&self, key: &str) -> Result<BoundValue, ContextError> {
        let binding_key = BindingKey::parse(key);
        let value = self
            .resolve(&binding_key.key)?
            .ok_or_else(|| ContextError::not_found(binding_key.key.as_str(), self.name.as_str()))?;
        apply_path(&binding_key, value)
    }

    /// Resolve a key, returning `Ok(None)` instead of a not-found error.
    pub fn get_optional(&self, key: &str) -> Result<Option<BoundValue>, ContextError> {
        match self.get(key) {
            Ok(value) => Ok(Some(value)),
            Err(ContextError::NotFound { .. }) => Ok(None),
            Err(error) => Err(error),
        }
    }

    /// Resolve a key that must hold JSON data.
    pub fn get_value(&self, key: &str) -> Result<Value, ContextError> {
        match self.get(key)? {
            BoundValue::Value(value) => Ok(value),
            BoundValue::Instance(_) => Err(ContextError::type_mismatch(key, "value")),
        }
    }

    /// Resolve a key that must hold an instance.
    pub fn get_instance(&self, key: &str) -> Result<Instance, ContextError> {
        match self.get(key)? {
            BoundValue::Instance(instance) => Ok(instance),
            BoundValue::Value(_) => Err(ContextError::type_mismatch(key, "instance")),
        }
    }

    /// Resolve an instance and downcast it to `T`.
    pub fn get_typed<T: Any + Send + Sync>(&self, key: &str) -> Result<Arc<T>, ContextError> {
        self.get_instance(key)?
            .downcast::<T>()
            .map_err(|_| ContextError::type_mismatch(key, std::any::type_name::<T>()))
    }

    /// Resolve a key, waiting until it is published if it is not bound yet.
    ///
    /// Only publications into this store wake the waiter; keys already bound in a parent
    /// resolve immediately.
    pub async fn get_async(&self, key: &str) -> Result<BoundValue, ContextError> {
        let binding_key = BindingKey::parse(key);
        loop {
            let notified = self.bound.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.contains_key(&binding_key.key) {
                return self.get(key);
            }
            trace!(context = %self.name, key = %binding_key.key, "waiting for binding");
            notified.await;
        }
    }

    /// Create a deferred-write capability for `key` (any path qualifier is dropped).
    pub fn setter(self: &Arc<Self>, key: &str) -> Setter {
        Setter::new(BindingKey::parse(key).key, Arc::clone(self))
    }

    fn resolve(&self, key: &str) -> Result<Option<BoundValue>, ContextError> {
        match self.resolve_local(key)? {
            Some(value) => Ok(Some(value)),
            None => match &self.parent {
                Some(parent) => parent.resolve(key),
                None => Ok(None),
            },
        }
    }

    fn resolve_local(&self, key: &str) -> Result<Option<BoundValue>, ContextError> {
        // Providers may resolve other keys, so they run without the lock held.
        let (provider, scope) = {
            let bindings = self.lock();
            let Some(binding) = bindings.get(key) else {
                return Ok(None);
            };
            match (&binding.source, &binding.cached) {
                (Source::Constant(value), _) => return Ok(Some(value.clone())),
                (Source::Provider(_), Some(cached)) => return Ok(Some(cached.clone())),
                (Source::Provider(provider), None) => (Arc::clone(provider), binding.scope),
            }
        };

        trace!(context = %self.name, key = %key, ?scope, "invoking provider");
        let value = provider(self).map_err(|source| ContextError::provider(key, source))?;

        if scope == BindingScope::Singleton {
            let mut bindings = self.lock();
            if let Some(binding) = bindings.get_mut(key) {
                match &binding.cached {
                    Some(existing) => return Ok(Some(existing.clone())),
                    None => binding.cached = Some(value.clone()),
                }
            }
        }
        Ok(Some(value))
    }

    fn lock(&self) -> MutexGuard<'_, IndexMap<String, Binding>> {
        self.bindings.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("name", &self.name)
            .field("keys", &self.keys())
            .field("parent", &self.parent.as_ref().map(|parent| parent.name()))
            .finish()
    }
}

fn apply_path(binding_key: &BindingKey, value: BoundValue) -> Result<BoundValue, ContextError> {
    let Some(path) = &binding_key.path else {
        return Ok(value);
    };
    match value {
        BoundValue::Value(value) => select_path(&value, path)
            .map(BoundValue::Value)
            .ok_or_else(|| ContextError::path_not_found(binding_key.key.as_str(), path.as_str())),
        BoundValue::Instance(_) => Err(ContextError::type_mismatch(binding_key.key.as_str(), "value")),
    }
}
