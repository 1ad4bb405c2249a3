//! Resolved inputs handed to action constructors and methods.

use std::{any::Any, sync::Arc};

use actionflow_context::{BoundValue, Context, ContextError, Instance, Setter};
use anyhow::{Result, anyhow};
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::model::{Injection, InjectionKind};

/// One resolved input.
#[derive(Debug, Clone)]
pub enum Argument {
    /// A JSON value read from the store.
    Value(Value),
    /// An instance read from the store.
    Instance(Instance),
    /// A deferred-write capability.
    Setter(Setter),
    /// An optional read whose key was not bound.
    Missing,
}

/// Inputs of a single invocation, keyed by the injection key as declared (including any
/// `#path` qualifier).
#[derive(Debug, Clone, Default)]
pub struct Arguments {
    entries: IndexMap<String, Argument>,
}

impl Arguments {
    /// Resolve `injections` against `context`, in declaration order.
    ///
    /// Reads are looked up synchronously: a key nobody has published yet fails here with
    /// [`ContextError::NotFound`] unless the injection is optional.
    pub fn resolve(context: &Arc<Context>, injections: &[Injection]) -> Result<Self, ContextError> {
        let mut entries = IndexMap::with_capacity(injections.len());
        for injection in injections {
            let argument = match injection.kind {
                InjectionKind::DeferredWrite => Argument::Setter(context.setter(&injection.key)),
                InjectionKind::Read if injection.optional => match context.get_optional(&injection.key)? {
                    Some(bound) => Argument::from(bound),
                    None => Argument::Missing,
                },
                InjectionKind::Read => Argument::from(context.get(&injection.key)?),
            };
            entries.insert(injection.key.clone(), argument);
        }
        Ok(Self { entries })
    }

    /// Add or replace an argument.
    pub fn insert(&mut self, key: impl Into<String>, argument: Argument) {
        self.entries.insert(key.into(), argument);
    }

    pub fn get(&self, key: &str) -> Option<&Argument> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The JSON value read for `key`.
    pub fn value(&self, key: &str) -> Result<&Value> {
        match self.entries.get(key) {
            Some(Argument::Value(value)) => Ok(value),
            Some(Argument::Missing) | None => Err(anyhow!("argument '{key}' was not supplied")),
            Some(_) => Err(anyhow!("argument '{key}' is not a value")),
        }
    }

    /// The JSON value read for `key`, if it was supplied.
    pub fn optional_value(&self, key: &str) -> Option<&Value> {
        match self.entries.get(key) {
            Some(Argument::Value(value)) => Some(value),
            _ => None,
        }
    }

    /// Deserialize the value read for `key`.
    pub fn value_as<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let value = self.value(key)?;
        serde_json::from_value(value.clone()).map_err(|error| anyhow!("argument '{key}' has an unexpected shape: {error}"))
    }

    /// The instance read for `key`, downcast to `T`.
    pub fn instance<T: Any + Send + Sync>(&self, key: &str) -> Result<Arc<T>> {
        match self.entries.get(key) {
            Some(Argument::Instance(instance)) => Arc::clone(instance)
                .downcast::<T>()
                .map_err(|_: Instance| anyhow!("argument '{key}' is not a {}", std::any::type_name::<T>())),
            Some(_) => Err(anyhow!("argument '{key}' is not an instance")),
            None => Err(anyhow!("argument '{key}' was not supplied")),
        }
    }

    /// The deferred-write capability for `key`.
    pub fn setter(&self, key: &str) -> Result<Setter> {
        match self.entries.get(key) {
            Some(Argument::Setter(setter)) => Ok(setter.clone()),
            Some(_) => Err(anyhow!("argument '{key}' is not a setter")),
            None => Err(anyhow!("argument '{key}' was not supplied")),
        }
    }
}

impl From<BoundValue> for Argument {
    fn from(bound: BoundValue) -> Self {
        match bound {
            BoundValue::Value(value) => Self::Value(value),
            BoundValue::Instance(instance) => Self::Instance(instance),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resolves_reads_setters_and_optional_inputs() {
        let context = Context::new("test");
        context.bind_value("request", json!({"path": "/orders"}));

        let injections = vec![
            Injection::read("request#path"),
            Injection::setter("result"),
            Injection::read("user").optional(),
        ];
        let arguments = Arguments::resolve(&context, &injections).unwrap();

        assert_eq!(arguments.value("request#path").unwrap(), &json!("/orders"));
        assert!(arguments.optional_value("user").is_none());
        arguments.setter("result").unwrap().set(json!(42));
        assert_eq!(context.get_value("result").unwrap(), json!(42));
    }

    #[test]
    fn missing_required_read_is_a_lookup_failure() {
        let context = Context::new("test");
        let error = Arguments::resolve(&context, &[Injection::read("tracingId")]).unwrap_err();
        assert!(error.is_not_found(), "unexpected error: {error}");
    }

    #[test]
    fn typed_accessors_reject_the_wrong_argument_kind() {
        let context = Context::new("test");
        context.bind_value("count", json!(3));
        context.bind_instance("service", Arc::new(String::from("svc")));
        let injections = vec![Injection::read("count"), Injection::read("service")];
        let arguments = Arguments::resolve(&context, &injections).unwrap();

        assert_eq!(arguments.value_as::<u32>("count").unwrap(), 3);
        assert_eq!(*arguments.instance::<String>("service").unwrap(), "svc");
        assert!(arguments.setter("count").is_err());
        assert!(arguments.value("service").is_err());
        assert!(arguments.instance::<u32>("service").is_err());
    }
}
