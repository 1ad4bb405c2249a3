//! Process-wide store of action metadata.
//!
//! Records are keyed by the identity of the declaring type (`TypeId`) and the record kind.
//! Registration runs the dependency extraction exactly once; inspection hands out fresh
//! copies so callers never share mutable state through the registry.

use std::{
    any::{TypeId, type_name},
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use tracing::debug;

use crate::{
    definition::{ClassDefinition, MethodDefinition},
    error::EngineError,
    extract::{extract_dependencies, normalize_keys},
    model::{Action, ActionClass, ActionMethod, ClassTarget, MethodTarget, class_group, method_group, static_method_group},
};

static GLOBAL_REGISTRY: Lazy<MetadataRegistry> = Lazy::new(MetadataRegistry::new);

/// Kind of record stored for a type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Class,
    Method(String),
}

/// A stored metadata record.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionRecord {
    Class(ActionClass),
    Method(ActionMethod),
}

#[derive(Default)]
struct TypeRecords {
    class: Option<ActionClass>,
    methods: IndexMap<String, ActionMethod>,
}

/// Registry of class and method metadata.
#[derive(Default)]
pub struct MetadataRegistry {
    records: RwLock<HashMap<TypeId, TypeRecords>>,
}

impl MetadataRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry.
    pub fn global() -> &'static MetadataRegistry {
        &GLOBAL_REGISTRY
    }

    /// Register a class declaration together with its methods.
    pub fn register_class(&self, definition: ClassDefinition) {
        let ClassDefinition {
            type_id,
            type_name,
            name,
            group,
            fulfills,
            depends_on,
            injections,
            constructor,
            methods,
        } = definition;

        let dependencies = extract_dependencies(&injections, &depends_on, &fulfills);
        let class = ActionClass {
            group: group.unwrap_or_else(|| class_group(name)),
            name: name.to_string(),
            fulfills: dependencies.fulfills,
            depends_on: dependencies.depends_on,
            injections,
            methods: IndexMap::new(),
            target: ClassTarget::new(type_id, type_name, constructor),
        };
        debug!(
            class = %class.name,
            group = %class.group,
            fulfills = ?class.fulfills,
            depends_on = ?class.depends_on,
            "registered action class"
        );
        self.write().entry(type_id).or_default().class = Some(class);

        for method in methods {
            self.register_method(method);
        }
    }

    /// Register a single method. Methods of a type are kept in registration order; registering
    /// the same method name again replaces the earlier record in place.
    pub fn register_method(&self, definition: MethodDefinition) {
        let MethodDefinition {
            class_type,
            class_name,
            method,
            is_static,
            group,
            binds_return_value_as,
            fulfills,
            depends_on,
            injections,
            handler,
        } = definition;

        let mut dependencies = extract_dependencies(&injections, &depends_on, &fulfills);
        if let Some(key) = &binds_return_value_as {
            dependencies.fulfills.extend(normalize_keys([key]));
        }

        let default_group = if is_static {
            static_method_group(class_name, &method)
        } else {
            method_group(class_name, &method)
        };
        let record = ActionMethod {
            group: group.unwrap_or(default_group),
            method: method.clone(),
            is_static,
            binds_return_value_as,
            fulfills: dependencies.fulfills,
            depends_on: dependencies.depends_on,
            injections,
            target: MethodTarget::new(handler),
        };
        debug!(
            class = %class_name,
            method = %method,
            group = %record.group,
            is_static,
            "registered action method"
        );
        self.write().entry(class_type).or_default().methods.insert(method, record);
    }

    /// Look up one stored record.
    pub fn lookup(&self, type_id: TypeId, kind: &RecordKind) -> Option<ActionRecord> {
        let records = self.read();
        let entry = records.get(&type_id)?;
        match kind {
            RecordKind::Class => entry.class.clone().map(ActionRecord::Class),
            RecordKind::Method(name) => entry.methods.get(name).cloned().map(ActionRecord::Method),
        }
    }

    /// Inspect `T`: its class record merged with every registered method.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotRegistered`] if no class record exists for `T`.
    pub fn inspect<T: Action>(&self) -> Result<Arc<ActionClass>, EngineError> {
        self.inspect_type(TypeId::of::<T>())
            .map_err(|_| EngineError::not_registered(format!("{} ({})", T::NAME, type_name::<T>())))
    }

    /// Inspect a type by identity. Each call returns a newly allocated class.
    pub fn inspect_type(&self, type_id: TypeId) -> Result<Arc<ActionClass>, EngineError> {
        let records = self.read();
        let entry = records.get(&type_id);
        let Some(mut class) = entry.and_then(|entry| entry.class.clone()) else {
            return Err(EngineError::not_registered(format!("{type_id:?}")));
        };
        if let Some(entry) = entry {
            class.methods = entry.methods.clone();
        }
        Ok(Arc::new(class))
    }

    /// Remove everything registered for `type_id`.
    pub fn unregister(&self, type_id: TypeId) -> bool {
        self.write().remove(&type_id).is_some()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<TypeId, TypeRecords>> {
        self.records.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<TypeId, TypeRecords>> {
        self.records.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Injection, InjectionKind};
    use serde_json::json;

    #[derive(Default)]
    struct Invoker;

    impl Action for Invoker {
        const NAME: &'static str = "Invoker";
    }

    struct Unregistered;

    impl Action for Unregistered {
        const NAME: &'static str = "Unregistered";
    }

    fn register_invoker(registry: &MetadataRegistry) {
        ActionClass::define::<Invoker>()
            .construct_default()
            .depends_on(["tracingId"])
            .fulfills(["invocation", "result"])
            .method(
                ActionMethod::instance::<Invoker, _, _>("invoke", |_this, arguments| async move {
                    let trace = arguments.value("tracingId")?.clone();
                    Ok(Some(json!({"trace": trace})))
                })
                .inject(Injection::read("tracingId"))
                .inject(Injection::setter("invocation#status"))
                .binds_return_value_as("result"),
            )
            .method(ActionMethod::static_fn::<Invoker, _, _>("invoke", |_| async { Ok(None) }).group("custom.static"))
            .register(registry);
    }

    #[test]
    fn computes_groups_and_derived_keys() {
        let registry = MetadataRegistry::new();
        register_invoker(&registry);

        let class = registry.inspect::<Invoker>().unwrap();
        assert_eq!(class.group, "class:Invoker");
        assert_eq!(class.binding_key(), "actions.Invoker");
        assert_eq!(class.depends_on.iter().collect::<Vec<_>>(), ["tracingId"]);

        // The static declaration replaced the instance method of the same name.
        assert_eq!(class.methods.len(), 1);
        let method = &class.methods["invoke"];
        assert!(method.is_static);
        assert_eq!(method.group, "custom.static");
    }

    #[test]
    fn method_records_merge_injections_and_return_binding() {
        let registry = MetadataRegistry::new();
        ActionClass::define::<Invoker>()
            .construct_default()
            .method(
                ActionMethod::instance::<Invoker, _, _>("invoke", |_this, _arguments| async { Ok(None) })
                    .inject(Injection::read("tracingId"))
                    .inject(Injection::setter("invocation#status"))
                    .depends_on(["tracingId#raw"])
                    .binds_return_value_as("result"),
            )
            .register(&registry);

        let Some(ActionRecord::Method(method)) = registry.lookup(TypeId::of::<Invoker>(), &RecordKind::Method("invoke".into())) else {
            panic!("method record missing");
        };
        assert_eq!(method.group, "Invoker.invoke");
        assert_eq!(method.depends_on.iter().collect::<Vec<_>>(), ["tracingId"]);
        assert_eq!(method.fulfills.iter().collect::<Vec<_>>(), ["invocation", "result"]);
        assert_eq!(method.injections[1].kind, InjectionKind::DeferredWrite);
    }

    #[test]
    fn inspection_is_idempotent_but_never_shares_the_class() {
        let registry = MetadataRegistry::new();
        register_invoker(&registry);

        let first = registry.inspect::<Invoker>().unwrap();
        let second = registry.inspect::<Invoker>().unwrap();
        assert_eq!(*first, *second);
        assert!(!Arc::ptr_eq(&first, &second));

        let bound = first.bound_methods();
        assert!(bound.iter().all(|method| Arc::ptr_eq(method.class(), &first)));
        assert!(second.bound_methods().iter().all(|method| !Arc::ptr_eq(method.class(), &first)));
    }

    #[test]
    fn inspecting_an_unregistered_type_fails() {
        let registry = MetadataRegistry::new();
        let error = registry.inspect::<Unregistered>().unwrap_err();
        assert!(matches!(error, EngineError::NotRegistered { .. }), "unexpected error: {error}");
        assert!(registry.lookup(TypeId::of::<Unregistered>(), &RecordKind::Class).is_none());
    }

    #[test]
    fn methods_registered_before_the_class_are_aggregated() {
        let registry = MetadataRegistry::new();
        registry.register_method(ActionMethod::instance::<Invoker, _, _>("first", |_this, _| async { Ok(None) }));
        ActionClass::define::<Invoker>()
            .construct_default()
            .method(ActionMethod::instance::<Invoker, _, _>("second", |_this, _| async { Ok(None) }))
            .register(&registry);

        let class = registry.inspect::<Invoker>().unwrap();
        assert_eq!(class.methods.keys().collect::<Vec<_>>(), ["first", "second"]);
        assert!(registry.unregister(TypeId::of::<Invoker>()));
        assert!(registry.inspect::<Invoker>().is_err());
    }
}
