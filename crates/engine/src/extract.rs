//! Derivation of dependency and output keys from declared inputs.
//!
//! Plain reads become `depends_on` entries and deferred-write capabilities become `fulfills`
//! entries. Explicitly declared keys are appended after the derived ones and the combined list
//! is normalized: `#path` qualifiers are stripped and duplicates dropped, keeping the first
//! occurrence.

use actionflow_context::BindingKey;
use indexmap::IndexSet;

use crate::model::{Injection, InjectionKind};

/// Final, normalized key sets of one action.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencySets {
    pub depends_on: IndexSet<String>,
    pub fulfills: IndexSet<String>,
}

/// Combine the keys implied by `injections` with the explicitly declared ones.
pub fn extract_dependencies<D, F>(injections: &[Injection], declared_depends_on: D, declared_fulfills: F) -> DependencySets
where
    D: IntoIterator,
    D::Item: AsRef<str>,
    F: IntoIterator,
    F::Item: AsRef<str>,
{
    let derived_depends_on = injections
        .iter()
        .filter(|injection| injection.kind == InjectionKind::Read)
        .map(|injection| injection.key.clone());
    let derived_fulfills = injections
        .iter()
        .filter(|injection| injection.kind == InjectionKind::DeferredWrite)
        .map(|injection| injection.key.clone());

    DependencySets {
        depends_on: normalize_keys(derived_depends_on.chain(declared_depends_on.into_iter().map(|key| key.as_ref().to_string()))),
        fulfills: normalize_keys(derived_fulfills.chain(declared_fulfills.into_iter().map(|key| key.as_ref().to_string()))),
    }
}

/// Strip `#` qualifiers and deduplicate, preserving first-seen order. Empty keys are dropped.
pub fn normalize_keys<I>(keys: I) -> IndexSet<String>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    keys.into_iter()
        .map(|key| BindingKey::parse(key.as_ref()).key)
        .filter(|key| !key.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_keys_from_injections_before_declared_ones() {
        let injections = vec![
            Injection::read("tracingId"),
            Injection::setter("invocation"),
            Injection::read("request#headers"),
        ];
        let sets = extract_dependencies(&injections, ["config"], ["result"]);

        assert_eq!(sets.depends_on.iter().collect::<Vec<_>>(), ["tracingId", "request", "config"]);
        assert_eq!(sets.fulfills.iter().collect::<Vec<_>>(), ["invocation", "result"]);
    }

    #[test]
    fn normalizes_qualifiers_and_duplicates() {
        let keys = normalize_keys(["request#body", "request#headers.host", "tracingId", "request", "#orphan"]);
        assert_eq!(keys.into_iter().collect::<Vec<_>>(), vec!["request".to_string(), "tracingId".to_string()]);
    }

    #[test]
    fn absent_inputs_yield_empty_sets() {
        let sets = extract_dependencies(&[], Vec::<String>::new(), Vec::<String>::new());
        assert_eq!(sets, DependencySets::default());
    }
}
