//! Error types for graph construction and sequence execution.

use actionflow_context::ContextError;
use thiserror::Error;

/// Main error type for engine operations.
///
/// Every variant aborts the enclosing call: a cyclic graph produces no order, and a failed
/// resolution or invocation stops the run without executing later actions.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("cycle detected in action constraints involving: {}", groups.join(", "))]
    CyclicDependency { groups: Vec<String> },

    #[error("action class not registered: {type_name}")]
    NotRegistered { type_name: String },

    #[error("failed to resolve inputs for '{group}': {source}")]
    Resolution {
        group: String,
        #[source]
        source: ContextError,
    },

    #[error("failed to construct action class '{class}': {source}")]
    Construction {
        class: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("action '{group}' failed: {source}")]
    Invocation {
        group: String,
        #[source]
        source: anyhow::Error,
    },
}

impl EngineError {
    /// Create a cyclic dependency error.
    pub fn cyclic(groups: Vec<String>) -> Self {
        Self::CyclicDependency { groups }
    }

    /// Create a not-registered error.
    pub fn not_registered(type_name: impl Into<String>) -> Self {
        Self::NotRegistered {
            type_name: type_name.into(),
        }
    }

    /// Create a resolution error.
    pub fn resolution(group: impl Into<String>, source: ContextError) -> Self {
        Self::Resolution {
            group: group.into(),
            source,
        }
    }

    /// Create a construction error.
    pub fn construction(class: impl Into<String>, source: anyhow::Error) -> Self {
        Self::Construction {
            class: class.into(),
            source,
        }
    }

    /// Create an invocation error.
    pub fn invocation(group: impl Into<String>, source: anyhow::Error) -> Self {
        Self::Invocation {
            group: group.into(),
            source,
        }
    }

    /// Returns `true` for errors caused by contradictory declarations rather than run-time state.
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, Self::CyclicDependency { .. } | Self::NotRegistered { .. })
    }
}
