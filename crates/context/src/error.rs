//! Error types for binding store lookups.

use thiserror::Error;

/// Errors raised while resolving a binding.
#[derive(Debug, Error)]
pub enum ContextError {
    #[error("binding not found: '{key}' (context '{context}')")]
    NotFound { key: String, context: String },

    #[error("binding '{key}' has no value at path '{path}'")]
    PathNotFound { key: String, path: String },

    #[error("binding '{key}' is not a {expected}")]
    TypeMismatch { key: String, expected: &'static str },

    #[error("provider for binding '{key}' failed: {source}")]
    Provider {
        key: String,
        #[source]
        source: anyhow::Error,
    },
}

impl ContextError {
    /// Create a binding not found error.
    pub fn not_found(key: impl Into<String>, context: impl Into<String>) -> Self {
        Self::NotFound {
            key: key.into(),
            context: context.into(),
        }
    }

    /// Create a missing property path error.
    pub fn path_not_found(key: impl Into<String>, path: impl Into<String>) -> Self {
        Self::PathNotFound {
            key: key.into(),
            path: path.into(),
        }
    }

    /// Create a type mismatch error.
    pub fn type_mismatch(key: impl Into<String>, expected: &'static str) -> Self {
        Self::TypeMismatch { key: key.into(), expected }
    }

    /// Wrap a provider failure.
    pub fn provider(key: impl Into<String>, source: anyhow::Error) -> Self {
        Self::Provider { key: key.into(), source }
    }

    /// Returns `true` when the error is a missing binding, as opposed to a failing provider.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
