use std::{fmt, sync::Arc};

use serde_json::Value;

use crate::store::Context;

/// Deferred-write capability for a single binding key.
///
/// Actions receive a `Setter` instead of a value when they are responsible for producing the
/// key rather than consuming it. Calling [`Setter::set`] publishes the value into the store the
/// setter was created from and wakes any pending [`Context::get_async`] callers.
#[derive(Clone)]
pub struct Setter {
    key: String,
    context: Arc<Context>,
}

impl Setter {
    pub(crate) fn new(key: String, context: Arc<Context>) -> Self {
        Self { key, context }
    }

    /// The key this setter publishes under.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Publish `value` under the setter's key.
    pub fn set(&self, value: impl Into<Value>) {
        self.context.bind_value(self.key.clone(), value.into());
    }
}

impl fmt::Debug for Setter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Setter")
            .field("key", &self.key)
            .field("context", &self.context.name())
            .finish()
    }
}
