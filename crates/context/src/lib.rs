//! # Actionflow Context
//!
//! A small, scoped key/value binding store. Action sequences publish the data they produce
//! into a [`Context`] and read their inputs back out of it; action instances themselves live
//! in the same store as singleton-scoped bindings.
//!
//! ## Key Features
//!
//! - **Scoped providers**: constant values, transient providers, and cached singletons
//! - **Parent chaining**: lookups fall back to a parent store when a key is not bound locally
//! - **Property paths**: `key#a.b[0]` selects a nested value out of a bound JSON document
//! - **Deferred writes**: [`Setter`] lets an action publish a value at a time of its choosing
//! - **Asynchronous lookups**: [`Context::get_async`] waits for a key published later on
//!
//! ## Usage
//!
//! ```rust
//! use actionflow_context::Context;
//! use serde_json::json;
//!
//! let context = Context::new("request");
//! context.bind_value("request", json!({"headers": {"x-trace": "abc"}}));
//!
//! let trace = context.get_value("request#headers.x-trace")?;
//! assert_eq!(trace, json!("abc"));
//! # Ok::<(), actionflow_context::ContextError>(())
//! ```

mod error;
mod key;
mod setter;
mod store;

pub use error::ContextError;
pub use key::{BindingKey, select_path};
pub use setter::Setter;
pub use store::{BindingScope, BoundValue, Context, Instance, Provider};
