//! Method registry mapping names to handlers.
//!
//! Registration happens once at startup through [`RegistryBuilder`]. The
//! built [`Registry`] is immutable and shared by every connection.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;

use cadlink_protocol::Params;

use super::errors::{HandlerError, RegistryError};
use super::schema::ParamSchema;
use crate::session::EngineSession;

/// Shared handler function.
pub type HandlerFn =
    Arc<dyn Fn(&mut EngineSession, &Params) -> Result<Value, HandlerError> + Send + Sync>;

/// A registered method.
#[derive(Clone)]
pub struct MethodEntry {
    schema: ParamSchema,
    handler: HandlerFn,
}

impl MethodEntry {
    /// Parameter schema.
    #[must_use]
    pub const fn schema(&self) -> &ParamSchema {
        &self.schema
    }

    /// Handler function.
    #[must_use]
    pub fn handler(&self) -> HandlerFn {
        Arc::clone(&self.handler)
    }
}

impl std::fmt::Debug for MethodEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodEntry")
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

/// Collects handlers before the engine starts serving.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    entries: BTreeMap<String, MethodEntry>,
}

impl RegistryBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler under a method name.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateHandler`] when the name is taken.
    pub fn register<F>(
        &mut self,
        method: &str,
        schema: ParamSchema,
        handler: F,
    ) -> Result<(), RegistryError>
    where
        F: Fn(&mut EngineSession, &Params) -> Result<Value, HandlerError> + Send + Sync + 'static,
    {
        if self.entries.contains_key(method) {
            return Err(RegistryError::DuplicateHandler {
                method: method.to_owned(),
            });
        }
        self.entries.insert(
            method.to_owned(),
            MethodEntry {
                schema,
                handler: Arc::new(handler),
            },
        );
        Ok(())
    }

    /// Names registered so far, sorted.
    #[must_use]
    pub fn method_names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// Schema of a method registered so far.
    #[must_use]
    pub fn schema(&self, method: &str) -> Option<&ParamSchema> {
        self.entries.get(method).map(MethodEntry::schema)
    }

    /// Freezes the registry.
    #[must_use]
    pub fn build(self) -> Registry {
        Registry {
            entries: self.entries,
        }
    }
}

/// Immutable method table.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    entries: BTreeMap<String, MethodEntry>,
}

impl Registry {
    /// Looks up a method.
    #[must_use]
    pub fn get(&self, method: &str) -> Option<&MethodEntry> {
        self.entries.get(method)
    }

    /// Sorted method names.
    #[must_use]
    pub fn method_names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// Number of registered methods.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when no methods are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
