//! Command handlers for both engine flavours.
//!
//! Every handler has the signature
//! `fn(&mut EngineSession, &Params) -> Result<Value, HandlerError>` and is
//! registered together with the schema its parameters are checked against.
//! [`registry_for`] assembles the method table an engine serves: the common
//! methods, the flavour-specific ones, and finally `list_methods`, which
//! describes everything registered before it.

mod common;
mod mesh;
mod shared;
mod solid;

use cadlink_config::EngineKind;

use crate::dispatch::{Registry, RegistryBuilder, RegistryError};

/// Protocol revision reported by `get_version`.
pub const PROTOCOL_VERSION: &str = "1";

/// Builds the method table for an engine.
///
/// # Errors
///
/// Returns [`RegistryError::DuplicateHandler`] if two handlers claim the same
/// method name.
pub fn registry_for(kind: EngineKind) -> Result<Registry, RegistryError> {
    let mut builder = RegistryBuilder::new();
    common::register(&mut builder)?;
    match kind {
        EngineKind::Mesh => mesh::register(&mut builder)?,
        EngineKind::Solid => solid::register(&mut builder)?,
    }
    common::register_introspection(&mut builder)?;
    Ok(builder.build())
}
