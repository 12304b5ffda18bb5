//! Solid engine methods: documents, parametric primitives, booleans and
//! exchange-format exports.
//!
//! Solid engines follow parametric CAD conventions: primitives sit on their
//! base at the given position, names collide into `Box001`, and objects live
//! in named documents created on demand.

mod boolean;
mod documents;
mod export;
mod primitives;

use serde_json::{Value, json};

use crate::dispatch::{HandlerError, RegistryBuilder, RegistryError};
use crate::session::{EngineSession, SceneObject};

pub(super) fn register(builder: &mut RegistryBuilder) -> Result<(), RegistryError> {
    documents::register(builder)?;
    primitives::register(builder)?;
    boolean::register(builder)?;
    export::register(builder)?;
    Ok(())
}

/// Wire description of a solid-engine object.
fn describe(object: &SceneObject) -> Value {
    let world = object.world_geometry();
    json!({
        "object_id": object.name,
        "name": object.name,
        "type": object.type_name,
        "placement": object.placement.to_json(),
        "dimensions": world.bounds.size(),
        "volume": world.volume,
        "bounding_box": world.bounds.to_json(),
    })
}

/// Inserts an object into the active document, creating one if needed,
/// under a free name derived from `requested`.
fn insert_object(
    session: &mut EngineSession,
    requested: &str,
    mut object: SceneObject,
) -> Result<Value, HandlerError> {
    if requested.trim().is_empty() {
        return Err(HandlerError::validation("object name must not be empty"));
    }
    let separator = session.name_separator();
    let document = session.document_or_create();
    object.name = document.unique_name(requested, separator);
    let mut description = describe(document.insert(object));
    description["document"] = json!(document.name());
    session.touch();
    Ok(description)
}
