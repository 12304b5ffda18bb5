//! Mesh engine methods: primitives, objects, materials, scenes and renders.
//!
//! Mesh engines follow the conventions of interactive modelling tools:
//! primitives are centred on their location, names collide into `Cube.001`,
//! and rotations are XYZ Euler angles in radians.

mod materials;
mod objects;
mod render;
mod scene;

use serde_json::{Value, json};

use crate::dispatch::{ParamKind, ParamSchema, RegistryBuilder, RegistryError};
use crate::session::SceneObject;

pub(super) fn register(builder: &mut RegistryBuilder) -> Result<(), RegistryError> {
    objects::register(builder)?;
    materials::register(builder)?;
    scene::register(builder)?;
    render::register(builder)?;
    Ok(())
}

/// Schema fragment shared by every object-creating method.
fn placed(schema: ParamSchema) -> ParamSchema {
    schema
        .optional("name", ParamKind::String)
        .optional("location", ParamKind::Vector3)
}

/// Wire description of a mesh-engine object.
fn describe(object: &SceneObject) -> Value {
    let world = object.world_geometry();
    json!({
        "object_id": object.name,
        "name": object.name,
        "type": object.kind.to_string(),
        "location": object.placement.location,
        "rotation": object.placement.rotation,
        "scale": object.placement.scale,
        "dimensions": world.bounds.size(),
        "material": object.material,
        "visible": object.visible,
    })
}
