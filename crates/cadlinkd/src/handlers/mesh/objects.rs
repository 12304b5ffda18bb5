//! Primitive creation and object manipulation.

use serde_json::{Value, json};

use cadlink_protocol::{Params, codes};

use super::{describe, placed};
use crate::dispatch::{HandlerError, ParamKind, ParamSchema, ParamsExt, RegistryBuilder, RegistryError};
use crate::handlers::shared::{find_object, find_object_mut};
use crate::kernel::{Anchor, Geometry, Placement, Primitive, Shape};
use crate::session::{EngineSession, ObjectKind, SceneObject};

pub(super) fn register(builder: &mut RegistryBuilder) -> Result<(), RegistryError> {
    use ParamKind::{Boolean, Number, String, Vector3};

    builder.register(
        "create_cube",
        placed(ParamSchema::new()).optional("size", Number),
        create_cube,
    )?;
    builder.register(
        "create_sphere",
        placed(ParamSchema::new()).optional("radius", Number),
        create_sphere,
    )?;
    builder.register(
        "create_cylinder",
        placed(ParamSchema::new())
            .optional("radius", Number)
            .optional("depth", Number),
        create_cylinder,
    )?;
    builder.register(
        "create_cone",
        placed(ParamSchema::new())
            .optional("radius1", Number)
            .optional("radius2", Number)
            .optional("depth", Number),
        create_cone,
    )?;
    builder.register(
        "create_torus",
        placed(ParamSchema::new())
            .optional("major_radius", Number)
            .optional("minor_radius", Number),
        create_torus,
    )?;
    builder.register(
        "create_plane",
        placed(ParamSchema::new()).optional("size", Number),
        create_plane,
    )?;
    builder.register(
        "create_empty",
        placed(ParamSchema::new()).optional("empty_display_type", String),
        create_empty,
    )?;
    builder.register(
        "get_object",
        ParamSchema::new().required("name", String),
        get_object,
    )?;
    builder.register(
        "list_objects",
        ParamSchema::new().optional("object_type", String),
        list_objects,
    )?;
    builder.register(
        "delete_object",
        ParamSchema::new().required("name", String),
        delete_object,
    )?;
    builder.register(
        "select_object",
        ParamSchema::new()
            .required("name", String)
            .optional("add_to_selection", Boolean),
        select_object,
    )?;
    builder.register(
        "transform_object",
        ParamSchema::new()
            .required("name", String)
            .optional("location", Vector3)
            .optional("rotation", Vector3)
            .optional("scale", Vector3),
        transform_object,
    )?;
    builder.register(
        "duplicate_object",
        ParamSchema::new()
            .required("name", String)
            .optional("new_name", String),
        duplicate_object,
    )?;
    builder.register(
        "rename_object",
        ParamSchema::new()
            .required("old_name", String)
            .required("new_name", String),
        rename_object,
    )?;
    Ok(())
}

fn create_cube(session: &mut EngineSession, params: &Params) -> Result<Value, HandlerError> {
    let size = params.f64_or("size", 2.0);
    let shape = Shape::Box {
        length: size,
        width: size,
        height: size,
    };
    add_mesh(session, params, "Cube", shape)
}

fn create_sphere(session: &mut EngineSession, params: &Params) -> Result<Value, HandlerError> {
    let radius = params.f64_or("radius", 1.0);
    add_mesh(session, params, "Sphere", Shape::Sphere { radius })
}

fn create_cylinder(session: &mut EngineSession, params: &Params) -> Result<Value, HandlerError> {
    let shape = Shape::Cylinder {
        radius: params.f64_or("radius", 1.0),
        height: params.f64_or("depth", 2.0),
    };
    add_mesh(session, params, "Cylinder", shape)
}

fn create_cone(session: &mut EngineSession, params: &Params) -> Result<Value, HandlerError> {
    let shape = Shape::Cone {
        radius1: params.f64_or("radius1", 1.0),
        radius2: params.f64_or("radius2", 0.0),
        height: params.f64_or("depth", 2.0),
    };
    add_mesh(session, params, "Cone", shape)
}

fn create_torus(session: &mut EngineSession, params: &Params) -> Result<Value, HandlerError> {
    let shape = Shape::Torus {
        major_radius: params.f64_or("major_radius", 1.0),
        minor_radius: params.f64_or("minor_radius", 0.25),
    };
    add_mesh(session, params, "Torus", shape)
}

fn create_plane(session: &mut EngineSession, params: &Params) -> Result<Value, HandlerError> {
    let size = params.f64_or("size", 2.0);
    let shape = Shape::Plane {
        length: size,
        width: size,
    };
    add_mesh(session, params, "Plane", shape)
}

fn add_mesh(
    session: &mut EngineSession,
    params: &Params,
    base: &str,
    shape: Shape,
) -> Result<Value, HandlerError> {
    let geometry = session
        .kernel()
        .build(&Primitive {
            shape,
            anchor: Anchor::Centered,
        })
        .map_err(|error| HandlerError::kernel(codes::COMMAND_ERROR, &error))?;
    let placement = Placement::at(params.vec3_or("location", [0.0; 3]));
    let object = SceneObject::new(base, ObjectKind::Mesh, base, placement, geometry);
    insert_object(session, params.str_or("name", base), object)
}

fn create_empty(session: &mut EngineSession, params: &Params) -> Result<Value, HandlerError> {
    let placement = Placement::at(params.vec3_or("location", [0.0; 3]));
    let display = params.str_or("empty_display_type", "PLAIN_AXES").to_ascii_uppercase();
    let object = SceneObject::new("Empty", ObjectKind::Empty, "Empty", placement, Geometry::marker())
        .with_property("empty_display_type", display);
    insert_object(session, params.str_or("name", "Empty"), object)
}

/// Inserts an object into the active scene under a free name derived from
/// `requested` and describes it.
pub(super) fn insert_object(
    session: &mut EngineSession,
    requested: &str,
    mut object: SceneObject,
) -> Result<Value, HandlerError> {
    let separator = session.name_separator();
    let document = session.document_or_create();
    object.name = document.unique_name(requested, separator);
    let inserted = document.insert(object);
    let mut description = describe(inserted);
    if let Some(display) = inserted.properties.get("empty_display_type") {
        description["empty_display_type"] = display.clone();
    }
    session.touch();
    Ok(description)
}

fn get_object(session: &mut EngineSession, params: &Params) -> Result<Value, HandlerError> {
    let object = find_object(session, params.str_param("name")?)?;
    let mut description = describe(object);
    description["properties"] = Value::Object(object.properties.clone());
    Ok(description)
}

fn list_objects(session: &mut EngineSession, params: &Params) -> Result<Value, HandlerError> {
    let filter = params
        .opt_str("object_type")
        .map(|text| {
            text.parse::<ObjectKind>().map_err(|_| {
                HandlerError::invalid_param("object_type", format!("unknown object type '{text}'"))
            })
        })
        .transpose()?;
    let objects: Vec<Value> = session
        .active_document()
        .map(|document| {
            document
                .objects()
                .iter()
                .filter(|object| filter.is_none_or(|kind| object.kind == kind))
                .map(|object| {
                    json!({
                        "name": object.name,
                        "type": object.kind.to_string(),
                        "location": object.placement.location,
                    })
                })
                .collect()
        })
        .unwrap_or_default();
    Ok(json!({ "count": objects.len(), "objects": objects }))
}

fn delete_object(session: &mut EngineSession, params: &Params) -> Result<Value, HandlerError> {
    let name = params.str_param("name")?;
    session
        .active_document_mut()
        .and_then(|document| document.remove(name))
        .ok_or_else(|| HandlerError::object_not_found(name))?;
    session.touch();
    Ok(json!({ "deleted": name, "success": true }))
}

fn select_object(session: &mut EngineSession, params: &Params) -> Result<Value, HandlerError> {
    let name = params.str_param("name")?;
    let extend = params.bool_or("add_to_selection", false);
    find_object(session, name)?;
    let selection = session
        .active_document_mut()
        .map(|document| {
            document.select(name, extend);
            document.selection().to_vec()
        })
        .unwrap_or_default();
    session.touch();
    Ok(json!({ "selected": name, "active": true, "selection": selection }))
}

fn transform_object(session: &mut EngineSession, params: &Params) -> Result<Value, HandlerError> {
    let object = find_object_mut(session, params.str_param("name")?)?;
    if let Some(location) = params.opt_vec3("location") {
        object.placement.location = location;
    }
    if let Some(rotation) = params.opt_vec3("rotation") {
        object.placement.rotation = rotation;
    }
    if let Some(scale) = params.opt_vec3("scale") {
        object.placement.scale = scale;
    }
    let description = describe(object);
    session.touch();
    Ok(description)
}

fn duplicate_object(session: &mut EngineSession, params: &Params) -> Result<Value, HandlerError> {
    let source = params.str_param("name")?;
    let copy = find_object(session, source)?.clone();
    let requested = params.str_or("new_name", source).to_owned();
    let mut description = insert_object(session, &requested, copy)?;
    description["source"] = json!(source);
    Ok(description)
}

fn rename_object(session: &mut EngineSession, params: &Params) -> Result<Value, HandlerError> {
    let old_name = params.str_param("old_name")?;
    let requested = params.str_param("new_name")?;
    if requested.trim().is_empty() {
        return Err(HandlerError::validation("new_name must not be empty"));
    }
    find_object(session, old_name)?;
    let separator = session.name_separator();
    let document = session
        .active_document_mut()
        .ok_or_else(|| HandlerError::object_not_found(old_name))?;
    let new_name = if requested == old_name {
        requested.to_owned()
    } else {
        document.unique_name(requested, separator)
    };
    if !document.rename(old_name, &new_name) && new_name != old_name {
        return Err(HandlerError::command(format!(
            "Object '{old_name}' could not be renamed"
        )));
    }
    session.touch();
    Ok(json!({ "old_name": old_name, "new_name": new_name, "success": true }))
}
