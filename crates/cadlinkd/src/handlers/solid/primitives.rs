//! Parametric primitives and object editing.

use serde_json::{Value, json};

use cadlink_protocol::{Params, codes};

use super::{describe, insert_object};
use crate::dispatch::{HandlerError, ParamKind, ParamSchema, ParamsExt, RegistryBuilder, RegistryError};
use crate::handlers::shared::{euler_from_quaternion, find_object, find_object_mut};
use crate::kernel::{Anchor, Placement, Primitive, Shape, Vec3, WedgeSpec};
use crate::session::{EngineSession, ObjectKind, SceneObject};

const WEDGE_FIELDS: [(&str, f64); 10] = [
    ("xmin", 0.0),
    ("ymin", 0.0),
    ("zmin", 0.0),
    ("x2min", 2.0),
    ("z2min", 2.0),
    ("xmax", 10.0),
    ("ymax", 10.0),
    ("zmax", 10.0),
    ("x2max", 8.0),
    ("z2max", 8.0),
];

fn positioned(schema: ParamSchema) -> ParamSchema {
    schema
        .optional("name", ParamKind::String)
        .optional("position", ParamKind::Vector3)
}

pub(super) fn register(builder: &mut RegistryBuilder) -> Result<(), RegistryError> {
    use ParamKind::{Array, Number, String, Vector3};

    builder.register(
        "create_box",
        positioned(ParamSchema::new())
            .optional("length", Number)
            .optional("width", Number)
            .optional("height", Number),
        create_box,
    )?;
    builder.register(
        "create_sphere",
        positioned(ParamSchema::new()).optional("radius", Number),
        create_sphere,
    )?;
    builder.register(
        "create_cylinder",
        positioned(ParamSchema::new())
            .optional("radius", Number)
            .optional("height", Number),
        create_cylinder,
    )?;
    builder.register(
        "create_cone",
        positioned(ParamSchema::new())
            .optional("radius1", Number)
            .optional("radius2", Number)
            .optional("height", Number),
        create_cone,
    )?;
    builder.register(
        "create_torus",
        positioned(ParamSchema::new())
            .optional("radius1", Number)
            .optional("radius2", Number),
        create_torus,
    )?;
    builder.register(
        "create_plane",
        positioned(ParamSchema::new())
            .optional("length", Number)
            .optional("width", Number),
        create_plane,
    )?;
    let wedge = WEDGE_FIELDS
        .iter()
        .fold(positioned(ParamSchema::new()), |schema, &(field, _)| {
            schema.optional(field, Number)
        });
    builder.register("create_wedge", wedge, create_wedge)?;
    builder.register(
        "get_object",
        ParamSchema::new().required("name", String),
        get_object,
    )?;
    builder.register("list_objects", ParamSchema::new(), list_objects)?;
    builder.register(
        "delete_object",
        ParamSchema::new().required("name", String),
        delete_object,
    )?;
    builder.register(
        "rename_object",
        ParamSchema::new()
            .required("old_name", String)
            .required("new_name", String),
        rename_object,
    )?;
    builder.register(
        "copy_object",
        ParamSchema::new()
            .required("name", String)
            .optional("new_name", String),
        copy_object,
    )?;
    builder.register(
        "set_placement",
        ParamSchema::new()
            .required("name", String)
            .optional("position", Vector3)
            .optional("rotation", Array),
        set_placement,
    )?;
    Ok(())
}

fn create_box(session: &mut EngineSession, params: &Params) -> Result<Value, HandlerError> {
    let shape = Shape::Box {
        length: params.f64_or("length", 10.0),
        width: params.f64_or("width", 10.0),
        height: params.f64_or("height", 10.0),
    };
    add_solid(session, params, "Box", shape)
}

fn create_sphere(session: &mut EngineSession, params: &Params) -> Result<Value, HandlerError> {
    let radius = params.f64_or("radius", 5.0);
    add_solid(session, params, "Sphere", Shape::Sphere { radius })
}

fn create_cylinder(session: &mut EngineSession, params: &Params) -> Result<Value, HandlerError> {
    let shape = Shape::Cylinder {
        radius: params.f64_or("radius", 5.0),
        height: params.f64_or("height", 10.0),
    };
    add_solid(session, params, "Cylinder", shape)
}

fn create_cone(session: &mut EngineSession, params: &Params) -> Result<Value, HandlerError> {
    let shape = Shape::Cone {
        radius1: params.f64_or("radius1", 5.0),
        radius2: params.f64_or("radius2", 0.0),
        height: params.f64_or("height", 10.0),
    };
    add_solid(session, params, "Cone", shape)
}

fn create_torus(session: &mut EngineSession, params: &Params) -> Result<Value, HandlerError> {
    let shape = Shape::Torus {
        major_radius: params.f64_or("radius1", 10.0),
        minor_radius: params.f64_or("radius2", 2.0),
    };
    add_solid(session, params, "Torus", shape)
}

fn create_plane(session: &mut EngineSession, params: &Params) -> Result<Value, HandlerError> {
    let shape = Shape::Plane {
        length: params.f64_or("length", 10.0),
        width: params.f64_or("width", 10.0),
    };
    add_solid(session, params, "Plane", shape)
}

fn create_wedge(session: &mut EngineSession, params: &Params) -> Result<Value, HandlerError> {
    let [xmin, ymin, zmin, x2min, z2min, xmax, ymax, zmax, x2max, z2max] =
        WEDGE_FIELDS.map(|(field, default)| params.f64_or(field, default));
    let spec = WedgeSpec {
        xmin,
        ymin,
        zmin,
        x2min,
        z2min,
        xmax,
        ymax,
        zmax,
        x2max,
        z2max,
    };
    add_solid(session, params, "Wedge", Shape::Wedge(spec))
}

fn add_solid(
    session: &mut EngineSession,
    params: &Params,
    base: &str,
    shape: Shape,
) -> Result<Value, HandlerError> {
    let geometry = session
        .kernel()
        .build(&Primitive {
            shape,
            anchor: Anchor::Base,
        })
        .map_err(|error| HandlerError::kernel(codes::COMMAND_ERROR, &error))?;
    let placement = Placement::at(params.vec3_or("position", [0.0; 3]));
    let shape_json = serde_json::to_value(shape).unwrap_or(Value::Null);
    let object = SceneObject::new(
        base,
        ObjectKind::Solid,
        format!("Part::{base}"),
        placement,
        geometry,
    )
    .with_property("shape", shape_json);
    insert_object(session, params.str_or("name", base), object)
}

fn get_object(session: &mut EngineSession, params: &Params) -> Result<Value, HandlerError> {
    let object = find_object(session, params.str_param("name")?)?;
    let mut description = describe(object);
    description["properties"] = Value::Object(object.properties.clone());
    Ok(description)
}

fn list_objects(session: &mut EngineSession, _params: &Params) -> Result<Value, HandlerError> {
    let (document, objects): (Option<&str>, Vec<Value>) = match session.active_document() {
        Some(document) => (
            Some(document.name()),
            document
                .objects()
                .iter()
                .map(|object| {
                    json!({
                        "name": object.name,
                        "type": object.type_name,
                        "volume": object.world_geometry().volume,
                    })
                })
                .collect(),
        ),
        None => (None, Vec::new()),
    };
    Ok(json!({ "document": document, "count": objects.len(), "objects": objects }))
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

fn rename_object(session: &mut EngineSession, params: &Params) -> Result<Value, HandlerError> {
    let name = params.str_param("old_name")?;
    let label = params.str_param("new_name")?;
    if label.trim().is_empty() {
        return Err(HandlerError::validation("new_name must not be empty"));
    }
    let separator = session.name_separator();
    find_object(session, name)?;
    let document = session
        .active_document_mut()
        .ok_or_else(|| HandlerError::object_not_found(name))?;
    let new_name = if label == name {
        label.to_owned()
    } else {
        document.unique_name(label, separator)
    };
    if !document.rename(name, &new_name) {
        return Err(HandlerError::command(format!(
            "Object '{name}' could not be renamed"
        )));
    }
    session.touch();
    Ok(json!({ "old_name": name, "new_name": new_name, "success": true }))
}

fn copy_object(session: &mut EngineSession, params: &Params) -> Result<Value, HandlerError> {
    let source = params.str_param("name")?;
    let copy = find_object(session, source)?.clone();
    let requested = params.str_or("new_name", source).to_owned();
    let mut description = insert_object(session, &requested, copy)?;
    description["source"] = json!(source);
    Ok(description)
}

/// Rotation from three Euler angles in degrees or a `[x, y, z, w]`
/// quaternion, as radians.
fn rotation_from(params: &Params) -> Result<Option<Vec3>, HandlerError> {
    let Some(value) = params.get("rotation").filter(|value| !value.is_null()) else {
        return Ok(None);
    };
    let numbers: Option<Vec<f64>> = value
        .as_array()
        .map(|items| items.iter().map(Value::as_f64).collect())
        .unwrap_or_default();
    match numbers.as_deref() {
        Some([x, y, z]) => Ok(Some([x.to_radians(), y.to_radians(), z.to_radians()])),
        Some([x, y, z, w]) => {
            let norm = (x * x + y * y + z * z + w * w).sqrt();
            if norm == 0.0 {
                return Err(HandlerError::validation("rotation quaternion must not be zero"));
            }
            Ok(Some(euler_from_quaternion([x / norm, y / norm, z / norm, w / norm])))
        }
        _ => Err(HandlerError::invalid_param(
            "rotation",
            "must be three Euler angles in degrees or a quaternion [x, y, z, w]",
        )),
    }
}

fn set_placement(session: &mut EngineSession, params: &Params) -> Result<Value, HandlerError> {
    let rotation = rotation_from(params)?;
    let object = find_object_mut(session, params.str_param("name")?)?;
    if let Some(position) = params.opt_vec3("position") {
        object.placement.location = position;
    }
    if let Some(rotation) = rotation {
        object.placement.rotation = rotation;
    }
    let mut description = describe(object);
    description["rotation_degrees"] = json!(object.placement.rotation.map(f64::to_degrees));
    session.touch();
    Ok(description)
}
