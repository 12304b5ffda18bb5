//! Boolean operations and mirroring.
//!
//! Results are stored with an identity placement and world-space geometry,
//! so they stay put when their inputs are later moved or deleted.

use serde_json::{Value, json};

use cadlink_protocol::{Params, codes};

use super::insert_object;
use crate::dispatch::{HandlerError, ParamKind, ParamSchema, ParamsExt, RegistryBuilder, RegistryError};
use crate::handlers::shared::find_object;
use crate::kernel::{BooleanOp, Geometry, MirrorPlane, Placement};
use crate::session::{EngineSession, ObjectKind, SceneObject};

pub(super) fn register(builder: &mut RegistryBuilder) -> Result<(), RegistryError> {
    use ParamKind::{Boolean, String, StringList};

    let pair = || {
        ParamSchema::new()
            .required("object1", String)
            .required("object2", String)
            .optional("name", String)
            .optional("delete_originals", Boolean)
    };
    builder.register("boolean_union", pair(), boolean_union)?;
    builder.register("boolean_intersect", pair(), boolean_intersect)?;
    builder.register(
        "boolean_subtract",
        ParamSchema::new()
            .required("base", String)
            .required("tool", String)
            .optional("name", String)
            .optional("delete_originals", Boolean),
        boolean_subtract,
    )?;
    builder.register(
        "multi_union",
        ParamSchema::new()
            .required("objects", StringList)
            .optional("name", String)
            .optional("delete_originals", Boolean),
        multi_union,
    )?;
    builder.register(
        "multi_subtract",
        ParamSchema::new()
            .required("base", String)
            .required("tools", StringList)
            .optional("name", String)
            .optional("delete_originals", Boolean),
        multi_subtract,
    )?;
    builder.register(
        "mirror",
        ParamSchema::new()
            .required("object_name", String)
            .optional("plane", String)
            .optional("name", String),
        mirror,
    )?;
    Ok(())
}

/// Combines named objects of the active document into a new solid.
fn combine(
    session: &mut EngineSession,
    params: &Params,
    op: BooleanOp,
    inputs: &[String],
    (default_name, type_name): (&str, &str),
) -> Result<Value, HandlerError> {
    let operands: Vec<Geometry> = inputs
        .iter()
        .map(|name| find_object(session, name).map(SceneObject::world_geometry))
        .collect::<Result<_, _>>()?;
    let geometry = session
        .kernel()
        .combine(op, &operands)
        .map_err(|error| HandlerError::kernel(codes::COMMAND_ERROR, &error))?;
    if params.bool_or("delete_originals", false)
        && let Some(document) = session.active_document_mut()
    {
        for name in inputs {
            document.remove(name);
        }
    }
    let result = SceneObject::new(
        default_name,
        ObjectKind::Solid,
        type_name,
        Placement::identity(),
        geometry,
    )
    .with_property("operation", op.to_string())
    .with_property("inputs", json!(inputs));
    insert_object(session, params.str_or("name", default_name), result)
}

fn string_list(params: &Params, name: &str) -> Result<Vec<String>, HandlerError> {
    params
        .opt_string_list(name)
        .ok_or_else(|| HandlerError::invalid_param(name, "must be an array of strings"))
}

fn boolean_union(session: &mut EngineSession, params: &Params) -> Result<Value, HandlerError> {
    let inputs = [params.str_param("object1")?, params.str_param("object2")?].map(str::to_owned);
    let mut description = combine(session, params, BooleanOp::Union, &inputs, ("Union", "Part::Fuse"))?;
    description["inputs"] = json!(inputs);
    Ok(description)
}

fn boolean_intersect(session: &mut EngineSession, params: &Params) -> Result<Value, HandlerError> {
    let inputs = [params.str_param("object1")?, params.str_param("object2")?].map(str::to_owned);
    let mut description = combine(
        session,
        params,
        BooleanOp::Intersect,
        &inputs,
        ("Intersection", "Part::Common"),
    )?;
    description["inputs"] = json!(inputs);
    Ok(description)
}

fn boolean_subtract(session: &mut EngineSession, params: &Params) -> Result<Value, HandlerError> {
    let base = params.str_param("base")?;
    let tool = params.str_param("tool")?;
    let inputs = [base, tool].map(str::to_owned);
    let mut description =
        combine(session, params, BooleanOp::Subtract, &inputs, ("Cut", "Part::Cut"))?;
    description["base"] = json!(base);
    description["tool"] = json!(tool);
    Ok(description)
}

fn multi_union(session: &mut EngineSession, params: &Params) -> Result<Value, HandlerError> {
    let inputs = string_list(params, "objects")?;
    if inputs.len() < 2 {
        return Err(HandlerError::validation("multi_union needs at least 2 objects")
            .with_detail("count", inputs.len()));
    }
    let mut description = combine(
        session,
        params,
        BooleanOp::Union,
        &inputs,
        ("MultiUnion", "Part::MultiFuse"),
    )?;
    description["inputs"] = json!(inputs);
    Ok(description)
}

fn multi_subtract(session: &mut EngineSession, params: &Params) -> Result<Value, HandlerError> {
    let base = params.str_param("base")?.to_owned();
    let tools = string_list(params, "tools")?;
    if tools.is_empty() {
        return Err(HandlerError::validation("multi_subtract needs at least 1 tool"));
    }
    let inputs: Vec<String> = std::iter::once(base.clone()).chain(tools.iter().cloned()).collect();
    let mut description = combine(
        session,
        params,
        BooleanOp::Subtract,
        &inputs,
        ("MultiSubtract", "Part::Cut"),
    )?;
    description["base"] = json!(base);
    description["tools"] = json!(tools);
    Ok(description)
}

fn mirror(session: &mut EngineSession, params: &Params) -> Result<Value, HandlerError> {
    let source = params.str_param("object_name")?;
    let text = params.str_or("plane", "XY");
    let plane: MirrorPlane = text.parse().map_err(|_| {
        HandlerError::validation(format!("Invalid plane: {text}. Use XY, XZ, or YZ"))
    })?;
    let geometry = find_object(session, source)?.world_geometry();
    let mirrored = session
        .kernel()
        .mirror(&geometry, plane)
        .map_err(|error| HandlerError::kernel(codes::COMMAND_ERROR, &error))?;
    let result = SceneObject::new(
        "Mirror",
        ObjectKind::Solid,
        "Part::Mirroring",
        Placement::identity(),
        mirrored,
    )
    .with_property("source", source)
    .with_property("plane", plane.to_string());
    let mut description = insert_object(session, params.str_or("name", "Mirror"), result)?;
    description["source"] = json!(source);
    description["plane"] = json!(plane.to_string());
    Ok(description)
}
