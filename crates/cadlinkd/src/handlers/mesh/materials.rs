//! Material creation and assignment.

use serde_json::{Value, json};

use cadlink_protocol::Params;

use crate::dispatch::{HandlerError, ParamKind, ParamSchema, ParamsExt, RegistryBuilder, RegistryError};
use crate::handlers::shared::find_object_mut;
use crate::session::{DEFAULT_COLOR, EngineSession, Material};

pub(super) fn register(builder: &mut RegistryBuilder) -> Result<(), RegistryError> {
    builder.register(
        "create_material",
        ParamSchema::new()
            .optional("name", ParamKind::String)
            .optional("color", ParamKind::Color)
            .optional("metallic", ParamKind::Number)
            .optional("roughness", ParamKind::Number),
        create_material,
    )?;
    builder.register(
        "apply_material",
        ParamSchema::new()
            .required("object_name", ParamKind::String)
            .required("material_name", ParamKind::String),
        apply_material,
    )?;
    builder.register(
        "set_material_color",
        ParamSchema::new()
            .required("material_name", ParamKind::String)
            .required("color", ParamKind::Color),
        set_material_color,
    )?;
    builder.register(
        "set_material_metallic",
        ParamSchema::new()
            .required("material_name", ParamKind::String)
            .required("value", ParamKind::Number),
        set_material_metallic,
    )?;
    builder.register(
        "set_material_roughness",
        ParamSchema::new()
            .required("material_name", ParamKind::String)
            .required("value", ParamKind::Number),
        set_material_roughness,
    )?;
    builder.register("list_materials", ParamSchema::new(), list_materials)?;
    builder.register(
        "delete_material",
        ParamSchema::new().required("material_name", ParamKind::String),
        delete_material,
    )?;
    Ok(())
}

fn unit_factor(name: &str, value: f64) -> Result<f64, HandlerError> {
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(HandlerError::validation(format!("{name} must be between 0 and 1, got {value}"))
            .with_detail("value", value))
    }
}

fn create_material(session: &mut EngineSession, params: &Params) -> Result<Value, HandlerError> {
    let mut material = Material::new(params.str_or("name", "Material"));
    material.color = params.opt_color("color").unwrap_or(DEFAULT_COLOR);
    material.metallic = unit_factor("metallic", params.f64_or("metallic", 0.0))?;
    material.roughness = unit_factor("roughness", params.f64_or("roughness", 0.5))?;
    let created = session.add_material(material).clone();
    session.touch();
    Ok(json!({
        "material_name": created.name,
        "color": created.color,
        "metallic": created.metallic,
        "roughness": created.roughness,
    }))
}

fn apply_material(session: &mut EngineSession, params: &Params) -> Result<Value, HandlerError> {
    let object_name = params.str_param("object_name")?;
    let material_name = params.str_param("material_name")?;
    if session.material(material_name).is_none() {
        return Err(HandlerError::material_not_found(material_name));
    }
    let object = find_object_mut(session, object_name)?;
    object.material = Some(material_name.to_owned());
    session.touch();
    Ok(json!({
        "object_name": object_name,
        "material_name": material_name,
        "success": true,
    }))
}

fn edit_material(
    session: &mut EngineSession,
    params: &Params,
    edit: impl FnOnce(&mut Material),
) -> Result<Value, HandlerError> {
    let name = params.str_param("material_name")?;
    let material = session
        .material_mut(name)
        .ok_or_else(|| HandlerError::material_not_found(name))?;
    edit(material);
    let description = material.to_json();
    session.touch();
    Ok(description)
}

fn set_material_color(session: &mut EngineSession, params: &Params) -> Result<Value, HandlerError> {
    let color = params
        .opt_color("color")
        .ok_or_else(|| HandlerError::invalid_param("color", "is required"))?;
    edit_material(session, params, |material| material.color = color)
}

fn set_material_metallic(session: &mut EngineSession, params: &Params) -> Result<Value, HandlerError> {
    let value = unit_factor("metallic", params.f64_or("value", f64::NAN))?;
    edit_material(session, params, |material| material.metallic = value)
}

fn set_material_roughness(
    session: &mut EngineSession,
    params: &Params,
) -> Result<Value, HandlerError> {
    let value = unit_factor("roughness", params.f64_or("value", f64::NAN))?;
    edit_material(session, params, |material| material.roughness = value)
}

fn list_materials(session: &mut EngineSession, _params: &Params) -> Result<Value, HandlerError> {
    let materials: Vec<Value> = session.materials().map(Material::to_json).collect();
    Ok(json!({ "count": materials.len(), "materials": materials }))
}

fn delete_material(session: &mut EngineSession, params: &Params) -> Result<Value, HandlerError> {
    let name = params.str_param("material_name")?;
    session
        .remove_material(name)
        .ok_or_else(|| HandlerError::material_not_found(name))?;
    session.touch();
    Ok(json!({ "deleted": name, "success": true }))
}
