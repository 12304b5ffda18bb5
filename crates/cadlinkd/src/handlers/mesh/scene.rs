//! Scene inspection, cameras, lights, frames and scene files.

use serde_json::{Value, json};
use strum::{Display, EnumString};

use cadlink_protocol::Params;

use super::objects::insert_object;
use crate::dispatch::{HandlerError, ParamKind, ParamSchema, ParamsExt, RegistryBuilder, RegistryError};
use crate::handlers::shared::{document_file, find_object, open_file};
use crate::kernel::{Geometry, Placement};
use crate::session::{EngineSession, ObjectKind, SceneObject, save};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
enum LightType {
    Point,
    Sun,
    Spot,
    Area,
}

pub(super) fn register(builder: &mut RegistryBuilder) -> Result<(), RegistryError> {
    use ParamKind::{Boolean, Color, Integer, Number, String, Vector3};

    builder.register("get_scene_info", ParamSchema::new(), get_scene_info)?;
    builder.register(
        "clear_scene",
        ParamSchema::new()
            .optional("keep_cameras", Boolean)
            .optional("keep_lights", Boolean),
        clear_scene,
    )?;
    builder.register(
        "new_scene",
        ParamSchema::new().required("name", String),
        new_scene,
    )?;
    builder.register(
        "save_scene",
        ParamSchema::new().required("filepath", String),
        save_scene,
    )?;
    builder.register(
        "load_scene",
        ParamSchema::new().required("filepath", String),
        load_scene,
    )?;
    builder.register(
        "add_camera",
        ParamSchema::new()
            .optional("name", String)
            .optional("location", Vector3)
            .optional("rotation", Vector3)
            .optional("lens", Number),
        add_camera,
    )?;
    builder.register(
        "add_light",
        ParamSchema::new()
            .optional("name", String)
            .optional("light_type", String)
            .optional("location", Vector3)
            .optional("energy", Number)
            .optional("color", Color),
        add_light,
    )?;
    builder.register(
        "set_active_camera",
        ParamSchema::new().required("name", String),
        set_active_camera,
    )?;
    builder.register(
        "set_frame",
        ParamSchema::new().required("frame", Integer),
        set_frame,
    )?;
    builder.register(
        "set_frame_range",
        ParamSchema::new()
            .required("start", Integer)
            .required("end", Integer),
        set_frame_range,
    )?;
    Ok(())
}

fn names_of(objects: &[SceneObject], kind: ObjectKind) -> Vec<&str> {
    objects
        .iter()
        .filter(|object| object.kind == kind)
        .map(|object| object.name.as_str())
        .collect()
}

fn get_scene_info(session: &mut EngineSession, _params: &Params) -> Result<Value, HandlerError> {
    let materials = session.materials().count();
    let render = session.render_settings().to_json();
    let scene = session.document_or_create();
    let frames = scene.frames();
    let objects: Vec<Value> = scene
        .objects()
        .iter()
        .map(|object| {
            json!({
                "name": object.name,
                "type": object.kind.to_string(),
                "location": object.placement.location,
                "visible": object.visible,
            })
        })
        .collect();
    Ok(json!({
        "scene_name": scene.name(),
        "frame_current": frames.current,
        "frame_start": frames.start,
        "frame_end": frames.end,
        "object_count": objects.len(),
        "objects": objects,
        "cameras": names_of(scene.objects(), ObjectKind::Camera),
        "lights": names_of(scene.objects(), ObjectKind::Light),
        "active_camera": scene.active_camera(),
        "material_count": materials,
        "render": render,
    }))
}

fn clear_scene(session: &mut EngineSession, params: &Params) -> Result<Value, HandlerError> {
    let keep_cameras = params.bool_or("keep_cameras", false);
    let keep_lights = params.bool_or("keep_lights", false);
    let scene = session.document_or_create();
    let doomed: Vec<String> = scene
        .objects()
        .iter()
        .filter(|object| match object.kind {
            ObjectKind::Camera => !keep_cameras,
            ObjectKind::Light => !keep_lights,
            _ => true,
        })
        .map(|object| object.name.clone())
        .collect();
    for name in &doomed {
        scene.remove(name);
    }
    session.touch();
    Ok(json!({ "count": doomed.len(), "deleted": doomed, "success": true }))
}

fn new_scene(session: &mut EngineSession, params: &Params) -> Result<Value, HandlerError> {
    let requested = params.str_param("name")?;
    if requested.trim().is_empty() {
        return Err(HandlerError::validation("scene name must not be empty"));
    }
    let name = session.new_document(requested);
    session.touch();
    Ok(json!({ "scene_name": name, "active": true }))
}

fn save_scene(session: &mut EngineSession, params: &Params) -> Result<Value, HandlerError> {
    let path = session.resolve_path(params.str_param("filepath")?);
    session.document_or_create();
    let scene = session
        .active_document()
        .ok_or_else(|| HandlerError::validation("No active scene to save"))?;
    let object_count = scene.len();
    let scene_name = scene.name().to_owned();
    let bytes = save(&path, &document_file(session, scene))?;
    Ok(json!({
        "filepath": path,
        "scene_name": scene_name,
        "object_count": object_count,
        "bytes": bytes,
        "success": true,
    }))
}

fn load_scene(session: &mut EngineSession, params: &Params) -> Result<Value, HandlerError> {
    let path = session.resolve_path(params.str_param("filepath")?);
    let (name, object_count) = open_file(session, &path)?;
    Ok(json!({
        "filepath": path,
        "scene_name": name,
        "object_count": object_count,
        "success": true,
    }))
}

fn add_camera(session: &mut EngineSession, params: &Params) -> Result<Value, HandlerError> {
    let lens = params.f64_or("lens", 50.0);
    if lens <= 0.0 {
        return Err(HandlerError::validation("lens must be positive"));
    }
    let placement = Placement {
        rotation: params.vec3_or("rotation", [0.0; 3]),
        ..Placement::at(params.vec3_or("location", [0.0, 0.0, 5.0]))
    };
    let camera = SceneObject::new("Camera", ObjectKind::Camera, "Camera", placement, Geometry::marker())
        .with_property("lens", lens);
    let mut description = insert_object(session, params.str_or("name", "Camera"), camera)?;
    let name = description["name"].as_str().unwrap_or_default().to_owned();
    let scene = session.document_or_create();
    if scene.active_camera().is_none() {
        scene.set_active_camera(Some(name));
    }
    description["lens"] = json!(lens);
    description["active_camera"] = json!(scene.active_camera());
    Ok(description)
}

fn add_light(session: &mut EngineSession, params: &Params) -> Result<Value, HandlerError> {
    let text = params.str_or("light_type", "POINT");
    let light_type: LightType = text.parse().map_err(|_| {
        HandlerError::validation(format!(
            "Invalid light type '{text}'; expected POINT, SUN, SPOT or AREA"
        ))
    })?;
    let energy = params.f64_or("energy", 1000.0);
    if energy < 0.0 {
        return Err(HandlerError::validation("energy must not be negative"));
    }
    let color = params.opt_color("color").unwrap_or([1.0; 4]);
    let placement = Placement::at(params.vec3_or("location", [0.0, 0.0, 5.0]));
    let light = SceneObject::new("Light", ObjectKind::Light, "Light", placement, Geometry::marker())
        .with_property("light_type", light_type.to_string())
        .with_property("energy", energy)
        .with_property("color", json!(color[..3]));
    let default_name = format!("{}Light", title_case(light_type));
    let mut description = insert_object(session, params.str_or("name", &default_name), light)?;
    description["light_type"] = json!(light_type.to_string());
    description["energy"] = json!(energy);
    Ok(description)
}

fn title_case(light_type: LightType) -> String {
    let upper = light_type.to_string();
    let mut chars = upper.chars();
    chars
        .next()
        .map(|first| first.to_string() + &chars.as_str().to_ascii_lowercase())
        .unwrap_or_default()
}

fn set_active_camera(session: &mut EngineSession, params: &Params) -> Result<Value, HandlerError> {
    let name = params.str_param("name")?;
    let object = find_object(session, name)?;
    if object.kind != ObjectKind::Camera {
        return Err(HandlerError::validation(format!(
            "Object '{name}' is not a camera"
        ))
        .with_detail("object_type", object.kind.to_string()));
    }
    session
        .document_or_create()
        .set_active_camera(Some(name.to_owned()));
    session.touch();
    Ok(json!({ "active_camera": name, "success": true }))
}

fn set_frame(session: &mut EngineSession, params: &Params) -> Result<Value, HandlerError> {
    let frame = params
        .opt_i64("frame")
        .ok_or_else(|| HandlerError::invalid_param("frame", "must be an integer"))?;
    let scene = session.document_or_create();
    scene.frames_mut().current = frame;
    let frames = scene.frames();
    session.touch();
    Ok(json!({
        "frame_current": frames.current,
        "frame_start": frames.start,
        "frame_end": frames.end,
    }))
}

fn set_frame_range(session: &mut EngineSession, params: &Params) -> Result<Value, HandlerError> {
    let (Some(start), Some(end)) = (params.opt_i64("start"), params.opt_i64("end")) else {
        return Err(HandlerError::invalid_param("start", "start and end must be integers"));
    };
    if start > end {
        return Err(HandlerError::validation(format!(
            "frame range start {start} is after end {end}"
        )));
    }
    let scene = session.document_or_create();
    let frames = scene.frames_mut();
    frames.start = start;
    frames.end = end;
    frames.current = frames.current.clamp(start, end);
    let frames = scene.frames();
    session.touch();
    Ok(json!({
        "frame_current": frames.current,
        "frame_start": frames.start,
        "frame_end": frames.end,
    }))
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("point", LightType::Point)]
    #[case("SUN", LightType::Sun)]
    #[case("Area", LightType::Area)]
    fn light_types_parse_case_insensitively(#[case] text: &str, #[case] expected: LightType) {
        assert_eq!(text.parse::<LightType>().ok(), Some(expected));
    }

    #[rstest]
    fn default_light_names_are_title_cased() {
        assert_eq!(title_case(LightType::Spot), "Spot");
    }
}
