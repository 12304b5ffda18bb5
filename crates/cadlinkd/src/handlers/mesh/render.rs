//! Render settings, image renders and mesh exports.

use serde_json::{Value, json};

use cadlink_protocol::{Params, codes};

use crate::dispatch::{HandlerError, ParamKind, ParamSchema, ParamsExt, RegistryBuilder, RegistryError};
use crate::handlers::shared;
use crate::kernel::{ExportFormat, ImageFormat, RenderItem, RenderRequest};
use crate::session::{DEFAULT_COLOR, EngineSession, RenderEngine};

pub(super) fn register(builder: &mut RegistryBuilder) -> Result<(), RegistryError> {
    builder.register(
        "set_render_engine",
        ParamSchema::new().required("engine", ParamKind::String),
        set_render_engine,
    )?;
    builder.register(
        "set_render_resolution",
        ParamSchema::new()
            .required("width", ParamKind::Integer)
            .required("height", ParamKind::Integer)
            .optional("percentage", ParamKind::Integer),
        set_render_resolution,
    )?;
    builder.register(
        "set_render_samples",
        ParamSchema::new().required("samples", ParamKind::Integer),
        set_render_samples,
    )?;
    builder.register(
        "render_image",
        ParamSchema::new()
            .required("output_path", ParamKind::String)
            .optional("file_format", ParamKind::String),
        render_image,
    )?;
    let export_schema = || {
        ParamSchema::new()
            .required("filepath", ParamKind::String)
            .optional("objects", ParamKind::StringList)
    };
    builder.register("export_obj", export_schema(), |session, params| {
        shared::export(session, params, ExportFormat::Obj)
    })?;
    builder.register("export_stl", export_schema(), |session, params| {
        shared::export(session, params, ExportFormat::Stl)
    })?;
    Ok(())
}

fn parse_engine(text: &str) -> Option<RenderEngine> {
    match text.to_ascii_uppercase().as_str() {
        "EEVEE" => Some(RenderEngine::BlenderEevee),
        "WORKBENCH" => Some(RenderEngine::BlenderWorkbench),
        other => other.parse().ok(),
    }
}

fn parse_image_format(text: &str) -> Option<ImageFormat> {
    match text.to_ascii_uppercase().as_str() {
        "JPG" => Some(ImageFormat::Jpeg),
        other => other.parse().ok(),
    }
}

fn positive(name: &str, params: &Params, default: Option<u64>) -> Result<u32, HandlerError> {
    let value = params
        .opt_u64(name)
        .or(default)
        .filter(|value| *value >= 1)
        .ok_or_else(|| HandlerError::validation(format!("{name} must be at least 1")))?;
    u32::try_from(value).map_err(|_| HandlerError::validation(format!("{name} is too large")))
}

fn set_render_engine(session: &mut EngineSession, params: &Params) -> Result<Value, HandlerError> {
    let text = params.str_param("engine")?;
    let engine = parse_engine(text).ok_or_else(|| {
        HandlerError::validation(format!("Invalid render engine '{text}'"))
            .with_detail("engine", text)
    })?;
    session.render_settings_mut().engine = engine;
    session.touch();
    Ok(json!({ "engine": engine.to_string(), "success": true }))
}

fn set_render_resolution(
    session: &mut EngineSession,
    params: &Params,
) -> Result<Value, HandlerError> {
    let width = positive("width", params, None)?;
    let height = positive("height", params, None)?;
    let percentage = positive("percentage", params, Some(100))?;
    let settings = session.render_settings_mut();
    settings.resolution_x = width;
    settings.resolution_y = height;
    settings.percentage = percentage;
    let (output_x, output_y) = settings.output_size();
    session.touch();
    Ok(json!({
        "resolution_x": width,
        "resolution_y": height,
        "resolution_percentage": percentage,
        "output_size": [output_x, output_y],
    }))
}

fn set_render_samples(session: &mut EngineSession, params: &Params) -> Result<Value, HandlerError> {
    let samples = positive("samples", params, None)?;
    session.render_settings_mut().samples = samples;
    session.touch();
    Ok(json!({ "samples": samples, "success": true }))
}

fn render_image(session: &mut EngineSession, params: &Params) -> Result<Value, HandlerError> {
    let output_path = session.resolve_path(params.str_param("output_path")?);
    let format_text = params.str_or("file_format", "PPM");
    let format = parse_image_format(format_text).ok_or_else(|| {
        HandlerError::validation(format!("Unsupported image format '{format_text}'"))
    })?;
    let settings = *session.render_settings();
    let (width, height) = settings.output_size();
    let items: Vec<RenderItem> = session
        .active_document()
        .map(|scene| {
            scene
                .objects()
                .iter()
                .filter(|object| object.visible && object.is_geometric())
                .map(|object| RenderItem {
                    bounds: object.world_geometry().bounds,
                    color: object
                        .material
                        .as_deref()
                        .and_then(|name| session.material(name))
                        .map_or(DEFAULT_COLOR, |material| material.color),
                })
                .collect()
        })
        .unwrap_or_default();
    let request = RenderRequest {
        path: output_path.clone(),
        format,
        width,
        height,
        items,
    };
    let summary = session
        .kernel()
        .render(&request)
        .map_err(|error| HandlerError::kernel(codes::RENDER_ERROR, &error))?;
    Ok(json!({
        "output_path": output_path,
        "file_format": format.to_string(),
        "resolution": [width, height],
        "engine": settings.engine.to_string(),
        "bytes": summary.bytes,
        "success": true,
    }))
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("EEVEE", Some(RenderEngine::BlenderEevee))]
    #[case("workbench", Some(RenderEngine::BlenderWorkbench))]
    #[case("CYCLES", Some(RenderEngine::Cycles))]
    #[case("BLENDER_EEVEE_NEXT", Some(RenderEngine::BlenderEeveeNext))]
    #[case("POVRAY", None)]
    fn render_engines_accept_short_aliases(
        #[case] text: &str,
        #[case] expected: Option<RenderEngine>,
    ) {
        assert_eq!(parse_engine(text), expected);
    }

    #[rstest]
    #[case("jpg", Some(ImageFormat::Jpeg))]
    #[case("PNG", Some(ImageFormat::Png))]
    #[case("tiff", None)]
    fn image_formats_accept_common_spellings(
        #[case] text: &str,
        #[case] expected: Option<ImageFormat>,
    ) {
        assert_eq!(parse_image_format(text), expected);
    }
}
