//! Helpers used by handlers of both engines.

use std::collections::BTreeSet;

use camino::Utf8Path;
use serde_json::{Value, json};

use cadlink_protocol::{Params, codes};

use crate::dispatch::{HandlerError, ParamsExt};
use crate::kernel::{ExportFormat, ExportItem, ExportRequest};
use crate::session::{Document, DocumentFile, EngineSession, SceneObject, load};

/// Looks up an object in the active document.
pub(super) fn find_object<'a>(
    session: &'a EngineSession,
    name: &str,
) -> Result<&'a SceneObject, HandlerError> {
    session
        .active_document()
        .and_then(|document| document.get(name))
        .ok_or_else(|| HandlerError::object_not_found(name))
}

/// Looks up an object in the active document for modification.
pub(super) fn find_object_mut<'a>(
    session: &'a mut EngineSession,
    name: &str,
) -> Result<&'a mut SceneObject, HandlerError> {
    session
        .active_document_mut()
        .and_then(|document| document.get_mut(name))
        .ok_or_else(|| HandlerError::object_not_found(name))
}

/// Wraps a copy of `document` for saving, together with the materials its
/// objects use.
pub(super) fn document_file(session: &EngineSession, document: &Document) -> DocumentFile {
    let used: BTreeSet<&str> = document
        .objects()
        .iter()
        .filter_map(|object| object.material.as_deref())
        .collect();
    let materials = used
        .into_iter()
        .filter_map(|name| session.material(name))
        .cloned()
        .collect();
    DocumentFile::new(session.kind(), document.clone(), materials)
}

/// Loads a document file into the session and activates it. Materials the
/// session lacks are added; existing ones win.
///
/// Returns the document name actually used and its object count.
pub(super) fn open_file(
    session: &mut EngineSession,
    path: &Utf8Path,
) -> Result<(String, usize), HandlerError> {
    let file = load(path)?;
    if file.engine != session.kind() {
        return Err(HandlerError::validation(format!(
            "'{path}' was saved by the {} engine",
            file.engine
        )));
    }
    for material in file.materials {
        if session.material(&material.name).is_none() {
            session.add_material(material);
        }
    }
    let object_count = file.document.len();
    let name = session.adopt_document(file.document);
    session.touch();
    Ok((name, object_count))
}

/// Objects to export: the named ones, or every geometric object of the
/// active document.
fn export_items(
    session: &EngineSession,
    names: Option<Vec<String>>,
) -> Result<Vec<ExportItem>, HandlerError> {
    let items: Vec<ExportItem> = match names {
        Some(names) => names
            .iter()
            .map(|name| {
                find_object(session, name).map(|object| ExportItem {
                    name: object.name.clone(),
                    bounds: object.world_geometry().bounds,
                })
            })
            .collect::<Result<_, _>>()?,
        None => session
            .active_document()
            .map(|document| {
                document
                    .objects()
                    .iter()
                    .filter(|object| object.is_geometric())
                    .map(|object| ExportItem {
                        name: object.name.clone(),
                        bounds: object.world_geometry().bounds,
                    })
                    .collect()
            })
            .unwrap_or_default(),
    };
    if items.is_empty() {
        return Err(HandlerError::fault(codes::EXPORT_ERROR, "No objects to export"));
    }
    Ok(items)
}

/// Shared body of the `export_*` methods: `filepath` plus optional `objects`.
pub(super) fn export(
    session: &EngineSession,
    params: &Params,
    format: ExportFormat,
) -> Result<Value, HandlerError> {
    let filepath = params.str_param("filepath")?;
    let items = export_items(session, params.opt_string_list("objects"))?;
    let path = session.resolve_path(filepath);
    let objects: Vec<String> = items.iter().map(|item| item.name.clone()).collect();
    let request = ExportRequest {
        format,
        path: path.clone(),
        items,
    };
    let summary = session
        .kernel()
        .export(&request)
        .map_err(|error| HandlerError::kernel(codes::EXPORT_ERROR, &error))?;
    Ok(json!({
        "success": true,
        "filepath": path,
        "format": format.to_string().to_ascii_uppercase(),
        "object_count": objects.len(),
        "objects": objects,
        "bytes": summary.bytes,
    }))
}

/// Converts a unit quaternion `[x, y, z, w]` to XYZ Euler angles in radians.
pub(super) fn euler_from_quaternion([x, y, z, w]: [f64; 4]) -> [f64; 3] {
    let roll = (2.0 * (w * x + y * z)).atan2(1.0 - 2.0 * (x * x + y * y));
    let pitch = (2.0 * (w * y - z * x)).clamp(-1.0, 1.0).asin();
    let yaw = (2.0 * (w * z + x * y)).atan2(1.0 - 2.0 * (y * y + z * z));
    [roll, pitch, yaw]
}
