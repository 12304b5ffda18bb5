//! Document lifecycle.

use serde_json::{Value, json};

use cadlink_protocol::Params;

use crate::dispatch::{HandlerError, ParamKind, ParamSchema, ParamsExt, RegistryBuilder, RegistryError};
use crate::handlers::shared::{document_file, open_file};
use crate::session::{DEFAULT_DOCUMENT_NAME, Document, EngineSession, save};

pub(super) fn register(builder: &mut RegistryBuilder) -> Result<(), RegistryError> {
    builder.register(
        "new_document",
        ParamSchema::new().optional("name", ParamKind::String),
        new_document,
    )?;
    builder.register("get_active_document", ParamSchema::new(), get_active_document)?;
    builder.register("list_documents", ParamSchema::new(), list_documents)?;
    builder.register(
        "close_document",
        ParamSchema::new().required("name", ParamKind::String),
        close_document,
    )?;
    builder.register(
        "set_active_document",
        ParamSchema::new().required("name", ParamKind::String),
        set_active_document,
    )?;
    builder.register(
        "save_document",
        ParamSchema::new()
            .required("filepath", ParamKind::String)
            .optional("name", ParamKind::String),
        save_document,
    )?;
    builder.register(
        "open_document",
        ParamSchema::new().required("filepath", ParamKind::String),
        open_document,
    )?;
    Ok(())
}

fn summary(document: &Document, active: Option<&str>) -> Value {
    json!({
        "name": document.name(),
        "label": document.label(),
        "object_count": document.len(),
        "active": active == Some(document.name()),
    })
}

fn new_document(session: &mut EngineSession, params: &Params) -> Result<Value, HandlerError> {
    let requested = params.str_or("name", DEFAULT_DOCUMENT_NAME);
    if requested.trim().is_empty() {
        return Err(HandlerError::validation("document name must not be empty"));
    }
    let name = session.new_document(requested);
    session.touch();
    Ok(json!({ "name": name, "label": name, "active": true }))
}

fn get_active_document(session: &mut EngineSession, _params: &Params) -> Result<Value, HandlerError> {
    Ok(match session.active_document() {
        Some(document) => {
            let objects: Vec<&str> = document
                .objects()
                .iter()
                .map(|object| object.name.as_str())
                .collect();
            let mut description = summary(document, Some(document.name()));
            description["objects"] = json!(objects);
            description
        }
        None => json!({
            "active": false,
            "name": null,
            "message": "No active document",
        }),
    })
}

fn list_documents(session: &mut EngineSession, _params: &Params) -> Result<Value, HandlerError> {
    let active = session.active_name();
    let documents: Vec<Value> = session
        .documents()
        .map(|document| summary(document, active))
        .collect();
    Ok(json!({
        "count": documents.len(),
        "documents": documents,
        "active": active,
    }))
}

fn close_document(session: &mut EngineSession, params: &Params) -> Result<Value, HandlerError> {
    let name = params.str_param("name")?;
    session
        .close_document(name)
        .ok_or_else(|| HandlerError::document_not_found(name))?;
    session.touch();
    Ok(json!({
        "closed": name,
        "active": session.active_name(),
        "success": true,
    }))
}

fn set_active_document(session: &mut EngineSession, params: &Params) -> Result<Value, HandlerError> {
    let name = params.str_param("name")?;
    if !session.set_active(name) {
        return Err(HandlerError::document_not_found(name));
    }
    session.touch();
    Ok(json!({ "active": name, "success": true }))
}

fn save_document(session: &mut EngineSession, params: &Params) -> Result<Value, HandlerError> {
    let path = session.resolve_path(params.str_param("filepath")?);
    let document = match params.opt_str("name") {
        Some(name) => session
            .document(name)
            .ok_or_else(|| HandlerError::document_not_found(name))?,
        None => session
            .active_document()
            .ok_or_else(|| HandlerError::validation("No active document to save"))?,
    };
    let name = document.name().to_owned();
    let file = document_file(session, document);
    let bytes = save(&path, &file)?;
    Ok(json!({
        "name": name,
        "filepath": path,
        "bytes": bytes,
        "success": true,
    }))
}

fn open_document(session: &mut EngineSession, params: &Params) -> Result<Value, HandlerError> {
    let path = session.resolve_path(params.str_param("filepath")?);
    let (name, object_count) = open_file(session, &path)?;
    Ok(json!({
        "name": name,
        "filepath": path,
        "object_count": object_count,
        "active": true,
    }))
}
