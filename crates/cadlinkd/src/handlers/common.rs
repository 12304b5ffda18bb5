//! Methods every engine serves.

use std::sync::Arc;

use serde_json::{Map, Value, json};

use cadlink_protocol::{Params, codes};

use super::PROTOCOL_VERSION;
use crate::dispatch::{HandlerError, ParamKind, ParamSchema, ParamsExt, RegistryBuilder, RegistryError};
use crate::session::EngineSession;

pub(super) fn register(builder: &mut RegistryBuilder) -> Result<(), RegistryError> {
    builder.register("ping", ParamSchema::new(), ping)?;
    builder.register("get_version", ParamSchema::new(), get_version)?;
    builder.register(
        "execute_python",
        ParamSchema::new().required("code", ParamKind::String),
        execute_python,
    )?;
    Ok(())
}

/// Registers `list_methods`, describing every method registered so far plus
/// itself. Call last.
pub(super) fn register_introspection(builder: &mut RegistryBuilder) -> Result<(), RegistryError> {
    let schema = ParamSchema::new();
    let mut catalogue: Map<String, Value> = builder
        .method_names()
        .into_iter()
        .filter_map(|name| {
            let description = builder.schema(&name)?.describe();
            Some((name, description))
        })
        .collect();
    catalogue.insert("list_methods".to_owned(), schema.describe());
    let catalogue = Arc::new(catalogue);
    builder.register("list_methods", schema, move |session, _| {
        Ok(json!({
            "engine": session.kind().to_string(),
            "methods": catalogue.as_ref(),
            "count": catalogue.len(),
        }))
    })
}

fn ping(session: &mut EngineSession, _params: &Params) -> Result<Value, HandlerError> {
    Ok(json!({
        "pong": true,
        "engine": session.kind().to_string(),
    }))
}

fn get_version(session: &mut EngineSession, _params: &Params) -> Result<Value, HandlerError> {
    let kernel = session.kernel().info();
    Ok(json!({
        "engine": session.kind().to_string(),
        "version": env!("CARGO_PKG_VERSION"),
        "protocol": PROTOCOL_VERSION,
        "kernel": kernel.name,
        "kernel_version": kernel.version,
    }))
}

fn execute_python(session: &mut EngineSession, params: &Params) -> Result<Value, HandlerError> {
    let code = params.str_param("code")?;
    let result = session
        .kernel()
        .run_script(code)
        .map_err(|error| HandlerError::kernel(codes::SCRIPT_UNAVAILABLE, &error))?;
    session.touch();
    Ok(json!({ "result": result }))
}
