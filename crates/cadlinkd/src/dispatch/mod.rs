//! Command dispatch.
//!
//! A decoded [`cadlink_protocol::Command`] is looked up in the
//! [`Registry`], its parameters are checked against the method's
//! [`ParamSchema`], and the handler is handed to the engine's scheduler as a
//! job. Whatever happens, the caller receives exactly one
//! [`cadlink_protocol::Response`].

mod dispatcher;
mod errors;
mod params;
mod registry;
mod schema;

pub use dispatcher::Dispatcher;
pub use errors::{HandlerError, RegistryError};
pub use params::ParamsExt;
pub use registry::{HandlerFn, MethodEntry, Registry, RegistryBuilder};
pub use schema::{ParamKind, ParamSchema};

pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");
