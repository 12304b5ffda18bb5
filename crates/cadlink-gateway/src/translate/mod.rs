//! Translation between gateway-facing surfaces and engine commands.
//!
//! Route definitions live with whichever HTTP or WebSocket server embeds the
//! gateway. This module only fixes how an engine outcome is presented:
//! [`http`] maps outcomes onto a status code and JSON body, [`websocket`]
//! turns typed envelopes into commands and their replies.

pub mod http;
pub mod websocket;

use cadlink_protocol::{ErrorBody, ErrorClass};

use crate::error::GatewayError;

/// Error code for unreachable, saturated or slow engines.
pub const BACKEND_UNAVAILABLE: &str = "BACKEND_UNAVAILABLE";
/// Error code for engines that broke the wire protocol.
pub const BAD_GATEWAY: &str = "BAD_GATEWAY";

const UNAVAILABLE_MESSAGE: &str = "backend unavailable";
const INTERNAL_MESSAGE: &str = "internal engine error";

/// Strips engine internals from an error body before it leaves the gateway.
///
/// Client errors keep their details so callers can see the offending field.
/// Handler faults keep code and message but lose details, and internal
/// errors are replaced by a generic message.
#[must_use]
pub fn sanitise(error: &ErrorBody) -> ErrorBody {
    match ErrorClass::of(&error.code) {
        ErrorClass::Malformed | ErrorClass::UnknownMethod | ErrorClass::InvalidParams => {
            error.clone()
        }
        ErrorClass::Unavailable => ErrorBody::new(error.code.clone(), UNAVAILABLE_MESSAGE),
        ErrorClass::HandlerFault => ErrorBody::new(error.code.clone(), error.message.clone()),
        ErrorClass::Internal => ErrorBody::new(error.code.clone(), INTERNAL_MESSAGE),
    }
}

/// Describes a gateway failure as an error body.
#[must_use]
pub fn gateway_error_body(error: &GatewayError) -> ErrorBody {
    let body = match error.last() {
        GatewayError::Connection { engine, .. }
        | GatewayError::Timeout { engine, .. }
        | GatewayError::PoolExhausted { engine, .. } => {
            ErrorBody::new(BACKEND_UNAVAILABLE, UNAVAILABLE_MESSAGE)
                .with_detail("engine", engine.to_string())
        }
        GatewayError::Protocol { engine, .. } => {
            ErrorBody::new(BAD_GATEWAY, "engine sent an invalid response")
                .with_detail("engine", engine.to_string())
        }
        GatewayError::Exhausted { .. } => ErrorBody::new(BACKEND_UNAVAILABLE, UNAVAILABLE_MESSAGE),
    };
    match error {
        GatewayError::Exhausted { attempts, .. } => body.with_detail("attempts", *attempts),
        _ => body,
    }
}
