//! HTTP presentation of engine outcomes.

use serde::Serialize;
use serde_json::{Value, json};

use cadlink_protocol::{ErrorBody, ErrorClass, Response};

use super::{gateway_error_body, sanitise};
use crate::error::GatewayError;

/// 200 OK.
pub const OK: u16 = 200;
/// 400 Bad Request.
pub const BAD_REQUEST: u16 = 400;
/// 404 Not Found.
pub const NOT_FOUND: u16 = 404;
/// 422 Unprocessable Content.
pub const UNPROCESSABLE: u16 = 422;
/// 500 Internal Server Error.
pub const INTERNAL: u16 = 500;
/// 502 Bad Gateway.
pub const BAD_GATEWAY: u16 = 502;
/// 503 Service Unavailable.
pub const UNAVAILABLE: u16 = 503;

/// Status code and JSON body for one HTTP reply.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HttpReply {
    /// HTTP status code.
    pub status: u16,
    /// JSON body.
    pub body: Value,
}

impl HttpReply {
    fn error(status: u16, error: &ErrorBody) -> Self {
        Self {
            status,
            body: json!({ "success": false, "error": error }),
        }
    }
}

/// Maps the outcome of [`crate::GatewayClient::send_command`] to a reply.
///
/// # Examples
///
/// ```
/// use cadlink_gateway::translate::http::{self, http_reply};
/// use cadlink_protocol::{ErrorBody, Response, codes};
///
/// let failure = Response::failure(
///     Some("gw-1".to_owned()),
///     ErrorBody::new(codes::UNKNOWN_METHOD, "unknown method 'fly'"),
/// );
/// assert_eq!(http_reply(&Ok(failure)).status, http::NOT_FOUND);
/// ```
#[must_use]
pub fn http_reply(outcome: &Result<Response, GatewayError>) -> HttpReply {
    match outcome {
        Ok(response) => response_reply(response),
        Err(error) => error_reply(error),
    }
}

/// Reply for a well-formed engine response.
#[must_use]
pub fn response_reply(response: &Response) -> HttpReply {
    match &response.error {
        None => HttpReply {
            status: OK,
            body: json!({
                "success": true,
                "result": response.result.clone().unwrap_or(Value::Null),
            }),
        },
        Some(error) => HttpReply::error(status_for_code(&error.code), &sanitise(error)),
    }
}

/// Reply for a gateway failure.
#[must_use]
pub fn error_reply(error: &GatewayError) -> HttpReply {
    let status = match error.last() {
        GatewayError::Protocol { .. } => BAD_GATEWAY,
        _ => UNAVAILABLE,
    };
    HttpReply::error(status, &gateway_error_body(error))
}

/// Status code for a wire error code.
#[must_use]
pub fn status_for_code(code: &str) -> u16 {
    match ErrorClass::of(code) {
        ErrorClass::Malformed => BAD_REQUEST,
        ErrorClass::UnknownMethod => NOT_FOUND,
        ErrorClass::InvalidParams => UNPROCESSABLE,
        ErrorClass::Unavailable => UNAVAILABLE,
        ErrorClass::HandlerFault | ErrorClass::Internal => INTERNAL,
    }
}
