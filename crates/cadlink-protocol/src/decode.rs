//! Conversion between frames and envelopes.

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::codes;
use crate::envelope::{Command, ErrorBody, Params, Response};

/// Reasons a frame could not be turned into a [`Command`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// The frame was not valid JSON.
    #[error("malformed JSON: {message}")]
    Parse {
        /// Parser diagnostic.
        message: String,
    },
    /// The frame was JSON but not a command envelope.
    #[error("invalid request: {message}")]
    Invalid {
        /// Identifier, when one could be recovered from the frame.
        id: Option<String>,
        /// What was wrong with the envelope.
        message: String,
    },
}

impl DecodeError {
    fn invalid(id: Option<&str>, message: impl Into<String>) -> Self {
        Self::Invalid {
            id: id.map(ToOwned::to_owned),
            message: message.into(),
        }
    }

    /// Returns the recovered command identifier, if any.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        match self {
            Self::Parse { .. } => None,
            Self::Invalid { id, .. } => id.as_deref(),
        }
    }

    /// Builds the wire response reporting this failure.
    #[must_use]
    pub fn into_response(self) -> Response {
        match self {
            Self::Parse { message } => Response::failure(
                None,
                ErrorBody::new(codes::PARSE_ERROR, format!("malformed JSON: {message}")),
            ),
            Self::Invalid { id, message } => {
                Response::failure(id, ErrorBody::new(codes::INVALID_REQUEST, message))
            }
        }
    }
}

/// Parses one frame into a command.
///
/// Trailing whitespace, including a carriage return, is ignored. `params` may
/// be omitted or `null`, in which case it is empty.
///
/// # Errors
///
/// Returns [`DecodeError::Parse`] for invalid JSON and
/// [`DecodeError::Invalid`] when the envelope lacks a string `id` or `method`,
/// or when `params` is not an object.
pub fn decode_command(line: &[u8]) -> Result<Command, DecodeError> {
    let value: Value = serde_json::from_slice(line.trim_ascii_end()).map_err(|error| {
        DecodeError::Parse {
            message: error.to_string(),
        }
    })?;
    let Value::Object(mut envelope) = value else {
        return Err(DecodeError::invalid(None, "request must be a JSON object"));
    };

    let id = match envelope.remove("id") {
        Some(Value::String(id)) if !id.is_empty() => id,
        Some(Value::String(_)) => return Err(DecodeError::invalid(None, "'id' must not be empty")),
        Some(_) => return Err(DecodeError::invalid(None, "'id' must be a string")),
        None => return Err(DecodeError::invalid(None, "missing 'id'")),
    };

    let method = match envelope.remove("method") {
        Some(Value::String(method)) if !method.trim().is_empty() => method,
        Some(Value::String(_)) => {
            return Err(DecodeError::invalid(Some(&id), "'method' must not be empty"));
        }
        Some(_) => return Err(DecodeError::invalid(Some(&id), "'method' must be a string")),
        None => return Err(DecodeError::invalid(Some(&id), "missing 'method'")),
    };

    let params = match envelope.remove("params") {
        None | Some(Value::Null) => Params::new(),
        Some(Value::Object(params)) => params,
        Some(_) => {
            return Err(DecodeError::invalid(Some(&id), "'params' must be an object"));
        }
    };

    Ok(Command { id, method, params })
}

/// Serialises a value as one newline-terminated frame.
///
/// # Errors
///
/// Propagates serialisation failures from `serde_json`.
pub fn encode_line<T: Serialize>(value: &T) -> Result<Vec<u8>, serde_json::Error> {
    let mut line = serde_json::to_vec(value)?;
    line.push(b'\n');
    Ok(line)
}
