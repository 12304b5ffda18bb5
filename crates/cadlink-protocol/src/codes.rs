//! Error codes carried in the `error.code` field of failed responses.
//!
//! Protocol-level codes are produced by the engine framing and dispatch layers
//! and are fixed. Handler fault codes are open-ended: handlers may report any
//! upper-snake-case code, and the ones listed here are the vocabulary used by
//! the bundled engines.

use strum::{Display, EnumString};

/// The frame was not valid JSON.
pub const PARSE_ERROR: &str = "PARSE_ERROR";
/// The frame was JSON but not a well-formed command envelope.
pub const INVALID_REQUEST: &str = "INVALID_REQUEST";
/// No handler is registered for the requested method.
pub const UNKNOWN_METHOD: &str = "UNKNOWN_METHOD";
/// The parameters failed schema validation.
pub const INVALID_PARAMS: &str = "INVALID_PARAMS";
/// The handler panicked or the engine hit an unexpected fault.
pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
/// The engine stopped accepting work.
pub const SHUTTING_DOWN: &str = "SHUTTING_DOWN";

/// A named object does not exist in the active document.
pub const OBJECT_NOT_FOUND: &str = "OBJECT_NOT_FOUND";
/// A named material does not exist.
pub const MATERIAL_NOT_FOUND: &str = "MATERIAL_NOT_FOUND";
/// A named document does not exist.
pub const DOCUMENT_NOT_FOUND: &str = "DOCUMENT_NOT_FOUND";
/// Parameters were well-typed but semantically invalid.
pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
/// A modelling command could not be carried out.
pub const COMMAND_ERROR: &str = "COMMAND_ERROR";
/// Writing an export failed or the format is unsupported.
pub const EXPORT_ERROR: &str = "EXPORT_ERROR";
/// Rendering failed.
pub const RENDER_ERROR: &str = "RENDER_ERROR";
/// The geometry kernel has no scripting runtime.
pub const SCRIPT_UNAVAILABLE: &str = "SCRIPT_UNAVAILABLE";
/// Reading or writing a session file failed.
pub const IO_ERROR: &str = "IO_ERROR";

/// Coarse grouping of error codes used when translating responses for outer
/// surfaces such as HTTP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorClass {
    /// The frame itself was unusable.
    Malformed,
    /// The method does not exist.
    UnknownMethod,
    /// The parameters were rejected before or during execution.
    InvalidParams,
    /// The engine is draining and refused the command.
    Unavailable,
    /// The handler ran and reported a domain failure.
    HandlerFault,
    /// Unexpected engine fault.
    Internal,
}

impl ErrorClass {
    /// Classifies a wire error code.
    ///
    /// # Examples
    ///
    /// ```
    /// use cadlink_protocol::{ErrorClass, codes};
    ///
    /// assert_eq!(ErrorClass::of(codes::PARSE_ERROR), ErrorClass::Malformed);
    /// assert_eq!(ErrorClass::of("OBJECT_NOT_FOUND"), ErrorClass::HandlerFault);
    /// ```
    #[must_use]
    pub fn of(code: &str) -> Self {
        match code {
            PARSE_ERROR | INVALID_REQUEST => Self::Malformed,
            UNKNOWN_METHOD => Self::UnknownMethod,
            INVALID_PARAMS | VALIDATION_ERROR => Self::InvalidParams,
            SHUTTING_DOWN => Self::Unavailable,
            INTERNAL_ERROR => Self::Internal,
            _ => Self::HandlerFault,
        }
    }
}
