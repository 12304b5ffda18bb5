//! Error types produced by command handlers and registry construction.
//!
//! Handlers report failures as [`HandlerError`] values. The dispatcher turns
//! them into wire error bodies; handlers never build responses themselves.

use serde_json::{Map, Value};
use thiserror::Error;

use cadlink_protocol::{ErrorBody, codes};

use crate::kernel::KernelError;
use crate::session::PersistError;

/// Failure reported by a handler.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum HandlerError {
    /// A parameter failed validation.
    #[error("invalid parameter '{field}': {message}")]
    InvalidParams {
        /// Offending parameter.
        field: String,
        /// What was wrong with it.
        message: String,
    },
    /// The handler ran and reported a domain failure.
    #[error("{message}")]
    Fault {
        /// Wire error code.
        code: String,
        /// Human-readable explanation.
        message: String,
        /// Structured context.
        details: Option<Map<String, Value>>,
    },
}

impl HandlerError {
    /// Creates a parameter validation error.
    pub fn invalid_param(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidParams {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates a domain failure with an arbitrary code.
    pub fn fault(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Fault {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    /// Attaches a detail entry to a fault. Parameter errors are returned
    /// unchanged.
    #[must_use]
    pub fn with_detail(self, key: &str, value: impl Into<Value>) -> Self {
        match self {
            Self::Fault {
                code,
                message,
                details,
            } => {
                let mut details = details.unwrap_or_default();
                details.insert(key.to_owned(), value.into());
                Self::Fault {
                    code,
                    message,
                    details: Some(details),
                }
            }
            other => other,
        }
    }

    /// Creates an object-not-found error.
    pub fn object_not_found(name: &str) -> Self {
        Self::fault(codes::OBJECT_NOT_FOUND, format!("Object '{name}' not found"))
            .with_detail("object_name", name)
    }

    /// Creates a material-not-found error.
    pub fn material_not_found(name: &str) -> Self {
        Self::fault(
            codes::MATERIAL_NOT_FOUND,
            format!("Material '{name}' not found"),
        )
        .with_detail("material_name", name)
    }

    /// Creates a document-not-found error.
    pub fn document_not_found(name: &str) -> Self {
        Self::fault(
            codes::DOCUMENT_NOT_FOUND,
            format!("Document '{name}' not found"),
        )
        .with_detail("document_name", name)
    }

    /// Creates a semantic validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::fault(codes::VALIDATION_ERROR, message)
    }

    /// Creates a modelling command error.
    pub fn command(message: impl Into<String>) -> Self {
        Self::fault(codes::COMMAND_ERROR, message)
    }

    /// Wraps a kernel failure under the given code.
    ///
    /// Invalid geometry always maps to `COMMAND_ERROR`, whatever the caller
    /// was doing.
    pub fn kernel(code: &str, error: &KernelError) -> Self {
        match error {
            KernelError::Invalid { message } => Self::command(message.clone()),
            other => Self::fault(code, other.to_string()),
        }
    }

    /// Converts the error into a wire error body.
    #[must_use]
    pub fn into_body(self) -> ErrorBody {
        match self {
            Self::InvalidParams { field, message } => {
                let text = format!("invalid parameter '{field}': {message}");
                ErrorBody::new(codes::INVALID_PARAMS, text).with_detail("field", field)
            }
            Self::Fault {
                code,
                message,
                details,
            } => {
                let body = ErrorBody::new(code, message);
                match details {
                    Some(details) => body.with_details(details),
                    None => body,
                }
            }
        }
    }

    /// Wire code this error maps to.
    #[must_use]
    pub fn code(&self) -> &str {
        match self {
            Self::InvalidParams { .. } => codes::INVALID_PARAMS,
            Self::Fault { code, .. } => code,
        }
    }
}

impl From<PersistError> for HandlerError {
    fn from(error: PersistError) -> Self {
        Self::fault(codes::IO_ERROR, error.to_string())
    }
}

/// Errors surfaced while building a method registry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// Two handlers were registered under the same method name.
    #[error("a handler for '{method}' is already registered")]
    DuplicateHandler {
        /// Conflicting method name.
        method: String,
    },
}
