//! Command and response envelopes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Named parameters of a command.
pub type Params = Map<String, Value>;

/// A single request sent to an engine.
///
/// The identifier is chosen by the client and echoed unchanged in the
/// matching [`Response`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    /// Client-chosen correlation identifier.
    pub id: String,
    /// Name of the registered handler to invoke.
    pub method: String,
    /// Handler parameters.
    #[serde(default)]
    pub params: Params,
}

impl Command {
    /// Builds a command.
    #[must_use]
    pub fn new(id: impl Into<String>, method: impl Into<String>, params: Params) -> Self {
        Self {
            id: id.into(),
            method: method.into(),
            params,
        }
    }
}

/// Outcome marker of a [`Response`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// The handler produced a result.
    Success,
    /// The command failed; see the error body.
    Error,
}

/// Structured error attached to failed responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Machine-readable code, see [`crate::codes`].
    pub code: String,
    /// Human-readable explanation.
    pub message: String,
    /// Optional structured context, such as the offending field name.
    #[serde(default)]
    pub details: Option<Map<String, Value>>,
}

impl ErrorBody {
    /// Builds an error body without details.
    #[must_use]
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    /// Attaches structured details.
    #[must_use]
    pub fn with_details(mut self, details: Map<String, Value>) -> Self {
        self.details = Some(details);
        self
    }

    /// Attaches a single detail entry, keeping any existing ones.
    #[must_use]
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details
            .get_or_insert_with(Map::new)
            .insert(key.into(), value.into());
        self
    }
}

/// Reply to exactly one received frame.
///
/// Exactly one of `result` and `error` is populated, matching `status`. Both
/// keys are always present on the wire, as `null` when unused.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawResponse")]
pub struct Response {
    /// Echoed command identifier, or `None` when it could not be recovered.
    pub id: Option<String>,
    /// Outcome marker.
    pub status: Status,
    /// Handler result for successful commands.
    pub result: Option<Value>,
    /// Error body for failed commands.
    pub error: Option<ErrorBody>,
}

impl Response {
    /// Builds a success response.
    #[must_use]
    pub fn success(id: impl Into<String>, result: Value) -> Self {
        Self {
            id: Some(id.into()),
            status: Status::Success,
            result: Some(result),
            error: None,
        }
    }

    /// Builds an error response.
    #[must_use]
    pub const fn failure(id: Option<String>, error: ErrorBody) -> Self {
        Self {
            id,
            status: Status::Error,
            result: None,
            error: Some(error),
        }
    }

    /// Returns `true` when the response reports success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }

    /// Returns the error code for failed responses.
    #[must_use]
    pub fn error_code(&self) -> Option<&str> {
        self.error.as_ref().map(|error| error.code.as_str())
    }

    /// Parses a response line received from an engine.
    ///
    /// # Errors
    ///
    /// Returns [`ResponseError::Json`] when the line is not a response object
    /// and [`ResponseError::Inconsistent`] when the status disagrees with the
    /// populated fields.
    pub fn parse(line: &[u8]) -> Result<Self, ResponseError> {
        let raw: RawResponse =
            serde_json::from_slice(line).map_err(|source| ResponseError::Json { source })?;
        Self::try_from(raw)
    }
}

/// Errors raised while parsing engine responses.
#[derive(Debug, Error)]
pub enum ResponseError {
    /// The line was not a JSON response object.
    #[error("malformed response: {source}")]
    Json {
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
    /// The status disagreed with the populated fields.
    #[error("inconsistent response: {message}")]
    Inconsistent {
        /// Description of the mismatch.
        message: &'static str,
    },
}

#[derive(Deserialize)]
struct RawResponse {
    id: Option<String>,
    status: Status,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<ErrorBody>,
}

impl TryFrom<RawResponse> for Response {
    type Error = ResponseError;

    fn try_from(raw: RawResponse) -> Result<Self, Self::Error> {
        match (raw.status, raw.error) {
            (Status::Success, None) => Ok(Self {
                id: raw.id,
                status: Status::Success,
                result: Some(raw.result.unwrap_or(Value::Null)),
                error: None,
            }),
            (Status::Error, Some(error)) if raw.result.is_none() => {
                Ok(Self::failure(raw.id, error))
            }
            (Status::Success, Some(_)) => Err(ResponseError::Inconsistent {
                message: "success status carries an error",
            }),
            (Status::Error, Some(_)) => Err(ResponseError::Inconsistent {
                message: "error status carries a result",
            }),
            (Status::Error, None) => Err(ResponseError::Inconsistent {
                message: "error status without an error body",
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    #[rstest]
    fn success_serialises_null_error() {
        let response = Response::success("a1", json!({"ok": true}));
        let value = serde_json::to_value(&response).expect("serialise");
        assert_eq!(
            value,
            json!({"id": "a1", "status": "success", "result": {"ok": true}, "error": null})
        );
    }

    #[rstest]
    fn failure_serialises_null_result() {
        let response = Response::failure(
            None,
            ErrorBody::new("PARSE_ERROR", "bad").with_detail("line", 1),
        );
        let value = serde_json::to_value(&response).expect("serialise");
        assert_eq!(value["id"], Value::Null);
        assert_eq!(value["result"], Value::Null);
        assert_eq!(value["error"]["code"], "PARSE_ERROR");
        assert_eq!(value["error"]["details"]["line"], 1);
    }

    #[rstest]
    #[case(br#"{"id":"x","status":"success","result":1,"error":{"code":"A","message":"b"}}"#)]
    #[case(br#"{"id":"x","status":"error","result":1,"error":{"code":"A","message":"b"}}"#)]
    #[case(br#"{"id":"x","status":"error","result":null,"error":null}"#)]
    fn parse_rejects_inconsistent_responses(#[case] line: &[u8]) {
        let error = Response::parse(line).expect_err("inconsistent response");
        assert!(
            matches!(error, ResponseError::Inconsistent { .. }),
            "unexpected error: {error:?}"
        );
    }

    #[rstest]
    fn parse_accepts_null_success_result() {
        let response = Response::parse(br#"{"id":"x","status":"success","result":null,"error":null}"#)
            .expect("parse");
        assert!(response.is_success());
        assert_eq!(response.result, Some(Value::Null));
    }

    #[rstest]
    fn parse_reports_malformed_json() {
        let error = Response::parse(b"{nope").expect_err("malformed");
        assert!(matches!(error, ResponseError::Json { .. }));
    }
}
