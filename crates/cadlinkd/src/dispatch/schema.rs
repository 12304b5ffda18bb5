//! Declarative parameter schemas checked before a handler is scheduled.

use serde_json::{Map, Value, json};
use strum::Display;

use cadlink_protocol::Params;

use super::errors::HandlerError;

/// JSON shape a parameter must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ParamKind {
    /// Any JSON number.
    Number,
    /// A whole number.
    Integer,
    /// A string.
    String,
    /// `true` or `false`.
    Boolean,
    /// Any array.
    Array,
    /// Any object.
    Object,
    /// Array of exactly three numbers.
    Vector3,
    /// Array of three or four numbers.
    Color,
    /// Array of strings.
    StringList,
    /// Anything.
    Any,
}

impl ParamKind {
    fn accepts(self, value: &Value) -> bool {
        match self {
            Self::Number => value.is_number(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::String => value.is_string(),
            Self::Boolean => value.is_boolean(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
            Self::Vector3 => numbers(value).is_some_and(|count| count == 3),
            Self::Color => numbers(value).is_some_and(|count| count == 3 || count == 4),
            Self::StringList => value
                .as_array()
                .is_some_and(|items| items.iter().all(Value::is_string)),
            Self::Any => true,
        }
    }

    const fn expectation(self) -> &'static str {
        match self {
            Self::Number => "must be a number",
            Self::Integer => "must be an integer",
            Self::String => "must be a string",
            Self::Boolean => "must be a boolean",
            Self::Array => "must be an array",
            Self::Object => "must be an object",
            Self::Vector3 => "must be an array of three numbers",
            Self::Color => "must be an array of three or four numbers",
            Self::StringList => "must be an array of strings",
            Self::Any => "is required",
        }
    }
}

fn numbers(value: &Value) -> Option<usize> {
    let items = value.as_array()?;
    items.iter().all(Value::is_number).then_some(items.len())
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ParamSpec {
    name: &'static str,
    kind: ParamKind,
    required: bool,
}

/// Parameter contract of one method.
///
/// Unknown parameters are ignored. Optional parameters may be absent or
/// `null`; required ones must be present and non-null.
///
/// # Examples
///
/// ```
/// use cadlinkd::{ParamKind, ParamSchema};
/// use serde_json::json;
///
/// let schema = ParamSchema::new()
///     .required("name", ParamKind::String)
///     .optional("radius", ParamKind::Number);
/// let params = json!({"name": "Ball", "radius": null});
/// assert!(schema.validate(params.as_object().unwrap()).is_ok());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamSchema {
    fields: Vec<ParamSpec>,
}

impl ParamSchema {
    /// Schema that accepts any parameters.
    #[must_use]
    pub const fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Adds a required parameter.
    #[must_use]
    pub fn required(mut self, name: &'static str, kind: ParamKind) -> Self {
        self.fields.push(ParamSpec {
            name,
            kind,
            required: true,
        });
        self
    }

    /// Adds an optional parameter.
    #[must_use]
    pub fn optional(mut self, name: &'static str, kind: ParamKind) -> Self {
        self.fields.push(ParamSpec {
            name,
            kind,
            required: false,
        });
        self
    }

    /// Checks parameters against the schema.
    ///
    /// # Errors
    ///
    /// Returns [`HandlerError::InvalidParams`] naming the first offending
    /// field.
    pub fn validate(&self, params: &Params) -> Result<(), HandlerError> {
        for spec in &self.fields {
            match params.get(spec.name) {
                None | Some(Value::Null) if spec.required => {
                    return Err(HandlerError::invalid_param(spec.name, "is required"));
                }
                None | Some(Value::Null) => {}
                Some(value) if !spec.kind.accepts(value) => {
                    return Err(HandlerError::invalid_param(
                        spec.name,
                        spec.kind.expectation(),
                    ));
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    /// Machine-readable description used by `list_methods`.
    #[must_use]
    pub fn describe(&self) -> Value {
        let fields: Map<String, Value> = self
            .fields
            .iter()
            .map(|spec| {
                (
                    spec.name.to_owned(),
                    json!({"type": spec.kind.to_string(), "required": spec.required}),
                )
            })
            .collect();
        Value::Object(fields)
    }
}
