//! Typed accessors over validated command parameters.
//!
//! Schemas run before handlers, so these getters only fall back to defaults
//! for absent or `null` values; they never need to report type errors except
//! for required strings, which are re-checked for handlers invoked directly.

use serde_json::Value;

use cadlink_protocol::Params;

use super::errors::HandlerError;
use crate::kernel::Vec3;

/// Accessors for [`Params`].
pub trait ParamsExt {
    /// Required string parameter.
    ///
    /// # Errors
    ///
    /// Returns [`HandlerError::InvalidParams`] when absent or not a string.
    fn str_param(&self, name: &str) -> Result<&str, HandlerError>;
    /// Optional string parameter.
    fn opt_str(&self, name: &str) -> Option<&str>;
    /// Optional number parameter.
    fn opt_f64(&self, name: &str) -> Option<f64>;
    /// Optional non-negative integer parameter.
    fn opt_u64(&self, name: &str) -> Option<u64>;
    /// Optional integer parameter.
    fn opt_i64(&self, name: &str) -> Option<i64>;
    /// Optional boolean parameter.
    fn opt_bool(&self, name: &str) -> Option<bool>;
    /// Optional three-component vector.
    fn opt_vec3(&self, name: &str) -> Option<Vec3>;
    /// Optional RGB or RGBA colour; alpha defaults to one.
    fn opt_color(&self, name: &str) -> Option<[f64; 4]>;
    /// Optional list of strings.
    fn opt_string_list(&self, name: &str) -> Option<Vec<String>>;

    /// String parameter with a default.
    fn str_or<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.opt_str(name).unwrap_or(default)
    }

    /// Number parameter with a default.
    fn f64_or(&self, name: &str, default: f64) -> f64 {
        self.opt_f64(name).unwrap_or(default)
    }

    /// Boolean parameter with a default.
    fn bool_or(&self, name: &str, default: bool) -> bool {
        self.opt_bool(name).unwrap_or(default)
    }

    /// Vector parameter with a default.
    fn vec3_or(&self, name: &str, default: Vec3) -> Vec3 {
        self.opt_vec3(name).unwrap_or(default)
    }
}

impl ParamsExt for Params {
    fn str_param(&self, name: &str) -> Result<&str, HandlerError> {
        self.opt_str(name)
            .ok_or_else(|| HandlerError::invalid_param(name, "is required"))
    }

    fn opt_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    fn opt_f64(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(Value::as_f64)
    }

    fn opt_u64(&self, name: &str) -> Option<u64> {
        self.get(name).and_then(Value::as_u64)
    }

    fn opt_i64(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_i64)
    }

    fn opt_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(Value::as_bool)
    }

    fn opt_vec3(&self, name: &str) -> Option<Vec3> {
        match numbers(self.get(name)?)?.as_slice() {
            [x, y, z] => Some([*x, *y, *z]),
            _ => None,
        }
    }

    fn opt_color(&self, name: &str) -> Option<[f64; 4]> {
        match numbers(self.get(name)?)?.as_slice() {
            [r, g, b] => Some([*r, *g, *b, 1.0]),
            [r, g, b, a] => Some([*r, *g, *b, *a]),
            _ => None,
        }
    }

    fn opt_string_list(&self, name: &str) -> Option<Vec<String>> {
        self.get(name)?
            .as_array()?
            .iter()
            .map(|item| item.as_str().map(ToOwned::to_owned))
            .collect()
    }
}

fn numbers(value: &Value) -> Option<Vec<f64>> {
    value.as_array()?.iter().map(Value::as_f64).collect()
}
