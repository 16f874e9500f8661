//! A2UI Value Types
//!
//! Represents the dynamic values used in the A2UI protocol for data binding.
//! Since v0.9 a literal is written as a plain JSON value, and a binding as an
//! object with a string `path`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::data_model::DataModelStore;

/// A reference into the data model.
///
/// ```json
/// {"path": "/user/name"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathBinding {
    pub path: String,
}

impl PathBinding {
    pub fn new(path: impl Into<String>) -> Self {
        PathBinding { path: path.into() }
    }
}

/// A call to a registered function, used inside action contexts and checks.
///
/// ```json
/// {"call": "formatDate", "args": {"value": {"path": "/when"}, "format": "YYYY-MM-DD"}}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionCallRef {
    pub call: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Map<String, Value>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_type: Option<String>,
}

/// A value that is either a literal `T` or a binding into the data model.
///
/// # Examples
///
/// ```json
/// "Hello World"
/// {"path": "/user/name"}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DynamicValue<T> {
    /// A path reference to the data model
    Path(PathBinding),
    /// A literal value
    Literal(T),
}

pub type DynamicString = DynamicValue<String>;
pub type DynamicNumber = DynamicValue<f64>;
pub type DynamicBoolean = DynamicValue<bool>;

impl<T> DynamicValue<T> {
    /// Create a new literal value
    pub fn literal(value: T) -> Self {
        DynamicValue::Literal(value)
    }

    /// Create a new path reference
    pub fn path(path: impl Into<String>) -> Self {
        DynamicValue::Path(PathBinding::new(path))
    }

    /// Check if this is a literal value
    pub fn is_literal(&self) -> bool {
        matches!(self, DynamicValue::Literal(_))
    }

    /// Get the path if this is a path reference
    pub fn as_path(&self) -> Option<&str> {
        match self {
            DynamicValue::Path(binding) => Some(&binding.path),
            DynamicValue::Literal(_) => None,
        }
    }

    /// Get the literal if this is a literal value
    pub fn as_literal(&self) -> Option<&T> {
        match self {
            DynamicValue::Literal(value) => Some(value),
            DynamicValue::Path(_) => None,
        }
    }
}

impl<T: Clone + DeserializeOwned> DynamicValue<T> {
    /// Resolve against the data model.
    ///
    /// Returns `None` when the bound path is missing, holds `null`, or holds
    /// a value of the wrong type.
    pub fn resolve(&self, store: &DataModelStore) -> Option<T> {
        match self {
            DynamicValue::Literal(value) => Some(value.clone()),
            DynamicValue::Path(binding) => match store.get(&binding.path)? {
                Value::Null => None,
                value => serde_json::from_value(value).ok(),
            },
        }
    }
}

/// Structural check for a path binding: a JSON object with a string `path`.
pub fn is_path_binding(value: &Value) -> bool {
    as_path_binding(value).is_some()
}

/// Get the bound path when `value` is a path binding.
pub fn as_path_binding(value: &Value) -> Option<&str> {
    value.as_object()?.get("path")?.as_str()
}

/// Get the function call when `value` is an object with a string `call`.
pub fn as_function_call(value: &Value) -> Option<FunctionCallRef> {
    let object = value.as_object()?;
    let call = object.get("call")?.as_str()?;
    Some(FunctionCallRef {
        call: call.to_string(),
        args: object.get("args").and_then(Value::as_object).cloned(),
        return_type: object
            .get("returnType")
            .and_then(Value::as_str)
            .map(str::to_string),
    })
}

/// Resolve a possibly-bound value against the data model.
///
/// - absent or `null` gives `fallback`
/// - a path binding gives the stored value, or `fallback` when it is missing
///   or `null`
/// - anything else is a literal and is returned as is
///
/// Never writes to the store.
pub fn resolve_value(binding: Option<&Value>, fallback: Value, store: &DataModelStore) -> Value {
    match binding {
        None | Some(Value::Null) => fallback,
        Some(value) => match as_path_binding(value) {
            Some(path) => match store.get(path) {
                None | Some(Value::Null) => fallback,
                Some(resolved) => resolved,
            },
            None => value.clone(),
        },
    }
}
