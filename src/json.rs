//! Minimal typed access on top of `serde_json` objects.
//!
//! Model types never reach into a `serde_json::Map` by hand; they declare a [`FieldDefinition`]
//! per key and read or write through [`JsonObjectExt`], which reports missing and mistyped
//! fields as [`JsonParseError`].

use serde_json::{Map as JsonMap, Value as JsonValue};
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;
use thiserror::Error;

pub type JsonObject = JsonMap<String, JsonValue>;

/// Typed key of a JSON object field.
pub struct FieldDefinition<T> {
    key: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> FieldDefinition<T> {
    pub const fn new(key: &'static str) -> Self {
        Self {
            key,
            _marker: PhantomData,
        }
    }

    pub const fn key(&self) -> &'static str {
        self.key
    }
}

impl<T> Clone for FieldDefinition<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for FieldDefinition<T> {}

impl<T> fmt::Debug for FieldDefinition<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FieldDefinition").field(&self.key).finish()
    }
}

/// Conversion from a borrowed JSON value into a field type.
pub trait FromJsonValue: Sized {
    const EXPECTED: &'static str;

    fn from_json_value(value: &JsonValue) -> Option<Self>;
}

impl FromJsonValue for String {
    const EXPECTED: &'static str = "string";

    fn from_json_value(value: &JsonValue) -> Option<Self> {
        value.as_str().map(str::to_string)
    }
}

impl FromJsonValue for bool {
    const EXPECTED: &'static str = "boolean";

    fn from_json_value(value: &JsonValue) -> Option<Self> {
        value.as_bool()
    }
}

impl FromJsonValue for i64 {
    const EXPECTED: &'static str = "integer";

    fn from_json_value(value: &JsonValue) -> Option<Self> {
        value.as_i64()
    }
}

impl FromJsonValue for u32 {
    const EXPECTED: &'static str = "positive 32-bit integer";

    fn from_json_value(value: &JsonValue) -> Option<Self> {
        value.as_u64().and_then(|raw| u32::try_from(raw).ok())
    }
}

impl FromJsonValue for JsonObject {
    const EXPECTED: &'static str = "object";

    fn from_json_value(value: &JsonValue) -> Option<Self> {
        value.as_object().cloned()
    }
}

impl FromJsonValue for Vec<JsonValue> {
    const EXPECTED: &'static str = "array";

    fn from_json_value(value: &JsonValue) -> Option<Self> {
        value.as_array().cloned()
    }
}

impl FromJsonValue for Vec<String> {
    const EXPECTED: &'static str = "array of strings";

    fn from_json_value(value: &JsonValue) -> Option<Self> {
        value
            .as_array()?
            .iter()
            .map(|item| item.as_str().map(str::to_string))
            .collect()
    }
}

impl FromJsonValue for BTreeMap<String, String> {
    const EXPECTED: &'static str = "object of strings";

    fn from_json_value(value: &JsonValue) -> Option<Self> {
        value
            .as_object()?
            .iter()
            .map(|(key, item)| item.as_str().map(|text| (key.clone(), text.to_string())))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JsonParseError {
    #[error("JSON field `{key}` is required but missing")]
    MissingField { key: String },
    #[error("JSON field `{key}` must be a {expected}")]
    WrongType { key: String, expected: &'static str },
    #[error("{context} must be a JSON object")]
    NotAnObject { context: String },
    #[error("invalid JSON document: {0}")]
    Malformed(String),
}

impl JsonParseError {
    pub fn error_code(&self) -> &'static str {
        match self {
            JsonParseError::MissingField { .. } => "json.field.missing",
            JsonParseError::WrongType { .. } | JsonParseError::NotAnObject { .. } => {
                "json.field.invalid"
            }
            JsonParseError::Malformed(_) => "json.invalid",
        }
    }
}

impl From<serde_json::Error> for JsonParseError {
    fn from(value: serde_json::Error) -> Self {
        JsonParseError::Malformed(value.to_string())
    }
}

pub trait JsonObjectExt {
    /// Absent and `null` fields both read as `Ok(None)`.
    fn value_of<T: FromJsonValue>(
        &self,
        field: FieldDefinition<T>,
    ) -> Result<Option<T>, JsonParseError>;

    fn required<T: FromJsonValue>(&self, field: FieldDefinition<T>) -> Result<T, JsonParseError>;

    fn set<T>(&mut self, field: FieldDefinition<T>, value: impl Into<JsonValue>);

    fn set_if_some<T, V>(&mut self, field: FieldDefinition<T>, value: Option<V>)
    where
        V: Into<JsonValue>;
}

impl JsonObjectExt for JsonObject {
    fn value_of<T: FromJsonValue>(
        &self,
        field: FieldDefinition<T>,
    ) -> Result<Option<T>, JsonParseError> {
        match self.get(field.key()) {
            None | Some(JsonValue::Null) => Ok(None),
            Some(value) => T::from_json_value(value)
                .map(Some)
                .ok_or_else(|| JsonParseError::WrongType {
                    key: field.key().to_string(),
                    expected: T::EXPECTED,
                }),
        }
    }

    fn required<T: FromJsonValue>(&self, field: FieldDefinition<T>) -> Result<T, JsonParseError> {
        self.value_of(field)?
            .ok_or_else(|| JsonParseError::MissingField {
                key: field.key().to_string(),
            })
    }

    fn set<T>(&mut self, field: FieldDefinition<T>, value: impl Into<JsonValue>) {
        self.insert(field.key().to_string(), value.into());
    }

    fn set_if_some<T, V>(&mut self, field: FieldDefinition<T>, value: Option<V>)
    where
        V: Into<JsonValue>,
    {
        if let Some(value) = value {
            self.set(field, value);
        }
    }
}

/// Parses a JSON document that must be an object at its root.
pub fn parse_object(raw: &str, context: &str) -> Result<JsonObject, JsonParseError> {
    match serde_json::from_str::<JsonValue>(raw)? {
        JsonValue::Object(object) => Ok(object),
        _ => Err(JsonParseError::NotAnObject {
            context: context.to_string(),
        }),
    }
}

/// Every element of `values` must be an object; `context` names the array in errors.
pub fn objects_in<'a>(
    values: &'a [JsonValue],
    context: &str,
) -> Result<Vec<&'a JsonObject>, JsonParseError> {
    values
        .iter()
        .enumerate()
        .map(|(index, value)| {
            value
                .as_object()
                .ok_or_else(|| JsonParseError::NotAnObject {
                    context: format!("{context}[{index}]"),
                })
        })
        .collect()
}

pub fn string_map_to_json(map: &BTreeMap<String, String>) -> JsonValue {
    JsonValue::Object(
        map.iter()
            .map(|(key, value)| (key.clone(), JsonValue::String(value.clone())))
            .collect(),
    )
}
