//! Header and payload mapping value objects shared by sources and targets.

use crate::json::{
    string_map_to_json, FieldDefinition, JsonObject, JsonObjectExt, JsonParseError,
};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

/// Header name → placeholder expression such as `{{header:correlation-id}}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct HeaderMapping {
    entries: BTreeMap<String, String>,
}

impl HeaderMapping {
    pub fn new<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn entries(&self) -> &BTreeMap<String, String> {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn with_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    /// `defaults` plus own entries; own entries win on collision.
    pub fn merged_under(&self, defaults: &HeaderMapping) -> HeaderMapping {
        let mut entries = defaults.entries.clone();
        entries.extend(
            self.entries
                .iter()
                .map(|(key, value)| (key.clone(), value.clone())),
        );
        HeaderMapping { entries }
    }

    pub fn to_json(&self) -> JsonValue {
        string_map_to_json(&self.entries)
    }
}

impl From<BTreeMap<String, String>> for HeaderMapping {
    fn from(entries: BTreeMap<String, String>) -> Self {
        Self { entries }
    }
}

/// Ids of the payload mappings applied, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct PayloadMapping {
    mappings: Vec<String>,
}

impl PayloadMapping {
    pub fn new<I, S>(mappings: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            mappings: mappings.into_iter().map(Into::into).collect(),
        }
    }

    pub fn mappings(&self) -> &[String] {
        &self.mappings
    }

    pub fn contains(&self, id: &str) -> bool {
        self.mappings.iter().any(|mapping| mapping == id)
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    /// Appends `id` unless it is already listed.
    pub fn with_mapping(mut self, id: impl Into<String>) -> Self {
        let id = id.into();
        if !self.contains(&id) {
            self.mappings.push(id);
        }
        self
    }

    pub fn to_json(&self) -> JsonValue {
        JsonValue::from(self.mappings.clone())
    }
}

impl From<Vec<String>> for PayloadMapping {
    fn from(mappings: Vec<String>) -> Self {
        Self { mappings }
    }
}

const MAPPING_ENGINE: FieldDefinition<String> = FieldDefinition::new("mappingEngine");
const OPTIONS: FieldDefinition<JsonObject> = FieldDefinition::new("options");
const INCOMING_CONDITIONS: FieldDefinition<BTreeMap<String, String>> =
    FieldDefinition::new("incomingConditions");
const OUTGOING_CONDITIONS: FieldDefinition<BTreeMap<String, String>> =
    FieldDefinition::new("outgoingConditions");

/// Configuration of one payload mapper instance.
#[derive(Debug, Clone, PartialEq)]
pub struct MappingContext {
    pub mapping_engine: String,
    pub options: JsonObject,
    pub incoming_conditions: BTreeMap<String, String>,
    pub outgoing_conditions: BTreeMap<String, String>,
}

impl MappingContext {
    pub fn new(mapping_engine: impl Into<String>, options: JsonObject) -> Self {
        Self {
            mapping_engine: mapping_engine.into(),
            options,
            incoming_conditions: BTreeMap::new(),
            outgoing_conditions: BTreeMap::new(),
        }
    }

    pub fn from_json(object: &JsonObject) -> Result<Self, JsonParseError> {
        Ok(Self {
            mapping_engine: object.required(MAPPING_ENGINE)?,
            options: object.value_of(OPTIONS)?.unwrap_or_default(),
            incoming_conditions: object.value_of(INCOMING_CONDITIONS)?.unwrap_or_default(),
            outgoing_conditions: object.value_of(OUTGOING_CONDITIONS)?.unwrap_or_default(),
        })
    }

    pub fn to_json(&self) -> JsonObject {
        let mut object = JsonObject::new();
        object.set(MAPPING_ENGINE, self.mapping_engine.clone());
        object.set(OPTIONS, self.options.clone());
        if !self.incoming_conditions.is_empty() {
            object.set(
                INCOMING_CONDITIONS,
                string_map_to_json(&self.incoming_conditions),
            );
        }
        if !self.outgoing_conditions.is_empty() {
            object.set(
                OUTGOING_CONDITIONS,
                string_map_to_json(&self.outgoing_conditions),
            );
        }
        object
    }
}

/// Named mapping contexts referenced by the payload mappings of sources and targets.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PayloadMappingDefinition {
    definitions: BTreeMap<String, MappingContext>,
}

impl PayloadMappingDefinition {
    pub fn definitions(&self) -> &BTreeMap<String, MappingContext> {
        &self.definitions
    }

    pub fn get(&self, id: &str) -> Option<&MappingContext> {
        self.definitions.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.definitions.contains_key(id)
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub fn with_definition(mut self, id: impl Into<String>, context: MappingContext) -> Self {
        self.definitions.insert(id.into(), context);
        self
    }

    pub fn from_json(object: &JsonObject) -> Result<Self, JsonParseError> {
        let mut definitions = BTreeMap::new();
        for (id, value) in object {
            let context = value
                .as_object()
                .ok_or_else(|| JsonParseError::NotAnObject {
                    context: format!("mapping definition `{id}`"),
                })?;
            definitions.insert(id.clone(), MappingContext::from_json(context)?);
        }
        Ok(Self { definitions })
    }

    pub fn to_json(&self) -> JsonObject {
        self.definitions
            .iter()
            .map(|(id, context)| (id.clone(), JsonValue::Object(context.to_json())))
            .collect()
    }
}
