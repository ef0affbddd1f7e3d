use super::auth::AuthorizationContext;
use super::mapping::{HeaderMapping, PayloadMapping};
use super::ConnectionParseError;
use crate::json::{FieldDefinition, JsonObject, JsonObjectExt};
use crate::topic::{FilteredTopic, Topic};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::fmt;

const ADDRESS: FieldDefinition<String> = FieldDefinition::new("address");
const TOPICS: FieldDefinition<Vec<String>> = FieldDefinition::new("topics");
const QOS: FieldDefinition<u32> = FieldDefinition::new("qos");
const AUTHORIZATION_CONTEXT: FieldDefinition<Vec<String>> =
    FieldDefinition::new("authorizationContext");
const HEADER_MAPPING: FieldDefinition<BTreeMap<String, String>> =
    FieldDefinition::new("headerMapping");
const PAYLOAD_MAPPING: FieldDefinition<Vec<String>> = FieldDefinition::new("payloadMapping");
const ISSUED_ACKNOWLEDGEMENT_LABEL: FieldDefinition<String> =
    FieldDefinition::new("issuedAcknowledgementLabel");

/// Publishes platform signals of the subscribed topics to an external address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    address: String,
    topics: Vec<FilteredTopic>,
    authorization_context: AuthorizationContext,
    qos: Option<u32>,
    header_mapping: HeaderMapping,
    payload_mapping: PayloadMapping,
    issued_acknowledgement_label: Option<String>,
}

impl Target {
    pub fn builder(address: impl Into<String>) -> TargetBuilder {
        TargetBuilder {
            inner: Target {
                address: address.into(),
                topics: Vec::new(),
                authorization_context: AuthorizationContext::default(),
                qos: None,
                header_mapping: HeaderMapping::default(),
                payload_mapping: PayloadMapping::default(),
                issued_acknowledgement_label: None,
            },
        }
    }

    pub fn to_builder(&self) -> TargetBuilder {
        TargetBuilder {
            inner: self.clone(),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn topics(&self) -> &[FilteredTopic] {
        &self.topics
    }

    pub fn subscribes_to(&self, topic: Topic) -> bool {
        self.topics.iter().any(|filtered| filtered.topic() == topic)
    }

    pub fn authorization_context(&self) -> &AuthorizationContext {
        &self.authorization_context
    }

    pub fn qos(&self) -> Option<u32> {
        self.qos
    }

    pub fn header_mapping(&self) -> &HeaderMapping {
        &self.header_mapping
    }

    pub fn payload_mapping(&self) -> &PayloadMapping {
        &self.payload_mapping
    }

    pub fn issued_acknowledgement_label(&self) -> Option<&str> {
        self.issued_acknowledgement_label.as_deref()
    }

    pub fn from_json(object: &JsonObject) -> Result<Self, ConnectionParseError> {
        let topics = object
            .value_of(TOPICS)?
            .unwrap_or_default()
            .iter()
            .map(|raw| FilteredTopic::parse(raw))
            .collect::<Result<Vec<_>, _>>()?;

        let mut builder = Target::builder(object.required(ADDRESS)?)
            .topics(topics)
            .authorization_context(AuthorizationContext::from(
                object.value_of(AUTHORIZATION_CONTEXT)?.unwrap_or_default(),
            ))
            .header_mapping(HeaderMapping::from(
                object.value_of(HEADER_MAPPING)?.unwrap_or_default(),
            ))
            .payload_mapping(PayloadMapping::from(
                object.value_of(PAYLOAD_MAPPING)?.unwrap_or_default(),
            ));

        if let Some(qos) = object.value_of(QOS)? {
            builder = builder.qos(qos);
        }
        if let Some(label) = object.value_of(ISSUED_ACKNOWLEDGEMENT_LABEL)? {
            builder = builder.issued_acknowledgement_label(label);
        }

        Ok(builder.build())
    }

    pub fn to_json(&self) -> JsonObject {
        let mut object = JsonObject::new();
        object.set(ADDRESS, self.address.clone());
        object.set(
            TOPICS,
            self.topics
                .iter()
                .map(|topic| JsonValue::String(topic.to_string()))
                .collect::<Vec<_>>(),
        );
        object.set_if_some(QOS, self.qos);
        object.set(AUTHORIZATION_CONTEXT, self.authorization_context.to_json());
        if !self.header_mapping.is_empty() {
            object.set(HEADER_MAPPING, self.header_mapping.to_json());
        }
        if !self.payload_mapping.is_empty() {
            object.set(PAYLOAD_MAPPING, self.payload_mapping.to_json());
        }
        object.set_if_some(
            ISSUED_ACKNOWLEDGEMENT_LABEL,
            self.issued_acknowledgement_label.clone(),
        );
        object
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.address)
    }
}

#[derive(Debug, Clone)]
pub struct TargetBuilder {
    inner: Target,
}

impl TargetBuilder {
    pub fn topics(mut self, topics: Vec<FilteredTopic>) -> Self {
        self.inner.topics = topics;
        self
    }

    pub fn topic(mut self, topic: FilteredTopic) -> Self {
        if !self.inner.topics.contains(&topic) {
            self.inner.topics.push(topic);
        }
        self
    }

    pub fn authorization_context(mut self, context: AuthorizationContext) -> Self {
        self.inner.authorization_context = context;
        self
    }

    pub fn qos(mut self, qos: u32) -> Self {
        self.inner.qos = Some(qos);
        self
    }

    pub fn header_mapping(mut self, header_mapping: HeaderMapping) -> Self {
        self.inner.header_mapping = header_mapping;
        self
    }

    pub fn payload_mapping(mut self, payload_mapping: PayloadMapping) -> Self {
        self.inner.payload_mapping = payload_mapping;
        self
    }

    pub fn issued_acknowledgement_label(mut self, label: impl Into<String>) -> Self {
        self.inner.issued_acknowledgement_label = Some(label.into());
        self
    }

    pub fn build(self) -> Target {
        self.inner
    }
}
