use super::auth::AuthorizationContext;
use super::mapping::{HeaderMapping, PayloadMapping};
use super::ConnectionParseError;
use crate::json::{FieldDefinition, JsonObject, JsonObjectExt, JsonParseError};
use serde_json::Value as JsonValue;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

const ADDRESSES: FieldDefinition<Vec<String>> = FieldDefinition::new("addresses");
const CONSUMER_COUNT: FieldDefinition<u32> = FieldDefinition::new("consumerCount");
const QOS: FieldDefinition<u32> = FieldDefinition::new("qos");
const AUTHORIZATION_CONTEXT: FieldDefinition<Vec<String>> =
    FieldDefinition::new("authorizationContext");
const ENFORCEMENT: FieldDefinition<JsonObject> = FieldDefinition::new("enforcement");
const HEADER_MAPPING: FieldDefinition<BTreeMap<String, String>> =
    FieldDefinition::new("headerMapping");
const PAYLOAD_MAPPING: FieldDefinition<Vec<String>> = FieldDefinition::new("payloadMapping");
const REPLY_TARGET: FieldDefinition<JsonObject> = FieldDefinition::new("replyTarget");

const ENFORCEMENT_INPUT: FieldDefinition<String> = FieldDefinition::new("input");
const ENFORCEMENT_FILTERS: FieldDefinition<Vec<String>> = FieldDefinition::new("filters");

const REPLY_TARGET_ENABLED: FieldDefinition<bool> = FieldDefinition::new("enabled");
const REPLY_TARGET_ADDRESS: FieldDefinition<String> = FieldDefinition::new("address");
const EXPECTED_RESPONSE_TYPES: FieldDefinition<Vec<String>> =
    FieldDefinition::new("expectedResponseTypes");

/// Consumes messages from external addresses into the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    addresses: BTreeSet<String>,
    consumer_count: u32,
    authorization_context: AuthorizationContext,
    qos: Option<u32>,
    enforcement: Option<Enforcement>,
    header_mapping: HeaderMapping,
    payload_mapping: PayloadMapping,
    reply_target_enabled: bool,
    reply_target: Option<ReplyTarget>,
}

impl Source {
    pub fn builder() -> SourceBuilder {
        SourceBuilder {
            inner: Source {
                addresses: BTreeSet::new(),
                consumer_count: 1,
                authorization_context: AuthorizationContext::default(),
                qos: None,
                enforcement: None,
                header_mapping: HeaderMapping::default(),
                payload_mapping: PayloadMapping::default(),
                reply_target_enabled: true,
                reply_target: None,
            },
        }
    }

    pub fn to_builder(&self) -> SourceBuilder {
        SourceBuilder {
            inner: self.clone(),
        }
    }

    pub fn addresses(&self) -> &BTreeSet<String> {
        &self.addresses
    }

    pub fn consumer_count(&self) -> u32 {
        self.consumer_count
    }

    pub fn authorization_context(&self) -> &AuthorizationContext {
        &self.authorization_context
    }

    pub fn qos(&self) -> Option<u32> {
        self.qos
    }

    pub fn enforcement(&self) -> Option<&Enforcement> {
        self.enforcement.as_ref()
    }

    pub fn header_mapping(&self) -> &HeaderMapping {
        &self.header_mapping
    }

    pub fn payload_mapping(&self) -> &PayloadMapping {
        &self.payload_mapping
    }

    pub fn is_reply_target_enabled(&self) -> bool {
        self.reply_target_enabled
    }

    pub fn reply_target(&self) -> Option<&ReplyTarget> {
        self.reply_target.as_ref()
    }

    pub fn from_json(object: &JsonObject) -> Result<Self, ConnectionParseError> {
        let mut builder = Source::builder()
            .addresses(object.required(ADDRESSES)?)
            .authorization_context(AuthorizationContext::from(
                object.value_of(AUTHORIZATION_CONTEXT)?.unwrap_or_default(),
            ))
            .header_mapping(HeaderMapping::from(
                object.value_of(HEADER_MAPPING)?.unwrap_or_default(),
            ))
            .payload_mapping(PayloadMapping::from(
                object.value_of(PAYLOAD_MAPPING)?.unwrap_or_default(),
            ));

        if let Some(consumer_count) = object.value_of(CONSUMER_COUNT)? {
            builder = builder.consumer_count(consumer_count);
        }
        if let Some(qos) = object.value_of(QOS)? {
            builder = builder.qos(qos);
        }
        if let Some(enforcement) = object.value_of(ENFORCEMENT)? {
            builder = builder.enforcement(Enforcement::from_json(&enforcement)?);
        }
        if let Some(reply_target) = object.value_of(REPLY_TARGET)? {
            builder = builder
                .reply_target_enabled(reply_target.value_of(REPLY_TARGET_ENABLED)?.unwrap_or(true));
            if reply_target.contains_key(REPLY_TARGET_ADDRESS.key()) {
                builder = builder.reply_target(ReplyTarget::from_json(&reply_target)?);
            }
        }

        Ok(builder.build())
    }

    pub fn to_json(&self) -> JsonObject {
        let mut object = JsonObject::new();
        object.set(
            ADDRESSES,
            self.addresses.iter().cloned().collect::<Vec<String>>(),
        );
        object.set(CONSUMER_COUNT, self.consumer_count);
        object.set_if_some(QOS, self.qos);
        object.set(AUTHORIZATION_CONTEXT, self.authorization_context.to_json());
        if let Some(enforcement) = &self.enforcement {
            object.set(ENFORCEMENT, enforcement.to_json());
        }
        if !self.header_mapping.is_empty() {
            object.set(HEADER_MAPPING, self.header_mapping.to_json());
        }
        if !self.payload_mapping.is_empty() {
            object.set(PAYLOAD_MAPPING, self.payload_mapping.to_json());
        }
        if self.reply_target.is_some() || !self.reply_target_enabled {
            let mut reply_target = self
                .reply_target
                .as_ref()
                .map(ReplyTarget::to_json)
                .unwrap_or_default();
            reply_target.set(REPLY_TARGET_ENABLED, self.reply_target_enabled);
            object.set(REPLY_TARGET, reply_target);
        }
        object
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let addresses = self.addresses.iter().cloned().collect::<Vec<_>>();
        write!(f, "[{}]", addresses.join(", "))
    }
}

#[derive(Debug, Clone)]
pub struct SourceBuilder {
    inner: Source,
}

impl SourceBuilder {
    pub fn addresses<I, S>(mut self, addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inner.addresses = addresses.into_iter().map(Into::into).collect();
        self
    }

    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.inner.addresses.insert(address.into());
        self
    }

    pub fn consumer_count(mut self, consumer_count: u32) -> Self {
        self.inner.consumer_count = consumer_count;
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

    pub fn enforcement(mut self, enforcement: Enforcement) -> Self {
        self.inner.enforcement = Some(enforcement);
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

    pub fn reply_target_enabled(mut self, enabled: bool) -> Self {
        self.inner.reply_target_enabled = enabled;
        self
    }

    pub fn reply_target(mut self, reply_target: ReplyTarget) -> Self {
        self.inner.reply_target = Some(reply_target);
        self
    }

    pub fn build(self) -> Source {
        self.inner
    }
}

/// Rule rejecting inbound signals whose resolved `input` matches none of the `filters`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enforcement {
    pub input: String,
    pub filters: Vec<String>,
}

impl Enforcement {
    pub fn from_json(object: &JsonObject) -> Result<Self, JsonParseError> {
        Ok(Self {
            input: object.required(ENFORCEMENT_INPUT)?,
            filters: object.required(ENFORCEMENT_FILTERS)?,
        })
    }

    pub fn to_json(&self) -> JsonObject {
        let mut object = JsonObject::new();
        object.set(ENFORCEMENT_INPUT, self.input.clone());
        object.set(ENFORCEMENT_FILTERS, self.filters.clone());
        object
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseType {
    Response,
    Error,
    Nack,
}

impl ResponseType {
    pub fn name(self) -> &'static str {
        match self {
            ResponseType::Response => "response",
            ResponseType::Error => "error",
            ResponseType::Nack => "nack",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "response" => Some(ResponseType::Response),
            "error" => Some(ResponseType::Error),
            "nack" => Some(ResponseType::Nack),
            _ => None,
        }
    }
}

/// Where responses to commands consumed by a source are published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyTarget {
    address: String,
    header_mapping: HeaderMapping,
    expected_response_types: Vec<ResponseType>,
}

impl ReplyTarget {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            header_mapping: HeaderMapping::default(),
            expected_response_types: vec![ResponseType::Response, ResponseType::Error],
        }
    }

    pub fn with_header_mapping(mut self, header_mapping: HeaderMapping) -> Self {
        self.header_mapping = header_mapping;
        self
    }

    pub fn with_expected_response_types(mut self, types: Vec<ResponseType>) -> Self {
        self.expected_response_types = types;
        self
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn header_mapping(&self) -> &HeaderMapping {
        &self.header_mapping
    }

    pub fn expected_response_types(&self) -> &[ResponseType] {
        &self.expected_response_types
    }

    pub fn from_json(object: &JsonObject) -> Result<Self, ConnectionParseError> {
        let mut reply_target = ReplyTarget::new(object.required(REPLY_TARGET_ADDRESS)?)
            .with_header_mapping(HeaderMapping::from(
                object.value_of(HEADER_MAPPING)?.unwrap_or_default(),
            ));

        if let Some(names) = object.value_of(EXPECTED_RESPONSE_TYPES)? {
            let types = names
                .iter()
                .map(|name| {
                    ResponseType::from_name(name).ok_or_else(|| {
                        ConnectionParseError::unknown_value(
                            "response type",
                            name,
                            "response, error, nack",
                        )
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            reply_target = reply_target.with_expected_response_types(types);
        }

        Ok(reply_target)
    }

    pub fn to_json(&self) -> JsonObject {
        let mut object = JsonObject::new();
        object.set(REPLY_TARGET_ADDRESS, self.address.clone());
        if !self.header_mapping.is_empty() {
            object.set(HEADER_MAPPING, self.header_mapping.to_json());
        }
        object.set(
            EXPECTED_RESPONSE_TYPES,
            self.expected_response_types
                .iter()
                .map(|kind| JsonValue::from(kind.name()))
                .collect::<Vec<_>>(),
        );
        object
    }
}
