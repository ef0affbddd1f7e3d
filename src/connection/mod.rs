//! The connection aggregate: endpoint, credentials, sources, targets and mapping setup.
//!
//! A [`Connection`] is immutable and only produced by [`ConnectionBuilder::build`], which
//! validates it and migrates legacy configuration. Changes go through
//! [`Connection::to_builder`].

mod auth;
mod builder;
mod mapping;
mod migration;
mod source;
mod ssh;
mod target;

use crate::credentials::{Credentials, CredentialsError};
use crate::json::{objects_in, parse_object, JsonObject, JsonObjectExt, JsonParseError};
use crate::topic::TopicParseError;
use crate::uri::{ConnectionUri, UriInvalid};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value as JsonValue;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use thiserror::Error;

pub use auth::AuthorizationContext;
pub use builder::{ConnectionBuilder, ConnectionConfigurationInvalid};
pub use mapping::{HeaderMapping, MappingContext, PayloadMapping, PayloadMappingDefinition};
pub use migration::{DEFAULT_REPLY_TARGET_ADDRESS, MIGRATED_MAPPER_ID};
pub use source::{Enforcement, ReplyTarget, ResponseType, Source, SourceBuilder};
pub use ssh::SshTunnel;
pub use target::{Target, TargetBuilder};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionType {
    Amqp091,
    Amqp10,
    Mqtt,
    Mqtt5,
    Kafka,
    HttpPush,
    Hono,
}

impl ConnectionType {
    pub const ALL: [ConnectionType; 7] = [
        ConnectionType::Amqp091,
        ConnectionType::Amqp10,
        ConnectionType::Mqtt,
        ConnectionType::Mqtt5,
        ConnectionType::Kafka,
        ConnectionType::HttpPush,
        ConnectionType::Hono,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ConnectionType::Amqp091 => "amqp-091",
            ConnectionType::Amqp10 => "amqp-10",
            ConnectionType::Mqtt => "mqtt",
            ConnectionType::Mqtt5 => "mqtt-5",
            ConnectionType::Kafka => "kafka",
            ConnectionType::HttpPush => "http-push",
            ConnectionType::Hono => "hono",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// MQTT 3.1.1 has no user-defined protocol headers.
    pub fn supports_headers(self) -> bool {
        !matches!(self, ConnectionType::Mqtt)
    }

    /// Target header mapping is always written explicitly for these types.
    pub fn requires_target_header_mapping(self) -> bool {
        matches!(
            self,
            ConnectionType::Amqp091
                | ConnectionType::Amqp10
                | ConnectionType::Kafka
                | ConnectionType::Mqtt5
                | ConnectionType::HttpPush
        )
    }

    /// Hono connections resolve their endpoint elsewhere.
    pub fn requires_uri(self) -> bool {
        !matches!(self, ConnectionType::Hono)
    }
}

impl fmt::Display for ConnectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionStatus {
    Open,
    Closed,
    Failed,
    Misconfigured,
    Unknown,
}

impl ConnectionStatus {
    pub const ALL: [ConnectionStatus; 5] = [
        ConnectionStatus::Open,
        ConnectionStatus::Closed,
        ConnectionStatus::Failed,
        ConnectionStatus::Misconfigured,
        ConnectionStatus::Unknown,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ConnectionStatus::Open => "open",
            ConnectionStatus::Closed => "closed",
            ConnectionStatus::Failed => "failed",
            ConnectionStatus::Misconfigured => "misconfigured",
            ConnectionStatus::Unknown => "unknown",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.name() == name)
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifecycle {
    Active,
    Deleted,
}

impl Lifecycle {
    pub fn name(self) -> &'static str {
        match self {
            Lifecycle::Active => "ACTIVE",
            Lifecycle::Deleted => "DELETED",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "ACTIVE" => Some(Lifecycle::Active),
            "DELETED" => Some(Lifecycle::Deleted),
            _ => None,
        }
    }
}

pub(crate) mod fields {
    use crate::json::{FieldDefinition, JsonObject};
    use std::collections::BTreeMap;

    pub const LIFECYCLE: FieldDefinition<String> = FieldDefinition::new("__lifecycle");
    pub const REVISION: FieldDefinition<i64> = FieldDefinition::new("_revision");
    pub const MODIFIED: FieldDefinition<String> = FieldDefinition::new("_modified");
    pub const CREATED: FieldDefinition<String> = FieldDefinition::new("_created");
    pub const ID: FieldDefinition<String> = FieldDefinition::new("id");
    pub const NAME: FieldDefinition<String> = FieldDefinition::new("name");
    pub const CONNECTION_TYPE: FieldDefinition<String> = FieldDefinition::new("connectionType");
    pub const CONNECTION_STATUS: FieldDefinition<String> =
        FieldDefinition::new("connectionStatus");
    pub const URI: FieldDefinition<String> = FieldDefinition::new("uri");
    pub const CREDENTIALS: FieldDefinition<JsonObject> = FieldDefinition::new("credentials");
    pub const TRUSTED_CERTIFICATES: FieldDefinition<String> = FieldDefinition::new("ca");
    pub const AUTHORIZATION_CONTEXT: FieldDefinition<Vec<String>> =
        FieldDefinition::new("authorizationContext");
    pub const SOURCES: FieldDefinition<Vec<serde_json::Value>> = FieldDefinition::new("sources");
    pub const TARGETS: FieldDefinition<Vec<serde_json::Value>> = FieldDefinition::new("targets");
    pub const SSH_TUNNEL: FieldDefinition<JsonObject> = FieldDefinition::new("sshTunnel");
    pub const CLIENT_COUNT: FieldDefinition<u32> = FieldDefinition::new("clientCount");
    pub const FAILOVER_ENABLED: FieldDefinition<bool> = FieldDefinition::new("failoverEnabled");
    pub const VALIDATE_CERTIFICATES: FieldDefinition<bool> =
        FieldDefinition::new("validateCertificates");
    pub const PROCESSOR_POOL_SIZE: FieldDefinition<u32> =
        FieldDefinition::new("processorPoolSize");
    pub const SPECIFIC_CONFIG: FieldDefinition<BTreeMap<String, String>> =
        FieldDefinition::new("specificConfig");
    pub const MAPPING_DEFINITIONS: FieldDefinition<JsonObject> =
        FieldDefinition::new("mappingDefinitions");
    /// Read only; folded into `mappingDefinitions` on build.
    pub const MAPPING_CONTEXT: FieldDefinition<JsonObject> = FieldDefinition::new("mappingContext");
    pub const TAGS: FieldDefinition<Vec<String>> = FieldDefinition::new("tags");
}

use fields::*;

const TIMESTAMP_EXPECTATION: &str = "RFC 3339 timestamp";

#[derive(Debug, Clone, PartialEq)]
pub struct Connection {
    pub(crate) id: String,
    pub(crate) name: Option<String>,
    pub(crate) connection_type: ConnectionType,
    pub(crate) connection_status: ConnectionStatus,
    pub(crate) uri: ConnectionUri,
    pub(crate) credentials: Option<Credentials>,
    pub(crate) trusted_certificates: Option<String>,
    pub(crate) authorization_context: Option<AuthorizationContext>,
    pub(crate) sources: Vec<Source>,
    pub(crate) targets: Vec<Target>,
    pub(crate) ssh_tunnel: Option<SshTunnel>,
    pub(crate) client_count: u32,
    pub(crate) failover_enabled: bool,
    pub(crate) validate_certificates: bool,
    pub(crate) processor_pool_size: u32,
    pub(crate) specific_config: BTreeMap<String, String>,
    pub(crate) payload_mapping_definition: PayloadMappingDefinition,
    pub(crate) tags: BTreeSet<String>,
    pub(crate) lifecycle: Option<Lifecycle>,
    pub(crate) revision: Option<i64>,
    pub(crate) modified: Option<DateTime<Utc>>,
    pub(crate) created: Option<DateTime<Utc>>,
}

impl Connection {
    pub fn builder(
        id: impl Into<String>,
        connection_type: ConnectionType,
        connection_status: ConnectionStatus,
        uri: ConnectionUri,
    ) -> ConnectionBuilder {
        ConnectionBuilder::new(id, connection_type, connection_status, uri)
    }

    pub fn to_builder(&self) -> ConnectionBuilder {
        ConnectionBuilder::from_connection(self)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn connection_type(&self) -> ConnectionType {
        self.connection_type
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        self.connection_status
    }

    pub fn uri(&self) -> &ConnectionUri {
        &self.uri
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    pub fn trusted_certificates(&self) -> Option<&str> {
        self.trusted_certificates.as_deref()
    }

    pub fn authorization_context(&self) -> Option<&AuthorizationContext> {
        self.authorization_context.as_ref()
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    pub fn ssh_tunnel(&self) -> Option<&SshTunnel> {
        self.ssh_tunnel.as_ref()
    }

    pub fn client_count(&self) -> u32 {
        self.client_count
    }

    pub fn is_failover_enabled(&self) -> bool {
        self.failover_enabled
    }

    pub fn is_validate_certificates(&self) -> bool {
        self.validate_certificates
    }

    pub fn processor_pool_size(&self) -> u32 {
        self.processor_pool_size
    }

    pub fn specific_config(&self) -> &BTreeMap<String, String> {
        &self.specific_config
    }

    pub fn payload_mapping_definition(&self) -> &PayloadMappingDefinition {
        &self.payload_mapping_definition
    }

    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    pub fn lifecycle(&self) -> Option<Lifecycle> {
        self.lifecycle
    }

    pub fn revision(&self) -> Option<i64> {
        self.revision
    }

    pub fn modified(&self) -> Option<DateTime<Utc>> {
        self.modified
    }

    pub fn created(&self) -> Option<DateTime<Utc>> {
        self.created
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ConnectionParseError> {
        let object = parse_object(raw, "connection")?;
        Self::from_json(&object)
    }

    /// Parses, validates and migrates a connection document.
    pub fn from_json(object: &JsonObject) -> Result<Self, ConnectionParseError> {
        let id = object.required(ID)?;
        let connection_type = parse_named(
            &object.required(CONNECTION_TYPE)?,
            "connection type",
            ConnectionType::from_name,
            ConnectionType::ALL.map(ConnectionType::name),
        )?;
        let connection_status = parse_named(
            &object.required(CONNECTION_STATUS)?,
            "connection status",
            ConnectionStatus::from_name,
            ConnectionStatus::ALL.map(ConnectionStatus::name),
        )?;
        let uri = ConnectionUri::parse(Some(object.required(URI)?.as_str()))?;

        let mut builder = Connection::builder(id, connection_type, connection_status, uri);

        if let Some(name) = object.value_of(NAME)? {
            builder = builder.name(name);
        }
        if let Some(credentials) = object.value_of(CREDENTIALS)? {
            builder = builder.credentials(Credentials::from_json(&credentials)?);
        }
        if let Some(ca) = object.value_of(TRUSTED_CERTIFICATES)? {
            builder = builder.trusted_certificates(ca);
        }
        if let Some(subjects) = object.value_of(AUTHORIZATION_CONTEXT)? {
            builder = builder.authorization_context(AuthorizationContext::from(subjects));
        }
        if let Some(sources) = object.value_of(SOURCES)? {
            let sources = objects_in(&sources, SOURCES.key())?
                .into_iter()
                .map(Source::from_json)
                .collect::<Result<Vec<_>, _>>()?;
            builder = builder.sources(sources);
        }
        if let Some(targets) = object.value_of(TARGETS)? {
            let targets = objects_in(&targets, TARGETS.key())?
                .into_iter()
                .map(Target::from_json)
                .collect::<Result<Vec<_>, _>>()?;
            builder = builder.targets(targets);
        }
        if let Some(ssh_tunnel) = object.value_of(SSH_TUNNEL)? {
            builder = builder.ssh_tunnel(SshTunnel::from_json(&ssh_tunnel)?);
        }
        if let Some(client_count) = object.value_of(CLIENT_COUNT)? {
            builder = builder.client_count(client_count);
        }
        if let Some(failover_enabled) = object.value_of(FAILOVER_ENABLED)? {
            builder = builder.failover_enabled(failover_enabled);
        }
        if let Some(validate_certificates) = object.value_of(VALIDATE_CERTIFICATES)? {
            builder = builder.validate_certificates(validate_certificates);
        }
        if let Some(pool_size) = object.value_of(PROCESSOR_POOL_SIZE)? {
            builder = builder.processor_pool_size(pool_size);
        }
        if let Some(specific_config) = object.value_of(SPECIFIC_CONFIG)? {
            builder = builder.specific_config(specific_config);
        }
        if let Some(definitions) = object.value_of(MAPPING_DEFINITIONS)? {
            builder =
                builder.payload_mapping_definition(PayloadMappingDefinition::from_json(&definitions)?);
        }
        if let Some(context) = object.value_of(MAPPING_CONTEXT)? {
            builder = builder.mapping_context(MappingContext::from_json(&context)?);
        }
        if let Some(tags) = object.value_of(TAGS)? {
            builder = builder.tags(tags);
        }
        if let Some(lifecycle) = object.value_of(LIFECYCLE)? {
            builder = builder.lifecycle(parse_named(
                &lifecycle,
                "lifecycle",
                Lifecycle::from_name,
                ["ACTIVE", "DELETED"],
            )?);
        }
        if let Some(revision) = object.value_of(REVISION)? {
            builder = builder.revision(revision);
        }
        if let Some(modified) = object.value_of(MODIFIED)? {
            builder = builder.modified(parse_timestamp(MODIFIED.key(), &modified)?);
        }
        if let Some(created) = object.value_of(CREATED)? {
            builder = builder.created(parse_timestamp(CREATED.key(), &created)?);
        }

        Ok(builder.build()?)
    }

    /// Serializes every field in definition order, credentials included.
    pub fn to_json(&self) -> JsonObject {
        let mut object = JsonObject::new();
        object.set_if_some(LIFECYCLE, self.lifecycle.map(Lifecycle::name));
        object.set_if_some(REVISION, self.revision);
        object.set_if_some(MODIFIED, self.modified.map(format_timestamp));
        object.set_if_some(CREATED, self.created.map(format_timestamp));
        object.set(ID, self.id.clone());
        object.set_if_some(NAME, self.name.clone());
        object.set(CONNECTION_TYPE, self.connection_type.name());
        object.set(CONNECTION_STATUS, self.connection_status.name());
        object.set(URI, self.uri.as_str());
        object.set_if_some(CREDENTIALS, self.credentials.as_ref().map(Credentials::to_json));
        object.set_if_some(TRUSTED_CERTIFICATES, self.trusted_certificates.clone());
        object.set_if_some(
            AUTHORIZATION_CONTEXT,
            self.authorization_context
                .as_ref()
                .map(AuthorizationContext::to_json),
        );
        if !self.sources.is_empty() {
            object.set(
                SOURCES,
                self.sources
                    .iter()
                    .map(|source| JsonValue::Object(source.to_json()))
                    .collect::<Vec<_>>(),
            );
        }
        if !self.targets.is_empty() {
            object.set(
                TARGETS,
                self.targets
                    .iter()
                    .map(|target| JsonValue::Object(target.to_json()))
                    .collect::<Vec<_>>(),
            );
        }
        object.set_if_some(SSH_TUNNEL, self.ssh_tunnel.as_ref().map(SshTunnel::to_json));
        object.set(CLIENT_COUNT, self.client_count);
        object.set(FAILOVER_ENABLED, self.failover_enabled);
        object.set(VALIDATE_CERTIFICATES, self.validate_certificates);
        object.set(PROCESSOR_POOL_SIZE, self.processor_pool_size);
        if !self.specific_config.is_empty() {
            object.set(
                SPECIFIC_CONFIG,
                crate::json::string_map_to_json(&self.specific_config),
            );
        }
        if !self.payload_mapping_definition.is_empty() {
            object.set(MAPPING_DEFINITIONS, self.payload_mapping_definition.to_json());
        }
        if !self.tags.is_empty() {
            object.set(TAGS, self.tags.iter().cloned().collect::<Vec<String>>());
        }
        object
    }
}

/// Log-safe summary; the URI is masked and credentials are reduced to their type.
impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Connection(id={}, type={}, status={}, uri={}, credentials={}, sources={}, targets={})",
            self.id,
            self.connection_type,
            self.connection_status,
            self.uri.masked(),
            self.credentials
                .as_ref()
                .map_or("none", Credentials::credentials_type),
            self.sources.len(),
            self.targets.len()
        )
    }
}

fn parse_named<T, const N: usize>(
    raw: &str,
    kind: &'static str,
    from_name: impl Fn(&str) -> Option<T>,
    expected: [&'static str; N],
) -> Result<T, ConnectionParseError> {
    from_name(raw)
        .ok_or_else(|| ConnectionParseError::unknown_value(kind, raw, &expected.join(", ")))
}

fn parse_timestamp(key: &str, raw: &str) -> Result<DateTime<Utc>, JsonParseError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|timestamp| timestamp.with_timezone(&Utc))
        .map_err(|_| JsonParseError::WrongType {
            key: key.to_string(),
            expected: TIMESTAMP_EXPECTATION,
        })
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectionParseError {
    #[error(transparent)]
    Json(#[from] JsonParseError),
    #[error(transparent)]
    Uri(#[from] UriInvalid),
    #[error(transparent)]
    Credentials(#[from] CredentialsError),
    #[error(transparent)]
    Topic(#[from] TopicParseError),
    #[error(transparent)]
    Configuration(#[from] ConnectionConfigurationInvalid),
    #[error("unknown {kind} `{value}` (expected one of {expected})")]
    UnknownValue {
        kind: &'static str,
        value: String,
        expected: String,
    },
}

impl ConnectionParseError {
    pub(crate) fn unknown_value(kind: &'static str, value: &str, expected: &str) -> Self {
        ConnectionParseError::UnknownValue {
            kind,
            value: value.to_string(),
            expected: expected.to_string(),
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ConnectionParseError::Json(err) => err.error_code(),
            ConnectionParseError::Uri(err) => err.error_code(),
            ConnectionParseError::Credentials(err) => err.error_code(),
            ConnectionParseError::Topic(err) => err.error_code(),
            ConnectionParseError::Configuration(err) => err.error_code(),
            ConnectionParseError::UnknownValue { .. } => "json.field.invalid",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_round_trip_through_rfc3339() {
        let parsed = parse_timestamp("_modified", "2024-03-01T10:15:30.250Z").expect("timestamp");
        assert_eq!(format_timestamp(parsed), "2024-03-01T10:15:30.250Z");
        assert!(parse_timestamp("_modified", "yesterday").is_err());
    }

    #[test]
    fn type_names_resolve_both_ways() {
        for kind in ConnectionType::ALL {
            assert_eq!(ConnectionType::from_name(kind.name()), Some(kind));
        }
        assert_eq!(ConnectionType::from_name("AMQP-091"), None);
    }
}
