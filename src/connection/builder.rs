use super::auth::AuthorizationContext;
use super::mapping::{MappingContext, PayloadMappingDefinition};
use super::migration;
use super::source::Source;
use super::ssh::SshTunnel;
use super::target::Target;
use super::{Connection, ConnectionStatus, ConnectionType, Lifecycle};
use crate::connection_event;
use crate::credentials::Credentials;
use crate::topic::Topic;
use crate::uri::ConnectionUri;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Mutable staging area for a [`Connection`]; nothing is checked until [`build`](Self::build).
#[derive(Debug, Clone)]
pub struct ConnectionBuilder {
    pub(super) id: String,
    pub(super) name: Option<String>,
    pub(super) connection_type: ConnectionType,
    pub(super) connection_status: ConnectionStatus,
    pub(super) uri: ConnectionUri,
    pub(super) credentials: Option<Credentials>,
    pub(super) trusted_certificates: Option<String>,
    pub(super) authorization_context: Option<AuthorizationContext>,
    pub(super) sources: Vec<Source>,
    pub(super) targets: Vec<Target>,
    pub(super) ssh_tunnel: Option<SshTunnel>,
    pub(super) client_count: u32,
    pub(super) failover_enabled: bool,
    pub(super) validate_certificates: bool,
    pub(super) processor_pool_size: u32,
    pub(super) specific_config: BTreeMap<String, String>,
    pub(super) payload_mapping_definition: PayloadMappingDefinition,
    pub(super) mapping_context: Option<MappingContext>,
    pub(super) tags: BTreeSet<String>,
    pub(super) lifecycle: Option<Lifecycle>,
    pub(super) revision: Option<i64>,
    pub(super) modified: Option<DateTime<Utc>>,
    pub(super) created: Option<DateTime<Utc>>,
}

impl ConnectionBuilder {
    pub(super) fn new(
        id: impl Into<String>,
        connection_type: ConnectionType,
        connection_status: ConnectionStatus,
        uri: ConnectionUri,
    ) -> Self {
        Self {
            id: id.into(),
            name: None,
            connection_type,
            connection_status,
            uri,
            credentials: None,
            trusted_certificates: None,
            authorization_context: None,
            sources: Vec::new(),
            targets: Vec::new(),
            ssh_tunnel: None,
            client_count: 1,
            failover_enabled: true,
            validate_certificates: true,
            processor_pool_size: 1,
            specific_config: BTreeMap::new(),
            payload_mapping_definition: PayloadMappingDefinition::default(),
            mapping_context: None,
            tags: BTreeSet::new(),
            lifecycle: None,
            revision: None,
            modified: None,
            created: None,
        }
    }

    /// Copies every field; the legacy mapping context was folded in on the first build.
    pub(super) fn from_connection(connection: &Connection) -> Self {
        let connection = connection.clone();
        Self {
            id: connection.id,
            name: connection.name,
            connection_type: connection.connection_type,
            connection_status: connection.connection_status,
            uri: connection.uri,
            credentials: connection.credentials,
            trusted_certificates: connection.trusted_certificates,
            authorization_context: connection.authorization_context,
            sources: connection.sources,
            targets: connection.targets,
            ssh_tunnel: connection.ssh_tunnel,
            client_count: connection.client_count,
            failover_enabled: connection.failover_enabled,
            validate_certificates: connection.validate_certificates,
            processor_pool_size: connection.processor_pool_size,
            specific_config: connection.specific_config,
            payload_mapping_definition: connection.payload_mapping_definition,
            mapping_context: None,
            tags: connection.tags,
            lifecycle: connection.lifecycle,
            revision: connection.revision,
            modified: connection.modified,
            created: connection.created,
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn connection_type(mut self, connection_type: ConnectionType) -> Self {
        self.connection_type = connection_type;
        self
    }

    pub fn connection_status(mut self, connection_status: ConnectionStatus) -> Self {
        self.connection_status = connection_status;
        self
    }

    pub fn uri(mut self, uri: ConnectionUri) -> Self {
        self.uri = uri;
        self
    }

    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn trusted_certificates(mut self, pem: impl Into<String>) -> Self {
        self.trusted_certificates = Some(pem.into());
        self
    }

    pub fn authorization_context(mut self, context: AuthorizationContext) -> Self {
        self.authorization_context = Some(context);
        self
    }

    pub fn sources(mut self, sources: Vec<Source>) -> Self {
        self.sources = sources;
        self
    }

    pub fn source(mut self, source: Source) -> Self {
        self.sources.push(source);
        self
    }

    pub fn targets(mut self, targets: Vec<Target>) -> Self {
        self.targets = targets;
        self
    }

    pub fn target(mut self, target: Target) -> Self {
        self.targets.push(target);
        self
    }

    pub fn ssh_tunnel(mut self, ssh_tunnel: SshTunnel) -> Self {
        self.ssh_tunnel = Some(ssh_tunnel);
        self
    }

    pub fn client_count(mut self, client_count: u32) -> Self {
        self.client_count = client_count;
        self
    }

    pub fn failover_enabled(mut self, enabled: bool) -> Self {
        self.failover_enabled = enabled;
        self
    }

    pub fn validate_certificates(mut self, enabled: bool) -> Self {
        self.validate_certificates = enabled;
        self
    }

    pub fn processor_pool_size(mut self, pool_size: u32) -> Self {
        self.processor_pool_size = pool_size;
        self
    }

    pub fn specific_config(mut self, specific_config: BTreeMap<String, String>) -> Self {
        self.specific_config = specific_config;
        self
    }

    pub fn payload_mapping_definition(mut self, definition: PayloadMappingDefinition) -> Self {
        self.payload_mapping_definition = definition;
        self
    }

    /// Legacy single mapping context, migrated into the mapping definitions on build.
    pub fn mapping_context(mut self, context: MappingContext) -> Self {
        self.mapping_context = Some(context);
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn lifecycle(mut self, lifecycle: Lifecycle) -> Self {
        self.lifecycle = Some(lifecycle);
        self
    }

    pub fn revision(mut self, revision: i64) -> Self {
        self.revision = Some(revision);
        self
    }

    pub fn modified(mut self, modified: DateTime<Utc>) -> Self {
        self.modified = Some(modified);
        self
    }

    pub fn created(mut self, created: DateTime<Utc>) -> Self {
        self.created = Some(created);
        self
    }

    /// Validates the staged configuration, then migrates legacy shapes.
    ///
    /// All violations are reported together.
    pub fn build(self) -> Result<Connection, ConnectionConfigurationInvalid> {
        let mut violations = Vec::new();
        self.check_sources_or_targets(&mut violations);
        self.check_source_addresses(&mut violations);
        self.check_authorization_contexts(&mut violations);
        self.check_announcement_client_count(&mut violations);
        self.check_counts(&mut violations);

        if !violations.is_empty() {
            connection_event!(
                debug,
                "connectivity::connection",
                "connection_invalid",
                connection = self.id,
                violations = violations.len()
            );
            return Err(ConnectionConfigurationInvalid::new(self.id, violations));
        }

        let connection = migration::migrate_legacy_configuration(self);
        connection_event!(
            trace,
            "connectivity::connection",
            "connection_built",
            connection = connection.id,
            connection_type = connection.connection_type,
            uri = connection.uri.masked()
        );
        Ok(connection)
    }

    fn check_sources_or_targets(&self, violations: &mut Vec<String>) {
        if self.sources.is_empty() && self.targets.is_empty() {
            violations.push("a connection needs at least one source or target".to_string());
        }
    }

    fn check_source_addresses(&self, violations: &mut Vec<String>) {
        for (index, source) in self.sources.iter().enumerate() {
            if source.addresses().is_empty() {
                violations.push(format!("source #{index} needs at least one address"));
            }
        }
    }

    /// An empty connection level context grants nothing, so it counts as absent.
    fn check_authorization_contexts(&self, violations: &mut Vec<String>) {
        if self
            .authorization_context
            .as_ref()
            .is_some_and(|context| !context.is_empty())
        {
            return;
        }

        // Sources without addresses are reported by `check_source_addresses`.
        let sources = self
            .sources
            .iter()
            .filter(|source| !source.addresses().is_empty())
            .filter(|source| source.authorization_context().is_empty())
            .map(ToString::to_string)
            .collect::<Vec<_>>();
        let targets = self
            .targets
            .iter()
            .filter(|target| target.authorization_context().is_empty())
            .map(ToString::to_string)
            .collect::<Vec<_>>();

        if sources.is_empty() && targets.is_empty() {
            return;
        }

        let mut offenders = Vec::new();
        if !sources.is_empty() {
            offenders.push(format!("sources {}", sources.join(", ")));
        }
        if !targets.is_empty() {
            offenders.push(format!("targets {}", targets.join(", ")));
        }
        violations.push(format!(
            "authorization context is missing on {} and the connection defines none",
            offenders.join(" and ")
        ));
    }

    fn check_announcement_client_count(&self, violations: &mut Vec<String>) {
        if self.client_count <= 1 {
            return;
        }
        for target in &self.targets {
            if target.subscribes_to(Topic::ConnectionAnnouncements) {
                violations.push(format!(
                    "target `{}` subscribes to `{}`, which requires clientCount 1 (found {})",
                    target.address(),
                    Topic::ConnectionAnnouncements.name(),
                    self.client_count
                ));
            }
        }
    }

    fn check_counts(&self, violations: &mut Vec<String>) {
        if self.client_count == 0 {
            violations.push("clientCount must be at least 1".to_string());
        }
        if self.processor_pool_size == 0 {
            violations.push("processorPoolSize must be at least 1".to_string());
        }
    }
}

/// Every rule a connection breaks, rendered one per line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("connection `{connection_id}` configuration is invalid:\n{rendered}")]
pub struct ConnectionConfigurationInvalid {
    connection_id: String,
    violations: Vec<String>,
    rendered: String,
}

impl ConnectionConfigurationInvalid {
    pub fn new(connection_id: impl Into<String>, violations: Vec<String>) -> Self {
        let rendered = violations
            .iter()
            .map(|msg| format!("- {msg}"))
            .collect::<Vec<_>>()
            .join("\n");
        Self {
            connection_id: connection_id.into(),
            violations,
            rendered,
        }
    }

    pub fn connection_id(&self) -> &str {
        &self.connection_id
    }

    pub fn violations(&self) -> &[String] {
        &self.violations
    }

    pub fn error_code(&self) -> &'static str {
        "connectivity:connection.configuration.invalid"
    }
}
