//! One-time upgrade of legacy configuration shapes, applied by every successful build.
//!
//! Each step only adds what is missing, so running it on an already migrated connection
//! changes nothing.

use super::builder::ConnectionBuilder;
use super::mapping::HeaderMapping;
use super::source::{ReplyTarget, Source};
use super::target::Target;
use super::{Connection, ConnectionType};
use crate::connection_event;

/// Id under which a legacy `mappingContext` is stored in the mapping definitions.
pub const MIGRATED_MAPPER_ID: &str = "javascript";

/// Reply target address given to sources that enable replies without naming a target.
pub const DEFAULT_REPLY_TARGET_ADDRESS: &str = "{{header:reply-to}}";

const CORRELATION_ID: &str = "correlation-id";
const CONTENT_TYPE: &str = "content-type";
const REPLY_TO: &str = "reply-to";

fn header_placeholder(name: &str) -> String {
    format!("{{{{header:{name}}}}}")
}

fn default_source_header_mapping() -> HeaderMapping {
    HeaderMapping::new(
        [CORRELATION_ID, CONTENT_TYPE, REPLY_TO]
            .into_iter()
            .map(|name| (name, header_placeholder(name))),
    )
}

fn default_reply_target_header_mapping() -> HeaderMapping {
    HeaderMapping::new(
        [CORRELATION_ID, CONTENT_TYPE]
            .into_iter()
            .map(|name| (name, header_placeholder(name))),
    )
}

pub(super) fn migrate_legacy_configuration(builder: ConnectionBuilder) -> Connection {
    let ConnectionBuilder {
        id,
        name,
        connection_type,
        connection_status,
        uri,
        credentials,
        trusted_certificates,
        authorization_context,
        mut sources,
        mut targets,
        ssh_tunnel,
        client_count,
        failover_enabled,
        validate_certificates,
        processor_pool_size,
        specific_config,
        mut payload_mapping_definition,
        mapping_context,
        tags,
        lifecycle,
        revision,
        modified,
        created,
    } = builder;

    if let Some(context) = mapping_context {
        if !payload_mapping_definition.contains(MIGRATED_MAPPER_ID) {
            payload_mapping_definition =
                payload_mapping_definition.with_definition(MIGRATED_MAPPER_ID, context);
        }
        sources = sources.into_iter().map(append_migrated_mapper).collect();
        targets = targets
            .into_iter()
            .map(|target| {
                let payload_mapping = target.payload_mapping().clone();
                target
                    .to_builder()
                    .payload_mapping(payload_mapping.with_mapping(MIGRATED_MAPPER_ID))
                    .build()
            })
            .collect();
        connection_event!(
            debug,
            "connectivity::migration",
            "mapping_context_migrated",
            connection = id,
            mapper = MIGRATED_MAPPER_ID
        );
    }

    let mut migrated_sources = 0usize;
    sources = sources
        .into_iter()
        .map(|source| {
            if source.is_reply_target_enabled() && source.reply_target().is_none() {
                migrated_sources += 1;
                migrate_reply_target(source, connection_type)
            } else {
                source
            }
        })
        .collect();
    if migrated_sources > 0 {
        connection_event!(
            debug,
            "connectivity::migration",
            "reply_targets_migrated",
            connection = id,
            sources = migrated_sources
        );
    }

    if connection_type.requires_target_header_mapping() {
        targets = targets.into_iter().map(reapply_header_mapping).collect();
        connection_event!(
            trace,
            "connectivity::migration",
            "target_header_mapping_applied",
            connection = id,
            targets = targets.len()
        );
    }

    Connection {
        id,
        name,
        connection_type,
        connection_status,
        uri,
        credentials,
        trusted_certificates,
        authorization_context,
        sources,
        targets,
        ssh_tunnel,
        client_count,
        failover_enabled,
        validate_certificates,
        processor_pool_size,
        specific_config,
        payload_mapping_definition,
        tags,
        lifecycle,
        revision,
        modified,
        created,
    }
}

fn append_migrated_mapper(source: Source) -> Source {
    let payload_mapping = source.payload_mapping().clone();
    source
        .to_builder()
        .payload_mapping(payload_mapping.with_mapping(MIGRATED_MAPPER_ID))
        .build()
}

fn migrate_reply_target(source: Source, connection_type: ConnectionType) -> Source {
    let reply_target = ReplyTarget::new(DEFAULT_REPLY_TARGET_ADDRESS);
    if !connection_type.supports_headers() {
        return source.to_builder().reply_target(reply_target).build();
    }

    let header_mapping = source
        .header_mapping()
        .merged_under(&default_source_header_mapping());
    source
        .to_builder()
        .header_mapping(header_mapping)
        .reply_target(reply_target.with_header_mapping(default_reply_target_header_mapping()))
        .build()
}

fn reapply_header_mapping(target: Target) -> Target {
    let header_mapping = target.header_mapping().clone();
    target.to_builder().header_mapping(header_mapping).build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholders_wrap_header_names() {
        assert_eq!(header_placeholder(REPLY_TO), "{{header:reply-to}}");
        assert_eq!(
            header_placeholder(REPLY_TO),
            DEFAULT_REPLY_TARGET_ADDRESS,
            "default reply address reads the reply-to header"
        );
    }

    #[test]
    fn reply_target_defaults_skip_reply_to() {
        let mapping = default_reply_target_header_mapping();
        assert_eq!(mapping.len(), 2);
        assert_eq!(mapping.get(REPLY_TO), None);
        assert_eq!(
            mapping.get(CORRELATION_ID),
            Some("{{header:correlation-id}}")
        );
    }
}
