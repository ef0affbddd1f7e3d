//! Discriminator → decoder table used when credentials are read from JSON.

use super::{
    ClientCertificateCredentials, Credentials, CredentialsError, HmacCredentials,
    OAuthClientCredentials, OAuthPasswordCredentials, SshPublicKeyCredentials,
    UserPasswordCredentials,
};
use crate::json::{FieldDefinition, JsonObject, JsonObjectExt, JsonParseError};
use std::collections::HashMap;
use std::sync::{OnceLock, PoisonError, RwLock};
use tracing::{debug, trace};

const TYPE: FieldDefinition<String> = FieldDefinition::new("type");

pub type CredentialsFactory = fn(&JsonObject) -> Result<Credentials, CredentialsError>;

/// Write-once-per-discriminator table of credentials decoders.
#[derive(Debug, Default)]
pub struct CredentialsRegistry {
    factories: RwLock<HashMap<String, CredentialsFactory>>,
}

impl CredentialsRegistry {
    /// Registry with every built-in variant registered.
    pub fn with_builtin_variants() -> Self {
        let registry = Self::default();
        registry.register(
            ClientCertificateCredentials::TYPE,
            ClientCertificateCredentials::from_json,
        );
        registry.register(UserPasswordCredentials::TYPE, UserPasswordCredentials::from_json);
        registry.register(SshPublicKeyCredentials::TYPE, SshPublicKeyCredentials::from_json);
        registry.register(HmacCredentials::TYPE, HmacCredentials::from_json);
        registry.register(OAuthClientCredentials::TYPE, OAuthClientCredentials::from_json);
        registry.register(OAuthPasswordCredentials::TYPE, OAuthPasswordCredentials::from_json);
        registry
    }

    /// Process-wide registry, populated with the built-in variants on first access.
    pub fn global() -> &'static Self {
        static INSTANCE: OnceLock<CredentialsRegistry> = OnceLock::new();
        INSTANCE.get_or_init(Self::with_builtin_variants)
    }

    /// Inserts `factory` unless `discriminator` is already taken. Returns whether it inserted.
    pub fn register(&self, discriminator: impl Into<String>, factory: CredentialsFactory) -> bool {
        let discriminator = discriminator.into();
        let mut factories = self
            .factories
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if factories.contains_key(&discriminator) {
            trace!(
                target = "credentials.registry",
                event = "register_skipped",
                discriminator = %discriminator,
            );
            return false;
        }

        debug!(
            target = "credentials.registry",
            event = "registered",
            discriminator = %discriminator,
        );
        factories.insert(discriminator, factory);
        true
    }

    pub fn is_registered(&self, discriminator: &str) -> bool {
        self.factories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(discriminator)
    }

    pub fn discriminators(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .factories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    pub fn parse(&self, object: &JsonObject) -> Result<Credentials, CredentialsError> {
        let credentials_type = match object.value_of(TYPE) {
            Ok(Some(value)) => value,
            Ok(None) => return Err(CredentialsError::MissingType),
            Err(JsonParseError::WrongType { expected, .. }) => {
                return Err(CredentialsError::FieldInvalid {
                    credentials_type: "<unknown>".to_string(),
                    field: TYPE.key().to_string(),
                    reason: format!("expected a {expected}"),
                })
            }
            Err(other) => {
                return Err(CredentialsError::FieldInvalid {
                    credentials_type: "<unknown>".to_string(),
                    field: TYPE.key().to_string(),
                    reason: other.to_string(),
                })
            }
        };

        // Copy the fn pointer out so the decoder runs without holding the lock.
        let factory = self
            .factories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&credentials_type)
            .copied();

        match factory {
            Some(factory) => factory(object),
            None => Err(CredentialsError::UnknownType { credentials_type }),
        }
    }
}
