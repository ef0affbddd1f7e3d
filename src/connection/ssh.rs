use super::ConnectionParseError;
use crate::credentials::{
    ClientCertificateCredentials, Credentials, CredentialsVisitor, HmacCredentials,
    OAuthClientCredentials, OAuthPasswordCredentials, SshPublicKeyCredentials,
    UserPasswordCredentials,
};
use crate::json::{FieldDefinition, JsonObject, JsonObjectExt};

const ENABLED: FieldDefinition<bool> = FieldDefinition::new("enabled");
const CREDENTIALS: FieldDefinition<JsonObject> = FieldDefinition::new("credentials");
const VALIDATE_HOST: FieldDefinition<bool> = FieldDefinition::new("validateHost");
const KNOWN_HOSTS: FieldDefinition<Vec<String>> = FieldDefinition::new("knownHosts");
const URI: FieldDefinition<String> = FieldDefinition::new("uri");

/// SSH jump host the connection is tunnelled through.
#[derive(Debug, Clone, PartialEq)]
pub struct SshTunnel {
    pub enabled: bool,
    pub credentials: Credentials,
    pub validate_host: bool,
    pub known_hosts: Vec<String>,
    pub uri: String,
}

impl SshTunnel {
    pub fn new(uri: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            enabled: true,
            credentials,
            validate_host: false,
            known_hosts: Vec::new(),
            uri: uri.into(),
        }
    }

    /// Only username/password and public-key credentials can open a tunnel.
    pub fn supports_credentials(&self) -> bool {
        self.credentials.accept(&TunnelCredentials)
    }

    pub fn from_json(object: &JsonObject) -> Result<Self, ConnectionParseError> {
        let credentials = Credentials::from_json(&object.required(CREDENTIALS)?)?;
        Ok(Self {
            enabled: object.value_of(ENABLED)?.unwrap_or(true),
            credentials,
            validate_host: object.value_of(VALIDATE_HOST)?.unwrap_or(false),
            known_hosts: object.value_of(KNOWN_HOSTS)?.unwrap_or_default(),
            uri: object.required(URI)?,
        })
    }

    pub fn to_json(&self) -> JsonObject {
        let mut object = JsonObject::new();
        object.set(ENABLED, self.enabled);
        object.set(CREDENTIALS, self.credentials.to_json());
        object.set(VALIDATE_HOST, self.validate_host);
        object.set(KNOWN_HOSTS, self.known_hosts.clone());
        object.set(URI, self.uri.clone());
        object
    }
}

struct TunnelCredentials;

impl CredentialsVisitor<bool> for TunnelCredentials {
    fn client_certificate(&self, _: &ClientCertificateCredentials) -> bool {
        false
    }

    fn user_password(&self, _: &UserPasswordCredentials) -> bool {
        true
    }

    fn ssh_public_key(&self, _: &SshPublicKeyCredentials) -> bool {
        true
    }

    fn hmac(&self, _: &HmacCredentials) -> bool {
        false
    }

    fn oauth_client_credentials(&self, _: &OAuthClientCredentials) -> bool {
        false
    }

    fn oauth_password(&self, _: &OAuthPasswordCredentials) -> bool {
        false
    }
}
