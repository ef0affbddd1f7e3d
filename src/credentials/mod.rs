//! Credentials a connection authenticates with.
//!
//! The set of variants is closed: code that needs variant specific behaviour implements
//! [`CredentialsVisitor`] instead of matching on the enum at every call site. Parsing goes
//! through the discriminator registry in [`registry`], so JSON carrying an unregistered `type`
//! is rejected rather than silently mapped to a default.

pub mod registry;
mod variants;

use crate::json::JsonObject;
use std::fmt;
use thiserror::Error;

pub use registry::{CredentialsFactory, CredentialsRegistry};
pub use variants::{
    ClientCertificateCredentials, HmacCredentials, OAuthClientCredentials,
    OAuthPasswordCredentials, SshPublicKeyCredentials, UserPasswordCredentials,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Credentials {
    ClientCertificate(ClientCertificateCredentials),
    UserPassword(UserPasswordCredentials),
    SshPublicKey(SshPublicKeyCredentials),
    Hmac(HmacCredentials),
    OAuthClientCredentials(OAuthClientCredentials),
    OAuthPassword(OAuthPasswordCredentials),
}

/// One method per credentials variant.
pub trait CredentialsVisitor<T> {
    fn client_certificate(&self, credentials: &ClientCertificateCredentials) -> T;
    fn user_password(&self, credentials: &UserPasswordCredentials) -> T;
    fn ssh_public_key(&self, credentials: &SshPublicKeyCredentials) -> T;
    fn hmac(&self, credentials: &HmacCredentials) -> T;
    fn oauth_client_credentials(&self, credentials: &OAuthClientCredentials) -> T;
    fn oauth_password(&self, credentials: &OAuthPasswordCredentials) -> T;
}

impl Credentials {
    /// Parses through [`CredentialsRegistry::global`].
    pub fn from_json(object: &JsonObject) -> Result<Self, CredentialsError> {
        CredentialsRegistry::global().parse(object)
    }

    pub fn accept<T, V>(&self, visitor: &V) -> T
    where
        V: CredentialsVisitor<T> + ?Sized,
    {
        match self {
            Credentials::ClientCertificate(inner) => visitor.client_certificate(inner),
            Credentials::UserPassword(inner) => visitor.user_password(inner),
            Credentials::SshPublicKey(inner) => visitor.ssh_public_key(inner),
            Credentials::Hmac(inner) => visitor.hmac(inner),
            Credentials::OAuthClientCredentials(inner) => visitor.oauth_client_credentials(inner),
            Credentials::OAuthPassword(inner) => visitor.oauth_password(inner),
        }
    }

    pub fn credentials_type(&self) -> &'static str {
        self.accept(&TypeName)
    }

    /// Full representation including secrets, `type` first.
    pub fn to_json(&self) -> JsonObject {
        self.accept(&ToJson)
    }
}

impl fmt::Display for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.accept(&Summary))
    }
}

struct TypeName;

impl CredentialsVisitor<&'static str> for TypeName {
    fn client_certificate(&self, _: &ClientCertificateCredentials) -> &'static str {
        ClientCertificateCredentials::TYPE
    }

    fn user_password(&self, _: &UserPasswordCredentials) -> &'static str {
        UserPasswordCredentials::TYPE
    }

    fn ssh_public_key(&self, _: &SshPublicKeyCredentials) -> &'static str {
        SshPublicKeyCredentials::TYPE
    }

    fn hmac(&self, _: &HmacCredentials) -> &'static str {
        HmacCredentials::TYPE
    }

    fn oauth_client_credentials(&self, _: &OAuthClientCredentials) -> &'static str {
        OAuthClientCredentials::TYPE
    }

    fn oauth_password(&self, _: &OAuthPasswordCredentials) -> &'static str {
        OAuthPasswordCredentials::TYPE
    }
}

struct ToJson;

impl CredentialsVisitor<JsonObject> for ToJson {
    fn client_certificate(&self, credentials: &ClientCertificateCredentials) -> JsonObject {
        credentials.to_json()
    }

    fn user_password(&self, credentials: &UserPasswordCredentials) -> JsonObject {
        credentials.to_json()
    }

    fn ssh_public_key(&self, credentials: &SshPublicKeyCredentials) -> JsonObject {
        credentials.to_json()
    }

    fn hmac(&self, credentials: &HmacCredentials) -> JsonObject {
        credentials.to_json()
    }

    fn oauth_client_credentials(&self, credentials: &OAuthClientCredentials) -> JsonObject {
        credentials.to_json()
    }

    fn oauth_password(&self, credentials: &OAuthPasswordCredentials) -> JsonObject {
        credentials.to_json()
    }
}

/// Log-safe one-line description; secrets are never part of it.
struct Summary;

impl CredentialsVisitor<String> for Summary {
    fn client_certificate(&self, credentials: &ClientCertificateCredentials) -> String {
        format!(
            "client-cert(cert={}, key={})",
            presence(credentials.client_certificate.is_some()),
            presence(credentials.client_key.is_some())
        )
    }

    fn user_password(&self, credentials: &UserPasswordCredentials) -> String {
        format!("plain(username={})", credentials.username)
    }

    fn ssh_public_key(&self, credentials: &SshPublicKeyCredentials) -> String {
        format!("public-key(username={})", credentials.username)
    }

    fn hmac(&self, credentials: &HmacCredentials) -> String {
        format!("hmac(algorithm={})", credentials.algorithm)
    }

    fn oauth_client_credentials(&self, credentials: &OAuthClientCredentials) -> String {
        format!(
            "oauth-client-credentials(tokenEndpoint={}, clientId={})",
            credentials.token_endpoint, credentials.client_id
        )
    }

    fn oauth_password(&self, credentials: &OAuthPasswordCredentials) -> String {
        format!(
            "oauth-password(tokenEndpoint={}, clientId={}, username={})",
            credentials.token_endpoint, credentials.client_id, credentials.username
        )
    }
}

fn presence(present: bool) -> &'static str {
    if present {
        "set"
    } else {
        "unset"
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialsError {
    #[error("credentials object is missing its `type` field")]
    MissingType,
    #[error("credentials type `{credentials_type}` is not registered")]
    UnknownType { credentials_type: String },
    #[error("credentials of type `{credentials_type}` require field `{field}`")]
    FieldMissing {
        credentials_type: String,
        field: String,
    },
    #[error("credentials of type `{credentials_type}` have an invalid field `{field}`: {reason}")]
    FieldInvalid {
        credentials_type: String,
        field: String,
        reason: String,
    },
}

impl CredentialsError {
    pub fn error_code(&self) -> &'static str {
        match self {
            CredentialsError::UnknownType { .. } => "connectivity:credentials.type.unknown",
            CredentialsError::MissingType | CredentialsError::FieldMissing { .. } => {
                "json.field.missing"
            }
            CredentialsError::FieldInvalid { .. } => "json.field.invalid",
        }
    }
}
