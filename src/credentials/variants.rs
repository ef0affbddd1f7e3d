use super::{Credentials, CredentialsError};
use crate::json::{FieldDefinition, FromJsonValue, JsonObject, JsonObjectExt, JsonParseError};
use std::fmt;

const TYPE: FieldDefinition<String> = FieldDefinition::new("type");
const CERT: FieldDefinition<String> = FieldDefinition::new("cert");
const KEY: FieldDefinition<String> = FieldDefinition::new("key");
const USERNAME: FieldDefinition<String> = FieldDefinition::new("username");
const PASSWORD: FieldDefinition<String> = FieldDefinition::new("password");
const PUBLIC_KEY: FieldDefinition<String> = FieldDefinition::new("publicKey");
const PRIVATE_KEY: FieldDefinition<String> = FieldDefinition::new("privateKey");
const ALGORITHM: FieldDefinition<String> = FieldDefinition::new("algorithm");
const PARAMETERS: FieldDefinition<JsonObject> = FieldDefinition::new("parameters");
const TOKEN_ENDPOINT: FieldDefinition<String> = FieldDefinition::new("tokenEndpoint");
const CLIENT_ID: FieldDefinition<String> = FieldDefinition::new("clientId");
const CLIENT_SECRET: FieldDefinition<String> = FieldDefinition::new("clientSecret");
const REQUESTED_SCOPES: FieldDefinition<String> = FieldDefinition::new("requestedScopes");
const AUDIENCE: FieldDefinition<String> = FieldDefinition::new("audience");

const REDACTED: &str = "<redacted>";

/// Reads fields of one credentials object and tags failures with its discriminator.
struct FieldReader<'a> {
    credentials_type: &'static str,
    object: &'a JsonObject,
}

impl<'a> FieldReader<'a> {
    fn new(credentials_type: &'static str, object: &'a JsonObject) -> Self {
        Self {
            credentials_type,
            object,
        }
    }

    fn optional<T: FromJsonValue>(
        &self,
        field: FieldDefinition<T>,
    ) -> Result<Option<T>, CredentialsError> {
        self.object
            .value_of(field)
            .map_err(|err| self.field_error(field.key(), err))
    }

    fn required<T: FromJsonValue>(&self, field: FieldDefinition<T>) -> Result<T, CredentialsError> {
        self.object
            .required(field)
            .map_err(|err| self.field_error(field.key(), err))
    }

    fn field_error(&self, field: &str, err: JsonParseError) -> CredentialsError {
        match err {
            JsonParseError::MissingField { .. } => CredentialsError::FieldMissing {
                credentials_type: self.credentials_type.to_string(),
                field: field.to_string(),
            },
            other => CredentialsError::FieldInvalid {
                credentials_type: self.credentials_type.to_string(),
                field: field.to_string(),
                reason: other.to_string(),
            },
        }
    }
}

fn typed_object(credentials_type: &str) -> JsonObject {
    let mut object = JsonObject::new();
    object.set(TYPE, credentials_type);
    object
}

fn redact(value: Option<&str>) -> Option<&'static str> {
    value.map(|_| REDACTED)
}

/// X.509 client certificate and private key, both PEM encoded.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ClientCertificateCredentials {
    pub client_certificate: Option<String>,
    pub client_key: Option<String>,
}

impl ClientCertificateCredentials {
    pub const TYPE: &'static str = "client-cert";

    pub fn from_json(object: &JsonObject) -> Result<Credentials, CredentialsError> {
        let reader = FieldReader::new(Self::TYPE, object);
        Ok(Credentials::ClientCertificate(Self {
            client_certificate: reader.optional(CERT)?,
            client_key: reader.optional(KEY)?,
        }))
    }

    pub fn to_json(&self) -> JsonObject {
        let mut object = typed_object(Self::TYPE);
        object.set_if_some(CERT, self.client_certificate.clone());
        object.set_if_some(KEY, self.client_key.clone());
        object
    }
}

impl fmt::Debug for ClientCertificateCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCertificateCredentials")
            .field("has_client_certificate", &self.client_certificate.is_some())
            .field("client_key", &redact(self.client_key.as_deref()))
            .finish()
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct UserPasswordCredentials {
    pub username: String,
    pub password: String,
}

impl UserPasswordCredentials {
    pub const TYPE: &'static str = "plain";

    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn from_json(object: &JsonObject) -> Result<Credentials, CredentialsError> {
        let reader = FieldReader::new(Self::TYPE, object);
        Ok(Credentials::UserPassword(Self {
            username: reader.required(USERNAME)?,
            password: reader.required(PASSWORD)?,
        }))
    }

    pub fn to_json(&self) -> JsonObject {
        let mut object = typed_object(Self::TYPE);
        object.set(USERNAME, self.username.clone());
        object.set(PASSWORD, self.password.clone());
        object
    }
}

impl fmt::Debug for UserPasswordCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserPasswordCredentials")
            .field("username", &self.username)
            .field("password", &REDACTED)
            .finish()
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct SshPublicKeyCredentials {
    pub username: String,
    pub public_key: String,
    pub private_key: String,
}

impl SshPublicKeyCredentials {
    pub const TYPE: &'static str = "public-key";

    pub fn from_json(object: &JsonObject) -> Result<Credentials, CredentialsError> {
        let reader = FieldReader::new(Self::TYPE, object);
        Ok(Credentials::SshPublicKey(Self {
            username: reader.required(USERNAME)?,
            public_key: reader.required(PUBLIC_KEY)?,
            private_key: reader.required(PRIVATE_KEY)?,
        }))
    }

    pub fn to_json(&self) -> JsonObject {
        let mut object = typed_object(Self::TYPE);
        object.set(USERNAME, self.username.clone());
        object.set(PUBLIC_KEY, self.public_key.clone());
        object.set(PRIVATE_KEY, self.private_key.clone());
        object
    }
}

impl fmt::Debug for SshPublicKeyCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SshPublicKeyCredentials")
            .field("username", &self.username)
            .field("public_key", &self.public_key)
            .field("private_key", &REDACTED)
            .finish()
    }
}

/// Request signing with a named algorithm; `parameters` are algorithm specific.
#[derive(Clone, PartialEq)]
pub struct HmacCredentials {
    pub algorithm: String,
    pub parameters: JsonObject,
}

impl HmacCredentials {
    pub const TYPE: &'static str = "hmac";

    pub fn from_json(object: &JsonObject) -> Result<Credentials, CredentialsError> {
        let reader = FieldReader::new(Self::TYPE, object);
        Ok(Credentials::Hmac(Self {
            algorithm: reader.required(ALGORITHM)?,
            parameters: reader.optional(PARAMETERS)?.unwrap_or_default(),
        }))
    }

    pub fn to_json(&self) -> JsonObject {
        let mut object = typed_object(Self::TYPE);
        object.set(ALGORITHM, self.algorithm.clone());
        object.set(PARAMETERS, self.parameters.clone());
        object
    }
}

impl fmt::Debug for HmacCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Parameters may carry shared keys; only their names are shown.
        f.debug_struct("HmacCredentials")
            .field("algorithm", &self.algorithm)
            .field("parameters", &self.parameters.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct OAuthClientCredentials {
    pub token_endpoint: String,
    pub client_id: String,
    pub client_secret: Option<String>,
    pub requested_scopes: String,
    pub audience: Option<String>,
}

impl OAuthClientCredentials {
    pub const TYPE: &'static str = "oauth-client-credentials";

    pub fn from_json(object: &JsonObject) -> Result<Credentials, CredentialsError> {
        let reader = FieldReader::new(Self::TYPE, object);
        Ok(Credentials::OAuthClientCredentials(Self {
            token_endpoint: reader.required(TOKEN_ENDPOINT)?,
            client_id: reader.required(CLIENT_ID)?,
            client_secret: reader.optional(CLIENT_SECRET)?,
            requested_scopes: reader.required(REQUESTED_SCOPES)?,
            audience: reader.optional(AUDIENCE)?,
        }))
    }

    pub fn to_json(&self) -> JsonObject {
        let mut object = typed_object(Self::TYPE);
        object.set(TOKEN_ENDPOINT, self.token_endpoint.clone());
        object.set(CLIENT_ID, self.client_id.clone());
        object.set_if_some(CLIENT_SECRET, self.client_secret.clone());
        object.set(REQUESTED_SCOPES, self.requested_scopes.clone());
        object.set_if_some(AUDIENCE, self.audience.clone());
        object
    }
}

impl fmt::Debug for OAuthClientCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthClientCredentials")
            .field("token_endpoint", &self.token_endpoint)
            .field("client_id", &self.client_id)
            .field("client_secret", &redact(self.client_secret.as_deref()))
            .field("requested_scopes", &self.requested_scopes)
            .field("audience", &self.audience)
            .finish()
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct OAuthPasswordCredentials {
    pub token_endpoint: String,
    pub client_id: String,
    pub client_secret: Option<String>,
    pub requested_scopes: String,
    pub username: String,
    pub password: String,
    pub audience: Option<String>,
}

impl OAuthPasswordCredentials {
    pub const TYPE: &'static str = "oauth-password";

    pub fn from_json(object: &JsonObject) -> Result<Credentials, CredentialsError> {
        let reader = FieldReader::new(Self::TYPE, object);
        Ok(Credentials::OAuthPassword(Self {
            token_endpoint: reader.required(TOKEN_ENDPOINT)?,
            client_id: reader.required(CLIENT_ID)?,
            client_secret: reader.optional(CLIENT_SECRET)?,
            requested_scopes: reader.required(REQUESTED_SCOPES)?,
            username: reader.required(USERNAME)?,
            password: reader.required(PASSWORD)?,
            audience: reader.optional(AUDIENCE)?,
        }))
    }

    pub fn to_json(&self) -> JsonObject {
        let mut object = typed_object(Self::TYPE);
        object.set(TOKEN_ENDPOINT, self.token_endpoint.clone());
        object.set(CLIENT_ID, self.client_id.clone());
        object.set_if_some(CLIENT_SECRET, self.client_secret.clone());
        object.set(REQUESTED_SCOPES, self.requested_scopes.clone());
        object.set(USERNAME, self.username.clone());
        object.set(PASSWORD, self.password.clone());
        object.set_if_some(AUDIENCE, self.audience.clone());
        object
    }
}

impl fmt::Debug for OAuthPasswordCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthPasswordCredentials")
            .field("token_endpoint", &self.token_endpoint)
            .field("client_id", &self.client_id)
            .field("client_secret", &redact(self.client_secret.as_deref()))
            .field("requested_scopes", &self.requested_scopes)
            .field("username", &self.username)
            .field("password", &REDACTED)
            .field("audience", &self.audience)
            .finish()
    }
}
