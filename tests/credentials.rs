use connectivity_model::credentials::{
    Credentials, CredentialsError, CredentialsRegistry, HmacCredentials, UserPasswordCredentials,
};
use connectivity_model::json::JsonObject;
use serde_json::json;

#[path = "support/mod.rs"]
mod support;

#[test]
fn builtin_discriminators_are_registered() {
    let registry = CredentialsRegistry::with_builtin_variants();
    assert_eq!(
        registry.discriminators(),
        vec![
            "client-cert",
            "hmac",
            "oauth-client-credentials",
            "oauth-password",
            "plain",
            "public-key",
        ]
    );
}

#[test]
fn parses_each_builtin_variant() {
    let documents = [
        json!({ "type": "client-cert", "cert": "CERT", "key": "KEY" }),
        json!({ "type": "plain", "username": "alice", "password": "secret" }),
        json!({
            "type": "public-key",
            "username": "tunnel",
            "publicKey": "ssh-ed25519 AAAA",
            "privateKey": "PRIVATE"
        }),
        json!({ "type": "hmac", "algorithm": "az-monitor-2016-04-01", "parameters": { "sharedKey": "k" } }),
        json!({
            "type": "oauth-client-credentials",
            "tokenEndpoint": "https://auth.example.com/token",
            "clientId": "connectivity",
            "clientSecret": "shh",
            "requestedScopes": "read write"
        }),
        json!({
            "type": "oauth-password",
            "tokenEndpoint": "https://auth.example.com/token",
            "clientId": "connectivity",
            "requestedScopes": "read",
            "username": "bob",
            "password": "hunter2"
        }),
    ];

    for document in documents {
        let object = support::object(document);
        let credentials = Credentials::from_json(&object).expect("builtin variant parses");
        assert_eq!(
            Some(credentials.credentials_type()),
            object.get("type").and_then(|value| value.as_str())
        );
        assert_eq!(credentials.to_json(), object, "serialization mirrors input");
    }
}

#[test]
fn unknown_discriminator_is_rejected() {
    let object = support::object(json!({ "type": "kerberos", "principal": "svc" }));
    let err = Credentials::from_json(&object).expect_err("unregistered type");
    assert_eq!(
        err,
        CredentialsError::UnknownType {
            credentials_type: "kerberos".to_string()
        }
    );
    assert_eq!(err.error_code(), "connectivity:credentials.type.unknown");
}

#[test]
fn missing_type_and_fields_are_reported() {
    let err = Credentials::from_json(&JsonObject::new()).expect_err("no type");
    assert_eq!(err, CredentialsError::MissingType);
    assert_eq!(err.error_code(), "json.field.missing");

    let object = support::object(json!({ "type": "plain", "username": "alice" }));
    let err = Credentials::from_json(&object).expect_err("password missing");
    assert_eq!(
        err,
        CredentialsError::FieldMissing {
            credentials_type: "plain".to_string(),
            field: "password".to_string()
        }
    );
}

#[test]
fn mistyped_fields_are_invalid() {
    let object = support::object(json!({ "type": "plain", "username": 7, "password": "x" }));
    let err = Credentials::from_json(&object).expect_err("username must be a string");
    assert_eq!(err.error_code(), "json.field.invalid");
    assert!(err.to_string().contains("`username`"), "{err}");

    let object = support::object(json!({ "type": ["plain"] }));
    let err = Credentials::from_json(&object).expect_err("type must be a string");
    assert_eq!(err.error_code(), "json.field.invalid");
}

fn decode_as_plain(object: &JsonObject) -> Result<Credentials, CredentialsError> {
    UserPasswordCredentials::from_json(object)
}

#[test]
fn registration_keeps_the_first_factory() {
    let registry = CredentialsRegistry::default();
    assert!(!registry.is_registered("legacy-plain"));
    assert!(registry.register("legacy-plain", decode_as_plain));
    assert!(!registry.register("legacy-plain", HmacCredentials::from_json));
    assert!(registry.is_registered("legacy-plain"));

    let object = support::object(
        json!({ "type": "legacy-plain", "username": "alice", "password": "secret" }),
    );
    let credentials = registry.parse(&object).expect("registered alias parses");
    assert_eq!(
        credentials,
        Credentials::UserPassword(UserPasswordCredentials::new("alice", "secret"))
    );
}

#[test]
fn concurrent_registration_inserts_once_while_readers_parse() {
    let registry = CredentialsRegistry::with_builtin_variants();
    let object = support::object(
        json!({ "type": "legacy-plain", "username": "alice", "password": "secret" }),
    );

    let shared = &registry;
    let document = &object;

    let (inserted, parsed) = std::thread::scope(|scope| {
        let writers = (0..8)
            .map(|_| scope.spawn(move || shared.register("legacy-plain", decode_as_plain)))
            .collect::<Vec<_>>();
        let readers = (0..8)
            .map(|_| {
                scope.spawn(move || (0..50).map(|_| shared.parse(document)).collect::<Vec<_>>())
            })
            .collect::<Vec<_>>();

        let inserted = writers
            .into_iter()
            .map(|writer| writer.join().expect("writer thread"))
            .filter(|inserted| *inserted)
            .count();
        let parsed = readers
            .into_iter()
            .flat_map(|reader| reader.join().expect("reader thread"))
            .collect::<Vec<_>>();
        (inserted, parsed)
    });

    assert_eq!(inserted, 1);
    for result in parsed {
        match result {
            Ok(credentials) => assert_eq!(
                credentials,
                Credentials::UserPassword(UserPasswordCredentials::new("alice", "secret"))
            ),
            Err(CredentialsError::UnknownType { credentials_type }) => {
                assert_eq!(credentials_type, "legacy-plain")
            }
            Err(other) => panic!("unexpected parse error: {other}"),
        }
    }
    assert!(registry.parse(&object).is_ok());
}

#[test]
fn global_registry_is_shared() {
    let first = CredentialsRegistry::global() as *const CredentialsRegistry;
    let second = CredentialsRegistry::global() as *const CredentialsRegistry;
    assert_eq!(first, second);
    assert!(CredentialsRegistry::global().is_registered("plain"));
}

#[test]
fn display_and_debug_hide_secrets() {
    let credentials = Credentials::UserPassword(UserPasswordCredentials::new("alice", "hunter2"));
    assert_eq!(credentials.to_string(), "plain(username=alice)");
    assert!(!format!("{credentials:?}").contains("hunter2"));

    let hmac = support::object(
        json!({ "type": "hmac", "algorithm": "aws4-hmac-sha256", "parameters": { "secretKey": "s3cr3t" } }),
    );
    let credentials = Credentials::from_json(&hmac).expect("hmac parses");
    assert_eq!(credentials.to_string(), "hmac(algorithm=aws4-hmac-sha256)");
    let debug = format!("{credentials:?}");
    assert!(debug.contains("secretKey"), "{debug}");
    assert!(!debug.contains("s3cr3t"), "{debug}");
}
