use config::Map;
use connectivity_model::config::{ConnectionLimits, ConnectivitySettings};
use connectivity_model::connection::SshTunnel;
use connectivity_model::credentials::{
    ClientCertificateCredentials, Credentials, UserPasswordCredentials,
};
use connectivity_model::topic::Topic;
use connectivity_model::uri::ConnectionUri;
use connectivity_model::{Connection, ConnectionStatus, ConnectionType};
use insta::assert_snapshot;

#[path = "support/mod.rs"]
mod support;

fn client_certificate() -> Credentials {
    Credentials::ClientCertificate(ClientCertificateCredentials {
        client_certificate: Some("CERT".to_string()),
        client_key: Some("KEY".to_string()),
    })
}

fn http_push(uri: &str) -> Connection {
    Connection::builder(
        "webhook",
        ConnectionType::HttpPush,
        ConnectionStatus::Open,
        support::uri(uri),
    )
    .credentials(client_certificate())
    .target(support::authorized_target("POST:/events", Topic::TwinEvents))
    .build()
    .expect("valid connection")
}

#[test]
fn settings_are_read_from_toml() {
    let settings = ConnectivitySettings::from_toml_str(
        r#"
[limits]
max_sources = 5
blocked_hostnames = ["localhost", "169.254.169.254"]
"#,
    )
    .expect("settings parse");

    assert_eq!(settings.limits.max_sources, 5);
    assert_eq!(settings.limits.max_targets, 100);
    assert_eq!(settings.limits.max_client_count, 10);
    assert_eq!(
        settings.limits.blocked_hostnames,
        ["localhost", "169.254.169.254"]
    );
}

#[test]
fn environment_variables_override_defaults() {
    let mut variables = Map::new();
    variables.insert(
        "CONNECTIVITY__LIMITS__MAX_TARGETS".to_string(),
        "7".to_string(),
    );
    variables.insert(
        "CONNECTIVITY__LIMITS__BLOCKED_HOSTNAMES".to_string(),
        "localhost,metadata.internal".to_string(),
    );

    let settings = ConnectivitySettings::load_with_env(variables).expect("settings load");
    assert_eq!(settings.limits.max_targets, 7);
    assert_eq!(settings.limits.max_sources, 100);
    assert_eq!(
        settings.limits.blocked_hostnames,
        ["localhost", "metadata.internal"]
    );
}

#[test]
fn connections_within_limits_pass() {
    let connection = support::amqp_builder("within")
        .source(support::authorized_source("inbound"))
        .build()
        .expect("valid connection");

    ConnectionLimits::default()
        .validate(&connection)
        .expect("defaults accept a small connection");
}

#[test]
fn count_limits_are_enforced() {
    let connection = support::amqp_builder("crowded")
        .source(support::authorized_source("a"))
        .source(support::authorized_source("b"))
        .target(support::authorized_target("t1", Topic::LiveEvents))
        .target(support::authorized_target("t2", Topic::LiveEvents))
        .client_count(3)
        .build()
        .expect("valid connection");

    let limits = ConnectionLimits {
        max_sources: 1,
        max_targets: 1,
        max_client_count: 2,
        ..ConnectionLimits::default()
    };
    let err = limits.validate(&connection).expect_err("over every limit");

    assert_eq!(err.error_code(), "connectivity:connection.configuration.invalid");
    assert_snapshot!(err.to_string(), @r"
    connection `crowded` configuration is invalid:
    - 2 sources exceed the limit of 1
    - 2 targets exceed the limit of 1
    - clientCount 3 exceeds the limit of 2
    ");
}

#[test]
fn blocked_hosts_are_rejected_for_uri_and_tunnel() {
    let connection = support::amqp_builder("blocked")
        .source(support::authorized_source("inbound"))
        .ssh_tunnel(SshTunnel::new(
            "ssh://Bastion.Internal:22",
            Credentials::UserPassword(UserPasswordCredentials::new("tunnel", "secret")),
        ))
        .build()
        .expect("valid connection");

    let limits = ConnectionLimits {
        blocked_hostnames: vec!["broker.example.com".to_string(), "bastion.internal".to_string()],
        ..ConnectionLimits::default()
    };
    let err = limits.validate(&connection).expect_err("both hosts blocked");

    assert_eq!(
        err.violations(),
        [
            "host `broker.example.com` is blocked",
            "SSH tunnel host `Bastion.Internal` is blocked",
        ]
    );
}

#[test]
fn tunnels_only_accept_password_or_public_key_credentials() {
    let connection = support::amqp_builder("tunnel")
        .source(support::authorized_source("inbound"))
        .ssh_tunnel(SshTunnel::new("ssh://bastion.example.com:22", client_certificate()))
        .build()
        .expect("valid connection");

    let err = ConnectionLimits::default()
        .validate(&connection)
        .expect_err("certificate tunnel");
    assert_eq!(
        err.violations(),
        ["SSH tunnel credentials of type `client-cert` are not supported"]
    );
}

#[test]
fn only_hono_may_leave_the_uri_empty() {
    let build = |connection_type| {
        Connection::builder(
            "no-uri",
            connection_type,
            ConnectionStatus::Open,
            ConnectionUri::empty(),
        )
        .source(support::authorized_source("inbound"))
        .build()
        .expect("structurally valid")
    };

    let limits = ConnectionLimits::default();
    limits
        .validate(&build(ConnectionType::Hono))
        .expect("hono resolves its endpoint elsewhere");

    let err = limits
        .validate(&build(ConnectionType::Kafka))
        .expect_err("kafka needs a URI");
    assert_eq!(err.violations(), ["connection type `kafka` requires a URI"]);
}

#[test]
fn client_certificates_on_http_push_need_https() {
    let limits = ConnectionLimits::default();
    limits
        .validate(&http_push("https://hooks.example.com:443/events"))
        .expect("https accepts client certificates");

    let err = limits
        .validate(&http_push("http://hooks.example.com:80/events"))
        .expect_err("plain http");
    assert_eq!(
        err.violations(),
        ["client certificate credentials need an https URI, found scheme `http`"]
    );
}
