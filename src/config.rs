//! Service-side settings for accepting connections.

use crate::connection::{Connection, ConnectionConfigurationInvalid};
use crate::connection_event;
use crate::credentials::Credentials;
use crate::uri::ConnectionUri;
use config::{Config, ConfigError, Environment, File, FileFormat, Map};
use serde::Deserialize;

const DEFAULT_FILE: &str = "config/connectivity";
const ENV_PREFIX: &str = "CONNECTIVITY";
const BLOCKED_HOSTNAMES_KEY: &str = "limits.blocked_hostnames";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConnectivitySettings {
    #[serde(default)]
    pub limits: ConnectionLimits,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionLimits {
    #[serde(default = "default_max_sources")]
    pub max_sources: usize,
    #[serde(default = "default_max_targets")]
    pub max_targets: usize,
    #[serde(default = "default_max_client_count")]
    pub max_client_count: u32,
    #[serde(default)]
    pub blocked_hostnames: Vec<String>,
}

impl Default for ConnectionLimits {
    fn default() -> Self {
        Self {
            max_sources: default_max_sources(),
            max_targets: default_max_targets(),
            max_client_count: default_max_client_count(),
            blocked_hostnames: Vec::new(),
        }
    }
}

const fn default_max_sources() -> usize {
    100
}

const fn default_max_targets() -> usize {
    100
}

const fn default_max_client_count() -> u32 {
    10
}

impl ConnectivitySettings {
    /// Reads `config/connectivity.*` when present, then `CONNECTIVITY__*` variables.
    pub fn load() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::with_name(DEFAULT_FILE).required(false))
            .add_source(environment())
            .build()?
            .try_deserialize()
    }

    /// Same layering as [`load`](Self::load) with explicit variables instead of the process
    /// environment.
    pub fn load_with_env(variables: Map<String, String>) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::with_name(DEFAULT_FILE).required(false))
            .add_source(environment().source(Some(variables)))
            .build()?
            .try_deserialize()
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from_str(raw, FileFormat::Toml))
            .build()?
            .try_deserialize()
    }
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key(BLOCKED_HOSTNAMES_KEY)
}

impl ConnectionLimits {
    pub fn is_blocked(&self, host: &str) -> bool {
        !host.is_empty()
            && self
                .blocked_hostnames
                .iter()
                .any(|blocked| blocked.eq_ignore_ascii_case(host))
    }

    /// Checks a built connection against the service limits, reporting every violation.
    pub fn validate(&self, connection: &Connection) -> Result<(), ConnectionConfigurationInvalid> {
        let mut violations = Vec::new();

        if connection.sources().len() > self.max_sources {
            violations.push(format!(
                "{} sources exceed the limit of {}",
                connection.sources().len(),
                self.max_sources
            ));
        }
        if connection.targets().len() > self.max_targets {
            violations.push(format!(
                "{} targets exceed the limit of {}",
                connection.targets().len(),
                self.max_targets
            ));
        }
        if connection.client_count() > self.max_client_count {
            violations.push(format!(
                "clientCount {} exceeds the limit of {}",
                connection.client_count(),
                self.max_client_count
            ));
        }

        self.check_uri(connection, &mut violations);
        self.check_ssh_tunnel(connection, &mut violations);
        check_client_certificate_scheme(connection, &mut violations);

        if violations.is_empty() {
            Ok(())
        } else {
            connection_event!(
                debug,
                "connectivity::limits",
                "connection_rejected",
                connection = connection.id(),
                violations = violations.len()
            );
            Err(ConnectionConfigurationInvalid::new(
                connection.id(),
                violations,
            ))
        }
    }

    fn check_uri(&self, connection: &Connection, violations: &mut Vec<String>) {
        let uri = connection.uri();
        if uri.is_empty() {
            if connection.connection_type().requires_uri() {
                violations.push(format!(
                    "connection type `{}` requires a URI",
                    connection.connection_type()
                ));
            }
            return;
        }
        if self.is_blocked(uri.host()) {
            violations.push(format!("host `{}` is blocked", uri.host()));
        }
    }

    fn check_ssh_tunnel(&self, connection: &Connection, violations: &mut Vec<String>) {
        let Some(tunnel) = connection.ssh_tunnel() else {
            return;
        };
        if !tunnel.supports_credentials() {
            violations.push(format!(
                "SSH tunnel credentials of type `{}` are not supported",
                tunnel.credentials.credentials_type()
            ));
        }
        match ConnectionUri::parse(Some(&tunnel.uri)) {
            Ok(uri) if self.is_blocked(uri.host()) => {
                violations.push(format!("SSH tunnel host `{}` is blocked", uri.host()));
            }
            Ok(_) => {}
            Err(err) => violations.push(format!("SSH tunnel URI is invalid: {}", err.reason())),
        }
    }
}

fn check_client_certificate_scheme(connection: &Connection, violations: &mut Vec<String>) {
    let uses_client_certificate = matches!(
        connection.credentials(),
        Some(Credentials::ClientCertificate(_))
    );
    if uses_client_certificate
        && connection.connection_type() == crate::connection::ConnectionType::HttpPush
        && connection.uri().scheme() != "https"
    {
        violations.push(format!(
            "client certificate credentials need an https URI, found scheme `{}`",
            connection.uri().scheme()
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocked_hostnames_match_case_insensitively() {
        let limits = ConnectionLimits {
            blocked_hostnames: vec!["Localhost".to_string()],
            ..ConnectionLimits::default()
        };
        assert!(limits.is_blocked("localhost"));
        assert!(!limits.is_blocked("localhost.example"));
        assert!(!limits.is_blocked(""));
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let settings = ConnectivitySettings::from_toml_str("").expect("empty settings");
        assert_eq!(settings.limits.max_sources, 100);
        assert_eq!(settings.limits.max_targets, 100);
        assert_eq!(settings.limits.max_client_count, 10);
        assert!(settings.limits.blocked_hostnames.is_empty());
    }
}
