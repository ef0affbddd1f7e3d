#![allow(clippy::result_large_err)]

pub mod config;
pub mod connection;
pub mod credentials;
pub mod error;
pub mod json;
pub mod logging;
pub mod telemetry;
pub mod topic;
pub mod uri;

pub use connection::{
    Connection, ConnectionBuilder, ConnectionConfigurationInvalid, ConnectionParseError,
    ConnectionStatus, ConnectionType,
};
pub use credentials::{Credentials, CredentialsError};
pub use topic::{FilteredTopic, Topic};
pub use uri::{ConnectionUri, UriInvalid};
