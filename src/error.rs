#![forbid(unsafe_code)]

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Message(String),
    #[error("JSON error: {0}")]
    Json(#[from] crate::json::JsonParseError),
    #[error(transparent)]
    Uri(#[from] crate::uri::UriInvalid),
    #[error("credentials error: {0}")]
    Credentials(#[from] crate::credentials::CredentialsError),
    #[error(transparent)]
    Topic(#[from] crate::topic::TopicParseError),
    #[error(transparent)]
    Configuration(#[from] crate::connection::ConnectionConfigurationInvalid),
    #[error("connection parse error: {0}")]
    ConnectionParse(#[from] crate::connection::ConnectionParseError),
    #[error("settings error: {0}")]
    Settings(#[from] config::ConfigError),
    #[error("{context}")]
    Context {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    pub fn new<E>(error: E) -> Self
    where
        Error: From<E>,
    {
        error.into()
    }

    pub fn msg<M>(message: M) -> Self
    where
        M: Into<String>,
    {
        Self::Message(message.into())
    }

    pub fn with_context<M>(context: M, source: Error) -> Self
    where
        M: Into<String>,
    {
        Self::Context {
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// Machine readable code of the innermost model error, if any.
    pub fn error_code(&self) -> Option<&'static str> {
        match self {
            Error::Json(err) => Some(err.error_code()),
            Error::Uri(err) => Some(err.error_code()),
            Error::Credentials(err) => Some(err.error_code()),
            Error::Topic(err) => Some(err.error_code()),
            Error::Configuration(err) => Some(err.error_code()),
            Error::ConnectionParse(err) => Some(err.error_code()),
            Error::Context { source, .. } => source.error_code(),
            Error::Message(_) | Error::Settings(_) => None,
        }
    }
}

pub trait Context<T> {
    fn context<C>(self, context: C) -> Result<T>
    where
        C: Into<String>;

    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>;
}

impl<T, E> Context<T> for std::result::Result<T, E>
where
    Error: From<E>,
{
    fn context<C>(self, context: C) -> Result<T>
    where
        C: Into<String>,
    {
        self.map_err(|err| Error::with_context(context.into(), err.into()))
    }

    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>,
    {
        self.map_err(|err| Error::with_context(f().into(), err.into()))
    }
}

impl From<String> for Error {
    fn from(value: String) -> Self {
        Error::Message(value)
    }
}

impl From<&str> for Error {
    fn from(value: &str) -> Self {
        Error::Message(value.to_string())
    }
}

#[macro_export]
macro_rules! err {
    ($fmt:literal $(, $arg:expr)* $(,)?) => {{
        $crate::error::Error::msg(format!($fmt $(, $arg)*))
    }};
    ($err:expr) => {{
        $crate::error::Error::new($err)
    }};
}

#[macro_export]
macro_rules! bail_err {
    ($($arg:tt)*) => {{
        return Err($crate::err!($($arg)*));
    }};
}
