use std::error::Error as StdError;
use std::fmt::{self, Display};
use std::time::Duration;

use rmcp::service::ServiceError;

type BoxedSource = Box<dyn StdError + Send + Sync + 'static>;

/// The kind of an MCP client error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The server process could not be launched.
    Spawn,
    /// The server went away before answering.
    ConnectionClosed,
    /// The server did not answer in time.
    Timeout,
    /// The server sent something that doesn't follow the protocol.
    Protocol,
    /// The server answered with a JSON-RPC error.
    Rpc,
}

/// Error returned by the MCP client.
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    message: String,
    code: Option<i64>,
    source: Option<BoxedSource>,
}

impl Error {
    fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            code: None,
            source: None,
        }
    }

    fn with_source(mut self, source: impl Into<BoxedSource>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub(crate) fn spawn(
        message: impl Into<String>,
        source: impl Into<BoxedSource>,
    ) -> Self {
        Self::new(ErrorKind::Spawn, message).with_source(source)
    }

    fn connection_closed() -> Self {
        Self::new(ErrorKind::ConnectionClosed, "connection closed")
    }

    pub(crate) fn timeout(method: &str, after: Duration) -> Self {
        Self::new(
            ErrorKind::Timeout,
            format!("`{method}` timed out after {}s", after.as_secs_f32()),
        )
    }

    pub(crate) fn protocol(
        message: impl Into<String>,
        source: impl Into<BoxedSource>,
    ) -> Self {
        Self::new(ErrorKind::Protocol, message).with_source(source)
    }

    fn rpc(code: i64, message: &str) -> Self {
        Self {
            code: Some(code),
            ..Self::new(ErrorKind::Rpc, format!("{message} ({code})"))
        }
    }

    /// Returns the kind of this error.
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the JSON-RPC error code for [`ErrorKind::Rpc`] errors.
    #[inline]
    pub fn code(&self) -> Option<i64> {
        self.code
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_deref()
            .map(|err| err as &(dyn StdError + 'static))
    }
}

impl From<ServiceError> for Error {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::McpError(err) => {
                Self::rpc(i64::from(err.code.0), &err.message)
            }
            ServiceError::TransportClosed => Self::connection_closed(),
            err => Self::protocol("request failed", err.to_string()),
        }
    }
}

/// A server of a group failed to start.
#[derive(Debug)]
pub struct StartError {
    server: String,
    source: Error,
}

impl StartError {
    pub(crate) fn new(server: impl Into<String>, source: Error) -> Self {
        Self {
            server: server.into(),
            source,
        }
    }

    /// Returns the name of the server that failed.
    #[inline]
    pub fn server(&self) -> &str {
        &self.server
    }

    /// Returns the underlying client error.
    #[inline]
    pub fn error(&self) -> &Error {
        &self.source
    }
}

impl Display for StartError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to start MCP server `{}`", self.server)
    }
}

impl StdError for StartError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(&self.source)
    }
}
