use std::error::Error;
use std::fmt::{self, Display};

/// The kind of error that occurred.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The credentials were rejected by the provider.
    Unauthorized,
    /// The content is moderated.
    Moderated,
    /// The model provider is rate limited.
    RateLimitExceeded,
    /// The provider could not be reached, or the stream broke midway.
    Network,
    /// Any other errors.
    Other,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::Moderated => "moderated",
            ErrorKind::RateLimitExceeded => "rate limit exceeded",
            ErrorKind::Network => "network error",
            ErrorKind::Other => "other error",
        };
        f.write_str(s)
    }
}

/// Errors returned by model providers and their responses.
///
/// The agent only looks at [`ErrorKind`], the rest is shown to the user.
pub trait ModelProviderError: Error + Send + Sync + 'static {
    /// Returns the kind of this error.
    fn kind(&self) -> ErrorKind;
}
