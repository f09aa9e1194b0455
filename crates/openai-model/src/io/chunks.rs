#[cfg(test)]
use std::collections::VecDeque;
use std::fmt::{self, Display};

use bytes::Bytes;
use reqwest::Response;

/// Reading the body failed before it was complete.
#[derive(Debug, PartialEq, Eq)]
pub struct Error(String);

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "response body interrupted: {}", self.0)
    }
}

/// Where the bytes of an event stream come from.
pub enum Chunks {
    Body(Response),
    #[cfg(test)]
    Fixed(VecDeque<Bytes>),
}

impl Chunks {
    #[inline]
    pub fn from_response(response: Response) -> Self {
        Chunks::Body(response)
    }

    #[cfg(test)]
    pub fn from_vec_deque(chunks: VecDeque<Bytes>) -> Self {
        Chunks::Fixed(chunks)
    }

    /// Returns the next chunk, or `None` at the end of the body.
    pub async fn next_chunk(&mut self) -> Result<Option<Bytes>, Error> {
        match self {
            Chunks::Body(response) => response
                .chunk()
                .await
                .map_err(|err| Error(err.to_string())),
            #[cfg(test)]
            Chunks::Fixed(chunks) => Ok(chunks.pop_front()),
        }
    }
}
