use std::fmt::{self, Display};

use super::{Chunks, ChunksError};

#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    Body(ChunksError),
    InvalidPayload,
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Body(err) => err.fmt(f),
            Error::InvalidPayload => f.write_str("malformed event stream"),
        }
    }
}

/// Reads the `data` payloads of server-sent events from a chunk stream.
///
/// Only the subset used by chat completion streams is supported: events
/// are separated by a blank line (`\n\n`), comment lines are skipped, and
/// fields other than `data` are ignored. Multiple `data` lines in one event
/// are joined with `\n`.
pub struct Sse {
    buf: String,
    // Bytes of a UTF-8 sequence split across two chunks.
    pending: Vec<u8>,
    chunks: Chunks,
}

impl Sse {
    #[inline]
    pub fn new(chunks: Chunks) -> Self {
        Self {
            buf: String::new(),
            pending: Vec::new(),
            chunks,
        }
    }

    pub async fn next_event(&mut self) -> Result<Option<String>, Error> {
        loop {
            // Drain what is already buffered before reading more.
            if let Some(event) = self.try_parse_event()? {
                return Ok(Some(event));
            }

            let Some(bytes) =
                self.chunks.next_chunk().await.map_err(Error::Body)?
            else {
                return Ok(None);
            };
            self.pending.extend_from_slice(&bytes);
            match std::str::from_utf8(&self.pending) {
                Ok(s) => {
                    self.buf.push_str(s);
                    self.pending.clear();
                }
                Err(err) if err.error_len().is_none() => {
                    // Incomplete trailing sequence, keep it for later.
                    let valid = err.valid_up_to();
                    let s = std::str::from_utf8(&self.pending[..valid])
                        .map_err(|_| Error::InvalidPayload)?;
                    self.buf.push_str(s);
                    self.pending.drain(..valid);
                }
                Err(_) => return Err(Error::InvalidPayload),
            }
        }
    }

    fn try_parse_event(&mut self) -> Result<Option<String>, Error> {
        loop {
            let Some(eol_idx) = self.buf.find("\n\n") else {
                return Ok(None);
            };

            let mut data: Option<String> = None;
            for line in self.buf[..eol_idx].lines() {
                if line.is_empty() || line.starts_with(':') {
                    continue;
                }
                let Some((field, value)) = line.split_once(':') else {
                    return Err(Error::InvalidPayload);
                };
                if field != "data" {
                    continue;
                }
                let value = value.strip_prefix(' ').unwrap_or(value);
                match &mut data {
                    Some(data) => {
                        data.push('\n');
                        data.push_str(value);
                    }
                    None => data = Some(value.to_owned()),
                }
            }
            self.buf.drain(..eol_idx + 2);

            // Events without data (e.g. keep-alive comments) are skipped.
            if data.is_some() {
                return Ok(data);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    fn sse_from(chunks: &[&'static [u8]]) -> Sse {
        let chunks = chunks.iter().map(|c| Bytes::from_static(c)).collect();
        Sse::new(Chunks::from_vec_deque(chunks))
    }

    #[tokio::test]
    async fn test_normal_events() {
        let mut sse = sse_from(&[b"data: hello\n\n", b"data: bye\n\n"]);
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "hello");
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "bye");
        assert_eq!(sse.next_event().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_events_in_one_chunk() {
        let mut sse = sse_from(&[b"data: {\"a\": 1}\n\ndata: [DONE]\n\n"]);
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "{\"a\": 1}");
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "[DONE]");
        assert_eq!(sse.next_event().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_quirk_streaming() {
        let mut sse = sse_from(&[b"data:", b" hello\n", b"\n"]);
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "hello");
        assert_eq!(sse.next_event().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_split_utf8() {
        // "é" is 0xC3 0xA9.
        let mut sse = sse_from(&[b"data: caf\xC3", b"\xA9\n\n"]);
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "café");
    }

    #[tokio::test]
    async fn test_comments_and_other_fields() {
        let mut sse = sse_from(&[
            b": keep-alive\n\n",
            b"event: message\nid: 3\ndata: first\ndata: second\n\n",
        ]);
        assert_eq!(sse.next_event().await.unwrap().unwrap(), "first\nsecond");
        assert_eq!(sse.next_event().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_invalid_data() {
        let mut sse = sse_from(&[b"xxxxxx\n\n"]);
        assert_eq!(sse.next_event().await.unwrap_err(), Error::InvalidPayload);

        let mut sse = sse_from(&[b"xxxxxx\n"]);
        assert_eq!(sse.next_event().await.unwrap(), None);

        let mut sse = sse_from(&[b"data: hello\n", b"data: bye\n"]);
        assert_eq!(sse.next_event().await.unwrap(), None);

        let mut sse = sse_from(&[b"data: \xFF\xFE\n\n"]);
        assert_eq!(sse.next_event().await.unwrap_err(), Error::InvalidPayload);
    }
}
