//! Line framing for the request stream.
//!
//! Wraps [`tokio_util::codec::LinesCodec`] with a maximum line length to
//! prevent memory exhaustion from an unterminated or maliciously large
//! request line. An over-limit line decodes to [`Frame::Oversized`] instead
//! of a codec error: [`tokio_util::codec::FramedRead`] treats a decode
//! error as terminal and yields `None` on the next poll, while the sentinel
//! keeps the stream alive. The underlying codec discards input up to the
//! next newline, so decoding resumes on the following request. The response
//! side writes complete lines directly and needs no encoder.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, LinesCodec, LinesCodecError};

use crate::{AgentError, Result};

/// Default maximum accepted request line length: 1 MiB.
pub const DEFAULT_MAX_LINE_BYTES: usize = 1_048_576;

/// One decoded inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A complete request line, newline stripped.
    Line(String),
    /// A line that exceeded the configured limit. Its bytes are dropped up
    /// to the next newline; the frame exists so the caller can answer.
    Oversized,
}

/// Decode-side codec for newline-delimited JSON requests.
#[derive(Debug)]
pub struct RpcCodec {
    inner: LinesCodec,
}

impl RpcCodec {
    /// Create a codec enforcing `max_line_bytes` per inbound line.
    #[must_use]
    pub fn new(max_line_bytes: usize) -> Self {
        Self {
            inner: LinesCodec::new_with_max_length(max_line_bytes),
        }
    }
}

impl Default for RpcCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LINE_BYTES)
    }
}

impl Decoder for RpcCodec {
    type Item = Frame;
    type Error = AgentError;

    /// Decode the next newline-terminated line from `src`.
    ///
    /// Returns `Ok(None)` while no complete line is buffered yet.
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        map_decoded(self.inner.decode(src))
    }

    /// Decode the final unterminated line once the stream hits EOF.
    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        map_decoded(self.inner.decode_eof(src))
    }
}

fn map_decoded(
    decoded: std::result::Result<Option<String>, LinesCodecError>,
) -> Result<Option<Frame>> {
    match decoded {
        Ok(line) => Ok(line.map(Frame::Line)),
        Err(LinesCodecError::MaxLineLengthExceeded) => Ok(Some(Frame::Oversized)),
        Err(LinesCodecError::Io(err)) => Err(AgentError::Internal(format!("stream error: {err}"))),
    }
}
