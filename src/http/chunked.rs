//! Reassembly of `Transfer-Encoding: chunked` bodies.
//!
//! Each chunk is `<hex-size>CRLF<data>CRLF`; a chunk of size zero ends the
//! body. Segments are fed in arrival order and a chunk may straddle segment
//! boundaries.

use bytes::{Buf, Bytes, BytesMut};

use crate::http::parser::ParseError;

/// The zero-size chunk that ends a chunked body, with its empty trailer.
pub const TERMINAL_CHUNK: &[u8] = b"0\r\n\r\n";

/// Returns `true` if `segment` ends with [`TERMINAL_CHUNK`].
pub fn ends_with_terminal_chunk(segment: &[u8]) -> bool {
    segment.ends_with(TERMINAL_CHUNK)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Waiting for a `<hex-size>CRLF` line.
    Size,
    /// Reading `remaining` bytes of chunk data.
    Data { remaining: usize },
    /// Expecting the CRLF that follows chunk data.
    DataEnd,
    Done,
}

/// Incremental chunked-body decoder.
#[derive(Debug)]
pub struct ChunkedDecoder {
    pending: BytesMut,
    decoded: BytesMut,
    state: State,
}

impl ChunkedDecoder {
    pub fn new() -> Self {
        Self {
            pending: BytesMut::new(),
            decoded: BytesMut::new(),
            state: State::Size,
        }
    }

    /// Decodes as much of `segment` as possible.
    ///
    /// Returns `true` once the terminal chunk has been seen. Bytes after it
    /// (trailers) are ignored.
    pub fn feed(&mut self, segment: &[u8]) -> Result<bool, ParseError> {
        if self.state == State::Done {
            return Ok(true);
        }
        self.pending.extend_from_slice(segment);

        loop {
            match self.state {
                State::Size => {
                    let Some(end) = self.pending.windows(2).position(|w| w == b"\r\n") else {
                        return Ok(false);
                    };
                    let line = self.pending.split_to(end + 2);
                    let size = parse_chunk_size(&line[..end])?;

                    self.state = if size == 0 {
                        State::Done
                    } else {
                        State::Data { remaining: size }
                    };
                }
                State::Data { remaining } => {
                    if self.pending.is_empty() {
                        return Ok(false);
                    }
                    let take = remaining.min(self.pending.len());
                    self.decoded.extend_from_slice(&self.pending.split_to(take));

                    self.state = if take == remaining {
                        State::DataEnd
                    } else {
                        State::Data { remaining: remaining - take }
                    };
                }
                State::DataEnd => {
                    if self.pending.len() < 2 {
                        return Ok(false);
                    }
                    if &self.pending[..2] != b"\r\n" {
                        return Err(ParseError::MalformedEntry(
                            "chunk data not followed by CRLF".to_string(),
                        ));
                    }
                    self.pending.advance(2);
                    self.state = State::Size;
                }
                State::Done => {
                    self.pending.clear();
                    return Ok(true);
                }
            }
        }
    }

    pub fn is_done(&self) -> bool {
        self.state == State::Done
    }

    /// The payload decoded so far.
    pub fn into_body(self) -> Bytes {
        self.decoded.freeze()
    }
}

impl Default for ChunkedDecoder {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_chunk_size(line: &[u8]) -> Result<usize, ParseError> {
    let text = std::str::from_utf8(line)
        .map_err(|_| ParseError::MalformedEntry(String::from_utf8_lossy(line).into_owned()))?;
    // chunk extensions (`;name=value`) are not interpreted
    let digits = text.split(';').next().unwrap_or(text).trim();

    usize::from_str_radix(digits, 16)
        .map_err(|_| ParseError::MalformedEntry(text.to_string()))
}

/// Decodes a complete chunked body held in one buffer.
pub fn decode(body: &[u8]) -> Result<Bytes, ParseError> {
    let mut decoder = ChunkedDecoder::new();
    decoder.feed(body)?;
    Ok(decoder.into_body())
}

/// Frames `data` as a single chunk followed by the terminal chunk.
pub fn encode(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() + 16);
    if !data.is_empty() {
        out.extend_from_slice(format!("{:x}\r\n", data.len()).as_bytes());
        out.extend_from_slice(data);
        out.extend_from_slice(b"\r\n");
    }
    out.extend_from_slice(TERMINAL_CHUNK);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_segments_one_chunk_each() {
        let mut decoder = ChunkedDecoder::new();
        assert!(!decoder.feed(b"5\r\nhello\r\n").unwrap());
        assert!(decoder.feed(b"0\r\n\r\n").unwrap());
        assert_eq!(&decoder.into_body()[..], b"hello");
    }

    #[test]
    fn chunk_split_across_segments() {
        let mut decoder = ChunkedDecoder::new();
        assert!(!decoder.feed(b"b\r\nhello").unwrap());
        assert!(!decoder.feed(b" world\r").unwrap());
        assert!(decoder.feed(b"\n0\r\n\r\n").unwrap());
        assert_eq!(&decoder.into_body()[..], b"hello world");
    }

    #[test]
    fn size_with_extension() {
        assert_eq!(&decode(b"3;name=v\r\nabc\r\n0\r\n\r\n").unwrap()[..], b"abc");
    }

    #[test]
    fn non_hex_size_is_malformed_entry() {
        let err = decode(b"zz\r\nabc\r\n").unwrap_err();
        assert!(matches!(err, ParseError::MalformedEntry(_)));
    }

    #[test]
    fn encode_then_decode() {
        let framed = encode(b"payload");
        assert!(ends_with_terminal_chunk(&framed));
        assert_eq!(&decode(&framed).unwrap()[..], b"payload");
    }
}
