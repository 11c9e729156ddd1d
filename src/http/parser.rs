//! Parsing of raw bytes into requests and responses.
//!
//! [`parse_request`] and [`parse_response`] take one complete message: the
//! start line, the header block up to the first empty line, and everything
//! after it as the body, copied verbatim. [`parse_http_request`] is the
//! framing variant used on live connections; it waits for the end of the
//! header block and uses `Content-Length` to find where the body stops.

use bytes::Bytes;

use crate::http::headers::{HeaderMap, names};
use crate::http::message::Body;
use crate::http::request::{Method, Request};
use crate::http::response::Response;
use crate::http::status::Status;
use crate::http::version::Version;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// Wrong token count, or an unparsable method, version or status code.
    #[error("malformed status line: {0:?}")]
    MalformedStatusLine(String),
    /// A header line without the `": "` separator, or a bad chunk size.
    #[error("malformed entry: {0:?}")]
    MalformedEntry(String),
    /// A line that is not valid UTF-8.
    #[error("header contains a non-string literal")]
    NonStringLiteral,
    /// The input ends before the header block does.
    #[error("incomplete message")]
    Incomplete,
    #[error("invalid content length: {0:?}")]
    InvalidContentLength(String),
    /// The declared body is larger than [`MAX_BODY_SIZE`].
    #[error("request body of {0} bytes exceeds the limit")]
    BodyTooLarge(usize),
    /// Requests framed by a transfer coding are not accepted.
    #[error("unsupported transfer encoding: {0:?}")]
    UnsupportedTransferEncoding(String),
}

/// Largest request body [`parse_http_request`] will wait for.
pub const MAX_BODY_SIZE: usize = 16 * 1024 * 1024;

/// Reads CRLF-terminated lines from a byte buffer.
struct LineReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> LineReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// The next line without its CRLF, or `None` when no CRLF is left.
    fn next_line(&mut self) -> Option<&'a [u8]> {
        let rest = &self.buf[self.pos..];
        let end = rest.windows(2).position(|w| w == b"\r\n")?;
        self.pos += end + 2;
        Some(&rest[..end])
    }

    fn next_str(&mut self) -> Result<&'a str, ParseError> {
        let line = self.next_line().ok_or(ParseError::Incomplete)?;
        std::str::from_utf8(line).map_err(|_| ParseError::NonStringLiteral)
    }

    fn remainder(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }
}

/// Parses one complete request. Bytes after the header block are the body.
pub fn parse_request(buf: &[u8]) -> Result<Request, ParseError> {
    let mut reader = LineReader::new(buf);
    let (method, uri, version) = parse_request_line(reader.next_str()?)?;
    let headers = parse_headers(&mut reader)?;

    Ok(Request {
        method,
        uri,
        version,
        headers,
        body: Body::from_bytes(Bytes::copy_from_slice(reader.remainder())),
    })
}

/// Parses one complete response. Bytes after the header block are the body.
///
/// The reason phrase on the wire is not kept; serializing the response uses
/// the catalog phrase for its status.
pub fn parse_response(buf: &[u8]) -> Result<Response, ParseError> {
    let mut reader = LineReader::new(buf);
    let (version, status) = parse_status_line(reader.next_str()?)?;
    let headers = parse_headers(&mut reader)?;

    Ok(Response {
        version,
        status,
        headers,
        body: Body::from_bytes(Bytes::copy_from_slice(reader.remainder())),
        cookies: Vec::new(),
    })
}

/// Parses a request off the front of a connection buffer.
///
/// Returns the request and the number of bytes it occupied, or
/// [`ParseError::Incomplete`] until the header block and the whole
/// `Content-Length` body are buffered.
pub fn parse_http_request(buf: &[u8]) -> Result<(Request, usize), ParseError> {
    // Look for header/body separator
    let headers_end = find_headers_end(buf).ok_or(ParseError::Incomplete)?;
    let head = &buf[..headers_end + 4];

    let mut reader = LineReader::new(head);
    let (method, uri, version) = parse_request_line(reader.next_str()?)?;
    let headers = parse_headers(&mut reader)?;

    // Only Content-Length framing is understood; anything else would leave
    // the body to be read as the next request.
    if let Some(coding) = headers.first(names::TRANSFER_ENCODING) {
        return Err(ParseError::UnsupportedTransferEncoding(coding.to_string()));
    }

    let content_length = match headers.first(names::CONTENT_LENGTH) {
        Some(value) => value
            .trim()
            .parse::<usize>()
            .map_err(|_| ParseError::InvalidContentLength(value.to_string()))?,
        None => 0,
    };
    if content_length > MAX_BODY_SIZE {
        return Err(ParseError::BodyTooLarge(content_length));
    }

    let body_start = headers_end + 4;
    let body_end = body_start
        .checked_add(content_length)
        .ok_or_else(|| ParseError::InvalidContentLength(content_length.to_string()))?;
    if buf.len() < body_end {
        return Err(ParseError::Incomplete);
    }

    let body = Bytes::copy_from_slice(&buf[body_start..body_end]);

    let request = Request {
        method,
        uri,
        version,
        headers,
        body: Body::from_bytes(body),
    };

    Ok((request, body_end))
}

/// Position of the `\r\n\r\n` that ends a header block.
pub fn find_headers_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4)
        .position(|w| w == b"\r\n\r\n")
}

fn parse_request_line(line: &str) -> Result<(Method, String, Version), ParseError> {
    let parts: Vec<&str> = line.split(' ').collect();
    let [method, uri, version] = parts.as_slice() else {
        return Err(ParseError::MalformedStatusLine(line.to_string()));
    };

    let method = Method::from_token(method)
        .ok_or_else(|| ParseError::MalformedStatusLine(line.to_string()))?;
    let version = Version::parse(version)
        .ok_or_else(|| ParseError::MalformedStatusLine(line.to_string()))?;

    Ok((method, uri.to_string(), version))
}

fn parse_status_line(line: &str) -> Result<(Version, Status), ParseError> {
    let parts: Vec<&str> = line.splitn(3, ' ').collect();
    let [version, code, _reason] = parts.as_slice() else {
        return Err(ParseError::MalformedStatusLine(line.to_string()));
    };

    let version = Version::parse(version)
        .ok_or_else(|| ParseError::MalformedStatusLine(line.to_string()))?;
    let code = code
        .parse::<u16>()
        .map_err(|_| ParseError::MalformedStatusLine(line.to_string()))?;

    Ok((version, Status::from_code(code)))
}

fn parse_headers(reader: &mut LineReader<'_>) -> Result<HeaderMap, ParseError> {
    let mut headers = HeaderMap::new();

    loop {
        let line = reader.next_str()?;
        if line.is_empty() {
            break;
        }

        let (key, value) = line
            .split_once(": ")
            .ok_or_else(|| ParseError::MalformedEntry(line.to_string()))?;

        headers.append(key, value);
    }

    Ok(headers)
}
