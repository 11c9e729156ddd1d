//! Client side of the codec: sending a request and reading back a complete
//! response over a [`Transport`].

use std::time::Duration;

use anyhow::{Context, Result, bail};
use bytes::{Bytes, BytesMut};
use tokio::net::TcpStream;
use tokio::time::timeout;
use url::Url;

use crate::http::chunked::ChunkedDecoder;
use crate::http::headers::names;
use crate::http::message::{Body, HttpMessage};
use crate::http::parser::{find_headers_end, parse_response};
use crate::http::request::Request;
use crate::http::response::Response;
use crate::http::transport::{StreamTransport, Transport};

pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Prevent unbounded header growth
const MAX_HEAD_SIZE: usize = 64 * 1024;

/// Sends `request` to `url` over a fresh TCP connection and returns the
/// complete response.
///
/// `Host` is filled in from the URL and `Connection: close` is added unless
/// the request already carries them. An empty request target is taken from
/// the URL. Only `http` URLs are supported.
pub async fn oneshot(url: &str, request: &Request) -> Result<Response> {
    let url = Url::parse(url).context("Invalid URL")?;

    match url.scheme() {
        "http" => {}
        "https" => bail!("https is not supported, TLS must be terminated externally"),
        other => bail!("unsupported URL scheme: {other}"),
    }

    let host = url.host_str().context("URL missing host")?;
    let port = url.port_or_known_default().unwrap_or(80);

    let stream = timeout(CONNECT_TIMEOUT, TcpStream::connect((host, port)))
        .await
        .context("Connection timeout")?
        .with_context(|| format!("Failed to connect to {host}:{port}"))?;

    let mut request = request.clone();
    if request.uri.is_empty() {
        request.uri = match url.query() {
            Some(query) => format!("{}?{}", url.path(), query),
            None => url.path().to_string(),
        };
    }
    if !request.headers.contains_key(names::HOST) {
        let host_value = match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };
        request.headers.set(names::HOST, host_value);
    }
    if !request.headers.contains_key(names::CONNECTION) {
        request.headers.set(names::CONNECTION, "close");
    }

    tracing::debug!(method = %request.method, url = %url, "sending request");

    let mut transport = StreamTransport::new(stream);
    timeout(REQUEST_TIMEOUT, send(&mut transport, &request))
        .await
        .context("Request timeout")?
}

/// Writes `request` to `transport` and reads the response.
pub async fn send<T: Transport>(transport: &mut T, request: &Request) -> Result<Response> {
    transport
        .write(&request.to_bytes())
        .await
        .context("Failed to send request")?;
    read_response(transport).await
}

/// Reads one complete response from `transport`.
///
/// Reads until the header block is complete, then reassembles a chunked
/// body or reads the rest of a `Content-Length` body. A response with
/// neither is read until the peer closes.
pub async fn read_response<T: Transport>(transport: &mut T) -> Result<Response> {
    let mut buffer = BytesMut::new();

    let head_end = loop {
        if let Some(end) = find_headers_end(&buffer) {
            break end + 4;
        }
        if buffer.len() > MAX_HEAD_SIZE {
            bail!("Response headers too large");
        }

        match transport.read().await? {
            Some(segment) => buffer.extend_from_slice(&segment),
            None => bail!("Connection closed before complete response received"),
        }
    };

    let rest = buffer.split_off(head_end);
    let mut response = parse_response(&buffer)?;
    let body = read_body(transport, &response, rest).await?;
    response.body = Body::from_bytes(body);

    Ok(response)
}

async fn read_body<T: Transport>(transport: &mut T, response: &Response, mut rest: BytesMut) -> Result<Bytes> {
    if response.is_chunked() {
        let mut decoder = ChunkedDecoder::new();
        let mut done = decoder.feed(&rest)?;
        while !done {
            let Some(segment) = transport.read().await? else {
                bail!("Connection closed before the terminal chunk");
            };
            done = decoder.feed(&segment)?;
        }
        return Ok(decoder.into_body());
    }

    if let Some(value) = response.header(names::CONTENT_LENGTH) {
        let length: usize = value
            .trim()
            .parse()
            .with_context(|| format!("Invalid Content-Length: {value:?}"))?;

        while rest.len() < length {
            let Some(segment) = transport.read().await? else {
                bail!("Connection closed before complete body received");
            };
            rest.extend_from_slice(&segment);
        }
        rest.truncate(length);
        return Ok(rest.freeze());
    }

    if !response.status.permits_body() {
        return Ok(Bytes::new());
    }

    // No framing: the body runs until the connection closes
    while let Some(segment) = transport.read().await? {
        rest.extend_from_slice(&segment);
    }
    Ok(rest.freeze())
}
