use bytes::Bytes;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::cache::ContentCache;
use crate::http::headers::names;
use crate::http::message::{Body, HttpMessage};
use crate::http::response::Response;

/// Serializes a response that needs no cache lookup.
///
/// A cached body is written as empty; use [`ResponseWriter::prepare`] to
/// resolve it.
pub fn serialize_response(resp: &Response) -> Vec<u8> {
    resp.to_bytes()
}

/// A serialized response and how much of it has been written.
pub struct ResponseWriter {
    buffer: Vec<u8>,
    written: usize,
}

impl ResponseWriter {
    pub fn new(response: &Response) -> Self {
        Self {
            buffer: serialize_response(response),
            written: 0,
        }
    }

    /// Finalizes `response` for transmission.
    ///
    /// Regenerates `Set-Cookie` from the cookie list, substitutes a cached
    /// body with the current bytes from `cache` (updating Content-Length to
    /// match), and drops the body bytes when `include_body` is false, as for
    /// `HEAD`.
    pub async fn prepare(
        mut response: Response,
        cache: Option<&ContentCache>,
        include_body: bool,
    ) -> anyhow::Result<Self> {
        if !response.cookies.is_empty() {
            response.serialize_cookies();
        }

        let body = match &response.body {
            Body::Cached(key) => {
                let cache = cache
                    .ok_or_else(|| anyhow::anyhow!("cached body {key:?} without a content cache"))?;
                let content = cache
                    .get(key)
                    .await
                    .ok_or_else(|| anyhow::anyhow!("cached body {key:?} is no longer available"))?;
                response
                    .headers
                    .set(names::CONTENT_LENGTH, content.len().to_string());
                content
            }
            Body::Bytes(bytes) => bytes.clone(),
            Body::Empty => Bytes::new(),
        };

        let mut buffer = response.head_bytes();
        if include_body {
            buffer.extend_from_slice(&body);
        }

        Ok(Self { buffer, written: 0 })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    pub async fn write_to_stream<W>(&mut self, stream: &mut W) -> anyhow::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        while self.written < self.buffer.len() {
            let n = stream.write(&self.buffer[self.written..]).await?;

            if n == 0 {
                return Err(anyhow::anyhow!("connection closed while writing"));
            }

            self.written += n;
        }

        stream.flush().await?;
        Ok(())
    }
}
