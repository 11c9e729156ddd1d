use bytes::Bytes;

use crate::http::headers::HeaderMap;
use crate::http::version::Version;

pub(crate) const CRLF: &[u8] = b"\r\n";

/// The payload of a message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Body {
    /// No payload.
    #[default]
    Empty,
    /// Bytes held by the message itself.
    Bytes(Bytes),
    /// A cache key whose bytes are substituted when the message is written.
    Cached(String),
}

impl Body {
    /// Wraps `bytes`, mapping an empty buffer to [`Body::Empty`].
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        let bytes = bytes.into();
        if bytes.is_empty() {
            Body::Empty
        } else {
            Body::Bytes(bytes)
        }
    }

    /// The materialized bytes. Empty for [`Body::Empty`] and [`Body::Cached`].
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Body::Bytes(bytes) => bytes,
            Body::Empty | Body::Cached(_) => &[],
        }
    }

    pub fn cache_key(&self) -> Option<&str> {
        match self {
            Body::Cached(key) => Some(key),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Body::Empty)
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Body::from_bytes(bytes)
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Body::from_bytes(bytes)
    }
}

impl From<&'static [u8]> for Body {
    fn from(bytes: &'static [u8]) -> Self {
        Body::from_bytes(Bytes::from_static(bytes))
    }
}

impl From<&'static str> for Body {
    fn from(text: &'static str) -> Self {
        Body::from_bytes(Bytes::from_static(text.as_bytes()))
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Body::from_bytes(text.into_bytes())
    }
}

/// Shape shared by requests and responses.
///
/// The provided methods serialize a message to its exact wire form: the start
/// line, one `Name: value` line per header value, a blank line, then the
/// body bytes.
pub trait HttpMessage {
    fn version(&self) -> Version;

    /// The request line or status line, without the trailing CRLF.
    fn start_line(&self) -> String;

    fn headers(&self) -> &HeaderMap;

    fn body(&self) -> &Body;

    /// Start line, headers and the terminating blank line.
    fn head_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(256);

        buf.extend_from_slice(self.start_line().as_bytes());
        buf.extend_from_slice(CRLF);

        for (name, value) in self.headers().iter() {
            buf.extend_from_slice(name.as_bytes());
            buf.extend_from_slice(b": ");
            buf.extend_from_slice(value.as_bytes());
            buf.extend_from_slice(CRLF);
        }

        buf.extend_from_slice(CRLF);
        buf
    }

    /// The whole message. A [`Body::Cached`] payload is not resolved here;
    /// see [`crate::http::writer::ResponseWriter`].
    fn to_bytes(&self) -> Vec<u8> {
        let mut buf = self.head_bytes();
        buf.extend_from_slice(self.body().as_bytes());
        buf
    }
}
