use std::io::Write;

use bytes::Bytes;
use flate2::Compression;
use flate2::write::GzEncoder;

use crate::http::cookie::Cookie;
use crate::http::headers::{HeaderMap, names};
use crate::http::message::{Body, HttpMessage};
use crate::http::status::Status;
use crate::http::version::Version;
use crate::resources::Resource;

/// Represents an HTTP response, either built locally or parsed from a peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub version: Version,
    /// The HTTP status
    pub status: Status,
    pub headers: HeaderMap,
    /// Response body
    pub body: Body,
    /// Cookies to set. `Set-Cookie` headers are regenerated from this list by
    /// [`Response::serialize_cookies`].
    pub cookies: Vec<Cookie>,
}

impl Response {
    pub fn new(status: impl Into<Status>) -> ResponseBuilder {
        ResponseBuilder::new(status.into())
    }

    /// Creates a simple 200 OK response with the given body.
    pub fn ok(body: impl Into<Bytes>) -> Self {
        ResponseBuilder::new(Status::OK).body(body).build()
    }

    /// Creates a 400 Bad Request response.
    pub fn bad_request() -> Self {
        ResponseBuilder::new(Status::BAD_REQUEST)
            .body("400 Bad Request")
            .build()
    }

    /// Creates a 403 Forbidden response.
    pub fn forbidden() -> Self {
        ResponseBuilder::new(Status::FORBIDDEN)
            .body("403 Forbidden")
            .build()
    }

    /// Creates a 404 Not Found response.
    pub fn not_found() -> Self {
        ResponseBuilder::new(Status::NOT_FOUND)
            .body("404 Not Found")
            .build()
    }

    /// Creates a 500 Internal Server Error response.
    pub fn internal_error() -> Self {
        ResponseBuilder::new(Status::INTERNAL_SERVER_ERROR)
            .body("500 Internal Server Error")
            .build()
    }

    /// Creates a 503 Service Unavailable response.
    pub fn unavailable() -> Self {
        ResponseBuilder::new(Status::SERVICE_UNAVAILABLE)
            .body("503 Service Unavailable")
            .build()
    }

    /// A response whose body is read from the content cache when written.
    ///
    /// `length` is the current size of the cached bytes and becomes the
    /// Content-Length.
    pub fn cached(status: impl Into<Status>, key: impl Into<String>, length: usize) -> Self {
        ResponseBuilder::new(status.into())
            .cached(key, length)
            .build()
    }

    /// Maps a resolved resource to a response.
    ///
    /// Representations carried by the resource become the body; outcomes
    /// without one fall back to the default status bodies.
    pub fn from_resource(resource: Resource) -> Self {
        match resource {
            Resource::Available(body) => {
                ResponseBuilder::new(Status::OK)
                    .body(body.unwrap_or_default())
                    .build()
            }
            Resource::Restricted(Some(body)) => {
                ResponseBuilder::new(Status::FORBIDDEN).body(body).build()
            }
            Resource::Restricted(None) => Response::forbidden(),
            Resource::NotFound(Some(body)) => {
                ResponseBuilder::new(Status::NOT_FOUND).body(body).build()
            }
            Resource::NotFound(None) => Response::not_found(),
            Resource::Unavailable(Some(body)) => {
                ResponseBuilder::new(Status::SERVICE_UNAVAILABLE).body(body).build()
            }
            Resource::Unavailable(None) => Response::unavailable(),
        }
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.first(key)
    }

    pub fn add_cookie(&mut self, cookie: Cookie) {
        self.cookies.push(cookie);
    }

    /// Regenerates the `Set-Cookie` headers from [`Response::cookies`].
    ///
    /// Called by the writer before transmission. An empty cookie list
    /// removes every `Set-Cookie` header.
    pub fn serialize_cookies(&mut self) {
        let values = self.cookies.iter().map(Cookie::to_string).collect();
        self.headers.set_all(names::SET_COOKIE, values);
    }

    /// Whether the body is transferred with chunked encoding.
    pub fn is_chunked(&self) -> bool {
        self.headers.contains(names::TRANSFER_ENCODING, "chunked")
    }
}

impl HttpMessage for Response {
    fn version(&self) -> Version {
        self.version
    }

    fn start_line(&self) -> String {
        format!(
            "{} {} {}",
            self.version,
            self.status.code(),
            self.status.reason_phrase()
        )
    }

    fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    fn body(&self) -> &Body {
        &self.body
    }
}

/// Builder for constructing HTTP responses in a fluent style.
///
/// # Example
///
/// ```ignore
/// let response = Response::new(Status::OK)
///     .header("Content-Type", "application/json")
///     .body("{}")
///     .build();
/// ```
pub struct ResponseBuilder {
    version: Version,
    status: Status,
    headers: HeaderMap,
    body: Body,
    cached_length: Option<usize>,
    cookies: Vec<Cookie>,
    gzip: bool,
}

impl ResponseBuilder {
    /// Creates a new response builder with the specified status code.
    pub fn new(status: Status) -> Self {
        Self {
            version: Version::HTTP_11,
            status,
            headers: HeaderMap::new(),
            body: Body::Empty,
            cached_length: None,
            cookies: Vec::new(),
            gzip: false,
        }
    }

    pub fn version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    /// Adds a header value. Repeating a name keeps every value.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.append(key, value);
        self
    }

    /// Merges a whole header map into the response.
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        for (name, value) in headers.iter() {
            self.headers.append(name, value);
        }
        self
    }

    /// Sets the response body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Body::from_bytes(body);
        self.cached_length = None;
        self
    }

    /// Refers the body to a content cache key of the given current length.
    pub fn cached(mut self, key: impl Into<String>, length: usize) -> Self {
        self.body = Body::Cached(key.into());
        self.cached_length = Some(length);
        self
    }

    pub fn cookie(mut self, cookie: Cookie) -> Self {
        self.cookies.push(cookie);
        self
    }

    /// Compresses the body with gzip when the response is built.
    pub fn gzip(mut self) -> Self {
        self.gzip = true;
        self
    }

    /// Builds the final Response.
    ///
    /// Content-Length is set to the length of the body (0 when there is
    /// none), except on 1xx, 204 and 304 responses, which get none. When gzip was requested and compression succeeds,
    /// Content-Encoding is set to `gzip`.
    pub fn build(mut self) -> Response {
        if self.gzip {
            if let Body::Bytes(raw) = &self.body {
                match gzip_bytes(raw) {
                    Ok(compressed) => {
                        self.body = Body::from_bytes(compressed);
                        self.headers.set(names::CONTENT_ENCODING, "gzip");
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "gzip compression failed, sending identity body");
                    }
                }
            }
        }

        if self.status.permits_body() {
            let length = match &self.body {
                Body::Cached(_) => self.cached_length.unwrap_or(0),
                body => body.as_bytes().len(),
            };
            self.headers.set(names::CONTENT_LENGTH, length.to_string());
        } else {
            self.headers.remove(names::CONTENT_LENGTH);
        }

        let mut response = Response {
            version: self.version,
            status: self.status,
            headers: self.headers,
            body: self.body,
            cookies: self.cookies,
        };
        if !response.cookies.is_empty() {
            response.serialize_cookies();
        }
        response
    }
}

fn gzip_bytes(raw: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(raw.len() / 2), Compression::default());
    encoder.write_all(raw)?;
    encoder.finish()
}
