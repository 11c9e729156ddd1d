use std::collections::HashMap;
use std::fmt;

use bytes::Bytes;

use crate::http::cookie::parse_cookie_header;
use crate::http::headers::{HeaderMap, names};
use crate::http::message::{Body, HttpMessage};
use crate::http::version::Version;

/// HTTP request methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET - Retrieve a resource
    GET,
    /// HEAD - Like GET but without the response body
    HEAD,
    /// POST - Create or submit data
    POST,
    /// PUT - Replace a resource
    PUT,
    /// DELETE - Delete a resource
    DELETE,
    /// CONNECT - Establish a tunnel
    CONNECT,
    /// OPTIONS - Describe communication options
    OPTIONS,
    /// TRACE - Loop the request back
    TRACE,
    /// PATCH - Partial modification of a resource
    PATCH,
}

impl Method {
    /// Parses an HTTP method token.
    ///
    /// Matching is case-sensitive, as on the wire.
    ///
    /// # Example
    ///
    /// ```
    /// # use porter::http::request::Method;
    /// assert_eq!(Method::from_token("GET"), Some(Method::GET));
    /// assert_eq!(Method::from_token("get"), None);
    /// ```
    pub fn from_token(s: &str) -> Option<Self> {
        match s {
            "GET" => Some(Method::GET),
            "HEAD" => Some(Method::HEAD),
            "POST" => Some(Method::POST),
            "PUT" => Some(Method::PUT),
            "DELETE" => Some(Method::DELETE),
            "CONNECT" => Some(Method::CONNECT),
            "OPTIONS" => Some(Method::OPTIONS),
            "TRACE" => Some(Method::TRACE),
            "PATCH" => Some(Method::PATCH),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GET => "GET",
            Method::HEAD => "HEAD",
            Method::POST => "POST",
            Method::PUT => "PUT",
            Method::DELETE => "DELETE",
            Method::CONNECT => "CONNECT",
            Method::OPTIONS => "OPTIONS",
            Method::TRACE => "TRACE",
            Method::PATCH => "PATCH",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed or locally built HTTP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// The HTTP method (GET, POST, etc.)
    pub method: Method,
    /// The request target as sent (e.g. "/search?q=rust")
    pub uri: String,
    pub version: Version,
    pub headers: HeaderMap,
    pub body: Body,
}

impl Request {
    pub fn new(method: Method, uri: impl Into<String>) -> Self {
        Self {
            method,
            uri: uri.into(),
            version: Version::HTTP_11,
            headers: HeaderMap::new(),
            body: Body::Empty,
        }
    }

    /// The first value of a header, looked up case-insensitively.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.first(key)
    }

    /// The path component of the request target, without query or fragment.
    ///
    /// Absolute-form targets (`http://host/path`) are reduced to their path.
    pub fn path(&self) -> String {
        split_target(&self.uri).0
    }

    /// The query string of the request target, if any.
    pub fn query(&self) -> Option<String> {
        split_target(&self.uri).1
    }

    /// The Content-Length header parsed as a usize, 0 when missing or invalid.
    pub fn content_length(&self) -> usize {
        self.header(names::CONTENT_LENGTH)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(0)
    }

    /// Determines whether the connection should remain open after the response.
    ///
    /// An explicit `Connection` header wins. Otherwise HTTP/1.1 and later
    /// default to keep-alive and HTTP/1.0 defaults to close.
    pub fn keep_alive(&self) -> bool {
        if self.headers.contains(names::CONNECTION, "close") {
            return false;
        }
        if self.headers.contains(names::CONNECTION, "keep-alive") {
            return true;
        }
        self.version >= Version::HTTP_11
    }

    /// Cookies sent with the request, computed from the `Cookie` headers.
    pub fn cookies(&self) -> HashMap<String, String> {
        self.headers
            .get(names::COOKIE)
            .map(|values| parse_cookie_header(values.iter().map(String::as_str)))
            .unwrap_or_default()
    }
}

impl HttpMessage for Request {
    fn version(&self) -> Version {
        self.version
    }

    fn start_line(&self) -> String {
        format!("{} {} {}", self.method, self.uri, self.version)
    }

    fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    fn body(&self) -> &Body {
        &self.body
    }
}

fn split_target(uri: &str) -> (String, Option<String>) {
    // `url` needs an absolute URL; origin-form targets are joined onto a
    // placeholder base.
    let parsed = url::Url::parse(uri).or_else(|_| {
        url::Url::parse("http://localhost").and_then(|base| base.join(uri))
    });

    match parsed {
        Ok(url) => (url.path().to_string(), url.query().map(str::to_string)),
        Err(_) => {
            let without_fragment = uri.split('#').next().unwrap_or(uri);
            match without_fragment.split_once('?') {
                Some((path, query)) => (path.to_string(), Some(query.to_string())),
                None => (without_fragment.to_string(), None),
            }
        }
    }
}

/// Builder for constructing Request objects.
pub struct RequestBuilder {
    method: Option<Method>,
    uri: Option<String>,
    version: Version,
    headers: HeaderMap,
    body: Body,
}

impl RequestBuilder {
    pub fn new() -> Self {
        Self {
            method: None,
            uri: None,
            version: Version::HTTP_11,
            headers: HeaderMap::new(),
            body: Body::Empty,
        }
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    pub fn uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    pub fn version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    /// Appends a header value.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.append(key, value);
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Body::from_bytes(body);
        self
    }

    /// Builds the request, setting Content-Length for a non-empty body.
    pub fn build(mut self) -> Result<Request, &'static str> {
        let length = self.body.as_bytes().len();
        if length > 0 {
            self.headers.set(names::CONTENT_LENGTH, length.to_string());
        }

        Ok(Request {
            method: self.method.ok_or("method missing")?,
            uri: self.uri.ok_or("uri missing")?,
            version: self.version,
            headers: self.headers,
            body: self.body,
        })
    }
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}
