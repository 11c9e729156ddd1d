use porter::http::headers::HeaderMap;
use porter::http::message::{Body, HttpMessage};
use porter::http::request::{Method, Request, RequestBuilder};
use porter::http::version::Version;

fn request_with(headers: HeaderMap) -> Request {
    Request {
        method: Method::GET,
        uri: "/".to_string(),
        version: Version::HTTP_11,
        headers,
        body: Body::Empty,
    }
}

#[test]
fn test_request_header_retrieval() {
    let req = request_with(HeaderMap::from_iter([
        ("Host", "example.com"),
        ("Content-Type", "application/json"),
    ]));

    assert_eq!(req.header("Host"), Some("example.com"));
    assert_eq!(req.header("content-type"), Some("application/json"));
    assert_eq!(req.header("Missing"), None);
}

#[test]
fn test_request_content_length_parsing() {
    let req = request_with(HeaderMap::from_iter([("Content-Length", "42")]));
    assert_eq!(req.content_length(), 42);
}

#[test]
fn test_request_content_length_missing() {
    let req = request_with(HeaderMap::new());
    assert_eq!(req.content_length(), 0);
}

#[test]
fn test_request_content_length_invalid() {
    let req = request_with(HeaderMap::from_iter([("Content-Length", "abc")]));
    assert_eq!(req.content_length(), 0);
}

#[test]
fn test_request_keep_alive_defaults() {
    let mut req = request_with(HeaderMap::new());
    assert!(req.keep_alive());

    req.version = Version::HTTP_10;
    assert!(!req.keep_alive());
}

#[test]
fn test_request_keep_alive_explicit_header() {
    let mut req = request_with(HeaderMap::from_iter([("Connection", "close")]));
    assert!(!req.keep_alive());

    req.version = Version::HTTP_10;
    req.headers.set("Connection", "Keep-Alive");
    assert!(req.keep_alive());
}

#[test]
fn test_request_path_and_query() {
    let req = Request::new(Method::GET, "/files/a.txt?download=1&x=2");
    assert_eq!(req.path(), "/files/a.txt");
    assert_eq!(req.query().as_deref(), Some("download=1&x=2"));

    let req = Request::new(Method::GET, "/plain");
    assert_eq!(req.path(), "/plain");
    assert_eq!(req.query(), None);
}

#[test]
fn test_request_absolute_form_target() {
    let req = Request::new(Method::GET, "http://example.com/index.html?a=b");
    assert_eq!(req.path(), "/index.html");
    assert_eq!(req.query().as_deref(), Some("a=b"));
}

#[test]
fn test_request_cookies_from_all_cookie_headers() {
    let mut headers = HeaderMap::new();
    headers.append("Cookie", "session=abc; theme=dark");
    headers.append("Cookie", "lang=en");
    let req = request_with(headers);

    let cookies = req.cookies();
    assert_eq!(cookies.len(), 3);
    assert_eq!(cookies["session"], "abc");
    assert_eq!(cookies["theme"], "dark");
    assert_eq!(cookies["lang"], "en");
}

#[test]
fn test_request_builder_sets_content_length() {
    let req = RequestBuilder::new()
        .method(Method::POST)
        .uri("/upload")
        .header("Host", "example.com")
        .body(b"payload".to_vec())
        .build()
        .unwrap();

    assert_eq!(req.header("Content-Length"), Some("7"));
    assert_eq!(req.body.as_bytes(), b"payload");
}

#[test]
fn test_request_builder_empty_body_has_no_content_length() {
    let req = RequestBuilder::new()
        .method(Method::GET)
        .uri("/")
        .build()
        .unwrap();

    assert_eq!(req.header("Content-Length"), None);
    assert!(req.body.is_empty());
}

#[test]
fn test_request_builder_requires_method_and_uri() {
    assert!(RequestBuilder::new().uri("/").build().is_err());
    assert!(RequestBuilder::new().method(Method::GET).build().is_err());
}

#[test]
fn test_request_serialization() {
    let req = RequestBuilder::new()
        .method(Method::POST)
        .uri("/api")
        .header("Host", "h")
        .body("hi")
        .build()
        .unwrap();

    assert_eq!(
        req.to_bytes(),
        b"POST /api HTTP/1.1\r\nHost: h\r\nContent-Length: 2\r\n\r\nhi".to_vec()
    );
}

#[test]
fn test_method_tokens() {
    for method in [Method::GET, Method::HEAD, Method::POST, Method::PUT, Method::DELETE, Method::CONNECT, Method::OPTIONS, Method::TRACE, Method::PATCH] {
        assert_eq!(Method::from_token(method.as_str()), Some(method));
    }
    assert_eq!(Method::from_token("get"), None);
}
