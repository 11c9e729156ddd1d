use std::fs;
use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use porter::cache::ContentCache;
use porter::client;
use porter::http::connection::Connection;
use porter::http::request::{Method, Request, RequestBuilder};
use porter::http::response::Response;
use porter::http::status::Status;
use porter::http::transport::StreamTransport;
use porter::resources::ResourcePolicy;
use porter::router::{AsyncStream, BoxFuture, ConnectionContext, ConnectionService, Reply, Router};
use porter::server::HttpService;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt, duplex};

fn site() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("index.html"), "<h1>hi</h1>").unwrap();
    dir
}

fn service(root: &Path, router: Router) -> Arc<HttpService> {
    Arc::new(HttpService::new(router, ResourcePolicy::new(root), ContentCache::default()))
}

/// Writes `raw` on a fresh connection and returns everything the server
/// sends until it closes.
async fn exchange(service: Arc<HttpService>, raw: &str) -> String {
    let (mut client, server) = duplex(64 * 1024);
    let conn = tokio::spawn(Connection::new(server, service, ConnectionContext::default()).run());

    client.write_all(raw.as_bytes()).await.unwrap();
    let mut out = Vec::new();
    client.read_to_end(&mut out).await.unwrap();
    conn.await.unwrap().unwrap();

    String::from_utf8(out).unwrap()
}

#[tokio::test]
async fn test_serves_static_file() {
    let dir = site();
    let out = exchange(
        service(dir.path(), Router::new()),
        "GET /index.html HTTP/1.1\r\nConnection: close\r\n\r\n",
    )
    .await;

    assert!(out.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(out.contains("Content-Type: text/html; charset=utf-8\r\n"));
    assert!(out.contains("Content-Length: 11\r\n"));
    assert!(out.ends_with("\r\n\r\n<h1>hi</h1>"));
}

#[tokio::test]
async fn test_missing_file_is_404() {
    let dir = site();
    let out = exchange(
        service(dir.path(), Router::new()),
        "GET /missing.html HTTP/1.1\r\nConnection: close\r\n\r\n",
    )
    .await;

    assert!(out.starts_with("HTTP/1.1 404 Not Found\r\n"));
    assert!(out.ends_with("404 Not Found"));
}

#[tokio::test]
async fn test_directory_is_403() {
    let dir = site();
    fs::create_dir(dir.path().join("sub")).unwrap();
    let out = exchange(
        service(dir.path(), Router::new()),
        "GET /sub HTTP/1.1\r\nConnection: close\r\n\r\n",
    )
    .await;

    assert!(out.starts_with("HTTP/1.1 403 Forbidden\r\n"));
}

#[tokio::test]
async fn test_malformed_request_gets_400_and_close() {
    let dir = site();
    let out = exchange(service(dir.path(), Router::new()), "NONSENSE\r\n\r\n").await;

    assert!(out.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    assert!(out.contains("Connection: close\r\n"));
}

#[tokio::test]
async fn test_oversized_body_gets_413_before_it_is_sent() {
    let dir = site();
    let out = exchange(
        service(dir.path(), Router::new()),
        "POST /upload HTTP/1.1\r\nContent-Length: 10000000000\r\n\r\n",
    )
    .await;

    assert!(out.starts_with("HTTP/1.1 413 Payload Too Large\r\n"));
    assert!(out.contains("Connection: close\r\n"));
}

#[tokio::test]
async fn test_chunked_request_gets_501_and_close() {
    let dir = site();
    let out = exchange(
        service(dir.path(), Router::new()),
        "POST /upload HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n0\r\n\r\nGET /index.html HTTP/1.1\r\n\r\n",
    )
    .await;

    assert!(out.starts_with("HTTP/1.1 501 Not Implemented\r\n"));
    assert!(out.contains("Connection: close\r\n"));
    // the bytes after the head are never read as a second request
    assert!(!out.contains("<h1>hi</h1>"));
}

#[tokio::test]
async fn test_head_omits_body() {
    let dir = site();
    let out = exchange(
        service(dir.path(), Router::new()),
        "HEAD /index.html HTTP/1.1\r\nConnection: close\r\n\r\n",
    )
    .await;

    assert!(out.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(out.contains("Content-Length: 11\r\n"));
    assert!(out.ends_with("\r\n\r\n"));
}

#[tokio::test]
async fn test_other_methods_on_static_resources() {
    let dir = site();
    let out = exchange(
        service(dir.path(), Router::new()),
        "DELETE /index.html HTTP/1.1\r\nConnection: close\r\n\r\n",
    )
    .await;

    assert!(out.starts_with("HTTP/1.1 405 Method Not Allowed\r\n"));
}

#[tokio::test]
async fn test_route_takes_precedence_over_files() {
    let dir = site();
    let router = Router::new().route("/index.html", |_req: &Request, _ctx: &ConnectionContext| {
        Some(Reply::from(Response::ok("from handler")))
    });
    let out = exchange(
        service(dir.path(), router),
        "GET /index.html HTTP/1.1\r\nConnection: close\r\n\r\n",
    )
    .await;

    assert!(out.ends_with("from handler"));
}

#[tokio::test]
async fn test_declining_route_falls_through_to_files() {
    let dir = site();
    let router = Router::new().route("/index.html", |_req: &Request, _ctx: &ConnectionContext| -> Option<Reply> { None });
    let out = exchange(
        service(dir.path(), router),
        "GET /index.html HTTP/1.1\r\nConnection: close\r\n\r\n",
    )
    .await;

    assert!(out.ends_with("<h1>hi</h1>"));
}

#[tokio::test]
async fn test_keep_alive_serves_several_requests() {
    let dir = site();
    let (client_side, server) = duplex(64 * 1024);
    let conn = tokio::spawn(
        Connection::new(server, service(dir.path(), Router::new()), ConnectionContext::default()).run(),
    );
    let mut transport = StreamTransport::new(client_side);

    let first = client::send(&mut transport, &Request::new(Method::GET, "/index.html"))
        .await
        .unwrap();
    assert_eq!(first.body.as_bytes(), b"<h1>hi</h1>");

    let second = RequestBuilder::new()
        .method(Method::GET)
        .uri("/missing")
        .header("Connection", "close")
        .build()
        .unwrap();
    let second = client::send(&mut transport, &second).await.unwrap();
    assert_eq!(second.status.code(), 404);

    conn.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_cached_body_is_resolved_when_written() {
    let dir = site();
    let cache = ContentCache::default();
    cache.cache_static("banner", "cached banner", None);

    let router = Router::new().route("/banner", |_req: &Request, _ctx: &ConnectionContext| {
        Some(Reply::from(Response::cached(Status::OK, "banner", 13)))
    });
    let service = Arc::new(HttpService::new(router, ResourcePolicy::new(dir.path()), cache));

    let out = exchange(service, "GET /banner HTTP/1.1\r\nConnection: close\r\n\r\n").await;
    assert!(out.contains("Content-Length: 13\r\n"));
    assert!(out.ends_with("\r\n\r\ncached banner"));
}

struct Echo;

impl ConnectionService for Echo {
    fn serve(self: Box<Self>, mut stream: Box<dyn AsyncStream>, replay: Bytes) -> BoxFuture<anyhow::Result<()>> {
        Box::pin(async move {
            stream.write_all(&replay).await?;
            let mut buf = vec![0u8; 1024];
            loop {
                let n = stream.read(&mut buf).await?;
                if n == 0 {
                    break;
                }
                stream.write_all(&buf[..n]).await?;
            }
            stream.shutdown().await?;
            Ok(())
        })
    }
}

#[tokio::test]
async fn test_upgrade_hands_off_stream() {
    let dir = site();
    let router = Router::new().route("/echo", |_req: &Request, _ctx: &ConnectionContext| {
        Some(Reply::Upgrade {
            service: Box::new(Echo),
            replay: Some(Bytes::from_static(b"hello ")),
        })
    });

    let (mut client_side, server) = duplex(64 * 1024);
    let conn = tokio::spawn(
        Connection::new(server, service(dir.path(), router), ConnectionContext::default()).run(),
    );

    client_side
        .write_all(b"GET /echo HTTP/1.1\r\n\r\nworld")
        .await
        .unwrap();
    client_side.shutdown().await.unwrap();

    let mut out = Vec::new();
    client_side.read_to_end(&mut out).await.unwrap();
    conn.await.unwrap().unwrap();

    assert_eq!(out, b"hello world");
}
