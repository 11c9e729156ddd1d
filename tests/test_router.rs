use porter::http::request::{Method, Request};
use porter::http::response::Response;
use porter::router::{ConnectionContext, Reply, Router};

fn respond(body: &'static str) -> impl Fn(&Request, &ConnectionContext) -> Option<Reply> + Send + Sync {
    move |_req: &Request, _ctx: &ConnectionContext| Some(Reply::Respond(Response::ok(body)))
}

fn body_of(reply: Option<Reply>) -> Vec<u8> {
    match reply {
        Some(Reply::Respond(response)) => response.body.as_bytes().to_vec(),
        other => panic!("expected a response, got {other:?}"),
    }
}

#[test]
fn test_exact_path_dispatch() {
    let router = Router::new().route("/hello", respond("hi"));
    let ctx = ConnectionContext::default();

    let reply = router.dispatch(&Request::new(Method::GET, "/hello"), &ctx);
    assert_eq!(body_of(reply), b"hi");
}

#[test]
fn test_query_is_ignored_for_matching() {
    let router = Router::new().route("/search", respond("results"));
    let ctx = ConnectionContext::default();

    let reply = router.dispatch(&Request::new(Method::GET, "/search?q=rust"), &ctx);
    assert_eq!(body_of(reply), b"results");
}

#[test]
fn test_no_prefix_matching() {
    let router = Router::new().route("/api", respond("api"));
    let ctx = ConnectionContext::default();

    assert!(router.dispatch(&Request::new(Method::GET, "/api/users"), &ctx).is_none());
    assert!(router.dispatch(&Request::new(Method::GET, "/ap"), &ctx).is_none());
}

#[test]
fn test_register_replaces_handler() {
    let mut router = Router::new();
    router.register("/x", respond("first"));
    router.register("/x", respond("second"));

    assert_eq!(router.len(), 1);
    let reply = router.dispatch(&Request::new(Method::GET, "/x"), &ConnectionContext::default());
    assert_eq!(body_of(reply), b"second");
}

#[test]
fn test_handler_may_decline() {
    let router = Router::new().route("/only-post", |req: &Request, _ctx: &ConnectionContext| {
        (req.method == Method::POST).then(|| Reply::from(Response::ok("posted")))
    });
    let ctx = ConnectionContext::default();

    assert!(router.dispatch(&Request::new(Method::GET, "/only-post"), &ctx).is_none());
    assert_eq!(
        body_of(router.dispatch(&Request::new(Method::POST, "/only-post"), &ctx)),
        b"posted"
    );
}

#[test]
fn test_lookup() {
    let router = Router::new().route("/a", respond("a"));
    assert!(router.lookup("/a").is_some());
    assert!(router.lookup("/b").is_none());
    assert!(!router.is_empty());
}

#[test]
fn test_handler_sees_connection_context() {
    let router = Router::new().route("/peer", |_req: &Request, ctx: &ConnectionContext| {
        let peer = ctx.peer.map(|p| p.to_string()).unwrap_or_default();
        Some(Reply::from(Response::ok(peer)))
    });
    let ctx = ConnectionContext {
        peer: Some("127.0.0.1:4000".parse().unwrap()),
    };

    let reply = router.dispatch(&Request::new(Method::GET, "/peer"), &ctx);
    assert_eq!(body_of(reply), b"127.0.0.1:4000");
}
