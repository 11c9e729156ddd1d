//! Exact-path request routing.
//!
//! A [`Router`] maps a request path (the URI without its query) to a
//! [`Handler`]. A handler may decline a request by returning `None`, in
//! which case the server falls through to static resources.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::http::request::Request;
use crate::http::response::Response;

/// A raw connection stream that can be handed to another service.
pub trait AsyncStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T> AsyncStream for T where T: AsyncRead + AsyncWrite + Unpin + Send {}

pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// Takes over a connection after an upgrade.
pub trait ConnectionService: Send {
    /// Serves the rest of the connection. `replay` holds bytes already read
    /// from the stream that the new service must see first.
    fn serve(self: Box<Self>, stream: Box<dyn AsyncStream>, replay: Bytes) -> BoxFuture<anyhow::Result<()>>;
}

/// Facts about the connection a request arrived on.
#[derive(Debug, Clone, Default)]
pub struct ConnectionContext {
    pub peer: Option<SocketAddr>,
}

/// What a handler wants done with a request.
pub enum Reply {
    Respond(Response),
    /// Hand the connection to `service`. `replay` is sent to it ahead of any
    /// bytes still buffered by the connection.
    Upgrade {
        service: Box<dyn ConnectionService>,
        replay: Option<Bytes>,
    },
}

impl fmt::Debug for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Respond(response) => f.debug_tuple("Respond").field(response).finish(),
            Reply::Upgrade { replay, .. } => f.debug_struct("Upgrade").field("replay", replay).finish_non_exhaustive(),
        }
    }
}

impl From<Response> for Reply {
    fn from(response: Response) -> Self {
        Reply::Respond(response)
    }
}

pub trait Handler: Send + Sync {
    fn call(&self, request: &Request, context: &ConnectionContext) -> Option<Reply>;
}

impl<F> Handler for F
where
    F: Fn(&Request, &ConnectionContext) -> Option<Reply> + Send + Sync,
{
    fn call(&self, request: &Request, context: &ConnectionContext) -> Option<Reply> {
        self(request, context)
    }
}

#[derive(Default)]
pub struct Router {
    routes: HashMap<String, Box<dyn Handler>>,
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.routes.keys()).finish()
    }
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `path`, replacing any earlier handler.
    pub fn register(&mut self, path: impl Into<String>, handler: impl Handler + 'static) {
        let path = path.into();
        if self.routes.insert(path.clone(), Box::new(handler)).is_some() {
            tracing::debug!(path = %path, "route replaced");
        }
    }

    /// Builder form of [`Router::register`].
    pub fn route(mut self, path: impl Into<String>, handler: impl Handler + 'static) -> Self {
        self.register(path, handler);
        self
    }

    pub fn lookup(&self, path: &str) -> Option<&dyn Handler> {
        self.routes.get(path).map(|handler| handler.as_ref())
    }

    /// Runs the handler registered for the request's path, if any.
    pub fn dispatch(&self, request: &Request, context: &ConnectionContext) -> Option<Reply> {
        self.lookup(&request.path())?.call(request, context)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
