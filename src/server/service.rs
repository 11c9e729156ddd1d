use std::sync::Arc;

use crate::cache::ContentCache;
use crate::config::Config;
use crate::http::headers::names;
use crate::http::request::{Method, Request};
use crate::http::response::Response;
use crate::http::status::{ClientError, Status};
use crate::http::mime;
use crate::resources::{Resolution, Resource, ResourcePolicy};
use crate::router::{ConnectionContext, Reply, Router};

/// Everything a connection needs to answer requests: routes first, then
/// static resources read through the content cache.
#[derive(Debug)]
pub struct HttpService {
    router: Router,
    policy: Arc<ResourcePolicy>,
    cache: ContentCache,
}

impl HttpService {
    pub fn new(router: Router, policy: ResourcePolicy, cache: ContentCache) -> Self {
        Self {
            router,
            policy: Arc::new(policy),
            cache,
        }
    }

    /// A service with no routes, serving the configured resources.
    pub fn from_config(cfg: &Config) -> Self {
        Self::new(
            Router::new(),
            ResourcePolicy::from_config(&cfg.resources),
            ContentCache::new(cfg.cache.clone()),
        )
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn policy(&self) -> &ResourcePolicy {
        &self.policy
    }

    pub fn cache(&self) -> &ContentCache {
        &self.cache
    }

    pub async fn handle(&self, request: &Request, context: &ConnectionContext) -> Reply {
        if let Some(reply) = self.router.dispatch(request, context) {
            return reply;
        }

        if !matches!(request.method, Method::GET | Method::HEAD) {
            return Response::new(ClientError::MethodNotAllowed)
                .header("Allow", "GET, HEAD")
                .body("405 Method Not Allowed")
                .build()
                .into();
        }

        self.serve_static(request).await.into()
    }

    /// Answers a request from the static resource tree.
    pub async fn serve_static(&self, request: &Request) -> Response {
        let path = request.path();
        let raw_path = match urlencoding::decode(&path) {
            Ok(decoded) => decoded.into_owned(),
            Err(_) => return Response::bad_request(),
        };

        let policy = Arc::clone(&self.policy);
        let lookup = raw_path.clone();
        let resolution = match tokio::task::spawn_blocking(move || policy.resolve(&lookup)).await {
            Ok(resolution) => resolution,
            Err(e) => {
                tracing::error!(path = %raw_path, error = %e, "resource resolution failed");
                return Response::internal_error();
            }
        };

        match resolution {
            Resolution::Allowed { path, is_dir: false } => {
                let key = path.to_string_lossy();
                match self.cache.get(&key).await {
                    Some(content) => Response::new(Status::OK)
                        .header(names::CONTENT_TYPE, mime::from_path(&path))
                        .body(content)
                        .build(),
                    None => {
                        tracing::warn!(path = %key, "resource content unavailable");
                        Response::from_resource(Resource::Unavailable(None))
                    }
                }
            }
            listing @ Resolution::Allowed { is_dir: true, .. } => {
                let mut response = Response::from_resource(self.policy.outcome(listing));
                if !response.body.is_empty() {
                    response
                        .headers
                        .set(names::CONTENT_TYPE, "text/html; charset=utf-8");
                }
                response
            }
            other => {
                tracing::debug!(path = %raw_path, outcome = ?other, "resource not served");
                Response::from_resource(self.policy.outcome(other))
            }
        }
    }
}
