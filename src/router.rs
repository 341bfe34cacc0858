//! Radix-tree request router.
//!
//! One tree per HTTP method. O(path-length) lookup. Advice is woven into the
//! handlers before they are registered, so routing itself stays oblivious.

use std::collections::HashMap;
use std::sync::Arc;

use http::{Method, StatusCode};
use matchit::Router as MatchitRouter;
use tracing::debug;

use crate::handler::{BoxedHandler, Handler};
use crate::request::Request;
use crate::response::Response;

/// The application router. Build it once at startup; pass it to
/// [`Server::serve`](crate::Server::serve).
pub struct Router {
    routes: HashMap<Method, MatchitRouter<BoxedHandler>>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: HashMap::new() }
    }

    /// Register a handler for a method + path pair. Returns `self` for chaining.
    ///
    /// Path parameters use `{name}` syntax; `req.param("name")` retrieves them.
    ///
    /// # Panics
    ///
    /// Panics if `path` is not a valid route or conflicts with one already
    /// registered for `method`. Routes are fixed at startup.
    pub fn on(mut self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.routes
            .entry(method)
            .or_default()
            .insert(path, handler.into_boxed_handler())
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
        self
    }

    pub fn get(self, path: &str, handler: impl Handler) -> Self {
        self.on(Method::GET, path, handler)
    }

    fn lookup(&self, method: &Method, path: &str) -> Option<(BoxedHandler, HashMap<String, String>)> {
        let tree = self.routes.get(method)?;
        let matched = tree.at(path).ok()?;
        let handler = Arc::clone(matched.value);
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some((handler, params))
    }

    /// Routes one request to its handler, or answers `404 Not Found`.
    pub(crate) async fn route(&self, mut req: Request) -> Response {
        match self.lookup(req.method(), req.path()) {
            Some((handler, params)) => {
                req.params = params;
                handler.call(req).await
            }
            None => {
                debug!(method = %req.method(), path = req.path(), "no route");
                Response::status(StatusCode::NOT_FOUND)
            }
        }
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    fn request(method: Method, uri: &str) -> Request {
        let (parts, ()) = http::Request::builder()
            .method(method)
            .uri(uri)
            .body(())
            .unwrap()
            .into_parts();
        Request::new(parts, Bytes::new())
    }

    async fn echo_id(req: Request) -> String {
        req.param("id").unwrap_or("none").to_owned()
    }

    #[tokio::test]
    async fn path_params_reach_the_handler() {
        let router = Router::new().get("/users/{id}", echo_id);
        let res = router.route(request(Method::GET, "/users/42")).await;
        assert_eq!(res.status_code(), StatusCode::OK);
        assert_eq!(res.body(), b"42");
    }

    #[tokio::test]
    async fn unknown_path_or_method_is_404() {
        let router = Router::new().get("/users/{id}", echo_id);
        let missing = router.route(request(Method::GET, "/nope")).await;
        assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);

        let wrong_method = router.route(request(Method::POST, "/users/42")).await;
        assert_eq!(wrong_method.status_code(), StatusCode::NOT_FOUND);
    }
}
