//! Method + path router. Patterns use `{name}` segments for path
//! parameters, e.g. `/tasks/{task_id}/cancel`. Dispatch is static: each
//! route is registered once at startup by closing over the process-wide
//! `Services` value (spec.md §9) — no runtime type sniffing.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use hyper::body::Incoming;
use hyper::{Method, Request};

use crate::json::Body;

pub type PathParams = HashMap<String, String>;

pub type HandlerFuture = Pin<Box<dyn Future<Output = hyper::Response<Body>> + Send>>;

pub type Handler =
    Arc<dyn Fn(Request<Incoming>, PathParams) -> HandlerFuture + Send + Sync>;

pub struct Route {
    method: Method,
    segments: Vec<Segment>,
    handler: Handler,
}

#[derive(Debug, Clone)]
enum Segment {
    Literal(String),
    Param(String),
}

fn parse_pattern(pattern: &str) -> Vec<Segment> {
    pattern
        .trim_matches('/')
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| {
            if let Some(name) = s.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                Segment::Param(name.to_string())
            } else {
                Segment::Literal(s.to_string())
            }
        })
        .collect()
}

#[derive(Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for `method`/`pattern`. `F` must be `'static` and
    /// is expected to close over an `Arc<Services>` clone.
    pub fn route<F, Fut>(mut self, method: Method, pattern: &str, handler: F) -> Self
    where
        F: Fn(Request<Incoming>, PathParams) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = hyper::Response<Body>> + Send + 'static,
    {
        self.routes.push(Route {
            method,
            segments: parse_pattern(pattern),
            handler: Arc::new(move |req, params| Box::pin(handler(req, params))),
        });
        self
    }

    /// Find a handler for `method`/`path`, extracting path parameters.
    /// Returns `None` if no route matches (caller should respond 404),
    /// distinguishing path-exists-wrong-method only implicitly — this
    /// router does not emit 405, matching the API surface's flat endpoint
    /// table (§6), which has no overlapping method/path pairs.
    pub fn matches(&self, method: &Method, path: &str) -> Option<(Handler, PathParams)> {
        let path_segments: Vec<&str> = path.trim_matches('/').split('/').filter(|s| !s.is_empty()).collect();
        for route in &self.routes {
            if &route.method != method {
                continue;
            }
            if route.segments.len() != path_segments.len() {
                continue;
            }
            let mut params = PathParams::new();
            let mut matched = true;
            for (seg, actual) in route.segments.iter().zip(path_segments.iter()) {
                match seg {
                    Segment::Literal(lit) => {
                        if lit != actual {
                            matched = false;
                            break;
                        }
                    }
                    Segment::Param(name) => {
                        params.insert(name.clone(), actual.to_string());
                    }
                }
            }
            if matched {
                return Some((Arc::clone(&route.handler), params));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::json::empty_response;

    #[test]
    fn matches_literal_route() {
        let router = Router::new().route(Method::GET, "/health/ping", |req, params| async move {
            let _ = (req, params);
            empty_response(hyper::StatusCode::OK)
        });
        assert!(router.matches(&Method::GET, "/health/ping").is_some());
        assert!(router.matches(&Method::POST, "/health/ping").is_none());
        assert!(router.matches(&Method::GET, "/health/pingx").is_none());
    }

    #[test]
    fn extracts_path_param() {
        let router = Router::new().route(Method::GET, "/tasks/{task_id}", |req, params| async move {
            let _ = req;
            assert!(params.contains_key("task_id"));
            empty_response(hyper::StatusCode::OK)
        });
        let (_, params) = router.matches(&Method::GET, "/tasks/abc-123").unwrap();
        assert_eq!(params.get("task_id").unwrap(), "abc-123");
    }

    #[test]
    fn no_match_for_unknown_path() {
        let router = Router::new();
        assert!(router.matches(&Method::GET, "/nope").is_none());
    }
}
