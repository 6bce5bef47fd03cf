//! Raw hyper accept loop (the teacher's `HttpMcpServer::run()` shape),
//! generalized to dispatch through a `Router` instead of an MCP dispatcher.

use std::net::SocketAddr;
use std::sync::Arc;

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::cors::CorsLayer;
use crate::json::empty_response;
use crate::router::Router;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_address: SocketAddr,
    pub enable_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".parse().unwrap(),
            enable_cors: true,
        }
    }
}

pub struct HttpServer {
    config: ServerConfig,
    router: Arc<Router>,
}

impl HttpServer {
    pub fn new(config: ServerConfig, router: Router) -> Self {
        Self {
            config,
            router: Arc::new(router),
        }
    }

    /// Accept connections until `SIGINT`/`SIGTERM`, matching the teacher's
    /// `HttpMcpServer::run()` shutdown shape (SPEC_FULL.md §10.6): stop
    /// accepting new connections, let in-flight ones finish, then return.
    pub async fn run(&self) -> std::io::Result<()> {
        let listener = TcpListener::bind(&self.config.bind_address).await?;
        info!(addr = %self.config.bind_address, "HTTP API listening");

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let (stream, peer) = accepted?;
                    debug!(%peer, "accepted connection");
                    let router = Arc::clone(&self.router);
                    let enable_cors = self.config.enable_cors;
                    tokio::spawn(async move {
                        let io = TokioIo::new(stream);
                        let service = service_fn(move |req| {
                            let router = Arc::clone(&router);
                            async move { Ok::<_, hyper::Error>(dispatch(req, router, enable_cors).await) }
                        });
                        if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                            let msg = err.to_string();
                            if msg.contains("connection closed before message completed") {
                                debug!(%peer, "client disconnected");
                            } else {
                                error!(%peer, error = %msg, "connection error");
                            }
                        }
                    });
                }
                _ = tokio::signal::ctrl_c() => {
                    warn!("received shutdown signal, no longer accepting connections");
                    return Ok(());
                }
            }
        }
    }
}

async fn dispatch(
    req: hyper::Request<hyper::body::Incoming>,
    router: Arc<Router>,
    enable_cors: bool,
) -> hyper::Response<crate::json::Body> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let mut response = if method == Method::OPTIONS {
        empty_response(StatusCode::NO_CONTENT)
    } else {
        match router.matches(&method, &path) {
            Some((handler, params)) => handler(req, params).await,
            None => empty_response(StatusCode::NOT_FOUND),
        }
    };

    if enable_cors {
        CorsLayer::apply_cors_headers(response.headers_mut());
    }
    response
}
