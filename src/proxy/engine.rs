use std::sync::Arc;

use anyhow::Result;
use axum::{
    body::Body,
    extract::{Request, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::config::{resolve_backend_origin, Config, Environment, ServerConfig};
use crate::cors::{apply_cors_headers, cors_headers_for, OriginAllowlist};
use super::forwarder::Forwarder;

/// Entry point for every inbound request.
///
/// `OPTIONS` is answered locally as a preflight; every other method on every
/// path is forwarded to the backend origin. Both paths carry CORS headers.
pub struct EdgeProxy {
    config: Arc<Config>,
    allowlist: OriginAllowlist,
    forwarder: Forwarder,
    environment: Arc<dyn Environment>,
}

impl EdgeProxy {
    pub fn new(config: Config, environment: Arc<dyn Environment>) -> Result<Self> {
        let allowlist = OriginAllowlist::from_config(&config.cors);
        let forwarder = Forwarder::new(&config.proxy)?;

        Ok(Self {
            config: Arc::new(config),
            allowlist,
            forwarder,
            environment,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Backend origin for this invocation. Read on every call.
    pub fn backend_origin(&self) -> String {
        resolve_backend_origin(self.environment.as_ref(), &self.config.proxy)
    }

    /// Handle one request. Never fails: errors are already responses.
    #[instrument(skip(self, req), fields(request_id, method = %req.method(), path = %req.uri().path()))]
    pub async fn handle(&self, req: Request) -> Response {
        tracing::Span::current().record("request_id", tracing::field::display(Uuid::new_v4()));

        let cors = cors_headers_for(&self.allowlist, req.headers());

        let mut response = if req.method() == Method::OPTIONS {
            debug!("Answering preflight");
            let mut preflight = Response::new(Body::empty());
            *preflight.status_mut() = StatusCode::NO_CONTENT;
            preflight
        } else {
            let backend_origin = self.backend_origin();
            match self.forwarder.forward(req, &backend_origin).await {
                Ok(response) => response,
                Err(e) => {
                    debug!("Forwarding failed: {}", e);
                    e.into_response()
                }
            }
        };

        apply_cors_headers(response.headers_mut(), &cors);
        response
    }

    /// Router that sends every method and path to [`EdgeProxy::handle`].
    pub fn router(self: Arc<Self>) -> Router {
        Router::new()
            .fallback(proxy_handler)
            .layer(TraceLayer::new_for_http())
            .with_state(self)
    }

    /// Serve until `shutdown` resolves.
    pub async fn start<F>(self: Arc<Self>, server_config: &ServerConfig, shutdown: F) -> Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let addr = format!("{}:{}", server_config.host, server_config.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", addr, e))?;

        info!("Edge proxy listening on {}", addr);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

        Ok(())
    }
}

async fn proxy_handler(State(proxy): State<Arc<EdgeProxy>>, req: Request) -> Response {
    proxy.handle(req).await
}
