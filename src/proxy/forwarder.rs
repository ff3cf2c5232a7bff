use std::time::Duration;

use anyhow::Result;
use axum::{
    body::Body,
    extract::Request,
    http::{Method, Uri},
    response::Response,
};
use http_body_util::BodyExt;
use tracing::{debug, warn};
use url::Url;

use crate::config::ProxyConfig;
use crate::error::{ProxyError, Result as ProxyResult};
use super::headers::{outbound_request_headers, relayed_response_headers};

/// Relays requests to a backend origin over a shared HTTP client.
#[derive(Clone)]
pub struct Forwarder {
    http_client: reqwest::Client,
    request_timeout: Duration,
}

impl Forwarder {
    pub fn new(config: &ProxyConfig) -> Result<Self> {
        // Redirects go back to the caller untouched
        let http_client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))?;

        Ok(Self {
            http_client,
            request_timeout: config.request_timeout,
        })
    }

    /// Send `request` to `backend_origin`, keeping its path and query.
    ///
    /// The upstream response is returned as received apart from connection
    /// framing headers, with its body streamed through. Any transport failure
    /// becomes [`ProxyError::Upstream`].
    pub async fn forward(&self, request: Request, backend_origin: &str) -> ProxyResult<Response> {
        let target_url = build_target_url(backend_origin, request.uri())?;
        let (parts, body) = request.into_parts();

        let mut request_builder = self
            .http_client
            .request(parts.method.clone(), target_url.as_str())
            .headers(outbound_request_headers(&parts.headers));

        if carries_body(&parts.method) {
            let body_bytes = body
                .collect()
                .await
                .map_err(|e| ProxyError::BadRequest(format!("Failed to read request body: {}", e)))?
                .to_bytes();
            request_builder = request_builder.body(body_bytes);
        }

        debug!("Forwarding {} to {}", parts.method, target_url);

        let upstream = match tokio::time::timeout(self.request_timeout, request_builder.send()).await {
            Ok(Ok(upstream)) => upstream,
            Ok(Err(e)) => {
                warn!("Upstream request to {} failed: {}", target_url, e);
                return Err(ProxyError::upstream(&e));
            }
            Err(_) => {
                warn!("Upstream request to {} timed out", target_url);
                return Err(ProxyError::Upstream(format!(
                    "no response from {} within {}s",
                    target_url,
                    self.request_timeout.as_secs_f64()
                )));
            }
        };

        let status = upstream.status();
        let headers = relayed_response_headers(upstream.headers());
        debug!("Upstream answered {} for {}", status, target_url);

        let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        Ok(response)
    }
}

/// GET and HEAD never carry a body upstream.
pub fn carries_body(method: &Method) -> bool {
    !matches!(*method, Method::GET | Method::HEAD)
}

/// Scheme, host and port of `backend_origin`, without a trailing slash.
pub fn backend_base(backend_origin: &str) -> ProxyResult<String> {
    let url = Url::parse(backend_origin.trim())
        .map_err(|e| ProxyError::InvalidBackendOrigin(format!("{}: {}", backend_origin, e)))?;

    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(ProxyError::InvalidBackendOrigin(format!(
            "{}: expected an absolute http(s) URL",
            backend_origin
        )));
    }

    Ok(url.origin().ascii_serialization())
}

/// Target URL for the outbound request: the backend's scheme, host and port
/// followed by the inbound path and query exactly as received.
pub fn build_target_url(backend_origin: &str, uri: &Uri) -> ProxyResult<String> {
    let base = backend_base(backend_origin)?;
    let path_and_query = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");

    Ok(format!("{}{}", base, path_and_query))
}
