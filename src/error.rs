use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Errors surfaced by the proxy pipeline.
///
/// Each variant renders as a JSON body of the shape
/// `{"status": false, "message": ..., "error": ...}`.
#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("Upstream unreachable: {0}")]
    Upstream(String),

    #[error("Invalid backend origin: {0}")]
    InvalidBackendOrigin(String),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl ProxyError {
    /// Build an upstream error from a transport failure, keeping its cause chain.
    pub fn upstream(err: &(dyn std::error::Error + 'static)) -> Self {
        ProxyError::Upstream(error_chain(err))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ProxyError::InvalidBackendOrigin(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ProxyError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Short human-readable summary used as the `message` field.
    pub fn message(&self) -> &'static str {
        match self {
            ProxyError::Upstream(_) => "Upstream unreachable",
            ProxyError::InvalidBackendOrigin(_) => "Invalid backend origin",
            ProxyError::BadRequest(_) => "Bad request",
        }
    }

    /// Failure detail used as the `error` field.
    pub fn detail(&self) -> &str {
        match self {
            ProxyError::Upstream(detail)
            | ProxyError::InvalidBackendOrigin(detail)
            | ProxyError::BadRequest(detail) => detail,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Json sets `content-type: application/json`
        let body = Json(json!({
            "status": false,
            "message": self.message(),
            "error": self.detail(),
        }));

        (status, body).into_response()
    }
}

/// Join an error and its `source()` chain with `": "`.
pub fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut detail = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let cause_text = cause.to_string();
        if !detail.contains(&cause_text) {
            detail.push_str(": ");
            detail.push_str(&cause_text);
        }
        source = cause.source();
    }
    detail
}

pub type Result<T> = std::result::Result<T, ProxyError>;
