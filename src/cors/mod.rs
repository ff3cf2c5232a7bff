pub mod allowlist;
pub mod headers;

use axum::http::{header, HeaderMap, HeaderValue};

pub use allowlist::OriginAllowlist;
pub use headers::{apply_cors_headers, build_cors_headers};

/// Compute the CORS header set for a request.
///
/// An allowlisted `Origin` is reflected verbatim; anything else (absent,
/// malformed, untrusted) gets the wildcard.
pub fn cors_headers_for(allowlist: &OriginAllowlist, request_headers: &HeaderMap) -> HeaderMap {
    let origin = request_headers.get(header::ORIGIN);
    let declared = origin.and_then(|value| value.to_str().ok());

    let allow_origin = match origin {
        Some(value) if allowlist.is_allowed(declared) => value.clone(),
        _ => HeaderValue::from_static("*"),
    };

    build_cors_headers(allow_origin)
}
