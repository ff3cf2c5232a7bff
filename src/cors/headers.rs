use axum::http::{header, HeaderMap, HeaderValue};

pub const ALLOW_METHODS: &str = "GET, POST, PUT, PATCH, DELETE, OPTIONS";
pub const ALLOW_HEADERS: &str = "Authorization, Content-Type, Accept, Origin, Referer, User-Agent";
/// Seconds a browser may cache a preflight result.
pub const MAX_AGE: &str = "86400";

/// Build the fixed CORS header set around `allow_origin`.
///
/// `allow_origin` is either the reflected request origin or `*`; the caller
/// makes that decision.
pub fn build_cors_headers(allow_origin: HeaderValue) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(6);
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, allow_origin);
    headers.insert(header::VARY, HeaderValue::from_static("Origin"));
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOW_METHODS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOW_HEADERS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
        HeaderValue::from_static("true"),
    );
    headers.insert(
        header::ACCESS_CONTROL_MAX_AGE,
        HeaderValue::from_static(MAX_AGE),
    );
    headers
}

/// Overlay `cors` onto `target`, replacing every value a name already had.
/// Headers not in `cors` are left alone.
pub fn apply_cors_headers(target: &mut HeaderMap, cors: &HeaderMap) {
    for (name, value) in cors {
        target.insert(name.clone(), value.clone());
    }
}
