use axum::http::{HeaderMap, HeaderName};

/// Connection-identifying headers set by the edge or the client. The backend
/// must derive these from its own transport, so they are never forwarded.
pub const FORWARD_STRIP_HEADERS: &[&str] = &[
    "host",
    "cf-connecting-ip",
    "x-forwarded-for",
    "x-forwarded-proto",
];

/// Framing headers scoped to the inbound connection. The upstream client
/// frames the outbound body itself.
const REQUEST_FRAMING_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
    "content-length",
];

/// Framing headers scoped to the upstream connection. The relayed body is
/// re-framed by the server.
const RESPONSE_FRAMING_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

fn is_listed(name: &HeaderName, list: &[&str]) -> bool {
    // HeaderName is always lowercase
    list.contains(&name.as_str())
}

/// Whether an inbound request header is dropped before forwarding.
pub fn is_stripped_request_header(name: &HeaderName) -> bool {
    is_listed(name, FORWARD_STRIP_HEADERS) || is_listed(name, REQUEST_FRAMING_HEADERS)
}

/// Whether an upstream response header is dropped before relaying.
pub fn is_stripped_response_header(name: &HeaderName) -> bool {
    is_listed(name, RESPONSE_FRAMING_HEADERS)
}

/// Copy of `headers` without the stripped names. The inbound map is left as is;
/// repeated values keep their order.
pub fn outbound_request_headers(headers: &HeaderMap) -> HeaderMap {
    copy_without(headers, is_stripped_request_header)
}

/// Copy of upstream response headers without connection framing.
pub fn relayed_response_headers(headers: &HeaderMap) -> HeaderMap {
    copy_without(headers, is_stripped_response_header)
}

fn copy_without(headers: &HeaderMap, stripped: fn(&HeaderName) -> bool) -> HeaderMap {
    let mut copy = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        if !stripped(name) {
            copy.append(name.clone(), value.clone());
        }
    }
    copy
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, HeaderValue};

    fn inbound() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("edge.example.com"));
        headers.insert("x-forwarded-for", HeaderValue::from_static("1.2.3.4"));
        headers.insert("x-forwarded-proto", HeaderValue::from_static("https"));
        headers.insert("cf-connecting-ip", HeaderValue::from_static("1.2.3.4"));
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from_static("12"));
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        headers.append(header::ACCEPT, HeaderValue::from_static("application/json"));
        headers.append(header::ACCEPT, HeaderValue::from_static("text/plain"));
        headers.insert("x-real-ip", HeaderValue::from_static("1.2.3.4"));
        headers
    }

    #[test]
    fn test_edge_headers_removed() {
        let outbound = outbound_request_headers(&inbound());

        for name in FORWARD_STRIP_HEADERS {
            assert!(!outbound.contains_key(*name), "{} was forwarded", name);
        }
        assert!(!outbound.contains_key(header::CONTENT_LENGTH));
        assert!(!outbound.contains_key(header::CONNECTION));
    }

    #[test]
    fn test_other_headers_pass_through_in_order() {
        let source = inbound();
        let outbound = outbound_request_headers(&source);

        assert_eq!(outbound[header::AUTHORIZATION], "Bearer abc");
        assert_eq!(outbound["x-real-ip"], "1.2.3.4");
        let accept: Vec<_> = outbound.get_all(header::ACCEPT).iter().collect();
        assert_eq!(accept, vec!["application/json", "text/plain"]);

        // the inbound map is untouched
        assert!(source.contains_key(header::HOST));
    }

    #[test]
    fn test_response_framing_removed() {
        let mut upstream = HeaderMap::new();
        upstream.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        upstream.insert(header::CONNECTION, HeaderValue::from_static("close"));
        upstream.insert(header::LOCATION, HeaderValue::from_static("/login"));
        upstream.insert(header::CONTENT_LENGTH, HeaderValue::from_static("5"));

        let relayed = relayed_response_headers(&upstream);
        assert!(!relayed.contains_key(header::TRANSFER_ENCODING));
        assert!(!relayed.contains_key(header::CONNECTION));
        assert_eq!(relayed[header::LOCATION], "/login");
        assert_eq!(relayed[header::CONTENT_LENGTH], "5");
    }
}
