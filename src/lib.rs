//! Edge reverse proxy.
//!
//! Every inbound request is either answered as a CORS preflight or relayed to
//! a single backend origin, with CORS headers computed from the request's
//! `Origin` attached to whatever comes back.

pub mod config;
pub mod cors;
pub mod error;
pub mod observability;
pub mod proxy;

pub use config::{Config, Environment, ProcessEnvironment};
pub use cors::{apply_cors_headers, build_cors_headers, OriginAllowlist};
pub use error::{ProxyError, Result};
pub use proxy::{EdgeProxy, Forwarder};
