pub mod engine;
pub mod forwarder;
pub mod headers;

pub use engine::EdgeProxy;
pub use forwarder::Forwarder;
