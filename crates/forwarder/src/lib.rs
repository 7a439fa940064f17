//! # Forwarder
//!
//! Small relay service for browser clients that cannot call targets directly.
//!
//! Requests go out only to allowlisted hosts over HTTPS, with hop-by-hop
//! headers removed and TLS verification left on. The upstream status and body
//! are returned as-is; the reachability envelope rides in response headers.
//! Browser origins are admitted through a configurable CORS layer.

mod cors;
mod error;
mod forwarder;
mod headers;
mod server;

pub use cors::{CorsOrigins, OK_HEADER, REACHABLE_HEADER, UPSTREAM_STATUS_HEADER};
pub use error::ForwardError;
pub use forwarder::{ForwardEnvelope, ForwardRequest, ForwardResponse, Forwarder, PreparedForward};
pub use headers::strip_hop_by_hop;
pub use server::{router, serve, serve_on};
