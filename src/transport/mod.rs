//! HTTP transport: bearer auth, correlation ids, cancellation-aware send and body reads.

pub mod http;

pub use http::{HttpTransport, RequestBody, TransportError, REQUEST_ID_HEADER};
