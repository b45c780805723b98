//! # HTTP lifecycle for the tagwire codec
//!
//! Binds the pure codec to request handling: content negotiation for JSON
//! bodies, a per-request lazily-decoded and memoized body accessor, and the
//! translator that maps the codec's error taxonomy to structured JSON error
//! responses. Routing, dispatch and the server runtime stay with the caller;
//! this crate only consumes raw request parts and produces
//! `http::Response<Full<Bytes>>` values.

pub mod body;
pub mod error;
pub mod view;

// Re-export main types
pub use body::JsonBody;
pub use error::{ErrorBody, UNHANDLED_MESSAGE, ViewError, ViewResult};
pub use view::{JsonView, Reply};

/// The only accepted request media type.
pub const JSON_MIME: &str = "application/json";
