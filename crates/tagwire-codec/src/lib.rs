//! # Tagged JSON Object Codec
//!
//! A pure, transport-agnostic codec for self-describing JSON payloads.
//! Objects carrying the reserved `"__type__"` key are resolved against a
//! [`Registry`] of wire types, validated against an optional [`Schema`], and
//! built into typed instances; typed instances encode back into tagged JSON
//! with deterministic field order.
//!
//! ## Features
//! - Explicit registry lifecycle (`new` / `register` / `clear`) — no globals
//! - Recursive-descent decoding with validation interleaved
//! - Full-pass validation: every field failure is reported, not just the first
//! - Deterministic encoding with per-type suppressed fields
//! - Structured error taxonomy suitable for request-boundary translation
//!
//! This crate performs no I/O and never suspends; callers own transport,
//! routing and timeout policy.

pub mod decode;
pub mod encode;
pub mod error;
pub mod registry;
pub mod schema;
pub mod value;

// Re-export main types
pub use decode::Decoder;
pub use encode::Encoder;
pub use error::{BuildError, CodecError, CodecResult, DecodeError, ValidationError};
pub use registry::{Registry, WireObject, WireType};
pub use schema::{FieldRule, Schema};
pub use value::{Decoded, FieldAccess, FieldMap, Instance};

/// Reserved object key naming the wire type of a tagged JSON object.
pub const TYPE_KEY: &str = "__type__";
