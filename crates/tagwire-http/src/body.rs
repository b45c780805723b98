//! Per-request body access.
//!
//! [`JsonBody`] ties content negotiation, decoding and the optional top-level
//! type assertion into one idempotent operation: the first call to
//! [`JsonBody::json`] does the work, and the outcome — success or error — is
//! memoized for the life of the request. Application code can read the body
//! any number of times; the decode happens at most once.

use std::sync::{Arc, OnceLock};

use bytes::Bytes;
use tracing::debug;

use tagwire_codec::{Decoded, Decoder, Registry};

use crate::JSON_MIME;
use crate::error::{ViewError, ViewResult};

pub struct JsonBody {
    registry: Arc<Registry>,
    content_type: Option<String>,
    data: Bytes,
    expects: Option<String>,
    parsed: OnceLock<Result<Decoded, ViewError>>,
}

impl JsonBody {
    pub fn new(registry: Arc<Registry>, content_type: Option<&str>, data: Bytes) -> Self {
        Self {
            registry,
            content_type: content_type.map(str::to_owned),
            data,
            expects: None,
            parsed: OnceLock::new(),
        }
    }

    /// Declare the wire type this route expects. Checked once, right after
    /// the first decode.
    pub fn expects(mut self, tag: impl Into<String>) -> Self {
        self.expects = Some(tag.into());
        self
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// The decoded request body.
    ///
    /// First access runs content-type check → decode → declared-type
    /// assertion; later accesses return the memoized outcome unchanged.
    pub fn json(&self) -> ViewResult<&Decoded> {
        match self.parsed.get_or_init(|| self.parse()) {
            Ok(value) => Ok(value),
            Err(err) => Err(err.clone()),
        }
    }

    fn parse(&self) -> Result<Decoded, ViewError> {
        let (mime, charset) = split_content_type(self.content_type.as_deref());
        if mime.as_deref() != Some(JSON_MIME) {
            return Err(ViewError::ContentType);
        }
        if let Some(charset) = charset {
            // Every accepted charset is a UTF-8 subset, so the decoder below
            // covers them all.
            if !is_utf8_compatible(&charset) {
                return Err(ViewError::Charset(charset));
            }
        }
        let decoder = Decoder::new(&self.registry);
        let value = decoder.loader(&self.data)?;
        if let Some(expected) = &self.expects {
            decoder.ensure_type(&value, expected)?;
        }
        debug!("decoded request body ({} bytes)", self.data.len());
        Ok(value)
    }
}

/// Split a `Content-Type` header into lowercased media type and charset.
fn split_content_type(header: Option<&str>) -> (Option<String>, Option<String>) {
    let Some(header) = header else {
        return (None, None);
    };
    let mut parts = header.split(';');
    let mime = parts
        .next()
        .map(|m| m.trim().to_ascii_lowercase())
        .filter(|m| !m.is_empty());
    let charset = parts
        .filter_map(|param| param.split_once('='))
        .find(|(key, _)| key.trim().eq_ignore_ascii_case("charset"))
        .map(|(_, value)| value.trim().trim_matches('"').to_ascii_lowercase());
    (mime, charset)
}

fn is_utf8_compatible(charset: &str) -> bool {
    matches!(charset, "utf-8" | "utf8" | "us-ascii" | "ascii")
}
