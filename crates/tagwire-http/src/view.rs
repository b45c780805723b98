//! JSON view wrapper.
//!
//! [`JsonView::run`] is the outermost boundary of the core: it builds the
//! per-request [`JsonBody`], enforces a route's declared expectation before
//! handler code runs, encodes a successful return value as tagged JSON, and
//! funnels every failure through the error translator. Nothing below this
//! point raises past the boundary.

use std::sync::Arc;

use bytes::Bytes;
use http::{Request, Response, StatusCode, header::CONTENT_TYPE};
use http_body_util::Full;
use tracing::{debug, warn};

use tagwire_codec::{Decoded, Encoder, Registry};

use crate::body::JsonBody;
use crate::error::{ViewError, ViewResult};

/// A handler's successful reply: a value to encode plus the response status.
#[derive(Debug)]
pub struct Reply {
    status: StatusCode,
    value: Decoded,
}

impl Reply {
    /// 200 with the encoded value.
    pub fn ok(value: impl Into<Decoded>) -> Self {
        Self::with_status(StatusCode::OK, value)
    }

    pub fn with_status(status: StatusCode, value: impl Into<Decoded>) -> Self {
        Self {
            status,
            value: value.into(),
        }
    }
}

/// Runs handlers against decoded JSON bodies.
pub struct JsonView {
    registry: Arc<Registry>,
}

impl JsonView {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Run `handler` for `request`, translating every failure into a
    /// structured JSON error response.
    ///
    /// When `expects` names a wire type, the body is decoded and asserted
    /// before the handler runs; the handler can still call
    /// [`JsonBody::json`] freely — the result is memoized.
    pub fn run<F>(
        &self,
        request: Request<Bytes>,
        expects: Option<&str>,
        handler: F,
    ) -> Response<Full<Bytes>>
    where
        F: FnOnce(&JsonBody) -> ViewResult<Reply>,
    {
        let (parts, data) = request.into_parts();
        let content_type = parts
            .headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);

        let mut body = JsonBody::new(self.registry.clone(), content_type.as_deref(), data);
        if let Some(tag) = expects {
            body = body.expects(tag);
            if let Err(err) = body.json() {
                warn!("request body rejected before handler: {err}");
                return err.into_response();
            }
        }

        match handler(&body) {
            Ok(reply) => self.respond(reply),
            Err(err) => err.into_response(),
        }
    }

    fn respond(&self, reply: Reply) -> Response<Full<Bytes>> {
        let encoder = Encoder::new(&self.registry);
        match encoder.dumper(&reply.value) {
            Ok(json) => {
                debug!("encoded response body ({} bytes)", json.len());
                Response::builder()
                    .status(reply.status)
                    .header(CONTENT_TYPE, crate::JSON_MIME)
                    .body(Full::new(Bytes::from(json)))
                    .unwrap()
            }
            Err(err) => ViewError::from(err).into_response(),
        }
    }
}
