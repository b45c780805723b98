//! Error taxonomy → HTTP response translation.
//!
//! Every failure on the request path reduces to a [`ViewError`]; the mapping
//! to status code and body is a pure function of the error kind. Client
//! errors keep their actionable detail; anything outside the client-facing
//! taxonomy is masked to a generic 500 body, with the real cause logged
//! server-side only.

use bytes::Bytes;
use http::{Response, StatusCode, header::CONTENT_TYPE};
use http_body_util::Full;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::error;

use tagwire_codec::{CodecError, ValidationError};

/// Common result type for view handlers
pub type ViewResult<T> = Result<T, ViewError>;

/// Masked body message for anything outside the client-facing taxonomy.
pub const UNHANDLED_MESSAGE: &str = "Unhandled Exception.";

/// Request-boundary error taxonomy.
#[derive(Debug, Clone, Error)]
pub enum ViewError {
    /// Body present but the media type is not `application/json`.
    #[error("Request content type must be application/json.")]
    ContentType,

    /// `application/json` with a charset this service cannot decode.
    #[error("Unsupported charset {0} for application/json body.")]
    Charset(String),

    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Raised deliberately by a handler with an explicit status code; passes
    /// through untouched, extra keys and all.
    #[error("{message}")]
    Http {
        status: StatusCode,
        message: String,
        extra: IndexMap<String, Value>,
    },

    /// Anything else. The detail never reaches the client.
    #[error("{0}")]
    Unhandled(String),
}

impl ViewError {
    pub fn http(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
            extra: IndexMap::new(),
        }
    }

    pub fn http_with(
        status: StatusCode,
        message: impl Into<String>,
        extra: IndexMap<String, Value>,
    ) -> Self {
        Self::Http {
            status,
            message: message.into(),
            extra,
        }
    }

    pub fn unhandled(message: impl Into<String>) -> Self {
        Self::Unhandled(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ViewError::ContentType | ViewError::Charset(_) => StatusCode::BAD_REQUEST,
            ViewError::Codec(err) if err.is_client_error() => StatusCode::BAD_REQUEST,
            // Registry/builder defects are server bugs, not client input.
            ViewError::Codec(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ViewError::Http { status, .. } => *status,
            ViewError::Unhandled(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_body(&self) -> ErrorBody {
        match self {
            ViewError::Codec(CodecError::Validation(ValidationError { message, fields })) => {
                ErrorBody {
                    message: message.clone(),
                    fields: Some(fields.clone()),
                    extra: IndexMap::new(),
                }
            }
            ViewError::Http { message, extra, .. } => ErrorBody {
                message: message.clone(),
                fields: None,
                extra: extra.clone(),
            },
            _ if self.status().is_server_error() => ErrorBody::message(UNHANDLED_MESSAGE),
            other => ErrorBody::message(other.to_string()),
        }
    }

    /// Build the structured JSON error response for this failure.
    pub fn into_response(self) -> Response<Full<Bytes>> {
        let status = self.status();
        if status.is_server_error() {
            // Full detail stays on the server side.
            error!("request failed with masked response: {self}");
        }
        let body = serde_json::to_vec(&self.error_body())
            .unwrap_or_else(|_| format!(r#"{{"message":"{UNHANDLED_MESSAGE}"}}"#).into_bytes());
        Response::builder()
            .status(status)
            .header(CONTENT_TYPE, crate::JSON_MIME)
            .body(Full::new(Bytes::from(body)))
            .unwrap()
    }
}

/// External shape of any failure: `{message, fields?, ...extra}`.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<IndexMap<String, String>>,
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

impl ErrorBody {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            fields: None,
            extra: IndexMap::new(),
        }
    }
}
