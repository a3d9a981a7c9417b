//! Error types for the negotiation layer.
//!
//! # Design
//! Failures that happen while a request is being assembled (`Config`,
//! `Resolve`, `Encode`, `MediaType` for an outbound type) are returned to the
//! caller straight away. Failures that happen during the exchange
//! (`Transport`, `MediaType`, `UnsupportedMediaType`, `Decode`, `Body`) are
//! stored on the `Response` and handed out again through `Outcome`, so the
//! enum is `Clone` and keeps foreign error sources behind `Arc`.

use std::sync::Arc;

/// Boxed error produced by a `Transport` implementation.
pub type TransportError = Box<dyn std::error::Error + Send + Sync>;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by `Client`, `Request` and `Response`.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// The `ClientConfig` carried an unusable base URL or default header.
    #[error("invalid client configuration: {0}")]
    Config(String),

    /// The address could not be parsed or joined onto the base URL.
    #[error("cannot resolve {address:?} against the base URL: {source}")]
    Resolve {
        address: String,
        #[source]
        source: url::ParseError,
    },

    /// The exchange failed below the HTTP layer.
    #[error("transport failed: {0}")]
    Transport(#[source] Arc<dyn std::error::Error + Send + Sync>),

    /// A content-type value is not a well-formed media type.
    #[error("malformed media type {value:?}: {reason}")]
    MediaType { value: String, reason: String },

    /// The media type parsed, but no codec handles its format.
    #[error("no codec registered for media type {0:?}")]
    UnsupportedMediaType(String),

    /// The outbound value could not be serialized.
    #[error("encoding a {media_type} body failed: {source}")]
    Encode {
        media_type: String,
        #[source]
        source: CodecError,
    },

    /// The reply body could not be parsed into the requested type.
    #[error("decoding a {media_type} body failed: {source}")]
    Decode {
        media_type: String,
        #[source]
        source: CodecError,
    },

    /// Reading the reply body failed.
    #[error("reading the response body failed: {0}")]
    Body(#[source] Arc<std::io::Error>),
}

impl Error {
    pub(crate) fn transport(source: impl Into<TransportError>) -> Self {
        Error::Transport(Arc::from(source.into()))
    }

    pub(crate) fn media_type(value: &str, reason: impl Into<String>) -> Self {
        Error::MediaType {
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Errors raised by a `Codec` while converting between bytes and values.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CodecError {
    /// serde_json rejected the value or the bytes.
    #[error("{0}")]
    Json(#[source] Arc<serde_json::Error>),

    /// The value has a shape the format cannot represent.
    #[error("{0}")]
    Unrepresentable(String),

    /// The bytes are not valid for the format.
    #[error("{0}")]
    Malformed(String),
}

impl From<serde_json::Error> for CodecError {
    fn from(err: serde_json::Error) -> Self {
        CodecError::Json(Arc::new(err))
    }
}
