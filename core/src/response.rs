//! Reply classification and decode dispatch.
//!
//! # Design
//! A `Response` records how an exchange ended: with no reply at all (the
//! error slot is set), with a reply whose body carries no media type, or
//! with a reply whose media type resolved to a codec. Only the last kind
//! can be decoded. Decoding picks the error type or the success type from
//! `classify_status` alone, happens at most once, and releases the reply
//! body on every path. The result is an `Outcome`, so each terminal state
//! is a variant instead of a combination of flags and output slots.

use std::convert::Infallible;
use std::fmt;
use std::io::Read;
use std::sync::Arc;

use http::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::http::{Reply, ReplyBody};
use crate::media_type::{Codecs, MediaType};

/// True when `status` denotes an application-level error.
///
/// | status  | error |
/// |---------|-------|
/// | 200–299 | no    |
/// | 304     | no    |
/// | other   | yes   |
pub fn classify_status(status: StatusCode) -> bool {
    !(status.is_success() || status == StatusCode::NOT_MODIFIED)
}

/// How a decode attempt ended.
#[derive(Debug)]
pub enum Outcome<T, E> {
    /// The reply was a success and decoded into `T`.
    Success(T),
    /// The reply was an API error and decoded into `E`.
    ApiError(E),
    /// The caller opted out of decoding this kind of reply; the body was released.
    Discarded,
    /// The reply had no content type, so there was nothing to decode.
    NoMediaType,
    /// The body was already decoded or discarded by an earlier call.
    Released,
    /// No usable reply was received.
    TransportFailure(Error),
    /// The body could not be read or parsed.
    DecodeFailure(Error),
}

impl<T, E> Outcome<T, E> {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    pub fn success(self) -> Option<T> {
        match self {
            Outcome::Success(value) => Some(value),
            _ => None,
        }
    }

    pub fn api_error(self) -> Option<E> {
        match self {
            Outcome::ApiError(value) => Some(value),
            _ => None,
        }
    }

    /// The transport or decode error, if the outcome is a failure.
    pub fn error(&self) -> Option<&Error> {
        match self {
            Outcome::TransportFailure(err) | Outcome::DecodeFailure(err) => Some(err),
            _ => None,
        }
    }
}

type DecodeFn<T> = fn(&MediaType, &[u8]) -> Result<T>;

fn decode_as<T: DeserializeOwned>(media_type: &MediaType, bytes: &[u8]) -> Result<T> {
    media_type.decode(bytes)
}

pub struct Response {
    status: Option<StatusCode>,
    headers: HeaderMap,
    media_type: Option<MediaType>,
    is_api_error: bool,
    decoded: bool,
    error: Option<Error>,
    body: Option<ReplyBody>,
}

impl Response {
    /// A response for an exchange that produced no usable reply.
    pub(crate) fn failed(error: Error) -> Self {
        Self {
            status: None,
            headers: HeaderMap::new(),
            media_type: None,
            is_api_error: false,
            decoded: false,
            error: Some(error),
            body: None,
        }
    }

    /// Resolves the reply's media type and classifies its status.
    ///
    /// A malformed or unsupported content type releases the body and yields
    /// a failed response.
    pub(crate) fn from_reply(reply: Reply, codecs: &Codecs) -> Self {
        let (parts, body) = reply.into_parts();
        let media_type = match codecs.from_headers(&parts.headers) {
            Ok(media_type) => media_type,
            Err(err) => {
                drop(body);
                return Self::failed(err);
            }
        };

        let is_api_error = classify_status(parts.status);
        debug!(
            status = parts.status.as_u16(),
            media_type = media_type.as_ref().map(MediaType::as_str),
            is_api_error,
            "reply received"
        );

        Self {
            status: Some(parts.status),
            headers: parts.headers,
            media_type,
            is_api_error,
            decoded: false,
            error: None,
            body: Some(body),
        }
    }

    /// Reply status; `None` when no reply was received.
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn media_type(&self) -> Option<&MediaType> {
        self.media_type.as_ref()
    }

    pub fn is_api_error(&self) -> bool {
        self.is_api_error
    }

    pub fn is_decoded(&self) -> bool {
        self.decoded
    }

    /// Transport, media-type or decode error recorded on this response.
    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// True on any failure: a recorded error or an API-error status.
    pub fn any_error(&self) -> bool {
        self.is_error() || self.is_api_error
    }

    /// Decodes the body into `T` on success or `E` on an API error.
    pub fn decode<T, E>(&mut self) -> Outcome<T, E>
    where
        T: DeserializeOwned,
        E: DeserializeOwned,
    {
        self.dispatch(
            Some(decode_as::<E> as DecodeFn<E>),
            Some(decode_as::<T> as DecodeFn<T>),
        )
    }

    /// Decodes a success body into `T`; an API-error body is released
    /// without being parsed.
    pub fn decode_success<T: DeserializeOwned>(&mut self) -> Outcome<T, Infallible> {
        self.dispatch(None, Some(decode_as::<T> as DecodeFn<T>))
    }

    /// Releases the body without decoding it.
    pub fn discard(&mut self) {
        if self.media_type.is_some() {
            self.decoded = true;
        }
        self.body = None;
    }

    fn dispatch<T, E>(
        &mut self,
        on_error: Option<DecodeFn<E>>,
        on_success: Option<DecodeFn<T>>,
    ) -> Outcome<T, E> {
        if self.decoded {
            return Outcome::Released;
        }
        let Some(media_type) = &self.media_type else {
            return match &self.error {
                Some(err) => Outcome::TransportFailure(err.clone()),
                None => Outcome::NoMediaType,
            };
        };
        self.decoded = true;
        let body = self.body.take();

        let decoded = if self.is_api_error {
            on_error.map(|decode| {
                read_body(body)
                    .and_then(|bytes| decode(media_type, &bytes))
                    .map(Outcome::ApiError)
            })
        } else {
            on_success.map(|decode| {
                read_body(body)
                    .and_then(|bytes| decode(media_type, &bytes))
                    .map(Outcome::Success)
            })
        };
        trace!(
            is_api_error = self.is_api_error,
            skipped = decoded.is_none(),
            "body dispatched"
        );

        match decoded {
            None => Outcome::Discarded,
            Some(Ok(outcome)) => outcome,
            Some(Err(err)) => {
                self.error = Some(err.clone());
                Outcome::DecodeFailure(err)
            }
        }
    }
}

/// Reads the body to the end; the reader is dropped before returning.
fn read_body(body: Option<ReplyBody>) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    if let Some(mut body) = body {
        body.read_to_end(&mut bytes)
            .map_err(|e| Error::Body(Arc::new(e)))?;
    }
    Ok(bytes)
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.status)
            .field("media_type", &self.media_type)
            .field("is_api_error", &self.is_api_error)
            .field("decoded", &self.decoded)
            .field("error", &self.error)
            .field("body_open", &self.body.is_some())
            .finish()
    }
}
