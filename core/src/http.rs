//! HTTP vocabulary and the transport seam.
//!
//! # Design
//! The negotiation layer never opens a socket itself. It hands a fully
//! assembled `http::Request<Bytes>` to a `Transport` and gets back a
//! `Reply` whose body is still a live reader, so the layer decides when the
//! body is read and when it is released. Anything below HTTP (connections,
//! TLS, redirects, timeouts) belongs to the transport.

use std::fmt;
use std::io::Read;

use bytes::Bytes;

use crate::error::TransportError;

pub use http::header::CONTENT_TYPE;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Head,
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Options,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Head => "HEAD",
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<HttpMethod> for http::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Head => http::Method::HEAD,
            HttpMethod::Get => http::Method::GET,
            HttpMethod::Post => http::Method::POST,
            HttpMethod::Put => http::Method::PUT,
            HttpMethod::Patch => http::Method::PATCH,
            HttpMethod::Delete => http::Method::DELETE,
            HttpMethod::Options => http::Method::OPTIONS,
        }
    }
}

/// Reply body as handed over by the transport. Dropping it releases the
/// underlying connection resources.
pub type ReplyBody = Box<dyn Read + Send>;

/// A transport-level reply: status, headers and an unread body.
pub type Reply = http::Response<ReplyBody>;

/// Sends one request and returns the raw reply.
///
/// Implementations must return `Ok` for every reply that carries an HTTP
/// status, including 4xx and 5xx; `Err` is reserved for failures below the
/// HTTP layer. A single transport is shared by every request a `Client`
/// builds, possibly from several threads at once.
pub trait Transport: Send + Sync {
    fn send(&self, request: http::Request<Bytes>) -> Result<Reply, TransportError>;
}
