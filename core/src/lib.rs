//! Content-negotiating request layer over a pluggable HTTP transport.
//!
//! # Overview
//! A `Client` resolves addresses against a base URL and builds `Request`s
//! seeded with default headers. A request can carry a typed body, encoded
//! by the codec of the `MediaType` it is given. Sending yields a `Response`
//! whose content type has already been resolved and whose status has been
//! classified. `Response::decode` turns the body into the caller's success
//! or error type and returns an `Outcome`.
//!
//! # Design
//! - Sockets stay behind the `Transport` trait; `transport::agent()` gives a
//!   ready-made blocking ureq implementation.
//! - Codecs are looked up by format (`json`, `x-www-form-urlencoded`,
//!   `plain`, or any registered name), so vendor types such as
//!   `application/vnd.github.v3+json` reuse the JSON codec.
//! - Status classification is one fixed function, `classify_status`.
//! - Transport and decode failures never panic or vanish: they are recorded
//!   on the `Response` and returned through `Outcome`.

pub mod client;
pub mod codec;
pub mod error;
pub mod http;
pub mod media_type;
pub mod query;
pub mod request;
pub mod response;
pub mod transport;

#[cfg(test)]
mod testing;

pub use crate::client::{Client, ClientConfig};
pub use crate::codec::{Codec, JsonCodec};
pub use crate::error::{CodecError, Error, Result, TransportError};
pub use crate::http::{HttpMethod, Reply, ReplyBody, Transport, CONTENT_TYPE};
pub use crate::media_type::{Codecs, MediaType};
pub use crate::query::Query;
pub use crate::request::Request;
pub use crate::response::{classify_status, Outcome, Response};
pub use mime::Mime;
