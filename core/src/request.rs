//! Outbound request assembly and execution.
//!
//! # Design
//! A `Request` is built by `Client::new_request`, adjusted by the caller
//! (headers, query, body) and consumed by `execute`. Consuming it makes a
//! second send of the same one-shot body a compile error. The query
//! collection is written into the address only inside `execute`, so
//! parameters can be changed at any point before sending.

use std::fmt;

use bytes::Bytes;
use http::header::{HeaderMap, HeaderValue, CONTENT_LENGTH, CONTENT_TYPE};
use serde::Serialize;
use tracing::{debug, trace};
use url::Url;

use crate::client::Client;
use crate::error::{Error, Result};
use crate::http::HttpMethod;
use crate::media_type::MediaType;
use crate::query::Query;
use crate::response::Response;

pub struct Request<'c> {
    client: &'c Client,
    method: HttpMethod,
    url: Url,
    headers: HeaderMap,
    query: Query,
    media_type: Option<MediaType>,
    body: Option<Bytes>,
}

impl<'c> Request<'c> {
    pub(crate) fn new(client: &'c Client, url: Url, headers: HeaderMap) -> Self {
        let query = Query::from_url(&url);
        Self {
            client,
            method: HttpMethod::Get,
            url,
            headers,
            query,
            media_type: None,
            body: None,
        }
    }

    /// Resolved address. Its query string is only rewritten at send time.
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn query_mut(&mut self) -> &mut Query {
        &mut self.query
    }

    /// Media type of the installed body, if any.
    pub fn media_type(&self) -> Option<&MediaType> {
        self.media_type.as_ref()
    }

    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Encodes `value` as `media_type` and installs it as the body.
    ///
    /// On failure the request is left exactly as it was.
    pub fn set_body<T: Serialize + ?Sized>(
        &mut self,
        media_type: &MediaType,
        value: &T,
    ) -> Result<()> {
        let bytes = media_type.encode(value)?;
        let content_type = media_type.header_value()?;

        self.headers.insert(CONTENT_TYPE, content_type);
        self.headers.insert(CONTENT_LENGTH, HeaderValue::from(bytes.len()));
        self.media_type = Some(media_type.clone());
        self.body = Some(bytes);
        trace!(media_type = %media_type, "request body set");
        Ok(())
    }

    /// Sends the request with `method`.
    ///
    /// Failures below HTTP and unusable reply content types come back as a
    /// failed `Response`; every reply with a status, including 4xx and 5xx,
    /// comes back classified and ready to decode.
    pub fn execute(mut self, method: HttpMethod) -> Response {
        self.method = method;
        self.query.write_to(&mut self.url);
        let client = self.client;

        let request = match self.into_http() {
            Ok(request) => request,
            Err(err) => return Response::failed(err),
        };
        debug!(method = %method, url = %request.uri(), "sending request");

        match client.transport().send(request) {
            Ok(reply) => Response::from_reply(reply, client.codecs()),
            Err(err) => Response::failed(Error::transport(err)),
        }
    }

    pub fn head(self) -> Response {
        self.execute(HttpMethod::Head)
    }

    pub fn get(self) -> Response {
        self.execute(HttpMethod::Get)
    }

    pub fn post(self) -> Response {
        self.execute(HttpMethod::Post)
    }

    pub fn put(self) -> Response {
        self.execute(HttpMethod::Put)
    }

    pub fn patch(self) -> Response {
        self.execute(HttpMethod::Patch)
    }

    pub fn delete(self) -> Response {
        self.execute(HttpMethod::Delete)
    }

    pub fn options(self) -> Response {
        self.execute(HttpMethod::Options)
    }

    fn into_http(self) -> Result<http::Request<Bytes>> {
        let uri = http::Uri::try_from(self.url.as_str()).map_err(Error::transport)?;
        let mut request = http::Request::new(self.body.unwrap_or_default());
        *request.method_mut() = self.method.into();
        *request.uri_mut() = uri;
        *request.headers_mut() = self.headers;
        Ok(request)
    }
}

impl fmt::Debug for Request<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("url", &self.url.as_str())
            .field("query", &self.query)
            .field("media_type", &self.media_type)
            .field("body_len", &self.body.as_ref().map(Bytes::len))
            .finish()
    }
}
