//! Client configuration and request factory.
//!
//! # Design
//! `Client` holds an immutable snapshot of its configuration: the base URL,
//! the default headers and the codec registry are fixed at `Client::new`,
//! so building a request never observes another caller's changes. The
//! transport is shared through an `Arc`; the caller keeps its own handle
//! and may reuse it elsewhere. Every `Request` borrows the client and owns
//! everything else it needs.

use std::collections::BTreeMap;
use std::sync::Arc;

use http::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use serde::Deserialize;
use url::Url;

use crate::error::{Error, Result};
use crate::http::Transport;
use crate::media_type::{Codecs, MediaType};
use crate::request::Request;

/// Settings a `Client` is built from.
///
/// Deserializable so it can be loaded from a JSON file:
///
/// ```json
/// { "base_url": "https://api.example.com/v3", "headers": { "Accept": "application/json" } }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientConfig {
    pub base_url: String,
    /// Headers copied onto every request. Values replace, never append.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// `User-Agent` sent unless `headers` sets one. `null` sends none.
    #[serde(default = "default_user_agent")]
    pub user_agent: Option<String>,
}

fn default_user_agent() -> Option<String> {
    Some(format!("parley/{}", env!("CARGO_PKG_VERSION")))
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            headers: BTreeMap::new(),
            user_agent: default_user_agent(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_string(), value.to_string());
        self
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| Error::Config(e.to_string()))
    }
}

/// Request factory bound to a base URL and a shared transport.
pub struct Client {
    base: Url,
    headers: HeaderMap,
    codecs: Codecs,
    transport: Arc<dyn Transport>,
}

impl Client {
    /// Validates `config` and binds it to `transport`.
    ///
    /// The base URL gains a trailing `/` so relative addresses resolve
    /// beneath it: `users` against `https://api.example.com/v3` becomes
    /// `https://api.example.com/v3/users`.
    pub fn new(config: ClientConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        let mut base = Url::parse(&config.base_url)
            .map_err(|e| Error::Config(format!("base_url {:?}: {e}", config.base_url)))?;
        if base.cannot_be_a_base() {
            return Err(Error::Config(format!(
                "base_url {:?} cannot be a base",
                config.base_url
            )));
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let mut headers = HeaderMap::new();
        if let Some(agent) = &config.user_agent {
            headers.insert(USER_AGENT, header_value(USER_AGENT.as_str(), agent)?);
        }
        for (name, value) in &config.headers {
            let key = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| Error::Config(format!("invalid header name {name:?}")))?;
            headers.insert(key, header_value(name, value)?);
        }

        Ok(Self {
            base,
            headers,
            codecs: Codecs::default(),
            transport,
        })
    }

    /// Replaces the codec registry used for outbound and inbound bodies.
    pub fn with_codecs(mut self, codecs: Codecs) -> Self {
        self.codecs = codecs;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    pub fn default_headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn codecs(&self) -> &Codecs {
        &self.codecs
    }

    /// Resolves `raw` against this client's codecs, for use with `Request::set_body`.
    pub fn media_type(&self, raw: &str) -> Result<MediaType> {
        self.codecs.resolve(raw)
    }

    /// Joins `address` onto the base URL. Absolute addresses pass through.
    pub fn resolve(&self, address: &str) -> Result<Url> {
        self.base.join(address).map_err(|source| Error::Resolve {
            address: address.to_string(),
            source,
        })
    }

    /// Starts a GET request for `address`, seeded with the default headers
    /// and with the query string already present in `address`.
    pub fn new_request(&self, address: &str) -> Result<Request<'_>> {
        let url = self.resolve(address)?;
        Ok(Request::new(self, url, self.headers.clone()))
    }

    pub(crate) fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|_| Error::Config(format!("invalid value for header {name:?}")))
}
