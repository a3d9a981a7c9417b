//! Blocking transport backed by ureq.
//!
//! ureq reports 4xx/5xx replies as errors by default. The negotiation layer
//! needs those replies as data, so agents used here should come from
//! `agent()` or be configured with `http_status_as_error(false)`.

use bytes::Bytes;

use crate::error::TransportError;
use crate::http::{Reply, ReplyBody, Transport};

/// A ureq agent that returns every HTTP reply, whatever its status.
pub fn agent() -> ureq::Agent {
    ureq::Agent::config_builder()
        .http_status_as_error(false)
        .build()
        .new_agent()
}

impl Transport for ureq::Agent {
    fn send(&self, request: http::Request<Bytes>) -> Result<Reply, TransportError> {
        let response = if request.body().is_empty() {
            self.run(request.map(|_| ()))?
        } else {
            self.run(request.map(|body| body.to_vec()))?
        };

        let (parts, body) = response.into_parts();
        let body: ReplyBody = Box::new(body.into_reader());
        Ok(http::Response::from_parts(parts, body))
    }
}
