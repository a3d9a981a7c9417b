//! In-memory transport and body doubles for unit tests.

use std::collections::VecDeque;
use std::io::{self, Cursor, Read};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::HeaderMap;
use serde_json::Value;

use crate::codec::{Codec, JsonCodec};
use crate::error::{CodecError, TransportError};
use crate::http::{Reply, ReplyBody, Transport};

/// A request as the transport saw it.
#[derive(Debug, Clone)]
pub(crate) struct Sent {
    pub method: String,
    pub uri: String,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

/// Replays queued replies in order and records every request.
#[derive(Default)]
pub(crate) struct Scripted {
    replies: Mutex<VecDeque<Result<Reply, TransportError>>>,
    sent: Mutex<Vec<Sent>>,
}

impl Scripted {
    pub fn push(&self, reply: Result<Reply, TransportError>) {
        self.replies.lock().unwrap().push_back(reply);
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }
}

impl Transport for Scripted {
    fn send(&self, request: http::Request<Bytes>) -> Result<Reply, TransportError> {
        self.sent.lock().unwrap().push(Sent {
            method: request.method().to_string(),
            uri: request.uri().to_string(),
            headers: request.headers().clone(),
            body: request.body().to_vec(),
        });
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err("no scripted reply left".into()))
    }
}

/// Body that flags when it is dropped.
struct TrackedBody<R> {
    inner: R,
    released: Arc<AtomicBool>,
}

impl<R: Read> Read for TrackedBody<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl<R> Drop for TrackedBody<R> {
    fn drop(&mut self) {
        self.released.store(true, Ordering::SeqCst);
    }
}

struct Broken;

impl Read for Broken {
    fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::ConnectionReset, "connection reset"))
    }
}

fn build(status: u16, content_type: Option<&str>, body: ReplyBody) -> Reply {
    let mut builder = http::Response::builder().status(status);
    if let Some(content_type) = content_type {
        builder = builder.header(CONTENT_TYPE, content_type);
    }
    builder.body(body).unwrap()
}

/// A reply plus a flag that turns true once its body is released.
pub(crate) fn reply(
    status: u16,
    content_type: Option<&str>,
    body: &str,
) -> (Reply, Arc<AtomicBool>) {
    let released = Arc::new(AtomicBool::new(false));
    let body = TrackedBody {
        inner: Cursor::new(body.as_bytes().to_vec()),
        released: released.clone(),
    };
    (build(status, content_type, Box::new(body)), released)
}

/// A reply whose body errors on the first read.
pub(crate) fn failing_reply(status: u16, content_type: &str) -> (Reply, Arc<AtomicBool>) {
    let released = Arc::new(AtomicBool::new(false));
    let body = TrackedBody {
        inner: Broken,
        released: released.clone(),
    };
    (build(status, Some(content_type), Box::new(body)), released)
}

/// JSON codec that counts decode calls.
#[derive(Debug, Default)]
pub(crate) struct CountingCodec {
    pub calls: Arc<AtomicUsize>,
}

impl Codec for CountingCodec {
    fn encode(&self, value: &Value) -> Result<Vec<u8>, CodecError> {
        JsonCodec.encode(value)
    }

    fn decode(&self, bytes: &[u8]) -> Result<Value, CodecError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        JsonCodec.decode(bytes)
    }
}
