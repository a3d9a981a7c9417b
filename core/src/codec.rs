//! Format codecs.
//!
//! # Design
//! The built-in formats (JSON, `application/x-www-form-urlencoded` and
//! `text/plain`) serialize the caller's type directly and deserialize
//! straight into the target type, so typed fields survive a round trip.
//! Formats registered at runtime implement `Codec`, which works on
//! `serde_json::Value` to stay object-safe; the typed conversion to and from
//! that value happens once, in `Binding`.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::CodecError;

/// Encodes and decodes one wire format through the serde data model.
pub trait Codec: fmt::Debug + Send + Sync {
    fn encode(&self, value: &Value) -> Result<Vec<u8>, CodecError>;

    fn decode(&self, bytes: &[u8]) -> Result<Value, CodecError>;
}

/// JSON as a `Codec`, for registering under extra format names or wrapping.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode(&self, value: &Value) -> Result<Vec<u8>, CodecError> {
        Ok(serde_json::to_vec(value)?)
    }

    fn decode(&self, bytes: &[u8]) -> Result<Value, CodecError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// How a media type turns values into bytes and back.
#[derive(Debug, Clone)]
pub(crate) enum Binding {
    Json,
    /// Flat structs and maps; sequences become repeated keys.
    Form,
    /// One scalar per body.
    Text,
    Custom(Arc<dyn Codec>),
}

impl Binding {
    pub(crate) fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>, CodecError> {
        match self {
            Binding::Json => Ok(serde_json::to_vec(value)?),
            Binding::Form => serde_html_form::to_string(value)
                .map(String::into_bytes)
                .map_err(|e| CodecError::Unrepresentable(e.to_string())),
            Binding::Text => encode_text(&serde_json::to_value(value)?),
            Binding::Custom(codec) => codec.encode(&serde_json::to_value(value)?),
        }
    }

    pub(crate) fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, CodecError> {
        match self {
            Binding::Json => Ok(serde_json::from_slice(bytes)?),
            Binding::Form => serde_html_form::from_bytes(bytes)
                .map_err(|e| CodecError::Malformed(e.to_string())),
            Binding::Text => decode_text(bytes),
            Binding::Custom(codec) => Ok(serde_json::from_value(codec.decode(bytes)?)?),
        }
    }
}

fn encode_text(value: &Value) -> Result<Vec<u8>, CodecError> {
    match value {
        Value::String(s) => Ok(s.clone().into_bytes()),
        Value::Bool(_) | Value::Number(_) => Ok(value.to_string().into_bytes()),
        Value::Null => Ok(Vec::new()),
        Value::Array(_) | Value::Object(_) => Err(CodecError::Unrepresentable(
            "text bodies must be scalars".to_string(),
        )),
    }
}

/// The body as a string first; numbers and booleans parse when the target
/// is not a string.
fn decode_text<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| CodecError::Malformed(format!("text body is not UTF-8: {e}")))?;
    match serde_json::from_value(Value::String(text.to_string())) {
        Ok(value) => Ok(value),
        Err(err) => match serde_json::from_str::<Value>(text.trim()) {
            Ok(scalar @ (Value::Number(_) | Value::Bool(_))) => {
                Ok(serde_json::from_value(scalar)?)
            }
            _ => Err(err.into()),
        },
    }
}
