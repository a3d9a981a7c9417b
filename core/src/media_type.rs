//! Media types and the codec registry.
//!
//! # Design
//! A `MediaType` is a parsed `Content-Type` value bound to the codec that
//! handles it. `mime` does the tokenizing; on top of it the subtype is split
//! into vendor, version and structured-syntax suffix, so
//! `application/vnd.github.v3+json` and `application/json` both resolve to
//! the `json` format. `Codecs` maps format names to codecs; it is owned by
//! the `Client`, so two clients can negotiate differently without sharing
//! mutable state.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use http::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use mime::Mime;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::codec::{Binding, Codec};
use crate::error::{CodecError, Error, Result};

/// A parsed media type together with the codec for its format.
///
/// Equality compares the MIME identity (type, subtype and parameters) and
/// not the bound codec. Names are case-insensitive, and so is the value of
/// `charset`.
#[derive(Clone)]
pub struct MediaType {
    raw: String,
    mime: Mime,
    sub_type: String,
    vendor: Option<String>,
    version: Option<String>,
    suffix: Option<String>,
    params: Vec<(String, String)>,
    format: String,
    binding: Binding,
}

impl MediaType {
    /// `application/json` bound to the built-in JSON codec.
    pub fn json() -> Self {
        MediaType {
            raw: mime::APPLICATION_JSON.to_string(),
            mime: mime::APPLICATION_JSON,
            sub_type: "json".to_string(),
            vendor: None,
            version: None,
            suffix: None,
            params: Vec::new(),
            format: "json".to_string(),
            binding: Binding::Json,
        }
    }

    /// Text used verbatim as an outbound `Content-Type` value.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn mime(&self) -> &Mime {
        &self.mime
    }

    /// Top-level type, lowercased (`application`).
    pub fn main_type(&self) -> &str {
        self.mime.type_().as_str()
    }

    /// Full subtype, lowercased (`vnd.github.v3+json`).
    pub fn sub_type(&self) -> &str {
        &self.sub_type
    }

    /// Vendor of a `vnd.` subtype (`github`).
    pub fn vendor(&self) -> Option<&str> {
        self.vendor.as_deref()
    }

    /// Version segment of a `vnd.` subtype (`v3`).
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Structured-syntax suffix (`json` in `+json`).
    pub fn suffix(&self) -> Option<&str> {
        self.suffix.as_deref()
    }

    /// Format name the codec was chosen by: the suffix when present,
    /// otherwise the subtype.
    pub fn format(&self) -> &str {
        &self.format
    }

    /// Value of a parameter such as `charset`. Names are case-insensitive.
    pub fn param(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.params
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Serializes `value` with this media type's codec.
    pub fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Bytes> {
        let bytes = self
            .binding
            .encode(value)
            .map_err(|source| Error::Encode {
                media_type: self.raw.clone(),
                source,
            })?;
        Ok(Bytes::from(bytes))
    }

    /// Parses `bytes` with this media type's codec into a `T`.
    pub fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        self.binding
            .decode(bytes)
            .map_err(|source: CodecError| Error::Decode {
                media_type: self.raw.clone(),
                source,
            })
    }

    pub(crate) fn header_value(&self) -> Result<HeaderValue> {
        HeaderValue::from_str(&self.raw)
            .map_err(|_| Error::media_type(&self.raw, "not a valid header value"))
    }

    fn sorted_params(&self) -> Vec<&(String, String)> {
        let mut params: Vec<_> = self.params.iter().collect();
        params.sort();
        params
    }
}

impl PartialEq for MediaType {
    fn eq(&self, other: &Self) -> bool {
        self.main_type() == other.main_type()
            && self.sub_type == other.sub_type
            && self.sorted_params() == other.sorted_params()
    }
}

impl Eq for MediaType {}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl fmt::Debug for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaType")
            .field("raw", &self.raw)
            .field("format", &self.format)
            .field("codec", &self.binding)
            .finish()
    }
}

/// Format-keyed codec registry.
///
/// `Codecs::default()` knows `json`, `x-www-form-urlencoded` and `plain`.
#[derive(Debug, Clone)]
pub struct Codecs {
    by_format: HashMap<String, Binding>,
}

impl Default for Codecs {
    fn default() -> Self {
        let mut codecs = Self::empty();
        codecs.bind("json", Binding::Json);
        codecs.bind("x-www-form-urlencoded", Binding::Form);
        codecs.bind("plain", Binding::Text);
        codecs
    }
}

impl Codecs {
    /// A registry with no codecs at all.
    pub fn empty() -> Self {
        Self {
            by_format: HashMap::new(),
        }
    }

    /// Registers `codec` for `format`, replacing any previous one.
    pub fn with(mut self, format: &str, codec: impl Codec + 'static) -> Self {
        self.register(format, Arc::new(codec));
        self
    }

    pub fn register(&mut self, format: &str, codec: Arc<dyn Codec>) {
        self.bind(format, Binding::Custom(codec));
    }

    pub fn contains(&self, format: &str) -> bool {
        self.by_format.contains_key(&format.to_ascii_lowercase())
    }

    fn bind(&mut self, format: &str, binding: Binding) {
        self.by_format.insert(format.to_ascii_lowercase(), binding);
    }

    /// Parses `raw` and binds it to the codec for its format.
    ///
    /// Fails with `Error::MediaType` when `raw` is malformed and with
    /// `Error::UnsupportedMediaType` when no codec handles its format.
    pub fn resolve(&self, raw: &str) -> Result<MediaType> {
        let parts = split(raw)?;
        let binding = self
            .by_format
            .get(&parts.format)
            .cloned()
            .ok_or_else(|| Error::UnsupportedMediaType(raw.trim().to_string()))?;
        Ok(parts.bind(binding))
    }

    /// Resolves the `Content-Type` of a reply.
    ///
    /// An absent or blank header yields `Ok(None)`: there is nothing to decode.
    pub fn from_headers(&self, headers: &HeaderMap) -> Result<Option<MediaType>> {
        let Some(value) = headers.get(CONTENT_TYPE) else {
            return Ok(None);
        };
        let raw = value
            .to_str()
            .map_err(|_| Error::media_type("<non-ascii>", "header is not visible ASCII"))?;
        if raw.trim().is_empty() {
            return Ok(None);
        }
        self.resolve(raw).map(Some)
    }
}

struct Parts {
    raw: String,
    mime: Mime,
    sub_type: String,
    vendor: Option<String>,
    version: Option<String>,
    suffix: Option<String>,
    params: Vec<(String, String)>,
    format: String,
}

impl Parts {
    fn bind(self, binding: Binding) -> MediaType {
        MediaType {
            raw: self.raw,
            mime: self.mime,
            sub_type: self.sub_type,
            vendor: self.vendor,
            version: self.version,
            suffix: self.suffix,
            params: self.params,
            format: self.format,
            binding,
        }
    }
}

fn split(raw: &str) -> Result<Parts> {
    let trimmed = raw.trim();
    let mime: Mime = trimmed
        .parse()
        .map_err(|e: mime::FromStrError| Error::media_type(raw, e.to_string()))?;

    let (main_type, sub_type) = mime
        .essence_str()
        .split_once('/')
        .ok_or_else(|| Error::media_type(raw, "missing '/' between type and subtype"))?;
    if main_type.is_empty() || sub_type.is_empty() {
        return Err(Error::media_type(raw, "empty type or subtype"));
    }
    let sub_type = sub_type.to_ascii_lowercase();

    let (base, suffix) = match sub_type.rsplit_once('+') {
        Some((base, suffix)) if !base.is_empty() && !suffix.is_empty() => {
            (base.to_string(), Some(suffix.to_string()))
        }
        Some(_) => return Err(Error::media_type(raw, "empty structured-syntax suffix")),
        None => (sub_type.clone(), None),
    };

    let (vendor, version) = match base.strip_prefix("vnd.") {
        Some(tree) => match tree.split_once('.') {
            Some((vendor, version)) => (Some(vendor.to_string()), Some(version.to_string())),
            None => (Some(tree.to_string()), None),
        },
        None => (None, None),
    };

    let params = mime
        .params()
        .map(|(name, value)| {
            let name = name.as_str().to_ascii_lowercase();
            let mut value = unquote(value.as_str());
            if name == "charset" {
                value.make_ascii_lowercase();
            }
            (name, value)
        })
        .collect();

    Ok(Parts {
        raw: trimmed.to_string(),
        format: suffix.clone().unwrap_or(base),
        mime,
        sub_type,
        vendor,
        version,
        suffix,
        params,
    })
}

/// Strips the quotes of a quoted-string parameter and resolves `\` escapes.
fn unquote(value: &str) -> String {
    let Some(inner) = value.strip_prefix('"').and_then(|rest| rest.strip_suffix('"')) else {
        return value.to_string();
    };
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.extend(chars.next()),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::Value;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct User {
        login: String,
        id: u64,
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Signup {
        login: String,
        age: u32,
        admin: bool,
        #[serde(default)]
        teams: Vec<String>,
    }

    #[derive(Debug)]
    struct RefusingCodec;

    impl Codec for RefusingCodec {
        fn encode(&self, _: &Value) -> std::result::Result<Vec<u8>, CodecError> {
            Err(CodecError::Unrepresentable("refused".to_string()))
        }

        fn decode(&self, _: &[u8]) -> std::result::Result<Value, CodecError> {
            Err(CodecError::Malformed("refused".to_string()))
        }
    }

    #[test]
    fn parses_vendor_version_and_suffix() {
        let mt = Codecs::default()
            .resolve("application/vnd.github.v3+json; charset=utf-8")
            .unwrap();
        assert_eq!(mt.main_type(), "application");
        assert_eq!(mt.sub_type(), "vnd.github.v3+json");
        assert_eq!(mt.vendor(), Some("github"));
        assert_eq!(mt.version(), Some("v3"));
        assert_eq!(mt.suffix(), Some("json"));
        assert_eq!(mt.format(), "json");
        assert_eq!(mt.param("Charset"), Some("utf-8"));
        assert_eq!(mt.to_string(), "application/vnd.github.v3+json; charset=utf-8");
        assert_eq!(mt.mime().type_(), mime::APPLICATION);
    }

    #[test]
    fn plain_subtype_is_the_format() {
        let mt = Codecs::default().resolve("text/plain").unwrap();
        assert_eq!(mt.format(), "plain");
        assert_eq!(mt.vendor(), None);
        assert_eq!(mt.suffix(), None);
    }

    #[test]
    fn quoted_parameters_lose_their_quotes() {
        let mt = Codecs::default()
            .resolve(r#"application/json; profile="https://example.com/user"; charset="UTF-8""#)
            .unwrap();
        assert_eq!(mt.param("profile"), Some("https://example.com/user"));
        assert_eq!(mt.param("charset"), Some("utf-8"));
    }

    #[test]
    fn malformed_values_are_rejected() {
        let codecs = Codecs::default();
        for raw in [
            "json",
            "application/",
            "/json",
            "application/json; charset",
            "application/json; charset=\"utf-8",
            "application/+json",
            "text plain/x",
        ] {
            let err = codecs.resolve(raw).unwrap_err();
            assert!(matches!(err, Error::MediaType { .. }), "{raw}: {err}");
        }
    }

    #[test]
    fn unknown_format_is_unsupported() {
        let err = Codecs::default().resolve("text/html").unwrap_err();
        assert!(matches!(err, Error::UnsupportedMediaType(ref raw) if raw == "text/html"));
    }

    #[test]
    fn equality_ignores_case_and_parameter_order() {
        let codecs = Codecs::default();
        let a = codecs.resolve("Application/JSON; a=1; b=2").unwrap();
        let b = codecs.resolve("application/json;b=2;a=1").unwrap();
        let c = codecs.resolve("application/json").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(c, MediaType::json());
    }

    #[test]
    fn charset_value_compares_case_insensitively() {
        let codecs = Codecs::default();
        let upper = codecs.resolve("application/json; charset=UTF-8").unwrap();
        let lower = codecs.resolve("application/json; charset=utf-8").unwrap();
        assert_eq!(upper, lower);

        // Other parameter values keep their case.
        let a = codecs.resolve("application/json; profile=A").unwrap();
        let b = codecs.resolve("application/json; profile=a").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn missing_or_blank_header_resolves_to_none() {
        let codecs = Codecs::default();
        let mut headers = HeaderMap::new();
        assert!(codecs.from_headers(&headers).unwrap().is_none());

        headers.insert(CONTENT_TYPE, HeaderValue::from_static(""));
        assert!(codecs.from_headers(&headers).unwrap().is_none());

        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let mt = codecs.from_headers(&headers).unwrap().unwrap();
        assert_eq!(mt.format(), "json");
    }

    #[test]
    fn typed_round_trip_through_json() {
        let user = User {
            login: "octocat".to_string(),
            id: 1,
        };
        let mt = MediaType::json();
        let bytes = mt.encode(&user).unwrap();
        let back: User = mt.decode(&bytes).unwrap();
        assert_eq!(back, user);
    }

    #[test]
    fn typed_round_trip_through_every_default_codec() {
        let codecs = Codecs::default();
        let signup = Signup {
            login: "hubot".to_string(),
            age: 12,
            admin: false,
            teams: vec!["core".to_string()],
        };
        for raw in [
            "application/json",
            "application/vnd.parley.v1+json",
            "application/x-www-form-urlencoded",
        ] {
            let mt = codecs.resolve(raw).unwrap();
            let bytes = mt.encode(&signup).unwrap();
            let back: Signup = mt.decode(&bytes).unwrap_or_else(|e| panic!("{raw}: {e}"));
            assert_eq!(back, signup, "{raw}");
        }

        let text = codecs.resolve("text/plain; charset=utf-8").unwrap();
        let bytes = text.encode(&42u64).unwrap();
        assert_eq!(text.decode::<u64>(&bytes).unwrap(), 42);
        let bytes = text.encode(&false).unwrap();
        assert!(!text.decode::<bool>(&bytes).unwrap());
        let bytes = text.encode("plain hello").unwrap();
        assert_eq!(text.decode::<String>(&bytes).unwrap(), "plain hello");
    }

    #[test]
    fn form_decodes_typed_fields() {
        let mt = Codecs::default()
            .resolve("application/x-www-form-urlencoded")
            .unwrap();
        let signup: Signup = mt
            .decode(b"login=mona&age=7&admin=true&teams=a&teams=b")
            .unwrap();
        assert_eq!(signup.age, 7);
        assert!(signup.admin);
        assert_eq!(signup.teams, ["a", "b"]);
    }

    #[test]
    fn codec_failures_carry_the_media_type() {
        let codecs = Codecs::empty().with("json", RefusingCodec);
        let mt = codecs.resolve("application/json").unwrap();

        match mt.encode(&1).unwrap_err() {
            Error::Encode { media_type, .. } => assert_eq!(media_type, "application/json"),
            other => panic!("expected encode error, got {other:?}"),
        }

        let err = mt.decode::<User>(b"{}").unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
    }

    #[test]
    fn decode_shape_mismatch_is_a_decode_error() {
        let err = MediaType::json().decode::<User>(br#"{"login":1}"#).unwrap_err();
        assert!(matches!(err, Error::Decode { source: CodecError::Json(_), .. }));
    }

    #[test]
    fn registering_replaces_by_format() {
        let mut codecs = Codecs::default();
        assert!(codecs.contains("json"));
        codecs.register("JSON", Arc::new(RefusingCodec));
        let mt = codecs.resolve("application/json").unwrap();
        assert!(mt.encode(&1).is_err());
        assert!(!Codecs::empty().contains("json"));
    }
}
