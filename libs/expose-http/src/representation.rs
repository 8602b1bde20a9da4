//! Wire representations and the registry that instantiates them.
//!
//! A representation is a serialization format the server can speak: it
//! declares the content type it produces, the media types it is willing to
//! answer for, and how to write an [`Envelope`]. Representations are
//! resolved by name through a compile-time [`RepresentationRegistry`]
//! instead of being loaded dynamically per request.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;

use expose_core::Envelope;
use http::request::Parts;
use serde_json::Value;
use thiserror::Error;

use crate::negotiate::{ContentDetector, NegotiationConfig};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("xml write error: {0}")]
    Xml(String),
}

/// A serialization format selectable via content negotiation.
pub trait Representation: Send + Sync {
    /// Short name used for registry lookup, `?format=` values and path
    /// extensions.
    fn name(&self) -> &'static str;

    /// The content type stamped on responses this representation writes.
    fn content_type(&self) -> &'static str;

    /// Media types this representation is willing to serve on read
    /// requests.
    fn accepted_media_types(&self) -> &'static [&'static str];

    /// Serialize an envelope to the wire.
    fn render(&self, envelope: &Envelope) -> Result<String, RenderError>;

    /// Does the request ask for content this representation can produce?
    /// Driven by the configured detectors; any one of them matching is
    /// enough.
    fn is_expected_content(&self, config: &NegotiationConfig, parts: &Parts) -> bool {
        config.detectors.iter().any(|detector| match detector {
            ContentDetector::Header(name) => {
                header_accepts(parts, name, self.accepted_media_types())
            }
            ContentDetector::QueryParam(name) => query_param(parts, name)
                .is_some_and(|value| value.eq_ignore_ascii_case(self.name())),
            ContentDetector::Extension => {
                path_extension(parts).is_some_and(|ext| ext.eq_ignore_ascii_case(self.name()))
            }
        })
    }
}

/* ---------- request inspection helpers ---------- */

/// True if any media range in `header` (parameters ignored) is one of
/// `accepted`.
fn header_accepts(parts: &Parts, header: &str, accepted: &[&str]) -> bool {
    let Some(value) = parts.headers.get(header).and_then(|v| v.to_str().ok()) else {
        return false;
    };
    value
        .split(',')
        .map(|range| range.split(';').next().unwrap_or("").trim())
        .any(|range| accepted.iter().any(|t| t.eq_ignore_ascii_case(range)))
}

fn query_param<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    let query = parts.uri.query()?;
    for pair in query.split('&') {
        let mut kv = pair.splitn(2, '=');
        if kv.next() == Some(name) {
            return kv.next();
        }
    }
    None
}

fn path_extension(parts: &Parts) -> Option<&str> {
    let path = parts.uri.path();
    let (_, ext) = path.rsplit_once('.')?;
    (!ext.is_empty() && !ext.contains('/')).then_some(ext)
}

/* ---------- built-in representations ---------- */

#[derive(Clone, Copy, Debug, Default)]
pub struct JsonRepresentation;

impl Representation for JsonRepresentation {
    fn name(&self) -> &'static str {
        "json"
    }

    fn content_type(&self) -> &'static str {
        "application/json"
    }

    fn accepted_media_types(&self) -> &'static [&'static str] {
        &[
            "application/json",
            "text/json",
            "application/javascript",
            "text/javascript",
        ]
    }

    fn render(&self, envelope: &Envelope) -> Result<String, RenderError> {
        Ok(serde_json::to_string(envelope)?)
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct XmlRepresentation;

impl Representation for XmlRepresentation {
    fn name(&self) -> &'static str {
        "xml"
    }

    fn content_type(&self) -> &'static str {
        "application/xml"
    }

    fn accepted_media_types(&self) -> &'static [&'static str] {
        &["application/xml", "text/xml"]
    }

    fn render(&self, envelope: &Envelope) -> Result<String, RenderError> {
        let mut xml = String::new();
        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        write_element(&mut xml, envelope.key(), envelope.data())
            .map_err(|e| RenderError::Xml(e.to_string()))?;
        Ok(xml)
    }
}

/// Write `value` as `<name>...</name>`. Objects nest by key, sequence
/// entries repeat under `<item>`, scalars become text, null an empty
/// element.
fn write_element(xml: &mut String, name: &str, value: &Value) -> std::fmt::Result {
    let tag = sanitize_tag(name);
    match value {
        Value::Null => write!(xml, "<{tag}/>"),
        Value::Bool(b) => write!(xml, "<{tag}>{b}</{tag}>"),
        Value::Number(n) => write!(xml, "<{tag}>{n}</{tag}>"),
        Value::String(s) => write!(xml, "<{tag}>{}</{tag}>", xml_escape(s)),
        Value::Array(items) => {
            write!(xml, "<{tag}>")?;
            for item in items {
                write_element(xml, "item", item)?;
            }
            write!(xml, "</{tag}>")
        }
        Value::Object(map) => {
            write!(xml, "<{tag}>")?;
            for (key, item) in map {
                write_element(xml, key, item)?;
            }
            write!(xml, "</{tag}>")
        }
    }
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// XML element names must start with a letter or underscore; anything
/// outside `[A-Za-z0-9_.-]` is replaced.
fn sanitize_tag(name: &str) -> String {
    let mut tag: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if !tag
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
    {
        tag.insert(0, '_');
    }
    tag
}

/* ---------- registry ---------- */

type RepresentationFactory = fn() -> Arc<dyn Representation>;

/// Maps representation names to factories, resolved at configuration load
/// time. Names are case-insensitive.
#[derive(Clone)]
pub struct RepresentationRegistry {
    factories: HashMap<String, RepresentationFactory>,
}

impl Default for RepresentationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RepresentationRegistry {
    /// A registry with the built-in `json` and `xml` representations.
    pub fn new() -> Self {
        Self::empty()
            .with("json", || Arc::new(JsonRepresentation))
            .with("xml", || Arc::new(XmlRepresentation))
    }

    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    pub fn with(mut self, name: impl Into<String>, factory: RepresentationFactory) -> Self {
        self.factories.insert(name.into().to_lowercase(), factory);
        self
    }

    pub fn resolve(&self, name: &str) -> Option<Arc<dyn Representation>> {
        self.factories.get(&name.to_lowercase()).map(|f| f())
    }
}
