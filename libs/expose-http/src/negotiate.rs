//! Representation selection from HTTP method and headers.
//!
//! Read requests are matched on what the client says it accepts; write
//! requests on the exact content type of the body they declare. Candidates
//! are tried in declaration order and the first acceptance wins, with an
//! optional fallback to the first resolvable candidate when nothing
//! matches a read request.

use std::fmt;
use std::sync::Arc;

use http::{header, request::Parts, Method};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::representation::{Representation, RepresentationRegistry};

/// One way of detecting the content a read request asks for.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentDetector {
    /// Match the named header's media ranges against the representation's
    /// accepted types. `Accept` in the default configuration.
    Header(String),
    /// Match a query parameter (e.g. `?format=json`) against the
    /// representation's name.
    QueryParam(String),
    /// Match a path extension (e.g. `/books.json`) against the
    /// representation's name.
    Extension,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NegotiationConfig {
    pub detectors: Vec<ContentDetector>,
    /// Fail read requests with [`NegotiateError::NoMatch`] instead of
    /// falling back to the first resolvable candidate. Maps naturally to
    /// a 415 response.
    pub strict_no_match_on_read: bool,
}

impl Default for NegotiationConfig {
    fn default() -> Self {
        Self {
            detectors: vec![ContentDetector::Header("accept".to_string())],
            strict_no_match_on_read: false,
        }
    }
}

/// An entry of a route's ordered representation list: either a name to
/// resolve through the registry or a pre-built instance.
#[derive(Clone)]
pub enum RepresentationCandidate {
    Named(String),
    Instance(Arc<dyn Representation>),
}

impl RepresentationCandidate {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }
}

impl From<&str> for RepresentationCandidate {
    fn from(name: &str) -> Self {
        Self::Named(name.to_string())
    }
}

impl fmt::Debug for RepresentationCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => f.debug_tuple("Named").field(name).finish(),
            Self::Instance(rep) => f.debug_tuple("Instance").field(&rep.name()).finish(),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NegotiateError {
    /// The route declares no representations at all. A configuration bug.
    #[error("no representations configured for this route")]
    NoRepresentations,

    /// A named candidate has no registry entry. A configuration bug, never
    /// skipped over.
    #[error("unknown representation: {0}")]
    UnknownRepresentation(String),

    /// No candidate matched the request and fallback was not allowed.
    #[error("no representation matched the request")]
    NoMatch,
}

/// Selects one representation per request. Stateless across calls.
#[derive(Clone)]
pub struct Negotiator {
    registry: RepresentationRegistry,
    config: NegotiationConfig,
}

impl Default for Negotiator {
    fn default() -> Self {
        Self::new(RepresentationRegistry::new(), NegotiationConfig::default())
    }
}

impl Negotiator {
    pub fn new(registry: RepresentationRegistry, config: NegotiationConfig) -> Self {
        Self { registry, config }
    }

    pub fn config(&self) -> &NegotiationConfig {
        &self.config
    }

    /// Pick the representation for this request from `candidates`, in
    /// declaration order.
    pub fn negotiate(
        &self,
        candidates: &[RepresentationCandidate],
        parts: &Parts,
    ) -> Result<Arc<dyn Representation>, NegotiateError> {
        if candidates.is_empty() {
            return Err(NegotiateError::NoRepresentations);
        }

        let mut resolved: Vec<Arc<dyn Representation>> = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let rep = match candidate {
                RepresentationCandidate::Named(name) => self
                    .registry
                    .resolve(name)
                    .ok_or_else(|| NegotiateError::UnknownRepresentation(name.clone()))?,
                RepresentationCandidate::Instance(rep) => Arc::clone(rep),
            };
            if self.matches(rep.as_ref(), parts) {
                return Ok(rep);
            }
            resolved.push(rep);
        }

        if is_read(&parts.method) && self.config.strict_no_match_on_read {
            return Err(NegotiateError::NoMatch);
        }

        match resolved.into_iter().next() {
            Some(rep) => {
                debug!(
                    representation = rep.name(),
                    method = %parts.method,
                    "no direct representation match, falling back to first candidate"
                );
                Ok(rep)
            }
            None => Err(NegotiateError::NoMatch),
        }
    }

    fn matches(&self, rep: &dyn Representation, parts: &Parts) -> bool {
        let method = &parts.method;
        if is_read(method) {
            rep.is_expected_content(&self.config, parts)
        } else if is_write(method) {
            parts
                .headers
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .is_some_and(|ct| ct.trim() == rep.content_type())
        } else {
            false
        }
    }
}

fn is_read(method: &Method) -> bool {
    *method == Method::GET || *method == Method::HEAD
}

fn is_write(method: &Method) -> bool {
    *method == Method::POST || *method == Method::PUT || *method == Method::PATCH
}
