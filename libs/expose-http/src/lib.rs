//! HTTP surface for the expose engine: wire representations, content
//! negotiation, expose-string parsing, and RFC 9457 problem responses.
//!
//! The flow per request: the [`Expose`] extractor (or route configuration)
//! supplies a selection tree for `expose-core` to resolve; the
//! [`Negotiator`] picks one [`Representation`] from the route's ordered
//! candidates; the shaped envelope is rendered by that representation.

pub mod error;
pub mod extract;
pub mod negotiate;
pub mod problem;
pub mod representation;

pub use error::{
    expose_parse_error_to_problem, negotiate_error_to_problem, resolve_error_to_problem,
};
pub use extract::{parse_expose, Expose, ExposeParseError, MAX_EXPOSE_DEPTH, MAX_EXPOSE_LEN};
pub use negotiate::{
    ContentDetector, NegotiateError, NegotiationConfig, Negotiator, RepresentationCandidate,
};
pub use problem::{
    bad_request, internal_error, not_found, unsupported_media_type, Problem, ProblemResponse,
};
pub use representation::{
    JsonRepresentation, RenderError, Representation, RepresentationRegistry, XmlRepresentation,
};
