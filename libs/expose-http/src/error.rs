use axum::http::StatusCode;
use expose_core::ResolveError;

use crate::extract::ExposeParseError;
use crate::negotiate::NegotiateError;
use crate::problem::{Problem, ProblemResponse};

/// Map negotiation failures to RFC 9457 Problem responses.
///
/// Configuration bugs surface as 500s; a genuine miss is the client's 415.
pub fn negotiate_error_to_problem(e: &NegotiateError, instance: &str) -> ProblemResponse {
    match e {
        NegotiateError::NoRepresentations => Problem::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "No Representations Configured",
            "The route declares no wire representations",
        )
        .with_code("NO_REPRESENTATIONS")
        .with_instance(instance)
        .into(),

        NegotiateError::UnknownRepresentation(name) => Problem::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Unknown Representation",
            format!("no representation registered under the name: {name}"),
        )
        .with_code("UNKNOWN_REPRESENTATION")
        .with_instance(instance)
        .into(),

        NegotiateError::NoMatch => Problem::new(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "Unsupported Media Type",
            "No configured representation matches the request",
        )
        .with_code("NO_REPRESENTATION_MATCH")
        .with_instance(instance)
        .into(),
    }
}

/// Map resolution failures to RFC 9457 Problem responses.
///
/// Only strict mode produces a client-facing error; an unknown entity is
/// always a server-side schema bug.
pub fn resolve_error_to_problem(e: &ResolveError, instance: &str) -> ProblemResponse {
    match e {
        ResolveError::UnknownEntity(entity) => Problem::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Unknown Entity",
            format!("no schema definition for entity: {entity}"),
        )
        .with_code("UNKNOWN_ENTITY")
        .with_instance(instance)
        .into(),

        ResolveError::UnknownField { entity, field } => Problem::new(
            StatusCode::BAD_REQUEST,
            "Unknown Expose Field",
            format!("unknown field {field} on entity {entity}"),
        )
        .with_code("UNKNOWN_EXPOSE_FIELD")
        .with_instance(instance)
        .into(),
    }
}

/// Map expose-string parse failures to RFC 9457 Problem responses.
pub fn expose_parse_error_to_problem(e: &ExposeParseError, instance: &str) -> ProblemResponse {
    let code = match e {
        ExposeParseError::TooLong => "EXPOSE_TOO_LONG",
        ExposeParseError::TooDeep => "EXPOSE_TOO_DEEP",
        ExposeParseError::Unexpected { .. } => "EXPOSE_UNEXPECTED_CHAR",
        ExposeParseError::Unbalanced => "EXPOSE_UNBALANCED",
        ExposeParseError::EmptyName(_) => "EXPOSE_EMPTY_NAME",
    };
    Problem::new(StatusCode::BAD_REQUEST, "Invalid Expose String", e.to_string())
        .with_code(code)
        .with_instance(instance)
        .into()
}
