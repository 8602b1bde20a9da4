//! Request-supplied expose strings.
//!
//! Parsing belongs to the HTTP layer; `expose-core` only consumes the
//! resulting `SelectionTree`. The format is `field|assoc[sub|sub2[leaf]]`:
//! pipe-separated names, square brackets opening a nested selection.

use std::iter::Peekable;
use std::str::CharIndices;

use axum::extract::{FromRequestParts, Query};
use axum::http::request::Parts;
use expose_core::SelectionTree;
use serde::Deserialize;
use thiserror::Error;

pub const MAX_EXPOSE_LEN: usize = 1024;
pub const MAX_EXPOSE_DEPTH: usize = 8;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExposeParseError {
    #[error("expose string too long")]
    TooLong,

    #[error("expose nesting too deep")]
    TooDeep,

    #[error("unexpected character {found:?} at offset {offset}")]
    Unexpected { found: char, offset: usize },

    #[error("unbalanced brackets in expose string")]
    Unbalanced,

    #[error("empty field name at offset {0}")]
    EmptyName(usize),
}

/// Parse an expose string into a selection tree.
///
/// Whitespace around the whole string is ignored; an empty string is an
/// empty selection. Budgets bound input length and nesting depth before
/// any recursion happens.
pub fn parse_expose(raw: &str) -> Result<SelectionTree, ExposeParseError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(SelectionTree::new());
    }
    if raw.len() > MAX_EXPOSE_LEN {
        return Err(ExposeParseError::TooLong);
    }

    let mut input = raw.char_indices().peekable();
    let tree = parse_list(&mut input, raw.len(), 0)?;
    match input.peek() {
        // a closing bracket nothing opened
        Some(_) => Err(ExposeParseError::Unbalanced),
        None => Ok(tree),
    }
}

fn parse_list(
    input: &mut Peekable<CharIndices<'_>>,
    end: usize,
    depth: usize,
) -> Result<SelectionTree, ExposeParseError> {
    if depth > MAX_EXPOSE_DEPTH {
        return Err(ExposeParseError::TooDeep);
    }

    let mut tree = SelectionTree::new();
    loop {
        let mut name = String::new();
        while let Some(&(_, c)) = input.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                name.push(c);
                input.next();
            } else {
                break;
            }
        }
        if name.is_empty() {
            let offset = input.peek().map_or(end, |&(i, _)| i);
            return Err(ExposeParseError::EmptyName(offset));
        }

        match input.peek() {
            Some(&(_, '[')) => {
                input.next();
                let sub = parse_list(input, end, depth + 1)?;
                match input.next() {
                    Some((_, ']')) => tree.insert_tree(name, sub),
                    _ => return Err(ExposeParseError::Unbalanced),
                }
            }
            _ => tree.insert_field(name),
        }

        match input.peek() {
            Some(&(_, '|')) => {
                input.next();
            }
            Some(&(_, ']')) | None => return Ok(tree),
            Some(&(offset, found)) => {
                return Err(ExposeParseError::Unexpected { found, offset })
            }
        }
    }
}

#[derive(Deserialize, Default)]
struct ExposeParams {
    expose: Option<String>,
}

/// Axum extractor for the `expose` query parameter.
///
/// Usage in handlers:
///   `async fn list_books(Expose(selection): Expose, /* ... */) { ... }`
///
/// An absent parameter yields an empty selection; a malformed one rejects
/// with an RFC 9457 problem.
#[derive(Clone, Debug, Default)]
pub struct Expose(pub SelectionTree);

impl Expose {
    #[inline]
    pub fn into_inner(self) -> SelectionTree {
        self.0
    }
}

impl std::ops::Deref for Expose {
    type Target = SelectionTree;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S> FromRequestParts<S> for Expose
where
    S: Send + Sync,
{
    type Rejection = crate::problem::ProblemResponse;

    #[allow(clippy::manual_async_fn)]
    fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> impl core::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        async move {
            let Query(params) = Query::<ExposeParams>::from_request_parts(parts, state)
                .await
                .unwrap_or_else(|_| Query(ExposeParams::default()));

            match params.expose.as_deref() {
                None => Ok(Expose(SelectionTree::new())),
                Some(raw) => parse_expose(raw)
                    .map(Expose)
                    .map_err(|e| crate::error::expose_parse_error_to_problem(&e, parts.uri.path())),
            }
        }
    }
}
