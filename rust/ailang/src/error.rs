use thiserror::Error;

use ailang_ir::ElaborateError;
use ailang_runtime::RuntimeError;
use ailang_syntax::{LexError, ParseError};
use ailang_types::{ClassError, TypeError};

/// Aggregates every pipeline stage's error type behind one type, the same
/// shape the language's own dictionary/class-resolution pass uses to collect
/// more than one failure at once. A recovery-mode stage (lexing, parsing)
/// that surfaces several diagnostics for one input reports them as
/// `Multiple`, built by [`AilangError::from_many`].
#[derive(Debug, Error)]
pub enum AilangError {
    #[error("lex error: {0}")]
    Lex(#[from] LexError),
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("elaboration error: {0}")]
    Elaborate(#[from] ElaborateError),
    #[error("type error: {0}")]
    Type(#[from] TypeError),
    #[error("class resolution error: {0}")]
    Class(#[from] ClassError),
    #[error("runtime error: {0}")]
    Runtime(#[from] RuntimeError),
    #[error("multiple errors: {0:?}")]
    Multiple(Vec<AilangError>),
}

impl AilangError {
    /// The stable code for this error, or `"MULTIPLE"` for an aggregate —
    /// inspect `Multiple`'s inner list for the codes it actually carries.
    pub fn code(&self) -> &'static str {
        match self {
            AilangError::Lex(e) => e.code(),
            AilangError::Parse(e) => e.code(),
            AilangError::Elaborate(e) => e.code(),
            AilangError::Type(e) => e.code(),
            AilangError::Class(e) => e.code(),
            AilangError::Runtime(e) => e.code(),
            AilangError::Multiple(_) => "MULTIPLE",
        }
    }

    /// Build an `AilangError` from a list of errors collected over one
    /// pipeline run. Returns `None` if the list is empty, unwraps a
    /// single-element list, and flattens nested `Multiple`s so a caller never
    /// has to recurse to see every underlying diagnostic.
    pub fn from_many(errors: Vec<AilangError>) -> Option<AilangError> {
        let flattened: Vec<AilangError> = errors
            .into_iter()
            .flat_map(|e| match e {
                AilangError::Multiple(inner) => inner,
                other => vec![other],
            })
            .collect();
        match flattened.len() {
            0 => None,
            1 => Some(flattened.into_iter().next().unwrap()),
            _ => Some(AilangError::Multiple(flattened)),
        }
    }
}
