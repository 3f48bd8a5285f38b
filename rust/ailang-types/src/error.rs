use ailang_core::Span;
use thiserror::Error;

use crate::types::Type;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum TypeError {
    #[error("{span}: type mismatch: expected {expected:?}, found {found:?}")]
    Mismatch {
        span: Span,
        expected: Type,
        found: Type,
    },
    #[error("{span}: infinite type involving {ty:?}")]
    InfiniteType { span: Span, ty: Type },
    #[error("{span}: arity mismatch: expected {expected} arguments, found {found}")]
    ArityMismatch {
        span: Span,
        expected: usize,
        found: usize,
    },
    #[error("{span}: record is missing or has mismatched fields: {missing:?}")]
    RecordFieldMismatch { span: Span, missing: Vec<String> },
    #[error("{span}: unbound variable '{name}'")]
    UnboundVariable { span: Span, name: String },
    #[error("{span}: unknown constructor '{name}'")]
    UnknownConstructor { span: Span, name: String },
    #[error("{span}: '{op}' requires a String or List operand, found {found:?}")]
    NotAppendable {
        span: Span,
        op: String,
        found: Type,
    },
    #[error("{span}: match is not exhaustive")]
    NonExhaustiveMatch { span: Span },
}

impl TypeError {
    pub fn code(&self) -> &'static str {
        match self {
            TypeError::Mismatch { .. } => "TC_MISMATCH",
            TypeError::InfiniteType { .. } => "TC_INFINITE_TYPE",
            TypeError::ArityMismatch { .. } => "TC_ARITY",
            TypeError::RecordFieldMismatch { .. } => "TC_RECORD_FIELDS",
            TypeError::UnboundVariable { .. } => "TC_UNBOUND_VAR",
            TypeError::UnknownConstructor { .. } => "TC_UNKNOWN_CTOR",
            TypeError::NotAppendable { .. } => "TC_APPEND_TYPE",
            TypeError::NonExhaustiveMatch { .. } => "TC_NON_EXHAUSTIVE",
        }
    }

    pub fn span(&self) -> Span {
        match self {
            TypeError::Mismatch { span, .. }
            | TypeError::InfiniteType { span, .. }
            | TypeError::ArityMismatch { span, .. }
            | TypeError::RecordFieldMismatch { span, .. }
            | TypeError::UnboundVariable { span, .. }
            | TypeError::UnknownConstructor { span, .. }
            | TypeError::NotAppendable { span, .. }
            | TypeError::NonExhaustiveMatch { span } => *span,
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ClassError {
    #[error("{span}: no instance of class '{class}' for type {ty:?}")]
    NoInstance {
        span: Span,
        class: String,
        ty: Type,
    },
    #[error("{span}: cannot resolve class '{class}': type is still ambiguous")]
    Ambiguous { span: Span, class: String },
    #[error("{span}: instance of '{class}' for {ty:?} requires superclass '{superclass}'")]
    SuperclassMissing {
        span: Span,
        class: String,
        superclass: String,
        ty: Type,
    },
}

impl ClassError {
    pub fn code(&self) -> &'static str {
        match self {
            ClassError::NoInstance { .. } => "CLS_NO_INSTANCE",
            ClassError::Ambiguous { .. } => "CLS_AMBIGUOUS",
            ClassError::SuperclassMissing { .. } => "CLS_SUPERCLASS_MISSING",
        }
    }

    pub fn span(&self) -> Span {
        match self {
            ClassError::NoInstance { span, .. }
            | ClassError::Ambiguous { span, .. }
            | ClassError::SuperclassMissing { span, .. } => *span,
        }
    }
}
