use ailang_core::Span;
use thiserror::Error;

/// Errors raised while lowering the surface AST to Core IR. Unlike lexing and
/// parsing, elaboration stops at the first error: later passes assume a
/// structurally well-formed Core tree.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ElaborateError {
    #[error("{span}: duplicate field '{field}' in record")]
    DuplicateRecordField { span: Span, field: String },
    #[error("{span}: duplicate parameter '{name}' in function or lambda")]
    DuplicateParam { span: Span, name: String },
    #[error("{span}: duplicate binding '{name}' in letrec")]
    DuplicateLetRecBinding { span: Span, name: String },
    #[error("{span}: duplicate constructor '{ctor}' for type '{type_name}'")]
    DuplicateConstructor {
        span: Span,
        type_name: String,
        ctor: String,
    },
    #[error("internal elaborator error: {message}")]
    InternalPanic { message: String },
}

impl ElaborateError {
    pub fn code(&self) -> &'static str {
        match self {
            ElaborateError::DuplicateRecordField { .. } => "REC_DUP_FIELD",
            ElaborateError::DuplicateParam { .. } => "PAR_DUP_PARAM",
            ElaborateError::DuplicateLetRecBinding { .. } => "REC_DUP_LETREC_BINDING",
            ElaborateError::DuplicateConstructor { .. } => "MOD_DUP_CTOR",
            ElaborateError::InternalPanic { .. } => "IR999",
        }
    }

    pub fn span(&self) -> Span {
        match self {
            ElaborateError::DuplicateRecordField { span, .. }
            | ElaborateError::DuplicateParam { span, .. }
            | ElaborateError::DuplicateLetRecBinding { span, .. }
            | ElaborateError::DuplicateConstructor { span, .. } => *span,
            ElaborateError::InternalPanic { .. } => Span::dummy(),
        }
    }
}
