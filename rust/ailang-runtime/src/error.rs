use ailang_core::Span;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum RuntimeError {
    #[error("{span}: read of an uninitialized letrec binding")]
    UninitializedLetRec { span: Span },
    #[error("{span}: letrec binding observed while still being evaluated (immediate self-reference of a non-function value)")]
    VisitingLetRec { span: Span },
    #[error("{span}: recursion depth exceeded {max} (consider an accumulator or check for a missing base case)")]
    RecursionLimit { span: Span, max: usize },
    #[error("{span}: division by zero")]
    DivisionByZero { span: Span },
    #[error("{span}: match is not exhaustive")]
    NonExhaustiveMatch { span: Span },
    #[error("{span}: guard expression did not evaluate to a Bool")]
    GuardNotBool { span: Span },
    #[error("{span}: record has no field '{field}'")]
    MissingField { span: Span, field: String },
    #[error("{span}: '{builtin}' does not accept these argument types{hint}", hint = hint_suffix(.hint))]
    TypeMismatchBuiltin {
        span: Span,
        builtin: String,
        hint: Option<String>,
    },
    #[error("{span}: '{builtin}' expects {expected} argument(s), got {found}")]
    ArityMismatchBuiltin {
        span: Span,
        builtin: String,
        expected: usize,
        found: usize,
    },
    #[error("{span}: unknown builtin '{name}'")]
    UnknownBuiltin { span: Span, name: String },
    #[error("{span}: effect capability '{label}' is not granted in the current context")]
    MissingCapability { span: Span, label: String },
    #[error("{span}: unresolved global '{module}/{name}'")]
    UnresolvedGlobal {
        span: Span,
        module: String,
        name: String,
    },
    #[error("{span}: attempted to call a non-function value")]
    NotCallable { span: Span },
    #[error("{span}: dictionary is missing method '{method}' for class '{class}'")]
    MissingDictMethod {
        span: Span,
        class: String,
        method: String,
    },
    #[error("{span}: internal error: {message}")]
    Internal { span: Span, message: String },
}

fn hint_suffix(hint: &Option<String>) -> String {
    match hint {
        Some(h) => format!(" ({h})"),
        None => String::new(),
    }
}

impl RuntimeError {
    pub fn code(&self) -> &'static str {
        match self {
            RuntimeError::UninitializedLetRec { .. } => "RT_REC_001",
            RuntimeError::VisitingLetRec { .. } => "RT_REC_001",
            RuntimeError::RecursionLimit { .. } => "RT_REC_003",
            RuntimeError::DivisionByZero { .. } => "RT_DIV0",
            RuntimeError::NonExhaustiveMatch { .. } => "MATCH_NONEXHAUSTIVE",
            RuntimeError::GuardNotBool { .. } => "GUARD_NOT_BOOL",
            RuntimeError::MissingField { .. } => "REC_MISSING_FIELD",
            RuntimeError::TypeMismatchBuiltin { .. } => "TYPE_MISMATCH_BUILTIN",
            RuntimeError::ArityMismatchBuiltin { .. } => "RT_ARITY",
            RuntimeError::UnknownBuiltin { .. } => "RT_UNKNOWN_BUILTIN",
            RuntimeError::MissingCapability { .. } => "EFF_CAP_MISSING",
            RuntimeError::UnresolvedGlobal { .. } => "MOD_UNRESOLVED_GLOBAL",
            RuntimeError::NotCallable { .. } => "RT_NOT_CALLABLE",
            RuntimeError::MissingDictMethod { .. } => "RT999",
            RuntimeError::Internal { .. } => "RT999",
        }
    }

    pub fn span(&self) -> Span {
        match self {
            RuntimeError::UninitializedLetRec { span }
            | RuntimeError::VisitingLetRec { span }
            | RuntimeError::RecursionLimit { span, .. }
            | RuntimeError::DivisionByZero { span }
            | RuntimeError::NonExhaustiveMatch { span }
            | RuntimeError::GuardNotBool { span }
            | RuntimeError::MissingField { span, .. }
            | RuntimeError::TypeMismatchBuiltin { span, .. }
            | RuntimeError::ArityMismatchBuiltin { span, .. }
            | RuntimeError::UnknownBuiltin { span, .. }
            | RuntimeError::MissingCapability { span, .. }
            | RuntimeError::UnresolvedGlobal { span, .. }
            | RuntimeError::NotCallable { span }
            | RuntimeError::MissingDictMethod { span, .. }
            | RuntimeError::Internal { span, .. } => *span,
        }
    }

    pub fn internal(span: Span, message: impl Into<String>) -> RuntimeError {
        RuntimeError::Internal {
            span,
            message: message.into(),
        }
    }
}
