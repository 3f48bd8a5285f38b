//! `(code, one-line doc)` for every stable code the pipeline can emit, across
//! every stage crate. `ailang-syntax` keeps its own `all_codes()` for its two
//! error enums (lexing recovers and keeps producing tokens even past a lex
//! error, so its doc table lives next to the code that cares); the other
//! stages' codes are documented here since this crate is the one place that
//! sees every stage at once.

/// Every stable code this workspace can emit, paired with a one-line
/// explanation. Kept in sync with each stage's `code()` match arms by
/// [`tests::every_stage_error_code_has_a_doc_entry`].
pub fn all_codes() -> Vec<(&'static str, &'static str)> {
    let mut codes = ailang_syntax::all_codes();
    codes.extend([
        ("REC_DUP_FIELD", "A record literal named the same field more than once."),
        ("PAR_DUP_PARAM", "A function or lambda declared the same parameter name twice."),
        ("REC_DUP_LETREC_BINDING", "A `letrec` bound the same name more than once."),
        ("MOD_DUP_CTOR", "A type declaration named the same constructor more than once."),
        ("IR999", "The elaborator encountered an internal error (a bug); please file a report."),
        ("TC_MISMATCH", "Two types that were required to unify do not match."),
        ("TC_INFINITE_TYPE", "Unifying a type variable with a type that contains it (an occurs-check failure)."),
        ("TC_ARITY", "A function was applied to the wrong number of arguments."),
        ("TC_RECORD_FIELDS", "A record is missing a field, or has a field the surrounding context does not expect."),
        ("TC_UNBOUND_VAR", "A variable was referenced that is not in scope."),
        ("TC_UNKNOWN_CTOR", "A constructor was referenced that no type declares."),
        ("TC_APPEND_TYPE", "`+`/`++` was applied to a type that is neither a `String` nor a `List`."),
        ("TC_NON_EXHAUSTIVE", "A `match`'s patterns do not cover every value of the scrutinee's type."),
        ("CLS_NO_INSTANCE", "No instance of the required type class exists for the resolved type."),
        ("CLS_AMBIGUOUS", "A type class constraint could not be resolved because its type is still unknown."),
        ("CLS_SUPERCLASS_MISSING", "An instance exists for the requested class, but not for a superclass it requires."),
        ("RT_REC_001", "A `letrec` binding was read before it finished initializing (an immediate self-reference of a non-function value)."),
        ("RT_REC_003", "Evaluation exceeded the configured maximum recursion depth."),
        ("RT_DIV0", "Integer or float division (or modulo) by zero."),
        ("MATCH_NONEXHAUSTIVE", "No arm of a `match` matched the scrutinee at runtime."),
        ("GUARD_NOT_BOOL", "A `match` arm's guard expression did not evaluate to a `Bool`."),
        ("REC_MISSING_FIELD", "A record access named a field the record value does not have."),
        ("TYPE_MISMATCH_BUILTIN", "A builtin function was called with argument types it does not accept."),
        ("RT_ARITY", "A builtin function was called with the wrong number of arguments."),
        ("RT_UNKNOWN_BUILTIN", "A reference named a builtin that does not exist."),
        ("EFF_CAP_MISSING", "An effectful builtin ran without its capability granted in the evaluator's `EffectContext`."),
        ("MOD_UNRESOLVED_GLOBAL", "A cross-module reference could not be resolved by the configured `GlobalResolver`."),
        ("RT_NOT_CALLABLE", "A value that is not a function or builtin was applied to arguments."),
        ("RT999", "The evaluator encountered an internal error (a bug); please file a report."),
    ]);
    codes
}

#[cfg(test)]
mod tests {
    use super::*;
    use ailang_core::Span;
    use ailang_ir::ElaborateError;
    use ailang_runtime::RuntimeError;
    use ailang_types::{ClassError, TypeError, Type};

    #[test]
    fn every_elaborate_error_variant_has_a_doc_entry() {
        let codes: Vec<_> = all_codes().into_iter().map(|(c, _)| c).collect();
        let sample = [
            ElaborateError::DuplicateRecordField { span: Span::dummy(), field: "x".into() },
            ElaborateError::DuplicateParam { span: Span::dummy(), name: "x".into() },
            ElaborateError::DuplicateLetRecBinding { span: Span::dummy(), name: "x".into() },
            ElaborateError::DuplicateConstructor {
                span: Span::dummy(),
                type_name: "T".into(),
                ctor: "C".into(),
            },
            ElaborateError::InternalPanic { message: "boom".into() },
        ];
        for err in &sample {
            assert!(codes.contains(&err.code()), "missing doc for {}", err.code());
        }
    }

    #[test]
    fn every_type_error_variant_has_a_doc_entry() {
        let codes: Vec<_> = all_codes().into_iter().map(|(c, _)| c).collect();
        let sample = [
            TypeError::Mismatch { span: Span::dummy(), expected: Type::Int, found: Type::Bool },
            TypeError::InfiniteType { span: Span::dummy(), ty: Type::Int },
            TypeError::ArityMismatch { span: Span::dummy(), expected: 1, found: 2 },
            TypeError::RecordFieldMismatch { span: Span::dummy(), missing: vec!["x".into()] },
            TypeError::UnboundVariable { span: Span::dummy(), name: "x".into() },
            TypeError::UnknownConstructor { span: Span::dummy(), name: "C".into() },
            TypeError::NotAppendable { span: Span::dummy(), op: "+".into(), found: Type::Bool },
            TypeError::NonExhaustiveMatch { span: Span::dummy() },
        ];
        for err in &sample {
            assert!(codes.contains(&err.code()), "missing doc for {}", err.code());
        }
    }

    #[test]
    fn every_class_error_variant_has_a_doc_entry() {
        let codes: Vec<_> = all_codes().into_iter().map(|(c, _)| c).collect();
        let sample = [
            ClassError::NoInstance { span: Span::dummy(), class: "Num".into(), ty: Type::Bool },
            ClassError::Ambiguous { span: Span::dummy(), class: "Num".into() },
            ClassError::SuperclassMissing {
                span: Span::dummy(),
                class: "Fractional".into(),
                superclass: "Num".into(),
                ty: Type::Int,
            },
        ];
        for err in &sample {
            assert!(codes.contains(&err.code()), "missing doc for {}", err.code());
        }
    }

    #[test]
    fn every_runtime_error_variant_has_a_doc_entry() {
        let codes: Vec<_> = all_codes().into_iter().map(|(c, _)| c).collect();
        let sample = [
            RuntimeError::UninitializedLetRec { span: Span::dummy() },
            RuntimeError::VisitingLetRec { span: Span::dummy() },
            RuntimeError::RecursionLimit { span: Span::dummy(), max: 10 },
            RuntimeError::DivisionByZero { span: Span::dummy() },
            RuntimeError::NonExhaustiveMatch { span: Span::dummy() },
            RuntimeError::GuardNotBool { span: Span::dummy() },
            RuntimeError::MissingField { span: Span::dummy(), field: "x".into() },
            RuntimeError::TypeMismatchBuiltin { span: Span::dummy(), builtin: "_io_print".into(), hint: None },
            RuntimeError::ArityMismatchBuiltin {
                span: Span::dummy(),
                builtin: "_io_print".into(),
                expected: 1,
                found: 2,
            },
            RuntimeError::UnknownBuiltin { span: Span::dummy(), name: "_bogus".into() },
            RuntimeError::MissingCapability { span: Span::dummy(), label: "IO".into() },
            RuntimeError::UnresolvedGlobal {
                span: Span::dummy(),
                module: "mod".into(),
                name: "x".into(),
            },
            RuntimeError::NotCallable { span: Span::dummy() },
            RuntimeError::MissingDictMethod {
                span: Span::dummy(),
                class: "Num".into(),
                method: "add".into(),
            },
            RuntimeError::internal(Span::dummy(), "boom"),
        ];
        for err in &sample {
            assert!(codes.contains(&err.code()), "missing doc for {}", err.code());
        }
    }
}
