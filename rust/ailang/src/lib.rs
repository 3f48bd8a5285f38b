//! The AILANG facade: library entry points an embedding host (CLI, REPL,
//! language server — none built here) links against. Aggregates every
//! pipeline stage's error type behind [`AilangError`] and exposes `lex`,
//! `parse`, `elaborate`, `type_check`, and `run` as plain functions over
//! `&str`/`Core`/[`EvalConfig`].
//!
//! No filesystem loading, CLI argument parsing, or REPL loop lives here —
//! those belong to the host. This crate only turns source text into tokens,
//! an AST, a Core module, a dictionary-resolved Core module, or a final
//! [`Value`].

pub mod codes;
mod error;

use std::cell::RefCell;
use std::io::BufRead;
use std::rc::Rc;

use ailang_ir::CoreModule;
use ailang_runtime::Evaluator;
use ailang_syntax::{Program, Token};
use ailang_types::InferOutput;

pub use ailang_runtime::{show, EffectContext, EvalConfig, GlobalResolver, RuntimeError, Value};
pub use ailang_syntax::{LexError, ParseError};
pub use ailang_types::{ClassError, ClassRegistry, TypeError};
pub use error::AilangError;

/// Reserved for future inference-level tuning knobs (recursion-depth caps on
/// the solver, defaulting strategy, ...). Unit-like today so callers have one
/// stable place to pass configuration without a breaking signature change
/// later.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InferConfig;

/// The result of [`type_check`]: a Core module with every `ClassCall`
/// rewritten to explicit dictionary passing, ready for [`Evaluator`], plus
/// the inference metadata ([`InferOutput`]) a host might want for
/// diagnostics or a `:type` query.
pub struct Checked {
    pub module: CoreModule,
    pub infer: InferOutput,
}

/// Tokenizes `source`. The lexer recovers from every error it can and keeps
/// scanning, so a single bad input can surface more than one [`LexError`];
/// these come back as `AilangError::Multiple`.
pub fn lex(source: &str) -> Result<Vec<Token>, AilangError> {
    let (tokens, errors) = ailang_syntax::tokenize(source);
    match AilangError::from_many(errors.into_iter().map(AilangError::from).collect()) {
        Some(e) => Err(e),
        None => Ok(tokens),
    }
}

/// Parses `source` as a full program. Like [`lex`], the parser recovers and
/// keeps going past a malformed item, so failures may be reported together.
pub fn parse(source: &str) -> Result<Program, AilangError> {
    let (tokens, lex_errors) = ailang_syntax::tokenize(source);
    let (program, parse_errors) = ailang_syntax::parse_program(&tokens);
    let mut errors: Vec<AilangError> = lex_errors.into_iter().map(AilangError::from).collect();
    errors.extend(parse_errors.into_iter().map(AilangError::from));
    match AilangError::from_many(errors) {
        Some(e) => Err(e),
        None => Ok(program.expect("no parse errors implies a program was produced")),
    }
}

/// Parses `source` as a single expression, for a host's `:eval`/REPL-style
/// entry point rather than a whole module.
pub fn parse_expression(source: &str) -> Result<ailang_syntax::Expr, AilangError> {
    let (tokens, lex_errors) = ailang_syntax::tokenize(source);
    let (expr, parse_errors) = ailang_syntax::parse_expression(&tokens);
    let mut errors: Vec<AilangError> = lex_errors.into_iter().map(AilangError::from).collect();
    errors.extend(parse_errors.into_iter().map(AilangError::from));
    match AilangError::from_many(errors) {
        Some(e) => Err(e),
        None => Ok(expr.expect("no parse errors implies an expression was produced")),
    }
}

/// Parses and elaborates `source` down to Core IR. Elaboration stops at the
/// first error (unlike lexing/parsing, later passes assume a structurally
/// well-formed Core tree), so at most one [`ailang_ir::ElaborateError`] is
/// ever reported here, though it still comes back wrapped for uniformity
/// with the other stages.
pub fn elaborate(source: &str) -> Result<CoreModule, AilangError> {
    let program = parse(source)?;
    let (module, errors) = ailang_ir::elaborate_program(&program);
    match AilangError::from_many(
        errors
            .into_iter()
            .map(AilangError::from)
            .collect::<Vec<_>>(),
    ) {
        Some(e) => Err(e),
        None => Ok(module.expect("no elaborate errors implies a module was produced")),
    }
}

/// Runs the full static pipeline: elaborate, Hindley–Milner inference with
/// type-class obligations, then dictionary elaboration. The returned
/// [`Checked::module`] has no `ClassCall` nodes left — every overloaded
/// operator has been rewritten to an explicit dictionary reference or
/// application — and is what [`run`] (and any host wanting to evaluate more
/// than once without re-checking) hands to [`Evaluator`].
pub fn type_check(source: &str) -> Result<Checked, AilangError> {
    type_check_with(source, &ClassRegistry::with_builtins())
}

/// Same as [`type_check`], but against a caller-supplied [`ClassRegistry`] —
/// for a host that wants to extend or restrict the built-in `Num`/`Eq`/`Ord`/
/// `Fractional` instance set.
pub fn type_check_with(source: &str, registry: &ClassRegistry) -> Result<Checked, AilangError> {
    let module = elaborate(source)?;
    let infer = ailang_types::infer_module(&module)?;
    let resolved = ailang_types::resolve_classes(&module, &infer, registry)
        .map_err(|errors| {
            AilangError::from_many(errors.into_iter().map(AilangError::from).collect())
                .expect("resolve_classes only returns Err with a non-empty error list")
        })?;
    Ok(Checked {
        module: resolved.module,
        infer,
    })
}

/// Type-checks and evaluates `source` with the default evaluator
/// configuration, granting no effect capabilities and resolving no
/// cross-module globals.
pub fn run(source: &str) -> Result<Value, AilangError> {
    run_with(source, EvalConfig::default(), EffectContext::none())
}

/// Type-checks and evaluates `source` under caller-supplied evaluator
/// tuning and effect capability grant.
pub fn run_with(source: &str, config: EvalConfig, effects: EffectContext) -> Result<Value, AilangError> {
    let checked = type_check(source)?;
    let evaluator = Evaluator::new(config, effects);
    Ok(evaluator.eval_module(&checked.module)?)
}

/// Type-checks and evaluates `source` with a custom global resolver (for
/// cross-module `import`s the host loads itself) and/or a custom stdin
/// source for `_io_readLine`.
pub fn run_with_host<'a>(
    source: &str,
    config: EvalConfig,
    effects: EffectContext,
    resolver: &'a dyn GlobalResolver,
    stdin: Option<Rc<RefCell<dyn BufRead>>>,
) -> Result<Value, AilangError> {
    let checked = type_check(source)?;
    let mut evaluator = Evaluator::new(config, effects).with_resolver(resolver);
    if let Some(stdin) = stdin {
        evaluator = evaluator.with_stdin(stdin);
    }
    Ok(evaluator.eval_module(&checked.module)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lex_reports_an_unterminated_string() {
        let err = lex("\"unterminated").unwrap_err();
        assert_eq!(err.code(), "LEX_STR_UNTERMINATED");
    }

    #[test]
    fn parse_reports_a_duplicate_effect_label() {
        let err = parse("func f() -> int ! {IO, IO} { 42 }").unwrap_err();
        assert_eq!(err.code(), "PAR_EFF001_DUP");
    }

    #[test]
    fn elaborate_rejects_a_duplicate_record_field() {
        let err = elaborate("{ x: 1, x: 2 }").unwrap_err();
        assert_eq!(err.code(), "REC_DUP_FIELD");
    }

    #[test]
    fn type_check_reports_a_type_mismatch() {
        let err = type_check("func f() -> int = if 1 then 2 else 3").unwrap_err();
        assert_eq!(err.code(), "TC_MISMATCH");
    }

    #[test]
    fn run_evaluates_a_closed_program() {
        let value = run("letrec fac = \\n. if n <= 1 then 1 else n * fac(n - 1) in fac(5)").unwrap();
        assert_eq!(value, Value::Int(120));
    }

    #[test]
    fn run_reports_division_by_zero() {
        let err = run("1 / 0").unwrap_err();
        assert_eq!(err.code(), "RT_DIV0");
    }
}
