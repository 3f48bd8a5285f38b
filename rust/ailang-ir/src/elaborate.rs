use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};

use ailang_syntax::{self as syn, BinOp, UnOp};

use crate::core::{CoreArm, CoreCtor, CoreFunc, CorePattern, CoreTypeDef, Expr, Lit, TopLevelItem};
use crate::core::CoreModule;
use crate::error::ElaborateError;

type EResult<T> = Result<T, ElaborateError>;

/// Lower a parsed [`syn::Program`] into [`CoreModule`], guarding against
/// internal panics the way the parser does.
pub fn elaborate_program(program: &syn::Program) -> (Option<CoreModule>, Vec<ElaborateError>) {
    let result = panic::catch_unwind(AssertUnwindSafe(|| elaborate_program_inner(program)));
    match result {
        Ok(Ok(module)) => (Some(module), Vec::new()),
        Ok(Err(e)) => (None, vec![e]),
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "internal elaborator error".to_string());
            (None, vec![ElaborateError::InternalPanic { message }])
        }
    }
}

fn elaborate_program_inner(program: &syn::Program) -> EResult<CoreModule> {
    let module_path = program
        .module
        .as_ref()
        .map(|m| m.path.clone())
        .unwrap_or_default();

    let mut types = Vec::new();
    let mut funcs = Vec::new();
    let mut top_level = Vec::new();

    for item in &program.items {
        match item {
            syn::Item::Type(decl) => {
                if let Some(core_type) = elaborate_type_decl(decl)? {
                    types.push(core_type);
                }
            }
            syn::Item::Func(decl) => funcs.push(elaborate_func_decl(decl)?),
            syn::Item::Expr(expr) => {
                if let syn::Expr::Let {
                    name,
                    value,
                    body: None,
                    ..
                } = expr
                {
                    top_level.push(TopLevelItem::Let {
                        name: name.clone(),
                        value: elaborate_expr(value)?,
                    });
                } else {
                    top_level.push(TopLevelItem::Expr(elaborate_expr(expr)?));
                }
            }
        }
    }

    Ok(CoreModule {
        module_path,
        types,
        funcs,
        top_level,
    })
}

fn elaborate_type_decl(decl: &syn::TypeDecl) -> EResult<Option<CoreTypeDef>> {
    let variants = match &decl.body {
        syn::TypeDeclBody::Sum(variants) => variants,
        syn::TypeDeclBody::Record(_) | syn::TypeDeclBody::Alias(_) => return Ok(None),
    };

    let mut seen = HashSet::new();
    let mut ctors = Vec::new();
    for variant in variants {
        if !seen.insert(variant.ctor.clone()) {
            return Err(ElaborateError::DuplicateConstructor {
                span: variant.span,
                type_name: decl.name.clone(),
                ctor: variant.ctor.clone(),
            });
        }
        ctors.push(CoreCtor {
            name: variant.ctor.clone(),
            arity: variant.fields.len(),
            fields: variant.fields.clone(),
        });
    }
    Ok(Some(CoreTypeDef {
        name: decl.name.clone(),
        type_params: decl.type_params.clone(),
        ctors,
    }))
}

fn elaborate_func_decl(decl: &syn::FuncDecl) -> EResult<CoreFunc> {
    check_duplicate_params(&decl.params.iter().map(|p| (p.name.clone(), p.span)).collect::<Vec<_>>())?;
    Ok(CoreFunc {
        name: decl.name.clone(),
        exported: decl.exported,
        params: decl.params.iter().map(|p| p.name.clone()).collect(),
        body: elaborate_expr(&decl.body)?,
        span: decl.span,
    })
}

fn check_duplicate_params(params: &[(String, ailang_core::Span)]) -> EResult<()> {
    let mut seen = HashSet::new();
    for (name, span) in params {
        if !seen.insert(name.clone()) {
            return Err(ElaborateError::DuplicateParam {
                span: *span,
                name: name.clone(),
            });
        }
    }
    Ok(())
}

/// Maps an overloaded binary operator to the type class and method that
/// implement it. Non-overloaded operators are handled separately as
/// [`Expr::Intrinsic`].
fn overloaded_op_class_method(op: BinOp) -> (&'static str, &'static str) {
    match op {
        BinOp::Add => ("Num", "add"),
        BinOp::Sub => ("Num", "sub"),
        BinOp::Mul => ("Num", "mul"),
        BinOp::Div => ("Num", "div"),
        BinOp::Mod => ("Num", "mod"),
        BinOp::Eq => ("Eq", "eq"),
        BinOp::Ne => ("Eq", "neq"),
        BinOp::Lt => ("Ord", "lt"),
        BinOp::Le => ("Ord", "lte"),
        BinOp::Gt => ("Ord", "gt"),
        BinOp::Ge => ("Ord", "gte"),
        BinOp::And | BinOp::Or | BinOp::Append => {
            unreachable!("non-overloaded operator routed through overloaded path")
        }
    }
}

pub fn elaborate_expr(expr: &syn::Expr) -> EResult<Expr> {
    let span = expr.span();
    Ok(match expr {
        syn::Expr::IntLit { value, .. } => Expr::Lit {
            value: Lit::Int(*value),
            span,
        },
        syn::Expr::FloatLit { value, .. } => Expr::Lit {
            value: Lit::Float(*value),
            span,
        },
        syn::Expr::StringLit { value, .. } => Expr::Lit {
            value: Lit::Str(value.clone()),
            span,
        },
        syn::Expr::BoolLit { value, .. } => Expr::Lit {
            value: Lit::Bool(*value),
            span,
        },
        syn::Expr::UnitLit { .. } => Expr::Lit {
            value: Lit::Unit,
            span,
        },
        syn::Expr::Ident { name, .. } => Expr::Var {
            name: name.clone(),
            span,
        },
        syn::Expr::Unary { op, expr: inner, .. } => {
            let inner = elaborate_expr(inner)?;
            match op {
                UnOp::Not => Expr::Intrinsic {
                    name: "not".to_string(),
                    args: vec![inner],
                    span,
                },
                UnOp::Neg => Expr::ClassCall {
                    class: "Num".to_string(),
                    method: "neg".to_string(),
                    args: vec![inner],
                    span,
                },
            }
        }
        syn::Expr::Binary { op, lhs, rhs, .. } => {
            let lhs = elaborate_expr(lhs)?;
            let rhs = elaborate_expr(rhs)?;
            if op.is_overloaded() {
                let (class, method) = overloaded_op_class_method(*op);
                Expr::ClassCall {
                    class: class.to_string(),
                    method: method.to_string(),
                    args: vec![lhs, rhs],
                    span,
                }
            } else {
                let name = match op {
                    BinOp::And => "and",
                    BinOp::Or => "or",
                    BinOp::Append => "append",
                    _ => unreachable!(),
                };
                Expr::Intrinsic {
                    name: name.to_string(),
                    args: vec![lhs, rhs],
                    span,
                }
            }
        }
        syn::Expr::If {
            cond,
            then_branch,
            else_branch,
            ..
        } => Expr::If {
            cond: Box::new(elaborate_expr(cond)?),
            then_branch: Box::new(elaborate_expr(then_branch)?),
            else_branch: Box::new(elaborate_expr(else_branch)?),
            span,
        },
        syn::Expr::Let {
            name, value, body, ..
        } => {
            let value = elaborate_expr(value)?;
            let body = match body {
                Some(b) => elaborate_expr(b)?,
                None => Expr::Lit {
                    value: Lit::Unit,
                    span,
                },
            };
            Expr::Let {
                name: name.clone(),
                value: Box::new(value),
                body: Box::new(body),
                span,
            }
        }
        syn::Expr::LetRec { bindings, body, .. } => {
            let mut seen = HashSet::new();
            let mut core_bindings = Vec::with_capacity(bindings.len());
            for (name, value) in bindings {
                if !seen.insert(name.clone()) {
                    return Err(ElaborateError::DuplicateLetRecBinding {
                        span,
                        name: name.clone(),
                    });
                }
                core_bindings.push((name.clone(), elaborate_expr(value)?));
            }
            Expr::LetRec {
                bindings: core_bindings,
                body: Box::new(elaborate_expr(body)?),
                span,
            }
        }
        syn::Expr::Lambda { params, body, .. } => {
            check_duplicate_params(
                &params
                    .iter()
                    .map(|p| (p.clone(), span))
                    .collect::<Vec<_>>(),
            )?;
            Expr::Lambda {
                params: params.clone(),
                body: Box::new(elaborate_expr(body)?),
                span,
            }
        }
        syn::Expr::App { func, args, .. } => Expr::App {
            func: Box::new(elaborate_expr(func)?),
            args: args
                .iter()
                .map(elaborate_expr)
                .collect::<EResult<Vec<_>>>()?,
            span,
        },
        syn::Expr::Match {
            scrutinee, arms, ..
        } => Expr::Match {
            scrutinee: Box::new(elaborate_expr(scrutinee)?),
            arms: arms
                .iter()
                .map(elaborate_match_arm)
                .collect::<EResult<Vec<_>>>()?,
            span,
        },
        syn::Expr::Tuple { items, .. } => Expr::Tuple {
            items: items
                .iter()
                .map(elaborate_expr)
                .collect::<EResult<Vec<_>>>()?,
            span,
        },
        syn::Expr::List { items, .. } => Expr::List {
            items: items
                .iter()
                .map(elaborate_expr)
                .collect::<EResult<Vec<_>>>()?,
            span,
        },
        syn::Expr::Record { fields, .. } => {
            let mut seen = HashSet::new();
            let mut core_fields = Vec::with_capacity(fields.len());
            for (name, value) in fields {
                if !seen.insert(name.clone()) {
                    return Err(ElaborateError::DuplicateRecordField {
                        span,
                        field: name.clone(),
                    });
                }
                core_fields.push((name.clone(), elaborate_expr(value)?));
            }
            Expr::Record {
                fields: core_fields,
                span,
            }
        }
        syn::Expr::RecordUpdate { base, fields, .. } => {
            let mut seen = HashSet::new();
            let mut core_fields = Vec::with_capacity(fields.len());
            for (name, value) in fields {
                if !seen.insert(name.clone()) {
                    return Err(ElaborateError::DuplicateRecordField {
                        span,
                        field: name.clone(),
                    });
                }
                core_fields.push((name.clone(), elaborate_expr(value)?));
            }
            Expr::RecordUpdate {
                base: Box::new(elaborate_expr(base)?),
                fields: core_fields,
                span,
            }
        }
        syn::Expr::RecordAccess { base, field, .. } => Expr::RecordAccess {
            base: Box::new(elaborate_expr(base)?),
            field: field.clone(),
            span,
        },
    })
}

fn elaborate_match_arm(arm: &syn::MatchArm) -> EResult<CoreArm> {
    Ok(CoreArm {
        pattern: elaborate_pattern(&arm.pattern)?,
        guard: arm.guard.as_ref().map(elaborate_expr).transpose()?,
        body: elaborate_expr(&arm.body)?,
        span: arm.span,
    })
}

fn elaborate_pattern(pattern: &syn::Pattern) -> EResult<CorePattern> {
    let span = pattern.span();
    Ok(match pattern {
        syn::Pattern::Var { name, .. } => CorePattern::Var {
            name: name.clone(),
            span,
        },
        syn::Pattern::Wildcard { .. } => CorePattern::Wildcard { span },
        syn::Pattern::IntLit { value, .. } => CorePattern::IntLit {
            value: *value,
            span,
        },
        syn::Pattern::FloatLit { value, .. } => CorePattern::FloatLit {
            value: *value,
            span,
        },
        syn::Pattern::StringLit { value, .. } => CorePattern::StringLit {
            value: value.clone(),
            span,
        },
        syn::Pattern::BoolLit { value, .. } => CorePattern::BoolLit {
            value: *value,
            span,
        },
        syn::Pattern::Tuple { items, .. } => CorePattern::Tuple {
            items: items
                .iter()
                .map(elaborate_pattern)
                .collect::<EResult<Vec<_>>>()?,
            span,
        },
        syn::Pattern::List { items, rest, .. } => CorePattern::List {
            items: items
                .iter()
                .map(elaborate_pattern)
                .collect::<EResult<Vec<_>>>()?,
            rest: rest.clone(),
            span,
        },
        syn::Pattern::Ctor { name, args, .. } => CorePattern::Ctor {
            name: name.clone(),
            args: args
                .iter()
                .map(elaborate_pattern)
                .collect::<EResult<Vec<_>>>()?,
            span,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ailang_syntax::{parse_expression, tokenize};

    fn elaborate_src(src: &str) -> Expr {
        let (tokens, lex_errors) = tokenize(src);
        assert!(lex_errors.is_empty());
        let (expr, parse_errors) = parse_expression(&tokens);
        assert!(parse_errors.is_empty(), "{parse_errors:?}");
        elaborate_expr(&expr.unwrap()).unwrap()
    }

    #[test]
    fn overloaded_add_becomes_class_call() {
        let e = elaborate_src("1 + 2");
        assert!(matches!(
            e,
            Expr::ClassCall {
                ref class,
                ref method,
                ..
            } if class == "Num" && method == "add"
        ));
    }

    #[test]
    fn logical_and_becomes_intrinsic() {
        let e = elaborate_src("true && false");
        assert!(matches!(e, Expr::Intrinsic { ref name, .. } if name == "and"));
    }

    #[test]
    fn append_becomes_intrinsic() {
        let e = elaborate_src("\"a\" ++ \"b\"");
        assert!(matches!(e, Expr::Intrinsic { ref name, .. } if name == "append"));
    }

    #[test]
    fn unary_neg_becomes_class_call() {
        let e = elaborate_src("-x");
        assert!(matches!(
            e,
            Expr::ClassCall { ref class, ref method, .. } if class == "Num" && method == "neg"
        ));
    }

    #[test]
    fn duplicate_record_field_is_rejected() {
        let (tokens, _) = tokenize("{ a: 1, a: 2 }");
        let (expr, _) = parse_expression(&tokens);
        let err = elaborate_expr(&expr.unwrap()).unwrap_err();
        assert_eq!(err.code(), "REC_DUP_FIELD");
    }

    #[test]
    fn duplicate_lambda_param_is_rejected() {
        let (tokens, _) = tokenize("\\x, x. x");
        let (expr, _) = parse_expression(&tokens);
        let err = elaborate_expr(&expr.unwrap()).unwrap_err();
        assert_eq!(err.code(), "PAR_DUP_PARAM");
    }
}
