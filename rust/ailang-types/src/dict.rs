use std::collections::HashMap;

use ailang_core::Span;
use ailang_ir::{CoreFunc, CoreModule, Expr, TopLevelItem};

use crate::classes::ClassRegistry;
use crate::error::ClassError;
use crate::infer::InferOutput;
use crate::types::{Scheme, TyVar, Type};

/// A module whose overloaded-operator [`Expr::ClassCall`] nodes have all been
/// rewritten to explicit dictionary passing: a ground-typed call becomes a
/// direct [`Expr::DictRef`] method lookup, while a call still abstract over a
/// class constraint (i.e. inside a function whose own scheme stays
/// polymorphic) becomes a lookup against a dictionary parameter introduced by
/// wrapping that function in [`Expr::DictAbs`].
pub struct DictResolved {
    pub module: CoreModule,
}

/// Resolve every `ClassCall` in `module` against `registry`, using the
/// per-call-site types `infer_out` recorded during inference. Returns every
/// instance-resolution failure rather than stopping at the first one, since
/// each is independent of the others.
pub fn resolve_classes(
    module: &CoreModule,
    infer_out: &InferOutput,
    registry: &ClassRegistry,
) -> Result<DictResolved, Vec<ClassError>> {
    let mut by_span: HashMap<Span, Vec<(String, Type)>> = HashMap::new();
    for (class, ty, span) in &infer_out.obligations {
        by_span.entry(*span).or_default().push((class.clone(), ty.clone()));
    }

    let mut resolver = Resolver {
        by_span,
        func_schemes: &infer_out.func_schemes,
        registry,
        errors: Vec::new(),
    };

    let funcs = module
        .funcs
        .iter()
        .map(|f| resolver.rewrite_func(f))
        .collect();
    let top_level = module
        .top_level
        .iter()
        .map(|item| match item {
            TopLevelItem::Let { name, value } => TopLevelItem::Let {
                name: name.clone(),
                value: resolver.rewrite_expr(value, &HashMap::new()),
            },
            TopLevelItem::Expr(e) => TopLevelItem::Expr(resolver.rewrite_expr(e, &HashMap::new())),
        })
        .collect();

    if !resolver.errors.is_empty() {
        return Err(resolver.errors);
    }

    Ok(DictResolved {
        module: CoreModule {
            module_path: module.module_path.clone(),
            types: module.types.clone(),
            funcs,
            top_level,
        },
    })
}

/// Maps a constrained type variable plus the class it's constrained by to
/// the name of the dictionary parameter a `DictAbs` introduces for it, so
/// in-body `ClassCall`s (and nested calls to other constrained functions
/// that simply forward the same obligation) can reference it.
type DictParams = HashMap<(TyVar, String), String>;

struct Resolver<'a> {
    by_span: HashMap<Span, Vec<(String, Type)>>,
    func_schemes: &'a HashMap<String, Scheme>,
    registry: &'a ClassRegistry,
    errors: Vec<ClassError>,
}

impl<'a> Resolver<'a> {
    fn rewrite_func(&mut self, f: &CoreFunc) -> CoreFunc {
        let scheme = &self.func_schemes[&f.name];
        if scheme.constraints.is_empty() {
            return CoreFunc {
                name: f.name.clone(),
                exported: f.exported,
                params: f.params.clone(),
                body: self.rewrite_expr(&f.body, &HashMap::new()),
                span: f.span,
            };
        }

        let mut dict_params = DictParams::new();
        for (i, (class, ty)) in scheme.constraints.iter().enumerate() {
            if let Type::Var(tv) = ty {
                let param = format!("$dict_{}_{}", class.to_lowercase(), i);
                dict_params.insert((*tv, class.clone()), param);
            }
        }

        let mut body = self.rewrite_expr(&f.body, &dict_params);
        for ((_, class), param) in dict_params.iter() {
            body = Expr::DictAbs {
                class: class.clone(),
                param: param.clone(),
                body: Box::new(body),
                span: f.span,
            };
        }

        CoreFunc {
            name: f.name.clone(),
            exported: f.exported,
            params: f.params.clone(),
            body,
            span: f.span,
        }
    }

    /// Build the argument for one of the callee's constraints at this call
    /// site: a concrete `DictRef` if the obligation resolved to a ground
    /// type, or a reference to the caller's own forwarded dictionary
    /// parameter if the obligation is still abstract (the caller is itself
    /// polymorphic in that same class).
    fn dict_arg_for(
        &mut self,
        class: &str,
        ty: &Type,
        span: Span,
        dict_params: &DictParams,
    ) -> Expr {
        match ty.head_name() {
            Some(head) => {
                if let Err(e) = self.registry.resolve(class, ty, span) {
                    self.errors.push(e);
                }
                Expr::DictRef {
                    class: class.to_string(),
                    ty: head,
                    span,
                }
            }
            None => {
                if let Type::Var(tv) = ty {
                    if let Some(param) = dict_params.get(&(*tv, class.to_string())) {
                        return Expr::Var {
                            name: param.clone(),
                            span,
                        };
                    }
                }
                self.errors.push(ClassError::Ambiguous {
                    span,
                    class: class.to_string(),
                });
                Expr::DictRef {
                    class: class.to_string(),
                    ty: "?".to_string(),
                    span,
                }
            }
        }
    }

    fn rewrite_expr(&mut self, expr: &Expr, dict_params: &DictParams) -> Expr {
        match expr {
            Expr::ClassCall {
                class,
                method,
                args,
                span,
            } => {
                let args: Vec<Expr> = args.iter().map(|a| self.rewrite_expr(a, dict_params)).collect();
                let ty = self
                    .by_span
                    .get(span)
                    .and_then(|obs| obs.first())
                    .map(|(_, ty)| ty.clone())
                    .unwrap_or(Type::Unit);
                let dict = self.dict_arg_for(class, &ty, *span, dict_params);
                Expr::App {
                    func: Box::new(Expr::RecordAccess {
                        base: Box::new(dict),
                        field: method.clone(),
                        span: *span,
                    }),
                    args,
                    span: *span,
                }
            }
            Expr::App { func, args, span } => {
                let args: Vec<Expr> = args.iter().map(|a| self.rewrite_expr(a, dict_params)).collect();
                let rewritten_func = self.rewrite_expr(func, dict_params);
                let wrapped = if let Expr::Var { name, .. } = func.as_ref() {
                    match self.func_schemes.get(name) {
                        Some(scheme) if !scheme.constraints.is_empty() => {
                            let obligations =
                                self.by_span.get(&func.span()).cloned().unwrap_or_default();
                            let mut acc = rewritten_func;
                            for (i, (class, cty)) in scheme.constraints.iter().enumerate() {
                                let resolved = obligations
                                    .get(i)
                                    .map(|(_, t)| t.clone())
                                    .unwrap_or_else(|| cty.clone());
                                let dict = self.dict_arg_for(class, &resolved, *span, dict_params);
                                acc = Expr::DictApp {
                                    func: Box::new(acc),
                                    dict: Box::new(dict),
                                    span: *span,
                                };
                            }
                            acc
                        }
                        _ => rewritten_func,
                    }
                } else {
                    rewritten_func
                };
                Expr::App {
                    func: Box::new(wrapped),
                    args,
                    span: *span,
                }
            }
            Expr::Var { .. } | Expr::VarGlobal { .. } | Expr::Lit { .. } => expr.clone(),
            Expr::Lambda { params, body, span } => Expr::Lambda {
                params: params.clone(),
                body: Box::new(self.rewrite_expr(body, dict_params)),
                span: *span,
            },
            Expr::Let {
                name,
                value,
                body,
                span,
            } => Expr::Let {
                name: name.clone(),
                value: Box::new(self.rewrite_expr(value, dict_params)),
                body: Box::new(self.rewrite_expr(body, dict_params)),
                span: *span,
            },
            Expr::LetRec { bindings, body, span } => Expr::LetRec {
                bindings: bindings
                    .iter()
                    .map(|(n, e)| (n.clone(), self.rewrite_expr(e, dict_params)))
                    .collect(),
                body: Box::new(self.rewrite_expr(body, dict_params)),
                span: *span,
            },
            Expr::If {
                cond,
                then_branch,
                else_branch,
                span,
            } => Expr::If {
                cond: Box::new(self.rewrite_expr(cond, dict_params)),
                then_branch: Box::new(self.rewrite_expr(then_branch, dict_params)),
                else_branch: Box::new(self.rewrite_expr(else_branch, dict_params)),
                span: *span,
            },
            Expr::Match {
                scrutinee,
                arms,
                span,
            } => Expr::Match {
                scrutinee: Box::new(self.rewrite_expr(scrutinee, dict_params)),
                arms: arms
                    .iter()
                    .map(|arm| ailang_ir::CoreArm {
                        pattern: arm.pattern.clone(),
                        guard: arm.guard.as_ref().map(|g| self.rewrite_expr(g, dict_params)),
                        body: self.rewrite_expr(&arm.body, dict_params),
                        span: arm.span,
                    })
                    .collect(),
                span: *span,
            },
            Expr::Record { fields, span } => Expr::Record {
                fields: fields
                    .iter()
                    .map(|(n, e)| (n.clone(), self.rewrite_expr(e, dict_params)))
                    .collect(),
                span: *span,
            },
            Expr::RecordUpdate { base, fields, span } => Expr::RecordUpdate {
                base: Box::new(self.rewrite_expr(base, dict_params)),
                fields: fields
                    .iter()
                    .map(|(n, e)| (n.clone(), self.rewrite_expr(e, dict_params)))
                    .collect(),
                span: *span,
            },
            Expr::RecordAccess { base, field, span } => Expr::RecordAccess {
                base: Box::new(self.rewrite_expr(base, dict_params)),
                field: field.clone(),
                span: *span,
            },
            Expr::List { items, span } => Expr::List {
                items: items.iter().map(|i| self.rewrite_expr(i, dict_params)).collect(),
                span: *span,
            },
            Expr::Tuple { items, span } => Expr::Tuple {
                items: items.iter().map(|i| self.rewrite_expr(i, dict_params)).collect(),
                span: *span,
            },
            Expr::Intrinsic { name, args, span } => Expr::Intrinsic {
                name: name.clone(),
                args: args.iter().map(|a| self.rewrite_expr(a, dict_params)).collect(),
                span: *span,
            },
            Expr::DictRef { .. } | Expr::DictAbs { .. } | Expr::DictApp { .. } => expr.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ailang_ir::elaborate_program;
    use ailang_syntax::{parse_program, tokenize};
    use crate::infer::infer_module;

    fn resolve_src(src: &str) -> Result<DictResolved, Vec<ClassError>> {
        let (tokens, _) = tokenize(src);
        let (program, _) = parse_program(&tokens);
        let (module, _) = elaborate_program(&program.unwrap());
        let module = module.unwrap();
        let infer_out = infer_module(&module).expect("inference should succeed");
        let registry = ClassRegistry::with_builtins();
        resolve_classes(&module, &infer_out, &registry)
    }

    #[test]
    fn ground_arithmetic_resolves_to_direct_dict_ref() {
        let resolved = resolve_src("func add1(x) -> int = x + 1\nadd1(2)").unwrap();
        let f = resolved.module.funcs.iter().find(|f| f.name == "add1").unwrap();
        match &f.body {
            Expr::App { func, .. } => match func.as_ref() {
                Expr::RecordAccess { base, field, .. } => {
                    assert_eq!(field, "add");
                    assert!(matches!(base.as_ref(), Expr::DictRef { ty, .. } if ty == "Int"));
                }
                other => panic!("expected record access, got {other:?}"),
            },
            other => panic!("expected app, got {other:?}"),
        }
    }

    #[test]
    fn string_addition_has_no_num_instance() {
        let result = resolve_src("func f() -> string = \"a\" + \"b\"");
        assert!(matches!(
            result,
            Err(errors) if errors.iter().any(|e| matches!(e, ClassError::NoInstance { class, .. } if class == "Num"))
        ));
    }

    /// `same`'s parameters are never pinned to a ground type by its own body,
    /// so its `Eq` obligation (unlike `Num`/`Fractional`) survives
    /// generalization as a real scheme constraint, and `rewrite_func` wraps it
    /// in a `DictAbs` over that constraint instead of resolving it directly.
    #[test]
    fn unconstrained_equality_is_wrapped_in_dict_abs() {
        let resolved = resolve_src("func same(a, b) -> bool = a == b\nsame(1, 2)").unwrap();
        let f = resolved.module.funcs.iter().find(|f| f.name == "same").unwrap();
        match &f.body {
            Expr::DictAbs { class, body, .. } => {
                assert_eq!(class, "Eq");
                match body.as_ref() {
                    Expr::App { func, .. } => match func.as_ref() {
                        Expr::RecordAccess { base, field, .. } => {
                            assert_eq!(field, "eq");
                            assert!(matches!(base.as_ref(), Expr::Var { .. }));
                        }
                        other => panic!("expected record access, got {other:?}"),
                    },
                    other => panic!("expected app, got {other:?}"),
                }
            }
            other => panic!("expected DictAbs, got {other:?}"),
        }
    }
}
