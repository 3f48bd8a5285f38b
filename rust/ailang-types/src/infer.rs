use std::collections::{BTreeMap, BTreeSet, HashMap};

use ailang_core::Span;
use ailang_ir::{CoreModule, CorePattern, Expr, Lit, TopLevelItem};
use ailang_syntax::TypeExpr;

use crate::error::TypeError;
use crate::types::{EffectSet, RecordRow, RowTail, Scheme, TyVar, Type};
use crate::unify::{env_free_vars, UnificationTable};

/// Everything the rest of the pipeline needs out of inference: the type of
/// the module's top-level sequence, each function's generalized scheme (for
/// diagnostics and for the dictionary-elaboration pass), and the unresolved
/// type-class obligations collected along the way.
pub struct InferOutput {
    pub module_type: Type,
    pub func_schemes: HashMap<String, Scheme>,
    pub obligations: Vec<(String, Type, Span)>,
    pub append_checks: Vec<(Type, Span)>,
}

struct Infer {
    table: UnificationTable,
    env: HashMap<String, Scheme>,
    obligations: Vec<(String, Type, Span)>,
    append_checks: Vec<(Type, Span)>,
}

pub fn infer_module(module: &CoreModule) -> Result<InferOutput, TypeError> {
    let mut infer = Infer {
        table: UnificationTable::new(),
        env: HashMap::new(),
        obligations: Vec::new(),
        append_checks: Vec::new(),
    };
    infer.register_ctors(module);

    let baseline_free = infer.env_free();
    let mut fresh: Vec<(Vec<Type>, Type)> = Vec::with_capacity(module.funcs.len());
    for f in &module.funcs {
        let ret_v = infer.table.fresh();
        let param_vs: Vec<Type> = f.params.iter().map(|_| infer.table.fresh()).collect();
        let fn_ty = Type::func(param_vs.clone(), ret_v.clone(), EffectSet::new());
        infer.env.insert(f.name.clone(), Scheme::monomorphic(fn_ty));
        fresh.push((param_vs, ret_v));
    }
    let mut fn_obligation_ranges: Vec<(usize, usize)> = Vec::with_capacity(module.funcs.len());
    for (f, (param_vs, ret_v)) in module.funcs.iter().zip(fresh.iter()) {
        let saved = infer.bind_params(&f.params, param_vs);
        let obligations_start = infer.obligations.len();
        let body_ty = infer.infer_expr(&f.body)?;
        infer.table.unify(&body_ty, ret_v, f.span)?;
        infer.restore(saved);
        fn_obligation_ranges.push((obligations_start, infer.obligations.len()));
    }

    // Default bare Num/Fractional obligations *before* generalizing: a
    // variable defaulted here zonks to a ground type, so it drops out of
    // both the generalized scheme's quantified variables and its
    // constraints. Eq/Ord obligations are never defaulted and so can still
    // end up as a real constraint below, giving genuinely class-polymorphic
    // functions (e.g. `func same(a, b) -> bool = a == b`) a `DictAbs`
    // wrapper instead of being forced to one ground instance.
    default_numeric_obligations(&mut infer.table, &infer.obligations)?;

    // Each func's own class obligations become its scheme's `constraints`, so
    // a func that stays genuinely polymorphic in a class-constrained
    // parameter (e.g. `func double(x) -> a = x + x`, never pinned to a
    // ground type in its own body) gets wrapped in `DictAbs` by
    // `resolve_classes` instead of being forced to resolve against a single
    // concrete instance. A func whose obligation type is ground is
    // unaffected: `generalize` only keeps constraints that mention a
    // variable actually being quantified.
    let mut func_schemes = HashMap::new();
    for ((f, (param_vs, ret_v)), (start, end)) in
        module.funcs.iter().zip(fresh.iter()).zip(fn_obligation_ranges.iter())
    {
        let fn_ty = Type::func(param_vs.clone(), ret_v.clone(), EffectSet::new());
        let constraints: Vec<(String, Type)> = infer.obligations[*start..*end]
            .iter()
            .map(|(class, ty, _)| (class.clone(), ty.clone()))
            .collect();
        let scheme = infer.table.generalize(&fn_ty, &baseline_free, &constraints);
        infer.env.insert(f.name.clone(), scheme.clone());
        func_schemes.insert(f.name.clone(), scheme);
    }

    let mut module_type = Type::Unit;
    for item in &module.top_level {
        match item {
            TopLevelItem::Let { name, value } => {
                let vt = infer.infer_expr(value)?;
                let free = infer.env_free();
                let scheme = infer.table.generalize(&vt, &free, &[]);
                infer.env.insert(name.clone(), scheme);
                module_type = Type::Unit;
            }
            TopLevelItem::Expr(e) => {
                module_type = infer.infer_expr(e)?;
            }
        }
    }

    infer.check_append_calls()?;

    default_numeric_obligations(&mut infer.table, &infer.obligations)?;

    let obligations = infer
        .obligations
        .iter()
        .map(|(class, ty, span)| (class.clone(), infer.table.zonk(ty), *span))
        .collect();

    Ok(InferOutput {
        module_type,
        func_schemes,
        obligations,
        append_checks: infer.append_checks,
    })
}

/// Defaults still-unbound numeric class obligations to a ground type, so a
/// variable whose only use is e.g. `x + 1` doesn't surface as ambiguous to
/// `resolve_classes`. `Fractional` obligations are defaulted first (to
/// `Float`) so that a variable any `Fractional` obligation still mentions
/// can never be claimed by a `Num` obligation processed afterward and
/// defaulted to `Int` instead. Obligations already tied to a concrete type
/// via some other use (a literal, a comparison, a declared return type) are
/// left untouched — this only fires for obligations that zonk to a bare
/// `Type::Var`.
fn default_numeric_obligations(
    table: &mut UnificationTable,
    obligations: &[(String, Type, Span)],
) -> Result<(), TypeError> {
    for (class, ty, span) in obligations {
        if class == "Fractional" && matches!(table.zonk(ty), Type::Var(_)) {
            table.unify(ty, &Type::Float, *span)?;
        }
    }
    for (class, ty, span) in obligations {
        if class == "Num" && matches!(table.zonk(ty), Type::Var(_)) {
            table.unify(ty, &Type::Int, *span)?;
        }
    }
    Ok(())
}

impl Infer {
    fn env_free(&self) -> BTreeSet<TyVar> {
        let mut out = BTreeSet::new();
        for scheme in self.env.values() {
            let free = env_free_vars(&self.table, std::iter::once(scheme.body.clone()));
            for v in free {
                if !scheme.vars.contains(&v) {
                    out.insert(v);
                }
            }
        }
        out
    }

    fn bind_params(&mut self, names: &[String], types: &[Type]) -> Vec<(String, Option<Scheme>)> {
        let mut saved = Vec::with_capacity(names.len());
        for (name, ty) in names.iter().zip(types.iter()) {
            saved.push((name.clone(), self.env.remove(name)));
            self.env.insert(name.clone(), Scheme::monomorphic(ty.clone()));
        }
        saved
    }

    fn restore(&mut self, saved: Vec<(String, Option<Scheme>)>) {
        for (name, prev) in saved {
            match prev {
                Some(scheme) => {
                    self.env.insert(name, scheme);
                }
                None => {
                    self.env.remove(&name);
                }
            }
        }
    }

    fn register_ctors(&mut self, module: &CoreModule) {
        for type_def in &module.types {
            let mut param_map = HashMap::new();
            let mut vars = Vec::new();
            for p in &type_def.type_params {
                let tv = self.table.fresh_var();
                param_map.insert(p.clone(), tv);
                vars.push(tv);
            }
            let result_ty = Type::Named(
                type_def.name.clone(),
                vars.iter().map(|tv| Type::Var(*tv)).collect(),
            );
            for ctor in &type_def.ctors {
                let field_tys: Vec<Type> = ctor
                    .fields
                    .iter()
                    .map(|te| type_expr_to_type(te, &param_map, &mut self.table))
                    .collect();
                let body = if field_tys.is_empty() {
                    result_ty.clone()
                } else {
                    Type::func(field_tys, result_ty.clone(), EffectSet::new())
                };
                self.env.insert(
                    ctor.name.clone(),
                    Scheme {
                        vars: vars.clone(),
                        constraints: Vec::new(),
                        body,
                    },
                );
            }
        }
    }

    fn check_append_calls(&self) -> Result<(), TypeError> {
        for (ty, span) in &self.append_checks {
            let zonked = self.table.zonk(ty);
            match zonked {
                Type::String | Type::List(_) | Type::Var(_) => {}
                other => {
                    return Err(TypeError::NotAppendable {
                        span: *span,
                        op: "++".to_string(),
                        found: other,
                    })
                }
            }
        }
        Ok(())
    }

    fn infer_expr(&mut self, expr: &Expr) -> Result<Type, TypeError> {
        let span = expr.span();
        Ok(match expr {
            Expr::Lit { value, .. } => match value {
                Lit::Int(_) => Type::Int,
                Lit::Float(_) => Type::Float,
                Lit::Str(_) => Type::String,
                Lit::Bool(_) => Type::Bool,
                Lit::Unit => Type::Unit,
            },
            Expr::Var { name, .. } | Expr::VarGlobal { name, .. } => {
                let scheme = self
                    .env
                    .get(name)
                    .cloned()
                    .ok_or_else(|| TypeError::UnboundVariable {
                        span,
                        name: name.clone(),
                    })?;
                let (ty, constraints) = self.table.instantiate(&scheme);
                for (class, cty) in constraints {
                    self.obligations.push((class, cty, span));
                }
                ty
            }
            Expr::Lambda { params, body, .. } => {
                let param_vs: Vec<Type> = params.iter().map(|_| self.table.fresh()).collect();
                let saved = self.bind_params(params, &param_vs);
                let body_ty = self.infer_expr(body)?;
                self.restore(saved);
                Type::func(param_vs, body_ty, EffectSet::new())
            }
            Expr::App { func, args, .. } => {
                let func_ty = self.infer_expr(func)?;
                let arg_tys = args
                    .iter()
                    .map(|a| self.infer_expr(a))
                    .collect::<Result<Vec<_>, _>>()?;
                let ret = self.table.fresh();
                let expected = Type::func(arg_tys, ret.clone(), EffectSet::new());
                self.table.unify(&func_ty, &expected, span)?;
                ret
            }
            Expr::Let { name, value, body, .. } => {
                let vt = self.infer_expr(value)?;
                let free = self.env_free();
                let scheme = self.table.generalize(&vt, &free, &[]);
                let saved = (name.clone(), self.env.insert(name.clone(), scheme));
                let result = self.infer_expr(body)?;
                match saved.1 {
                    Some(s) => {
                        self.env.insert(saved.0, s);
                    }
                    None => {
                        self.env.remove(&saved.0);
                    }
                }
                result
            }
            Expr::LetRec { bindings, body, .. } => {
                let mut fresh: Vec<(String, Type)> = Vec::with_capacity(bindings.len());
                let mut saved = Vec::with_capacity(bindings.len());
                for (name, _) in bindings {
                    let tv = self.table.fresh();
                    saved.push((name.clone(), self.env.remove(name)));
                    self.env.insert(name.clone(), Scheme::monomorphic(tv.clone()));
                    fresh.push((name.clone(), tv));
                }
                for ((_, value), (_, tv)) in bindings.iter().zip(fresh.iter()) {
                    let vt = self.infer_expr(value)?;
                    self.table.unify(&vt, tv, span)?;
                }
                let free = self.env_free();
                for (name, tv) in &fresh {
                    let scheme = self.table.generalize(tv, &free, &[]);
                    self.env.insert(name.clone(), scheme);
                }
                let result = self.infer_expr(body)?;
                for (name, prev) in saved {
                    match prev {
                        Some(s) => {
                            self.env.insert(name, s);
                        }
                        None => {
                            self.env.remove(&name);
                        }
                    }
                }
                result
            }
            Expr::If {
                cond,
                then_branch,
                else_branch,
                ..
            } => {
                let ct = self.infer_expr(cond)?;
                self.table.unify(&ct, &Type::Bool, span)?;
                let tt = self.infer_expr(then_branch)?;
                let et = self.infer_expr(else_branch)?;
                self.table.unify(&tt, &et, span)?;
                tt
            }
            Expr::Match { scrutinee, arms, .. } => {
                let scrutinee_ty = self.infer_expr(scrutinee)?;
                let result_ty = self.table.fresh();
                for arm in arms {
                    let saved = self.infer_pattern(&arm.pattern, &scrutinee_ty)?;
                    if let Some(guard) = &arm.guard {
                        let gt = self.infer_expr(guard)?;
                        self.table.unify(&gt, &Type::Bool, guard.span())?;
                    }
                    let body_ty = self.infer_expr(&arm.body)?;
                    self.table.unify(&body_ty, &result_ty, arm.span)?;
                    self.restore(saved);
                }
                result_ty
            }
            Expr::Record { fields, .. } => {
                let mut field_tys = BTreeMap::new();
                for (name, value) in fields {
                    field_tys.insert(name.clone(), self.infer_expr(value)?);
                }
                Type::Record(RecordRow::closed(field_tys))
            }
            Expr::RecordUpdate { base, fields, .. } => {
                let base_ty = self.infer_expr(base)?;
                let mut update_fields = BTreeMap::new();
                for (name, value) in fields {
                    update_fields.insert(name.clone(), self.infer_expr(value)?);
                }
                let tail = self.table.fresh_var();
                let expected = Type::Record(RecordRow {
                    fields: update_fields,
                    tail: RowTail::Var(tail),
                });
                self.table.unify(&base_ty, &expected, span)?;
                base_ty
            }
            Expr::RecordAccess { base, field, .. } => {
                let base_ty = self.infer_expr(base)?;
                let field_ty = self.table.fresh();
                let tail = self.table.fresh_var();
                let expected = Type::Record(RecordRow {
                    fields: [(field.clone(), field_ty.clone())].into_iter().collect(),
                    tail: RowTail::Var(tail),
                });
                self.table.unify(&base_ty, &expected, span)?;
                field_ty
            }
            Expr::Tuple { items, .. } => Type::Tuple(
                items
                    .iter()
                    .map(|i| self.infer_expr(i))
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            Expr::List { items, .. } => {
                let elem = self.table.fresh();
                for item in items {
                    let it = self.infer_expr(item)?;
                    self.table.unify(&it, &elem, span)?;
                }
                Type::List(Box::new(elem))
            }
            Expr::Intrinsic { name, args, .. } => match name.as_str() {
                "and" | "or" => {
                    for a in args {
                        let at = self.infer_expr(a)?;
                        self.table.unify(&at, &Type::Bool, span)?;
                    }
                    Type::Bool
                }
                "not" => {
                    let at = self.infer_expr(&args[0])?;
                    self.table.unify(&at, &Type::Bool, span)?;
                    Type::Bool
                }
                "append" => {
                    let a0 = self.infer_expr(&args[0])?;
                    let a1 = self.infer_expr(&args[1])?;
                    self.table.unify(&a0, &a1, span)?;
                    self.append_checks.push((a0.clone(), span));
                    a0
                }
                other => unreachable!("unknown intrinsic '{other}'"),
            },
            Expr::ClassCall { class, method, args, .. } => {
                let arg_tys = args
                    .iter()
                    .map(|a| self.infer_expr(a))
                    .collect::<Result<Vec<_>, _>>()?;
                let common = arg_tys.first().cloned().unwrap_or(Type::Unit);
                for other in &arg_tys[1..] {
                    self.table.unify(&common, other, span)?;
                }
                self.obligations.push((class.clone(), common.clone(), span));
                match class.as_str() {
                    "Eq" | "Ord" => Type::Bool,
                    _ => {
                        let _ = method;
                        common
                    }
                }
            }
            Expr::DictRef { .. } | Expr::DictAbs { .. } | Expr::DictApp { .. } => {
                unreachable!("dictionary nodes only appear after class resolution")
            }
        })
    }

    /// Unify `scrutinee_ty` against the shape demanded by `pattern`, binding
    /// pattern variables monomorphically. Returns the saved env entries so
    /// the caller can restore them once the arm's body has been checked.
    fn infer_pattern(
        &mut self,
        pattern: &CorePattern,
        scrutinee_ty: &Type,
    ) -> Result<Vec<(String, Option<Scheme>)>, TypeError> {
        let span = pattern.span();
        let mut saved = Vec::new();
        match pattern {
            CorePattern::Var { name, .. } => {
                saved.push((name.clone(), self.env.remove(name)));
                self.env
                    .insert(name.clone(), Scheme::monomorphic(scrutinee_ty.clone()));
            }
            CorePattern::Wildcard { .. } => {}
            CorePattern::IntLit { .. } => {
                self.table.unify(scrutinee_ty, &Type::Int, span)?;
            }
            CorePattern::FloatLit { .. } => {
                self.table.unify(scrutinee_ty, &Type::Float, span)?;
            }
            CorePattern::StringLit { .. } => {
                self.table.unify(scrutinee_ty, &Type::String, span)?;
            }
            CorePattern::BoolLit { .. } => {
                self.table.unify(scrutinee_ty, &Type::Bool, span)?;
            }
            CorePattern::Tuple { items, .. } => {
                let item_tys: Vec<Type> = items.iter().map(|_| self.table.fresh()).collect();
                self.table
                    .unify(scrutinee_ty, &Type::Tuple(item_tys.clone()), span)?;
                for (p, t) in items.iter().zip(item_tys.iter()) {
                    saved.extend(self.infer_pattern(p, t)?);
                }
            }
            CorePattern::List { items, rest, .. } => {
                let elem = self.table.fresh();
                self.table
                    .unify(scrutinee_ty, &Type::List(Box::new(elem.clone())), span)?;
                for p in items {
                    saved.extend(self.infer_pattern(p, &elem)?);
                }
                if let Some(name) = rest {
                    saved.push((name.clone(), self.env.remove(name)));
                    self.env.insert(
                        name.clone(),
                        Scheme::monomorphic(Type::List(Box::new(elem))),
                    );
                }
            }
            CorePattern::Ctor { name, args, .. } => {
                let scheme = self
                    .env
                    .get(name)
                    .cloned()
                    .ok_or_else(|| TypeError::UnknownConstructor {
                        span,
                        name: name.clone(),
                    })?;
                let (ctor_ty, _) = self.table.instantiate(&scheme);
                let (param_tys, result_ty) = match ctor_ty {
                    Type::Func { params, ret, .. } => (params, *ret),
                    ground => (Vec::new(), ground),
                };
                self.table.unify(scrutinee_ty, &result_ty, span)?;
                for (p, t) in args.iter().zip(param_tys.iter()) {
                    saved.extend(self.infer_pattern(p, t)?);
                }
            }
        }
        Ok(saved)
    }
}

/// Convert a surface type annotation into an inference [`Type`], resolving
/// `type_params` (the enclosing declaration's generic parameters) to the
/// corresponding unification variables. A `TypeExpr::Var` not found in
/// `type_params` gets a fresh variable of its own via `table` (it can only
/// mean the surface declaration referenced a type variable it never bound).
fn type_expr_to_type(
    te: &TypeExpr,
    type_params: &HashMap<String, TyVar>,
    table: &mut UnificationTable,
) -> Type {
    match te {
        TypeExpr::Named { name, args, .. } => {
            if args.is_empty() {
                if let Some(tv) = type_params.get(name) {
                    return Type::Var(*tv);
                }
                match name.as_str() {
                    "Int" => return Type::Int,
                    "Float" => return Type::Float,
                    "String" => return Type::String,
                    "Bool" => return Type::Bool,
                    _ => {}
                }
            }
            Type::Named(
                name.clone(),
                args.iter()
                    .map(|a| type_expr_to_type(a, type_params, table))
                    .collect(),
            )
        }
        TypeExpr::Var { name, .. } => match type_params.get(name) {
            Some(tv) => Type::Var(*tv),
            None => table.fresh(),
        },
        TypeExpr::Func {
            params, ret, effects, ..
        } => Type::Func {
            params: params
                .iter()
                .map(|p| type_expr_to_type(p, type_params, table))
                .collect(),
            ret: Box::new(type_expr_to_type(ret, type_params, table)),
            effects: effects.iter().cloned().collect(),
        },
        TypeExpr::Tuple { items, .. } => Type::Tuple(
            items
                .iter()
                .map(|i| type_expr_to_type(i, type_params, table))
                .collect(),
        ),
        TypeExpr::List { item, .. } => {
            Type::List(Box::new(type_expr_to_type(item, type_params, table)))
        }
        TypeExpr::Record { fields, row_var, .. } => Type::Record(RecordRow {
            fields: fields
                .iter()
                .map(|(n, t)| (n.clone(), type_expr_to_type(t, type_params, table)))
                .collect(),
            tail: match row_var {
                Some(name) => match type_params.get(name) {
                    Some(tv) => RowTail::Var(*tv),
                    None => RowTail::Closed,
                },
                None => RowTail::Closed,
            },
        }),
        TypeExpr::Unit { .. } => Type::Unit,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ailang_ir::elaborate_program;
    use ailang_syntax::{parse_program, tokenize};

    fn infer_src(src: &str) -> InferOutput {
        let (tokens, lex_errors) = tokenize(src);
        assert!(lex_errors.is_empty(), "{lex_errors:?}");
        let (program, parse_errors) = parse_program(&tokens);
        assert!(parse_errors.is_empty(), "{parse_errors:?}");
        let (module, elab_errors) = elaborate_program(&program.unwrap());
        assert!(elab_errors.is_empty(), "{elab_errors:?}");
        infer_module(&module.unwrap()).expect("inference should succeed")
    }

    #[test]
    fn infers_identity_function_as_polymorphic() {
        let out = infer_src("func id(x) -> a = x");
        let scheme = &out.func_schemes["id"];
        assert_eq!(scheme.vars.len(), 1);
    }

    #[test]
    fn infers_arithmetic_pushes_num_obligation() {
        let out = infer_src("func add1(x) -> int = x + 1");
        assert!(out
            .obligations
            .iter()
            .any(|(class, _, _)| class == "Num"));
    }

    #[test]
    fn infers_comparison_as_bool() {
        let out = infer_src("func gt(x, y) -> bool = x > y");
        let scheme = &out.func_schemes["gt"];
        match &scheme.body {
            Type::Func { ret, .. } => assert_eq!(**ret, Type::Bool),
            other => panic!("expected function type, got {other:?}"),
        }
    }

    #[test]
    fn record_access_is_row_polymorphic() {
        let out = infer_src("func getX(r) -> int = r.x");
        let scheme = &out.func_schemes["getX"];
        assert!(!scheme.vars.is_empty());
        match &scheme.body {
            Type::Func { ret, .. } => assert_eq!(**ret, Type::Int),
            other => panic!("expected function type, got {other:?}"),
        }
    }

    #[test]
    fn mismatched_if_branches_is_a_type_error() {
        let (tokens, _) = tokenize("func f() -> int = if true then 1 else \"x\"");
        let (program, _) = parse_program(&tokens);
        let (module, _) = elaborate_program(&program.unwrap());
        let result = infer_module(&module.unwrap());
        assert!(result.is_err());
    }
}
