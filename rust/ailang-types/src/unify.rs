use std::collections::{BTreeMap, BTreeSet, HashMap};

use ailang_core::Span;

use crate::error::TypeError;
use crate::types::{RecordRow, RowTail, Scheme, TyVar, Type};

/// Union-find substitution table for Robinson unification over [`Type`],
/// including row unification for [`Type::Record`].
///
/// Mirrors the fresh/find/zonk shape of a conventional HM unifier: variables
/// are allocated by [`fresh`], resolved one step by [`find`], and fully
/// resolved (unbound vars left as-is) by [`zonk`].
pub struct UnificationTable {
    bindings: Vec<Option<Type>>,
}

impl Default for UnificationTable {
    fn default() -> Self {
        Self::new()
    }
}

impl UnificationTable {
    pub fn new() -> Self {
        UnificationTable {
            bindings: Vec::new(),
        }
    }

    pub fn fresh(&mut self) -> Type {
        Type::Var(self.fresh_var())
    }

    pub fn fresh_var(&mut self) -> TyVar {
        let id = self.bindings.len() as u32;
        self.bindings.push(None);
        TyVar(id)
    }

    /// Follow the binding chain for a variable; returns `Var(tv)` itself if
    /// unbound.
    pub fn find(&self, tv: TyVar) -> Type {
        let mut current = tv;
        loop {
            match &self.bindings[current.0 as usize] {
                None => return Type::Var(current),
                Some(Type::Var(next)) => current = *next,
                Some(ty) => return ty.clone(),
            }
        }
    }

    fn walk(&self, ty: &Type) -> Type {
        match ty {
            Type::Var(tv) => self.find(*tv),
            other => other.clone(),
        }
    }

    /// Resolve variables one level, but leave any that are still unbound as
    /// `Var`, recursing into compound types.
    pub fn zonk(&self, ty: &Type) -> Type {
        match self.walk(ty) {
            Type::Var(tv) => Type::Var(tv),
            Type::List(inner) => Type::List(Box::new(self.zonk(&inner))),
            Type::Tuple(items) => Type::Tuple(items.iter().map(|t| self.zonk(t)).collect()),
            Type::Record(row) => Type::Record(self.zonk_row(&row)),
            Type::Func {
                params,
                ret,
                effects,
            } => Type::Func {
                params: params.iter().map(|t| self.zonk(t)).collect(),
                ret: Box::new(self.zonk(&ret)),
                effects,
            },
            Type::Named(name, args) => {
                Type::Named(name, args.iter().map(|t| self.zonk(t)).collect())
            }
            ground => ground,
        }
    }

    fn zonk_row(&self, row: &RecordRow) -> RecordRow {
        let mut fields: BTreeMap<String, Type> = row
            .fields
            .iter()
            .map(|(k, v)| (k.clone(), self.zonk(v)))
            .collect();
        let tail = match &row.tail {
            RowTail::Closed => RowTail::Closed,
            RowTail::Var(tv) => match self.find(*tv) {
                Type::Var(tv2) => RowTail::Var(tv2),
                Type::Record(inner) => {
                    let inner = self.zonk_row(&inner);
                    fields.extend(inner.fields);
                    inner.tail
                }
                _ => RowTail::Closed,
            },
        };
        RecordRow { fields, tail }
    }

    pub fn instantiate(&mut self, scheme: &Scheme) -> (Type, Vec<(String, Type)>) {
        if scheme.vars.is_empty() {
            return (scheme.body.clone(), scheme.constraints.clone());
        }
        let subst: HashMap<TyVar, TyVar> = scheme
            .vars
            .iter()
            .map(|&old| (old, self.fresh_var()))
            .collect();
        let body = substitute_vars(&scheme.body, &subst);
        let constraints = scheme
            .constraints
            .iter()
            .map(|(class, ty)| (class.clone(), substitute_vars(ty, &subst)))
            .collect();
        (body, constraints)
    }

    /// Generalize `ty` over every variable free in it but not in `env_free`,
    /// attaching whichever `constraints` mention those variables.
    pub fn generalize(
        &self,
        ty: &Type,
        env_free: &BTreeSet<TyVar>,
        constraints: &[(String, Type)],
    ) -> Scheme {
        let zonked = self.zonk(ty);
        let mut free = BTreeSet::new();
        collect_free_vars(&zonked, &mut free);
        for tv in env_free {
            free.remove(tv);
        }
        let relevant_constraints = constraints
            .iter()
            .filter(|(_, cty)| {
                let zc = self.zonk(cty);
                let mut cfree = BTreeSet::new();
                collect_free_vars(&zc, &mut cfree);
                cfree.iter().any(|v| free.contains(v))
            })
            .cloned()
            .collect();
        Scheme {
            vars: free.into_iter().collect(),
            constraints: relevant_constraints,
            body: zonked,
        }
    }

    pub fn unify(&mut self, a: &Type, b: &Type, span: Span) -> Result<(), TypeError> {
        let a = self.walk(a);
        let b = self.walk(b);
        self.unify_walked(&a, &b, span)
    }

    fn unify_walked(&mut self, a: &Type, b: &Type, span: Span) -> Result<(), TypeError> {
        match (a, b) {
            (Type::Var(va), Type::Var(vb)) if va == vb => Ok(()),
            (Type::Var(tv), ty) | (ty, Type::Var(tv)) => {
                let tv = *tv;
                let ty = ty.clone();
                self.occurs_check(tv, &ty, span)?;
                self.bindings[tv.0 as usize] = Some(ty);
                Ok(())
            }
            (Type::Int, Type::Int)
            | (Type::Float, Type::Float)
            | (Type::String, Type::String)
            | (Type::Bool, Type::Bool)
            | (Type::Unit, Type::Unit) => Ok(()),
            (Type::List(ai), Type::List(bi)) => {
                let ai = (**ai).clone();
                let bi = (**bi).clone();
                self.unify(&ai, &bi, span)
            }
            (Type::Tuple(ai), Type::Tuple(bi)) => {
                if ai.len() != bi.len() {
                    return Err(TypeError::ArityMismatch {
                        span,
                        expected: ai.len(),
                        found: bi.len(),
                    });
                }
                let ai = ai.clone();
                let bi = bi.clone();
                for (x, y) in ai.iter().zip(bi.iter()) {
                    self.unify(x, y, span)?;
                }
                Ok(())
            }
            (Type::Named(na, aa), Type::Named(nb, ba)) => {
                if na != nb {
                    return Err(TypeError::Mismatch {
                        span,
                        expected: a.clone(),
                        found: b.clone(),
                    });
                }
                if aa.len() != ba.len() {
                    return Err(TypeError::ArityMismatch {
                        span,
                        expected: aa.len(),
                        found: ba.len(),
                    });
                }
                let aa = aa.clone();
                let ba = ba.clone();
                for (x, y) in aa.iter().zip(ba.iter()) {
                    self.unify(x, y, span)?;
                }
                Ok(())
            }
            (
                Type::Func {
                    params: ap,
                    ret: ar,
                    ..
                },
                Type::Func {
                    params: bp,
                    ret: br,
                    ..
                },
            ) => {
                if ap.len() != bp.len() {
                    return Err(TypeError::ArityMismatch {
                        span,
                        expected: ap.len(),
                        found: bp.len(),
                    });
                }
                let ap = ap.clone();
                let bp = bp.clone();
                let ar = (**ar).clone();
                let br = (**br).clone();
                for (x, y) in ap.iter().zip(bp.iter()) {
                    self.unify(x, y, span)?;
                }
                self.unify(&ar, &br, span)
            }
            (Type::Record(ra), Type::Record(rb)) => self.unify_rows(ra, rb, span),
            (a, b) => Err(TypeError::Mismatch {
                span,
                expected: a.clone(),
                found: b.clone(),
            }),
        }
    }

    fn unify_rows(&mut self, a: &RecordRow, b: &RecordRow, span: Span) -> Result<(), TypeError> {
        let a = self.resolve_row(a);
        let b = self.resolve_row(b);

        let common: Vec<String> = a
            .fields
            .keys()
            .filter(|k| b.fields.contains_key(*k))
            .cloned()
            .collect();
        for field in &common {
            let at = a.fields[field].clone();
            let bt = b.fields[field].clone();
            self.unify(&at, &bt, span)?;
        }

        let extra_a: BTreeMap<String, Type> = a
            .fields
            .iter()
            .filter(|(k, _)| !b.fields.contains_key(*k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let extra_b: BTreeMap<String, Type> = b
            .fields
            .iter()
            .filter(|(k, _)| !a.fields.contains_key(*k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        match (&a.tail, &b.tail) {
            (RowTail::Closed, RowTail::Closed) => {
                if !extra_a.is_empty() || !extra_b.is_empty() {
                    return Err(TypeError::RecordFieldMismatch {
                        span,
                        missing: extra_a.keys().chain(extra_b.keys()).cloned().collect(),
                    });
                }
                Ok(())
            }
            (RowTail::Closed, RowTail::Var(tv)) => {
                if !extra_b.is_empty() {
                    return Err(TypeError::RecordFieldMismatch {
                        span,
                        missing: extra_b.keys().cloned().collect(),
                    });
                }
                self.bindings[tv.0 as usize] = Some(Type::Record(RecordRow {
                    fields: extra_a,
                    tail: RowTail::Closed,
                }));
                Ok(())
            }
            (RowTail::Var(tv), RowTail::Closed) => {
                if !extra_a.is_empty() {
                    return Err(TypeError::RecordFieldMismatch {
                        span,
                        missing: extra_a.keys().cloned().collect(),
                    });
                }
                self.bindings[tv.0 as usize] = Some(Type::Record(RecordRow {
                    fields: extra_b,
                    tail: RowTail::Closed,
                }));
                Ok(())
            }
            (RowTail::Var(tva), RowTail::Var(tvb)) => {
                if tva == tvb {
                    if !extra_a.is_empty() || !extra_b.is_empty() {
                        return Err(TypeError::RecordFieldMismatch {
                            span,
                            missing: extra_a.keys().chain(extra_b.keys()).cloned().collect(),
                        });
                    }
                    return Ok(());
                }
                let fresh_tail = RowTail::Var(self.fresh_var());
                self.bindings[tva.0 as usize] = Some(Type::Record(RecordRow {
                    fields: extra_b,
                    tail: fresh_tail.clone(),
                }));
                self.bindings[tvb.0 as usize] = Some(Type::Record(RecordRow {
                    fields: extra_a,
                    tail: fresh_tail,
                }));
                Ok(())
            }
        }
    }

    /// Fully resolve a row's tail chain into one flat field map plus a
    /// final tail (either closed or an unbound variable).
    fn resolve_row(&self, row: &RecordRow) -> RecordRow {
        let mut fields = row.fields.clone();
        let mut tail = row.tail.clone();
        loop {
            match tail {
                RowTail::Closed => break,
                RowTail::Var(tv) => match self.find(tv) {
                    Type::Var(tv2) => {
                        tail = RowTail::Var(tv2);
                        break;
                    }
                    Type::Record(inner) => {
                        fields.extend(inner.fields);
                        tail = inner.tail;
                    }
                    _ => {
                        tail = RowTail::Closed;
                        break;
                    }
                },
            }
        }
        RecordRow { fields, tail }
    }

    fn occurs_check(&self, tv: TyVar, ty: &Type, span: Span) -> Result<(), TypeError> {
        let mut free = BTreeSet::new();
        collect_free_vars_through(self, ty, &mut free);
        if free.contains(&tv) {
            return Err(TypeError::InfiniteType {
                span,
                ty: ty.clone(),
            });
        }
        Ok(())
    }
}

fn substitute_vars(ty: &Type, subst: &HashMap<TyVar, TyVar>) -> Type {
    match ty {
        Type::Var(tv) => Type::Var(*subst.get(tv).unwrap_or(tv)),
        Type::List(inner) => Type::List(Box::new(substitute_vars(inner, subst))),
        Type::Tuple(items) => Type::Tuple(items.iter().map(|t| substitute_vars(t, subst)).collect()),
        Type::Record(row) => Type::Record(RecordRow {
            fields: row
                .fields
                .iter()
                .map(|(k, v)| (k.clone(), substitute_vars(v, subst)))
                .collect(),
            tail: match &row.tail {
                RowTail::Closed => RowTail::Closed,
                RowTail::Var(tv) => RowTail::Var(*subst.get(tv).unwrap_or(tv)),
            },
        }),
        Type::Func {
            params,
            ret,
            effects,
        } => Type::Func {
            params: params.iter().map(|t| substitute_vars(t, subst)).collect(),
            ret: Box::new(substitute_vars(ret, subst)),
            effects: effects.clone(),
        },
        Type::Named(name, args) => {
            Type::Named(name.clone(), args.iter().map(|t| substitute_vars(t, subst)).collect())
        }
        ground => ground.clone(),
    }
}

/// Collect free variables in a type *without* resolving bindings (used for
/// generalization, where `ty` is already zonked).
fn collect_free_vars(ty: &Type, out: &mut BTreeSet<TyVar>) {
    match ty {
        Type::Var(tv) => {
            out.insert(*tv);
        }
        Type::List(inner) => collect_free_vars(inner, out),
        Type::Tuple(items) => items.iter().for_each(|t| collect_free_vars(t, out)),
        Type::Record(row) => {
            row.fields.values().for_each(|t| collect_free_vars(t, out));
            if let RowTail::Var(tv) = &row.tail {
                out.insert(*tv);
            }
        }
        Type::Func { params, ret, .. } => {
            params.iter().for_each(|t| collect_free_vars(t, out));
            collect_free_vars(ret, out);
        }
        Type::Named(_, args) => args.iter().for_each(|t| collect_free_vars(t, out)),
        _ => {}
    }
}

/// Like [`collect_free_vars`] but resolves bound variables through `table`
/// first (used by the occurs check, where `ty` may still contain bound
/// variables reachable only through the substitution).
fn collect_free_vars_through(table: &UnificationTable, ty: &Type, out: &mut BTreeSet<TyVar>) {
    match ty {
        Type::Var(tv) => match table.find(*tv) {
            Type::Var(tv2) => {
                out.insert(tv2);
            }
            other => collect_free_vars_through(table, &other, out),
        },
        Type::List(inner) => collect_free_vars_through(table, inner, out),
        Type::Tuple(items) => items
            .iter()
            .for_each(|t| collect_free_vars_through(table, t, out)),
        Type::Record(row) => {
            row.fields
                .values()
                .for_each(|t| collect_free_vars_through(table, t, out));
            if let RowTail::Var(tv) = &row.tail {
                match table.find(*tv) {
                    Type::Var(tv2) => {
                        out.insert(tv2);
                    }
                    other => collect_free_vars_through(table, &other, out),
                }
            }
        }
        Type::Func { params, ret, .. } => {
            params
                .iter()
                .for_each(|t| collect_free_vars_through(table, t, out));
            collect_free_vars_through(table, ret, out);
        }
        Type::Named(_, args) => args
            .iter()
            .for_each(|t| collect_free_vars_through(table, t, out)),
        _ => {}
    }
}

/// Free variables of a type already resolved through `table`, for computing
/// the environment's free-variable set at generalization time.
pub fn env_free_vars(table: &UnificationTable, schemes: impl Iterator<Item = Type>) -> BTreeSet<TyVar> {
    let mut out = BTreeSet::new();
    for ty in schemes {
        collect_free_vars_through(table, &ty, &mut out);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dummy() -> Span {
        Span::dummy()
    }

    #[test]
    fn unify_identical_ground_types() {
        let mut t = UnificationTable::new();
        assert!(t.unify(&Type::Int, &Type::Int, dummy()).is_ok());
        assert!(t.unify(&Type::Int, &Type::String, dummy()).is_err());
    }

    #[test]
    fn unify_var_binds_and_zonks() {
        let mut t = UnificationTable::new();
        let v = t.fresh();
        t.unify(&v, &Type::Int, dummy()).unwrap();
        assert_eq!(t.zonk(&v), Type::Int);
    }

    #[test]
    fn occurs_check_rejects_infinite_type() {
        let mut t = UnificationTable::new();
        let tv = t.fresh_var();
        let circular = Type::List(Box::new(Type::Var(tv)));
        let result = t.unify(&Type::Var(tv), &circular, dummy());
        assert!(matches!(result, Err(TypeError::InfiniteType { .. })));
    }

    #[test]
    fn closed_records_unify_when_fields_match() {
        let mut t = UnificationTable::new();
        let a = Type::Record(RecordRow::closed(
            [("x".to_string(), Type::Int)].into_iter().collect(),
        ));
        let b = Type::Record(RecordRow::closed(
            [("x".to_string(), Type::Int)].into_iter().collect(),
        ));
        assert!(t.unify(&a, &b, dummy()).is_ok());
    }

    #[test]
    fn closed_records_with_different_fields_fail() {
        let mut t = UnificationTable::new();
        let a = Type::Record(RecordRow::closed(
            [("x".to_string(), Type::Int)].into_iter().collect(),
        ));
        let b = Type::Record(RecordRow::closed(
            [("y".to_string(), Type::Int)].into_iter().collect(),
        ));
        assert!(t.unify(&a, &b, dummy()).is_err());
    }

    #[test]
    fn open_row_unifies_with_superset_closed_row() {
        let mut t = UnificationTable::new();
        let tail = t.fresh_var();
        let open = Type::Record(RecordRow {
            fields: [("x".to_string(), Type::Int)].into_iter().collect(),
            tail: RowTail::Var(tail),
        });
        let closed = Type::Record(RecordRow::closed(
            [("x".to_string(), Type::Int), ("y".to_string(), Type::Bool)]
                .into_iter()
                .collect(),
        ));
        assert!(t.unify(&open, &closed, dummy()).is_ok());
        match t.find(tail) {
            Type::Record(row) => {
                assert_eq!(row.fields.get("y"), Some(&Type::Bool));
            }
            other => panic!("expected resolved row, got {other:?}"),
        }
    }

    #[test]
    fn generalize_abstracts_only_free_vars() {
        let mut t = UnificationTable::new();
        let a = t.fresh_var();
        let b = t.fresh_var();
        // Bind `b` so it's not free; `a` stays free.
        t.unify(&Type::Var(b), &Type::Int, dummy()).unwrap();
        let ty = Type::Tuple(vec![Type::Var(a), Type::Var(b)]);
        let scheme = t.generalize(&ty, &BTreeSet::new(), &[]);
        assert_eq!(scheme.vars, vec![a]);
    }

    #[test]
    fn instantiate_produces_fresh_vars_per_call() {
        let mut t = UnificationTable::new();
        let a = t.fresh_var();
        let scheme = Scheme {
            vars: vec![a],
            constraints: vec![("Num".to_string(), Type::Var(a))],
            body: Type::func(vec![Type::Var(a)], Type::Var(a), BTreeSet::new()),
        };
        let (ty1, c1) = t.instantiate(&scheme);
        let (ty2, c2) = t.instantiate(&scheme);
        assert_ne!(ty1, ty2);
        assert_eq!(c1.len(), 1);
        assert_eq!(c2.len(), 1);
    }
}
