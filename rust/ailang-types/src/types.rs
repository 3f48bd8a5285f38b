use std::collections::{BTreeMap, BTreeSet};

/// A unification variable. Shared between ordinary type positions and record
/// row tails; [`UnificationTable`] tags each binding by how it was created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TyVar(pub u32);

/// The open/closed tail of a record row.
#[derive(Debug, Clone, PartialEq)]
pub enum RowTail {
    Closed,
    Var(TyVar),
}

/// A record's field types plus its tail: `{ x: Int, y: Int | r }` is
/// `Row { fields: {x: Int, y: Int}, tail: Var(r) }`.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordRow {
    pub fields: BTreeMap<String, Type>,
    pub tail: RowTail,
}

impl RecordRow {
    pub fn closed(fields: BTreeMap<String, Type>) -> Self {
        RecordRow {
            fields,
            tail: RowTail::Closed,
        }
    }
}

/// The effect capabilities a function declares it may use. Unlike record
/// rows, effect sets are treated as closed: AILANG's effect polymorphism is
/// enforced primarily at runtime by `EffectContext` capability grants, so the
/// type level only needs to compare declared sets, not unify open tails.
pub type EffectSet = BTreeSet<String>;

#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Int,
    Float,
    String,
    Bool,
    Unit,
    Var(TyVar),
    List(Box<Type>),
    Tuple(Vec<Type>),
    Record(RecordRow),
    Func {
        params: Vec<Type>,
        ret: Box<Type>,
        effects: EffectSet,
    },
    /// A user-defined (sum) type, by name, with instantiated type arguments.
    Named(String, Vec<Type>),
}

impl Type {
    pub fn func(params: Vec<Type>, ret: Type, effects: EffectSet) -> Type {
        Type::Func {
            params,
            ret: Box::new(ret),
            effects,
        }
    }

    /// A short, stable name for type-class dictionary lookup: classes are
    /// keyed by this string, not by full structural equality.
    pub fn head_name(&self) -> Option<String> {
        match self {
            Type::Int => Some("Int".to_string()),
            Type::Float => Some("Float".to_string()),
            Type::String => Some("String".to_string()),
            Type::Bool => Some("Bool".to_string()),
            Type::Unit => Some("Unit".to_string()),
            Type::List(_) => Some("List".to_string()),
            Type::Tuple(items) => Some(format!("Tuple{}", items.len())),
            Type::Record(_) => Some("Record".to_string()),
            Type::Named(name, _) => Some(name.clone()),
            Type::Func { .. } | Type::Var(_) => None,
        }
    }
}

/// A (possibly) polymorphic type with class constraints on its bound
/// variables, e.g. `forall a. Num a => a -> a -> a`.
#[derive(Debug, Clone, PartialEq)]
pub struct Scheme {
    pub vars: Vec<TyVar>,
    pub constraints: Vec<(String, Type)>,
    pub body: Type,
}

impl Scheme {
    pub fn monomorphic(ty: Type) -> Scheme {
        Scheme {
            vars: Vec::new(),
            constraints: Vec::new(),
            body: ty,
        }
    }
}
