use ailang_core::Span;
use ailang_syntax::TypeExpr;
use serde::{Deserialize, Serialize};

/// A literal value surviving elaboration unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Lit {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    Unit,
}

/// Core IR: the desugared, operator-free tree type inference and the
/// evaluator both work over. Surface operators are gone by this point —
/// non-overloaded ones (`&& || ++` unary `not`) become [`Expr::Intrinsic`],
/// overloaded ones (`+ - * / % == != < <= > >=`) become [`Expr::ClassCall`],
/// later rewritten to explicit dictionary passing by the class-resolution
/// pass (`DictRef` / `DictAbs` / `DictApp`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Var { name: String, span: Span },
    VarGlobal { module: String, name: String, span: Span },
    Lit { value: Lit, span: Span },
    Lambda { params: Vec<String>, body: Box<Expr>, span: Span },
    App { func: Box<Expr>, args: Vec<Expr>, span: Span },
    Let { name: String, value: Box<Expr>, body: Box<Expr>, span: Span },
    LetRec { bindings: Vec<(String, Expr)>, body: Box<Expr>, span: Span },
    If { cond: Box<Expr>, then_branch: Box<Expr>, else_branch: Box<Expr>, span: Span },
    Match { scrutinee: Box<Expr>, arms: Vec<CoreArm>, span: Span },
    Record { fields: Vec<(String, Expr)>, span: Span },
    RecordUpdate { base: Box<Expr>, fields: Vec<(String, Expr)>, span: Span },
    RecordAccess { base: Box<Expr>, field: String, span: Span },
    List { items: Vec<Expr>, span: Span },
    Tuple { items: Vec<Expr>, span: Span },
    /// A non-overloaded primitive operation: `and`, `or`, `append`, `not`.
    Intrinsic { name: String, args: Vec<Expr>, span: Span },
    /// An overloaded operator call pending class resolution.
    ClassCall { class: String, method: String, args: Vec<Expr>, span: Span },
    /// A reference to the dictionary for `class` at the (post-resolution)
    /// concrete type `ty`. Only produced by the class-resolution pass.
    DictRef { class: String, ty: String, span: Span },
    /// A dictionary-polymorphic function: `body` expects a dictionary bound
    /// to `param` before it can run. Only produced by class resolution.
    DictAbs { class: String, param: String, body: Box<Expr>, span: Span },
    /// Application of a dictionary-polymorphic function to a resolved
    /// dictionary. Only produced by class resolution.
    DictApp { func: Box<Expr>, dict: Box<Expr>, span: Span },
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Var { span, .. }
            | Expr::VarGlobal { span, .. }
            | Expr::Lit { span, .. }
            | Expr::Lambda { span, .. }
            | Expr::App { span, .. }
            | Expr::Let { span, .. }
            | Expr::LetRec { span, .. }
            | Expr::If { span, .. }
            | Expr::Match { span, .. }
            | Expr::Record { span, .. }
            | Expr::RecordUpdate { span, .. }
            | Expr::RecordAccess { span, .. }
            | Expr::List { span, .. }
            | Expr::Tuple { span, .. }
            | Expr::Intrinsic { span, .. }
            | Expr::ClassCall { span, .. }
            | Expr::DictRef { span, .. }
            | Expr::DictAbs { span, .. }
            | Expr::DictApp { span, .. } => *span,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CorePattern {
    Var { name: String, span: Span },
    Wildcard { span: Span },
    IntLit { value: i64, span: Span },
    FloatLit { value: f64, span: Span },
    StringLit { value: String, span: Span },
    BoolLit { value: bool, span: Span },
    Tuple { items: Vec<CorePattern>, span: Span },
    List { items: Vec<CorePattern>, rest: Option<String>, span: Span },
    Ctor { name: String, args: Vec<CorePattern>, span: Span },
}

impl CorePattern {
    pub fn span(&self) -> Span {
        match self {
            CorePattern::Var { span, .. }
            | CorePattern::Wildcard { span }
            | CorePattern::IntLit { span, .. }
            | CorePattern::FloatLit { span, .. }
            | CorePattern::StringLit { span, .. }
            | CorePattern::BoolLit { span, .. }
            | CorePattern::Tuple { span, .. }
            | CorePattern::List { span, .. }
            | CorePattern::Ctor { span, .. } => *span,
        }
    }

    /// Names this pattern binds, in left-to-right order (used by the
    /// evaluator to build the child scope for a matched arm).
    pub fn bound_names(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_bound_names(&mut out);
        out
    }

    fn collect_bound_names(&self, out: &mut Vec<String>) {
        match self {
            CorePattern::Var { name, .. } => out.push(name.clone()),
            CorePattern::Tuple { items, .. } => {
                for item in items {
                    item.collect_bound_names(out);
                }
            }
            CorePattern::List { items, rest, .. } => {
                for item in items {
                    item.collect_bound_names(out);
                }
                if let Some(name) = rest {
                    out.push(name.clone());
                }
            }
            CorePattern::Ctor { args, .. } => {
                for arg in args {
                    arg.collect_bound_names(out);
                }
            }
            CorePattern::Wildcard { .. }
            | CorePattern::IntLit { .. }
            | CorePattern::FloatLit { .. }
            | CorePattern::StringLit { .. }
            | CorePattern::BoolLit { .. } => {}
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoreArm {
    pub pattern: CorePattern,
    pub guard: Option<Expr>,
    pub body: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoreFunc {
    pub name: String,
    pub exported: bool,
    pub params: Vec<String>,
    pub body: Expr,
    pub span: Span,
}

/// A constructor of a sum type: its name and field arity, enough for the
/// evaluator to build and match `Tagged` values without re-reading the AST.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoreCtor {
    pub name: String,
    pub arity: usize,
    /// Declared field types, in order. Kept as surface [`TypeExpr`] rather
    /// than a resolved `Type` so this crate does not need to depend on the
    /// type-inference crate; ailang-types converts these during env setup.
    pub fields: Vec<TypeExpr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoreTypeDef {
    pub name: String,
    pub type_params: Vec<String>,
    pub ctors: Vec<CoreCtor>,
}

/// The elaborated form of one module: its type declarations (for constructor
/// arity lookups), its function declarations (mutually recursive at module
/// scope), and any bare top-level expressions evaluated in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoreModule {
    pub module_path: Vec<String>,
    pub types: Vec<CoreTypeDef>,
    pub funcs: Vec<CoreFunc>,
    /// Top-level `let`/bare-expression items, in source order. A `let`
    /// without `in` extends the scope visible to subsequent entries,
    /// mirroring how a `{ e1; e2 }` block sequences expressions.
    pub top_level: Vec<TopLevelItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TopLevelItem {
    Let { name: String, value: Expr },
    Expr(Expr),
}
