use ailang_core::Span;
use serde::{Deserialize, Serialize};

/// The canonical set of effect labels AILANG programs may declare.
pub const EFFECT_LABELS: &[&str] = &["IO", "FS", "Net", "Clock", "Rand", "DB", "Trace", "Async"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub module: Option<ModuleDecl>,
    pub imports: Vec<ImportDecl>,
    pub items: Vec<Item>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleDecl {
    pub path: Vec<String>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportDecl {
    pub path: Vec<String>,
    pub names: Vec<String>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Item {
    Func(FuncDecl),
    Type(TypeDecl),
    Expr(Expr),
}

impl Item {
    pub fn span(&self) -> Span {
        match self {
            Item::Func(f) => f.span,
            Item::Type(t) => t.span,
            Item::Expr(e) => e.span(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuncDecl {
    pub name: String,
    pub exported: bool,
    pub pure: bool,
    pub type_params: Vec<String>,
    pub params: Vec<Param>,
    pub return_type: Option<TypeExpr>,
    pub effects: Vec<EffectAnn>,
    pub body: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub ty: Option<TypeExpr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectAnn {
    pub label: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDecl {
    pub name: String,
    pub exported: bool,
    pub type_params: Vec<String>,
    pub body: TypeDeclBody,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TypeDeclBody {
    Alias(TypeExpr),
    Record(Vec<FieldDef>),
    Sum(Vec<VariantDef>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub ty: TypeExpr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantDef {
    pub ctor: String,
    pub fields: Vec<TypeExpr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TypeExpr {
    Named { name: String, args: Vec<TypeExpr>, span: Span },
    Var { name: String, span: Span },
    Func { params: Vec<TypeExpr>, ret: Box<TypeExpr>, effects: Vec<String>, span: Span },
    Tuple { items: Vec<TypeExpr>, span: Span },
    List { item: Box<TypeExpr>, span: Span },
    Record { fields: Vec<(String, TypeExpr)>, row_var: Option<String>, span: Span },
    Unit { span: Span },
}

impl TypeExpr {
    pub fn span(&self) -> Span {
        match self {
            TypeExpr::Named { span, .. }
            | TypeExpr::Var { span, .. }
            | TypeExpr::Func { span, .. }
            | TypeExpr::Tuple { span, .. }
            | TypeExpr::List { span, .. }
            | TypeExpr::Record { span, .. }
            | TypeExpr::Unit { span } => *span,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Append,
}

impl BinOp {
    /// True for the overloaded (type-class dispatched) operators; false for
    /// the non-overloaded ones lowered straight to `Intrinsic`.
    pub fn is_overloaded(self) -> bool {
        !matches!(self, BinOp::And | BinOp::Or | BinOp::Append)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    IntLit { value: i64, span: Span },
    FloatLit { value: f64, span: Span },
    StringLit { value: String, span: Span },
    BoolLit { value: bool, span: Span },
    UnitLit { span: Span },
    Ident { name: String, span: Span },
    Unary { op: UnOp, expr: Box<Expr>, span: Span },
    Binary { op: BinOp, lhs: Box<Expr>, rhs: Box<Expr>, span: Span },
    If { cond: Box<Expr>, then_branch: Box<Expr>, else_branch: Box<Expr>, span: Span },
    Let { name: String, ty: Option<TypeExpr>, value: Box<Expr>, body: Option<Box<Expr>>, span: Span },
    LetRec { bindings: Vec<(String, Expr)>, body: Box<Expr>, span: Span },
    Lambda { params: Vec<String>, effects: Vec<EffectAnn>, body: Box<Expr>, span: Span },
    App { func: Box<Expr>, args: Vec<Expr>, span: Span },
    Match { scrutinee: Box<Expr>, arms: Vec<MatchArm>, span: Span },
    Tuple { items: Vec<Expr>, span: Span },
    List { items: Vec<Expr>, span: Span },
    Record { fields: Vec<(String, Expr)>, span: Span },
    RecordUpdate { base: Box<Expr>, fields: Vec<(String, Expr)>, span: Span },
    RecordAccess { base: Box<Expr>, field: String, span: Span },
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::IntLit { span, .. }
            | Expr::FloatLit { span, .. }
            | Expr::StringLit { span, .. }
            | Expr::BoolLit { span, .. }
            | Expr::UnitLit { span }
            | Expr::Ident { span, .. }
            | Expr::Unary { span, .. }
            | Expr::Binary { span, .. }
            | Expr::If { span, .. }
            | Expr::Let { span, .. }
            | Expr::LetRec { span, .. }
            | Expr::Lambda { span, .. }
            | Expr::App { span, .. }
            | Expr::Match { span, .. }
            | Expr::Tuple { span, .. }
            | Expr::List { span, .. }
            | Expr::Record { span, .. }
            | Expr::RecordUpdate { span, .. }
            | Expr::RecordAccess { span, .. } => *span,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchArm {
    pub pattern: Pattern,
    pub guard: Option<Expr>,
    pub body: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Pattern {
    Var { name: String, span: Span },
    Wildcard { span: Span },
    IntLit { value: i64, span: Span },
    FloatLit { value: f64, span: Span },
    StringLit { value: String, span: Span },
    BoolLit { value: bool, span: Span },
    Tuple { items: Vec<Pattern>, span: Span },
    List { items: Vec<Pattern>, rest: Option<String>, span: Span },
    Ctor { name: String, args: Vec<Pattern>, span: Span },
}

impl Pattern {
    pub fn span(&self) -> Span {
        match self {
            Pattern::Var { span, .. }
            | Pattern::Wildcard { span }
            | Pattern::IntLit { span, .. }
            | Pattern::FloatLit { span, .. }
            | Pattern::StringLit { span, .. }
            | Pattern::BoolLit { span, .. }
            | Pattern::Tuple { span, .. }
            | Pattern::List { span, .. }
            | Pattern::Ctor { span, .. } => *span,
        }
    }
}
