//! Core IR and the elaborator that lowers AILANG's surface AST into it.

mod core;
mod decision_tree;
mod elaborate;
mod error;

pub use core::{
    CoreArm, CoreCtor, CoreFunc, CoreModule, CorePattern, CoreTypeDef, Expr, Lit, TopLevelItem,
};
pub use decision_tree::{compile as compile_decision_tree, DecisionTree, Discriminant, Path, PathStep, SwitchCase};
pub use elaborate::{elaborate_expr, elaborate_program};
pub use error::ElaborateError;
