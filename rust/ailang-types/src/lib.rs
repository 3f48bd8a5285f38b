//! Row-polymorphic Hindley–Milner type inference, type-class dictionary
//! resolution, and the unification table both ride on.

mod classes;
mod dict;
mod error;
mod infer;
mod types;
mod unify;

pub use classes::{superclass_of, ClassRegistry};
pub use dict::{resolve_classes, DictResolved};
pub use error::{ClassError, TypeError};
pub use infer::{infer_module, InferOutput};
pub use types::{EffectSet, RecordRow, RowTail, Scheme, TyVar, Type};
pub use unify::UnificationTable;
