//! Runtime values, environments, the effect context, the builtin registry,
//! and the tree-walking evaluator for AILANG's Core IR.

mod builtins;
mod effects;
mod env;
mod error;
mod eval;
mod value;

pub use effects::EffectContext;
pub use env::Env;
pub use error::RuntimeError;
pub use eval::{EvalConfig, Evaluator, GlobalResolver, NoGlobals};
pub use value::{show, BuiltinValue, Cell, FunctionValue, TaggedValue, Value};
