use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::io::BufRead;
use std::rc::Rc;

use ailang_core::Span;
use ailang_ir::{
    compile_decision_tree, CoreArm, CoreCtor, CoreModule, CorePattern, CoreTypeDef, DecisionTree,
    Discriminant, Expr, Lit, PathStep, TopLevelItem,
};

use crate::builtins;
use crate::effects::EffectContext;
use crate::env::Env;
use crate::error::RuntimeError;
use crate::value::{BuiltinValue, Cell, FunctionValue, Value};

#[derive(Debug, Clone)]
pub struct EvalConfig {
    pub max_recursion_depth: usize,
    pub use_decision_tree: bool,
}

impl Default for EvalConfig {
    fn default() -> Self {
        EvalConfig {
            max_recursion_depth: 10_000,
            use_decision_tree: false,
        }
    }
}

/// Resolves a `module/name` cross-module reference. Loading other modules
/// from the filesystem is out of scope for this crate; the default resolver
/// always fails, surfacing `MOD_UNRESOLVED_GLOBAL`. An embedding host that
/// does its own module loading supplies a real implementation.
pub trait GlobalResolver {
    fn resolve(&self, module: &str, name: &str) -> Option<Value>;
}

pub struct NoGlobals;

impl GlobalResolver for NoGlobals {
    fn resolve(&self, _module: &str, _name: &str) -> Option<Value> {
        None
    }
}

static NO_GLOBALS: NoGlobals = NoGlobals;

/// The tree-walking evaluator. Holds only read-only configuration, the
/// effect capability grant, and the process-wide builtin/dictionary
/// registry — per-call state (environments, recursion depth) is threaded
/// through `eval_expr` explicitly rather than kept here.
pub struct Evaluator<'a> {
    config: EvalConfig,
    effects: EffectContext,
    resolver: &'a dyn GlobalResolver,
    builtins: HashMap<String, Value>,
}

impl<'a> Evaluator<'a> {
    pub fn new(config: EvalConfig, effects: EffectContext) -> Evaluator<'a> {
        Evaluator {
            config,
            effects,
            resolver: &NO_GLOBALS,
            builtins: builtins::prelude().into_iter().collect(),
        }
    }

    pub fn with_resolver(mut self, resolver: &'a dyn GlobalResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Replace the default `_io_readLine` (real stdin) with one reading
    /// from the given handle, for host embedding and tests.
    pub fn with_stdin(mut self, stdin: Rc<RefCell<dyn BufRead>>) -> Self {
        for (name, value) in builtins::io_with_stdin(stdin) {
            self.builtins.insert(name, value);
        }
        self
    }

    fn root_env(&self) -> Env {
        let env = Env::root();
        for (name, value) in &self.builtins {
            env.define(name.clone(), value.clone());
        }
        env
    }

    /// Looks up the method-record dictionary for a resolved `(class, type)`
    /// instance, built from the same builtins the prelude installs. Mirrors
    /// `overloaded_op_class_method`'s method-name mapping in `ailang-ir`.
    fn class_dictionary(&self, class: &str, ty: &str) -> Option<Value> {
        let methods: &[(&str, &str)] = match (class, ty) {
            ("Num", "Int") => &[
                ("add", "add_Int"),
                ("sub", "sub_Int"),
                ("mul", "mul_Int"),
                ("div", "div_Int"),
                ("mod", "mod_Int"),
            ],
            ("Num", "Float") => &[
                ("add", "add_Float"),
                ("sub", "sub_Float"),
                ("mul", "mul_Float"),
                ("div", "div_Float"),
                ("mod", "mod_Float"),
            ],
            ("Eq", "Int") => &[("eq", "eq_Int"), ("neq", "ne_Int")],
            ("Eq", "Float") => &[("eq", "eq_Float"), ("neq", "ne_Float")],
            ("Eq", "String") => &[("eq", "eq_String"), ("neq", "ne_String")],
            ("Eq", "Bool") => &[("eq", "eq_Bool"), ("neq", "ne_Bool")],
            ("Ord", "Int") => &[
                ("lt", "lt_Int"),
                ("lte", "le_Int"),
                ("gt", "gt_Int"),
                ("gte", "ge_Int"),
            ],
            ("Ord", "Float") => &[
                ("lt", "lt_Float"),
                ("lte", "le_Float"),
                ("gt", "gt_Float"),
                ("gte", "ge_Float"),
            ],
            ("Ord", "String") => &[
                ("lt", "lt_String"),
                ("lte", "le_String"),
                ("gt", "gt_String"),
                ("gte", "ge_String"),
            ],
            _ => return None,
        };
        let mut fields = BTreeMap::new();
        for (field, builtin_name) in methods {
            fields.insert((*field).to_string(), self.builtins.get(*builtin_name)?.clone());
        }
        Some(Value::record(fields))
    }

    fn make_ctor_value(&self, type_def: &CoreTypeDef, ctor: &CoreCtor) -> Value {
        if ctor.arity == 0 {
            return Value::tagged(type_def.name.clone(), ctor.name.clone(), vec![]);
        }
        let type_name = type_def.name.clone();
        let ctor_name = ctor.name.clone();
        Value::Builtin(Rc::new(BuiltinValue {
            name: ctor.name.clone(),
            arity: ctor.arity,
            effect: None,
            func: Box::new(move |args, _ctx| {
                Ok(Value::tagged(type_name.clone(), ctor_name.clone(), args.to_vec()))
            }),
        }))
    }

    /// Evaluates a module's functions and top-level items in declaration
    /// order, returning the value of the last top-level expression (or
    /// `Unit` if the module has none).
    pub fn eval_module(&self, module: &CoreModule) -> Result<Value, RuntimeError> {
        let env = self.root_env();
        for type_def in &module.types {
            for ctor in &type_def.ctors {
                env.define(ctor.name.clone(), self.make_ctor_value(type_def, ctor));
            }
        }
        // Module-level funcs are mutually recursive by construction: each
        // closure captures `env`, which already holds every sibling func's
        // binding by the time any of them run.
        for f in &module.funcs {
            env.define(
                f.name.clone(),
                Value::Function(Rc::new(FunctionValue {
                    params: f.params.clone(),
                    body: f.body.clone(),
                    env: env.clone(),
                })),
            );
        }
        let mut result = Value::Unit;
        for item in &module.top_level {
            match item {
                TopLevelItem::Let { name, value } => {
                    let v = self.eval_expr(value, &env, 0)?;
                    env.define(name.clone(), v);
                }
                TopLevelItem::Expr(e) => {
                    result = self.eval_expr(e, &env, 0)?;
                }
            }
        }
        Ok(result)
    }

    fn force(&self, value: Value, span: Span) -> Result<Value, RuntimeError> {
        match value {
            Value::Indirect(cell) => {
                let borrowed = cell.borrow();
                match &*borrowed {
                    Cell::Initialized(v) => Ok(v.clone()),
                    Cell::Visiting => Err(RuntimeError::VisitingLetRec { span }),
                    Cell::Uninitialized => Err(RuntimeError::UninitializedLetRec { span }),
                }
            }
            other => Ok(other),
        }
    }

    fn apply(&self, func: Value, args: Vec<Value>, span: Span, depth: usize) -> Result<Value, RuntimeError> {
        match func {
            Value::Function(f) => {
                if depth >= self.config.max_recursion_depth {
                    return Err(RuntimeError::RecursionLimit {
                        span,
                        max: self.config.max_recursion_depth,
                    });
                }
                if args.len() != f.params.len() {
                    return Err(RuntimeError::internal(
                        span,
                        format!("function expects {} argument(s), got {}", f.params.len(), args.len()),
                    ));
                }
                let call_env = f.env.child();
                for (p, a) in f.params.iter().zip(args) {
                    call_env.define(p.clone(), a);
                }
                self.eval_expr(&f.body, &call_env, depth + 1)
            }
            Value::Builtin(b) => {
                if args.len() != b.arity {
                    return Err(RuntimeError::ArityMismatchBuiltin {
                        span,
                        builtin: b.name.clone(),
                        expected: b.arity,
                        found: args.len(),
                    });
                }
                (b.func)(&args, &self.effects).map_err(|e| respan(e, span))
            }
            _ => Err(RuntimeError::NotCallable { span }),
        }
    }

    pub fn eval_expr(&self, expr: &Expr, env: &Env, depth: usize) -> Result<Value, RuntimeError> {
        match expr {
            Expr::Var { name, span } => {
                let v = env
                    .get(name)
                    .ok_or_else(|| RuntimeError::internal(*span, format!("unbound variable '{name}'")))?;
                self.force(v, *span)
            }
            Expr::VarGlobal { module, name, span } => self.resolver.resolve(module, name).ok_or_else(|| {
                RuntimeError::UnresolvedGlobal {
                    span: *span,
                    module: module.clone(),
                    name: name.clone(),
                }
            }),
            Expr::Lit { value, .. } => Ok(match value {
                Lit::Int(n) => Value::Int(*n),
                Lit::Float(f) => Value::Float(*f),
                Lit::Str(s) => Value::str(s.clone()),
                Lit::Bool(b) => Value::Bool(*b),
                Lit::Unit => Value::Unit,
            }),
            Expr::Lambda { params, body, .. } => Ok(Value::Function(Rc::new(FunctionValue {
                params: params.clone(),
                body: (**body).clone(),
                env: env.clone(),
            }))),
            Expr::App { func, args, span } => {
                let f = self.eval_expr(func, env, depth)?;
                let mut values = Vec::with_capacity(args.len());
                for a in args {
                    values.push(self.eval_expr(a, env, depth)?);
                }
                self.apply(f, values, *span, depth)
            }
            Expr::Let { name, value, body, .. } => {
                let v = self.eval_expr(value, env, depth)?;
                let child = env.child();
                child.define(name.clone(), v);
                self.eval_expr(body, &child, depth)
            }
            Expr::LetRec { bindings, body, .. } => {
                let child = env.child();
                let cells: Vec<Rc<RefCell<Cell>>> = bindings
                    .iter()
                    .map(|_| Rc::new(RefCell::new(Cell::Uninitialized)))
                    .collect();
                for ((name, _), cell) in bindings.iter().zip(&cells) {
                    child.define(name.clone(), Value::Indirect(cell.clone()));
                }
                for ((_, rhs), cell) in bindings.iter().zip(&cells) {
                    match rhs {
                        Expr::Lambda { params, body: lbody, .. } => {
                            let f = Value::Function(Rc::new(FunctionValue {
                                params: params.clone(),
                                body: (**lbody).clone(),
                                env: child.clone(),
                            }));
                            *cell.borrow_mut() = Cell::Initialized(f);
                        }
                        _ => {
                            *cell.borrow_mut() = Cell::Visiting;
                            let v = self.eval_expr(rhs, &child, depth)?;
                            *cell.borrow_mut() = Cell::Initialized(v);
                        }
                    }
                }
                self.eval_expr(body, &child, depth)
            }
            Expr::If {
                cond,
                then_branch,
                else_branch,
                span,
            } => match self.eval_expr(cond, env, depth)? {
                Value::Bool(true) => self.eval_expr(then_branch, env, depth),
                Value::Bool(false) => self.eval_expr(else_branch, env, depth),
                _ => Err(RuntimeError::internal(*span, "if condition must be a Bool")),
            },
            Expr::Match { scrutinee, arms, span } => {
                let v = self.eval_expr(scrutinee, env, depth)?;
                if self.config.use_decision_tree {
                    let tree = compile_decision_tree(arms);
                    return self.eval_decision_tree(&tree, arms, &v, env, depth, *span);
                }
                for arm in arms {
                    let Some(bindings) = match_pattern(&arm.pattern, &v) else {
                        continue;
                    };
                    let child = env.child();
                    for (name, val) in bindings {
                        child.define(name, val);
                    }
                    if let Some(guard) = &arm.guard {
                        match self.eval_expr(guard, &child, depth)? {
                            Value::Bool(true) => return self.eval_expr(&arm.body, &child, depth),
                            Value::Bool(false) => continue,
                            _ => return Err(RuntimeError::GuardNotBool { span: guard.span() }),
                        }
                    }
                    return self.eval_expr(&arm.body, &child, depth);
                }
                Err(RuntimeError::NonExhaustiveMatch { span: *span })
            }
            Expr::Record { fields, .. } => {
                let mut map = BTreeMap::new();
                for (k, e) in fields {
                    map.insert(k.clone(), self.eval_expr(e, env, depth)?);
                }
                Ok(Value::record(map))
            }
            Expr::RecordUpdate { base, fields, span } => match self.eval_expr(base, env, depth)? {
                Value::Record(rec) => {
                    let mut map = (*rec).clone();
                    for (k, e) in fields {
                        map.insert(k.clone(), self.eval_expr(e, env, depth)?);
                    }
                    Ok(Value::record(map))
                }
                _ => Err(RuntimeError::internal(*span, "record update base is not a Record")),
            },
            Expr::RecordAccess { base, field, span } => match self.eval_expr(base, env, depth)? {
                Value::Record(rec) => rec.get(field).cloned().ok_or_else(|| RuntimeError::MissingField {
                    span: *span,
                    field: field.clone(),
                }),
                _ => Err(RuntimeError::internal(*span, "record access base is not a Record")),
            },
            Expr::List { items, .. } => {
                let mut out = Vec::with_capacity(items.len());
                for i in items {
                    out.push(self.eval_expr(i, env, depth)?);
                }
                Ok(Value::list(out))
            }
            Expr::Tuple { items, .. } => {
                let mut out = Vec::with_capacity(items.len());
                for i in items {
                    out.push(self.eval_expr(i, env, depth)?);
                }
                Ok(Value::tuple(out))
            }
            Expr::Intrinsic { name, args, span } => self.eval_intrinsic(name, args, *span, env, depth),
            Expr::ClassCall { span, .. } => Err(RuntimeError::internal(
                *span,
                "ClassCall reached the evaluator; class dictionaries were not elaborated",
            )),
            Expr::DictRef { class, ty, span } => self
                .class_dictionary(class, ty)
                .ok_or_else(|| RuntimeError::internal(*span, format!("no dictionary for {class} {ty}"))),
            Expr::DictAbs { param, body, .. } => Ok(Value::Function(Rc::new(FunctionValue {
                params: vec![param.clone()],
                body: (**body).clone(),
                env: env.clone(),
            }))),
            Expr::DictApp { func, dict, span } => {
                let f = self.eval_expr(func, env, depth)?;
                let d = self.eval_expr(dict, env, depth)?;
                self.apply(f, vec![d], *span, depth)
            }
        }
    }

    fn eval_intrinsic(
        &self,
        name: &str,
        args: &[Expr],
        span: Span,
        env: &Env,
        depth: usize,
    ) -> Result<Value, RuntimeError> {
        match name {
            "and" => match self.eval_expr(&args[0], env, depth)? {
                Value::Bool(false) => Ok(Value::Bool(false)),
                Value::Bool(true) => self.eval_expr(&args[1], env, depth),
                _ => Err(RuntimeError::internal(span, "'&&' left operand must be a Bool")),
            },
            "or" => match self.eval_expr(&args[0], env, depth)? {
                Value::Bool(true) => Ok(Value::Bool(true)),
                Value::Bool(false) => self.eval_expr(&args[1], env, depth),
                _ => Err(RuntimeError::internal(span, "'||' left operand must be a Bool")),
            },
            "not" => match self.eval_expr(&args[0], env, depth)? {
                Value::Bool(b) => Ok(Value::Bool(!b)),
                _ => Err(RuntimeError::internal(span, "'not' operand must be a Bool")),
            },
            "append" => {
                let a = self.eval_expr(&args[0], env, depth)?;
                let b = self.eval_expr(&args[1], env, depth)?;
                match (a, b) {
                    (Value::Str(a), Value::Str(b)) => Ok(Value::str(format!("{a}{b}"))),
                    (Value::List(a), Value::List(b)) => {
                        let mut out = (*a).clone();
                        out.extend((*b).clone());
                        Ok(Value::list(out))
                    }
                    _ => Err(RuntimeError::internal(span, "'++' operands must both be String or both be List")),
                }
            }
            other => Err(RuntimeError::internal(span, format!("unknown intrinsic '{other}'"))),
        }
    }

    /// Interprets a compiled [`DecisionTree`] against an already-evaluated
    /// scrutinee `root`. Structurally equivalent to the linear matcher, but a
    /// guard rejection can't be resolved by the tree alone (guards aren't
    /// part of the structural test) — in that case we recompile the tree for
    /// the remaining arms and keep going, which is exactly what the linear
    /// loop would have done next.
    fn eval_decision_tree(
        &self,
        tree: &DecisionTree,
        arms: &[CoreArm],
        root: &Value,
        env: &Env,
        depth: usize,
        span: Span,
    ) -> Result<Value, RuntimeError> {
        match tree {
            DecisionTree::Fail => Err(RuntimeError::NonExhaustiveMatch { span }),
            DecisionTree::Leaf { arm_index, bindings } => {
                let arm = &arms[*arm_index];
                let child = env.child();
                for (name, path) in bindings {
                    child.define(name.clone(), read_path(root, path, span)?);
                }
                match &arm.guard {
                    None => self.eval_expr(&arm.body, &child, depth),
                    Some(guard) => match self.eval_expr(guard, &child, depth)? {
                        Value::Bool(true) => self.eval_expr(&arm.body, &child, depth),
                        Value::Bool(false) => {
                            let remaining = &arms[arm_index + 1..];
                            let suffix = compile_decision_tree(remaining);
                            self.eval_decision_tree(&suffix, remaining, root, env, depth, span)
                        }
                        _ => Err(RuntimeError::GuardNotBool { span: guard.span() }),
                    },
                }
            }
            DecisionTree::Switch { path, cases, default } => {
                let sub = read_path(root, path, span)?;
                for case in cases {
                    if matches_discriminant(&sub, &case.discriminant) {
                        return self.eval_decision_tree(&case.subtree, arms, root, env, depth, span);
                    }
                }
                self.eval_decision_tree(default, arms, root, env, depth, span)
            }
        }
    }
}

/// Navigates a [`Path`](ailang_ir::Path) produced by the decision-tree
/// compiler into an already-matched scrutinee. The path only ever addresses
/// shapes the enclosing `Switch` nodes already confirmed (or, for tuples,
/// shapes the type checker already pinned down), so a mismatch here means the
/// compiled tree and the scrutinee disagree — an internal error, not a
/// pattern-matching failure.
fn read_path(root: &Value, path: &[PathStep], span: Span) -> Result<Value, RuntimeError> {
    let mut v = root.clone();
    for step in path {
        v = match (step, &v) {
            (PathStep::TupleField(i), Value::Tuple(items)) => items
                .get(*i)
                .cloned()
                .ok_or_else(|| RuntimeError::internal(span, "tuple field out of range in compiled pattern"))?,
            (PathStep::ListField(i), Value::List(items)) => items
                .get(*i)
                .cloned()
                .ok_or_else(|| RuntimeError::internal(span, "list field out of range in compiled pattern"))?,
            (PathStep::ListRest(n), Value::List(items)) => Value::list(items[(*n).min(items.len())..].to_vec()),
            (PathStep::CtorField(i), Value::Tagged(t)) => t
                .fields
                .get(*i)
                .cloned()
                .ok_or_else(|| RuntimeError::internal(span, "constructor field out of range in compiled pattern"))?,
            _ => return Err(RuntimeError::internal(span, "compiled pattern path does not match scrutinee shape")),
        };
    }
    Ok(v)
}

/// Tests whether a value has the shape a `Switch` case requires. Float
/// comparison goes back through `f64::from_bits` and native `==` so NaN never
/// matches anything, matching the linear matcher's semantics exactly.
fn matches_discriminant(value: &Value, discriminant: &Discriminant) -> bool {
    match (value, discriminant) {
        (Value::Bool(v), Discriminant::Bool(d)) => v == d,
        (Value::Int(v), Discriminant::Int(d)) => v == d,
        (Value::Float(v), Discriminant::Float(bits)) => *v == f64::from_bits(*bits),
        (Value::Str(v), Discriminant::Str(d)) => v.as_str() == d,
        (Value::List(items), Discriminant::ListShape { length, has_rest }) => {
            if *has_rest {
                items.len() >= *length
            } else {
                items.len() == *length
            }
        }
        (Value::Tagged(t), Discriminant::Ctor { name, arity }) => &t.ctor == name && t.fields.len() == *arity,
        _ => false,
    }
}

/// Rewrites a builtin's placeholder (`Span::dummy()`) error to the actual
/// call-site span, so an error raised deep inside a builtin closure still
/// points at user-visible source location.
fn respan(err: RuntimeError, span: Span) -> RuntimeError {
    match err {
        RuntimeError::TypeMismatchBuiltin { builtin, hint, .. } => {
            RuntimeError::TypeMismatchBuiltin { span, builtin, hint }
        }
        RuntimeError::DivisionByZero { .. } => RuntimeError::DivisionByZero { span },
        RuntimeError::MissingCapability { label, .. } => RuntimeError::MissingCapability { span, label },
        RuntimeError::Internal { message, .. } => RuntimeError::Internal { span, message },
        other => other,
    }
}

/// Attempts to match `value` against `pattern`, returning the bindings it
/// introduces on success.
fn match_pattern(pattern: &CorePattern, value: &Value) -> Option<Vec<(String, Value)>> {
    match pattern {
        CorePattern::Var { name, .. } => Some(vec![(name.clone(), value.clone())]),
        CorePattern::Wildcard { .. } => Some(vec![]),
        CorePattern::IntLit { value: n, .. } => match value {
            Value::Int(v) if v == n => Some(vec![]),
            _ => None,
        },
        CorePattern::FloatLit { value: f, .. } => match value {
            Value::Float(v) if v == f => Some(vec![]),
            _ => None,
        },
        CorePattern::StringLit { value: s, .. } => match value {
            Value::Str(v) if v.as_str() == s => Some(vec![]),
            _ => None,
        },
        CorePattern::BoolLit { value: b, .. } => match value {
            Value::Bool(v) if v == b => Some(vec![]),
            _ => None,
        },
        CorePattern::Tuple { items, .. } => match value {
            Value::Tuple(vals) if vals.len() == items.len() => {
                let mut out = Vec::new();
                for (p, v) in items.iter().zip(vals.iter()) {
                    out.extend(match_pattern(p, v)?);
                }
                Some(out)
            }
            _ => None,
        },
        CorePattern::List { items, rest, .. } => match value {
            Value::List(vals) => {
                if vals.len() < items.len() || (rest.is_none() && vals.len() != items.len()) {
                    return None;
                }
                let mut out = Vec::new();
                for (p, v) in items.iter().zip(vals.iter()) {
                    out.extend(match_pattern(p, v)?);
                }
                if let Some(rest_name) = rest {
                    out.push((rest_name.clone(), Value::list(vals[items.len()..].to_vec())));
                }
                Some(out)
            }
            _ => None,
        },
        CorePattern::Ctor { name, args, .. } => match value {
            Value::Tagged(t) if &t.ctor == name && t.fields.len() == args.len() => {
                let mut out = Vec::new();
                for (p, v) in args.iter().zip(t.fields.iter()) {
                    out.extend(match_pattern(p, v)?);
                }
                Some(out)
            }
            _ => None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ailang_ir::elaborate_program;
    use ailang_syntax::{parse_program, tokenize};
    use ailang_types::{infer_module, resolve_classes, ClassRegistry};

    fn run(src: &str) -> Result<Value, RuntimeError> {
        run_with_config(src, EvalConfig::default())
    }

    fn run_with_config(src: &str, config: EvalConfig) -> Result<Value, RuntimeError> {
        let (tokens, _) = tokenize(src);
        let (program, _) = parse_program(&tokens);
        let (module, _) = elaborate_program(&program.unwrap());
        let module = module.unwrap();
        let infer_out = infer_module(&module).expect("inference should succeed");
        let registry = ClassRegistry::with_builtins();
        let resolved = resolve_classes(&module, &infer_out, &registry).expect("class resolution should succeed");
        let eval = Evaluator::new(config, EffectContext::all());
        eval.eval_module(&resolved.module)
    }

    #[test]
    fn factorial_via_letrec_evaluates_correctly() {
        let src = "letrec fac = \\n. if n <= 1 then 1 else n * fac(n - 1) in fac(5)";
        assert_eq!(run(src).unwrap(), Value::Int(120));
    }

    #[test]
    fn deep_recursion_without_base_case_hits_the_depth_cap() {
        let src = "func loop(n) -> a = loop(n + 1)\nloop(0)";
        let err = run(src).unwrap_err();
        assert_eq!(err.code(), "RT_REC_003");
    }

    #[test]
    fn immediate_self_reference_of_a_non_function_value_fails() {
        let src = "letrec x = x in x";
        let err = run(src).unwrap_err();
        assert_eq!(err.code(), "RT_REC_001");
    }

    #[test]
    fn bare_numeric_obligation_defaults_to_int() {
        let src = "letrec x = x + 1 in x";
        assert_eq!(run(src).unwrap_err().code(), "RT_REC_001");
    }

    #[test]
    fn first_matching_arm_wins() {
        let src = "func classify(n) -> a = match n { _ if n > 0 => \"pos\", _ => \"other\" }\nclassify(5)";
        assert_eq!(run(src).unwrap(), Value::str("pos"));
    }

    #[test]
    fn non_exhaustive_match_raises_a_runtime_error() {
        let src = "func f(b) -> a = match b { true => 1 }\nf(false)";
        let err = run(src).unwrap_err();
        assert_eq!(err.code(), "MATCH_NONEXHAUSTIVE");
    }

    fn decision_tree_config() -> EvalConfig {
        EvalConfig { use_decision_tree: true, ..EvalConfig::default() }
    }

    #[test]
    fn decision_tree_matching_agrees_with_linear_matching_on_a_guard() {
        let src = "func classify(n) -> a = match n { _ if n > 0 => \"pos\", _ => \"other\" }\nclassify(5)";
        assert_eq!(run_with_config(src, decision_tree_config()).unwrap(), Value::str("pos"));
    }

    #[test]
    fn decision_tree_falls_through_a_failed_guard_to_a_later_arm() {
        let src = "func classify(n) -> a = match n { _ if n > 0 => \"pos\", _ => \"other\" }\nclassify(-1)";
        assert_eq!(run_with_config(src, decision_tree_config()).unwrap(), Value::str("other"));
    }

    #[test]
    fn decision_tree_raises_non_exhaustive_match_like_the_linear_matcher() {
        let src = "func f(b) -> a = match b { true => 1 }\nf(false)";
        let err = run_with_config(src, decision_tree_config()).unwrap_err();
        assert_eq!(err.code(), "MATCH_NONEXHAUSTIVE");
    }

    #[test]
    fn decision_tree_binds_constructor_fields_correctly() {
        let src = "type Box = Box(a)\nfunc unwrap(b) -> a = match b { Box(x) => x }\nunwrap(Box(42))";
        assert_eq!(run_with_config(src, decision_tree_config()).unwrap(), Value::Int(42));
    }
}
