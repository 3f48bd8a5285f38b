//! Compiles a `match` arm list into a decision tree of `Switch`/`Leaf`/`Fail`
//! nodes, as an optional alternative to trying arms one by one at evaluation
//! time.
//!
//! AILANG's `match` has a single scrutinee and one pattern per arm, not the
//! pattern matrix a general Maranget-style compiler targets (several
//! scrutinees tested column by column). So this compiler works arm by arm:
//! each arm's pattern lowers to a nested `Switch` over paths into the
//! scrutinee, ending in a `Leaf` that names the arm and the bindings its
//! pattern introduces; every place that pattern could fail to match chains to
//! the next arm's tree instead. There is no column specialization across
//! arms. Semantics must stay identical to linear evaluation, including guard
//! ordering and first-match-wins — a guard can still reject an otherwise
//! matching `Leaf`, so the evaluator must check `arms[arm_index].guard` and
//! fall through to whatever the enclosing `Switch`'s default covers when it
//! does.

use crate::core::{CoreArm, CorePattern};

/// One step into a scrutinee value, used to address a sub-value without
/// re-walking the pattern tree at evaluation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathStep {
    TupleField(usize),
    ListField(usize),
    /// The `...rest` tail of a list pattern, starting after this many
    /// consumed elements from the front.
    ListRest(usize),
    CtorField(usize),
}

pub type Path = Vec<PathStep>;

/// A value shape a `Switch` node can discriminate on. Floats are carried by
/// bit pattern purely so `Discriminant` can implement `Eq`/`Hash`-friendly
/// comparison for case grouping; the evaluator still compares scrutinee
/// floats with native `==` to preserve IEEE-754 semantics (NaN matches
/// nothing, including another NaN).
#[derive(Debug, Clone, PartialEq)]
pub enum Discriminant {
    Bool(bool),
    Int(i64),
    Float(u64),
    Str(String),
    /// List length, and whether the pattern that produced this case had a
    /// `...rest` tail (so the evaluator should test `vals.len() >= length`
    /// rather than `==`).
    ListShape { length: usize, has_rest: bool },
    Ctor { name: String, arity: usize },
}

impl Discriminant {
    pub fn float(value: f64) -> Discriminant {
        Discriminant::Float(value.to_bits())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchCase {
    pub discriminant: Discriminant,
    pub subtree: DecisionTree,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DecisionTree {
    /// Arm `arm_index` matched structurally. `bindings` lists the names the
    /// arm's pattern introduces together with the path each is read from.
    /// The evaluator still must check `arms[arm_index].guard` — guards are
    /// not part of the structural tree.
    Leaf {
        arm_index: usize,
        bindings: Vec<(String, Path)>,
    },
    /// Inspect the sub-value at `path` and dispatch on its shape; `default`
    /// covers every discriminant not listed in `cases`.
    Switch {
        path: Path,
        cases: Vec<SwitchCase>,
        default: Box<DecisionTree>,
    },
    /// No remaining arm can match; the evaluator raises `MATCH_NONEXHAUSTIVE`.
    Fail,
}

/// Compiles `arms` into a decision tree equivalent to trying them in order.
pub fn compile(arms: &[CoreArm]) -> DecisionTree {
    compile_from(arms, 0)
}

fn compile_from(arms: &[CoreArm], index: usize) -> DecisionTree {
    match arms.get(index) {
        None => DecisionTree::Fail,
        Some(arm) => {
            let rest = compile_from(arms, index + 1);
            let leaf = DecisionTree::Leaf {
                arm_index: index,
                bindings: collect_bindings(&arm.pattern, Vec::new()),
            };
            let structural = build_structural(&arm.pattern, Vec::new(), leaf);
            merge_on_fail(structural, rest)
        }
    }
}

/// Walks a pattern collecting the (name, path-into-scrutinee) pairs it
/// binds, in left-to-right order — independent of whether the structural
/// test for any given sub-pattern is refutable.
fn collect_bindings(pattern: &CorePattern, path: Path) -> Vec<(String, Path)> {
    match pattern {
        CorePattern::Var { name, .. } => vec![(name.clone(), path)],
        CorePattern::Wildcard { .. }
        | CorePattern::IntLit { .. }
        | CorePattern::FloatLit { .. }
        | CorePattern::StringLit { .. }
        | CorePattern::BoolLit { .. } => Vec::new(),
        CorePattern::Tuple { items, .. } => items
            .iter()
            .enumerate()
            .flat_map(|(i, p)| collect_bindings(p, push(&path, PathStep::TupleField(i))))
            .collect(),
        CorePattern::List { items, rest, .. } => {
            let mut out: Vec<_> = items
                .iter()
                .enumerate()
                .flat_map(|(i, p)| collect_bindings(p, push(&path, PathStep::ListField(i))))
                .collect();
            if let Some(name) = rest {
                out.push((name.clone(), push(&path, PathStep::ListRest(items.len()))));
            }
            out
        }
        CorePattern::Ctor { args, .. } => args
            .iter()
            .enumerate()
            .flat_map(|(i, p)| collect_bindings(p, push(&path, PathStep::CtorField(i))))
            .collect(),
    }
}

/// Builds the structural (binding-free) test tree for one pattern: `on_match`
/// is what to evaluate once every refutable test in `pattern` has passed, and
/// every point where a test could fail leads to `Fail` (the caller's
/// [`merge_on_fail`] is what actually chains those failures to the next arm).
fn build_structural(pattern: &CorePattern, path: Path, on_match: DecisionTree) -> DecisionTree {
    match pattern {
        CorePattern::Var { .. } | CorePattern::Wildcard { .. } => on_match,
        CorePattern::IntLit { value, .. } => switch_one(path, Discriminant::Int(*value), on_match),
        CorePattern::FloatLit { value, .. } => switch_one(path, Discriminant::float(*value), on_match),
        CorePattern::StringLit { value, .. } => switch_one(path, Discriminant::Str(value.clone()), on_match),
        CorePattern::BoolLit { value, .. } => switch_one(path, Discriminant::Bool(*value), on_match),
        CorePattern::Tuple { items, .. } => {
            fold_fields(items.iter().enumerate().map(|(i, p)| (p, PathStep::TupleField(i))), &path, on_match)
        }
        CorePattern::List { items, rest, .. } => {
            // The `...rest` binding itself is irrefutable (already collected
            // by `collect_bindings`); only the length/shape needs a test.
            let tree = fold_fields(
                items.iter().enumerate().map(|(i, p)| (p, PathStep::ListField(i))),
                &path,
                on_match,
            );
            switch_one(
                path,
                Discriminant::ListShape {
                    length: items.len(),
                    has_rest: rest.is_some(),
                },
                tree,
            )
        }
        CorePattern::Ctor { name, args, .. } => {
            let tree = fold_fields(
                args.iter().enumerate().map(|(i, p)| (p, PathStep::CtorField(i))),
                &path,
                on_match,
            );
            switch_one(
                path,
                Discriminant::Ctor {
                    name: name.clone(),
                    arity: args.len(),
                },
                tree,
            )
        }
    }
}

fn fold_fields<'a>(
    fields: impl DoubleEndedIterator<Item = (&'a CorePattern, PathStep)>,
    base: &Path,
    on_match: DecisionTree,
) -> DecisionTree {
    let mut tree = on_match;
    for (pattern, step) in fields.rev() {
        tree = build_structural(pattern, push(base, step), tree);
    }
    tree
}

fn switch_one(path: Path, discriminant: Discriminant, on_match: DecisionTree) -> DecisionTree {
    DecisionTree::Switch {
        path,
        cases: vec![SwitchCase { discriminant, subtree: on_match }],
        default: Box::new(DecisionTree::Fail),
    }
}

/// Replaces every `Fail` reachable inside `tree` with `rest`. `tree` only
/// ever contains the `Fail`s [`build_structural`]/[`switch_one`] placed as
/// "this test didn't match" markers, so this is exactly "if nothing in this
/// arm's tree matches, try the next arm".
fn merge_on_fail(tree: DecisionTree, rest: DecisionTree) -> DecisionTree {
    match tree {
        DecisionTree::Fail => rest,
        DecisionTree::Leaf { arm_index, bindings } => DecisionTree::Leaf { arm_index, bindings },
        DecisionTree::Switch { path, cases, default } => DecisionTree::Switch {
            path,
            cases: cases
                .into_iter()
                .map(|c| SwitchCase {
                    discriminant: c.discriminant,
                    subtree: merge_on_fail(c.subtree, rest.clone()),
                })
                .collect(),
            default: Box::new(merge_on_fail(*default, rest)),
        },
    }
}

fn push(path: &[PathStep], step: PathStep) -> Path {
    let mut out = path.to_vec();
    out.push(step);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ailang_core::Span;

    fn var(name: &str) -> CorePattern {
        CorePattern::Var { name: name.to_string(), span: Span::dummy() }
    }

    fn wildcard() -> CorePattern {
        CorePattern::Wildcard { span: Span::dummy() }
    }

    fn bool_lit(b: bool) -> CorePattern {
        CorePattern::BoolLit { value: b, span: Span::dummy() }
    }

    fn ctor(name: &str, args: Vec<CorePattern>) -> CorePattern {
        CorePattern::Ctor { name: name.to_string(), args, span: Span::dummy() }
    }

    fn arm(pattern: CorePattern) -> CoreArm {
        CoreArm {
            pattern,
            guard: None,
            body: crate::core::Expr::Lit { value: crate::core::Lit::Unit, span: Span::dummy() },
            span: Span::dummy(),
        }
    }

    #[test]
    fn no_arms_compiles_to_fail() {
        assert_eq!(compile(&[]), DecisionTree::Fail);
    }

    #[test]
    fn wildcard_only_arm_compiles_to_a_single_leaf() {
        let arms = vec![arm(wildcard())];
        assert_eq!(compile(&arms), DecisionTree::Leaf { arm_index: 0, bindings: Vec::new() });
    }

    #[test]
    fn unmatched_literal_falls_through_to_the_next_arm() {
        let arms = vec![arm(bool_lit(true)), arm(var("x"))];
        let tree = compile(&arms);
        match tree {
            DecisionTree::Switch { path, cases, default } => {
                assert!(path.is_empty());
                assert_eq!(cases.len(), 1);
                assert_eq!(cases[0].discriminant, Discriminant::Bool(true));
                assert_eq!(cases[0].subtree, DecisionTree::Leaf { arm_index: 0, bindings: Vec::new() });
                assert_eq!(
                    *default,
                    DecisionTree::Leaf {
                        arm_index: 1,
                        bindings: vec![("x".to_string(), Vec::new())],
                    }
                );
            }
            other => panic!("expected a Switch node, got {other:?}"),
        }
    }

    #[test]
    fn nested_constructor_fields_bind_at_their_own_path() {
        let arms = vec![arm(ctor("Some", vec![var("x")]))];
        let tree = compile(&arms);
        match tree {
            DecisionTree::Switch { cases, default, .. } => {
                assert_eq!(cases[0].discriminant, Discriminant::Ctor { name: "Some".to_string(), arity: 1 });
                assert_eq!(
                    cases[0].subtree,
                    DecisionTree::Leaf {
                        arm_index: 0,
                        bindings: vec![("x".to_string(), vec![PathStep::CtorField(0)])],
                    }
                );
                assert_eq!(*default, DecisionTree::Fail);
            }
            other => panic!("expected a Switch node, got {other:?}"),
        }
    }
}
