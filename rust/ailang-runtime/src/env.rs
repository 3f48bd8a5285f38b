use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::value::Value;

struct EnvNode {
    bindings: RefCell<HashMap<String, Value>>,
    parent: Option<Env>,
}

/// A chained lexical scope. Mutation (via [`Env::define`]) only ever touches
/// the top frame of the chain it was called on — closures captured before a
/// `define` never observe bindings added after.
#[derive(Clone)]
pub struct Env(Rc<EnvNode>);

impl Env {
    pub fn root() -> Env {
        Env(Rc::new(EnvNode {
            bindings: RefCell::new(HashMap::new()),
            parent: None,
        }))
    }

    pub fn child(&self) -> Env {
        Env(Rc::new(EnvNode {
            bindings: RefCell::new(HashMap::new()),
            parent: Some(self.clone()),
        }))
    }

    pub fn define(&self, name: impl Into<String>, value: Value) {
        self.0.bindings.borrow_mut().insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(v) = self.0.bindings.borrow().get(name) {
            return Some(v.clone());
        }
        self.0.parent.as_ref().and_then(|p| p.get(name))
    }
}

impl std::fmt::Debug for Env {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Env")
            .field("keys", &self.0.bindings.borrow().keys().collect::<Vec<_>>())
            .field("has_parent", &self.0.parent.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_sees_parent_bindings() {
        let root = Env::root();
        root.define("x", Value::Int(1));
        let child = root.child();
        assert_eq!(child.get("x"), Some(Value::Int(1)));
    }

    #[test]
    fn child_shadowing_does_not_mutate_parent() {
        let root = Env::root();
        root.define("x", Value::Int(1));
        let child = root.child();
        child.define("x", Value::Int(2));
        assert_eq!(child.get("x"), Some(Value::Int(2)));
        assert_eq!(root.get("x"), Some(Value::Int(1)));
    }

    #[test]
    fn unbound_name_is_none() {
        let root = Env::root();
        assert_eq!(root.get("missing"), None);
    }
}
