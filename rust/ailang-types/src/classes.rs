use std::collections::HashSet;

use ailang_core::Span;

use crate::error::ClassError;
use crate::types::Type;

/// The four built-in type classes, and which classes each superclasses.
/// `Fractional` methods (`divide`, `recip`, `fromRational`) extend `Num`;
/// an instance of `Fractional` for a type requires a `Num` instance too.
pub fn superclass_of(class: &str) -> Option<&'static str> {
    match class {
        "Fractional" => Some("Num"),
        _ => None,
    }
}

/// Which (class, concrete type) instances exist. Keyed by the type's
/// [`Type::head_name`] rather than full structural equality, since instances
/// are only ever declared for ground head types (`Int`, `Float`, `String`, ...).
pub struct ClassRegistry {
    instances: HashSet<(String, String)>,
}

impl Default for ClassRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl ClassRegistry {
    pub fn new() -> Self {
        ClassRegistry {
            instances: HashSet::new(),
        }
    }

    /// The registry pre-populated with AILANG's built-in instances:
    /// `Num` and `Eq`/`Ord` for `Int`/`Float`/`String` (plus `Eq` for `Bool`),
    /// and `Fractional` for `Float` only.
    pub fn with_builtins() -> Self {
        let mut reg = ClassRegistry::new();
        for ty in ["Int", "Float"] {
            reg.add("Num", ty);
        }
        reg.add("Fractional", "Float");
        for ty in ["Int", "Float", "String", "Bool"] {
            reg.add("Eq", ty);
        }
        for ty in ["Int", "Float", "String"] {
            reg.add("Ord", ty);
        }
        reg
    }

    pub fn add(&mut self, class: &str, ty_head: &str) {
        self.instances.insert((class.to_string(), ty_head.to_string()));
    }

    pub fn has_instance(&self, class: &str, ty_head: &str) -> bool {
        self.instances.contains(&(class.to_string(), ty_head.to_string()))
    }

    /// Verify a resolved (class, type) constraint has an instance, including
    /// any superclass it requires.
    pub fn resolve(&self, class: &str, ty: &Type, span: Span) -> Result<(), ClassError> {
        let head = ty.head_name().ok_or_else(|| ClassError::Ambiguous {
            span,
            class: class.to_string(),
        })?;
        if !self.has_instance(class, &head) {
            return Err(ClassError::NoInstance {
                span,
                class: class.to_string(),
                ty: ty.clone(),
            });
        }
        if let Some(super_class) = superclass_of(class) {
            if !self.has_instance(super_class, &head) {
                return Err(ClassError::SuperclassMissing {
                    span,
                    class: class.to_string(),
                    superclass: super_class.to_string(),
                    ty: ty.clone(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_has_num_but_not_fractional() {
        let reg = ClassRegistry::with_builtins();
        assert!(reg.resolve("Num", &Type::Int, Span::dummy()).is_ok());
        assert!(reg.resolve("Fractional", &Type::Int, Span::dummy()).is_err());
    }

    #[test]
    fn float_has_fractional_and_its_superclass() {
        let reg = ClassRegistry::with_builtins();
        assert!(reg.resolve("Fractional", &Type::Float, Span::dummy()).is_ok());
    }

    #[test]
    fn string_has_ord_and_eq_but_not_num() {
        let reg = ClassRegistry::with_builtins();
        assert!(reg.resolve("Eq", &Type::String, Span::dummy()).is_ok());
        assert!(reg.resolve("Ord", &Type::String, Span::dummy()).is_ok());
        assert!(reg.resolve("Num", &Type::String, Span::dummy()).is_err());
    }

    #[test]
    fn bool_has_eq_but_not_ord() {
        let reg = ClassRegistry::with_builtins();
        assert!(reg.resolve("Eq", &Type::Bool, Span::dummy()).is_ok());
        assert!(reg.resolve("Ord", &Type::Bool, Span::dummy()).is_err());
    }
}
