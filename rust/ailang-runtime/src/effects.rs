use std::collections::BTreeSet;

use ailang_syntax::EFFECT_LABELS;

/// The set of effect capabilities granted to the running program. Effectful
/// builtins (`_io_print`, `_fs_readFile`, ...) check membership here before
/// running rather than at type-check time — AILANG's effect polymorphism is
/// enforced at this boundary, not via row-polymorphic effect types.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EffectContext {
    granted: BTreeSet<String>,
}

impl EffectContext {
    pub fn none() -> EffectContext {
        EffectContext::default()
    }

    pub fn all() -> EffectContext {
        EffectContext {
            granted: EFFECT_LABELS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn with_capabilities(labels: impl IntoIterator<Item = impl Into<String>>) -> EffectContext {
        EffectContext {
            granted: labels.into_iter().map(Into::into).collect(),
        }
    }

    pub fn has(&self, label: &str) -> bool {
        self.granted.contains(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_grants_nothing() {
        assert!(!EffectContext::none().has("IO"));
    }

    #[test]
    fn all_grants_every_known_label() {
        let ctx = EffectContext::all();
        for label in EFFECT_LABELS {
            assert!(ctx.has(label));
        }
    }

    #[test]
    fn with_capabilities_grants_only_named_labels() {
        let ctx = EffectContext::with_capabilities(["IO"]);
        assert!(ctx.has("IO"));
        assert!(!ctx.has("FS"));
    }
}
