mod call;
mod chain;
mod diagnostic;
mod literal;
mod macros;
mod narrow;

#[cfg(test)]
mod tests;

use lang_pin::{Chain, PinRef};
use lang_store::Store;
use lang_ty::ComplexType;

pub use diagnostic::{check_chain, edit_distance, suggest_similar, Problem, ProblemKind};
pub use narrow::{visible_pins, FlowSensitiveTyping};

/// Engine knobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    /// How many assignment chains and block receivers may be followed while
    /// inferring one expression.
    pub max_depth: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self { max_depth: 8 }
    }
}

/// Resolves chains against one store snapshot. Cheap to construct; holds no
/// state besides the current probing depth.
#[derive(Clone, Copy)]
pub struct Resolver<'a> {
    store: &'a Store,
    config: &'a ResolverConfig,
    depth: usize,
}

impl<'a> Resolver<'a> {
    pub fn new(store: &'a Store, config: &'a ResolverConfig) -> Self {
        Self {
            store,
            config,
            depth: 0,
        }
    }

    pub fn store(&self) -> &'a Store {
        self.store
    }

    /// A resolver one probing level down, or `None` once the configured
    /// depth is exhausted.
    fn deeper(&self) -> Option<Resolver<'a>> {
        if self.depth >= self.config.max_depth {
            log::debug!("probe depth {} exhausted", self.depth);
            return None;
        }
        Some(Resolver {
            depth: self.depth + 1,
            ..*self
        })
    }
}

/// Candidate pins for `chain`, evaluated inside `name_pin` with the given
/// local variables in scope.
pub fn resolve_chain(store: &Store, chain: &Chain, name_pin: &PinRef, locals: &[PinRef]) -> Vec<PinRef> {
    let config = ResolverConfig::default();
    Resolver::new(store, &config).define(chain, name_pin, locals)
}

/// The type `chain` evaluates to; `undefined` when nothing could be inferred.
pub fn infer_chain(store: &Store, chain: &Chain, name_pin: &PinRef, locals: &[PinRef]) -> ComplexType {
    let config = ResolverConfig::default();
    Resolver::new(store, &config).infer(chain, name_pin, locals)
}
