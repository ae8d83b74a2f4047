// ==============================================================================
// Constant Resolution
// ==============================================================================
//
// A relative name is tried against each gate, innermost first. Within a gate
// the gate's own constants are checked, then the namespaces the gate
// includes or extends (one mixin hop, no further). `::Foo` uses only the root
// gate. `Foo::Bar` resolves `Foo` first and then looks `Bar` up inside it.

use itertools::Itertools;
use lang_pin::{PinRef, ReferenceKind};
use lang_ty::Qualifier;
use rustc_hash::FxHashSet;
use smol_str::{format_smolstr, SmolStr};

use crate::Store;

const MIXIN_KINDS: [ReferenceKind; 2] = [ReferenceKind::Include, ReferenceKind::Extend];

impl Store {
    /// Fully qualified path of a constant or namespace, or `None` when
    /// nothing visible from `gates` declares it.
    pub fn resolve_constant(&self, name: &str, gates: &[SmolStr]) -> Option<SmolStr> {
        let memo_key = (SmolStr::new(name), gates.iter().join("|").into());
        if let Some(hit) = self.constant_memo.get(&memo_key) {
            return hit.clone();
        }
        let resolved = self.resolve_path(name, gates, true);
        log::debug!("resolve constant `{name}` in {gates:?} => {resolved:?}");
        self.constant_memo.insert(memo_key, resolved.clone());
        resolved
    }

    fn resolve_path(&self, name: &str, gates: &[SmolStr], expand_mixins: bool) -> Option<SmolStr> {
        let root = [SmolStr::default()];
        let (gates, name) = match name.strip_prefix("::") {
            Some(absolute) => (&root[..], absolute),
            None => (gates, name),
        };
        if name.is_empty() {
            return None;
        }

        let mut segments = name.split("::");
        let head = segments.next()?;
        let mut resolved = gates
            .iter()
            .find_map(|gate| self.resolve_in_gate(head, gate, expand_mixins))?;
        for segment in segments {
            resolved = self.resolve_in_gate(segment, &resolved, expand_mixins)?;
        }
        Some(resolved)
    }

    fn resolve_in_gate(&self, name: &str, gate: &str, expand_mixins: bool) -> Option<SmolStr> {
        let direct = join_path(gate, name);
        if self.is_constant_path(&direct) {
            return Some(direct);
        }
        if !expand_mixins {
            return None;
        }
        let mut seen = FxHashSet::default();
        for target in self.mixin_targets(gate) {
            if !seen.insert(target.clone()) {
                continue;
            }
            let candidate = join_path(&target, name);
            if self.is_constant_path(&candidate) {
                return Some(candidate);
            }
        }
        None
    }

    /// Namespaces included or extended by `namespace`, in declaration order.
    /// References resolve without a mixin hop of their own.
    fn mixin_targets(&self, namespace: &str) -> Vec<SmolStr> {
        self.references_of(namespace, &MIXIN_KINDS)
            .into_iter()
            .filter_map(|reference| {
                self.resolve_path(&reference.name, &reference.reference_gates(), false)
            })
            .collect()
    }

    /// Fully qualified path a reference pin points at.
    pub fn dereference(&self, reference: &PinRef) -> Option<SmolStr> {
        reference.as_reference()?;
        self.resolve_constant(&reference.name, &reference.reference_gates())
    }

    /// Constants declared in `namespace`, then those reachable through one
    /// level of mixins, first occurrence of each path kept.
    pub fn collect_constants(&self, namespace: &str) -> Vec<PinRef> {
        let mut pins = self.constants_in(namespace);
        for reference in self.references_of(namespace, &MIXIN_KINDS) {
            if let Some(target) = self.dereference(&reference) {
                pins.extend(self.constants_in(&target));
            }
        }
        pins.into_iter()
            .unique_by(|pin| pin.path().clone())
            .collect()
    }
}

impl Qualifier for Store {
    fn qualify_name(&self, name: &str, gates: &[SmolStr]) -> Option<SmolStr> {
        self.resolve_constant(name, gates)
    }
}

pub(crate) fn join_path(namespace: &str, name: &str) -> SmolStr {
    if namespace.is_empty() {
        SmolStr::new(name)
    } else {
        format_smolstr!("{namespace}::{name}")
    }
}
