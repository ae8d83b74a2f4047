// ==============================================================================
// Symbol Store
// ==============================================================================
//
// Pins arrive in provenance groups (one per source file, one per external
// package). A group is replaced as a whole; only the index buckets its old
// and new pins touch are rewritten.
//
// Every index bucket is kept sorted by (group ordinal, position in group), so
// queries see declaration order within a group and groups in the order they
// were first added.

use comment_parser::Directive;
use dashmap::DashMap;
use la_arena::{Arena, Idx};
use lang_pin::{PinKind, PinRef, ReferenceKind};
use lang_ty::Scope;
use rustc_hash::FxHashMap;
use smol_str::SmolStr;

pub type GroupId = Idx<Group>;

#[derive(Debug, Default)]
pub struct Group {
    pub key: SmolStr,
    pub pins: Vec<PinRef>,
}

#[derive(Debug, Clone)]
struct Entry {
    order: (u32, u32),
    pin: PinRef,
}

/// One keyed index: bucket name to pins in store order.
#[derive(Debug, Default)]
struct Index(FxHashMap<SmolStr, Vec<Entry>>);

impl Index {
    fn insert(&mut self, key: SmolStr, entry: Entry) {
        let bucket = self.0.entry(key).or_default();
        let pos = bucket.partition_point(|e| e.order <= entry.order);
        bucket.insert(pos, entry);
    }

    fn remove_group(&mut self, key: &SmolStr, group: u32) {
        if let Some(bucket) = self.0.get_mut(key) {
            bucket.retain(|e| e.order.0 != group);
            if bucket.is_empty() {
                self.0.remove(key);
            }
        }
    }

    fn get(&self, key: &str) -> impl Iterator<Item = &PinRef> {
        self.0.get(key).into_iter().flatten().map(|e| &e.pin)
    }
}

/// Which index buckets a pin belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Path,
    Children,
    References,
    Overrides,
    Macros,
}

#[derive(Default)]
pub struct Store {
    groups: Arena<Group>,
    group_keys: FxHashMap<SmolStr, GroupId>,
    paths: Index,
    children: Index,
    references: Index,
    overrides: Index,
    macros: Index,
    blocks: Vec<Entry>,
    /// `(name, joined gates)` to resolved path. Cleared on every update.
    pub(crate) constant_memo: DashMap<(SmolStr, SmolStr), Option<SmolStr>>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from groups in order.
    pub fn from_groups(groups: impl IntoIterator<Item = (SmolStr, Vec<PinRef>)>) -> Self {
        let mut store = Store::new();
        for (key, pins) in groups {
            store.update(key, pins);
        }
        store
    }

    /// Replace the pins contributed by `key`. A new key is ordered after
    /// every existing group; an existing key keeps its position.
    pub fn update(&mut self, key: impl Into<SmolStr>, pins: Vec<PinRef>) {
        let key = key.into();
        let id = match self.group_keys.get(&key) {
            Some(&id) => {
                self.unindex(id);
                id
            }
            None => {
                let id = self.groups.alloc(Group {
                    key: key.clone(),
                    pins: Vec::new(),
                });
                self.group_keys.insert(key.clone(), id);
                id
            }
        };
        log::debug!("store update `{key}`: {} pins", pins.len());
        self.groups[id].pins = pins;
        self.index(id);
        self.constant_memo.clear();
    }

    /// Drop a group. Returns whether it existed.
    pub fn remove(&mut self, key: &str) -> bool {
        let Some(id) = self.group_keys.remove(key) else {
            return false;
        };
        self.unindex(id);
        self.groups[id].pins.clear();
        self.constant_memo.clear();
        true
    }

    fn index(&mut self, id: GroupId) {
        let ord = group_ordinal(id);
        let pins = self.groups[id].pins.clone();
        for (seq, pin) in pins.into_iter().enumerate() {
            let entry = Entry {
                order: (ord, seq as u32),
                pin: pin.clone(),
            };
            if matches!(pin.kind, PinKind::Block(_)) {
                let pos = self.blocks.partition_point(|e| e.order <= entry.order);
                self.blocks.insert(pos, entry.clone());
            }
            for (slot, key) in slots(&pin) {
                self.index_mut(slot).insert(key, entry.clone());
            }
        }
    }

    fn unindex(&mut self, id: GroupId) {
        let ord = group_ordinal(id);
        let pins = std::mem::take(&mut self.groups[id].pins);
        for pin in &pins {
            for (slot, key) in slots(pin) {
                self.index_mut(slot).remove_group(&key, ord);
            }
        }
        self.blocks.retain(|e| e.order.0 != ord);
    }

    fn index_mut(&mut self, slot: Slot) -> &mut Index {
        match slot {
            Slot::Path => &mut self.paths,
            Slot::Children => &mut self.children,
            Slot::References => &mut self.references,
            Slot::Overrides => &mut self.overrides,
            Slot::Macros => &mut self.macros,
        }
    }

    // ==========================================================================
    // Queries
    // ==========================================================================

    pub fn group_keys(&self) -> impl Iterator<Item = &SmolStr> {
        self.groups
            .iter()
            .filter(|(id, group)| self.group_keys.get(&group.key) == Some(id))
            .map(|(_, group)| &group.key)
    }

    pub fn group_pins(&self, key: &str) -> &[PinRef] {
        match self.group_keys.get(key) {
            Some(&id) => &self.groups[id].pins,
            None => &[],
        }
    }

    pub fn pin_count(&self) -> usize {
        self.groups.iter().map(|(_, g)| g.pins.len()).sum()
    }

    /// Every pin with exactly this path.
    pub fn path_pins(&self, path: &str) -> Vec<PinRef> {
        self.paths.get(path).cloned().collect()
    }

    pub fn has_path(&self, path: &str) -> bool {
        self.paths.0.contains_key(path)
    }

    pub fn namespace_pins(&self, path: &str) -> Vec<PinRef> {
        self.paths.get(path).filter(|p| p.is_namespace()).cloned().collect()
    }

    pub fn is_namespace(&self, path: &str) -> bool {
        path.is_empty() || self.paths.get(path).any(|p| p.is_namespace())
    }

    /// A namespace or constant declared at `path`.
    pub fn is_constant_path(&self, path: &str) -> bool {
        self.paths.get(path).any(|p| p.is_namespace() || p.is_constant())
    }

    /// Whether the namespace at `path` was declared as a module.
    pub fn is_module(&self, path: &str) -> bool {
        self.paths.get(path).any(|p| {
            p.as_namespace()
                .is_some_and(|ns| ns.kind == lang_pin::NamespaceKind::Module)
        })
    }

    /// Generic names declared by the first namespace pin at `path` that
    /// declares any.
    pub fn namespace_generics(&self, path: &str) -> Vec<SmolStr> {
        self.paths
            .get(path)
            .filter_map(|p| p.as_namespace())
            .find(|ns| !ns.generics.is_empty())
            .map(|ns| ns.generics.clone())
            .unwrap_or_default()
    }

    /// Namespace-level members declared directly in `namespace`.
    pub fn namespace_children(&self, namespace: &str) -> Vec<PinRef> {
        self.children.get(namespace).cloned().collect()
    }

    pub fn methods_in(&self, namespace: &str, scope: Scope) -> Vec<PinRef> {
        self.children
            .get(namespace)
            .filter(|p| p.method_scope() == Some(scope))
            .cloned()
            .collect()
    }

    /// Constants and nested namespaces declared directly in `namespace`.
    pub fn constants_in(&self, namespace: &str) -> Vec<PinRef> {
        self.children
            .get(namespace)
            .filter(|p| p.is_constant() || p.is_namespace())
            .cloned()
            .collect()
    }

    /// Ancestry edges declared on `subject` of the given kind.
    pub fn references(&self, subject: &str, kind: ReferenceKind) -> Vec<PinRef> {
        self.references
            .get(subject)
            .filter(|p| p.as_reference().is_some_and(|r| r.kind == kind))
            .cloned()
            .collect()
    }

    /// Reference pins on `subject` of any of `kinds`, in declaration order.
    pub fn references_of(&self, subject: &str, kinds: &[ReferenceKind]) -> Vec<PinRef> {
        self.references
            .get(subject)
            .filter(|p| p.as_reference().is_some_and(|r| kinds.contains(&r.kind)))
            .cloned()
            .collect()
    }

    /// Override pins targeting the method at `path`.
    pub fn overrides(&self, path: &str) -> Vec<PinRef> {
        self.overrides.get(path).cloned().collect()
    }

    pub fn block_pins(&self) -> impl Iterator<Item = &PinRef> {
        self.blocks.iter().map(|e| &e.pin)
    }

    /// The first macro directive with a body declared under `name`.
    pub fn named_macro(&self, name: &str) -> Option<Directive> {
        self.macros.get(name).find_map(|pin| {
            pin.macros()
                .into_iter()
                .find(|d| d.label() == Some(name))
                .cloned()
        })
    }

    pub fn all_pins(&self) -> impl Iterator<Item = &PinRef> {
        self.groups.iter().flat_map(|(_, g)| g.pins.iter())
    }
}

fn group_ordinal(id: GroupId) -> u32 {
    u32::from(id.into_raw())
}

fn slots(pin: &PinRef) -> Vec<(Slot, SmolStr)> {
    let mut out = vec![(Slot::Path, pin.path().clone())];
    match &pin.kind {
        PinKind::Reference(data) if data.kind == ReferenceKind::Override => {
            out.push((Slot::Overrides, pin.name.clone()));
        }
        PinKind::Reference(_) => out.push((Slot::References, pin.namespace())),
        // the root namespace has no owner
        PinKind::Namespace(_) if !pin.path().is_empty() => {
            out.push((Slot::Children, parent_path(pin.path())));
        }
        PinKind::Method(_)
        | PinKind::Constant(_)
        | PinKind::InstanceVariable(_)
        | PinKind::ClassVariable(_) => out.push((Slot::Children, pin.namespace())),
        _ => {}
    }
    for label in pin.macros().iter().filter_map(|d| d.label()) {
        out.push((Slot::Macros, SmolStr::new(label)));
    }
    out
}

/// Owner of a namespace: `Foo` for `Foo::Bar` even when declared compactly
/// at the top level.
fn parent_path(path: &str) -> SmolStr {
    path.rsplit_once("::")
        .map(|(parent, _)| SmolStr::new(parent))
        .unwrap_or_default()
}
