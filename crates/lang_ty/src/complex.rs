// ==============================================================================
// Complex Types
// ==============================================================================
//
// A ComplexType is an ordered, de-duplicated union of UniqueTypes. An empty
// union is never constructed: anything that would produce one yields
// `undefined` instead.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, LazyLock};

use smol_str::SmolStr;

use crate::{Scope, UniqueType};

#[derive(Clone, derive_more::Debug)]
#[debug("{}", _0.rooted_tag)]
pub struct ComplexType(Arc<ComplexData>);

struct ComplexData {
    items: Vec<UniqueType>,
    tag: SmolStr,
    rooted_tag: SmolStr,
}

macro_rules! sentinel {
    ($fn_name:ident, $static_name:ident, $name:literal) => {
        pub fn $fn_name() -> ComplexType {
            static $static_name: LazyLock<ComplexType> =
                LazyLock::new(|| ComplexType::from(UniqueType::named($name)));
            $static_name.clone()
        }
    };
}

impl ComplexType {
    pub fn new(items: impl IntoIterator<Item = UniqueType>) -> Self {
        let mut unique: Vec<UniqueType> = Vec::new();
        for item in items {
            if !unique.iter().any(|seen| seen.tag() == item.tag()) {
                unique.push(item);
            }
        }
        if unique.is_empty() {
            return Self::undefined();
        }
        Self::from_unique(unique)
    }

    fn from_unique(items: Vec<UniqueType>) -> Self {
        let tag = join_tags(items.iter().map(UniqueType::tag));
        let rooted_tag = join_tags(items.iter().map(UniqueType::rooted_tag));
        ComplexType(Arc::new(ComplexData {
            items,
            tag,
            rooted_tag,
        }))
    }

    sentinel!(undefined, UNDEFINED, "undefined");
    sentinel!(nil, NIL, "nil");
    sentinel!(void, VOID, "void");
    sentinel!(self_type, SELF, "self");
    sentinel!(boolean, BOOLEAN, "Boolean");

    /// Shorthand for an absolute class name, e.g. `ComplexType::root("Integer")`.
    pub fn root(name: &str) -> ComplexType {
        ComplexType::from(UniqueType::rooted(name))
    }

    /// Flattened union of several types; undefined when empty.
    pub fn union_all(types: impl IntoIterator<Item = ComplexType>) -> ComplexType {
        let items: Vec<UniqueType> = types
            .into_iter()
            .flat_map(|t| t.items().to_vec())
            .collect();
        ComplexType::new(items)
    }

    pub fn union(&self, other: &ComplexType) -> ComplexType {
        ComplexType::union_all([self.clone(), other.clone()])
    }

    pub fn items(&self) -> &[UniqueType] {
        &self.0.items
    }

    pub fn len(&self) -> usize {
        self.0.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.items.is_empty()
    }

    pub fn first(&self) -> &UniqueType {
        // construction guarantees at least one member
        &self.0.items[0]
    }

    pub fn tag(&self) -> &SmolStr {
        &self.0.tag
    }

    pub fn rooted_tag(&self) -> &SmolStr {
        &self.0.rooted_tag
    }

    pub fn name(&self) -> SmolStr {
        self.first().name().clone()
    }

    pub fn namespace(&self) -> SmolStr {
        self.first().namespace().clone()
    }

    pub fn scope(&self) -> Scope {
        self.first().scope()
    }

    pub fn is_rooted(&self) -> bool {
        self.0.items.iter().all(UniqueType::is_rooted)
    }

    pub fn is_undefined(&self) -> bool {
        self.0.items.iter().all(UniqueType::is_undefined)
    }

    pub fn is_defined(&self) -> bool {
        !self.is_undefined()
    }

    pub fn is_nil(&self) -> bool {
        self.0.items.iter().all(UniqueType::is_nil)
    }

    pub fn is_void(&self) -> bool {
        self.0.items.iter().all(UniqueType::is_void)
    }

    pub fn is_duck(&self) -> bool {
        self.0.items.iter().all(UniqueType::is_duck)
    }

    pub fn is_self(&self) -> bool {
        self.0.items.len() == 1 && self.first().is_self()
    }

    pub fn is_tuple(&self) -> bool {
        self.0.items.len() == 1 && self.first().is_tuple()
    }

    pub fn has_nil(&self) -> bool {
        self.0.items.iter().any(UniqueType::is_nil)
    }

    /// Contains a `generic<T>` placeholder anywhere in the tree.
    pub fn is_generic(&self) -> bool {
        self.0.items.iter().any(|item| {
            item.is_generic_placeholder() || item.all_params().any(ComplexType::is_generic)
        })
    }

    pub fn contains_self(&self) -> bool {
        self.0
            .items
            .iter()
            .any(|item| item.is_self() || item.all_params().any(ComplexType::contains_self))
    }

    /// Names bound by every `generic<T>` placeholder in the tree, first occurrence order.
    pub fn generic_names(&self) -> Vec<SmolStr> {
        let mut names = Vec::new();
        self.collect_generic_names(&mut names);
        names
    }

    fn collect_generic_names(&self, names: &mut Vec<SmolStr>) {
        for item in self.items() {
            if let Some(name) = item.generic_name() {
                if !names.contains(&name) {
                    names.push(name);
                }
                continue;
            }
            for param in item.all_params() {
                param.collect_generic_names(names);
            }
        }
    }

    /// Members except `nil`; undefined when nothing else remains.
    pub fn without_nil(&self) -> ComplexType {
        self.select(|item| !item.is_nil())
    }

    pub fn select(&self, keep: impl Fn(&UniqueType) -> bool) -> ComplexType {
        ComplexType::new(self.items().iter().filter(|item| keep(item)).cloned())
    }
}

fn join_tags<'a>(tags: impl Iterator<Item = &'a SmolStr>) -> SmolStr {
    let mut out = String::new();
    for (idx, tag) in tags.enumerate() {
        if idx > 0 {
            out.push_str(", ");
        }
        out.push_str(tag);
    }
    SmolStr::from(out)
}

impl From<UniqueType> for ComplexType {
    fn from(value: UniqueType) -> Self {
        ComplexType::from_unique(vec![value])
    }
}

impl Default for ComplexType {
    fn default() -> Self {
        ComplexType::undefined()
    }
}

impl PartialEq for ComplexType {
    fn eq(&self, other: &Self) -> bool {
        self.0.tag == other.0.tag
    }
}

impl Eq for ComplexType {}

impl Hash for ComplexType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.tag.hash(state);
    }
}

impl fmt::Display for ComplexType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.tag)
    }
}
