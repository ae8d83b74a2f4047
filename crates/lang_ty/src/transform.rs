// ==============================================================================
// Type Transforms
// ==============================================================================
//
// Every rewrite of a type tree goes through `transform`, which visits leaves
// bottom-up: parameters are rewritten first, then the callback sees the
// rebuilt member. A callback may return a union, which is spliced into the
// enclosing union (or becomes the whole parameter slot).
//
// `generic<T>` placeholders are leaves: `T` is a name, not a type, so it is
// never handed to the callback on its own.

use smol_str::SmolStr;

use crate::{ComplexType, GenericBindings, UniqueType};

/// Resolves a relative constant name against lexical gates.
pub trait Qualifier {
    /// Fully-qualified path for `name`, or `None` when nothing matches.
    fn qualify_name(&self, name: &str, gates: &[SmolStr]) -> Option<SmolStr>;
}

impl UniqueType {
    pub fn transform(&self, f: &mut dyn FnMut(&UniqueType) -> ComplexType) -> ComplexType {
        if self.is_generic_placeholder() {
            return f(self);
        }
        if self.key_types().is_empty() && self.subtypes().is_empty() {
            return f(self);
        }
        let mut key_types = Vec::with_capacity(self.key_types().len());
        for key in self.key_types() {
            key_types.push(key.transform(&mut *f));
        }
        let mut subtypes = Vec::with_capacity(self.subtypes().len());
        for sub in self.subtypes() {
            subtypes.push(sub.transform(&mut *f));
        }
        f(&self.with_params(key_types, subtypes))
    }
}

impl ComplexType {
    pub fn transform(&self, f: &mut dyn FnMut(&UniqueType) -> ComplexType) -> ComplexType {
        let mut items = Vec::with_capacity(self.len());
        for item in self.items() {
            items.extend(item.transform(&mut *f).items().iter().cloned());
        }
        ComplexType::new(items)
    }

    /// Replace placeholders for the named generics with `undefined`.
    pub fn erase_generics(&self, names: &[SmolStr]) -> ComplexType {
        if !self.is_generic() {
            return self.clone();
        }
        self.transform(&mut |t| match t.generic_name() {
            Some(name) if names.contains(&name) => ComplexType::undefined(),
            _ => ComplexType::from(t.clone()),
        })
    }

    /// Replace every placeholder with `undefined`.
    pub fn erase_all_generics(&self) -> ComplexType {
        if !self.is_generic() {
            return self.clone();
        }
        self.transform(&mut |t| {
            if t.is_generic_placeholder() {
                ComplexType::undefined()
            } else {
                ComplexType::from(t.clone())
            }
        })
    }

    /// Replace bound placeholders with their values. Unbound ones stay.
    pub fn substitute_generics(&self, bindings: &GenericBindings) -> ComplexType {
        if !self.is_generic() || bindings.is_empty() {
            return self.clone();
        }
        self.transform(&mut |t| match t.generic_name().and_then(|n| bindings.get(&n)) {
            Some(bound) => bound.clone(),
            None => ComplexType::from(t.clone()),
        })
    }

    /// Replace `self` with the given context. A metaclass context is reduced
    /// to its instance type first.
    pub fn self_to_type(&self, dst: &ComplexType) -> ComplexType {
        if !self.contains_self() {
            return self.clone();
        }
        let dst = dst.reduce_class_type();
        self.transform(&mut |t| {
            if t.is_self() {
                dst.clone()
            } else {
                ComplexType::from(t.clone())
            }
        })
    }

    /// `Class<Foo>` and `Module<Foo>` become `Foo`.
    pub fn reduce_class_type(&self) -> ComplexType {
        let items: Vec<UniqueType> = self
            .items()
            .iter()
            .flat_map(|item| {
                let is_meta = matches!(item.name().as_str(), "Class" | "Module");
                match item.subtypes().first() {
                    Some(instance) if is_meta => instance.items().to_vec(),
                    _ => vec![item.clone()],
                }
            })
            .collect();
        ComplexType::new(items)
    }

    /// Replace relative names with absolute ones where the qualifier knows them.
    pub fn qualify(&self, qualifier: &dyn Qualifier, gates: &[SmolStr]) -> ComplexType {
        self.transform(&mut |t| {
            if t.has_root_marker()
                || t.is_reserved()
                || t.is_duck()
                || t.is_literal()
                || t.is_generic_placeholder()
            {
                return ComplexType::from(t.clone());
            }
            match qualifier.qualify_name(t.name(), gates) {
                Some(path) => ComplexType::from(t.renamed(path, true)),
                None => ComplexType::from(t.clone()),
            }
        })
    }

    /// Literal types widened to their classes, `true` to `Boolean`.
    pub fn simplify_literals(&self) -> ComplexType {
        self.transform(&mut |t| match t.literal_class() {
            Some(class) => ComplexType::root(class),
            None => ComplexType::from(t.clone()),
        })
    }

    /// Class scope version of an instance type (`Foo` to `Class<Foo>`).
    pub fn to_class_scope(&self) -> ComplexType {
        ComplexType::new(
            self.items()
                .iter()
                .map(|item| UniqueType::list("Class", vec![ComplexType::from(item.clone())])),
        )
    }
}
