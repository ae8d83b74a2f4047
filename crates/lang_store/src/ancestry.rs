// ==============================================================================
// Ancestry
// ==============================================================================
//
// Method lookup order for a namespace, most specific first:
//
//   instance scope: prepends (last first), the namespace, includes (last
//                   first), then the superclass chain
//   class scope:    the namespace, its extends (as instance modules), the
//                   superclass chain at class scope, then `Class`/`Module`
//
// The walk is an explicit worklist with a visited set on (path, scope), so a
// cyclic or dangling reference edge truncates the walk instead of looping.
// Each frame carries the generic bindings in effect for that namespace.

use itertools::Itertools;
use lang_pin::{PinKind, PinRef, ReferenceKind, Signature};
use lang_ty::{bind_from_parameters, ComplexType, GenericBindings, Scope, UniqueType};
use rustc_hash::FxHashSet;
use smol_str::SmolStr;

use crate::Store;

/// One namespace in an ancestry walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AncestorFrame {
    pub path: SmolStr,
    pub scope: Scope,
    /// The namespace's own generic names bound to concrete types.
    pub bindings: GenericBindings,
}

impl AncestorFrame {
    pub fn new(path: impl Into<SmolStr>, scope: Scope) -> Self {
        Self {
            path: path.into(),
            scope,
            bindings: GenericBindings::new(),
        }
    }
}

enum Visit {
    Expand(AncestorFrame),
    Emit(AncestorFrame),
}

impl Store {
    /// Ancestry frames for a namespace path.
    pub fn ancestors(&self, path: &str, scope: Scope) -> Vec<AncestorFrame> {
        self.walk(AncestorFrame::new(path, scope))
    }

    /// Ancestry frames for a receiver type, binding the namespace's generic
    /// names from the type's parameters (`Array<String>` binds `Elem`).
    pub fn ancestors_of(&self, receiver: &UniqueType) -> Vec<AncestorFrame> {
        let path = receiver.namespace().clone();
        let scope = receiver.scope();
        let instance = match scope {
            // Class<Array<String>> carries the parameters one level down
            Scope::Class => receiver
                .subtypes()
                .first()
                .map(|t| t.first().clone())
                .unwrap_or_else(|| receiver.clone()),
            Scope::Instance => receiver.clone(),
        };
        let generics = self.namespace_generics(&path);
        let mut frame = AncestorFrame::new(path, scope);
        frame.bindings = bind_from_parameters(&generics, &instance);
        self.walk(frame)
    }

    /// Namespace pins of every ancestor of `path` at instance scope, most
    /// specific first. Ancestors without a declaration are skipped.
    pub fn ancestry_stack(&self, path: &str) -> Vec<PinRef> {
        self.ancestors(path, Scope::Instance)
            .iter()
            .flat_map(|frame| self.namespace_pins(&frame.path))
            .collect()
    }

    fn walk(&self, start: AncestorFrame) -> Vec<AncestorFrame> {
        let mut out = Vec::new();
        let mut visited: FxHashSet<(SmolStr, Scope)> = FxHashSet::default();
        let mut stack = Vec::new();

        if start.scope == Scope::Class {
            let meta = if self.is_module(&start.path) {
                "Module"
            } else {
                "Class"
            };
            stack.push(Visit::Expand(AncestorFrame::new(meta, Scope::Instance)));
        }
        stack.push(Visit::Expand(start));

        while let Some(visit) = stack.pop() {
            let frame = match visit {
                Visit::Emit(frame) => {
                    out.push(frame);
                    continue;
                }
                Visit::Expand(frame) => frame,
            };
            if !visited.insert((frame.path.clone(), frame.scope)) {
                continue;
            }

            let mut order = Vec::new();
            match frame.scope {
                Scope::Instance => {
                    for prepended in self.edges(&frame, ReferenceKind::Prepend).into_iter().rev() {
                        order.push(Visit::Expand(prepended));
                    }
                    let superclass = self.superclass_frame(&frame, Scope::Instance);
                    let includes = self.edges(&frame, ReferenceKind::Include);
                    order.push(Visit::Emit(frame));
                    for included in includes.into_iter().rev() {
                        order.push(Visit::Expand(included));
                    }
                    order.extend(superclass.map(Visit::Expand));
                }
                Scope::Class => {
                    let superclass = self.superclass_frame(&frame, Scope::Class);
                    let extends = self.edges(&frame, ReferenceKind::Extend);
                    order.push(Visit::Emit(frame));
                    for extended in extends.into_iter().rev() {
                        order.push(Visit::Expand(extended));
                    }
                    order.extend(superclass.map(Visit::Expand));
                }
            }
            stack.extend(order.into_iter().rev());
        }
        out
    }

    /// Targets of `kind` edges declared on the frame's namespace, as
    /// instance-scope frames with the edge's generic values bound.
    fn edges(&self, frame: &AncestorFrame, kind: ReferenceKind) -> Vec<AncestorFrame> {
        self.references(&frame.path, kind)
            .iter()
            .filter_map(|reference| self.edge_frame(frame, reference, Scope::Instance))
            .collect()
    }

    fn edge_frame(
        &self,
        from: &AncestorFrame,
        reference: &PinRef,
        scope: Scope,
    ) -> Option<AncestorFrame> {
        let Some(target) = self.dereference(reference) else {
            log::debug!("dangling reference {reference:?} on {}", from.path);
            return None;
        };
        let values = reference
            .as_reference()
            .map(|r| r.generic_values.as_slice())
            .unwrap_or_default();
        let mut bindings = GenericBindings::new();
        for (name, value) in self.namespace_generics(&target).into_iter().zip(values) {
            let value = value.substitute_generics(&from.bindings);
            if value.is_defined() && !value.is_generic() {
                bindings.insert(name, value);
            }
        }
        Some(AncestorFrame {
            path: target,
            scope,
            bindings,
        })
    }

    fn superclass_frame(&self, frame: &AncestorFrame, scope: Scope) -> Option<AncestorFrame> {
        if let Some(reference) = self.references(&frame.path, ReferenceKind::Superclass).first() {
            return self.edge_frame(frame, reference, scope);
        }
        implicit_superclass(&frame.path, self.is_module(&frame.path))
            .map(|path| AncestorFrame::new(path, scope))
    }

    // ==========================================================================
    // Method stacks
    // ==========================================================================

    /// Every method named `name` visible on `receiver`, most specific
    /// first. Namespace generics are substituted from the receiver and
    /// override pins applied; the stored pins are never modified.
    pub fn method_stack(&self, receiver: &UniqueType, name: &str) -> Vec<PinRef> {
        self.ancestors_of(receiver)
            .iter()
            .flat_map(|frame| {
                self.methods_in(&frame.path, frame.scope)
                    .into_iter()
                    .filter(|pin| pin.name == name)
                    .map(|pin| self.specialize(pin, &frame.bindings))
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    /// Methods visible in a namespace at a scope, nearest definition of
    /// each name only.
    pub fn methods_visible(&self, namespace: &str, scope: Scope) -> Vec<PinRef> {
        self.ancestors(namespace, scope)
            .iter()
            .flat_map(|frame| self.methods_in(&frame.path, frame.scope))
            .unique_by(|pin| pin.name.clone())
            .collect()
    }

    /// Whether `sub` is `sup` or has it among its instance ancestors.
    pub fn is_super_and_sub(&self, sup: &str, sub: &str) -> bool {
        sup == sub
            || self
                .ancestors(sub, Scope::Instance)
                .iter()
                .any(|frame| frame.path == sup)
    }

    fn specialize(&self, pin: PinRef, bindings: &GenericBindings) -> PinRef {
        let pin = self.apply_overrides(pin);
        if bindings.is_empty() {
            return pin;
        }
        if pin.signatures().is_empty() {
            if !pin.return_type().is_generic() {
                return pin;
            }
            let bound = pin.return_type().substitute_generics(bindings);
            return pin.proxy(bound).into_ref();
        }
        let signatures = pin
            .signatures()
            .iter()
            .map(|sig| sig.substitute_generics(bindings))
            .collect();
        pin.with_signatures(signatures).into_ref()
    }

    /// The last override pin targeting a method replaces its return type.
    fn apply_overrides(&self, pin: PinRef) -> PinRef {
        let Some(override_pin) = self.overrides(pin.path()).pop() else {
            return pin;
        };
        let replacement = match &override_pin.kind {
            PinKind::Reference(data) if !data.generic_values.is_empty() => {
                ComplexType::union_all(data.generic_values.iter().cloned())
            }
            _ => override_pin.docstring().return_type(),
        };
        if replacement.is_undefined() {
            return pin;
        }
        log::debug!("override {} returns {replacement}", pin.path());
        let signatures = if pin.signatures().is_empty() {
            vec![Signature::returning(replacement)]
        } else {
            pin.signatures()
                .iter()
                .map(|sig| Signature {
                    return_type: replacement.clone(),
                    ..sig.clone()
                })
                .collect()
        };
        pin.with_signatures(signatures).into_ref()
    }
}

/// Superclass of a class declared without one.
fn implicit_superclass(path: &str, is_module: bool) -> Option<&'static str> {
    match path {
        _ if is_module => None,
        "" | "BasicObject" => None,
        "Object" => Some("BasicObject"),
        "Class" => Some("Module"),
        "TrueClass" | "FalseClass" => Some("Boolean"),
        _ => Some("Object"),
    }
}
