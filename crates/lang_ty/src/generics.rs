// ==============================================================================
// Structural Generic Unification
// ==============================================================================
//
// A declared type containing `generic<T>` placeholders is matched against a
// context type of the same shape: a placeholder binds to whatever sits in the
// corresponding position of the context. The first binding for a name wins;
// later sources can only fill names that are still unbound.

use std::collections::BTreeMap;

use smol_str::SmolStr;

use crate::{ComplexType, ParamKind, UniqueType};

/// Generic name to bound type. Ordered so that two binding maps compare
/// equal exactly when they hold the same bindings.
pub type GenericBindings = BTreeMap<SmolStr, ComplexType>;

impl ComplexType {
    /// Bind the named generics by matching `self` against `context`, returning
    /// `self` with every bound placeholder substituted.
    pub fn resolve_generics_from_context(
        &self,
        generics: &[SmolStr],
        context: Option<&ComplexType>,
        bindings: &mut GenericBindings,
    ) -> ComplexType {
        if !self.is_generic() {
            return self.clone();
        }
        let mut items = Vec::with_capacity(self.len());
        for item in self.items() {
            let resolved = item.resolve_generics_from_context(generics, context, bindings);
            items.extend(resolved.items().iter().cloned());
        }
        ComplexType::new(items)
    }
}

impl UniqueType {
    pub fn resolve_generics_from_context(
        &self,
        generics: &[SmolStr],
        context: Option<&ComplexType>,
        bindings: &mut GenericBindings,
    ) -> ComplexType {
        if let Some(name) = self.generic_name() {
            if !generics.contains(&name) {
                return ComplexType::from(self.clone());
            }
            if let Some(ctx) = context.filter(|ctx| ctx.is_defined()) {
                if !bindings.contains_key(&name) {
                    bindings.insert(name.clone(), ctx.clone());
                    refresh_bindings(bindings);
                }
            }
            return match bindings.get(&name) {
                Some(bound) => bound.clone(),
                None => ComplexType::from(self.clone()),
            };
        }

        if !self.all_params().any(ComplexType::is_generic) {
            return ComplexType::from(self.clone());
        }

        let counterpart = context.and_then(|ctx| matching_member(self, ctx));
        let key_ctx = counterpart.map(|c| context_slots(self.key_types(), c.key_types(), self));
        let sub_ctx = counterpart.map(|c| context_slots(self.subtypes(), c.subtypes(), self));

        let key_types = resolve_slots(self.key_types(), key_ctx, generics, bindings);
        let subtypes = resolve_slots(self.subtypes(), sub_ctx, generics, bindings);
        ComplexType::from(self.with_params(key_types, subtypes))
    }
}

/// Binds namespace generics (`Array[Elem]`) from a receiver's parameters
/// (`Array<String>` binds `Elem` to `String`).
pub fn bind_from_parameters(generics: &[SmolStr], receiver: &UniqueType) -> GenericBindings {
    let mut bindings = GenericBindings::new();
    if generics.is_empty() {
        return bindings;
    }

    let values: Vec<ComplexType> = match receiver.param_kind() {
        ParamKind::None => Vec::new(),
        ParamKind::Hash => vec![receiver.key_type(), receiver.value_type()],
        ParamKind::List | ParamKind::Fixed if generics.len() == 1 => vec![receiver.value_type()],
        ParamKind::List | ParamKind::Fixed => receiver.subtypes().to_vec(),
    };

    for (name, value) in generics.iter().zip(values) {
        if value.is_defined() {
            bindings.insert(name.clone(), value);
        }
    }
    bindings
}

fn matching_member<'a>(declared: &UniqueType, context: &'a ComplexType) -> Option<&'a UniqueType> {
    context
        .items()
        .iter()
        .find(|member| member.name() == declared.name())
        .or_else(|| context.items().first())
}

/// Context for each declared slot. A list with a single declared element
/// matches the union of all context elements.
fn context_slots(
    declared: &[ComplexType],
    context: &[ComplexType],
    owner: &UniqueType,
) -> Vec<ComplexType> {
    if declared.len() == 1 && owner.param_kind() == ParamKind::List && context.len() > 1 {
        return vec![ComplexType::union_all(context.iter().cloned())];
    }
    context.to_vec()
}

fn resolve_slots(
    declared: &[ComplexType],
    context: Option<Vec<ComplexType>>,
    generics: &[SmolStr],
    bindings: &mut GenericBindings,
) -> Vec<ComplexType> {
    declared
        .iter()
        .enumerate()
        .map(|(idx, slot)| {
            let ctx = context.as_ref().and_then(|c| c.get(idx));
            slot.resolve_generics_from_context(generics, ctx, bindings)
        })
        .collect()
}

/// A fresh binding can complete values that referred to it.
fn refresh_bindings(bindings: &mut GenericBindings) {
    let snapshot = bindings.clone();
    for value in bindings.values_mut() {
        if value.is_generic() {
            *value = value.substitute_generics(&snapshot);
        }
    }
}
