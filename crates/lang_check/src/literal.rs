// Array and hash literals. Element types are widened from literal types to
// their classes; a single undefined element leaves the container bare.

use itertools::Itertools;
use lang_pin::Chain;
use lang_ty::{ComplexType, ParamKind, UniqueType};

use crate::chain::LinkCtx;
use crate::Resolver;

impl Resolver<'_> {
    pub(crate) fn infer_array(&self, items: &[Chain], cx: &LinkCtx) -> ComplexType {
        let types: Vec<ComplexType> = items
            .iter()
            .map(|item| self.infer(item, cx.lexical, cx.locals).simplify_literals())
            .collect();
        array_type(types)
    }

    pub(crate) fn infer_hash(&self, entries: &[(Chain, Chain)], cx: &LinkCtx) -> ComplexType {
        let mut keys = Vec::with_capacity(entries.len());
        let mut values = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            keys.push(self.infer(key, cx.lexical, cx.locals).simplify_literals());
            values.push(self.infer(value, cx.lexical, cx.locals).simplify_literals());
        }
        hash_type(keys, values)
    }
}

/// `::Array<T>` when every element agrees, a fixed tuple otherwise.
pub(crate) fn array_type(types: Vec<ComplexType>) -> ComplexType {
    if types.is_empty() || types.iter().any(ComplexType::is_undefined) {
        return ComplexType::root("Array");
    }
    let (subtypes, kind) = if types.iter().all_equal() {
        (vec![types[0].clone()], ParamKind::List)
    } else {
        (types, ParamKind::Fixed)
    };
    ComplexType::from(UniqueType::new("Array", true, Vec::new(), subtypes, kind))
}

pub(crate) fn hash_type(keys: Vec<ComplexType>, values: Vec<ComplexType>) -> ComplexType {
    let undefined = keys.iter().chain(&values).any(ComplexType::is_undefined);
    if keys.is_empty() || undefined {
        return ComplexType::root("Hash");
    }
    ComplexType::from(UniqueType::new(
        "Hash",
        true,
        vec![ComplexType::union_all(keys)],
        vec![ComplexType::union_all(values)],
        ParamKind::Hash,
    ))
}
