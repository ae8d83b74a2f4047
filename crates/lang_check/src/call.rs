// ==============================================================================
// Call Resolution
// ==============================================================================
//
// A call with no receiver is first looked up among the visible locals, so a
// local shadows a method of the same name. Otherwise every member of the
// receiver's union contributes its method stack, and each candidate is
// narrowed to the first overload accepting the arguments:
//
//   1. block-requiring overloads are tried before the others
//   2. arity, then each argument against its parameter
//   3. generics bound from arguments and the block's type
//   4. `self` replaced by the receiver, names qualified in the method's
//      namespace
//
// A candidate whose type stays undefined falls back to its macros and is
// returned regardless, proxied with whatever was inferred.

use lang_pin::{Call, Chain, Pin, PinRef, Signature};
use lang_ty::{ComplexType, GenericBindings, Scope, UniqueType};

use crate::chain::LinkCtx;
use crate::narrow::visible_pins;
use crate::Resolver;

/// Outcome of matching a call against a method's overloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Overload<'s> {
    Matched(&'s Signature),
    /// No overload takes this many arguments (or the block).
    Arity,
    /// The first overload that fit on arity rejected an argument.
    Argument {
        index: usize,
        expected: ComplexType,
        actual: ComplexType,
    },
}

impl<'a> Resolver<'a> {
    pub(crate) fn resolve_call(&self, call: &Call, cx: &LinkCtx) -> Vec<PinRef> {
        match call.word.as_str() {
            "super" => return self.resolve_super(call, cx),
            "yield" => return self.resolve_yield(cx),
            _ => {}
        }

        if cx.head {
            let at = call.location.as_ref().map(|l| l.range.start).or(cx.at);
            let locals = visible_pins(cx.locals, &call.word, cx.lexical, at);
            if !locals.is_empty() {
                return locals;
            }
        }

        let context = cx.context.context();
        let mut found = Vec::new();
        for member in context.items() {
            let stack = self.store.method_stack(member, &call.word);
            found.extend(self.inferred_pins(&stack, call, cx, &ComplexType::from(member.clone())));
        }

        if found.is_empty() && call.word == "new" && context.items().iter().all(|m| m.scope() == Scope::Class) {
            log::debug!("no `new` declared on {context}, constructing its instance type");
            return vec![Pin::proxy_in(cx.lexical, context.reduce_class_type()).into_ref()];
        }
        if found.is_empty() {
            log::debug!("no method `{}` on {context}", call.word);
        }
        found
    }

    /// The enclosing method's stack minus the method itself.
    fn resolve_super(&self, call: &Call, cx: &LinkCtx) -> Vec<PinRef> {
        let Some(method) = cx.lexical.enclosing_method() else {
            return Vec::new();
        };
        let namespace = method.namespace();
        let instance = if namespace.is_empty() {
            ComplexType::root("Object")
        } else {
            ComplexType::root(&namespace)
        };
        let receiver = match method.method_scope() {
            Some(Scope::Class) => instance.to_class_scope(),
            _ => instance,
        };
        let stack: Vec<PinRef> = self
            .store
            .method_stack(receiver.first(), &method.name)
            .into_iter()
            .filter(|pin| pin.path() != method.path())
            .collect();
        self.inferred_pins(&stack, call, cx, &receiver)
    }

    /// Return types of the enclosing method's block signatures.
    fn resolve_yield(&self, cx: &LinkCtx) -> Vec<PinRef> {
        let Some(method) = cx.lexical.enclosing_method() else {
            return Vec::new();
        };
        let gates = cx.lexical.gates();
        method
            .signatures()
            .iter()
            .filter_map(|signature| signature.block.as_deref())
            .map(|block| Pin::proxy_in(cx.lexical, block.return_type.qualify(self.store, &gates)).into_ref())
            .collect()
    }

    fn inferred_pins(&self, pins: &[PinRef], call: &Call, cx: &LinkCtx, context: &ComplexType) -> Vec<PinRef> {
        if pins.is_empty() {
            return Vec::new();
        }
        let arg_types: Vec<ComplexType> = call
            .arguments
            .iter()
            .map(|arg| self.infer(arg, cx.lexical, cx.locals).simplify_literals())
            .collect();
        pins.iter()
            .map(|pin| self.infer_call_pin(pin, call, cx, context, &arg_types))
            .collect()
    }

    fn infer_call_pin(
        &self,
        pin: &PinRef,
        call: &Call,
        cx: &LinkCtx,
        context: &ComplexType,
        arg_types: &[ComplexType],
    ) -> PinRef {
        let (pin, mut ty) = self.call_return_type(pin, call, cx, context, arg_types);
        if ty.is_undefined() {
            ty = self.macro_return_type(&pin, arg_types);
        }
        if pin.path() == "Class#new" && context.tag() != "Class" {
            return pin.proxy(context.reduce_class_type()).into_ref();
        }
        pin.proxy(ty.self_to_type(context)).into_ref()
    }

    /// The candidate narrowed to the overload that answered the call, and
    /// that overload's resolved return type. Matching overloads are tried in
    /// order until one yields a defined type; if none does, the last match
    /// is kept.
    fn call_return_type(
        &self,
        pin: &PinRef,
        call: &Call,
        cx: &LinkCtx,
        context: &ComplexType,
        arg_types: &[ComplexType],
    ) -> (Pin, ComplexType) {
        let gates = pin.gates();
        let signatures = ordered_overloads(pin);
        // documented methods without signatures
        if signatures.is_empty() {
            let ty = pin.return_type().self_to_type(context).qualify(self.store, &gates);
            return ((**pin).clone(), ty);
        }

        let mut answer: Option<(Signature, ComplexType)> = None;
        for signature in signatures {
            if !signature.arity_matches(arg_types.len(), call.with_block())
                || self.argument_mismatch(pin, signature, arg_types).is_some()
            {
                continue;
            }
            let block_type = if signature.has_block() && call.with_block() {
                self.block_type(signature, call, cx, context)
            } else {
                None
            };
            let mut bindings = GenericBindings::new();
            let resolved = signature.resolve_generics_until_complete(
                Some(arg_types),
                None,
                None,
                block_type.as_ref(),
                &mut bindings,
            );
            let ty = resolved
                .return_type
                .self_to_type(context)
                .qualify(self.store, &gates);
            let defined = ty.is_defined();
            answer = Some((resolved, ty));
            if defined {
                break;
            }
        }

        match answer {
            Some((resolved, ty)) => (pin.with_single_signature(resolved), ty),
            None => {
                if let Some(rejected) = self.select_overload(pin, call, arg_types) {
                    log::debug!("{} rejects `{}`: {rejected:?}", pin.path(), call.word);
                }
                ((**pin).clone(), ComplexType::undefined())
            }
        }
    }

    /// First overload accepting the call; `None` when the pin has no
    /// signatures at all.
    pub(crate) fn select_overload<'s>(
        &self,
        pin: &'s Pin,
        call: &Call,
        arg_types: &[ComplexType],
    ) -> Option<Overload<'s>> {
        let signatures = ordered_overloads(pin);
        if signatures.is_empty() {
            return None;
        }
        let mut outcome = Overload::Arity;
        for signature in signatures {
            if !signature.arity_matches(arg_types.len(), call.with_block()) {
                continue;
            }
            match self.argument_mismatch(pin, signature, arg_types) {
                None => return Some(Overload::Matched(signature)),
                Some(mismatch) if outcome == Overload::Arity => outcome = mismatch,
                Some(_) => {}
            }
        }
        Some(outcome)
    }

    fn argument_mismatch(
        &self,
        pin: &Pin,
        signature: &Signature,
        arg_types: &[ComplexType],
    ) -> Option<Overload<'static>> {
        let gates = pin.gates();
        for (index, actual) in arg_types.iter().enumerate() {
            let Some(param) = signature.parameter_for_argument(index) else {
                return Some(Overload::Argument {
                    index,
                    expected: ComplexType::undefined(),
                    actual: actual.clone(),
                });
            };
            let expected = &param.declared_type;
            // unknown on either side matches anything
            if expected.is_undefined() || expected.is_generic() || actual.is_undefined() {
                continue;
            }
            let expected = expected.qualify(self.store, &gates);
            if !self.accepts(&expected, actual) {
                return Some(Overload::Argument {
                    index,
                    expected,
                    actual: actual.clone(),
                });
            }
        }
        None
    }

    /// Every member of `actual` is named by, or descends from, a member of
    /// `expected`.
    fn accepts(&self, expected: &ComplexType, actual: &ComplexType) -> bool {
        actual.items().iter().all(|arg| {
            expected.items().iter().any(|param| {
                param.name() == arg.name() || self.store.is_super_and_sub(param.namespace(), arg.namespace())
            })
        })
    }

    /// What the block passed to the call evaluates to.
    fn block_type(
        &self,
        signature: &Signature,
        call: &Call,
        cx: &LinkCtx,
        context: &ComplexType,
    ) -> Option<ComplexType> {
        if let Some(symbol) = call.block_symbol() {
            let ty = self.block_symbol_type(signature, symbol, context);
            return ty.is_defined().then_some(ty);
        }
        let block = call.block.as_deref()?;
        let block_pin = self.enclosing_block(block).unwrap_or_else(|| cx.lexical.clone());
        let ty = self.infer(block, &block_pin, cx.locals).simplify_literals();
        ty.is_defined().then_some(ty)
    }

    /// `&:sym` sends `sym` to the first value yielded to the block. When
    /// the yielded type is still generic, the receiver's first type
    /// parameter stands in for it.
    fn block_symbol_type(&self, signature: &Signature, symbol: &str, context: &ComplexType) -> ComplexType {
        let yielded = signature.block_parameter_type(0);
        let receiver: Option<UniqueType> = if yielded.is_defined() && !yielded.is_generic() {
            Some(yielded.first().clone())
        } else {
            context
                .first()
                .subtypes()
                .first()
                .map(|param| param.first().clone())
        };
        let Some(receiver) = receiver else {
            return ComplexType::undefined();
        };
        match self.store.method_stack(&receiver, symbol).first() {
            Some(method) => method.return_type().qualify(self.store, &method.gates()),
            None => ComplexType::undefined(),
        }
    }

    /// The innermost block pin whose body contains `block`.
    fn enclosing_block(&self, block: &Chain) -> Option<PinRef> {
        let location = block.location.as_ref()?;
        self.store
            .block_pins()
            .filter(|pin| pin.location.as_ref().is_some_and(|l| l.contains(location)))
            .max_by_key(|pin| pin.location.as_ref().map(|l| l.range.start))
            .cloned()
    }
}

/// Overloads taking a block come first, each group in declaration order.
fn ordered_overloads(pin: &Pin) -> Vec<&Signature> {
    let (mut ordered, without_block): (Vec<&Signature>, Vec<&Signature>) =
        pin.signatures().iter().partition(|s| s.has_block());
    ordered.extend(without_block);
    ordered
}
