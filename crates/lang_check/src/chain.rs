// ==============================================================================
// Chain Resolution
// ==============================================================================
//
// A chain is resolved left to right. Every link but the last collapses to the
// union of its candidates' types, which becomes the receiver of the next
// link. The last link's candidates are returned untouched so that ambiguity
// reaches the caller.

use lang_pin::{Chain, Link, Pin, PinKind, PinRef, Position, VariableKind};
use lang_ty::ComplexType;
use smol_str::format_smolstr;

use crate::narrow::visible_pins;
use crate::Resolver;

/// Where one link is resolved.
pub(crate) struct LinkCtx<'p> {
    /// Evaluates to the receiver: `self` for the head link, the inferred
    /// type of the previous links otherwise.
    pub context: &'p PinRef,
    /// The pin the expression appears in. Supplies gates and the scope
    /// local variables are looked up in.
    pub lexical: &'p PinRef,
    pub locals: &'p [PinRef],
    pub at: Option<Position>,
    /// No receiver: the first link of the chain.
    pub head: bool,
}

impl<'a> Resolver<'a> {
    /// Candidate pins for the last link of `chain`.
    pub fn define(&self, chain: &Chain, name_pin: &PinRef, locals: &[PinRef]) -> Vec<PinRef> {
        if chain.is_undefined() {
            return Vec::new();
        }
        let Some((last, base)) = chain.links.split_last() else {
            return Vec::new();
        };
        let at = chain.location.as_ref().map(|l| l.range.start);

        let mut context = name_pin.clone();
        for (idx, link) in base.iter().enumerate() {
            let cx = LinkCtx {
                context: &context,
                lexical: name_pin,
                locals,
                at,
                head: idx == 0,
            };
            let pins = self.resolve_link(link, &cx);
            let mut ty = self.infer_from_pins(&pins, locals);
            if chain.nullable {
                ty = ty.without_nil();
            }
            if ty.is_undefined() {
                log::debug!("chain `{chain}` stops at `{link}`: receiver is undefined");
                return Vec::new();
            }
            context = Pin::proxy_in(name_pin, ty).into_ref();
        }

        let cx = LinkCtx {
            context: &context,
            lexical: name_pin,
            locals,
            at,
            head: base.is_empty(),
        };
        let pins = self.resolve_link(last, &cx);
        log::debug!("define `{chain}` in {} => {pins:?}", name_pin.path());
        pins
    }

    /// Type of the whole chain. Safe navigation adds `nil`.
    pub fn infer(&self, chain: &Chain, name_pin: &PinRef, locals: &[PinRef]) -> ComplexType {
        let pins = self.define(chain, name_pin, locals);
        let ty = self.infer_from_pins(&pins, locals);
        if chain.nullable && ty.is_defined() {
            ty.union(&ComplexType::nil())
        } else {
            ty
        }
    }

    /// Union of what each candidate evaluates to.
    pub fn infer_from_pins(&self, pins: &[PinRef], locals: &[PinRef]) -> ComplexType {
        ComplexType::union_all(
            pins.iter()
                .map(|pin| self.probe(pin, locals))
                .filter(|ty| ty.is_defined()),
        )
    }

    /// The type a pin evaluates to, inferring variables from their
    /// assignment and block parameters from the call receiving the block.
    pub fn probe(&self, pin: &PinRef, locals: &[PinRef]) -> ComplexType {
        let declared = pin.return_type();
        if declared.is_defined() {
            return declared.qualify(self.store, &pin.gates());
        }
        let Some(deeper) = self.deeper() else {
            return ComplexType::undefined();
        };
        if let Some(assignment) = pin.assignment() {
            let closure = pin.closure.clone().unwrap_or_else(Pin::root);
            return deeper.infer(assignment, &closure, locals);
        }
        if let (Some(param), Some(block)) = (pin.as_parameter(), pin.closure.as_ref()) {
            return deeper.block_parameter_type(block, param.index, locals);
        }
        ComplexType::undefined()
    }

    /// A block parameter's type from the block signature of the method the
    /// block is passed to.
    fn block_parameter_type(&self, block: &PinRef, index: usize, locals: &[PinRef]) -> ComplexType {
        let Some(receiver) = block.as_block().and_then(|b| b.receiver.as_ref()) else {
            return ComplexType::undefined();
        };
        let lexical = block.closure.clone().unwrap_or_else(Pin::root);
        let methods = self.define(receiver, &lexical, locals);
        ComplexType::union_all(
            methods
                .iter()
                .filter_map(|method| {
                    let signature = method.signatures().first()?;
                    let ty = signature.block_parameter_type(index);
                    Some(ty.qualify(self.store, &method.gates()))
                })
                .filter(|ty| ty.is_defined()),
        )
    }

    pub(crate) fn resolve_link(&self, link: &Link, cx: &LinkCtx) -> Vec<PinRef> {
        match link {
            Link::Constant(name) => self.resolve_constant_link(name, cx),
            Link::Call(call) => self.resolve_call(call, cx),
            Link::Array(items) => vec![Pin::anonymous(self.infer_array(items, cx)).into_ref()],
            Link::Hash(entries) => vec![Pin::anonymous(self.infer_hash(entries, cx)).into_ref()],
            Link::Literal(ty) => vec![Pin::anonymous(ty.clone()).into_ref()],
            Link::BlockSymbol(_) => vec![Pin::anonymous(ComplexType::root("Proc")).into_ref()],
            Link::SelfRef => vec![Pin::proxy_in(cx.lexical, cx.context.context()).into_ref()],
            Link::Variable { kind, name } => self.resolve_variable(*kind, name, cx),
            Link::Undefined => Vec::new(),
        }
    }

    fn resolve_constant_link(&self, name: &str, cx: &LinkCtx) -> Vec<PinRef> {
        if name.is_empty() {
            let roots = self.store.path_pins("");
            return if roots.is_empty() {
                vec![Pin::root()]
            } else {
                roots
            };
        }
        let gates = if cx.head {
            cx.lexical.gates()
        } else {
            vec![cx.context.context().namespace()]
        };
        match self.store.resolve_constant(name, &gates) {
            Some(path) => self.store.path_pins(&path),
            None => {
                log::debug!("constant `{name}` not found from {gates:?}");
                Vec::new()
            }
        }
    }

    fn resolve_variable(&self, kind: VariableKind, name: &str, cx: &LinkCtx) -> Vec<PinRef> {
        let visible = visible_pins(cx.locals, name, cx.lexical, cx.at);
        if !visible.is_empty() {
            return visible;
        }
        let namespace = cx.lexical.namespace();
        let path = match kind {
            VariableKind::Instance => format_smolstr!("{namespace}#{name}"),
            VariableKind::Class if !namespace.is_empty() => format_smolstr!("{namespace}::{name}"),
            _ => name.into(),
        };
        self.store
            .path_pins(&path)
            .into_iter()
            .filter(|pin| is_variable_of_kind(pin, kind))
            .collect()
    }
}

fn is_variable_of_kind(pin: &Pin, kind: VariableKind) -> bool {
    matches!(
        (kind, &pin.kind),
        (VariableKind::Instance, PinKind::InstanceVariable(_))
            | (VariableKind::Class, PinKind::ClassVariable(_))
            | (VariableKind::Global, PinKind::GlobalVariable(_))
            | (VariableKind::Local, PinKind::LocalVariable(_) | PinKind::Parameter(_))
    )
}
