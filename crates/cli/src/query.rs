// ==============================================================================
// Queries
// ==============================================================================
//
// Each subcommand renders its answer to a string so the output can be
// asserted on directly.

use std::fmt::Write as _;

use lang_check::{check_chain, Resolver};
use lang_pin::{Call, Chain, Link, Pin, PinRef};
use lang_store::Store;
use lang_ty::{ComplexType, Scope};
use smol_str::SmolStr;

fn describe(pin: &PinRef) -> String {
    let mut out = format!("{pin:?}");
    if pin.is_method() {
        let signatures = pin.signatures();
        if signatures.is_empty() {
            let _ = write!(out, " -> {}", pin.return_type());
        }
        for signature in signatures {
            let _ = write!(out, "\n    {signature}");
        }
    } else if pin.return_type().is_defined() {
        let _ = write!(out, ": {}", pin.return_type());
    }
    out
}

fn lines(pins: &[PinRef]) -> String {
    pins.iter().map(describe).collect::<Vec<_>>().join("\n")
}

pub fn pins(store: &Store, path: &str) -> String {
    lines(&store.path_pins(path))
}

pub fn ancestors(store: &Store, namespace: &str, scope: Scope) -> String {
    store
        .ancestors(namespace, scope)
        .iter()
        .map(|frame| {
            let mut line = format!("{} ({})", frame.path, frame.scope);
            for (name, value) in &frame.bindings {
                let _ = write!(line, " {name}={value}");
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn methods(store: &Store, namespace: &str, scope: Scope) -> String {
    lines(&store.methods_visible(namespace, scope))
}

pub fn constants(store: &Store, namespace: &str) -> String {
    lines(&store.collect_constants(namespace))
}

pub fn resolve(store: &Store, name: &str, gates: &[SmolStr]) -> String {
    let gates = if gates.is_empty() {
        vec![SmolStr::default()]
    } else {
        gates.to_vec()
    };
    match store.resolve_constant(name, &gates) {
        Some(path) if path.is_empty() => "(root)".to_string(),
        Some(path) => path.to_string(),
        None => "(unresolved)".to_string(),
    }
}

/// `receiver.method(args...)` where every operand is given by its type.
pub fn call(
    resolver: &Resolver,
    receiver: ComplexType,
    method: &str,
    arguments: Vec<ComplexType>,
    block_symbol: Option<&str>,
) -> String {
    let mut arguments: Vec<Chain> = arguments.into_iter().map(Chain::literal).collect();
    if let Some(symbol) = block_symbol {
        arguments.push(Chain::new(vec![Link::BlockSymbol(symbol.into())]));
    }
    let chain = Chain::literal(receiver).then(Link::Call(Call::new(method, None, arguments, None)));
    let name_pin = Pin::root();

    let mut out = format!("type: {}", resolver.infer(&chain, &name_pin, &[]));
    for pin in resolver.define(&chain, &name_pin, &[]) {
        for signature in pin.signatures() {
            let _ = write!(out, "\n{}: {signature}", pin.path());
        }
    }
    for problem in check_chain(resolver, &chain, &name_pin, &[]) {
        let _ = write!(out, "\nproblem: {problem}");
    }
    out
}
