// ==============================================================================
// Problems
// ==============================================================================
//
// Problem records are what a downstream checker turns into diagnostics: a
// location and a message. They are data, never errors; resolution itself
// does not fail. `check_chain` walks a chain the way `Resolver::define` does
// and reports the first link that could not be resolved.

use itertools::Itertools;
use lang_pin::{Chain, Link, Location, Pin, PinRef};
use lang_ty::ComplexType;
use smol_str::SmolStr;

use crate::call::Overload;
use crate::chain::LinkCtx;
use crate::Resolver;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Problem {
    pub location: Option<Location>,
    pub kind: ProblemKind,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProblemKind {
    #[error("unresolved constant `{name}`{}", did_you_mean(.suggestion))]
    UnresolvedConstant {
        name: SmolStr,
        suggestion: Option<SmolStr>,
    },
    #[error("undefined method `{word}` for `{receiver}`{}", did_you_mean(.suggestion))]
    UnresolvedMethod {
        word: SmolStr,
        receiver: ComplexType,
        suggestion: Option<SmolStr>,
    },
    #[error("wrong number of arguments to `{word}` (given {given}, expected {expected})")]
    ArityMismatch {
        word: SmolStr,
        given: usize,
        expected: String,
    },
    #[error("argument {} to `{word}` expected `{expected}`, got `{actual}`", .index + 1)]
    ArgumentType {
        word: SmolStr,
        index: usize,
        expected: ComplexType,
        actual: ComplexType,
    },
}

fn did_you_mean(suggestion: &Option<SmolStr>) -> String {
    match suggestion {
        Some(name) => format!(", did you mean `{name}`?"),
        None => String::new(),
    }
}

impl std::fmt::Display for Problem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.location {
            Some(location) => write!(f, "{location}: {}", self.kind),
            None => write!(f, "{}", self.kind),
        }
    }
}

/// Problems with `chain` as written inside `name_pin`. At most one is
/// reported: links after an unresolved one have no receiver to check.
pub fn check_chain(resolver: &Resolver, chain: &Chain, name_pin: &PinRef, locals: &[PinRef]) -> Vec<Problem> {
    if chain.is_undefined() {
        return Vec::new();
    }
    let at = chain.location.as_ref().map(|l| l.range.start);
    let mut context = name_pin.clone();

    for (idx, link) in chain.links.iter().enumerate() {
        let cx = LinkCtx {
            context: &context,
            lexical: name_pin,
            locals,
            at,
            head: idx == 0,
        };
        let pins = resolver.resolve_link(link, &cx);
        if let Some(kind) = resolver.link_problem(link, &cx, &pins) {
            let location = match link {
                Link::Call(call) => call.location.clone(),
                _ => None,
            };
            return vec![Problem {
                location: location.or_else(|| chain.location.clone()),
                kind,
            }];
        }

        let mut ty = resolver.infer_from_pins(&pins, locals);
        if chain.nullable {
            ty = ty.without_nil();
        }
        if ty.is_undefined() {
            break;
        }
        context = Pin::proxy_in(name_pin, ty).into_ref();
    }
    Vec::new()
}

impl Resolver<'_> {
    fn link_problem(&self, link: &Link, cx: &LinkCtx, pins: &[PinRef]) -> Option<ProblemKind> {
        match link {
            Link::Constant(name) if !name.is_empty() && pins.is_empty() => {
                let gates = cx.lexical.gates();
                let known: Vec<SmolStr> = gates
                    .iter()
                    .flat_map(|gate| self.store.constants_in(gate))
                    .map(|pin| pin.name.clone())
                    .unique()
                    .collect();
                let last = name.rsplit("::").next().unwrap_or(name.as_str());
                Some(ProblemKind::UnresolvedConstant {
                    name: name.clone(),
                    suggestion: suggest_similar(last, known.iter()),
                })
            }
            Link::Call(call) if call.word == "super" || call.word == "yield" => None,
            Link::Call(call) if pins.is_empty() => {
                let receiver = cx.context.context();
                let member = receiver.first();
                let known: Vec<SmolStr> = self
                    .store
                    .methods_visible(member.namespace(), member.scope())
                    .iter()
                    .map(|pin| pin.name.clone())
                    .collect();
                Some(ProblemKind::UnresolvedMethod {
                    word: call.word.clone(),
                    receiver,
                    suggestion: suggest_similar(&call.word, known.iter()),
                })
            }
            Link::Call(call) => {
                let arg_types: Vec<ComplexType> = call
                    .arguments
                    .iter()
                    .map(|arg| self.infer(arg, cx.lexical, cx.locals).simplify_literals())
                    .collect();
                let outcomes: Vec<Overload> = pins
                    .iter()
                    .filter(|pin| pin.is_method())
                    .filter_map(|pin| self.select_overload(pin, call, &arg_types))
                    .collect();
                if outcomes.is_empty() || outcomes.iter().any(|o| matches!(o, Overload::Matched(_))) {
                    return None;
                }
                let argument = outcomes.iter().find_map(|o| match o {
                    Overload::Argument {
                        index,
                        expected,
                        actual,
                    } => Some(ProblemKind::ArgumentType {
                        word: call.word.clone(),
                        index: *index,
                        expected: expected.clone(),
                        actual: actual.clone(),
                    }),
                    _ => None,
                });
                argument.or_else(|| {
                    Some(ProblemKind::ArityMismatch {
                        word: call.word.clone(),
                        given: arg_types.len(),
                        expected: expected_arity(pins),
                    })
                })
            }
            _ => None,
        }
    }
}

/// `1`, `1..2` or `1+` for each distinct overload shape.
fn expected_arity(pins: &[PinRef]) -> String {
    pins.iter()
        .flat_map(|pin| pin.signatures())
        .map(|sig| {
            let required = sig.required_count();
            let optional = sig.optional_count();
            if sig.has_rest() {
                format!("{required}+")
            } else if optional == 0 {
                required.to_string()
            } else {
                format!("{required}..{}", required + optional)
            }
        })
        .unique()
        .join(" or ")
}

// ==============================================================================
// Suggestions
// ==============================================================================

/// Levenshtein distance over chars.
pub fn edit_distance(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut row: Vec<usize> = (0..=b.len()).collect();
    for (i, ca) in a.chars().enumerate() {
        // row[j] still holds the previous row's value until overwritten
        let mut diagonal = row[0];
        row[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let above = row[j + 1];
            row[j + 1] = if ca == *cb {
                diagonal
            } else {
                1 + diagonal.min(above).min(row[j])
            };
            diagonal = above;
        }
    }
    row[b.len()]
}

fn tolerance(word: &str) -> usize {
    match word.chars().count() {
        0..=2 => 1,
        3 | 4 => 2,
        _ => 3,
    }
}

/// The nearest differing candidate within [`tolerance`] of `word`. Ties keep
/// the earliest candidate.
pub fn suggest_similar<'a>(
    word: &str,
    candidates: impl IntoIterator<Item = &'a SmolStr>,
) -> Option<SmolStr> {
    let limit = tolerance(word);
    candidates
        .into_iter()
        .map(|candidate| (candidate, edit_distance(word, candidate)))
        .filter(|&(_, distance)| (1..=limit).contains(&distance))
        .min_by_key(|&(_, distance)| distance)
        .map(|(candidate, _)| candidate.clone())
}
