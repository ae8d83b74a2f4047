// ==============================================================================
// Flow-Sensitive Typing
// ==============================================================================
//
// Turns the facts `lang_pin::narrow` reads off a condition into shadow
// variable pins. A narrowed pin has the same name and closure as the variable
// it refines, a presence range covering only the code the fact holds in, and
// `certain` set. The original pin is never removed; lookups prefer the
// narrowed one where both are visible.
//
// Presence ranges for `if c then A else B end`:
//
//   facts true when c holds   -> A, plus the rest of the enclosing loop if B
//                                always breaks
//   facts true when c fails   -> B, plus the rest of the enclosing loop if A
//                                always breaks
//   facts guarding an operand -> that operand (`a && b` narrows `a` in `b`)

use lang_pin::narrow::{analyze_condition, operand_presence, NarrowBinding, NarrowPredicate};
use lang_pin::{Node, Pin, PinRef, Position, Range};
use lang_ty::ComplexType;

use crate::Resolver;

pub struct FlowSensitiveTyping<'l, 'r> {
    locals: &'l mut Vec<PinRef>,
    /// Range of the nearest loop `break` leaves.
    enclosing_breakable: Option<Range>,
    /// Infers variables that carry no declared type.
    resolver: Option<&'r Resolver<'r>>,
}

impl<'l, 'r> FlowSensitiveTyping<'l, 'r> {
    pub fn new(locals: &'l mut Vec<PinRef>, enclosing_breakable: Option<Range>) -> Self {
        Self {
            locals,
            enclosing_breakable,
            resolver: None,
        }
    }

    pub fn with_resolver(mut self, resolver: &'r Resolver<'r>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Narrow every conditional in `node`, loops included.
    pub fn walk(&mut self, node: &Node) {
        match node {
            Node::If {
                then_branch,
                else_branch,
                ..
            } => {
                self.process_if(node);
                for branch in [then_branch, else_branch].into_iter().flatten() {
                    self.walk(branch);
                }
            }
            Node::Loop {
                condition,
                body,
                range,
            } => {
                let outer = self.enclosing_breakable.replace(*range);
                if let Some(condition) = condition {
                    let info = analyze_condition(condition);
                    self.add_facts(&info.then_branch, &[operand_presence(body)]);
                    self.add_guarded(&info.guarded);
                }
                self.walk(body);
                self.enclosing_breakable = outer;
            }
            Node::And { .. } | Node::Or { .. } => self.process_and(node),
            Node::Not { operand, .. } => self.walk(operand),
            Node::Send {
                receiver,
                arguments,
                ..
            } => {
                if let Some(receiver) = receiver {
                    self.walk(receiver);
                }
                for argument in arguments {
                    self.walk(argument);
                }
            }
            Node::Begin { statements, .. } => {
                for statement in statements {
                    self.walk(statement);
                }
            }
            Node::Var { .. } | Node::Const { .. } | Node::Break { .. } | Node::Other { .. } => {}
        }
    }

    pub fn process_if(&mut self, node: &Node) {
        let Node::If {
            condition,
            then_branch,
            else_branch,
            range,
        } = node
        else {
            return;
        };
        let info = analyze_condition(condition);

        let mut true_ranges = Vec::new();
        let mut false_ranges = Vec::new();
        if let Some(breakable) = self.enclosing_breakable {
            let rest_of_loop = Range::new(range.end, breakable.end);
            if else_branch.as_deref().is_some_and(Node::always_breaks) {
                true_ranges.push(rest_of_loop);
            }
            if then_branch.as_deref().is_some_and(Node::always_breaks) {
                false_ranges.push(rest_of_loop);
            }
        }
        if let Some(then_branch) = then_branch {
            true_ranges.push(operand_presence(then_branch));
        }
        if let Some(else_branch) = else_branch {
            false_ranges.push(operand_presence(else_branch));
        }

        self.add_facts(&info.then_branch, &true_ranges);
        self.add_facts(&info.else_branch, &false_ranges);
        self.add_guarded(&info.guarded);
    }

    /// A standalone `a && b` or `a || b`: only the right operand is
    /// narrowed.
    pub fn process_and(&mut self, node: &Node) {
        let info = analyze_condition(node);
        self.add_guarded(&info.guarded);
    }

    fn add_guarded(&mut self, guarded: &[(NarrowBinding, Range)]) {
        for (binding, presence) in guarded {
            self.add_facts(std::slice::from_ref(binding), &[*presence]);
        }
    }

    fn add_facts(&mut self, bindings: &[NarrowBinding], presences: &[Range]) {
        if presences.is_empty() {
            return;
        }
        for binding in bindings {
            let Some(pin) = self.find_local(&binding.name, binding.at) else {
                continue;
            };
            let Some(ty) = self.narrowed_type(&pin, &binding.predicate) else {
                log::debug!("cannot narrow {} by {:?}: type unknown", pin.path(), binding.predicate);
                continue;
            };
            for presence in presences {
                log::debug!("narrow {} to {ty} over {presence}", pin.path());
                self.locals.push(pin.narrowed(ty.clone(), *presence).into_ref());
            }
        }
    }

    /// The declaration of `name` governing `at`.
    fn find_local(&self, name: &str, at: Position) -> Option<PinRef> {
        self.locals
            .iter()
            .find(|pin| pin.name == name && pin.visible_at(at))
            .cloned()
    }

    fn narrowed_type(&self, pin: &PinRef, predicate: &NarrowPredicate) -> Option<ComplexType> {
        let narrowed = match predicate {
            NarrowPredicate::IsA(class) => ComplexType::parse(class),
            NarrowPredicate::IsNil => ComplexType::nil(),
            NarrowPredicate::NotNil => self.base_type(pin).without_nil(),
            NarrowPredicate::NotA(class) => self.base_type(pin).select(|member| !names_class(member.name(), class)),
        };
        narrowed.is_defined().then_some(narrowed)
    }

    fn base_type(&self, pin: &PinRef) -> ComplexType {
        let declared = pin.return_type();
        if declared.is_defined() {
            return declared.clone();
        }
        match self.resolver {
            Some(resolver) => resolver.probe(pin, self.locals.as_slice()),
            None => ComplexType::undefined(),
        }
    }
}

/// `Foo::Bar` is named by both `Foo::Bar` and `Bar`.
fn names_class(member: &str, class: &str) -> bool {
    member == class
        || member
            .strip_suffix(class)
            .is_some_and(|outer| outer.ends_with("::"))
}

/// Variable pins named `name` that govern a lookup from `closure` at `at`.
///
/// Each step narrows the candidates but never to nothing:
///
///   1. pins whose presence contains `at`
///   2. of those, pins declared directly in `closure`
///   3. of those, pins derived from control flow
pub fn visible_pins(pins: &[PinRef], name: &str, closure: &Pin, at: Option<Position>) -> Vec<PinRef> {
    let with_name: Vec<PinRef> = pins.iter().filter(|p| p.name == name).cloned().collect();
    if with_name.is_empty() {
        return with_name;
    }

    let present: Vec<PinRef> = match at {
        Some(at) => with_name
            .iter()
            .filter(|p| p.presence().is_some_and(|r| r.contains(at)))
            .cloned()
            .collect(),
        None => Vec::new(),
    };
    if present.is_empty() {
        log::debug!("visible_pins({name}) => {with_name:?}: none present at {at:?}");
        return with_name;
    }

    let in_closure: Vec<PinRef> = present
        .iter()
        .filter(|p| {
            p.closure
                .as_deref()
                .is_some_and(|c| c.path() == closure.path() && c.location == closure.location)
        })
        .cloned()
        .collect();
    if in_closure.is_empty() {
        return present;
    }

    let certain: Vec<PinRef> = in_closure.iter().filter(|p| p.is_certain()).cloned().collect();
    if certain.is_empty() {
        return in_closure;
    }
    log::debug!("visible_pins({name}) => {certain:?}");
    certain
}
