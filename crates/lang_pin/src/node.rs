// ==============================================================================
// Condition Syntax
// ==============================================================================
//
// The slice of the syntax tree flow narrowing looks at: conditionals, boolean
// operators, calls on variables and loop bodies. Everything else is `Other`
// and only contributes its range.

use smol_str::SmolStr;

use crate::{Range, VariableKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// `if`/`unless`/ternary. `unless c` is `If { condition: Not(c) }`.
    If {
        condition: Box<Node>,
        then_branch: Option<Box<Node>>,
        else_branch: Option<Box<Node>>,
        range: Range,
    },
    /// `while`/`until`/`loop`: a construct `break` exits.
    Loop {
        condition: Option<Box<Node>>,
        body: Box<Node>,
        range: Range,
    },
    And {
        lhs: Box<Node>,
        rhs: Box<Node>,
        range: Range,
    },
    Or {
        lhs: Box<Node>,
        rhs: Box<Node>,
        range: Range,
    },
    Not {
        operand: Box<Node>,
        range: Range,
    },
    /// A method call; a bare word is a send with no receiver.
    Send {
        receiver: Option<Box<Node>>,
        method: SmolStr,
        arguments: Vec<Node>,
        range: Range,
    },
    Var {
        kind: VariableKind,
        name: SmolStr,
        range: Range,
    },
    Const {
        scope: Option<Box<Node>>,
        name: SmolStr,
        range: Range,
    },
    Break {
        range: Range,
    },
    /// A statement sequence.
    Begin {
        statements: Vec<Node>,
        range: Range,
    },
    Other {
        range: Range,
    },
}

impl Node {
    pub fn range(&self) -> Range {
        match self {
            Node::If { range, .. }
            | Node::Loop { range, .. }
            | Node::And { range, .. }
            | Node::Or { range, .. }
            | Node::Not { range, .. }
            | Node::Send { range, .. }
            | Node::Var { range, .. }
            | Node::Const { range, .. }
            | Node::Break { range }
            | Node::Begin { range, .. }
            | Node::Other { range } => *range,
        }
    }

    /// Unconditionally leaves the enclosing loop.
    pub fn always_breaks(&self) -> bool {
        match self {
            Node::Break { .. } => true,
            Node::Begin { statements, .. } => statements.last().is_some_and(Node::always_breaks),
            _ => false,
        }
    }

    /// `Foo::Bar` for a constant node.
    pub fn const_path(&self) -> Option<SmolStr> {
        let Node::Const { scope, name, .. } = self else {
            return None;
        };
        match scope {
            None => Some(name.clone()),
            Some(scope) => {
                let outer = scope.const_path()?;
                Some(format!("{outer}::{name}").into())
            }
        }
    }

    /// The variable a condition operand names: a variable node, or a bare
    /// word (`foo` parses as a receiver-less send).
    pub fn variable_name(&self) -> Option<&SmolStr> {
        match self {
            Node::Var { name, .. } => Some(name),
            Node::Send {
                receiver: None,
                method,
                arguments,
                ..
            } if arguments.is_empty() => Some(method),
            _ => None,
        }
    }

    pub fn bare_word(name: &str, range: Range) -> Node {
        Node::Send {
            receiver: None,
            method: name.into(),
            arguments: Vec::new(),
            range,
        }
    }

    pub fn local(name: &str, range: Range) -> Node {
        Node::Var {
            kind: VariableKind::Local,
            name: name.into(),
            range,
        }
    }

    pub fn send(receiver: Node, method: &str, arguments: Vec<Node>, range: Range) -> Node {
        Node::Send {
            receiver: Some(Box::new(receiver)),
            method: method.into(),
            arguments,
            range,
        }
    }

    pub fn constant(name: &str, range: Range) -> Node {
        Node::Const {
            scope: None,
            name: name.into(),
            range,
        }
    }
}
