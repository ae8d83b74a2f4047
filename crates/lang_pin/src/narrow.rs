// ==============================================================================
// Type Narrowing: condition analysis for flow-sensitive typing
// ==============================================================================
//
// Purely syntactic analysis of conditions: which variable a test names and
// what the test tells us about it in each branch. No types are looked up
// here; lang_check turns these facts into narrowed variable pins.

use smol_str::SmolStr;

use crate::{Node, Position, Range};

/// What a condition tells us about a variable in one branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NarrowPredicate {
    /// `x.is_a?(Foo)` held.
    IsA(SmolStr),
    /// `x.is_a?(Foo)` failed.
    NotA(SmolStr),
    /// `x.nil?` held.
    IsNil,
    /// `x.nil?` failed, or `x` was truthy.
    NotNil,
}

/// A predicate bound to a variable name, with the position of the test so
/// the governing declaration of the variable can be found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NarrowBinding {
    pub name: SmolStr,
    pub at: Position,
    pub predicate: NarrowPredicate,
}

/// The narrowings derived from one condition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NarrowInfo {
    pub then_branch: Vec<NarrowBinding>,
    pub else_branch: Vec<NarrowBinding>,
    /// Facts that hold while evaluating the right operand of `&&`/`||`.
    pub guarded: Vec<(NarrowBinding, Range)>,
}

/// Span of an operand including the column just before it.
pub fn operand_presence(operand: &Node) -> Range {
    let range = operand.range();
    Range::new(range.start.back_one(), range.end)
}

/// Analyze a condition to extract narrowing information.
///
/// Returns an empty `NarrowInfo` for conditions that match no recognized
/// pattern.
pub fn analyze_condition(cond: &Node) -> NarrowInfo {
    match cond {
        // ── x.is_a?(Foo) ─────────────────────────────────────────────
        Node::Send {
            receiver: Some(receiver),
            method,
            arguments,
            range,
        } if method == "is_a?" || method == "kind_of?" || method == "instance_of?" => {
            let [arg] = arguments.as_slice() else {
                return NarrowInfo::default();
            };
            let (Some(name), Some(class)) = (receiver.variable_name(), arg.const_path()) else {
                return NarrowInfo::default();
            };
            both_branches(
                name,
                range.start,
                NarrowPredicate::IsA(class.clone()),
                NarrowPredicate::NotA(class),
            )
        }

        // ── x.nil? ──────────────────────────────────────────────────
        Node::Send {
            receiver: Some(receiver),
            method,
            arguments,
            range,
        } if method == "nil?" => {
            // an argument means this is not the predicate we know
            if !arguments.is_empty() {
                return NarrowInfo::default();
            }
            let Some(name) = receiver.variable_name() else {
                return NarrowInfo::default();
            };
            both_branches(name, range.start, NarrowPredicate::IsNil, NarrowPredicate::NotNil)
        }

        // ── x: truthy means not nil, falsy may still be `false` ─────
        Node::Var { name, range, .. } => NarrowInfo {
            then_branch: vec![NarrowBinding {
                name: name.clone(),
                at: range.start,
                predicate: NarrowPredicate::NotNil,
            }],
            ..NarrowInfo::default()
        },

        // ── !cond: then and else facts swap ─────────────────────────
        Node::Not { operand, .. } => {
            let mut info = analyze_condition(operand);
            std::mem::swap(&mut info.then_branch, &mut info.else_branch);
            info
        }

        // ── a && b: both hold in then-branch, a holds inside b ─────
        Node::And { lhs, rhs, .. } => {
            let a = analyze_condition(lhs);
            let b = analyze_condition(rhs);
            let rhs_presence = operand_presence(rhs);
            let mut guarded = a.guarded;
            guarded.extend(b.guarded);
            guarded.extend(a.then_branch.iter().cloned().map(|n| (n, rhs_presence)));
            NarrowInfo {
                then_branch: [a.then_branch, b.then_branch].concat(),
                else_branch: vec![], // can't determine which guard failed
                guarded,
            }
        }

        // ── a || b: both fail in else-branch, a failed inside b ────
        Node::Or { lhs, rhs, .. } => {
            let a = analyze_condition(lhs);
            let b = analyze_condition(rhs);
            let rhs_presence = operand_presence(rhs);
            let mut guarded = a.guarded;
            guarded.extend(b.guarded);
            guarded.extend(a.else_branch.iter().cloned().map(|n| (n, rhs_presence)));
            NarrowInfo {
                then_branch: vec![], // can't determine which guard held
                else_branch: [a.else_branch, b.else_branch].concat(),
                guarded,
            }
        }

        // ── (cond) ──────────────────────────────────────────────────
        Node::Begin { statements, .. } if statements.len() == 1 => {
            analyze_condition(&statements[0])
        }

        _ => NarrowInfo::default(),
    }
}

fn both_branches(
    name: &SmolStr,
    at: Position,
    then_pred: NarrowPredicate,
    else_pred: NarrowPredicate,
) -> NarrowInfo {
    NarrowInfo {
        then_branch: vec![NarrowBinding {
            name: name.clone(),
            at,
            predicate: then_pred,
        }],
        else_branch: vec![NarrowBinding {
            name: name.clone(),
            at,
            predicate: else_pred,
        }],
        guarded: vec![],
    }
}
