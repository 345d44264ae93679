//! Path evaluation over any [`QueryCursor`].
//!
//! The evaluator only ever calls cursor methods, so it works unchanged
//! over a live document, and would work over any other tree that grows
//! a cursor implementation. Descendant axes walk with an explicit stack
//! of cloned cursors rather than recursion, so pathological nesting
//! depth cannot overflow the call stack.

use crate::ast::{Axis, ComparisonOp, LocationPath, NodeTest, Predicate, Step};
use crate::cursor::{CursorKind, QueryCursor};

/// Evaluate a compiled path from a starting cursor.
///
/// Results come back in traversal order. A node reachable through more
/// than one context (common with the parent axis, or overlapping
/// descendant sets) appears once, at its first occurrence.
pub fn evaluate<C: QueryCursor>(path: &LocationPath, start: &C) -> Vec<C> {
    let mut context = Vec::with_capacity(1);
    let mut first = start.clone();
    if path.absolute {
        first.move_to_root();
    }
    context.push(first);
    for step in &path.steps {
        let mut next: Vec<C> = Vec::new();
        for cursor in &context {
            let mut local = apply_axis(step, cursor);
            apply_predicates(&step.predicates, &mut local);
            for candidate in local {
                if !next.iter().any(|seen| seen.is_same_position(&candidate)) {
                    next.push(candidate);
                }
            }
        }
        context = next;
        if context.is_empty() {
            break;
        }
    }
    context
}

/// Produce the step's candidate nodes for one context node, node test
/// already applied, predicates not yet.
fn apply_axis<C: QueryCursor>(step: &Step, cursor: &C) -> Vec<C> {
    let mut out = Vec::new();
    match step.axis {
        Axis::SelfAxis => {
            if test_matches(&step.test, cursor) {
                out.push(cursor.clone());
            }
        }
        Axis::Parent => {
            let mut parent = cursor.clone();
            if parent.move_to_parent() && test_matches(&step.test, &parent) {
                out.push(parent);
            }
        }
        Axis::Child => {
            let mut child = cursor.clone();
            if child.move_to_first_child() {
                loop {
                    if test_matches(&step.test, &child) {
                        out.push(child.clone());
                    }
                    if !child.move_to_next() {
                        break;
                    }
                }
            }
        }
        Axis::Descendant => collect_descendants(cursor, false, &step.test, &mut out),
        Axis::DescendantOrSelf => collect_descendants(cursor, true, &step.test, &mut out),
        Axis::Attribute => {
            let mut attribute = cursor.clone();
            if attribute.move_to_first_attribute() {
                loop {
                    if test_matches(&step.test, &attribute) {
                        out.push(attribute.clone());
                    }
                    if !attribute.move_to_next_attribute() {
                        break;
                    }
                }
            }
        }
    }
    out
}

/// Preorder descendant walk with an explicit cursor stack.
fn collect_descendants<C: QueryCursor>(
    cursor: &C,
    include_self: bool,
    test: &NodeTest,
    out: &mut Vec<C>,
) {
    if include_self && test_matches(test, cursor) {
        out.push(cursor.clone());
    }
    let mut stack = Vec::new();
    push_children(cursor, &mut stack);
    while let Some(node) = stack.pop() {
        if test_matches(test, &node) {
            out.push(node.clone());
        }
        push_children(&node, &mut stack);
    }
}

/// Push a node's children in reverse, so popping yields document order.
fn push_children<C: QueryCursor>(cursor: &C, stack: &mut Vec<C>) {
    let mut child = cursor.clone();
    if !child.move_to_first_child() {
        return;
    }
    let base = stack.len();
    loop {
        stack.push(child.clone());
        if !child.move_to_next() {
            break;
        }
    }
    stack[base..].reverse();
}

fn test_matches<C: QueryCursor>(test: &NodeTest, cursor: &C) -> bool {
    let kind = cursor.node_kind();
    match test {
        NodeTest::AnyNode => true,
        NodeTest::Any => matches!(kind, CursorKind::Element | CursorKind::Attribute),
        NodeTest::Name(name) => {
            matches!(kind, CursorKind::Element | CursorKind::Attribute)
                && cursor.name().eq_ignore_ascii_case(name)
        }
        NodeTest::Text => kind == CursorKind::Text,
        NodeTest::Comment => kind == CursorKind::Comment,
    }
}

/// Filter one context node's step results through the predicates in
/// order. Position and size are recomputed after each predicate, so
/// `a[@x][2]` means the second `a` that has the attribute.
fn apply_predicates<C: QueryCursor>(predicates: &[Predicate], nodes: &mut Vec<C>) {
    for predicate in predicates {
        let size = nodes.len();
        let mut position = 0;
        nodes.retain(|node| {
            position += 1;
            predicate_holds(predicate, node, position, size)
        });
    }
}

fn predicate_holds<C: QueryCursor>(
    predicate: &Predicate,
    node: &C,
    position: usize,
    size: usize,
) -> bool {
    match predicate {
        Predicate::Index(wanted) => position == *wanted,
        Predicate::Last { offset } => position + offset == size,
        Predicate::Position { op, value } => op.holds(position, *value),
        Predicate::Exists(path) => !evaluate(path, node).is_empty(),
        Predicate::Compare { path, op, literal } => {
            let results = evaluate(path, node);
            match op {
                ComparisonOp::Eq => results.iter().any(|c| c.value() == *literal),
                // Any selected node whose value differs satisfies '!='.
                ComparisonOp::Ne => results.iter().any(|c| c.value() != *literal),
                _ => false,
            }
        }
    }
}
