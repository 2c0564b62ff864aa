//! Filter factories for the simple selector kinds.
//!
//! Every factory takes the canonical token value and returns an [`ElementFn`]. Anything that
//! can be computed once (lowercased tag names, padded check values, class patterns) is
//! computed here rather than per element.

use super::context::MatchScope;
use super::types::{always, element_fn, ElementFn};
use crate::compiler::parser::{AttrOperator, AttrSelector, Position, StructuralPosition};
use crate::tree::{self, Tree};
use regex::Regex;
use std::sync::Arc;

/// Tag filter; `*` matches every element.
pub fn tag<T: Tree>(name: &str) -> ElementFn<T> {
    if name == "*" {
        return always();
    }
    let name = name.to_string();
    element_fn(move |scope: &MatchScope<'_, T>, node| {
        tree::has_tag(scope.tree, node, &name, scope.xml)
    })
}

/// Exact `id` attribute match.
pub fn id<T: Tree>(id: &str) -> ElementFn<T> {
    let id = id.to_string();
    element_fn(move |scope: &MatchScope<'_, T>, node| {
        scope.tree.attribute(node, "id") == Some(id.as_str())
    })
}

/// Whitespace-separated class membership.
pub fn class<T: Tree>(pattern: Arc<Regex>) -> ElementFn<T> {
    element_fn(move |scope: &MatchScope<'_, T>, node| {
        scope
            .tree
            .attribute(node, "class")
            .is_some_and(|value| pattern.is_match(value))
    })
}

/// Regex source for one class name between CSS whitespace or the string edges.
pub(crate) fn class_pattern_source(class: &str) -> String {
    format!(
        r"(^|[\x20\t\r\n\f]){}([\x20\t\r\n\f]|$)",
        regex::escape(class)
    )
}

/// Attribute presence and comparison.
pub fn attribute<T: Tree>(selector: &AttrSelector) -> ElementFn<T> {
    let AttrSelector {
        name,
        operator,
        value: check,
    } = selector.clone();
    let dashed = format!("{check}-");

    element_fn(move |scope: &MatchScope<'_, T>, node| {
        let Some(value) = scope.tree.attribute(node, &name) else {
            return operator == Some(AttrOperator::NotEquals);
        };
        let Some(operator) = operator else {
            return true;
        };
        match operator {
            AttrOperator::Equals => value == check,
            AttrOperator::NotEquals => value != check,
            AttrOperator::Prefix => !check.is_empty() && value.starts_with(&check),
            AttrOperator::Suffix => !check.is_empty() && value.ends_with(&check),
            AttrOperator::Substring => !check.is_empty() && value.contains(&check),
            AttrOperator::Includes => {
                let words: Vec<&str> = value
                    .split(|c: char| matches!(c, ' ' | '\t' | '\r' | '\n' | '\x0C'))
                    .collect();
                format!(" {} ", words.join(" ")).contains(&check)
            }
            AttrOperator::DashMatch => value == check || value.starts_with(&dashed),
        }
    })
}

/// Structural position (`:first-child`, `:nth-last-of-type(2n+1)`, ...).
pub fn structural<T: Tree>(pos: StructuralPosition) -> ElementFn<T> {
    match pos.position {
        Position::First | Position::Last | Position::Only => simple_position(pos),
        // `an+b` with a = 1, b = 0 accepts every element that has a parent.
        Position::Nth | Position::NthLast if pos.a == 1 && pos.b == 0 => {
            element_fn(|scope: &MatchScope<'_, T>, node| scope.tree.parent(node).is_some())
        }
        Position::Nth | Position::NthLast => element_fn(move |scope: &MatchScope<'_, T>, node| {
            let rank = scope
                .state
                .borrow_mut()
                .sibling_rank(scope.tree, node, scope.xml);
            let Some(rank) = rank else {
                return false;
            };
            let value = match (pos.of_type, pos.from_end()) {
                (false, false) => rank.index,
                (false, true) => rank.from_end,
                (true, false) => rank.type_index,
                (true, true) => rank.type_from_end,
            };
            pos.accepts(i64::from(value))
        }),
    }
}

fn simple_position<T: Tree>(pos: StructuralPosition) -> ElementFn<T> {
    let check_before = matches!(pos.position, Position::First | Position::Only);
    let check_after = matches!(pos.position, Position::Last | Position::Only);
    let of_type = pos.of_type;

    element_fn(move |scope: &MatchScope<'_, T>, node| {
        if scope.tree.parent(node).is_none() {
            return false;
        }
        let same_kind = |other: T::Node| {
            if of_type {
                match scope.tree.local_name(node) {
                    Some(name) => tree::has_tag(scope.tree, other, name, scope.xml),
                    None => false,
                }
            } else {
                true
            }
        };

        if check_before {
            let mut sibling = tree::previous_element_sibling(scope.tree, node);
            while let Some(s) = sibling {
                if same_kind(s) {
                    return false;
                }
                sibling = tree::previous_element_sibling(scope.tree, s);
            }
        }
        if check_after {
            let mut sibling = tree::next_element_sibling(scope.tree, node);
            while let Some(s) = sibling {
                if same_kind(s) {
                    return false;
                }
                sibling = tree::next_element_sibling(scope.tree, s);
            }
        }
        true
    })
}
