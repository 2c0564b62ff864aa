//! Combinator walkers.
//!
//! A combinator turns the matcher for everything to its left into a matcher for the element
//! on its right. Direct combinators (`>` and `+`) step once. Indirect combinators
//! (descendant and `~`) keep stepping until the inner matcher accepts or the walk runs out.
//!
//! Indirect walks over the same ancestors repeat a lot: every `p` under one `div` asks the
//! same question of the same ancestor chain. Each walk therefore opens an outcome cell and
//! stamps every element it visits with `(generation, matcher id, cell)`. A later walk that
//! reaches a stamped element with a closed cell takes the recorded outcome instead of
//! walking on.

use super::context::MatchScope;
use super::types::{element_fn, ElementFn};
use crate::tree::{self, Tree};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Combinator {
    /// whitespace
    Descendant,
    /// `>`
    Child,
    /// `+`
    Adjacent,
    /// `~`
    Sibling,
}

/// Which way a combinator walks from the right-hand element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Parent,
    PreviousSibling,
}

impl Combinator {
    pub fn from_symbol(symbol: &str) -> Self {
        match symbol {
            ">" => Combinator::Child,
            "+" => Combinator::Adjacent,
            "~" => Combinator::Sibling,
            _ => Combinator::Descendant,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Combinator::Descendant => " ",
            Combinator::Child => ">",
            Combinator::Adjacent => "+",
            Combinator::Sibling => "~",
        }
    }

    pub fn direction(self) -> Direction {
        match self {
            Combinator::Descendant | Combinator::Child => Direction::Parent,
            Combinator::Adjacent | Combinator::Sibling => Direction::PreviousSibling,
        }
    }

    /// Steps exactly once.
    pub fn is_direct(self) -> bool {
        matches!(self, Combinator::Child | Combinator::Adjacent)
    }

    /// Relates siblings rather than ancestors.
    pub fn is_sibling(self) -> bool {
        self.direction() == Direction::PreviousSibling
    }
}

impl fmt::Display for Combinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

fn step<T: Tree>(tree: &T, node: T::Node, direction: Direction) -> Option<T::Node> {
    match direction {
        Direction::Parent => tree::parent_element(tree, node),
        Direction::PreviousSibling => tree::previous_element_sibling(tree, node),
    }
}

/// Wrap `inner` so it is tested against the element `combinator` relates to.
///
/// `matcher_id` must be unique per wrapped matcher; it keys the walk stamps.
pub(crate) fn wrap<T: Tree>(
    inner: ElementFn<T>,
    combinator: Combinator,
    matcher_id: u32,
) -> ElementFn<T> {
    let direction = combinator.direction();
    if combinator.is_direct() {
        return element_fn(move |scope: &MatchScope<'_, T>, node| {
            step(scope.tree, node, direction).is_some_and(|next| inner(scope, next))
        });
    }
    element_fn(move |scope: &MatchScope<'_, T>, node| {
        walk(scope, &inner, node, direction, matcher_id)
    })
}

fn walk<T: Tree>(
    scope: &MatchScope<'_, T>,
    inner: &ElementFn<T>,
    node: T::Node,
    direction: Direction,
    matcher_id: u32,
) -> bool {
    let cell = {
        let mut state = scope.state.borrow_mut();
        state.walk_cache_enabled().then(|| state.open_cell())
    };

    let mut outcome = false;
    let mut current = step(scope.tree, node, direction);
    while let Some(candidate) = current {
        if let Some(cell) = cell {
            let mut state = scope.state.borrow_mut();
            if let Some(known) = state.cached_walk(candidate, direction, matcher_id) {
                outcome = known;
                break;
            }
            state.stamp(candidate, direction, matcher_id, cell);
        }
        if inner(scope, candidate) {
            outcome = true;
            break;
        }
        current = step(scope.tree, candidate, direction);
    }

    if let Some(cell) = cell {
        scope.state.borrow_mut().close_cell(cell, outcome);
    }
    outcome
}
