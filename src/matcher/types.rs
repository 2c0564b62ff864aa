//! Matcher function types.

use super::context::MatchScope;
use crate::tree::Tree;
use std::fmt;
use std::sync::Arc;

/// Element predicate: does this one element satisfy the compiled selector piece?
pub type ElementFn<T> = Arc<dyn Fn(&MatchScope<'_, T>, <T as Tree>::Node) -> bool + Send + Sync>;

/// Set matcher: narrows `seed` (in order) into `results`.
pub type SetFn<T> = Arc<
    dyn Fn(&MatchScope<'_, T>, &[<T as Tree>::Node], &mut Vec<<T as Tree>::Node>) + Send + Sync,
>;

/// A compiled selector piece.
///
/// Most pieces test one element at a time. Positional pieces (`:first`, `:eq(2)`, ...) only
/// make sense against a whole candidate set and are compiled as `Set`.
pub enum Matcher<T: Tree> {
    Element(ElementFn<T>),
    Set(SetFn<T>),
}

impl<T: Tree> Matcher<T> {
    /// Wrap an element predicate.
    pub fn element<F>(f: F) -> Self
    where
        F: Fn(&MatchScope<'_, T>, T::Node) -> bool + Send + Sync + 'static,
    {
        Matcher::Element(Arc::new(f))
    }

    /// Wrap a set matcher.
    pub fn set<F>(f: F) -> Self
    where
        F: Fn(&MatchScope<'_, T>, &[T::Node], &mut Vec<T::Node>) + Send + Sync + 'static,
    {
        Matcher::Set(Arc::new(f))
    }

    pub fn is_set(&self) -> bool {
        matches!(self, Matcher::Set(_))
    }

    /// Apply the matcher to `seed`, keeping seed order.
    pub fn apply(&self, scope: &MatchScope<'_, T>, seed: &[T::Node]) -> Vec<T::Node> {
        match self {
            Matcher::Element(f) => seed.iter().copied().filter(|&e| f(scope, e)).collect(),
            Matcher::Set(f) => {
                let mut out = Vec::new();
                f(scope, seed, &mut out);
                out
            }
        }
    }
}

impl<T: Tree> Clone for Matcher<T> {
    fn clone(&self) -> Self {
        match self {
            Matcher::Element(f) => Matcher::Element(Arc::clone(f)),
            Matcher::Set(f) => Matcher::Set(Arc::clone(f)),
        }
    }
}

impl<T: Tree> fmt::Debug for Matcher<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Matcher::Element(_) => f.write_str("Matcher::Element"),
            Matcher::Set(_) => f.write_str("Matcher::Set"),
        }
    }
}

/// Build an [`ElementFn`] from a closure.
pub fn element_fn<T, F>(f: F) -> ElementFn<T>
where
    T: Tree,
    F: Fn(&MatchScope<'_, T>, T::Node) -> bool + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Build a [`SetFn`] from a closure.
pub fn set_fn<T, F>(f: F) -> SetFn<T>
where
    T: Tree,
    F: Fn(&MatchScope<'_, T>, &[T::Node], &mut Vec<T::Node>) + Send + Sync + 'static,
{
    Arc::new(f)
}

pub(crate) fn always<T: Tree>() -> ElementFn<T> {
    element_fn(|_, _| true)
}

pub(crate) fn never<T: Tree>() -> ElementFn<T> {
    element_fn(|_, _| false)
}

/// Conjunction, evaluated right to left (the most specific test of a compound comes last
/// in source order).
pub(crate) fn all_of<T: Tree>(mut matchers: Vec<ElementFn<T>>) -> ElementFn<T> {
    match matchers.len() {
        0 => always(),
        1 => matchers.remove(0),
        _ => element_fn(move |scope, node| matchers.iter().rev().all(|m| m(scope, node))),
    }
}

/// Disjunction in source order.
pub(crate) fn any_of<T: Tree>(mut matchers: Vec<ElementFn<T>>) -> ElementFn<T> {
    match matchers.len() {
        0 => never(),
        1 => matchers.remove(0),
        _ => element_fn(move |scope, node| matchers.iter().any(|m| m(scope, node))),
    }
}
