//! Pseudo-class registry.

use super::context::MatchScope;
use super::types::{ElementFn, Matcher};
use crate::compiler::Compiler;
use crate::error::Result;
use crate::tree::Tree;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Builds a matcher from a pseudo-class argument at compile time.
///
/// Factories receive the compiler so they can compile nested selectors (`:not(p.a)`),
/// unescape arguments, or reject them with a grammar error.
pub type PseudoFactory<T> =
    Arc<dyn Fn(&mut Compiler<'_, T>, Option<&str>) -> Result<Matcher<T>> + Send + Sync>;

/// How a registered pseudo-class is turned into a matcher.
pub enum PseudoHandler<T: Tree> {
    /// Argument-free element test (`:checked`, `:empty`).
    Predicate(ElementFn<T>),
    /// Higher-order handler that sees the argument (`:not(...)`, `:eq(2)`).
    Factory(PseudoFactory<T>),
}

impl<T: Tree> Clone for PseudoHandler<T> {
    fn clone(&self) -> Self {
        match self {
            PseudoHandler::Predicate(f) => PseudoHandler::Predicate(Arc::clone(f)),
            PseudoHandler::Factory(f) => PseudoHandler::Factory(Arc::clone(f)),
        }
    }
}

impl<T: Tree> fmt::Debug for PseudoHandler<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PseudoHandler::Predicate(_) => f.write_str("PseudoHandler::Predicate"),
            PseudoHandler::Factory(_) => f.write_str("PseudoHandler::Factory"),
        }
    }
}

/// Registry of pseudo-class handlers keyed by lowercase name.
///
/// The engine builds one at construction with the default handlers; hosts add their own
/// through [`SelectorEngine::register_pseudo`](crate::SelectorEngine::register_pseudo).
///
/// # Example
/// ```rust,ignore
/// let mut registry = PseudoRegistry::<Document>::with_defaults();
/// registry.register_predicate("external", |scope, node| {
///     scope
///         .tree
///         .attribute(node, "href")
///         .is_some_and(|href| href.starts_with("http"))
/// });
/// ```
pub struct PseudoRegistry<T: Tree> {
    handlers: HashMap<String, PseudoHandler<T>>,
}

impl<T: Tree> PseudoRegistry<T> {
    /// Empty registry.
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Registry preloaded with the default pseudo-classes.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register_defaults();
        registry
    }

    /// Register an element predicate. Replaces any handler of the same name.
    pub fn register_predicate<F>(&mut self, name: &str, predicate: F) -> &mut Self
    where
        F: Fn(&MatchScope<'_, T>, T::Node) -> bool + Send + Sync + 'static,
    {
        self.handlers.insert(
            name.to_ascii_lowercase(),
            PseudoHandler::Predicate(Arc::new(predicate)),
        );
        self
    }

    /// Register a higher-order handler. Replaces any handler of the same name.
    pub fn register_factory<F>(&mut self, name: &str, factory: F) -> &mut Self
    where
        F: Fn(&mut Compiler<'_, T>, Option<&str>) -> Result<Matcher<T>> + Send + Sync + 'static,
    {
        self.handlers.insert(
            name.to_ascii_lowercase(),
            PseudoHandler::Factory(Arc::new(factory)),
        );
        self
    }

    fn register_defaults(&mut self) {
        super::defaults::register_defaults(self);
    }

    pub fn get(&self, name: &str) -> Option<&PseudoHandler<T>> {
        self.handlers.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl<T: Tree> Default for PseudoRegistry<T> {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl<T: Tree> fmt::Debug for PseudoRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PseudoRegistry")
            .field("names", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;

    #[test]
    fn test_defaults_registered() {
        let registry = PseudoRegistry::<Document>::with_defaults();
        for name in ["not", "has", "contains", "lang", "first", "eq", "checked", "root"] {
            assert!(registry.contains(name), "{name}");
        }
        assert!(matches!(registry.get("not"), Some(PseudoHandler::Factory(_))));
        assert!(matches!(registry.get("empty"), Some(PseudoHandler::Predicate(_))));
        assert!(registry.get("hover").is_none());
    }

    #[test]
    fn test_registration_lowercases_and_replaces() {
        let mut registry = PseudoRegistry::<Document>::new();
        assert!(registry.is_empty());

        registry
            .register_predicate("Tagged", |scope, node| {
                scope.tree.attribute(node, "data-tag").is_some()
            })
            .register_factory("never", |_, _| Ok(Matcher::element(|_, _| false)));
        assert_eq!(registry.names(), vec!["never", "tagged"]);

        registry.register_factory("tagged", |_, _| Ok(Matcher::element(|_, _| true)));
        assert_eq!(registry.len(), 2);
        assert!(matches!(registry.get("tagged"), Some(PseudoHandler::Factory(_))));
    }
}
