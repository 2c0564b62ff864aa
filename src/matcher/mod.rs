//! Matchers and the state they run against.
//!
//! Compiled selectors are trees of closures. Each closure is one of two kinds:
//! - [`ElementFn`]: tests a single element (tags, ids, attributes, combinator walks)
//! - [`SetFn`]: narrows a whole candidate set (positional pseudo-classes like `:first`)
//!
//! ## Components
//!
//! - [`filters`] - factories for the simple selector kinds
//! - [`combinator`] - walkers that relate an element to its ancestors or siblings
//! - [`PseudoRegistry`] - pseudo-class handlers by name, with the [`defaults`] preloaded
//! - [`MatchScope`] / [`ExecState`] - what a matcher sees while it runs, and the
//!   generation-keyed memo tables behind it
//! - [`BoundedCache`] - FIFO caches for tokens, compiled selectors and class patterns
//!
//! ## Example
//!
//! ```rust
//! use selector_engine::dom::Document;
//! use selector_engine::{SelectorEngine, Tree};
//!
//! let mut doc = Document::new();
//! let root = doc.root();
//! let link = doc.append_element(root, "a", &[("href", "https://example.com")]);
//! doc.append_element(root, "a", &[("href", "/local")]);
//!
//! let mut engine = SelectorEngine::<Document>::new()?;
//! engine.register_pseudo("external", |scope, node| {
//!     scope
//!         .tree
//!         .attribute(node, "href")
//!         .is_some_and(|href| href.starts_with("http"))
//! });
//! assert_eq!(engine.select(&doc, "a:external", root)?, vec![link]);
//! # Ok::<(), selector_engine::SelectorError>(())
//! ```

pub mod builder;
pub mod cache;
pub mod combinator;
pub mod context;
pub mod defaults;
pub mod filters;
pub mod types;

pub use builder::{PseudoFactory, PseudoHandler, PseudoRegistry};
pub use cache::{BoundedCache, CacheConfig, CacheStats, EngineCacheStats};
pub use combinator::{Combinator, Direction};
pub use context::{DocumentAdapter, ExecState, MatchScope, SiblingRank};
pub use types::{element_fn, set_fn, ElementFn, Matcher, SetFn};
