//! Primary selector engine interface.
//!
//! [`SelectorEngine`] owns everything a query needs besides the host tree: the grammar
//! tables, the pseudo-class registry, the bounded string caches, and the execution memo
//! tables. One engine serves one thread; every query method takes `&mut self`.
//!
//! # Examples
//!
//! ```rust
//! use selector_engine::dom::Document;
//! use selector_engine::SelectorEngine;
//!
//! let mut doc = Document::new();
//! let root = doc.root();
//! let list = doc.append_element(root, "ul", &[]);
//! let items: Vec<_> = (0..5).map(|_| doc.append_element(list, "li", &[])).collect();
//!
//! let mut engine = SelectorEngine::new()?;
//! let odd = engine.select(&doc, "li:nth-child(2n+1)", root)?;
//! assert_eq!(odd, vec![items[0], items[2], items[4]]);
//! # Ok::<(), selector_engine::SelectorError>(())
//! ```

use crate::compiler::{CompileCaches, CompiledSelector, Compiler, Grammar, SelectorGroup};
use crate::config::EngineConfig;
use crate::error::Result;
use crate::fast_path;
use crate::matcher::builder::PseudoRegistry;
use crate::matcher::cache::EngineCacheStats;
use crate::matcher::context::{DocumentAdapter, ExecState, MatchScope};
use crate::matcher::types::Matcher;
use crate::sort;
use crate::tree::{self, Tree};
use serde::Serialize;
use std::cell::RefCell;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

/// How queries were answered.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QueryStats {
    /// `select` calls with a usable context
    pub queries: usize,
    /// Answered by a host index for a bare id, tag or class
    pub quick_hits: usize,
    /// Answered by the host's native selection
    pub native_hits: usize,
    /// Native selection attempts the host rejected
    pub native_misses: usize,
    /// Answered by filtering a seed set from a host index
    pub narrowed: usize,
    /// Answered by filtering every descendant of the context
    pub full_scans: usize,
}

/// Selector engine over a host [`Tree`].
pub struct SelectorEngine<T: Tree> {
    config: EngineConfig,
    grammar: Grammar,
    registry: PseudoRegistry<T>,
    caches: CompileCaches<T>,
    state: RefCell<ExecState<T::Node>>,
    adapter: Option<DocumentAdapter<T::Node>>,
    stats: QueryStats,
}

impl<T: Tree> SelectorEngine<T> {
    /// Engine with the default configuration and pseudo-classes.
    pub fn new() -> Result<Self> {
        Self::with_config(EngineConfig::default())
    }

    /// Engine with a custom configuration.
    ///
    /// # Errors
    /// Returns [`SelectorError::Config`](crate::SelectorError::Config) when the configuration
    /// fails validation.
    pub fn with_config(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            grammar: Grammar::new()?,
            registry: PseudoRegistry::with_defaults(),
            caches: CompileCaches::new(&config.cache),
            state: RefCell::new(ExecState::new(&config.execution)),
            adapter: None,
            stats: QueryStats::default(),
            config,
        })
    }

    /// Every element under `context` that `query` selects, in document order.
    ///
    /// `context` is an element or a document node; any other node yields no results.
    ///
    /// # Errors
    /// Grammar errors (`Syntax`, `UnsupportedPseudo`, `NthArgument`, `UnsupportedLang`) for a
    /// malformed query.
    pub fn select(&mut self, tree: &T, query: &str, context: T::Node) -> Result<Vec<T::Node>> {
        if !is_query_root(tree, context) {
            return Ok(Vec::new());
        }
        self.stats.queries += 1;
        let adapter = self.refresh_adapter(tree, tree::root_of(tree, context));
        self.state.get_mut().begin_query();
        trace!(query, "select");

        let execution = &self.config.execution;
        if execution.enable_fast_path {
            if let Some(found) =
                fast_path::quick(tree, &self.grammar, adapter.features, query, context)
            {
                self.stats.quick_hits += 1;
                return Ok(found);
            }
        }
        if execution.enable_native_select && adapter.features.native_select {
            match fast_path::native(tree, query, context) {
                Some(found) => {
                    self.stats.native_hits += 1;
                    return Ok(found);
                }
                None => self.stats.native_misses += 1,
            }
        }

        let compiled = self.compile(query)?;
        self.run(tree, &compiled, context, adapter)
    }

    /// Run a precompiled selector under `context`.
    pub fn select_compiled(
        &mut self,
        tree: &T,
        compiled: &Arc<CompiledSelector<T>>,
        context: T::Node,
    ) -> Result<Vec<T::Node>> {
        if !is_query_root(tree, context) {
            return Ok(Vec::new());
        }
        self.stats.queries += 1;
        let adapter = self.refresh_adapter(tree, tree::root_of(tree, context));
        self.state.get_mut().begin_query();
        self.run(tree, compiled, context, adapter)
    }

    fn run(
        &mut self,
        tree: &T,
        compiled: &Arc<CompiledSelector<T>>,
        context: T::Node,
        adapter: DocumentAdapter<T::Node>,
    ) -> Result<Vec<T::Node>> {
        let execution = &self.config.execution;
        let narrowing = execution.enable_fast_path && execution.enable_seed_narrowing;
        if narrowing && compiled.is_element_only() {
            if let Some(plan) = fast_path::seed_plan(compiled.group(), adapter.features) {
                self.stats.narrowed += 1;
                debug!(query = compiled.text(), source = ?plan.source, "narrowing to seed set");
                let seeds = plan.source.fetch(tree, context);
                if plan.is_trivial() || seeds.is_empty() {
                    return Ok(seeds);
                }
                let reduced = self.compile(&plan.reduced)?;
                return Ok(self.execute(tree, &reduced, Some(context), adapter.xml, &seeds));
            }
        }

        self.stats.full_scans += 1;
        let pool = tree::descendant_elements(tree, compiled.search_root(tree, context));
        Ok(self.execute(tree, compiled, Some(context), adapter.xml, &pool))
    }

    fn execute(
        &self,
        tree: &T,
        compiled: &CompiledSelector<T>,
        context: Option<T::Node>,
        xml: bool,
        pool: &[T::Node],
    ) -> Vec<T::Node> {
        let scope = MatchScope::new(tree, context, xml, &self.state);
        compiled.execute(&scope, pool)
    }

    /// The candidates `query` selects, in candidate order. Non-element candidates are
    /// dropped.
    pub fn matches(
        &mut self,
        tree: &T,
        query: &str,
        candidates: &[T::Node],
    ) -> Result<Vec<T::Node>> {
        let compiled = self.compile(query)?;
        let elements: Vec<T::Node> = candidates
            .iter()
            .copied()
            .filter(|&node| tree.is_element(node))
            .collect();
        let Some(&first) = elements.first() else {
            return Ok(Vec::new());
        };

        let adapter = self.refresh_adapter(tree, tree::root_of(tree, first));
        self.state.get_mut().begin_query();
        Ok(self.execute(tree, &compiled, None, adapter.xml, &elements))
    }

    /// Whether `element` is selected by `query`.
    pub fn matches_element(&mut self, tree: &T, element: T::Node, query: &str) -> Result<bool> {
        let compiled = self.compile(query)?;
        if !tree.is_element(element) {
            return Ok(false);
        }
        let adapter = self.refresh_adapter(tree, tree::root_of(tree, element));
        self.state.get_mut().begin_query();
        let scope = MatchScope::new(tree, None, adapter.xml, &self.state);
        Ok(compiled.matches_one(&scope, element))
    }

    /// Compile `query` without running it. Identical text returns the identical selector.
    pub fn compile(&mut self, query: &str) -> Result<Arc<CompiledSelector<T>>> {
        Compiler::new(&self.grammar, &self.registry, &mut self.caches).compile(query)
    }

    /// Compile `query` into a single [`Matcher`].
    pub fn compile_matcher(&mut self, query: &str) -> Result<Matcher<T>> {
        Ok(self.compile(query)?.to_matcher())
    }

    /// Tokenize `query`. Identical text returns the identical group.
    pub fn tokenize(&mut self, query: &str) -> Result<Arc<SelectorGroup>> {
        Compiler::new(&self.grammar, &self.registry, &mut self.caches).tokenize(query)
    }

    /// Length of the trailing text of `query` the tokenizer cannot consume. Never fails.
    pub fn probe(&mut self, query: &str) -> usize {
        Compiler::new(&self.grammar, &self.registry, &mut self.caches).probe(query)
    }

    /// Sort into document order and drop duplicates.
    pub fn unique_sort(&self, tree: &T, elements: Vec<T::Node>) -> Vec<T::Node> {
        sort::unique_sort(tree, elements)
    }

    /// Register a simple pseudo-class. Previously compiled selectors are dropped.
    pub fn register_pseudo<F>(&mut self, name: &str, predicate: F) -> &mut Self
    where
        F: Fn(&MatchScope<'_, T>, T::Node) -> bool + Send + Sync + 'static,
    {
        self.registry.register_predicate(name, predicate);
        self.caches.clear_compiled();
        self
    }

    /// Register a pseudo-class that takes an argument. Previously compiled selectors are
    /// dropped.
    pub fn register_pseudo_factory<F>(&mut self, name: &str, factory: F) -> &mut Self
    where
        F: Fn(&mut Compiler<'_, T>, Option<&str>) -> Result<Matcher<T>> + Send + Sync + 'static,
    {
        self.registry.register_factory(name, factory);
        self.caches.clear_compiled();
        self
    }

    pub fn registry(&self) -> &PseudoRegistry<T> {
        &self.registry
    }

    pub fn cache_stats(&self) -> EngineCacheStats {
        self.caches.stats()
    }

    pub fn query_stats(&self) -> QueryStats {
        self.stats
    }

    /// Empty the string caches and forget the current document.
    pub fn clear_caches(&mut self) {
        self.caches.clear();
        self.adapter = None;
        self.state.get_mut().reset_document();
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Current execution generation.
    pub fn generation(&self) -> u32 {
        self.state.borrow().generation()
    }

    /// Adapter resolved for the most recent document.
    pub fn adapter(&self) -> Option<&DocumentAdapter<T::Node>> {
        self.adapter.as_ref()
    }

    fn refresh_adapter(&mut self, tree: &T, root: T::Node) -> DocumentAdapter<T::Node> {
        if let Some(adapter) = self.adapter {
            if adapter.serves(tree, root) {
                return adapter;
            }
        }
        let adapter = DocumentAdapter::resolve(tree, root);
        debug!(
            document = adapter.document_id,
            features = ?adapter.features,
            xml = adapter.xml,
            "resolved document adapter"
        );
        self.state.get_mut().reset_document();
        self.adapter = Some(adapter);
        adapter
    }
}

impl<T: Tree> fmt::Debug for SelectorEngine<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectorEngine")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("stats", &self.stats)
            .finish()
    }
}

/// Elements and parentless non-text nodes (documents, fragments) can anchor a query.
fn is_query_root<T: Tree>(tree: &T, node: T::Node) -> bool {
    tree.is_element(node) || (tree.parent(node).is_none() && !tree.is_text(node))
}

/// Some sequence starts with `+` or `~`, so matches may sit beside the context.
#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::dom::{Document, NodeId};
    use crate::error::SelectorError;
    use crate::tree::HostFeatures;

    fn page() -> (Document, NodeId, NodeId, NodeId) {
        let mut doc = Document::new();
        let root = doc.root();
        let main = doc.append_element(root, "div", &[("id", "main")]);
        let note = doc.append_element(main, "p", &[("class", "note")]);
        let aside = doc.append_element(root, "aside", &[]);
        (doc, main, note, aside)
    }

    #[test]
    fn test_invalid_context_yields_nothing() {
        let (mut doc, main, _, _) = page();
        let text = doc.append_text(main, "hello");
        let mut engine = SelectorEngine::new().unwrap();
        assert!(engine.select(&doc, "p", text).unwrap().is_empty());
        assert_eq!(engine.query_stats().queries, 0);
    }

    #[test]
    fn test_malformed_query_errors() {
        let (doc, _, _, _) = page();
        let mut engine = SelectorEngine::new().unwrap();
        let err = engine.select(&doc, "div >", doc.root()).unwrap_err();
        assert!(err.is_grammar_error());
        assert!(matches!(
            engine.select(&doc, "p:nth-child", doc.root()),
            Err(SelectorError::NthArgument(_))
        ));
    }

    #[test]
    fn test_fast_path_kinds_are_counted() {
        let (doc, main, note, _) = page();
        let mut engine = SelectorEngine::new().unwrap();

        assert_eq!(engine.select(&doc, "#main", doc.root()).unwrap(), vec![main]);
        assert_eq!(engine.select(&doc, "div .note", doc.root()).unwrap(), vec![note]);
        assert_eq!(engine.select(&doc, "p:first", doc.root()).unwrap(), vec![note]);

        let stats = engine.query_stats();
        assert_eq!(stats.quick_hits, 1);
        assert_eq!(stats.narrowed, 1);
        assert_eq!(stats.full_scans, 1);
    }

    #[test]
    fn test_adapter_follows_document_identity() {
        let (doc, _, _, _) = page();
        let other = Document::new().with_features(HostFeatures::none());
        let mut engine = SelectorEngine::new().unwrap();

        engine.select(&doc, "p", doc.root()).unwrap();
        let first = *engine.adapter().unwrap();
        assert!(first.features.id_index);

        engine.select(&other, "p", other.root()).unwrap();
        let second = *engine.adapter().unwrap();
        assert_ne!(first.document_id, second.document_id);
        assert!(!second.features.id_index);
    }

    #[test]
    fn test_sibling_leading_combinator_searches_beside_context() {
        let (doc, main, _, aside) = page();
        let mut engine = SelectorEngine::new().unwrap();
        assert_eq!(engine.select(&doc, "+ aside", main).unwrap(), vec![aside]);
        assert_eq!(engine.select(&doc, "~ *", main).unwrap(), vec![aside]);
    }

    #[test]
    fn test_register_pseudo_drops_compiled_selectors() {
        let (doc, main, note, _) = page();
        let mut engine = SelectorEngine::<Document>::new().unwrap();
        assert!(engine.compile("p:noted").is_err());

        engine.compile("p").unwrap();
        engine.register_pseudo("noted", |scope, node| {
            scope.tree.attribute(node, "class") == Some("note")
        });
        assert!(engine.cache_stats().compiled.insertions >= 1);
        assert_eq!(engine.select(&doc, "p:noted", main).unwrap(), vec![note]);
        assert!(engine.matches_element(&doc, note, "div > :noted").unwrap());
    }

    #[test]
    fn test_matches_keeps_candidate_order() {
        let (doc, main, note, aside) = page();
        let mut engine = SelectorEngine::with_config(EngineConfig::development()).unwrap();
        let found = engine.matches(&doc, "aside, #main, p", &[aside, note, main]).unwrap();
        assert_eq!(found, vec![aside, note, main]);
        assert_eq!(engine.matches(&doc, "p:first", &[aside, note]).unwrap(), vec![note]);
    }
}
