//! Selector compiler.
//!
//! Compilation runs in two cached steps:
//! - [`parser`] turns selector text into a [`SelectorGroup`] of token sequences
//! - [`codegen`] turns the group into a [`CompiledSelector`]: an element chain for the
//!   sequences that can be tested one element at a time, and staged plans for the sequences
//!   that contain positional pseudo-classes
//!
//! The [`Compiler`] borrows the grammar tables, the pseudo registry and the engine caches for
//! the duration of one compile. Pseudo factories receive it so nested selectors
//! (`:not(.a)`, `:has(> p)`) go through the same caches.
//!
//! # Examples
//!
//! ```rust
//! use selector_engine::dom::Document;
//! use selector_engine::SelectorEngine;
//!
//! let mut engine = SelectorEngine::<Document>::new()?;
//! let compiled = engine.compile("ul > li:nth-child(odd), p.note")?;
//! assert_eq!(compiled.group().len(), 2);
//! # Ok::<(), selector_engine::SelectorError>(())
//! ```

pub mod codegen;
pub mod grammar;
pub mod parser;
pub mod preprocess;

pub use codegen::CompiledSelector;
pub use grammar::Grammar;
pub use parser::{SelectorGroup, Token, TokenKind, TokenSequence, TokenValue};

use crate::error::Result;
use crate::matcher::builder::PseudoRegistry;
use crate::matcher::cache::{BoundedCache, CacheConfig, EngineCacheStats};
use crate::matcher::filters;
use crate::tree::Tree;
use regex::Regex;
use std::sync::Arc;
use tracing::trace;

/// String-keyed caches owned by one engine.
pub struct CompileCaches<T: Tree> {
    tokens: BoundedCache<String, Arc<SelectorGroup>>,
    compiled: BoundedCache<String, Arc<CompiledSelector<T>>>,
    classes: BoundedCache<String, Arc<Regex>>,
    next_id: u32,
}

impl<T: Tree> CompileCaches<T> {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            tokens: BoundedCache::new("tokens", config.token_capacity),
            compiled: BoundedCache::new("compiled", config.compiled_capacity),
            classes: BoundedCache::new("classes", config.class_capacity),
            next_id: 0,
        }
    }

    pub fn stats(&self) -> EngineCacheStats {
        EngineCacheStats {
            tokens: self.tokens.stats(),
            compiled: self.compiled.stats(),
            classes: self.classes.stats(),
        }
    }

    /// Drop every cached entry.
    pub fn clear(&mut self) {
        self.tokens.clear();
        self.compiled.clear();
        self.classes.clear();
    }

    /// Drop compiled selectors only; they hold pseudo handlers resolved at compile time.
    pub fn clear_compiled(&mut self) {
        self.compiled.clear();
    }

    pub fn tokens(&self) -> &BoundedCache<String, Arc<SelectorGroup>> {
        &self.tokens
    }

    pub fn compiled(&self) -> &BoundedCache<String, Arc<CompiledSelector<T>>> {
        &self.compiled
    }

    pub fn classes(&self) -> &BoundedCache<String, Arc<Regex>> {
        &self.classes
    }
}

/// One compile session over the engine's grammar, registry and caches.
pub struct Compiler<'a, T: Tree> {
    grammar: &'a Grammar,
    registry: &'a PseudoRegistry<T>,
    caches: &'a mut CompileCaches<T>,
}

impl<'a, T: Tree> Compiler<'a, T> {
    pub fn new(
        grammar: &'a Grammar,
        registry: &'a PseudoRegistry<T>,
        caches: &'a mut CompileCaches<T>,
    ) -> Self {
        Self {
            grammar,
            registry,
            caches,
        }
    }

    pub fn grammar(&self) -> &'a Grammar {
        self.grammar
    }

    pub fn registry(&self) -> &'a PseudoRegistry<T> {
        self.registry
    }

    /// Resolve CSS escapes in `text`.
    pub fn unescape(&self, text: &str) -> String {
        preprocess::unescape(self.grammar, text).into_owned()
    }

    /// Tokenize `text`; identical text returns the identical cached group.
    pub fn tokenize(&mut self, text: &str) -> Result<Arc<SelectorGroup>> {
        if let Some(group) = self.caches.tokens.get(text) {
            return Ok(group);
        }
        let group = Arc::new(parser::tokenize(self.grammar, text)?);
        trace!(selector = text, sequences = group.len(), "tokenized selector");
        Ok(self.caches.tokens.insert(text.to_string(), group))
    }

    /// Unconsumed length of `text`; 0 for text already in the token cache.
    pub fn probe(&self, text: &str) -> usize {
        if self.caches.tokens.contains(text) {
            return 0;
        }
        parser::probe(self.grammar, text)
    }

    /// Compile `text`; identical text returns the identical cached selector.
    pub fn compile(&mut self, text: &str) -> Result<Arc<CompiledSelector<T>>> {
        if let Some(compiled) = self.caches.compiled.get(text) {
            return Ok(compiled);
        }
        let group = self.tokenize(text)?;
        let compiled = Arc::new(codegen::compile_group(self, group)?);
        trace!(
            selector = text,
            element_only = compiled.is_element_only(),
            "compiled selector"
        );
        Ok(self.caches.compiled.insert(text.to_string(), compiled))
    }

    /// Class membership pattern for an unescaped class name.
    pub fn class_pattern(&mut self, class: &str) -> Result<Arc<Regex>> {
        if let Some(pattern) = self.caches.classes.get(class) {
            return Ok(pattern);
        }
        let pattern = Arc::new(Regex::new(&filters::class_pattern_source(class))?);
        Ok(self.caches.classes.insert(class.to_string(), pattern))
    }

    /// Fresh id for a walker or staged plan.
    pub fn next_matcher_id(&mut self) -> u32 {
        self.caches.next_id = self.caches.next_id.wrapping_add(1);
        self.caches.next_id
    }
}
