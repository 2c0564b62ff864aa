//! # Selector Engine
//!
//! A CSS-style selector engine for arbitrary element trees. Queries are tokenized, compiled
//! into closures once, cached by text, and run against any host that implements [`Tree`].
//!
//! ## Quick Start
//!
//! ```rust
//! use selector_engine::dom::Document;
//! use selector_engine::SelectorEngine;
//!
//! let doc = Document::from_yaml_str(
//!     r#"
//! tag: div
//! id: main
//! children:
//!   - { tag: p, class: intro, text: Hello }
//!   - { tag: p, text: World }
//! "#,
//! )?;
//!
//! let mut engine = SelectorEngine::new()?;
//! let intro = engine.select(&doc, "#main > p.intro", doc.root())?;
//! assert_eq!(intro.len(), 1);
//!
//! let not_intro = engine.select(&doc, "p:not(.intro):contains(World)", doc.root())?;
//! assert_eq!(not_intro.len(), 1);
//! # Ok::<(), selector_engine::SelectorError>(())
//! ```
//!
//! ### Configuration
//!
//! ```rust
//! use selector_engine::{EngineConfig, SelectorEngine};
//! use selector_engine::dom::Document;
//!
//! let config = EngineConfig::from_yaml_str(
//!     r#"
//! cache:
//!   compiled_capacity: 500
//! execution:
//!   enable_native_select: false
//! "#,
//! )?;
//! let engine = SelectorEngine::<Document>::with_config(config)?;
//! assert_eq!(engine.config().cache.compiled_capacity, 500);
//! # Ok::<(), selector_engine::SelectorError>(())
//! ```

pub mod compiler;
pub mod config;
pub mod dom;
pub mod engine;
pub mod error;
pub mod fast_path;
pub mod matcher;
pub mod sort;
pub mod tree;

// Primary engine interface
pub use engine::{QueryStats, SelectorEngine};

// Compiler and configuration
pub use compiler::{CompiledSelector, Compiler, SelectorGroup, Token, TokenKind, TokenValue};
pub use config::{CacheConfig, EngineConfig, ExecutionConfig};

// Core types and errors
pub use error::{Result, SelectorError};
pub use sort::unique_sort;
pub use tree::{HostFeatures, Tree};

// Matcher system
pub use matcher::{
    CacheStats, Combinator, ElementFn, EngineCacheStats, MatchScope, Matcher, PseudoRegistry,
    SetFn,
};
