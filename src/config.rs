//! Unified configuration for the selector engine.
//!
//! Configuration is split into cache capacities (see [`CacheConfig`]) and execution switches
//! (see [`ExecutionConfig`]). Both are plain serde structs, so a configuration can be kept in
//! a YAML or JSON file next to the host application and loaded with
//! [`EngineConfig::from_file`].
//!
//! # Examples
//!
//! ```rust
//! use selector_engine::EngineConfig;
//!
//! let config = EngineConfig::high_throughput()
//!     .with_fast_path(true)
//!     .with_compiled_capacity(2000);
//! assert!(config.validate().is_ok());
//! ```

use crate::error::{Result, SelectorError};
pub use crate::matcher::cache::CacheConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Execution switches.
///
/// Turning the fast path off never changes query results; it only forces every query through
/// the full compile-and-match path. Tests rely on that to check equivalence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Answer bare `#id`, `tag` and `.class` queries straight from the host indexes.
    ///
    /// **Default**: true
    pub enable_fast_path: bool,

    /// Hand queries to the host's native bulk selection when the host offers one.
    ///
    /// Host failures are logged and the query falls through to the compiled path.
    ///
    /// **Default**: true
    pub enable_native_select: bool,

    /// Seed single-sequence queries from the host index of their rightmost id, class or tag.
    ///
    /// **Default**: true
    pub enable_seed_narrowing: bool,

    /// Stamp indirect combinator walks so shared ancestors are only tested once per query.
    ///
    /// **Default**: true
    pub enable_walk_cache: bool,

    /// Upper bound on walker stamps and outcome cells kept between queries.
    ///
    /// Tables larger than this are dropped at the start of the next top-level query.
    ///
    /// **Default**: 65536
    pub walk_table_limit: usize,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            enable_fast_path: true,
            enable_native_select: true,
            enable_seed_narrowing: true,
            enable_walk_cache: true,
            walk_table_limit: 65_536,
        }
    }
}

/// Complete engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Cache capacities
    pub cache: CacheConfig,
    /// Execution switches
    pub execution: ExecutionConfig,
}

impl EngineConfig {
    /// Create a new engine configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Large caches for hosts that run many distinct queries against big trees.
    pub fn high_throughput() -> Self {
        Self {
            cache: CacheConfig {
                token_capacity: 500,
                compiled_capacity: 500,
                class_capacity: 500,
            },
            execution: ExecutionConfig {
                walk_table_limit: 1 << 20,
                ..Default::default()
            },
        }
    }

    /// Small caches and tight walker tables.
    pub fn memory_efficient() -> Self {
        Self {
            cache: CacheConfig {
                token_capacity: 10,
                compiled_capacity: 10,
                class_capacity: 10,
            },
            execution: ExecutionConfig {
                walk_table_limit: 4096,
                ..Default::default()
            },
        }
    }

    /// Every query goes through the compiled path; useful when debugging matchers.
    pub fn development() -> Self {
        Self {
            cache: CacheConfig::default(),
            execution: ExecutionConfig {
                enable_fast_path: false,
                enable_native_select: false,
                enable_seed_narrowing: false,
                ..Default::default()
            },
        }
    }

    /// Parse a YAML configuration document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: EngineConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a JSON configuration document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file; `.json` files are read as JSON, anything else as YAML.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        if is_json {
            Self::from_json_str(&content)
        } else {
            Self::from_yaml_str(&content)
        }
    }

    /// Serialize to YAML.
    pub fn to_yaml_string(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Reject configurations the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        let capacities = [
            ("cache.token_capacity", self.cache.token_capacity),
            ("cache.compiled_capacity", self.cache.compiled_capacity),
            ("cache.class_capacity", self.cache.class_capacity),
        ];
        for (name, value) in capacities {
            if value == 0 {
                return Err(SelectorError::Config(format!("{name} must be at least 1")));
            }
        }
        if self.execution.walk_table_limit == 0 {
            return Err(SelectorError::Config(
                "execution.walk_table_limit must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Set all three cache capacities at once.
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache.token_capacity = capacity;
        self.cache.compiled_capacity = capacity;
        self.cache.class_capacity = capacity;
        self
    }

    pub fn with_token_capacity(mut self, capacity: usize) -> Self {
        self.cache.token_capacity = capacity;
        self
    }

    pub fn with_compiled_capacity(mut self, capacity: usize) -> Self {
        self.cache.compiled_capacity = capacity;
        self
    }

    pub fn with_class_capacity(mut self, capacity: usize) -> Self {
        self.cache.class_capacity = capacity;
        self
    }

    /// Enable or disable the whole fast-path dispatcher (index lookups and seed narrowing).
    pub fn with_fast_path(mut self, enable: bool) -> Self {
        self.execution.enable_fast_path = enable;
        self.execution.enable_seed_narrowing = enable;
        self
    }

    pub fn with_native_select(mut self, enable: bool) -> Self {
        self.execution.enable_native_select = enable;
        self
    }

    pub fn with_seed_narrowing(mut self, enable: bool) -> Self {
        self.execution.enable_seed_narrowing = enable;
        self
    }

    pub fn with_walk_cache(mut self, enable: bool) -> Self {
        self.execution.enable_walk_cache = enable;
        self
    }

    pub fn with_walk_table_limit(mut self, limit: usize) -> Self {
        self.execution.walk_table_limit = limit;
        self
    }
}
