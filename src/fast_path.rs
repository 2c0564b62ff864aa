//! Shortcuts taken before the general matcher runs.
//!
//! Each shortcut must give the same answer as compiling the selector and filtering every
//! descendant of the context:
//! - a bare `#id`, `tag` or `.class` goes straight to the host index
//! - hosts with native bulk selection answer the whole query; any host error is a miss
//! - otherwise the rightmost indexable token of the last compound fetches a seed set from the
//!   host index, and the selector minus that token filters the seeds

use crate::compiler::parser::{self, SelectorGroup, TokenKind, TokenValue};
use crate::compiler::Grammar;
use crate::sort;
use crate::tree::{self, HostFeatures, Tree};
use tracing::debug;

/// Which host index a seed set comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedSource {
    Id(String),
    Tag(String),
    Class(String),
}

impl SeedSource {
    fn available(&self, features: HostFeatures) -> bool {
        match self {
            SeedSource::Id(_) => features.id_index,
            SeedSource::Tag(_) => features.tag_index,
            SeedSource::Class(_) => features.class_index,
        }
    }

    /// Matching elements under `context`, in document order.
    pub fn fetch<T: Tree>(&self, tree: &T, context: T::Node) -> Vec<T::Node> {
        let found = match self {
            // Id lookups are often document-wide on the host side.
            SeedSource::Id(id) => tree
                .elements_by_id(context, id)
                .into_iter()
                .filter(|&node| tree::contains(tree, context, node))
                .collect(),
            SeedSource::Tag(name) => tree.elements_by_tag(context, name),
            SeedSource::Class(class) => tree.elements_by_class(context, class),
        };
        sort::unique_sort(tree, found)
    }
}

/// Seed narrowing for one selector: where the seeds come from and what still has to match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedPlan {
    pub source: SeedSource,
    /// Selector text without the seeding token; `*` when nothing else is left
    pub reduced: String,
}

impl SeedPlan {
    /// Whether the seeds are the answer.
    pub fn is_trivial(&self) -> bool {
        self.reduced == "*"
    }
}

/// Answer a bare `#id`, `tag` or `.class` query from the host index.
pub fn quick<T: Tree>(
    tree: &T,
    grammar: &Grammar,
    features: HostFeatures,
    query: &str,
    context: T::Node,
) -> Option<Vec<T::Node>> {
    let caps = grammar.quick.captures(parser::trim_selector(query))?;
    let source = if let Some(id) = caps.get(1) {
        SeedSource::Id(id.as_str().to_string())
    } else if let Some(tag) = caps.get(2) {
        SeedSource::Tag(tag.as_str().to_string())
    } else {
        SeedSource::Class(caps.get(3)?.as_str().to_string())
    };
    if !source.available(features) {
        return None;
    }
    debug!(query, source = ?source, "quick index lookup");
    Some(source.fetch(tree, context))
}

/// Ask the host to run the whole query.
pub fn native<T: Tree>(tree: &T, query: &str, context: T::Node) -> Option<Vec<T::Node>> {
    match tree.select_native(context, query) {
        Ok(found) => Some(sort::unique_sort(tree, found)),
        Err(err) => {
            debug!(query, error = %err, "native selection failed; falling back");
            None
        }
    }
}

/// Plan seed narrowing for a single, element-only sequence without a leading combinator.
pub fn seed_plan(group: &SelectorGroup, features: HostFeatures) -> Option<SeedPlan> {
    let [sequence] = group.sequences.as_slice() else {
        return None;
    };
    if sequence.first()?.kind == TokenKind::Combinator {
        return None;
    }

    let compound_start = sequence
        .iter()
        .rposition(|token| token.kind == TokenKind::Combinator)
        .map_or(0, |i| i + 1);

    let (index, source) = sequence[compound_start..]
        .iter()
        .enumerate()
        .rev()
        .find_map(|(offset, token)| {
            let source = match &token.value {
                TokenValue::Id(id) => SeedSource::Id(id.clone()),
                TokenValue::Class(class) => SeedSource::Class(class.clone()),
                TokenValue::Tag(name) if name != "*" => SeedSource::Tag(name.clone()),
                _ => return None,
            };
            source
                .available(features)
                .then_some((compound_start + offset, source))
        })?;

    let compound_len = sequence.len() - compound_start;
    let mut reduced = String::new();
    for (i, token) in sequence.iter().enumerate() {
        if i == index {
            if compound_len == 1 {
                reduced.push('*');
            }
            continue;
        }
        reduced.push_str(&token.raw);
    }

    Some(SeedPlan { source, reduced })
}
