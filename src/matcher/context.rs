//! Execution state shared by the matchers of one query.
//!
//! [`MatchScope`] is what every matcher receives: the host tree, the query context, the XML
//! flag, and a handle on the engine's [`ExecState`]. The state owns the memo tables that make
//! repeated structural tests cheap: combinator walk stamps, sibling ranks, and the anchor
//! sets that chain the stages of positional selectors. All of them are keyed by a generation
//! counter so a new execution invalidates them without clearing anything.

use crate::config::ExecutionConfig;
use crate::tree::{HostFeatures, Tree};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use tracing::{debug, warn};

use super::combinator::Direction;

/// What a matcher sees while it runs.
pub struct MatchScope<'a, T: Tree> {
    /// Host tree
    pub tree: &'a T,
    /// Query context; `None` when filtering a candidate set
    pub context: Option<T::Node>,
    /// Tag and attribute names compare case-sensitively
    pub xml: bool,
    pub(crate) state: &'a RefCell<ExecState<T::Node>>,
}

impl<'a, T: Tree> MatchScope<'a, T> {
    pub(crate) fn new(
        tree: &'a T,
        context: Option<T::Node>,
        xml: bool,
        state: &'a RefCell<ExecState<T::Node>>,
    ) -> Self {
        Self {
            tree,
            context,
            xml,
            state,
        }
    }

    /// Same tree and state, different context.
    pub fn with_context(&self, context: T::Node) -> MatchScope<'a, T> {
        MatchScope {
            tree: self.tree,
            context: Some(context),
            xml: self.xml,
            state: self.state,
        }
    }

    /// Whether `node` is the query context.
    pub fn is_context(&self, node: T::Node) -> bool {
        self.context == Some(node)
    }

    /// Current generation.
    pub fn generation(&self) -> u32 {
        self.state.borrow().generation()
    }
}

/// Host capabilities resolved for one root document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentAdapter<N> {
    pub document_id: u64,
    pub root: N,
    pub features: HostFeatures,
    pub xml: bool,
}

impl<N: Copy + Eq> DocumentAdapter<N> {
    /// Resolve the adapter for the document rooted at `root`.
    pub fn resolve<T: Tree<Node = N>>(tree: &T, root: N) -> Self {
        Self {
            document_id: tree.document_id(),
            root,
            features: tree.features(),
            xml: tree.is_xml(),
        }
    }

    /// Whether this adapter was resolved for the same document and root.
    pub fn serves<T: Tree<Node = N>>(&self, tree: &T, root: N) -> bool {
        self.document_id == tree.document_id() && self.root == root
    }
}

/// Element position among its element siblings, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SiblingRank {
    pub index: u32,
    pub from_end: u32,
    pub type_index: u32,
    pub type_from_end: u32,
}

#[derive(Debug, Clone, Copy)]
struct Stamp {
    generation: u32,
    matcher: u32,
    cell: usize,
}

/// Memo tables for one engine.
#[derive(Debug)]
pub struct ExecState<N> {
    generation: u32,
    walk_cache: bool,
    walk_limit: usize,
    stamps: HashMap<(N, Direction), Stamp>,
    cells: Vec<Option<bool>>,
    ranks: HashMap<N, (u32, SiblingRank)>,
    anchors: HashMap<(u32, usize), HashSet<N>>,
}

impl<N> Default for ExecState<N> {
    fn default() -> Self {
        let execution = ExecutionConfig::default();
        Self {
            generation: 1,
            walk_cache: execution.enable_walk_cache,
            walk_limit: execution.walk_table_limit,
            stamps: HashMap::new(),
            cells: Vec::new(),
            ranks: HashMap::new(),
            anchors: HashMap::new(),
        }
    }
}

impl<N: Copy + Eq + Hash> ExecState<N> {
    pub fn new(execution: &ExecutionConfig) -> Self {
        Self {
            walk_cache: execution.enable_walk_cache,
            walk_limit: execution.walk_table_limit,
            ..Default::default()
        }
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub(crate) fn walk_cache_enabled(&self) -> bool {
        self.walk_cache
    }

    /// Start a top-level query: shrink oversized tables, then bump the generation.
    pub(crate) fn begin_query(&mut self) {
        if self.stamps.len() > self.walk_limit || self.cells.len() > self.walk_limit {
            debug!(
                stamps = self.stamps.len(),
                cells = self.cells.len(),
                "dropping walker tables"
            );
            self.stamps.clear();
            self.cells.clear();
        }
        if self.ranks.len() > self.walk_limit {
            self.ranks.clear();
        }
        self.bump();
    }

    /// Advance the generation, invalidating every stamp and rank in O(1).
    ///
    /// On wraparound the stamp and rank tables are cleared so no stale entry can collide
    /// with a reused generation number. Outcome cells are kept: walks may still be open.
    pub(crate) fn bump(&mut self) {
        match self.generation.checked_add(1) {
            Some(next) => self.generation = next,
            None => {
                warn!("generation counter wrapped; clearing walker and rank tables");
                self.stamps.clear();
                self.ranks.clear();
                self.generation = 1;
            }
        }
    }

    /// Forget everything tied to a particular document.
    pub(crate) fn reset_document(&mut self) {
        self.stamps.clear();
        self.cells.clear();
        self.ranks.clear();
        self.anchors.clear();
        self.bump();
    }

    #[cfg(test)]
    pub(crate) fn set_generation(&mut self, generation: u32) {
        self.generation = generation;
    }

    /// Outcome of an earlier walk through `node` in this generation, if it has finished.
    pub(crate) fn cached_walk(&self, node: N, direction: Direction, matcher: u32) -> Option<bool> {
        let stamp = self.stamps.get(&(node, direction))?;
        if stamp.generation != self.generation || stamp.matcher != matcher {
            return None;
        }
        self.cells.get(stamp.cell).copied().flatten()
    }

    pub(crate) fn open_cell(&mut self) -> usize {
        self.cells.push(None);
        self.cells.len() - 1
    }

    pub(crate) fn stamp(&mut self, node: N, direction: Direction, matcher: u32, cell: usize) {
        self.stamps.insert(
            (node, direction),
            Stamp {
                generation: self.generation,
                matcher,
                cell,
            },
        );
    }

    pub(crate) fn close_cell(&mut self, cell: usize, outcome: bool) {
        if let Some(slot) = self.cells.get_mut(cell) {
            *slot = Some(outcome);
        }
    }

    /// Rank of `node` among its siblings, scanning the parent once per generation.
    ///
    /// The scan records the ranks of every sibling, so the other children of the same parent
    /// are answered from the memo.
    pub(crate) fn sibling_rank<T>(&mut self, tree: &T, node: N, xml: bool) -> Option<SiblingRank>
    where
        T: Tree<Node = N>,
    {
        if let Some((generation, rank)) = self.ranks.get(&node) {
            if *generation == self.generation {
                return Some(*rank);
            }
        }

        let parent = tree.parent(node)?;
        let mut scanned: Vec<(N, u32, u32, String)> = Vec::new();
        let mut type_counts: HashMap<String, u32> = HashMap::new();
        let mut index = 0;
        let mut child = tree.first_child(parent);
        while let Some(c) = child {
            if tree.is_element(c) {
                index += 1;
                let tag = tag_key(tree, c, xml);
                let count = type_counts.entry(tag.clone()).or_insert(0);
                *count += 1;
                scanned.push((c, index, *count, tag));
            }
            child = tree.next_sibling(c);
        }

        let total = index;
        let generation = self.generation;
        for (c, index, type_index, tag) in scanned {
            let type_total = type_counts.get(&tag).copied().unwrap_or(type_index);
            self.ranks.insert(
                c,
                (
                    generation,
                    SiblingRank {
                        index,
                        from_end: total - index + 1,
                        type_index,
                        type_from_end: type_total - type_index + 1,
                    },
                ),
            );
        }

        self.ranks.get(&node).map(|(_, rank)| *rank)
    }

    pub(crate) fn set_anchor(&mut self, plan: u32, stage: usize, members: HashSet<N>) {
        self.anchors.insert((plan, stage), members);
    }

    pub(crate) fn in_anchor(&self, plan: u32, stage: usize, node: N) -> bool {
        self.anchors
            .get(&(plan, stage))
            .is_some_and(|members| members.contains(&node))
    }

    pub(crate) fn clear_anchors(&mut self, plan: u32) {
        self.anchors.retain(|(p, _), _| *p != plan);
    }

    #[cfg(test)]
    pub(crate) fn table_sizes(&self) -> (usize, usize, usize) {
        (self.stamps.len(), self.cells.len(), self.ranks.len())
    }
}

fn tag_key<T: Tree>(tree: &T, node: T::Node, xml: bool) -> String {
    let name = tree.local_name(node).unwrap_or_default();
    if xml {
        name.to_string()
    } else {
        name.to_ascii_lowercase()
    }
}
