//! Matcher generation from token sequences.
//!
//! A sequence made only of element tests folds into a single [`ElementFn`]: filters of a
//! compound AND together and every combinator wraps everything to its left in a walker.
//!
//! A sequence that contains a positional pseudo-class (`div:first p`) cannot be answered one
//! element at a time. It compiles into a [`StagedPlan`] instead. Each stage filters a
//! population with the element chain before the positional, narrows the survivors with the
//! positional and whatever follows it in the same compound, and publishes the result as an
//! anchor set. The next stage starts with a walker that looks for an anchored element.

use super::parser::{SelectorGroup, Token, TokenValue};
use super::Compiler;
use crate::error::{Result, SelectorError};
use crate::matcher::builder::PseudoHandler;
use crate::matcher::combinator::{self, Combinator};
use crate::matcher::context::MatchScope;
use crate::matcher::filters;
use crate::matcher::types::{all_of, any_of, element_fn, ElementFn, Matcher};
use crate::sort;
use crate::tree::{self, Tree};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// A compiled selector group.
pub struct CompiledSelector<T: Tree> {
    group: Arc<SelectorGroup>,
    /// OR of the element-only sequences
    element: Option<ElementFn<T>>,
    staged: Vec<StagedPlan<T>>,
}

struct Stage<T: Tree> {
    pre: ElementFn<T>,
    narrowers: Vec<Matcher<T>>,
}

/// Stages of one sequence that contains set matchers.
pub(crate) struct StagedPlan<T: Tree> {
    id: u32,
    stages: Vec<Stage<T>>,
    /// Starts with `+` or `~`, so it reaches the context's siblings
    sibling_led: bool,
}

enum SequencePlan<T: Tree> {
    Element(ElementFn<T>),
    Staged(StagedPlan<T>),
}

pub(crate) fn compile_group<T: Tree>(
    compiler: &mut Compiler<'_, T>,
    group: Arc<SelectorGroup>,
) -> Result<CompiledSelector<T>> {
    let mut elements = Vec::new();
    let mut staged = Vec::new();
    for sequence in &group.sequences {
        match compile_sequence(compiler, sequence)? {
            SequencePlan::Element(f) => elements.push(f),
            SequencePlan::Staged(plan) => staged.push(plan),
        }
    }

    let element = (!elements.is_empty()).then(|| any_of(elements));
    Ok(CompiledSelector {
        group,
        element,
        staged,
    })
}

fn compile_sequence<T: Tree>(
    compiler: &mut Compiler<'_, T>,
    sequence: &[Token],
) -> Result<SequencePlan<T>> {
    let plan_id = compiler.next_matcher_id();
    let mut stages: Vec<Stage<T>> = Vec::new();
    let mut chain: Vec<ElementFn<T>> = Vec::new();
    let mut narrowers: Option<Vec<Matcher<T>>> = None;

    for token in sequence {
        if let TokenValue::Combinator(c) = token.value {
            if let Some(narrowers) = narrowers.take() {
                stages.push(Stage {
                    pre: all_of(std::mem::take(&mut chain)),
                    narrowers,
                });
                chain.push(anchored(plan_id, stages.len() - 1));
            }
            if chain.is_empty() {
                chain.push(leading(c));
            } else {
                let inner = all_of(std::mem::take(&mut chain));
                chain.push(combinator::wrap(inner, c, compiler.next_matcher_id()));
            }
            continue;
        }

        let matcher = compile_token(compiler, token)?;
        if let Some(narrowers) = narrowers.as_mut() {
            narrowers.push(matcher);
            continue;
        }
        match matcher {
            Matcher::Element(f) => chain.push(f),
            set => narrowers = Some(vec![set]),
        }
    }

    if stages.is_empty() && narrowers.is_none() {
        return Ok(SequencePlan::Element(all_of(chain)));
    }
    stages.push(Stage {
        pre: all_of(chain),
        narrowers: narrowers.unwrap_or_default(),
    });
    Ok(SequencePlan::Staged(StagedPlan {
        id: plan_id,
        stages,
        sibling_led: leads_with_sibling(sequence),
    }))
}

fn leads_with_sibling(sequence: &[Token]) -> bool {
    sequence
        .first()
        .and_then(Token::combinator)
        .is_some_and(Combinator::is_sibling)
}

/// A leading combinator relates the element to the query context, which may be the
/// document node itself.
fn leading<T: Tree>(combinator: Combinator) -> ElementFn<T> {
    element_fn(move |scope: &MatchScope<'_, T>, node| {
        let Some(context) = scope.context else {
            return false;
        };
        match combinator {
            Combinator::Child => scope.tree.parent(node) == Some(context),
            Combinator::Descendant => tree::contains(scope.tree, context, node),
            Combinator::Adjacent => {
                tree::previous_element_sibling(scope.tree, node) == Some(context)
            }
            Combinator::Sibling => {
                let mut sibling = tree::previous_element_sibling(scope.tree, node);
                while let Some(s) = sibling {
                    if s == context {
                        return true;
                    }
                    sibling = tree::previous_element_sibling(scope.tree, s);
                }
                false
            }
        }
    })
}

fn anchored<T: Tree>(plan: u32, stage: usize) -> ElementFn<T> {
    element_fn(move |scope: &MatchScope<'_, T>, node| {
        scope.state.borrow().in_anchor(plan, stage, node)
    })
}

fn compile_token<T: Tree>(compiler: &mut Compiler<'_, T>, token: &Token) -> Result<Matcher<T>> {
    let matcher = match &token.value {
        TokenValue::Tag(name) => Matcher::Element(filters::tag(name)),
        TokenValue::Id(id) => Matcher::Element(filters::id(id)),
        TokenValue::Class(class) => {
            Matcher::Element(filters::class(compiler.class_pattern(class)?))
        }
        TokenValue::Attr(attr) => Matcher::Element(filters::attribute(attr)),
        TokenValue::Child(position) => Matcher::Element(filters::structural(*position)),
        TokenValue::Pseudo(pseudo) => {
            let registry = compiler.registry();
            match registry.get(&pseudo.name) {
                // Simple pseudo-classes ignore an argument.
                Some(PseudoHandler::Predicate(f)) => Matcher::Element(Arc::clone(f)),
                Some(PseudoHandler::Factory(factory)) => {
                    factory(compiler, pseudo.argument.as_deref())?
                }
                None => return Err(SelectorError::UnsupportedPseudo(pseudo.name.clone())),
            }
        }
        TokenValue::Combinator(c) => {
            return Err(SelectorError::Syntax(Combinator::symbol(*c).to_string()))
        }
    };
    Ok(matcher)
}

impl<T: Tree> StagedPlan<T> {
    fn run(&self, scope: &MatchScope<'_, T>, pool: &[T::Node]) -> Vec<T::Node> {
        let last = self.stages.len() - 1;
        let mut population: Option<Vec<T::Node>> = None;
        let mut found = Vec::new();

        for (index, stage) in self.stages.iter().enumerate() {
            let source: &[T::Node] = if index == last {
                pool
            } else {
                population.get_or_insert_with(|| self.population(scope, pool))
            };
            found = source
                .iter()
                .copied()
                .filter(|&node| (stage.pre)(scope, node))
                .collect();
            for narrower in &stage.narrowers {
                if found.is_empty() {
                    break;
                }
                found = narrower.apply(scope, &found);
            }
            if index < last {
                let members: HashSet<T::Node> = found.iter().copied().collect();
                scope.state.borrow_mut().set_anchor(self.id, index, members);
            }
        }

        scope.state.borrow_mut().clear_anchors(self.id);
        found
    }

    /// Elements an intermediate stage draws from: the descendants of the search root, or
    /// every element of the documents the candidates belong to.
    fn population(&self, scope: &MatchScope<'_, T>, pool: &[T::Node]) -> Vec<T::Node> {
        if let Some(context) = scope.context {
            let root = search_root(scope.tree, context, self.sibling_led);
            return tree::descendant_elements(scope.tree, root);
        }
        let mut roots: Vec<T::Node> = Vec::new();
        for &node in pool {
            let root = tree::root_of(scope.tree, node);
            if !roots.contains(&root) {
                roots.push(root);
            }
        }
        let mut elements = Vec::new();
        for root in roots {
            if scope.tree.is_element(root) {
                elements.push(root);
            }
            elements.extend(tree::descendant_elements(scope.tree, root));
        }
        elements
    }
}

/// Sibling-led selectors search under the context's parent.
fn search_root<T: Tree>(tree: &T, context: T::Node, sibling_led: bool) -> T::Node {
    if sibling_led {
        tree.parent(context).unwrap_or(context)
    } else {
        context
    }
}

impl<T: Tree> CompiledSelector<T> {
    /// Normalised selector text.
    pub fn text(&self) -> &str {
        &self.group.source
    }

    pub fn group(&self) -> &Arc<SelectorGroup> {
        &self.group
    }

    /// Some clause starts with `+` or `~`.
    pub fn leads_with_sibling(&self) -> bool {
        self.group
            .sequences
            .iter()
            .any(|sequence| leads_with_sibling(sequence))
    }

    /// Where candidates for a query under `context` are drawn from: the context itself, or
    /// its parent when a clause reaches the context's siblings.
    pub fn search_root(&self, tree: &T, context: T::Node) -> T::Node {
        search_root(tree, context, self.leads_with_sibling())
    }

    /// No sequence contains a set matcher.
    pub fn is_element_only(&self) -> bool {
        self.staged.is_empty()
    }

    /// The per-element matcher, when the whole group is element-only.
    pub fn element_matcher(&self) -> Option<&ElementFn<T>> {
        if self.staged.is_empty() {
            self.element.as_ref()
        } else {
            None
        }
    }

    /// The group as a single [`Matcher`].
    pub fn to_matcher(self: &Arc<Self>) -> Matcher<T> {
        if let Some(element) = self.element_matcher() {
            return Matcher::Element(Arc::clone(element));
        }
        let compiled = Arc::clone(self);
        Matcher::set(move |scope, seed, results| {
            results.extend(compiled.execute(scope, seed));
        })
    }

    /// Every element of `pool` the group selects.
    ///
    /// Element-chain results keep pool order. When more than one sequence contributes, the
    /// merged result is put in document order without duplicates.
    pub fn execute(&self, scope: &MatchScope<'_, T>, pool: &[T::Node]) -> Vec<T::Node> {
        scope.state.borrow_mut().bump();

        let mut results = Vec::new();
        let mut sources = 0;
        if let Some(element) = &self.element {
            results.extend(pool.iter().copied().filter(|&node| element(scope, node)));
            if !results.is_empty() {
                sources += 1;
            }
        }
        for plan in &self.staged {
            let found = plan.run(scope, pool);
            if !found.is_empty() {
                sources += 1;
                results.extend(found);
            }
        }

        // Walks stamped under this context must not be reused by an enclosing execution.
        scope.state.borrow_mut().bump();

        if sources > 1 {
            sort::unique_sort(scope.tree, results)
        } else {
            results
        }
    }

    /// Whether any element of `pool` is selected; stops at the first hit when it can.
    pub fn any_match(&self, scope: &MatchScope<'_, T>, pool: &[T::Node]) -> bool {
        match self.element_matcher() {
            Some(element) => {
                scope.state.borrow_mut().bump();
                let hit = pool.iter().any(|&node| element(scope, node));
                scope.state.borrow_mut().bump();
                hit
            }
            None => !self.execute(scope, pool).is_empty(),
        }
    }

    /// Whether `node` alone is selected.
    pub fn matches_one(&self, scope: &MatchScope<'_, T>, node: T::Node) -> bool {
        self.any_match(scope, &[node])
    }
}

impl<T: Tree> fmt::Debug for CompiledSelector<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledSelector")
            .field("text", &self.text())
            .field("element", &self.element.is_some())
            .field("staged", &self.staged.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::{CompileCaches, Grammar};
    use crate::dom::{Document, NodeId};
    use crate::matcher::builder::PseudoRegistry;
    use crate::matcher::cache::CacheConfig;
    use crate::matcher::context::ExecState;
    use std::cell::RefCell;

    fn compile(text: &str) -> Result<Arc<CompiledSelector<Document>>> {
        let grammar = Grammar::new()?;
        let registry = PseudoRegistry::with_defaults();
        let mut caches = CompileCaches::new(&CacheConfig::default());
        Compiler::new(&grammar, &registry, &mut caches).compile(text)
    }

    fn select(doc: &Document, text: &str, context: NodeId) -> Vec<NodeId> {
        let compiled = compile(text).unwrap();
        let state = RefCell::new(ExecState::default());
        let scope = MatchScope::new(doc, Some(context), doc.is_xml(), &state);
        compiled.execute(&scope, &tree::descendant_elements(doc, context))
    }

    /// div#a > (p.x, p, span) ; div#b > (p.x)
    fn sample() -> (Document, Vec<NodeId>) {
        let mut doc = Document::new();
        let root = doc.root();
        let a = doc.append_element(root, "div", &[("id", "a")]);
        let p1 = doc.append_element(a, "p", &[("class", "x")]);
        let p2 = doc.append_element(a, "p", &[]);
        let span = doc.append_element(a, "span", &[]);
        let b = doc.append_element(root, "div", &[("id", "b")]);
        let p3 = doc.append_element(b, "p", &[("class", "x")]);
        (doc, vec![a, p1, p2, span, b, p3])
    }

    #[test]
    fn test_element_only_detection() {
        assert!(compile("div > p.x, span").unwrap().is_element_only());
        assert!(!compile("div p:first").unwrap().is_element_only());
        assert!(compile("p:not(.x)").unwrap().is_element_only());
        assert!(!compile("p:not(:first)").unwrap().is_element_only());
    }

    #[test]
    fn test_element_chain() {
        let (doc, n) = sample();
        assert_eq!(select(&doc, "div > p.x", doc.root()), vec![n[1], n[5]]);
        assert_eq!(select(&doc, "#a p + span", doc.root()), vec![n[3]]);
        assert_eq!(select(&doc, "p.x ~ span", doc.root()), vec![n[3]]);
    }

    #[test]
    fn test_leading_combinator_anchors_on_context() {
        let (doc, n) = sample();
        assert_eq!(select(&doc, "> p", n[0]), vec![n[1], n[2]]);
        assert_eq!(select(&doc, "> div", doc.root()), vec![n[0], n[4]]);
        assert!(select(&doc, "> span", doc.root()).is_empty());
    }

    #[test]
    fn test_staged_plan() {
        let (doc, n) = sample();
        assert_eq!(select(&doc, "p:first", doc.root()), vec![n[1]]);
        assert_eq!(select(&doc, "div:last p", doc.root()), vec![n[5]]);
        assert_eq!(select(&doc, "div:first > p:last", doc.root()), vec![n[2]]);
        assert_eq!(select(&doc, "p:eq(1).x", doc.root()), Vec::<NodeId>::new());
        assert_eq!(select(&doc, "p.x:eq(1)", doc.root()), vec![n[5]]);
    }

    #[test]
    fn test_group_results_are_merged_in_document_order() {
        let (doc, n) = sample();
        assert_eq!(select(&doc, "span, p:first", doc.root()), vec![n[1], n[3]]);
        assert_eq!(select(&doc, "p.x, p:last, div", doc.root()), vec![n[0], n[1], n[4], n[5]]);
    }

    #[test]
    fn test_unknown_pseudo() {
        assert!(matches!(
            compile("p:bogus"),
            Err(SelectorError::UnsupportedPseudo(name)) if name == "bogus"
        ));
    }

    #[test]
    fn test_matches_one() {
        let (doc, n) = sample();
        let compiled = compile("div > p").unwrap();
        let state = RefCell::new(ExecState::default());
        let scope = MatchScope::new(&doc, None, false, &state);
        assert!(compiled.matches_one(&scope, n[2]));
        assert!(!compiled.matches_one(&scope, n[3]));
    }
}
