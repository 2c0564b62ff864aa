//! Default pseudo-class handlers.
//!
//! Predicates cover the form and content pseudo-classes. Factories cover the pseudo-classes
//! that take an argument: nested selectors (`:not`, `:has`, `:is`), text (`:contains`,
//! `:lang`) and positions within the candidate set (`:first`, `:eq(n)`, `:gt(n)`, ...).

use super::builder::PseudoRegistry;
use super::context::MatchScope;
use super::types::Matcher;
use crate::compiler::Compiler;
use crate::error::{Result, SelectorError};
use crate::tree::{self, Tree};
use std::collections::HashSet;
use std::sync::Arc;

/// Register every default handler on `registry`.
pub fn register_defaults<T: Tree>(registry: &mut PseudoRegistry<T>) {
    registry
        .register_predicate("root", |scope, node| {
            scope
                .tree
                .parent(node)
                .map_or(true, |parent| !scope.tree.is_element(parent))
        })
        .register_predicate("empty", |scope, node| is_empty(scope.tree, node))
        .register_predicate("parent", |scope, node| !is_empty(scope.tree, node))
        .register_predicate("header", |scope, node| {
            scope.tree.local_name(node).is_some_and(|name| {
                let bytes = name.as_bytes();
                bytes.len() == 2
                    && bytes[0].eq_ignore_ascii_case(&b'h')
                    && bytes[1].is_ascii_digit()
            })
        })
        .register_predicate("input", |scope, node| {
            ["input", "select", "textarea", "button"]
                .iter()
                .any(|tag| tree::has_tag(scope.tree, node, tag, false))
        })
        .register_predicate("button", |scope, node| {
            tree::has_tag(scope.tree, node, "button", false)
                || (tree::has_tag(scope.tree, node, "input", false)
                    && type_is(scope.tree, node, "button"))
        })
        .register_predicate("text", |scope, node| {
            tree::has_tag(scope.tree, node, "input", false)
                && scope
                    .tree
                    .attribute(node, "type")
                    .map_or(true, |kind| kind.eq_ignore_ascii_case("text"))
        })
        .register_predicate("checked", |scope, node| {
            (tree::has_tag(scope.tree, node, "input", false)
                && scope.tree.attribute(node, "checked").is_some())
                || is_selected(scope.tree, node)
        })
        .register_predicate("selected", |scope, node| is_selected(scope.tree, node))
        .register_predicate("enabled", |scope, node| {
            is_form_control(scope.tree, node) && !is_disabled(scope.tree, node)
        })
        .register_predicate("disabled", |scope, node| {
            is_form_control(scope.tree, node) && is_disabled(scope.tree, node)
        });

    for kind in ["radio", "checkbox", "file", "password", "image"] {
        registry.register_predicate(kind, move |scope, node| {
            tree::has_tag(scope.tree, node, "input", false) && type_is(scope.tree, node, kind)
        });
    }
    for kind in ["submit", "reset"] {
        registry.register_predicate(kind, move |scope, node| {
            (tree::has_tag(scope.tree, node, "input", false)
                || tree::has_tag(scope.tree, node, "button", false))
                && type_is(scope.tree, node, kind)
        });
    }

    registry
        .register_factory("not", not)
        .register_factory("is", is)
        .register_factory("matches", is)
        .register_factory("has", has)
        .register_factory("contains", contains)
        .register_factory("lang", lang);

    register_positionals(registry);
}

fn is_empty<T: Tree>(tree: &T, node: T::Node) -> bool {
    let mut child = tree.first_child(node);
    while let Some(c) = child {
        if tree.is_element(c) || tree.is_text(c) {
            return false;
        }
        child = tree.next_sibling(c);
    }
    true
}

fn type_is<T: Tree>(tree: &T, node: T::Node, kind: &str) -> bool {
    tree.attribute(node, "type")
        .is_some_and(|value| value.eq_ignore_ascii_case(kind))
}

fn is_selected<T: Tree>(tree: &T, node: T::Node) -> bool {
    tree::has_tag(tree, node, "option", false) && tree.attribute(node, "selected").is_some()
}

const FORM_CONTROLS: [&str; 7] = [
    "input", "button", "select", "textarea", "option", "optgroup", "fieldset",
];

fn is_form_control<T: Tree>(tree: &T, node: T::Node) -> bool {
    FORM_CONTROLS
        .iter()
        .any(|tag| tree::has_tag(tree, node, tag, false))
}

/// Disabled directly, through a disabled `optgroup`, or through a disabled `fieldset`
/// ancestor (controls inside that fieldset's first `legend` stay enabled).
fn is_disabled<T: Tree>(tree: &T, node: T::Node) -> bool {
    if tree.attribute(node, "disabled").is_some() {
        return true;
    }
    if tree::has_tag(tree, node, "option", false) {
        return tree::parent_element(tree, node).is_some_and(|parent| {
            tree::has_tag(tree, parent, "optgroup", false)
                && tree.attribute(parent, "disabled").is_some()
        });
    }
    if tree::has_tag(tree, node, "optgroup", false) {
        return false;
    }

    let mut below = node;
    let mut ancestor = tree::parent_element(tree, node);
    while let Some(a) = ancestor {
        if tree::has_tag(tree, a, "fieldset", false) && tree.attribute(a, "disabled").is_some() {
            let first_legend = first_child_tagged(tree, a, "legend");
            if first_legend != Some(below) {
                return true;
            }
        }
        below = a;
        ancestor = tree::parent_element(tree, a);
    }
    false
}

fn first_child_tagged<T: Tree>(tree: &T, parent: T::Node, tag: &str) -> Option<T::Node> {
    let mut child = tree.first_child(parent);
    while let Some(c) = child {
        if tree.is_element(c) && tree::has_tag(tree, c, tag, false) {
            return Some(c);
        }
        child = tree.next_sibling(c);
    }
    None
}

fn required<'a>(name: &str, argument: Option<&'a str>) -> Result<&'a str> {
    argument.ok_or_else(|| SelectorError::Syntax(format!(":{name}")))
}

fn not<T: Tree>(compiler: &mut Compiler<'_, T>, argument: Option<&str>) -> Result<Matcher<T>> {
    let inner = compiler.compile(required("not", argument)?)?;
    if let Some(element) = inner.element_matcher() {
        let element = Arc::clone(element);
        return Ok(Matcher::element(move |scope, node| !element(scope, node)));
    }
    Ok(Matcher::set(move |scope, seed, results| {
        let excluded: HashSet<T::Node> = inner.execute(scope, seed).into_iter().collect();
        results.extend(seed.iter().copied().filter(|node| !excluded.contains(node)));
    }))
}

fn is<T: Tree>(compiler: &mut Compiler<'_, T>, argument: Option<&str>) -> Result<Matcher<T>> {
    let inner = compiler.compile(required("is", argument)?)?;
    if let Some(element) = inner.element_matcher() {
        let element = Arc::clone(element);
        return Ok(Matcher::element(move |scope, node| element(scope, node)));
    }
    Ok(Matcher::set(move |scope, seed, results| {
        let kept: HashSet<T::Node> = inner.execute(scope, seed).into_iter().collect();
        results.extend(seed.iter().copied().filter(|node| kept.contains(node)));
    }))
}

fn has<T: Tree>(compiler: &mut Compiler<'_, T>, argument: Option<&str>) -> Result<Matcher<T>> {
    let inner = compiler.compile(required("has", argument)?)?;
    Ok(Matcher::element(move |scope: &MatchScope<'_, T>, node| {
        let pool = tree::descendant_elements(scope.tree, inner.search_root(scope.tree, node));
        !pool.is_empty() && inner.any_match(&scope.with_context(node), &pool)
    }))
}

fn contains<T: Tree>(compiler: &mut Compiler<'_, T>, argument: Option<&str>) -> Result<Matcher<T>> {
    let text = compiler.unescape(required("contains", argument)?);
    Ok(Matcher::element(move |scope: &MatchScope<'_, T>, node| {
        scope.tree.text_content(node).contains(text.as_str())
    }))
}

fn lang<T: Tree>(compiler: &mut Compiler<'_, T>, argument: Option<&str>) -> Result<Matcher<T>> {
    let raw = argument.unwrap_or_default();
    if !compiler.grammar().identifier.is_match(raw) {
        return Err(SelectorError::UnsupportedLang(raw.to_string()));
    }
    let wanted = compiler.unescape(raw).to_ascii_lowercase();
    let prefix = format!("{wanted}-");

    Ok(Matcher::element(move |scope: &MatchScope<'_, T>, node| {
        let mut current = Some(node);
        while let Some(element) = current {
            let value = if scope.xml {
                scope
                    .tree
                    .attribute(element, "xml:lang")
                    .or_else(|| scope.tree.attribute(element, "lang"))
            } else {
                scope.tree.attribute(element, "lang")
            };
            if let Some(value) = value.filter(|v| !v.is_empty()) {
                let value = value.to_ascii_lowercase();
                return value == wanted || value.starts_with(&prefix);
            }
            current = tree::parent_element(scope.tree, element);
        }
        false
    }))
}

/// Positional handlers select seed indexes; the chosen elements keep seed order.
fn register_positionals<T: Tree>(registry: &mut PseudoRegistry<T>) {
    registry
        .register_factory("first", |_, _| Ok(positional(|len| (0..len.min(1)).collect())))
        .register_factory("last", |_, _| {
            Ok(positional(|len| len.checked_sub(1).into_iter().collect()))
        })
        .register_factory("even", |_, _| Ok(positional(|len| (0..len).step_by(2).collect())))
        .register_factory("odd", |_, _| Ok(positional(|len| (1..len).step_by(2).collect())))
        .register_factory("eq", |_, argument| index_positional("eq", argument))
        .register_factory("nth", |_, argument| index_positional("nth", argument))
        .register_factory("lt", |_, argument| {
            let n = integer("lt", argument)?;
            Ok(positional(move |len| {
                let end = if n < 0 { n.saturating_add(len as i64) } else { n.min(len as i64) };
                (0..end.max(0) as usize).collect()
            }))
        })
        .register_factory("gt", |_, argument| {
            let n = integer("gt", argument)?;
            Ok(positional(move |len| {
                let start = if n < 0 { n.saturating_add(len as i64) } else { n };
                let first = start.saturating_add(1).clamp(0, len as i64) as usize;
                (first..len).collect()
            }))
        });
}

fn integer(name: &str, argument: Option<&str>) -> Result<i64> {
    let raw = required(name, argument)?;
    raw.trim()
        .parse()
        .map_err(|_| SelectorError::Syntax(format!(":{name}({raw})")))
}

fn index_positional<T: Tree>(name: &str, argument: Option<&str>) -> Result<Matcher<T>> {
    let n = integer(name, argument)?;
    Ok(positional(move |len| {
        let index = if n < 0 { n.saturating_add(len as i64) } else { n };
        if (0..len as i64).contains(&index) {
            vec![index as usize]
        } else {
            Vec::new()
        }
    }))
}

fn positional<T, F>(indexes: F) -> Matcher<T>
where
    T: Tree,
    F: Fn(usize) -> Vec<usize> + Send + Sync + 'static,
{
    Matcher::set(move |_, seed, results| {
        results.extend(indexes(seed.len()).into_iter().filter_map(|i| seed.get(i).copied()));
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{Document, NodeId};
    use crate::matcher::context::ExecState;
    use std::cell::RefCell;

    fn apply_set(matcher: &Matcher<Document>, doc: &Document, seed: &[NodeId]) -> Vec<NodeId> {
        let state = RefCell::new(ExecState::default());
        let scope = MatchScope::new(doc, None, false, &state);
        matcher.apply(&scope, seed)
    }

    fn seed(n: usize) -> (Document, Vec<NodeId>) {
        let mut doc = Document::new();
        let root = doc.root();
        let ul = doc.append_element(root, "ul", &[]);
        let items = (0..n).map(|_| doc.append_element(ul, "li", &[])).collect();
        (doc, items)
    }

    fn set_for(name: &str, argument: Option<&str>) -> Result<Matcher<Document>> {
        match name {
            "first" => Ok(positional(|len| (0..len.min(1)).collect())),
            "eq" | "nth" => index_positional(name, argument),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_index_positionals() {
        let (doc, items) = seed(4);
        assert_eq!(apply_set(&set_for("first", None).unwrap(), &doc, &items), vec![items[0]]);
        assert_eq!(apply_set(&set_for("eq", Some("2")).unwrap(), &doc, &items), vec![items[2]]);
        assert_eq!(apply_set(&set_for("eq", Some("-1")).unwrap(), &doc, &items), vec![items[3]]);
        assert!(apply_set(&set_for("eq", Some("9")).unwrap(), &doc, &items).is_empty());
        assert!(apply_set(&set_for("first", None).unwrap(), &doc, &[]).is_empty());
    }

    #[test]
    fn test_bad_positional_argument() {
        assert!(matches!(set_for("eq", Some("x")), Err(SelectorError::Syntax(_))));
        assert!(matches!(set_for("nth", None), Err(SelectorError::Syntax(_))));
    }

    #[test]
    fn test_disabled_through_fieldset_and_legend() {
        let mut doc = Document::new();
        let root = doc.root();
        let fieldset = doc.append_element(root, "fieldset", &[("disabled", "")]);
        let legend = doc.append_element(fieldset, "legend", &[]);
        let in_legend = doc.append_element(legend, "input", &[]);
        let inside = doc.append_element(fieldset, "input", &[]);
        let select = doc.append_element(root, "select", &[]);
        let group = doc.append_element(select, "optgroup", &[("disabled", "")]);
        let option = doc.append_element(group, "option", &[]);
        let free = doc.append_element(root, "textarea", &[]);

        assert!(!is_disabled(&doc, in_legend));
        assert!(is_disabled(&doc, inside));
        assert!(is_disabled(&doc, option));
        assert!(!is_disabled(&doc, free));
        assert!(is_form_control(&doc, option));
        assert!(!is_form_control(&doc, legend));
    }

    #[test]
    fn test_empty_counts_text_but_not_comments() {
        let mut doc = Document::new();
        let root = doc.root();
        let with_comment = doc.append_element(root, "p", &[]);
        let comment = doc.create_comment("note");
        doc.append_child(with_comment, comment);
        let with_text = doc.append_element(root, "p", &[]);
        doc.append_text(with_text, "x");

        assert!(is_empty(&doc, with_comment));
        assert!(!is_empty(&doc, with_text));
    }
}
