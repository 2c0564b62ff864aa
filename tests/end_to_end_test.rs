//! End-to-end selection tests over a realistic page.
//!
//! Every query runs through the public engine API against the shared YAML fixture and is
//! checked by the ids of the returned elements.

use selector_engine::dom::{Document, NodeId};
use selector_engine::{SelectorEngine, SelectorError, Tree};

const PAGE: &str = include_str!("fixtures/page.yaml");

fn page() -> Document {
    Document::from_yaml_str(PAGE).expect("fixture parses")
}

fn ids(doc: &Document, nodes: &[NodeId]) -> Vec<String> {
    nodes
        .iter()
        .map(|&n| doc.attribute(n, "id").unwrap_or("?").to_string())
        .collect()
}

fn select(doc: &Document, query: &str) -> Vec<String> {
    let mut engine = SelectorEngine::new().unwrap();
    let found = engine
        .select(doc, query, doc.root())
        .unwrap_or_else(|err| panic!("{query}: {err}"));
    ids(doc, &found)
}

fn assert_selects(doc: &Document, query: &str, expected: &[&str]) {
    assert_eq!(select(doc, query), expected, "query: {query}");
}

#[test]
fn test_simple_selectors() {
    let doc = page();
    assert_selects(&doc, "#list", &["list"]);
    assert_selects(&doc, "li.active", &["b"]);
    assert_selects(&doc, "div.top.menu", &["nav"]);
    assert_selects(&doc, "H1", &["h"]);
    assert_selects(&doc, "body > *", &["nav", "form", "content"]);
    assert_selects(&doc, "html > body div", &["nav", "content"]);
}

#[test]
fn test_combinators() {
    let doc = page();
    assert_selects(&doc, "#list > li + li", &["b", "c", "d", "e"]);
    assert_selects(&doc, "#list > li ~ .active", &["b"]);
    assert_selects(&doc, "h1 + p", &["p1"]);
    assert_selects(&doc, "h1 ~ p", &["p1", "p2", "p3"]);
    assert_selects(&doc, "form select > option", &["o1", "o2"]);
}

#[test]
fn test_structural_positions() {
    let doc = page();
    assert_selects(&doc, "li:nth-child(2n+1)", &["a", "c", "e"]);
    assert_selects(&doc, "li:nth-child(even)", &["b", "d"]);
    assert_selects(&doc, "li:nth-child(-n+2)", &["a", "b"]);
    assert_selects(&doc, "li:nth-last-child(1)", &["e"]);
    assert_selects(&doc, "#content p:first-of-type", &["p1"]);
    assert_selects(&doc, "#content p:last-of-type", &["p3"]);
    assert_selects(&doc, "#content > :nth-of-type(2)", &["p2"]);
    assert_selects(&doc, "#content :only-of-type", &["h", "s1"]);
    assert_selects(&doc, "option:first-child", &["o1"]);
}

#[test]
fn test_attributes() {
    let doc = page();
    assert_selects(&doc, "[title~=world]", &["p3"]);
    assert_selects(&doc, "[data-x|=a]", &["p3"]);
    assert_selects(&doc, "[title^=hello]", &["p3"]);
    assert_selects(&doc, "[title$='world']", &["p3"]);
    assert_selects(&doc, "[title*=\"o w\"]", &["p3"]);
    assert_selects(&doc, "p[title!=x]", &["p1", "p2", "p3"]);
    assert_selects(&doc, "[class~=lead]", &["p1", "p3"]);
    assert_selects(&doc, "input[type=checkbox]", &["agree"]);
    assert_selects(&doc, "[TYPE=submit]", &["go"]);
}

#[test]
fn test_positional_sets() {
    let doc = page();
    assert_selects(&doc, "li:first", &["a"]);
    assert_selects(&doc, "li:last", &["e"]);
    assert_selects(&doc, "li:eq(1)", &["b"]);
    assert_selects(&doc, "li:eq(-1)", &["e"]);
    assert_selects(&doc, "li:gt(2)", &["d", "e"]);
    assert_selects(&doc, "li:lt(2)", &["a", "b"]);
    assert_selects(&doc, "li:even", &["a", "c", "e"]);
    assert_selects(&doc, "li:odd", &["b", "d"]);
    assert_selects(&doc, "div:last p:first", &["p1"]);
    assert_selects(&doc, "div:first li.item:last", &["e"]);
}

#[test]
fn test_negation_and_nesting() {
    let doc = page();
    assert_selects(&doc, "li:not(.active)", &["a", "c", "d", "e"]);
    assert_selects(&doc, "li:not(:first)", &["b", "c", "d", "e"]);
    assert_selects(&doc, "li:not(.active, #e)", &["a", "c", "d"]);
    assert_selects(&doc, "div:has(> ul)", &["nav"]);
    assert_selects(&doc, "div:has(p.note)", &["content"]);
    assert_selects(&doc, "p:is(.note, #p2)", &["p2", "p3"]);
    assert_selects(&doc, "p:matches(:first)", &["p1"]);
}

#[test]
fn test_content_pseudos() {
    let doc = page();
    assert_selects(&doc, "p:contains(paragraph)", &["p1", "p2"]);
    assert_selects(&doc, "p:contains('First')", &["p1"]);
    assert_selects(&doc, "#content :empty", &["s1", "p3"]);
    assert_selects(&doc, "#content :parent", &["h", "p1", "p2"]);
    assert_selects(&doc, ":header", &["h"]);
    assert_selects(&doc, ":lang(fr)", &["content", "h", "p1", "p2", "s1", "p3"]);
    assert_selects(&doc, ":lang(en)", &["e"]);
    assert_eq!(select(&doc, ":root").len(), 1);
}

#[test]
fn test_form_pseudos() {
    let doc = page();
    assert_selects(&doc, ":checked", &["agree", "o2"]);
    assert_selects(&doc, ":selected", &["o2"]);
    assert_selects(&doc, ":disabled", &["off"]);
    assert_selects(&doc, "#form :enabled", &["name", "agree", "pick", "o1", "o2", "go"]);
    assert_selects(&doc, ":text", &["name"]);
    assert_selects(&doc, ":checkbox", &["agree"]);
    assert_selects(&doc, ":radio", &["off"]);
    assert_selects(&doc, ":submit", &["go"]);
    assert_selects(&doc, ":button", &["go"]);
    assert_selects(&doc, ":input", &["name", "agree", "off", "pick", "go"]);
}

#[test]
fn test_extreme_position_arguments() {
    let doc = page();
    let all = ["a", "b", "c", "d", "e"];
    assert_selects(&doc, "li:nth-child(n-9223372036854775807)", &all);
    assert_selects(&doc, "li:nth-child(-n+9223372036854775807)", &all);
    assert_selects(&doc, "li:nth-child(9223372036854775807)", &[]);
    assert_selects(&doc, "li:nth-last-of-type(9223372036854775807n+1)", &["e"]);
    assert_selects(&doc, "li:gt(9223372036854775807)", &[]);
    assert_selects(&doc, "li:gt(-9223372036854775808)", &all);
    assert_selects(&doc, "li:lt(9223372036854775807)", &all);
    assert_selects(&doc, "li:lt(-9223372036854775808)", &[]);
    assert_selects(&doc, "li:eq(-9223372036854775808)", &[]);
    assert_selects(&doc, "li:eq(9223372036854775807)", &[]);
}

#[test]
fn test_has_with_sibling_combinators() {
    let doc = page();
    assert_selects(&doc, "div:has(+ form)", &["nav"]);
    assert_selects(&doc, "li:has(~ .active)", &["a"]);
    assert_selects(&doc, "#content > :has(~ span)", &["h", "p1", "p2"]);
    assert_selects(&doc, "li:has(+ li:not(.item))", &[]);
    assert_selects(&doc, "div:has(> ul):has(~ div)", &["nav"]);
}

#[test]
fn test_sibling_led_query_with_positional_stage() {
    let mut doc = Document::new();
    let root = doc.root();
    let section = doc.append_element(root, "section", &[]);
    let div = doc.append_element(root, "div", &[]);
    let p = doc.append_element(div, "p", &[]);
    let aside = doc.append_element(root, "aside", &[]);

    let mut engine = SelectorEngine::new().unwrap();
    assert_eq!(engine.select(&doc, "+ div p", section).unwrap(), vec![p]);
    assert_eq!(engine.select(&doc, "+ div:first p", section).unwrap(), vec![p]);
    assert_eq!(engine.select(&doc, "~ div:last > p", section).unwrap(), vec![p]);
    assert_eq!(engine.select(&doc, "~ *:eq(1)", section).unwrap(), vec![aside]);
    assert!(engine.select(&doc, "+ aside:first p", section).unwrap().is_empty());
}

#[test]
fn test_groups_are_merged_in_document_order() {
    let doc = page();
    assert_selects(&doc, "h1, #list li:first, p.lead", &["a", "h", "p1", "p3"]);
    assert_selects(&doc, "li, .item, #b", &["a", "b", "c", "d", "e"]);
    assert_selects(&doc, "p:last, li:first", &["a", "p3"]);
}

#[test]
fn test_context_scoping() {
    let doc = page();
    let content = doc.element_by_id("content").unwrap();
    let list = doc.element_by_id("list").unwrap();
    let mut engine = SelectorEngine::new().unwrap();

    let found = engine.select(&doc, "p", content).unwrap();
    assert_eq!(ids(&doc, &found), ["p1", "p2", "p3"]);

    let found = engine.select(&doc, "> li:first", list).unwrap();
    assert_eq!(ids(&doc, &found), ["a"]);

    let found = engine.select(&doc, "#content", list).unwrap();
    assert!(found.is_empty());

    let found = engine.select(&doc, "div p", content).unwrap();
    assert_eq!(ids(&doc, &found), ["p1", "p2", "p3"], "ancestors outside the context count");
}

#[test]
fn test_css_escapes() {
    let mut doc = Document::new();
    let root = doc.root();
    let digits = doc.append_element(root, "p", &[("id", "123")]);
    let dotted = doc.append_element(root, "p", &[("class", "a.b")]);

    let mut engine = SelectorEngine::new().unwrap();
    assert_eq!(engine.select(&doc, r"#\31 23", root).unwrap(), vec![digits]);
    assert_eq!(engine.select(&doc, r".a\.b", root).unwrap(), vec![dotted]);
    assert_eq!(engine.select(&doc, r"p[class=a\.b]", root).unwrap(), vec![dotted]);
}

#[test]
fn test_xml_documents_are_case_sensitive() {
    let mut doc = Document::new_xml();
    let root = doc.root();
    let upper = doc.append_element(root, "Item", &[("Kind", "x")]);
    let lower = doc.append_element(root, "item", &[("kind", "y")]);

    let mut engine = SelectorEngine::new().unwrap();
    assert_eq!(engine.select(&doc, "Item", root).unwrap(), vec![upper]);
    assert_eq!(engine.select(&doc, "item", root).unwrap(), vec![lower]);
    assert_eq!(engine.select(&doc, "[Kind]", root).unwrap(), vec![upper]);
    assert_eq!(engine.select(&doc, "item:first-of-type", root).unwrap(), vec![lower]);
}

#[test]
fn test_grammar_errors() {
    let doc = page();
    let mut engine = SelectorEngine::new().unwrap();
    let root = doc.root();

    assert!(matches!(engine.select(&doc, "div >", root), Err(SelectorError::Syntax(_))));
    assert!(matches!(engine.select(&doc, "a,,b", root), Err(SelectorError::Syntax(_))));
    assert!(matches!(engine.select(&doc, "", root), Err(SelectorError::Syntax(_))));
    assert!(matches!(
        engine.select(&doc, "li:nth-child", root),
        Err(SelectorError::NthArgument(_))
    ));
    assert!(matches!(
        engine.select(&doc, "p:hover", root),
        Err(SelectorError::UnsupportedPseudo(name)) if name == "hover"
    ));
    assert!(matches!(
        engine.select(&doc, "p:lang(en us)", root),
        Err(SelectorError::UnsupportedLang(_))
    ));
    assert!(matches!(engine.select(&doc, "li:eq(x)", root), Err(SelectorError::Syntax(_))));
}
