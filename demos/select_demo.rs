//! Selector engine demo.
//!
//! Loads a YAML document (or a built-in page), runs a few queries, and prints what each
//! query selected and how the engine answered it.
//!
//! ```text
//! cargo run --example select_demo -- [document.yaml] [query ...]
//! RUST_LOG=selector_engine=debug cargo run --example select_demo
//! ```

use anyhow::Context;
use selector_engine::dom::{Document, NodeId};
use selector_engine::{SelectorEngine, Tree};
use tracing_subscriber::EnvFilter;

const SAMPLE: &str = r#"
- tag: html
  children:
    - tag: body
      children:
        - tag: ul
          id: menu
          children:
            - { tag: li, class: item, text: Home }
            - { tag: li, class: item active, text: Docs }
            - { tag: li, class: item, text: Blog }
        - tag: div
          id: main
          attrs: { lang: en }
          children:
            - { tag: h1, text: Welcome }
            - { tag: p, class: lead, text: Compiled selectors over any tree }
            - { tag: p, text: Cached by selector text }
            - tag: form
              children:
                - { tag: input, attrs: { type: checkbox, checked: "" } }
                - { tag: input, attrs: { type: text, disabled: "" } }
"#;

const DEFAULT_QUERIES: &[&str] = &[
    "#menu > li.active",
    "li:nth-child(odd)",
    "#main p:first",
    "p:contains(Cached)",
    "div:has(form) > h1, :checked",
    ":input:disabled",
    ":lang(en) .lead",
];

fn describe(doc: &Document, node: NodeId) -> String {
    let name = doc.local_name(node).unwrap_or("?");
    let mut out = name.to_string();
    if let Some(id) = doc.attribute(node, "id") {
        out.push('#');
        out.push_str(id);
    }
    if let Some(class) = doc.attribute(node, "class") {
        for c in class.split_ascii_whitespace() {
            out.push('.');
            out.push_str(c);
        }
    }
    let text = doc.text_content(node);
    if !text.is_empty() {
        out.push_str(&format!(" \"{text}\""));
    }
    out
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let from_file = args
        .first()
        .is_some_and(|path| path.ends_with(".yaml") || path.ends_with(".yml"));
    let doc = if from_file {
        let path = args.remove(0);
        let yaml = std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
        Document::from_yaml_str(&yaml).with_context(|| format!("parsing {path}"))?
    } else {
        Document::from_yaml_str(SAMPLE)?
    };
    let queries = if args.is_empty() {
        DEFAULT_QUERIES.iter().map(|q| q.to_string()).collect()
    } else {
        args
    };

    println!("Selector Engine Demo");
    println!("====================\n");

    let mut engine = SelectorEngine::new()?;
    for query in &queries {
        match engine.select(&doc, query, doc.root()) {
            Ok(found) => {
                println!("{query}  ({} found)", found.len());
                for node in found {
                    println!("    {}", describe(&doc, node));
                }
            }
            Err(err) => println!("{query}  error: {err}"),
        }
    }

    println!("\nQuery stats: {}", serde_json::to_string(&engine.query_stats())?);
    let caches = engine.cache_stats();
    println!(
        "Compiled cache: {} hits / {} lookups",
        caches.compiled.hits, caches.compiled.lookups
    );
    Ok(())
}
