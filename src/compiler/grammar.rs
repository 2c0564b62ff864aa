//! Selector grammar tables.
//!
//! Every token kind is recognised by one anchored regular expression applied to the
//! unconsumed remainder of the selector. The tables are built once per engine.

use crate::error::Result;
use regex::Regex;

/// CSS whitespace.
pub(crate) const WHITESPACE: &str = r"[\x20\t\r\n\f]";

/// CSS identifier: escapes, ASCII word characters, hyphen, or any non-ASCII character.
pub(crate) const IDENTIFIER: &str =
    r"(?:\\[0-9a-fA-F]{1,6}[\x20\t\r\n\f]?|\\[^\r\n\f]|[A-Za-z0-9_-]|[^\x00-\x7F])+";

/// Compiled grammar tables.
#[derive(Debug, Clone)]
pub struct Grammar {
    pub(crate) comma: Regex,
    pub(crate) combinator: Regex,
    pub(crate) id: Regex,
    pub(crate) class: Regex,
    pub(crate) tag: Regex,
    pub(crate) attr: Regex,
    pub(crate) child: Regex,
    pub(crate) pseudo: Regex,
    /// Unanchored pseudo pattern used to detect nested pseudo arguments.
    pub(crate) pseudo_anywhere: Regex,
    /// Whole-string identifier check.
    pub(crate) identifier: Regex,
    /// Bare `#id`, `tag` or `.class` queries.
    pub(crate) quick: Regex,
    /// CSS escape sequences.
    pub(crate) escape: Regex,
}

fn attributes() -> String {
    format!(
        concat!(
            r"\[{ws}*({ident})(?:{ws}*([*^$|!~]?=){ws}*",
            r#"(?:'((?:\\.|[^\\'])*)'|"((?:\\.|[^\\"])*)"|({ident}))|){ws}*\]"#
        ),
        ws = WHITESPACE,
        ident = IDENTIFIER
    )
}

fn pseudos() -> String {
    format!(
        concat!(
            r":(?P<name>{ident})(?:\((?P<arg>",
            r#"(?P<quoted>'(?P<single>(?:\\.|[^\\'])*)'|"(?P<double>(?:\\.|[^\\"])*)")|"#,
            r"(?P<simple>(?:\\.|[^\\()\[\]]|{attrs})*)|",
            r".*",
            r")\)|)"
        ),
        ident = IDENTIFIER,
        attrs = attributes()
    )
}

fn structural() -> String {
    format!(
        concat!(
            r"(?i):(only|first|last|nth|nth-last)-(child|of-type)",
            r"(?:\({ws}*(even|odd|(([+-]|)(\d*)n|){ws}*(?:([+-]|){ws}*(\d+)|)){ws}*\)|)"
        ),
        ws = WHITESPACE
    )
}

impl Grammar {
    /// Build every table.
    pub fn new() -> Result<Self> {
        let ws = WHITESPACE;
        let ident = IDENTIFIER;

        Ok(Self {
            comma: Regex::new(&format!(r"^{ws}*,{ws}*"))?,
            combinator: Regex::new(&format!(r"^{ws}*([>+~]|{ws}){ws}*"))?,
            id: Regex::new(&format!(r"^#({ident})"))?,
            class: Regex::new(&format!(r"^\.({ident})"))?,
            tag: Regex::new(&format!(r"^({ident}|[*])"))?,
            attr: Regex::new(&format!("^{}", attributes()))?,
            child: Regex::new(&format!("^{}", structural()))?,
            pseudo: Regex::new(&format!("^{}", pseudos()))?,
            pseudo_anywhere: Regex::new(&pseudos())?,
            identifier: Regex::new(&format!("^{ident}$"))?,
            quick: Regex::new(r"^(?:#([A-Za-z0-9_-]+)|([A-Za-z0-9_-]+)|\.([A-Za-z0-9_-]+))$")?,
            escape: Regex::new(&format!(r"\\([0-9a-fA-F]{{1,6}}{ws}?|[^\r\n\f])"))?,
        })
    }
}

/// Whether `c` can continue an identifier.
pub(crate) fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '\\' || !c.is_ascii()
}
