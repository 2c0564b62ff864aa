//! Selector tokenization.
//!
//! This module turns selector text into a [`SelectorGroup`]: one [`TokenSequence`] per
//! comma-separated clause. Each token keeps the exact text it was matched from, so the raws
//! of a sequence concatenate back to its source.

use super::grammar::{self, Grammar};
use super::preprocess;
use crate::error::{Result, SelectorError};
use crate::matcher::combinator::Combinator;
use std::fmt;

/// Token kinds, in the order the filter grammars are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Tag,
    Id,
    Class,
    Attr,
    /// Structural position pseudo-classes (`:first-child`, `:nth-of-type(2n)`, ...)
    Child,
    Pseudo,
    Combinator,
}

impl TokenKind {
    const FILTERS: [TokenKind; 6] = [
        TokenKind::Tag,
        TokenKind::Id,
        TokenKind::Class,
        TokenKind::Attr,
        TokenKind::Child,
        TokenKind::Pseudo,
    ];
}

/// Attribute comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttrOperator {
    /// `=`
    Equals,
    /// `!=`
    NotEquals,
    /// `^=`
    Prefix,
    /// `$=`
    Suffix,
    /// `*=`
    Substring,
    /// `~=`
    Includes,
    /// `|=`
    DashMatch,
}

impl AttrOperator {
    pub(crate) fn parse(op: &str) -> Option<Self> {
        match op {
            "=" => Some(AttrOperator::Equals),
            "!=" => Some(AttrOperator::NotEquals),
            "^=" => Some(AttrOperator::Prefix),
            "$=" => Some(AttrOperator::Suffix),
            "*=" => Some(AttrOperator::Substring),
            "~=" => Some(AttrOperator::Includes),
            "|=" => Some(AttrOperator::DashMatch),
            _ => None,
        }
    }
}

/// `[name op value]` after unescaping.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttrSelector {
    pub name: String,
    pub operator: Option<AttrOperator>,
    /// Check value; padded with spaces for `~=`.
    pub value: String,
}

/// Which sibling the structural pseudo counts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Position {
    First,
    Last,
    Only,
    Nth,
    NthLast,
}

/// A structural position pseudo-class.
///
/// `nth` variants carry the `an+b` coefficients; the simple variants leave them at zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StructuralPosition {
    pub position: Position,
    pub of_type: bool,
    pub a: i64,
    pub b: i64,
}

impl StructuralPosition {
    /// Whether a 1-based rank satisfies `an+b`.
    pub fn accepts(&self, rank: i64) -> bool {
        // Widened so extreme coefficients cannot overflow.
        let diff = i128::from(rank) - i128::from(self.b);
        let a = i128::from(self.a);
        if a == 0 {
            diff == 0
        } else {
            diff % a == 0 && diff / a >= 0
        }
    }

    /// Counting from the end of the sibling list.
    pub fn from_end(&self) -> bool {
        matches!(self.position, Position::Last | Position::NthLast)
    }
}

/// A pseudo-class name with its optional argument.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PseudoSelector {
    /// Lowercase, unescaped name
    pub name: String,
    /// Argument without surrounding quotes; escapes are left for the handler
    pub argument: Option<String>,
    pub quoted: bool,
}

/// Canonical token captures.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TokenValue {
    /// Unescaped tag name, or `*`
    Tag(String),
    Id(String),
    Class(String),
    Attr(AttrSelector),
    Child(StructuralPosition),
    Pseudo(PseudoSelector),
    Combinator(Combinator),
}

/// One matched piece of selector text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Token {
    pub kind: TokenKind,
    /// Exact source text of the token
    pub raw: String,
    pub value: TokenValue,
}

impl Token {
    pub fn combinator(&self) -> Option<Combinator> {
        match self.value {
            TokenValue::Combinator(c) => Some(c),
            _ => None,
        }
    }
}

/// Tokens of one comma-free clause.
pub type TokenSequence = Vec<Token>;

/// A parsed selector: one sequence per comma-separated clause.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SelectorGroup {
    pub source: String,
    pub sequences: Vec<TokenSequence>,
}

impl SelectorGroup {
    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }
}

impl fmt::Display for SelectorGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, sequence) in self.sequences.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(&sequence_text(sequence))?;
        }
        Ok(())
    }
}

/// Source text of a sequence.
pub fn sequence_text(sequence: &[Token]) -> String {
    sequence.iter().map(|t| t.raw.as_str()).collect()
}

/// Strip leading whitespace and trailing unescaped whitespace.
pub(crate) fn trim_selector(text: &str) -> &str {
    let is_ws = is_css_whitespace;
    let text = text.trim_start_matches(is_ws);
    let mut end = text.len();
    while let Some(c) = text[..end].chars().next_back() {
        if !is_ws(c) {
            break;
        }
        let before = &text[..end - c.len_utf8()];
        let backslashes = before.bytes().rev().take_while(|&b| b == b'\\').count();
        if backslashes % 2 == 1 {
            break;
        }
        end -= c.len_utf8();
    }
    &text[..end]
}

/// Result of scanning as much of a selector as the grammar accepts.
struct Scan {
    sequences: Vec<TokenSequence>,
    remaining: usize,
}

fn scan(grammar: &Grammar, text: &str, probe: bool) -> Result<Scan> {
    let mut sequences: Vec<TokenSequence> = Vec::new();
    let mut rest = text;

    while !rest.is_empty() {
        if sequences.is_empty() {
            sequences.push(Vec::new());
        } else if let Some(m) = grammar.comma.find(rest) {
            // A trailing comma stays unconsumed and is reported as leftover.
            if m.end() == rest.len() {
                break;
            }
            rest = &rest[m.end()..];
            sequences.push(Vec::new());
        }
        let mut matched = false;
        if let Some(caps) = grammar.combinator.captures(rest) {
            let whole = caps.get(0).map_or("", |m| m.as_str());
            let symbol = caps.get(1).map_or(" ", |m| m.as_str());
            rest = &rest[whole.len()..];
            push_token(
                &mut sequences,
                Token {
                    kind: TokenKind::Combinator,
                    raw: whole.to_string(),
                    value: TokenValue::Combinator(Combinator::from_symbol(symbol)),
                },
            );
            matched = true;
        }

        for kind in TokenKind::FILTERS {
            let token = match match_filter(grammar, kind, rest) {
                Ok(token) => token,
                Err(_) if probe => {
                    return Ok(Scan {
                        sequences,
                        remaining: rest.len(),
                    })
                }
                Err(err) => return Err(err),
            };
            if let Some(token) = token {
                rest = &rest[token.raw.len()..];
                push_token(&mut sequences, token);
                matched = true;
            }
        }

        if !matched {
            break;
        }
    }

    Ok(Scan {
        sequences,
        remaining: rest.len(),
    })
}

fn push_token(sequences: &mut [TokenSequence], token: Token) {
    if let Some(tokens) = sequences.last_mut() {
        tokens.push(token);
    }
}

fn match_filter(grammar: &Grammar, kind: TokenKind, rest: &str) -> Result<Option<Token>> {
    let token = match kind {
        TokenKind::Tag => grammar.tag.captures(rest).map(|caps| Token {
            kind,
            raw: caps[0].to_string(),
            value: TokenValue::Tag(preprocess::unescape(grammar, &caps[1]).into_owned()),
        }),
        TokenKind::Id => grammar.id.captures(rest).map(|caps| Token {
            kind,
            raw: caps[0].to_string(),
            value: TokenValue::Id(preprocess::unescape(grammar, &caps[1]).into_owned()),
        }),
        TokenKind::Class => grammar.class.captures(rest).map(|caps| Token {
            kind,
            raw: caps[0].to_string(),
            value: TokenValue::Class(preprocess::unescape(grammar, &caps[1]).into_owned()),
        }),
        TokenKind::Attr => match grammar.attr.captures(rest) {
            Some(caps) => Some(Token {
                kind,
                raw: caps[0].to_string(),
                value: TokenValue::Attr(preprocess::attribute(grammar, &caps)?),
            }),
            None => None,
        },
        TokenKind::Child => match structural_match(grammar, rest) {
            Some(caps) => Some(Token {
                kind,
                raw: caps[0].to_string(),
                value: TokenValue::Child(preprocess::structural(&caps)?),
            }),
            None => None,
        },
        TokenKind::Pseudo => {
            if structural_match(grammar, rest).is_some() {
                return Ok(None);
            }
            grammar
                .pseudo
                .captures(rest)
                .map(|caps| preprocess::pseudo(grammar, &caps))
                .map(|(raw, pseudo)| Token {
                    kind,
                    raw,
                    value: TokenValue::Pseudo(pseudo),
                })
        }
        TokenKind::Combinator => None,
    };
    Ok(token)
}

/// Structural pseudo match that is not the prefix of a longer pseudo name.
fn structural_match<'t>(grammar: &Grammar, rest: &'t str) -> Option<regex::Captures<'t>> {
    let caps = grammar.child.captures(rest)?;
    let end = caps.get(0).map_or(0, |m| m.end());
    match rest[end..].chars().next() {
        Some(c) if grammar::is_identifier_char(c) => None,
        _ => Some(caps),
    }
}

/// Tokenize a full selector, failing on any leftover text.
pub fn tokenize(grammar: &Grammar, text: &str) -> Result<SelectorGroup> {
    let trimmed = trim_selector(text);
    if trimmed.is_empty() {
        return Err(SelectorError::Syntax(text.to_string()));
    }

    let scan = scan(grammar, trimmed, false)?;
    if scan.remaining > 0 {
        let leftover = &trimmed[trimmed.len() - scan.remaining..];
        return Err(SelectorError::Syntax(leftover.to_string()));
    }

    for sequence in &scan.sequences {
        validate_sequence(sequence)?;
    }

    Ok(SelectorGroup {
        source: trimmed.to_string(),
        sequences: scan.sequences,
    })
}

/// Length of the text the tokenizer cannot consume; never fails.
pub fn probe(grammar: &Grammar, text: &str) -> usize {
    match scan(grammar, text, true) {
        Ok(scan) => scan.remaining,
        Err(_) => text.len(),
    }
}

/// Reject empty clauses, doubled combinators and trailing combinators.
fn validate_sequence(sequence: &[Token]) -> Result<()> {
    let Some(last) = sequence.last() else {
        return Err(SelectorError::Syntax(",".to_string()));
    };
    if last.kind == TokenKind::Combinator {
        return Err(SelectorError::Syntax(last.raw.trim_matches(is_css_whitespace).to_string()));
    }
    for pair in sequence.windows(2) {
        if pair[0].kind == TokenKind::Combinator && pair[1].kind == TokenKind::Combinator {
            return Err(SelectorError::Syntax(format!("{}{}", pair[0].raw, pair[1].raw)));
        }
    }
    Ok(())
}

fn is_css_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n' | '\x0C')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grammar() -> Grammar {
        Grammar::new().unwrap()
    }

    fn kinds(sequence: &[Token]) -> Vec<TokenKind> {
        sequence.iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_compound_and_combinators() {
        let g = grammar();
        let group = tokenize(&g, "div#main.item > a[href^='http']:first-child").unwrap();

        assert_eq!(group.len(), 1);
        let seq = &group.sequences[0];
        assert_eq!(
            kinds(seq),
            vec![
                TokenKind::Tag,
                TokenKind::Id,
                TokenKind::Class,
                TokenKind::Combinator,
                TokenKind::Tag,
                TokenKind::Attr,
                TokenKind::Child,
            ]
        );
        assert_eq!(seq[3].combinator(), Some(Combinator::Child));
        assert_eq!(sequence_text(seq), "div#main.item > a[href^='http']:first-child");
    }

    #[test]
    fn test_comma_groups() {
        let g = grammar();
        let group = tokenize(&g, "  p ,  span.x  ").unwrap();

        assert_eq!(group.len(), 2);
        assert_eq!(group.source, "p ,  span.x");
        assert_eq!(group.to_string(), "p, span.x");
    }

    #[test]
    fn test_descendant_whitespace() {
        let g = grammar();
        let group = tokenize(&g, "ul \n li").unwrap();
        let seq = &group.sequences[0];
        assert_eq!(seq[1].combinator(), Some(Combinator::Descendant));
        assert_eq!(seq[1].raw, " \n ");
    }

    #[test]
    fn test_leading_combinator() {
        let g = grammar();
        let group = tokenize(&g, "> p + span").unwrap();
        let seq = &group.sequences[0];
        assert_eq!(seq[0].combinator(), Some(Combinator::Child));
        assert_eq!(seq[2].combinator(), Some(Combinator::Adjacent));
    }

    #[test]
    fn test_leftover_is_syntax_error() {
        let g = grammar();
        assert_eq!(
            tokenize(&g, "div $foo"),
            Err(SelectorError::Syntax("$foo".to_string()))
        );
        assert_eq!(tokenize(&g, "a,"), Err(SelectorError::Syntax(",".to_string())));
        assert_eq!(tokenize(&g, ",a"), Err(SelectorError::Syntax(",a".to_string())));
        assert!(matches!(tokenize(&g, "div >"), Err(SelectorError::Syntax(_))));
        assert!(matches!(tokenize(&g, "a > > b"), Err(SelectorError::Syntax(_))));
        assert!(matches!(tokenize(&g, "   "), Err(SelectorError::Syntax(_))));
    }

    #[test]
    fn test_nth_without_argument() {
        let g = grammar();
        assert_eq!(
            tokenize(&g, "li:nth-child"),
            Err(SelectorError::NthArgument(":nth-child".to_string()))
        );
        assert!(matches!(
            tokenize(&g, "li:nth-of-type(foo)"),
            Err(SelectorError::NthArgument(_))
        ));
        assert!(matches!(
            tokenize(&g, "li:first-child(2)"),
            Err(SelectorError::Syntax(_))
        ));
    }

    #[test]
    fn test_child_wins_over_pseudo() {
        let g = grammar();
        let group = tokenize(&g, "li:nth-last-of-type(odd)").unwrap();
        let token = &group.sequences[0][1];
        assert_eq!(token.kind, TokenKind::Child);
        match &token.value {
            TokenValue::Child(pos) => {
                assert_eq!(pos.position, Position::NthLast);
                assert!(pos.of_type);
                assert_eq!((pos.a, pos.b), (2, 1));
            }
            other => panic!("unexpected value {other:?}"),
        }

        // A longer name is an ordinary pseudo.
        let group = tokenize(&g, "li:first-childish").unwrap();
        assert_eq!(group.sequences[0][1].kind, TokenKind::Pseudo);
    }

    #[test]
    fn test_nested_pseudo_argument_is_cut() {
        let g = grammar();
        let group = tokenize(&g, "p:not(:nth-child(2)) > b:not(i)").unwrap();
        let seq = &group.sequences[0];

        assert_eq!(seq[1].raw, ":not(:nth-child(2))");
        match &seq[1].value {
            TokenValue::Pseudo(p) => {
                assert_eq!(p.name, "not");
                assert_eq!(p.argument.as_deref(), Some(":nth-child(2)"));
                assert!(!p.quoted);
            }
            other => panic!("unexpected value {other:?}"),
        }
        assert_eq!(seq[2].combinator(), Some(Combinator::Child));
        assert_eq!(seq.last().map(|t| t.raw.as_str()), Some(":not(i)"));
    }

    #[test]
    fn test_quoted_pseudo_argument() {
        let g = grammar();
        let group = tokenize(&g, r#"p:contains("a) b")"#).unwrap();
        match &group.sequences[0][1].value {
            TokenValue::Pseudo(p) => {
                assert_eq!(p.argument.as_deref(), Some("a) b"));
                assert!(p.quoted);
            }
            other => panic!("unexpected value {other:?}"),
        }
    }

    #[test]
    fn test_escapes() {
        let g = grammar();
        let group = tokenize(&g, r"#\31 23.a\.b").unwrap();
        let seq = &group.sequences[0];
        assert_eq!(seq[0].value, TokenValue::Id("123".to_string()));
        assert_eq!(seq[1].value, TokenValue::Class("a.b".to_string()));
    }

    #[test]
    fn test_probe() {
        let g = grammar();
        assert_eq!(probe(&g, "div > p"), 0);
        assert_eq!(probe(&g, ":nth-child(2)) > b"), ") > b".len());
        assert_eq!(probe(&g, "div $"), 1);
    }

    #[test]
    fn test_trim_keeps_escaped_whitespace() {
        assert_eq!(trim_selector("  a  "), "a");
        assert_eq!(trim_selector(r"a\ "), r"a\ ");
        assert_eq!(trim_selector(r"a\\ "), r"a\\");
    }

    #[test]
    fn test_position_accepts_extreme_coefficients() {
        let nth = |a, b| StructuralPosition {
            position: Position::Nth,
            of_type: false,
            a,
            b,
        };
        assert!(nth(2, 1).accepts(3));
        assert!(!nth(2, 1).accepts(4));
        assert!(nth(-1, 2).accepts(1));
        assert!(!nth(-1, 2).accepts(3));

        assert!(nth(1, -i64::MAX).accepts(1));
        assert!(nth(1, i64::MIN).accepts(7));
        assert!(!nth(0, i64::MIN).accepts(1));
        assert!(!nth(1, i64::MAX).accepts(1));
        assert!(nth(-1, i64::MAX).accepts(1));
        assert!(nth(i64::MAX, 1).accepts(1));
        assert!(!nth(i64::MAX, 1).accepts(2));
        assert!(nth(i64::MIN, 1).accepts(1));
        assert!(!nth(i64::MIN, 2).accepts(1));
    }
}
