//! Token preprocessors.
//!
//! Each function turns the raw captures of one grammar table into the canonical
//! [`TokenValue`](super::parser::TokenValue) payload the filter factories consume.

use super::grammar::Grammar;
use super::parser::{self, AttrOperator, AttrSelector, Position, PseudoSelector, StructuralPosition};
use crate::error::{Result, SelectorError};
use regex::Captures;
use std::borrow::Cow;

/// Resolve CSS escapes (`\31 `, `\.`).
///
/// Hex escapes naming an invalid or null code point become U+FFFD.
pub fn unescape<'a>(grammar: &Grammar, text: &'a str) -> Cow<'a, str> {
    if !text.contains('\\') {
        return Cow::Borrowed(text);
    }
    grammar.escape.replace_all(text, |caps: &Captures<'_>| {
        let escaped = &caps[1];
        let hex = escaped.trim_end_matches(|c: char| c.is_ascii_whitespace());
        if !hex.is_empty() && hex.chars().all(|c| c.is_ascii_hexdigit()) {
            let code = u32::from_str_radix(hex, 16).unwrap_or(0);
            let c = match code {
                0 => char::REPLACEMENT_CHARACTER,
                _ => char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER),
            };
            c.to_string()
        } else {
            escaped.to_string()
        }
    })
}

/// Attribute captures: unescape the name and fold the three value spellings into one.
pub(crate) fn attribute(grammar: &Grammar, caps: &Captures<'_>) -> Result<AttrSelector> {
    let name = unescape(grammar, &caps[1]).into_owned();
    let operator = match caps.get(2) {
        Some(op) => Some(
            AttrOperator::parse(op.as_str())
                .ok_or_else(|| SelectorError::Syntax(caps[0].to_string()))?,
        ),
        None => None,
    };

    let raw_value = caps
        .get(3)
        .or_else(|| caps.get(4))
        .or_else(|| caps.get(5))
        .map_or("", |m| m.as_str());
    let mut value = unescape(grammar, raw_value).into_owned();
    if operator == Some(AttrOperator::Includes) {
        value = format!(" {value} ");
    }

    Ok(AttrSelector {
        name,
        operator,
        value,
    })
}

/// Structural captures: resolve `an+b`, `even` and `odd` into coefficients.
pub(crate) fn structural(caps: &Captures<'_>) -> Result<StructuralPosition> {
    let raw = &caps[0];
    let position = match caps[1].to_ascii_lowercase().as_str() {
        "first" => Position::First,
        "last" => Position::Last,
        "only" => Position::Only,
        "nth" => Position::Nth,
        _ => Position::NthLast,
    };
    let of_type = caps[2].eq_ignore_ascii_case("of-type");
    let argument = caps.get(3).map(|m| m.as_str().to_ascii_lowercase());

    if !matches!(position, Position::Nth | Position::NthLast) {
        if argument.is_some() {
            return Err(SelectorError::Syntax(raw.to_string()));
        }
        return Ok(StructuralPosition {
            position,
            of_type,
            a: 0,
            b: 0,
        });
    }

    let Some(argument) = argument else {
        return Err(SelectorError::NthArgument(raw.to_string()));
    };

    let a = match caps.get(4).map(|m| m.as_str()).filter(|s| !s.is_empty()) {
        Some(_) => {
            let sign = caps.get(5).map_or("", |m| m.as_str());
            let digits = caps.get(6).map_or("", |m| m.as_str());
            let magnitude = if digits.is_empty() { 1 } else { parse_number(digits, raw)? };
            if sign == "-" {
                -magnitude
            } else {
                magnitude
            }
        }
        None if argument == "even" || argument == "odd" => 2,
        None => 0,
    };

    let b = match caps.get(8) {
        Some(digits) => {
            let magnitude = parse_number(digits.as_str(), raw)?;
            if caps.get(7).map(|m| m.as_str()) == Some("-") {
                -magnitude
            } else {
                magnitude
            }
        }
        None if argument == "odd" => 1,
        None => 0,
    };

    Ok(StructuralPosition {
        position,
        of_type,
        a,
        b,
    })
}

fn parse_number(digits: &str, raw: &str) -> Result<i64> {
    digits
        .parse()
        .map_err(|_| SelectorError::Syntax(raw.to_string()))
}

/// Pseudo captures: returns the (possibly shortened) raw text and the canonical value.
///
/// An unquoted argument that itself contains pseudo-classes was matched greedily up to the
/// last `)` of the remaining text. Probing the argument tells where the nested selector
/// really ends, and the token is cut at the `)` that closes it.
pub(crate) fn pseudo(grammar: &Grammar, caps: &Captures<'_>) -> (String, PseudoSelector) {
    let mut raw = caps[0].to_string();
    let name = unescape(grammar, &caps["name"]).to_ascii_lowercase();

    let quoted = caps.name("quoted").is_some();
    let mut argument = if quoted {
        caps.name("single")
            .or_else(|| caps.name("double"))
            .map(|m| m.as_str().to_string())
    } else {
        caps.name("arg").map(|m| m.as_str().to_string())
    };

    let greedy = !quoted && caps.name("simple").is_none();
    if let (true, Some(unquoted)) = (greedy, caps.name("arg").map(|m| m.as_str())) {
        if grammar.pseudo_anywhere.is_match(unquoted) {
            let excess = parser::probe(grammar, unquoted);
            if excess > 0 {
                let start = unquoted.len() - excess;
                if let Some(offset) = unquoted[start..].find(')') {
                    let cut_at = start + offset;
                    let cut = unquoted.len() - cut_at;
                    raw.truncate(raw.len() - cut);
                    argument = Some(unquoted[..cut_at].to_string());
                }
            }
        }
    }

    (
        raw,
        PseudoSelector {
            name,
            argument,
            quoted,
        },
    )
}
