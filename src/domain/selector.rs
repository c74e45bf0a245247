//! A small CSS-like selector subset for locating label-like and container
//! elements.
//!
//! Supported: type (`td`, `*`), `#id`, `.class`, `[attr]`, `[attr="v"]`,
//! `[attr*="v"]`, `[attr^="v"]`, compound forms, descendant combinators
//! (whitespace) and comma-separated lists.

use thiserror::Error;

use super::document::{Document, Element, NodeId};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectorError {
    #[error("Empty selector")]
    Empty,

    #[error("Malformed selector '{selector}': {reason}")]
    Malformed { selector: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum AttrOp {
    Exists,
    Equals(String),
    Contains(String),
    Prefix(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttrFilter {
    name: String,
    op: AttrOp,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrFilter>,
}

/// A chain of compounds joined by descendant combinators
#[derive(Debug, Clone, PartialEq, Eq)]
struct Complex {
    parts: Vec<Compound>,
}

/// A parsed, comma-separated selector list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    source: String,
    alternatives: Vec<Complex>,
}

impl Selector {
    pub fn parse(source: &str) -> Result<Self, SelectorError> {
        let trimmed = source.trim();
        if trimmed.is_empty() {
            return Err(SelectorError::Empty);
        }

        let mut alternatives = Vec::new();
        for alt in split_top_level(trimmed) {
            let alt = alt.trim();
            if alt.is_empty() {
                return Err(malformed(source, "empty alternative"));
            }
            let mut parts = Vec::new();
            for word in split_whitespace_outside_brackets(alt) {
                parts.push(parse_compound(source, &word)?);
            }
            alternatives.push(Complex { parts });
        }

        Ok(Self {
            source: source.to_string(),
            alternatives,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Whether the element `id` matches any alternative
    pub fn matches(&self, doc: &Document, id: NodeId) -> bool {
        self.alternatives.iter().any(|alt| alt.matches(doc, id))
    }

    /// Matching elements under `root` (excluding `root`) in document order
    pub fn query_all(&self, doc: &Document, root: NodeId) -> Vec<NodeId> {
        doc.elements_under(root)
            .into_iter()
            .filter(|id| self.matches(doc, *id))
            .collect()
    }

    /// First matching element under `root`
    pub fn query(&self, doc: &Document, root: NodeId) -> Option<NodeId> {
        doc.elements_under(root)
            .into_iter()
            .find(|id| self.matches(doc, *id))
    }
}

impl Complex {
    fn matches(&self, doc: &Document, id: NodeId) -> bool {
        let Some((last, ancestors)) = self.parts.split_last() else {
            return false;
        };
        let Some(el) = doc.element(id) else {
            return false;
        };
        if !last.matches(el) {
            return false;
        }

        // Walk up, satisfying the remaining compounds right to left
        let mut remaining = ancestors.iter().rev().peekable();
        let mut current = doc.parent(id);
        while let Some(wanted) = remaining.peek() {
            let Some(node) = current else {
                return false;
            };
            if doc.element(node).is_some_and(|e| wanted.matches(e)) {
                remaining.next();
            }
            current = doc.parent(node);
        }
        true
    }
}

impl Compound {
    fn matches(&self, el: &Element) -> bool {
        if let Some(tag) = &self.tag {
            if tag != "*" && !tag.eq_ignore_ascii_case(&el.tag) {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if el.id.as_deref() != Some(id.as_str()) {
                return false;
            }
        }
        if !self
            .classes
            .iter()
            .all(|c| el.classes.iter().any(|have| have == c))
        {
            return false;
        }
        self.attrs.iter().all(|f| f.matches(el))
    }
}

impl AttrFilter {
    fn matches(&self, el: &Element) -> bool {
        let value = match self.name.as_str() {
            "class" if !el.classes.is_empty() => Some(el.classes.join(" ")),
            "id" => el.id.clone(),
            name => el.attrs.get(name).cloned(),
        };
        let Some(value) = value else {
            return false;
        };
        match &self.op {
            AttrOp::Exists => true,
            AttrOp::Equals(v) => &value == v,
            AttrOp::Contains(v) => value.contains(v.as_str()),
            AttrOp::Prefix(v) => value.starts_with(v.as_str()),
        }
    }
}

fn malformed(selector: &str, reason: &str) -> SelectorError {
    SelectorError::Malformed {
        selector: selector.to_string(),
        reason: reason.to_string(),
    }
}

/// Split on commas that are not inside `[...]`
fn split_top_level(s: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut depth = 0i32;
    let mut current = String::new();
    for c in s.chars() {
        match c {
            '[' => depth += 1,
            ']' => depth -= 1,
            ',' if depth == 0 => {
                out.push(std::mem::take(&mut current));
                continue;
            }
            _ => {}
        }
        current.push(c);
    }
    out.push(current);
    out
}

fn split_whitespace_outside_brackets(s: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut depth = 0i32;
    let mut current = String::new();
    for c in s.chars() {
        match c {
            '[' => depth += 1,
            ']' => depth -= 1,
            c if c.is_whitespace() && depth == 0 => {
                if !current.is_empty() {
                    out.push(std::mem::take(&mut current));
                }
                continue;
            }
            _ => {}
        }
        current.push(c);
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

fn parse_compound(source: &str, word: &str) -> Result<Compound, SelectorError> {
    let chars: Vec<char> = word.chars().collect();
    let mut compound = Compound::default();
    let mut i = 0;

    let read_ident = |i: &mut usize| -> String {
        let start = *i;
        while *i < chars.len() && is_ident_char(chars[*i]) {
            *i += 1;
        }
        chars[start..*i].iter().collect()
    };

    if i < chars.len() && (chars[i] == '*' || is_ident_char(chars[i])) {
        if chars[i] == '*' {
            compound.tag = Some("*".to_string());
            i += 1;
        } else {
            compound.tag = Some(read_ident(&mut i).to_ascii_lowercase());
        }
    }

    while i < chars.len() {
        match chars[i] {
            '#' => {
                i += 1;
                let ident = read_ident(&mut i);
                if ident.is_empty() {
                    return Err(malformed(source, "empty id"));
                }
                compound.id = Some(ident);
            }
            '.' => {
                i += 1;
                let ident = read_ident(&mut i);
                if ident.is_empty() {
                    return Err(malformed(source, "empty class"));
                }
                compound.classes.push(ident);
            }
            '[' => {
                let close = chars[i..]
                    .iter()
                    .position(|c| *c == ']')
                    .map(|p| p + i)
                    .ok_or_else(|| malformed(source, "unterminated attribute filter"))?;
                let inner: String = chars[i + 1..close].iter().collect();
                compound.attrs.push(parse_attr(source, &inner)?);
                i = close + 1;
            }
            other => {
                return Err(malformed(source, &format!("unexpected '{}'", other)));
            }
        }
    }

    Ok(compound)
}

fn parse_attr(source: &str, inner: &str) -> Result<AttrFilter, SelectorError> {
    let unquote = |v: &str| -> String {
        let v = v.trim();
        v.trim_matches(|c| c == '"' || c == '\'').to_string()
    };

    let (name, op) = if let Some((name, value)) = inner.split_once("*=") {
        (name, AttrOp::Contains(unquote(value)))
    } else if let Some((name, value)) = inner.split_once("^=") {
        (name, AttrOp::Prefix(unquote(value)))
    } else if let Some((name, value)) = inner.split_once('=') {
        (name, AttrOp::Equals(unquote(value)))
    } else {
        (inner, AttrOp::Exists)
    };

    let name = name.trim();
    if name.is_empty() || !name.chars().all(is_ident_char) {
        return Err(malformed(source, "bad attribute name"));
    }

    Ok(AttrFilter {
        name: name.to_string(),
        op,
    })
}
