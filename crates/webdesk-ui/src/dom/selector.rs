use thiserror::Error;

use super::{Document, NodeId};

#[derive(Debug, Clone, PartialEq, Error)]
#[error("invalid selector {selector:?}: {message}")]
pub struct SelectorError {
    pub selector: String,
    pub message: String,
}

/// A parsed selector list.
///
/// Supports what schemes and runtime code actually use: type and `*`,
/// `.class`, `#id`, `[attr]`, `[attr=value]` with optional quotes, the
/// descendant combinator, and `,` groups.
#[derive(Debug, Clone, PartialEq)]
pub struct Selector {
    groups: Vec<Vec<Compound>>,
}

#[derive(Debug, Clone, PartialEq, Default)]
struct Compound {
    tag: Option<String>,
    classes: Vec<String>,
    attrs: Vec<(String, Option<String>)>,
}

impl Compound {
    fn is_empty(&self) -> bool {
        self.tag.is_none() && self.classes.is_empty() && self.attrs.is_empty()
    }

    fn matches(&self, doc: &Document, node: NodeId) -> bool {
        let Some(tag) = doc.tag(node) else { return false };
        if self.tag.as_deref().is_some_and(|t| t != "*" && t != tag) {
            return false;
        }
        self.classes.iter().all(|c| doc.has_class(node, c))
            && self.attrs.iter().all(|(name, want)| match (doc.attr(node, name), want) {
                (None, _) => false,
                (Some(_), None) => true,
                (Some(v), Some(w)) => v == w,
            })
    }
}

// ── Parsing ───────────────────────────────────────────────────────────────

struct SelectorParser<'s> {
    src: &'s str,
    pos: usize,
}

impl<'s> SelectorParser<'s> {
    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn err(&self, message: impl Into<String>) -> SelectorError {
        SelectorError { selector: self.src.to_string(), message: message.into() }
    }

    fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.advance();
        }
        self.pos > start
    }

    fn ident(&mut self) -> Result<String, SelectorError> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':')) {
            self.advance();
        }
        if self.pos == start {
            return Err(self.err(format!("expected identifier at offset {}", start)));
        }
        Ok(self.src[start..self.pos].to_string())
    }

    fn parse(mut self) -> Result<Selector, SelectorError> {
        let mut groups = Vec::new();
        loop {
            groups.push(self.group()?);
            match self.advance() {
                None => break,
                Some(',') => continue,
                Some(c) => return Err(self.err(format!("unexpected {:?}", c))),
            }
        }
        Ok(Selector { groups })
    }

    fn group(&mut self) -> Result<Vec<Compound>, SelectorError> {
        let mut compounds = Vec::new();
        self.skip_whitespace();
        loop {
            compounds.push(self.compound()?);
            self.skip_whitespace();
            if matches!(self.peek(), None | Some(',')) {
                return Ok(compounds);
            }
        }
    }

    fn compound(&mut self) -> Result<Compound, SelectorError> {
        let mut c = Compound::default();
        if self.peek() == Some('*') {
            self.advance();
            c.tag = Some("*".into());
        } else if matches!(self.peek(), Some(ch) if ch.is_ascii_alphabetic()) {
            c.tag = Some(self.ident()?.to_ascii_lowercase());
        }
        loop {
            match self.peek() {
                Some('.') => {
                    self.advance();
                    c.classes.push(self.ident()?);
                }
                Some('#') => {
                    self.advance();
                    c.attrs.push(("id".into(), Some(self.ident()?)));
                }
                Some('[') => {
                    self.advance();
                    c.attrs.push(self.attr_test()?);
                }
                _ => break,
            }
        }
        if c.is_empty() {
            return Err(self.err(format!("empty compound at offset {}", self.pos)));
        }
        Ok(c)
    }

    fn attr_test(&mut self) -> Result<(String, Option<String>), SelectorError> {
        self.skip_whitespace();
        let name = self.ident()?.to_ascii_lowercase();
        self.skip_whitespace();
        let value = match self.advance() {
            Some(']') => return Ok((name, None)),
            Some('=') => {
                self.skip_whitespace();
                match self.peek() {
                    Some(q @ ('"' | '\'')) => {
                        self.advance();
                        let start = self.pos;
                        loop {
                            match self.advance() {
                                None => return Err(self.err("unterminated attribute value")),
                                Some(ch) if ch == q => break,
                                Some(_) => {}
                            }
                        }
                        self.src[start..self.pos - 1].to_string()
                    }
                    _ => {
                        let start = self.pos;
                        while matches!(self.peek(), Some(ch) if ch != ']' && !ch.is_whitespace()) {
                            self.advance();
                        }
                        self.src[start..self.pos].to_string()
                    }
                }
            }
            _ => return Err(self.err("expected `]` or `=` in attribute test")),
        };
        self.skip_whitespace();
        if self.advance() != Some(']') {
            return Err(self.err("expected `]`"));
        }
        Ok((name, Some(value)))
    }
}

impl Selector {
    pub fn parse(src: &str) -> Result<Selector, SelectorError> {
        SelectorParser { src, pos: 0 }.parse()
    }

    /// Whether `node` matches any group. Ancestor compounds are matched
    /// against the full ancestor chain.
    pub fn matches(&self, doc: &Document, node: NodeId) -> bool {
        self.groups.iter().any(|group| {
            let Some((last, rest)) = group.split_last() else { return false };
            if !last.matches(doc, node) {
                return false;
            }
            let mut ancestors = doc.ancestors(node);
            rest.iter().rev().all(|compound| ancestors.any(|a| compound.matches(doc, a)))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> (Document, NodeId) {
        let mut d = Document::new();
        let root = d.create_element("div");
        let view = d.create_element("gui-list-view");
        d.set_attr(view, "data-id", "files");
        let body = d.create_element("gui-list-view-body");
        let row = d.create_element("gui-list-view-row");
        d.add_class(row, "gui-active");
        d.set_attr(row, "data-id", "a.txt");
        d.append_child(root, view);
        d.append_child(view, body);
        d.append_child(body, row);
        (d, root)
    }

    #[test]
    fn attribute_value_quoted_and_bare() {
        let (d, root) = doc();
        assert!(d.query_selector(root, r#"[data-id="files"]"#).is_some());
        assert!(d.query_selector(root, "[data-id=files]").is_some());
        assert!(d.query_selector(root, "[data-id='a.txt']").is_some());
    }

    #[test]
    fn descendant_and_class() {
        let (d, root) = doc();
        assert_eq!(d.query_selector_all(root, "gui-list-view .gui-active").len(), 1);
        assert!(d.query_selector(root, "gui-tree-view gui-list-view-row").is_none());
    }

    #[test]
    fn groups_keep_document_order() {
        let (d, root) = doc();
        let hits = d.query_selector_all(root, "gui-list-view-row, gui-list-view");
        assert_eq!(d.tag(hits[0]), Some("gui-list-view"));
    }

    #[test]
    fn rejects_garbage() {
        assert!(Selector::parse("[data-id").is_err());
        assert!(Selector::parse("a,,b").is_err());
        assert!(Selector::parse("").is_err());
    }
}
