use crate::ast::{is_void, Attr, Element, Markup, Node};
use crate::error::ParseError;
use crate::lexer::{Lexer, Token, TokenWithPos};

// ── Parser ────────────────────────────────────────────────────────────────

/// Builds a [`Markup`] tree from a token stream.
///
/// Tree construction is forgiving: unmatched end tags are dropped, elements
/// still open at end of input are closed, and void elements never take
/// children. Only lexical problems are reported as errors.
pub struct Parser {
    tokens: Vec<TokenWithPos>,
    pos: usize,
    open: Vec<Element>,
    roots: Vec<Node>,
}

impl Parser {
    pub fn new(tokens: Vec<TokenWithPos>) -> Self {
        Self { tokens, pos: 0, open: Vec::new(), roots: Vec::new() }
    }

    fn current_pos(&self) -> (usize, usize) {
        self.tokens
            .get(self.pos.saturating_sub(1))
            .map(|t| (t.line, t.col))
            .unwrap_or((1, 1))
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens.get(self.pos)
            .map(|t| t.token.clone())
            .unwrap_or(Token::Eof);
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn err(&self, msg: impl Into<String>) -> ParseError {
        let (line, col) = self.current_pos();
        ParseError::new(msg, line, col)
    }

    fn attach(&mut self, node: Node) {
        match self.open.last_mut() {
            Some(parent) => parent.children.push(node),
            None => self.roots.push(node),
        }
    }

    fn close_top(&mut self) {
        if let Some(el) = self.open.pop() {
            self.attach(Node::Element(el));
        }
    }

    // ── Document ──────────────────────────────────────────────────────────

    pub fn parse_markup(mut self) -> Result<Markup, ParseError> {
        loop {
            match self.advance() {
                Token::Eof => break,
                Token::TagOpen(tag) => self.parse_start_tag(tag)?,
                Token::CloseTag(tag) => {
                    if let Some(depth) = self.open.iter().rposition(|el| el.tag == tag) {
                        while self.open.len() > depth {
                            self.close_top();
                        }
                    }
                }
                Token::Text(text) => {
                    if !text.trim().is_empty() {
                        self.attach(Node::Text(text));
                    }
                }
                tok => return Err(self.err(format!("unexpected {:?} outside a tag", tok))),
            }
        }
        while !self.open.is_empty() {
            self.close_top();
        }
        Ok(Markup { nodes: self.roots })
    }

    fn parse_start_tag(&mut self, tag: String) -> Result<(), ParseError> {
        let mut el = Element::new(tag);
        loop {
            match self.advance() {
                Token::Attr { name, value } => {
                    // first occurrence wins, as in HTML
                    if el.attr(&name).is_none() {
                        el.attrs.push(Attr { name, value });
                    }
                }
                Token::TagEnd if !is_void(&el.tag) => {
                    self.open.push(el);
                    return Ok(());
                }
                Token::TagEnd | Token::SelfClose => {
                    self.attach(Node::Element(el));
                    return Ok(());
                }
                tok => {
                    return Err(self.err(format!("expected attribute or `>` in <{}>, got {:?}", el.tag, tok)));
                }
            }
        }
    }
}

/// Parses markup source into a node tree.
pub fn parse_str(src: &str) -> Result<Markup, ParseError> {
    let tokens = Lexer::new(src).tokenize()?;
    Parser::new(tokens).parse_markup()
}
