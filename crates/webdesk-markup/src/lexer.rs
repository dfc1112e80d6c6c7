use crate::error::ParseError;

// ── Token ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// `<name`, opening a start tag. Attributes follow until `TagEnd`/`SelfClose`.
    TagOpen(String),
    /// `name="value"` inside a start tag.
    Attr { name: String, value: String },
    /// `>` closing a start tag.
    TagEnd,
    /// `/>` closing a start tag.
    SelfClose,
    /// `</name>`
    CloseTag(String),
    /// Character data between tags, with references decoded.
    Text(String),
    // Sentinel
    Eof,
}

/// A token together with the 1-based position where it starts.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenWithPos {
    pub token: Token,
    pub line: usize,
    pub col: usize,
}

// ── Lexer ─────────────────────────────────────────────────────────────────

pub struct Lexer<'s> {
    src: &'s str,
    pos: usize,
    line: usize,
    col: usize,
    in_tag: bool,
}

impl<'s> Lexer<'s> {
    pub fn new(src: &'s str) -> Self {
        Self { src, pos: 0, line: 1, col: 1, in_tag: false }
    }

    pub fn tokenize(mut self) -> Result<Vec<TokenWithPos>, ParseError> {
        let mut tokens = Vec::new();
        loop {
            let tok = self.next_token()?;
            let eof = tok.token == Token::Eof;
            tokens.push(tok);
            if eof {
                break;
            }
        }
        Ok(tokens)
    }

    fn rest(&self) -> &'s str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        self.rest().chars().nth(1)
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.rest().chars().next()?;
        self.pos += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(ch)
    }

    fn advance_by(&mut self, n: usize) {
        for _ in 0..n {
            self.advance();
        }
    }

    fn err(&self, msg: impl Into<String>) -> ParseError {
        ParseError::new(msg, self.line, self.col)
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.advance();
        }
    }

    fn next_token(&mut self) -> Result<TokenWithPos, ParseError> {
        loop {
            if self.in_tag {
                self.skip_whitespace();
            }
            let (line, col) = (self.line, self.col);
            let token = if self.in_tag {
                match self.lex_in_tag()? {
                    Some(t) => t,
                    None => continue,
                }
            } else {
                match self.lex_content()? {
                    Some(t) => t,
                    None => continue,
                }
            };
            return Ok(TokenWithPos { token, line, col });
        }
    }

    // ── Content mode ──────────────────────────────────────────────────────

    /// Returns `None` when something was skipped (comment, doctype).
    fn lex_content(&mut self) -> Result<Option<Token>, ParseError> {
        let rest = self.rest();
        if rest.is_empty() {
            return Ok(Some(Token::Eof));
        }
        if rest.starts_with("<!--") {
            let (line, col) = (self.line, self.col);
            match rest.find("-->") {
                Some(end) => self.advance_by(rest[..end + 3].chars().count()),
                None => return Err(ParseError::new("unterminated comment", line, col)),
            }
            return Ok(None);
        }
        if rest.starts_with("<!") {
            while !matches!(self.advance(), None | Some('>')) {}
            return Ok(None);
        }
        if rest.starts_with("</") {
            self.advance_by(2);
            let name = self.lex_name();
            if name.is_empty() {
                return Err(self.err("expected tag name after `</`"));
            }
            self.skip_whitespace();
            if self.advance() != Some('>') {
                return Err(self.err(format!("expected `>` to close `</{}`", name)));
            }
            return Ok(Some(Token::CloseTag(name)));
        }
        if self.peek() == Some('<') && matches!(self.peek_second(), Some(c) if c.is_ascii_alphabetic()) {
            self.advance();
            let name = self.lex_name();
            self.in_tag = true;
            return Ok(Some(Token::TagOpen(name)));
        }
        Ok(Some(self.lex_text()))
    }

    fn lex_text(&mut self) -> Token {
        let start = self.pos;
        // A leading `<` that does not open a tag is literal text.
        if self.peek() == Some('<') {
            self.advance();
        }
        while let Some(c) = self.peek() {
            if c == '<' && matches!(self.peek_second(), Some(n) if n.is_ascii_alphabetic() || n == '/' || n == '!') {
                break;
            }
            self.advance();
        }
        Token::Text(decode_entities(&self.src[start..self.pos]))
    }

    fn lex_name(&mut self) -> String {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if is_name_char(c)) {
            self.advance();
        }
        self.src[start..self.pos].to_ascii_lowercase()
    }

    // ── Tag mode ──────────────────────────────────────────────────────────

    fn lex_in_tag(&mut self) -> Result<Option<Token>, ParseError> {
        let ch = match self.peek() {
            None => return Err(self.err("unterminated tag")),
            Some(c) => c,
        };
        match ch {
            '>' => {
                self.advance();
                self.in_tag = false;
                Ok(Some(Token::TagEnd))
            }
            '/' => {
                self.advance();
                if self.peek() == Some('>') {
                    self.advance();
                    self.in_tag = false;
                    Ok(Some(Token::SelfClose))
                } else {
                    // stray slash between attributes
                    Ok(None)
                }
            }
            c if is_name_char(c) => self.lex_attr().map(Some),
            other => Err(self.err(format!("unexpected character {:?} in tag", other))),
        }
    }

    fn lex_attr(&mut self) -> Result<Token, ParseError> {
        let name = self.lex_name();
        self.skip_whitespace();
        if self.peek() != Some('=') {
            return Ok(Token::Attr { name, value: String::new() });
        }
        self.advance(); // consume `=`
        self.skip_whitespace();

        let value = match self.peek() {
            Some(q @ ('"' | '\'')) => {
                let (line, col) = (self.line, self.col);
                self.advance();
                let start = self.pos;
                loop {
                    match self.advance() {
                        None => {
                            return Err(ParseError::new(
                                format!("unterminated value for attribute `{}`", name),
                                line,
                                col,
                            ));
                        }
                        Some(c) if c == q => break,
                        Some(_) => {}
                    }
                }
                decode_entities(&self.src[start..self.pos - 1])
            }
            _ => {
                let start = self.pos;
                while let Some(c) = self.peek() {
                    if c.is_whitespace() || c == '>' || self.rest().starts_with("/>") {
                        break;
                    }
                    self.advance();
                }
                decode_entities(&self.src[start..self.pos])
            }
        };
        Ok(Token::Attr { name, value })
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.')
}

// ── Character references ──────────────────────────────────────────────────

/// Decodes the named and numeric references that appear in scheme files.
/// Unknown references are kept verbatim.
pub fn decode_entities(src: &str) -> String {
    if !src.contains('&') {
        return src.to_string();
    }
    let mut out = String::with_capacity(src.len());
    let mut rest = src;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let decoded = tail.find(';').filter(|&end| end <= 10).and_then(|end| {
            let name = &tail[1..end];
            let ch = match name {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" | "#39" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                _ => numeric_reference(name),
            };
            ch.map(|c| (c, end + 1))
        });
        match decoded {
            Some((c, len)) => {
                out.push(c);
                rest = &tail[len..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn numeric_reference(name: &str) -> Option<char> {
    let digits = name.strip_prefix('#')?;
    let code = match digits.strip_prefix(['x', 'X']) {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => digits.parse::<u32>().ok()?,
    };
    char::from_u32(code)
}
