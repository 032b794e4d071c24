//! Tokenizer for Starlark-style build files
//!
//! Tokens carry byte spans into the source; nothing is normalised, so any
//! region the parser does not touch can be reproduced byte-for-byte.

use std::ops::Range;

use super::ParseError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TokenKind {
    Ident,
    /// String literal with its decoded value
    Str(String),
    Number,
    /// Operators other than plain `=`
    Op,
    Assign,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Dot,
    Colon,
    Semicolon,
    Newline,
    Comment,
}

impl TokenKind {
    pub(crate) fn closer(&self) -> Option<TokenKind> {
        match self {
            TokenKind::LParen => Some(TokenKind::RParen),
            TokenKind::LBracket => Some(TokenKind::RBracket),
            TokenKind::LBrace => Some(TokenKind::RBrace),
            _ => None,
        }
    }

    pub(crate) fn is_closer(&self) -> bool {
        matches!(
            self,
            TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub span: Range<usize>,
}

/// Byte offsets of line starts, for error positions and indentation.
#[derive(Debug)]
pub(crate) struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    pub(crate) fn new(src: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(src.match_indices('\n').map(|(i, _)| i + 1));
        Self { starts }
    }

    /// 1-based line and column of `offset`.
    pub(crate) fn position(&self, offset: usize) -> (usize, usize) {
        let line = self.starts.partition_point(|&start| start <= offset);
        let start = self.starts[line - 1];
        (line, offset - start + 1)
    }

    /// Distance of `offset` from the start of its line.
    pub(crate) fn column_offset(&self, offset: usize) -> usize {
        self.position(offset).1 - 1
    }
}

pub(crate) fn tokenize(file: &str, src: &str, lines: &LineIndex) -> Result<Vec<Token>, ParseError> {
    Lexer {
        file,
        src,
        bytes: src.as_bytes(),
        pos: 0,
        lines,
        tokens: Vec::new(),
    }
    .run()
}

struct Lexer<'a> {
    file: &'a str,
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    lines: &'a LineIndex,
    tokens: Vec<Token>,
}

impl Lexer<'_> {
    fn run(mut self) -> Result<Vec<Token>, ParseError> {
        while let Some(c) = self.skip_blanks() {
            let start = self.pos;
            match c {
                b'\n' => self.single(TokenKind::Newline),
                b'#' => {
                    while self.pos < self.bytes.len() && self.bytes[self.pos] != b'\n' {
                        self.pos += 1;
                    }
                    self.push(TokenKind::Comment, start);
                }
                b'\\' => {
                    // Explicit line joining
                    match (self.peek(1), self.peek(2)) {
                        (Some(b'\n'), _) => self.pos += 2,
                        (Some(b'\r'), Some(b'\n')) => self.pos += 3,
                        _ => return Err(self.error(start, "unexpected '\\'")),
                    }
                }
                b'"' | b'\'' => self.string(start, false)?,
                c if c == b'_' || c.is_ascii_alphabetic() => {
                    let end = self.scan_ident(start);
                    let word = &self.src[start..end];
                    let quote_follows = matches!(self.bytes.get(end), Some(b'"' | b'\''));
                    if quote_follows && is_string_prefix(word) {
                        self.pos = end;
                        self.string(start, word.contains(['r', 'R']))?;
                    } else {
                        self.pos = end;
                        self.push(TokenKind::Ident, start);
                    }
                }
                c if c.is_ascii_digit()
                    || (c == b'.' && self.peek(1).is_some_and(|n| n.is_ascii_digit())) =>
                {
                    while self.pos < self.bytes.len()
                        && (self.bytes[self.pos].is_ascii_alphanumeric()
                            || matches!(self.bytes[self.pos], b'.' | b'_'))
                    {
                        self.pos += 1;
                    }
                    self.push(TokenKind::Number, start);
                }
                b'(' => self.single(TokenKind::LParen),
                b')' => self.single(TokenKind::RParen),
                b'[' => self.single(TokenKind::LBracket),
                b']' => self.single(TokenKind::RBracket),
                b'{' => self.single(TokenKind::LBrace),
                b'}' => self.single(TokenKind::RBrace),
                b',' => self.single(TokenKind::Comma),
                b'.' => self.single(TokenKind::Dot),
                b':' => self.single(TokenKind::Colon),
                b';' => self.single(TokenKind::Semicolon),
                b'=' => {
                    if self.peek(1) == Some(b'=') {
                        self.pos += 2;
                        self.push(TokenKind::Op, start);
                    } else {
                        self.single(TokenKind::Assign);
                    }
                }
                b'+' | b'-' | b'*' | b'/' | b'%' | b'<' | b'>' | b'!' | b'&' | b'|' | b'^'
                | b'~' | b'@' => {
                    self.pos += 1;
                    let doubled = matches!(
                        (c, self.peek(0)),
                        (b'*', Some(b'*'))
                            | (b'/', Some(b'/'))
                            | (b'<', Some(b'<'))
                            | (b'>', Some(b'>'))
                            | (b'-', Some(b'>'))
                    );
                    if doubled {
                        self.pos += 1;
                    }
                    if self.peek(0) == Some(b'=') {
                        self.pos += 1;
                    }
                    self.push(TokenKind::Op, start);
                }
                _ => {
                    let ch = self.src[start..].chars().next().unwrap_or('?');
                    return Err(self.error(start, &format!("unexpected character {:?}", ch)));
                }
            }
        }
        Ok(self.tokens)
    }

    /// Skip spaces, tabs and carriage returns; returns the next byte.
    fn skip_blanks(&mut self) -> Option<u8> {
        while let Some(&c) = self.bytes.get(self.pos) {
            if matches!(c, b' ' | b'\t' | b'\r' | b'\x0c') {
                self.pos += 1;
            } else {
                return Some(c);
            }
        }
        None
    }

    fn peek(&self, ahead: usize) -> Option<u8> {
        self.bytes.get(self.pos + ahead).copied()
    }

    fn scan_ident(&self, start: usize) -> usize {
        let mut end = start;
        while end < self.bytes.len()
            && (self.bytes[end] == b'_' || self.bytes[end].is_ascii_alphanumeric())
        {
            end += 1;
        }
        end
    }

    fn single(&mut self, kind: TokenKind) {
        let start = self.pos;
        self.pos += 1;
        self.push(kind, start);
    }

    fn push(&mut self, kind: TokenKind, start: usize) {
        self.tokens.push(Token {
            kind,
            span: start..self.pos,
        });
    }

    /// Lex a string literal whose opening quote is at `self.pos`; `start`
    /// includes any prefix letters.
    fn string(&mut self, start: usize, raw: bool) -> Result<(), ParseError> {
        let quote = self.bytes[self.pos];
        let triple = self.bytes[self.pos..].starts_with(&[quote, quote, quote]);
        let delimiter = if triple { 3 } else { 1 };
        let content_start = self.pos + delimiter;

        let mut i = content_start;
        let content_end = loop {
            match self.bytes.get(i) {
                None => return Err(self.error(start, "unterminated string literal")),
                Some(b'\\') => i += 2,
                Some(&c) if c == quote => {
                    if !triple || self.bytes[i..].starts_with(&[quote, quote, quote]) {
                        break i;
                    }
                    i += 1;
                }
                Some(b'\n') if !triple => {
                    return Err(self.error(start, "unterminated string literal"))
                }
                Some(_) => i += 1,
            }
        };

        let content = &self.src[content_start..content_end];
        let value = if raw {
            content.to_string()
        } else {
            unescape(content)
        };
        self.pos = content_end + delimiter;
        self.push(TokenKind::Str(value), start);
        Ok(())
    }

    fn error(&self, offset: usize, message: &str) -> ParseError {
        let (line, column) = self.lines.position(offset);
        ParseError::new(self.file, line, column, message)
    }
}

fn is_string_prefix(word: &str) -> bool {
    matches!(
        word.to_ascii_lowercase().as_str(),
        "r" | "b" | "rb" | "br"
    )
}

/// Decode escape sequences of a non-raw string literal body.
fn unescape(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let Some(esc) = chars.next() else {
            out.push('\\');
            break;
        };
        match esc {
            '\n' => {}
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'a' => out.push('\x07'),
            'b' => out.push('\x08'),
            'f' => out.push('\x0c'),
            'v' => out.push('\x0b'),
            '\\' | '\'' | '"' => out.push(esc),
            '0'..='7' => {
                let mut value = esc.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    match chars.peek().and_then(|d| d.to_digit(8)) {
                        Some(d) => {
                            value = value * 8 + d;
                            chars.next();
                        }
                        None => break,
                    }
                }
                out.push(char::from_u32(value).unwrap_or('\u{fffd}'));
            }
            'x' | 'u' | 'U' => {
                let width = match esc {
                    'x' => 2,
                    'u' => 4,
                    _ => 8,
                };
                let digits: String = chars.clone().take(width).collect();
                match u32::from_str_radix(&digits, 16).ok().and_then(char::from_u32) {
                    Some(decoded) if digits.len() == width => {
                        out.push(decoded);
                        for _ in 0..width {
                            chars.next();
                        }
                    }
                    _ => {
                        out.push('\\');
                        out.push(esc);
                    }
                }
            }
            other => {
                out.push('\\');
                out.push(other);
            }
        }
    }
    out
}
