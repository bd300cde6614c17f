// src/transform/js/lexer.rs

//! A small JavaScript tokenizer.
//!
//! It knows enough of the grammar to never split a string, template,
//! comment or regular expression literal; everything the script transforms
//! need sits on top of the token stream.

use thiserror::Error;

use crate::pipeline::sourcemap::{Segment, SourceMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Whitespace,
    LineComment,
    BlockComment,
    Ident,
    Number,
    String,
    Template,
    Regex,
    Punct,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    /// Zero-based line of the first character.
    pub line: u32,
    /// Zero-based column, in characters.
    pub col: u32,
}

impl Token<'_> {
    /// Anything the parser cares about (not whitespace, not a comment).
    pub fn is_significant(&self) -> bool {
        !matches!(
            self.kind,
            TokenKind::Whitespace | TokenKind::LineComment | TokenKind::BlockComment
        )
    }

    pub fn is_punct(&self, p: &str) -> bool {
        self.kind == TokenKind::Punct && self.text == p
    }

    pub fn is_ident(&self, name: &str) -> bool {
        self.kind == TokenKind::Ident && self.text == name
    }

    /// `/*! ... */` license comment.
    pub fn is_preserved_comment(&self) -> bool {
        self.kind == TokenKind::BlockComment && self.text.starts_with("/*!")
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("line {}, column {}: {message}", line + 1, col + 1)]
pub struct LexError {
    pub line: u32,
    pub col: u32,
    pub message: String,
}

const PUNCTUATORS: [&str; 50] = [
    ">>>=", "...", "===", "!==", "**=", "<<=", ">>=", ">>>", "&&=", "||=", "??=", "=>", "==",
    "!=", "<=", ">=", "&&", "||", "??", "?.", "++", "--", "+=", "-=", "*=", "/=", "%=", "&=",
    "|=", "^=", "**", "<<", ">>", "{", "}", "(", ")", "[", "]", ";", ",", "<", ">", "+", "-",
    "*", "%", "&", "|", "^",
];

const SINGLE_PUNCT: &[u8] = b"!~?:=.@#/";

/// Keywords after which a `/` starts a regular expression.
const REGEX_PRECEDING_KEYWORDS: [&str; 14] = [
    "return", "typeof", "instanceof", "in", "of", "new", "delete", "void", "throw", "case", "do",
    "else", "yield", "await",
];

pub fn tokenize(src: &str) -> Result<Vec<Token<'_>>, LexError> {
    Lexer::new(src).run()
}

struct Lexer<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    line: u32,
    col: u32,
    tokens: Vec<Token<'a>>,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
            line: 0,
            col: 0,
            tokens: Vec::new(),
        }
    }

    fn run(mut self) -> Result<Vec<Token<'a>>, LexError> {
        while self.pos < self.bytes.len() {
            let start = self.pos;
            let kind = self.scan()?;
            self.push(kind, start);
        }
        Ok(self.tokens)
    }

    fn error(&self, message: &str) -> LexError {
        LexError {
            line: self.line,
            col: self.col,
            message: message.to_string(),
        }
    }

    fn push(&mut self, kind: TokenKind, start: usize) {
        let text = &self.src[start..self.pos];
        self.tokens.push(Token {
            kind,
            text,
            line: self.line,
            col: self.col,
        });
        for ch in text.chars() {
            if ch == '\n' {
                self.line += 1;
                self.col = 0;
            } else {
                self.col += 1;
            }
        }
    }

    fn peek(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn scan(&mut self) -> Result<TokenKind, LexError> {
        let b = self.bytes[self.pos];

        if self.space_len().is_some() {
            while let Some(len) = self.space_len() {
                self.pos += len;
            }
            return Ok(TokenKind::Whitespace);
        }

        match (b, self.peek(1)) {
            (b'/', Some(b'/')) => {
                while self.peek(0).is_some_and(|c| c != b'\n') {
                    self.pos += 1;
                }
                return Ok(TokenKind::LineComment);
            }
            (b'/', Some(b'*')) => {
                return match self.src[self.pos + 2..].find("*/") {
                    Some(end) => {
                        self.pos += 2 + end + 2;
                        Ok(TokenKind::BlockComment)
                    }
                    None => Err(self.error("unterminated comment")),
                };
            }
            _ => {}
        }

        if b == b'"' || b == b'\'' {
            self.pos = skip_string(self.bytes, self.pos).ok_or_else(|| self.error("unterminated string"))?;
            return Ok(TokenKind::String);
        }

        if b == b'`' {
            self.pos =
                skip_template(self.bytes, self.pos).ok_or_else(|| self.error("unterminated template literal"))?;
            return Ok(TokenKind::Template);
        }

        if b.is_ascii_digit() || (b == b'.' && self.peek(1).is_some_and(|c| c.is_ascii_digit())) {
            self.scan_number();
            return Ok(TokenKind::Number);
        }

        if is_ident_byte(b) {
            while self.peek(0).is_some_and(is_ident_byte) && self.space_len().is_none() {
                self.pos += 1;
            }
            return Ok(TokenKind::Ident);
        }

        if b == b'/' && self.regex_allowed() {
            self.pos = skip_regex(self.bytes, self.pos).ok_or_else(|| self.error("unterminated regular expression"))?;
            while self.peek(0).is_some_and(is_ident_byte) {
                self.pos += 1;
            }
            return Ok(TokenKind::Regex);
        }

        let rest = &self.src[self.pos..];
        if let Some(p) = PUNCTUATORS.iter().find(|p| rest.starts_with(*p)) {
            self.pos += p.len();
            return Ok(TokenKind::Punct);
        }
        if SINGLE_PUNCT.contains(&b) {
            self.pos += 1;
            return Ok(TokenKind::Punct);
        }

        Err(self.error(&format!("unexpected character {:?}", b as char)))
    }

    /// Byte length of the whitespace or line terminator at the cursor.
    fn space_len(&self) -> Option<usize> {
        let b = self.peek(0)?;
        if b.is_ascii_whitespace() || b == 0x0b {
            return Some(1);
        }
        if b < 0x80 {
            return None;
        }
        let ch = self.src[self.pos..].chars().next()?;
        is_unicode_space(ch).then(|| ch.len_utf8())
    }

    fn scan_number(&mut self) {
        let is_hex = self.bytes[self.pos] == b'0' && matches!(self.peek(1), Some(b'x' | b'X'));
        while let Some(c) = self.peek(0) {
            let prev = self.bytes[self.pos.saturating_sub(1)];
            if c.is_ascii_alphanumeric() || c == b'_' || c == b'.' {
                self.pos += 1;
            } else if (c == b'+' || c == b'-') && matches!(prev, b'e' | b'E') && !is_hex {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn regex_allowed(&self) -> bool {
        let Some(prev) = self.tokens.iter().rev().find(|t| t.is_significant()) else {
            return true;
        };
        match prev.kind {
            TokenKind::Ident => REGEX_PRECEDING_KEYWORDS.contains(&prev.text),
            TokenKind::Number | TokenKind::String | TokenKind::Template | TokenKind::Regex => false,
            TokenKind::Punct => !matches!(prev.text, ")" | "]" | "++" | "--"),
            _ => true,
        }
    }
}

/// Non-ASCII characters JavaScript treats as whitespace or line breaks.
fn is_unicode_space(ch: char) -> bool {
    matches!(
        ch,
        '\u{00A0}' | '\u{1680}' | '\u{2000}'..='\u{200A}' | '\u{2028}' | '\u{2029}' | '\u{202F}' | '\u{205F}'
            | '\u{3000}' | '\u{FEFF}'
    )
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$' || b == b'\\' || b >= 0x80
}

fn skip_string(bytes: &[u8], start: usize) -> Option<usize> {
    let quote = bytes[start];
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'\n' => return None,
            c if c == quote => return Some(i + 1),
            _ => i += 1,
        }
    }
    None
}

fn skip_template(bytes: &[u8], start: usize) -> Option<usize> {
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'`' => return Some(i + 1),
            b'$' if bytes.get(i + 1) == Some(&b'{') => i = skip_braced(bytes, i + 2)?,
            _ => i += 1,
        }
    }
    None
}

/// Skip a `${ ... }` substitution body; `i` points just past the `{`.
fn skip_braced(bytes: &[u8], mut i: usize) -> Option<usize> {
    let mut depth = 1usize;
    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' => i = skip_string(bytes, i)?,
            b'`' => i = skip_template(bytes, i)?,
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i += 2;
                while i + 1 < bytes.len() && !(bytes[i] == b'*' && bytes[i + 1] == b'/') {
                    i += 1;
                }
                i += 2;
            }
            b'{' => {
                depth += 1;
                i += 1;
            }
            b'}' => {
                depth -= 1;
                i += 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => i += 1,
        }
    }
    None
}

fn skip_regex(bytes: &[u8], start: usize) -> Option<usize> {
    let mut i = start + 1;
    let mut in_class = false;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'\n' => return None,
            b'[' => {
                in_class = true;
                i += 1;
            }
            b']' => {
                in_class = false;
                i += 1;
            }
            b'/' if !in_class => return Some(i + 1),
            _ => i += 1,
        }
    }
    None
}

/// Writes output text while recording a source-map segment per token.
///
/// Segments are composed with the incoming map when there is one, so a
/// chain of transforms keeps pointing at the original files.
pub struct MappedWriter<'m> {
    out: String,
    line: u32,
    col: u32,
    map: SourceMap,
    incoming: Option<&'m SourceMap>,
}

impl<'m> MappedWriter<'m> {
    /// `source`/`content` describe the input when `incoming` is `None`.
    pub fn new(incoming: Option<&'m SourceMap>, source: &str, content: &str) -> Self {
        let map = match incoming {
            Some(_) => SourceMap::default(),
            None => SourceMap {
                sources: vec![source.to_string()],
                sources_content: vec![Some(content.to_string())],
                lines: Vec::new(),
            },
        };
        Self {
            out: String::with_capacity(content.len()),
            line: 0,
            col: 0,
            map,
            incoming,
        }
    }

    /// Write `text` in place of `token`, mapped to the token's position.
    pub fn token(&mut self, token: &Token<'_>, text: &str) {
        let segment = match self.incoming {
            None => Some(Segment {
                gen_col: self.col,
                source: 0,
                src_line: token.line,
                src_col: token.col,
            }),
            Some(incoming) => incoming.lookup(token.line, token.col).and_then(|origin| {
                let name = incoming.sources.get(origin.source as usize)?;
                let content = incoming
                    .sources_content
                    .get(origin.source as usize)
                    .and_then(|c| c.as_ref());
                Some(Segment {
                    gen_col: self.col,
                    source: self.map.source_index(name, content),
                    src_line: origin.line,
                    src_col: origin.col,
                })
            }),
        };
        if let Some(segment) = segment {
            self.map.push(self.line, segment);
        }
        self.raw(text);
    }

    /// Write unmapped text.
    pub fn raw(&mut self, text: &str) {
        for ch in text.chars() {
            if ch == '\n' {
                self.line += 1;
                self.col = 0;
            } else {
                self.col += 1;
            }
        }
        self.out.push_str(text);
    }

    pub fn last_char(&self) -> Option<char> {
        self.out.chars().next_back()
    }

    pub fn finish(mut self) -> (String, SourceMap) {
        let line_count = self.out.split('\n').count();
        if self.map.lines.len() < line_count {
            self.map.lines.resize_with(line_count, Vec::new);
        }
        (self.out, self.map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<(TokenKind, &str)> {
        tokenize(src)
            .unwrap()
            .into_iter()
            .filter(|t| t.is_significant())
            .map(|t| (t.kind, t.text))
            .collect()
    }

    #[test]
    fn division_and_regex_are_told_apart() {
        let toks = kinds("a = b / c; d = /x\\/y[/]/g.test(s);");
        assert!(toks.contains(&(TokenKind::Punct, "/")));
        assert!(toks.contains(&(TokenKind::Regex, "/x\\/y[/]/g")));
    }

    #[test]
    fn templates_with_nested_braces_are_one_token() {
        let toks = kinds("x = `a ${ {b: `c${d}`}.b } e`;");
        assert_eq!(toks[2], (TokenKind::Template, "`a ${ {b: `c${d}`}.b } e`"));
    }

    #[test]
    fn positions_are_tracked_across_lines() {
        let toks = tokenize("var a;\n  foo()").unwrap();
        let foo = toks.iter().find(|t| t.text == "foo").unwrap();
        assert_eq!((foo.line, foo.col), (1, 2));
    }

    #[test]
    fn unicode_spaces_separate_identifiers() {
        let toks = kinds("\u{FEFF}const a\u{00A0}=\u{2028}b;\u{2029}caf\u{e9}");
        assert_eq!(toks[0], (TokenKind::Ident, "const"));
        assert_eq!(toks[1], (TokenKind::Ident, "a"));
        assert_eq!(toks[3], (TokenKind::Ident, "b"));
        assert_eq!(toks[5], (TokenKind::Ident, "caf\u{e9}"));
    }

    #[test]
    fn unterminated_literals_are_errors() {
        assert!(tokenize("var s = 'abc").is_err());
        assert!(tokenize("/* open").is_err());
        assert!(tokenize("x = `abc").is_err());
    }
}
