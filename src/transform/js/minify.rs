// src/transform/js/minify.rs

//! Whitespace and comment removal. Identifiers are never renamed.

use super::lexer::{LexError, MappedWriter, Token, TokenKind, tokenize};
use crate::pipeline::sourcemap::SourceMap;

/// Minify `src`, composing the result map with `incoming` when given.
pub fn minify(src: &str, incoming: Option<&SourceMap>, source: &str) -> Result<(String, SourceMap), LexError> {
    let tokens = tokenize(src)?;
    let mut w = MappedWriter::new(incoming, source, src);
    let mut prev: Option<&Token<'_>> = None;
    let mut line_break = false;

    for tok in &tokens {
        match tok.kind {
            TokenKind::Whitespace => {
                line_break |= tok.text.contains('\n');
            }
            TokenKind::LineComment => {}
            TokenKind::BlockComment if tok.is_preserved_comment() => {
                if w.last_char().is_some_and(|c| c != '\n') {
                    w.raw("\n");
                }
                w.raw(tok.text);
                w.raw("\n");
                prev = None;
                line_break = false;
            }
            TokenKind::BlockComment => {
                line_break |= tok.text.contains('\n');
            }
            _ => {
                if let Some(p) = prev {
                    if line_break && can_end_statement(p) && can_start_statement(tok) {
                        w.raw("\n");
                    } else if needs_space(p, tok) {
                        w.raw(" ");
                    }
                }
                w.token(tok, tok.text);
                prev = Some(tok);
                line_break = false;
            }
        }
    }

    Ok(w.finish())
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$' || c == '\\' || !c.is_ascii()
}

fn needs_space(prev: &Token<'_>, next: &Token<'_>) -> bool {
    let (Some(a), Some(b)) = (prev.text.chars().next_back(), next.text.chars().next()) else {
        return false;
    };

    (is_word_char(a) && is_word_char(b))
        || (prev.kind == TokenKind::Number && b == '.')
        || (a == '+' && b == '+')
        || (a == '-' && b == '-')
        || (a == '/' && (b == '/' || b == '*'))
}

/// Could an automatic semicolon be inserted after this token?
fn can_end_statement(tok: &Token<'_>) -> bool {
    match tok.kind {
        TokenKind::Ident
        | TokenKind::Number
        | TokenKind::String
        | TokenKind::Template
        | TokenKind::Regex => true,
        TokenKind::Punct => matches!(tok.text, ")" | "]" | "}" | "++" | "--"),
        _ => false,
    }
}

fn can_start_statement(tok: &Token<'_>) -> bool {
    match tok.kind {
        TokenKind::Ident
        | TokenKind::Number
        | TokenKind::String
        | TokenKind::Template
        | TokenKind::Regex => true,
        TokenKind::Punct => matches!(
            tok.text,
            "(" | "[" | "{" | "++" | "--" | "+" | "-" | "!" | "~" | "#" | "@" | "..."
        ),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn min(src: &str) -> String {
        minify(src, None, "in.js").unwrap().0
    }

    #[test]
    fn strips_comments_and_whitespace() {
        let out = min("// lead\nvar  a = 1 ; /* note */\nfunction f ( x ) { return x + 1 ; }\n");
        assert_eq!(out, "var a=1;function f(x){return x+1;}");
    }

    #[test]
    fn keeps_license_comments() {
        let out = min("/*! keep me */\nvar a = 1;");
        assert_eq!(out, "/*! keep me */\nvar a=1;");
    }

    #[test]
    fn keeps_line_breaks_that_terminate_statements() {
        assert_eq!(min("var a = b\nc()"), "var a=b\nc()");
        assert_eq!(min("return\nx"), "return\nx");
        assert_eq!(min("a\n++b"), "a\n++b");
        assert_eq!(min("a = b +\nc"), "a=b+c");
    }

    #[test]
    fn never_glues_operators_or_words() {
        assert_eq!(min("a + +b"), "a+ +b");
        assert_eq!(min("a - -b"), "a- -b");
        assert_eq!(min("typeof x"), "typeof x");
        assert_eq!(min("1 .toString()"), "1 .toString()");
        assert_eq!(min("x = 'a b'  +  \"c  d\""), "x='a b'+\"c  d\"");
    }

    #[test]
    fn map_points_tokens_at_their_origin() {
        let (out, map) = minify("var a;\n\n  foo();", None, "in.js").unwrap();
        assert_eq!(out, "var a;foo();");
        let origin = map.lookup(0, 6).unwrap();
        assert_eq!((origin.line, origin.col), (2, 2));
    }
}
