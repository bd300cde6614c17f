// src/transform/js/downlevel.rs

//! Down-level compile for older browsers.
//!
//! Covers block-scoped declarations and templates without substitutions.
//! Line structure is preserved except where a template spans lines.

use super::lexer::{LexError, MappedWriter, Token, TokenKind, tokenize};
use crate::pipeline::sourcemap::SourceMap;

pub fn downlevel(src: &str, incoming: Option<&SourceMap>, source: &str) -> Result<(String, SourceMap), LexError> {
    let tokens = tokenize(src)?;
    let mut w = MappedWriter::new(incoming, source, src);

    let significant: Vec<usize> = (0..tokens.len()).filter(|&i| tokens[i].is_significant()).collect();

    for (pos, &i) in significant.iter().enumerate() {
        // Flush the whitespace and comments before this token verbatim.
        let from = if pos == 0 { 0 } else { significant[pos - 1] + 1 };
        for tok in &tokens[from..i] {
            w.raw(tok.text);
        }

        let tok = &tokens[i];
        let prev = pos.checked_sub(1).map(|p| &tokens[significant[p]]);
        let next = significant.get(pos + 1).map(|&n| &tokens[n]);

        if is_declaration(tok, prev, next) {
            w.token(tok, "var");
        } else if tok.kind == TokenKind::Template && !is_tagged(prev) {
            match plain_template(tok.text) {
                Some(s) => w.token(tok, &s),
                None => w.token(tok, tok.text),
            }
        } else {
            w.token(tok, tok.text);
        }
    }

    let tail = significant.last().map(|&i| i + 1).unwrap_or(0);
    for tok in &tokens[tail..] {
        w.raw(tok.text);
    }

    Ok(w.finish())
}

fn is_declaration(tok: &Token<'_>, prev: Option<&Token<'_>>, next: Option<&Token<'_>>) -> bool {
    // A property access like `obj.const` is not a declaration.
    if prev.is_some_and(|p| p.is_punct(".") || p.is_punct("?.")) {
        return false;
    }
    match tok.text {
        "const" => tok.kind == TokenKind::Ident,
        "let" => {
            tok.kind == TokenKind::Ident
                && next.is_some_and(|n| {
                    (n.kind == TokenKind::Ident && !matches!(n.text, "in" | "instanceof"))
                        || n.is_punct("[")
                        || n.is_punct("{")
                })
        }
        _ => false,
    }
}

fn is_tagged(prev: Option<&Token<'_>>) -> bool {
    prev.is_some_and(|p| {
        (matches!(p.kind, TokenKind::Ident | TokenKind::Template)
            && !matches!(p.text, "return" | "typeof" | "case" | "in" | "of" | "yield" | "await" | "void"))
            || p.is_punct(")")
            || p.is_punct("]")
    })
}

/// Rewrite a template literal without substitutions as a double-quoted
/// string. `None` when the template has substitutions.
fn plain_template(text: &str) -> Option<String> {
    let body = text.strip_prefix('`')?.strip_suffix('`')?;
    let mut out = String::with_capacity(body.len() + 2);
    out.push('"');

    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('`') => out.push('`'),
                Some('$') => out.push('$'),
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                None => out.push('\\'),
            },
            '$' if chars.peek() == Some(&'{') => return None,
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            other => out.push(other),
        }
    }

    out.push('"');
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn down(src: &str) -> String {
        downlevel(src, None, "in.js").unwrap().0
    }

    #[test]
    fn block_scoped_declarations_become_var() {
        assert_eq!(down("const a = 1;\nlet [b] = c;"), "var a = 1;\nvar [b] = c;");
        assert_eq!(down("obj.const = let;"), "obj.const = let;");
    }

    #[test]
    fn plain_templates_become_strings() {
        assert_eq!(down("x = `say \"hi\"`;"), "x = \"say \\\"hi\\\"\";");
        assert_eq!(down("x = `a ${b}`;"), "x = `a ${b}`;");
        assert_eq!(down("x = tag`raw`;"), "x = tag`raw`;");
    }

    #[test]
    fn byte_order_mark_does_not_hide_a_declaration() {
        assert_eq!(down("\u{FEFF}const a = 1;"), "\u{FEFF}var a = 1;");
    }

    #[test]
    fn comments_and_layout_survive() {
        let src = "// c\nconst a = 1; /* k */\n";
        assert_eq!(down(src), "// c\nvar a = 1; /* k */\n");
    }
}
