// src/transform/html/mod.rs

//! A forgiving HTML/SVG tokenizer and the markup transforms built on it.

pub mod htmlify;
pub mod minify;

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("byte {offset}: {message}")]
pub struct MarkupError {
    pub offset: usize,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attr<'a> {
    pub name: &'a str,
    /// Byte offset of the name in the source.
    pub name_offset: usize,
    /// Raw value including its quotes, if any.
    pub value: Option<&'a str>,
}

impl<'a> Attr<'a> {
    /// Value with surrounding quotes removed.
    pub fn unquoted(&self) -> Option<&'a str> {
        self.value.map(|v| {
            v.strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .or_else(|| v.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
                .unwrap_or(v)
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag<'a> {
    pub name: &'a str,
    pub attrs: Vec<Attr<'a>>,
    pub self_closing: bool,
}

impl<'a> Tag<'a> {
    pub fn attr(&self, name: &str) -> Option<&Attr<'a>> {
        self.attrs.iter().find(|a| a.name.eq_ignore_ascii_case(name))
    }

    /// Tag re-serialized with single spaces between attributes.
    pub fn to_compact(&self) -> String {
        let mut out = format!("<{}", self.name);
        for attr in &self.attrs {
            out.push(' ');
            out.push_str(attr.name);
            if let Some(value) = attr.value {
                out.push('=');
                out.push_str(value);
            }
        }
        if self.self_closing {
            out.push('/');
        }
        out.push('>');
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind<'a> {
    Text,
    Comment,
    /// `<!DOCTYPE ..>`, `<?xml ..?>` and other declarations.
    Declaration,
    StartTag(Tag<'a>),
    EndTag(&'a str),
    /// Contents of `script`, `style`, `textarea` and `title`.
    RawText,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node<'a> {
    pub kind: NodeKind<'a>,
    /// The exact source text of the node.
    pub raw: &'a str,
    pub offset: usize,
}

const RAW_TEXT_ELEMENTS: [&str; 4] = ["script", "style", "textarea", "title"];

pub fn tokenize(src: &str) -> Result<Vec<Node<'_>>, MarkupError> {
    let bytes = src.as_bytes();
    let mut nodes = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let start = pos;

        if bytes[pos] != b'<' {
            pos = src[pos..].find('<').map(|i| pos + i).unwrap_or(src.len());
            nodes.push(node(src, NodeKind::Text, start, pos));
            continue;
        }

        let rest = &src[pos..];
        if rest.starts_with("<!--") {
            pos = rest
                .find("-->")
                .map(|i| pos + i + 3)
                .ok_or_else(|| err(start, "unterminated comment"))?;
            nodes.push(node(src, NodeKind::Comment, start, pos));
        } else if rest.starts_with("<!") || rest.starts_with("<?") {
            pos = rest
                .find('>')
                .map(|i| pos + i + 1)
                .ok_or_else(|| err(start, "unterminated declaration"))?;
            nodes.push(node(src, NodeKind::Declaration, start, pos));
        } else if rest.starts_with("</") && rest[2..].starts_with(|c: char| c.is_ascii_alphabetic()) {
            let name_end = rest[2..]
                .find(|c: char| c.is_ascii_whitespace() || c == '>')
                .map(|i| i + 2)
                .unwrap_or(rest.len());
            let name = &rest[2..name_end];
            pos = rest
                .find('>')
                .map(|i| pos + i + 1)
                .ok_or_else(|| err(start, "unterminated end tag"))?;
            nodes.push(node(src, NodeKind::EndTag(name), start, pos));
        } else if rest[1..].starts_with(|c: char| c.is_ascii_alphabetic()) {
            let (tag, end) = parse_start_tag(src, pos)?;
            let raw_name = RAW_TEXT_ELEMENTS
                .iter()
                .find(|n| tag.name.eq_ignore_ascii_case(n))
                .filter(|_| !tag.self_closing);
            nodes.push(node(src, NodeKind::StartTag(tag), start, end));
            pos = end;

            if let Some(raw_name) = raw_name {
                let close = find_close_tag(&src[pos..], raw_name)
                    .map(|i| pos + i)
                    .unwrap_or(src.len());
                if close > pos {
                    nodes.push(node(src, NodeKind::RawText, pos, close));
                }
                pos = close;
            }
        } else {
            // A lone `<` is text.
            pos = src[pos + 1..].find('<').map(|i| pos + 1 + i).unwrap_or(src.len());
            nodes.push(node(src, NodeKind::Text, start, pos));
        }
    }

    Ok(nodes)
}

fn node<'a>(src: &'a str, kind: NodeKind<'a>, start: usize, end: usize) -> Node<'a> {
    Node {
        kind,
        raw: &src[start..end],
        offset: start,
    }
}

fn err(offset: usize, message: &str) -> MarkupError {
    MarkupError {
        offset,
        message: message.to_string(),
    }
}

fn find_close_tag(haystack: &str, name: &str) -> Option<usize> {
    let lower = haystack.to_ascii_lowercase();
    lower.find(&format!("</{name}"))
}

fn parse_start_tag(src: &str, start: usize) -> Result<(Tag<'_>, usize), MarkupError> {
    let bytes = src.as_bytes();
    let mut pos = start + 1;

    let name_start = pos;
    while pos < bytes.len() && !bytes[pos].is_ascii_whitespace() && bytes[pos] != b'>' && bytes[pos] != b'/' {
        pos += 1;
    }
    let name = &src[name_start..pos];
    let mut attrs = Vec::new();

    loop {
        while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
            pos += 1;
        }
        match bytes.get(pos) {
            None => return Err(err(start, "unterminated tag")),
            Some(b'>') => {
                return Ok((
                    Tag {
                        name,
                        attrs,
                        self_closing: false,
                    },
                    pos + 1,
                ));
            }
            Some(b'/') if bytes.get(pos + 1) == Some(&b'>') => {
                return Ok((
                    Tag {
                        name,
                        attrs,
                        self_closing: true,
                    },
                    pos + 2,
                ));
            }
            Some(b'/') => {
                pos += 1;
                continue;
            }
            Some(_) => {}
        }

        let attr_start = pos;
        while pos < bytes.len()
            && !bytes[pos].is_ascii_whitespace()
            && !matches!(bytes[pos], b'=' | b'>')
            && !(bytes[pos] == b'/' && bytes.get(pos + 1) == Some(&b'>'))
        {
            pos += 1;
        }
        let attr_name = &src[attr_start..pos];

        let mut look = pos;
        while look < bytes.len() && bytes[look].is_ascii_whitespace() {
            look += 1;
        }

        let mut value = None;
        if bytes.get(look) == Some(&b'=') {
            pos = look + 1;
            while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
                pos += 1;
            }
            let value_start = pos;
            match bytes.get(pos) {
                Some(&q) if q == b'"' || q == b'\'' => {
                    let close = src[pos + 1..]
                        .find(q as char)
                        .ok_or_else(|| err(pos, "unterminated attribute value"))?;
                    pos = pos + 1 + close + 1;
                }
                _ => {
                    while pos < bytes.len() && !bytes[pos].is_ascii_whitespace() && bytes[pos] != b'>' {
                        pos += 1;
                    }
                }
            }
            value = Some(&src[value_start..pos]);
        }

        attrs.push(Attr {
            name: attr_name,
            name_offset: attr_start,
            value,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_markup_into_nodes() {
        let src = "<!DOCTYPE html><div class=\"a b\" hidden>hi<!-- c --></div>";
        let nodes = tokenize(src).unwrap();
        assert!(matches!(nodes[0].kind, NodeKind::Declaration));
        let NodeKind::StartTag(tag) = &nodes[1].kind else {
            panic!("expected a start tag");
        };
        assert_eq!(tag.name, "div");
        assert_eq!(tag.attr("class").unwrap().unquoted(), Some("a b"));
        assert_eq!(tag.attr("hidden").unwrap().value, None);
        assert!(matches!(nodes[2].kind, NodeKind::Text));
        assert!(matches!(nodes[3].kind, NodeKind::Comment));
        assert!(matches!(nodes[4].kind, NodeKind::EndTag("div")));
    }

    #[test]
    fn script_bodies_are_raw_text() {
        let nodes = tokenize("<script>if (a < b) { x = '</div>'; }</script>").unwrap();
        assert_eq!(nodes[1].kind, NodeKind::RawText);
        assert_eq!(nodes[1].raw, "if (a < b) { x = '</div>'; }");
        assert!(matches!(nodes[2].kind, NodeKind::EndTag("script")));
    }

    #[test]
    fn self_closing_tags_are_flagged() {
        let nodes = tokenize("<path d=\"M0 0\"/>").unwrap();
        let NodeKind::StartTag(tag) = &nodes[0].kind else {
            panic!("expected a start tag");
        };
        assert!(tag.self_closing);
        assert_eq!(tag.to_compact(), "<path d=\"M0 0\"/>");
    }
}
